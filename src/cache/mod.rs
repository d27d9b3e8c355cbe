//! Crema cache system.
//!
//! Provides the in-process listing cache that memoizes rendered product pages:
//!
//! - Entries are keyed by operation and pagination parameters.
//! - Every entry carries tags; invalidating a tag turns all of its entries into
//!   misses at once, independent of their expirations.
//! - Concurrent misses for the same key share a single computation.
//!
//! ## Configuration
//!
//! Cache behavior is controlled via `crema.toml`:
//!
//! ```toml
//! [cache]
//! enable_listing_cache = true
//! listing_ttl_seconds = 60   # 0 disables expiration
//! listing_capacity = 256
//! ```

mod config;
mod inflight;
mod keys;
mod lock;
mod registry;
mod store;

pub use config::CacheConfig;
pub use keys::{LISTING_OPERATION, ListingKey, PRODUCTS_TAG};
pub use registry::TagRegistry;
pub use store::{ListingCache, TaggedCache};

pub(crate) const METRIC_CACHE_HIT: &str = "crema_cache_hit_total";
pub(crate) const METRIC_CACHE_MISS: &str = "crema_cache_miss_total";
pub(crate) const METRIC_CACHE_COALESCED: &str = "crema_cache_coalesced_total";
pub(crate) const METRIC_CACHE_EVICT: &str = "crema_cache_evict_total";
pub(crate) const METRIC_CACHE_INVALIDATE: &str = "crema_cache_invalidate_total";
pub(crate) const METRIC_CACHE_COMPUTE_MS: &str = "crema_cache_compute_ms";
