//! Cache configuration.
//!
//! Controls the listing cache via the `[cache]` section of `crema.toml`.

use std::num::NonZeroUsize;
use std::time::Duration;

const DEFAULT_LISTING_TTL_SECS: u64 = 60;
const DEFAULT_LISTING_CAPACITY: usize = 256;

/// Resolved cache configuration.
#[derive(Debug, Clone)]
pub struct CacheConfig {
    /// Serve product listings through the cache.
    pub enable_listing_cache: bool,
    /// Lifetime of a listing entry in seconds; zero keeps entries until invalidated.
    pub listing_ttl_seconds: u64,
    /// Maximum listing pages held before least-recently-used eviction.
    pub listing_capacity: usize,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            enable_listing_cache: true,
            listing_ttl_seconds: DEFAULT_LISTING_TTL_SECS,
            listing_capacity: DEFAULT_LISTING_CAPACITY,
        }
    }
}

impl From<&crate::config::CacheSettings> for CacheConfig {
    fn from(settings: &crate::config::CacheSettings) -> Self {
        Self {
            enable_listing_cache: settings.enable_listing_cache,
            listing_ttl_seconds: settings.listing_ttl_seconds,
            listing_capacity: settings.listing_capacity,
        }
    }
}

impl CacheConfig {
    /// Expiration applied to listing entries, if any.
    pub fn listing_ttl(&self) -> Option<Duration> {
        (self.listing_ttl_seconds > 0).then(|| Duration::from_secs(self.listing_ttl_seconds))
    }

    /// Returns the listing capacity as NonZeroUsize, clamping to 1 if zero.
    pub fn listing_capacity_non_zero(&self) -> NonZeroUsize {
        NonZeroUsize::new(self.listing_capacity).unwrap_or(NonZeroUsize::MIN)
    }
}
