//! Tagged read-through cache storage.

use std::future::Future;
use std::num::NonZeroUsize;
use std::sync::RwLock;
use std::time::Duration;

use dashmap::DashMap;
use lru::LruCache;
use metrics::{counter, histogram};
use tokio::time::Instant;
use tracing::debug;

use super::config::CacheConfig;
use super::inflight::InFlight;
use super::lock::{rw_read, rw_write};
use super::registry::TagRegistry;
use super::{
    METRIC_CACHE_COALESCED, METRIC_CACHE_COMPUTE_MS, METRIC_CACHE_EVICT, METRIC_CACHE_HIT,
    METRIC_CACHE_INVALIDATE, METRIC_CACHE_MISS,
};

const SOURCE: &str = "cache::store";

/// Cache of rendered product listing pages.
pub type ListingCache = TaggedCache<String>;

impl ListingCache {
    pub fn from_config(config: &CacheConfig) -> Self {
        Self::new("listing", config.listing_capacity_non_zero())
    }
}

struct Entry<V> {
    value: V,
    /// Tag generations observed before the value was computed.
    stamps: Vec<(String, u64)>,
    expires_at: Option<Instant>,
}

/// In-memory read-through cache with tag invalidation, expirations and
/// single-flight computation.
///
/// Each tag owns a generation counter. An entry remembers the generations of
/// its tags from before its value was computed and is served only while all of
/// them are unchanged, so invalidating a tag turns every entry carrying it into
/// a miss at the same instant. A computation that races an invalidation is
/// stored under the old generation and therefore never served.
pub struct TaggedCache<V> {
    name: &'static str,
    entries: RwLock<LruCache<String, Entry<V>>>,
    generations: DashMap<String, u64>,
    registry: TagRegistry,
    inflight: InFlight,
}

impl<V: Clone> TaggedCache<V> {
    /// Create a cache labelled `name` in metrics, holding at most `capacity` entries.
    pub fn new(name: &'static str, capacity: NonZeroUsize) -> Self {
        Self {
            name,
            entries: RwLock::new(LruCache::new(capacity)),
            generations: DashMap::new(),
            registry: TagRegistry::new(),
            inflight: InFlight::new(),
        }
    }

    /// Return the live value for `key`, if any.
    pub fn get(&self, key: &str) -> Option<V> {
        self.lookup(key)
    }

    /// Return the cached value for `key` or compute, store and return it.
    ///
    /// Concurrent callers for the same key wait for the first computation and
    /// reuse its result. Errors are returned to the caller that computed and are
    /// never stored; a waiting caller then computes on its own.
    pub async fn get_or_compute<F, Fut, E>(
        &self,
        key: &str,
        tags: &[&str],
        ttl: Option<Duration>,
        compute: F,
    ) -> Result<V, E>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<V, E>>,
    {
        if let Some(value) = self.lookup(key) {
            counter!(METRIC_CACHE_HIT, "cache" => self.name).increment(1);
            debug!(cache = self.name, key, outcome = "hit", "serving cached value");
            return Ok(value);
        }

        let _slot = self.inflight.acquire(key).await;

        if let Some(value) = self.lookup(key) {
            counter!(METRIC_CACHE_COALESCED, "cache" => self.name).increment(1);
            debug!(
                cache = self.name,
                key,
                outcome = "coalesced",
                "reusing value computed by a concurrent caller"
            );
            return Ok(value);
        }

        counter!(METRIC_CACHE_MISS, "cache" => self.name).increment(1);
        debug!(cache = self.name, key, outcome = "miss", "computing value");

        let stamps = self.stamp(tags);
        let started = Instant::now();
        let value = compute().await?;
        histogram!(METRIC_CACHE_COMPUTE_MS, "cache" => self.name)
            .record(started.elapsed().as_secs_f64() * 1000.0);

        self.insert(key, value.clone(), stamps, ttl);
        Ok(value)
    }

    /// Turn every entry tagged with `tag` into a miss for all later lookups.
    pub fn invalidate_tag(&self, tag: &str) {
        let generation = {
            let mut current = self.generations.entry(tag.to_string()).or_insert(0);
            *current += 1;
            *current
        };

        let keys = self.registry.take_tag(tag);
        {
            let mut entries = rw_write(&self.entries, SOURCE, "invalidate_tag");
            for key in &keys {
                entries.pop(key.as_str());
            }
        }

        counter!(METRIC_CACHE_INVALIDATE, "cache" => self.name).increment(1);
        debug!(
            cache = self.name,
            tag,
            generation,
            purged = keys.len(),
            "invalidated cache tag"
        );
    }

    /// Number of stored entries, including ones not yet found stale.
    pub fn len(&self) -> usize {
        rw_read(&self.entries, SOURCE, "len").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Drop every entry. Tag generations are kept so in-flight computations stay stale.
    pub fn clear(&self) {
        rw_write(&self.entries, SOURCE, "clear").clear();
        self.registry.clear();
    }

    fn lookup(&self, key: &str) -> Option<V> {
        let stale = {
            let mut entries = rw_write(&self.entries, SOURCE, "lookup");
            let live = entries.get(key).map(|entry| {
                let fresh = entry
                    .expires_at
                    .is_none_or(|expires_at| Instant::now() < expires_at);
                (fresh && self.is_current(&entry.stamps)).then(|| entry.value.clone())
            })?;
            match live {
                Some(value) => return Some(value),
                None => {
                    entries.pop(key);
                    true
                }
            }
        };

        if stale {
            self.registry.unregister(key);
        }
        None
    }

    fn insert(&self, key: &str, value: V, stamps: Vec<(String, u64)>, ttl: Option<Duration>) {
        let tags: Vec<String> = stamps.iter().map(|(tag, _)| tag.clone()).collect();
        let entry = Entry {
            value,
            stamps,
            expires_at: ttl.map(|ttl| Instant::now() + ttl),
        };

        let evicted = rw_write(&self.entries, SOURCE, "insert")
            .push(key.to_string(), entry)
            .map(|(evicted_key, _)| evicted_key)
            .filter(|evicted_key| evicted_key != key);

        if let Some(evicted_key) = evicted {
            counter!(METRIC_CACHE_EVICT, "cache" => self.name).increment(1);
            self.registry.unregister(&evicted_key);
        }
        self.registry.register(key, tags.iter().map(String::as_str));
    }

    fn stamp(&self, tags: &[&str]) -> Vec<(String, u64)> {
        tags.iter()
            .map(|tag| (tag.to_string(), self.generation(tag)))
            .collect()
    }

    fn generation(&self, tag: &str) -> u64 {
        self.generations.get(tag).map(|g| *g).unwrap_or(0)
    }

    fn is_current(&self, stamps: &[(String, u64)]) -> bool {
        stamps
            .iter()
            .all(|(tag, generation)| self.generation(tag) == *generation)
    }
}
