//! Bidirectional tag registry.
//!
//! Tracks which cache keys carry which tags so that invalidating a tag can
//! purge every affected entry from memory.

use std::collections::{HashMap, HashSet};
use std::sync::RwLock;

use super::lock::{rw_read, rw_write};

const SOURCE: &str = "cache::registry";

/// Tracks tag → keys and key → tags mappings.
pub struct TagRegistry {
    tag_to_keys: RwLock<HashMap<String, HashSet<String>>>,
    key_to_tags: RwLock<HashMap<String, HashSet<String>>>,
}

impl TagRegistry {
    /// Create a new empty registry.
    pub fn new() -> Self {
        Self {
            tag_to_keys: RwLock::new(HashMap::new()),
            key_to_tags: RwLock::new(HashMap::new()),
        }
    }

    /// Register a cache key under its tags, replacing any previous tag set for the key.
    pub fn register<'a>(&self, key: &str, tags: impl IntoIterator<Item = &'a str>) {
        let mut t2k = rw_write(&self.tag_to_keys, SOURCE, "register.tag_to_keys");
        let mut k2t = rw_write(&self.key_to_tags, SOURCE, "register.key_to_tags");

        let tags: HashSet<String> = tags.into_iter().map(str::to_string).collect();
        if let Some(previous) = k2t.get(key) {
            for stale in previous.difference(&tags) {
                detach(&mut t2k, stale, key);
            }
        }
        for tag in &tags {
            t2k.entry(tag.clone()).or_default().insert(key.to_string());
        }
        k2t.insert(key.to_string(), tags);
    }

    /// All keys currently registered under `tag`.
    pub fn keys_for_tag(&self, tag: &str) -> HashSet<String> {
        rw_read(&self.tag_to_keys, SOURCE, "keys_for_tag")
            .get(tag)
            .cloned()
            .unwrap_or_default()
    }

    /// Forget a key, e.g. after it was evicted or found stale.
    pub fn unregister(&self, key: &str) {
        let mut t2k = rw_write(&self.tag_to_keys, SOURCE, "unregister.tag_to_keys");
        let mut k2t = rw_write(&self.key_to_tags, SOURCE, "unregister.key_to_tags");

        if let Some(tags) = k2t.remove(key) {
            for tag in tags {
                detach(&mut t2k, &tag, key);
            }
        }
    }

    /// Remove a tag and every key registered under it.
    ///
    /// Returns the keys that were registered under the tag.
    pub fn take_tag(&self, tag: &str) -> HashSet<String> {
        let mut t2k = rw_write(&self.tag_to_keys, SOURCE, "take_tag.tag_to_keys");
        let mut k2t = rw_write(&self.key_to_tags, SOURCE, "take_tag.key_to_tags");

        let keys = t2k.remove(tag).unwrap_or_default();
        for key in &keys {
            if let Some(tags) = k2t.remove(key) {
                for other in tags.iter().filter(|other| other.as_str() != tag) {
                    detach(&mut t2k, other, key);
                }
            }
        }
        keys
    }

    /// Clear all mappings.
    pub fn clear(&self) {
        rw_write(&self.tag_to_keys, SOURCE, "clear.tag_to_keys").clear();
        rw_write(&self.key_to_tags, SOURCE, "clear.key_to_tags").clear();
    }

    pub fn tag_count(&self) -> usize {
        rw_read(&self.tag_to_keys, SOURCE, "tag_count").len()
    }

    pub fn key_count(&self) -> usize {
        rw_read(&self.key_to_tags, SOURCE, "key_count").len()
    }
}

impl Default for TagRegistry {
    fn default() -> Self {
        Self::new()
    }
}

fn detach(t2k: &mut HashMap<String, HashSet<String>>, tag: &str, key: &str) {
    if let Some(keys) = t2k.get_mut(tag) {
        keys.remove(key);
        if keys.is_empty() {
            t2k.remove(tag);
        }
    }
}
