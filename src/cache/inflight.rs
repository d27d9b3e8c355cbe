//! Per-key single-flight slots.
//!
//! A caller that misses the cache holds the slot for its key while it computes;
//! concurrent callers for the same key wait on the slot and then re-check the
//! cache instead of computing again.

use std::sync::Arc;

use dashmap::DashMap;
use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};

type Slots = Arc<DashMap<String, Arc<AsyncMutex<()>>>>;

#[derive(Default, Clone)]
pub(crate) struct InFlight {
    slots: Slots,
}

impl InFlight {
    pub(crate) fn new() -> Self {
        Self {
            slots: Arc::new(DashMap::new()),
        }
    }

    /// Wait until no other caller computes `key`, then hold the slot.
    pub(crate) async fn acquire(&self, key: &str) -> SlotGuard {
        let slot = Arc::clone(self.slots.entry(key.to_string()).or_default().value());
        let guard = slot.lock_owned().await;
        SlotGuard {
            key: key.to_string(),
            guard: Some(guard),
            slots: Arc::clone(&self.slots),
        }
    }

    #[cfg(test)]
    pub(crate) fn len(&self) -> usize {
        self.slots.len()
    }
}

pub(crate) struct SlotGuard {
    key: String,
    guard: Option<OwnedMutexGuard<()>>,
    slots: Slots,
}

impl Drop for SlotGuard {
    fn drop(&mut self) {
        // Release the slot before checking whether anyone else still references it.
        self.guard.take();
        self.slots
            .remove_if(&self.key, |_, slot| Arc::strong_count(slot) == 1);
    }
}
