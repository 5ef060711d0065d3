use std::{future::Future, sync::Arc, time::Duration};

use parking_lot::Mutex;
use rustc_hash::FxHashMap;
use tokio::{sync::Mutex as AsyncMutex, time::Instant};
use tracing::debug;

#[derive(Clone, Debug)]
struct Entry<V> {
    value: V,
    fetched_at: Instant,
}

impl<V> Entry<V> {
    fn new(value: V) -> Self {
        Self {
            value,
            fetched_at: Instant::now(),
        }
    }

    fn is_stale(&self, ttl: Duration) -> bool {
        self.fetched_at.elapsed() > ttl
    }
}

type Slot<V> = Arc<AsyncMutex<Option<Entry<V>>>>;

/// A keyed cache whose entries expire `ttl` after they were fetched.
///
/// Each key has its own async lock, so concurrent callers asking for the same
/// missing key wait for a single fetch while other keys proceed in parallel.
/// A failed fetch leaves the slot empty and is retried by the next caller.
/// Expired and empty slots are evicted whenever a new key is added.
pub struct TtlCache<V> {
    ttl: Duration,
    slots: Mutex<FxHashMap<String, Slot<V>>>,
}

impl<V: Clone> TtlCache<V> {
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            slots: Mutex::new(FxHashMap::default()),
        }
    }

    fn slot(&self, key: &str) -> Slot<V> {
        let mut slots = self.slots.lock();
        if let Some(slot) = slots.get(key) {
            return slot.clone();
        }

        // A slot referenced only by the map has no caller waiting on it.
        let ttl = self.ttl;
        let before = slots.len();
        slots.retain(|_, slot| {
            Arc::strong_count(slot) > 1
                || slot
                    .try_lock()
                    .is_ok_and(|entry| entry.as_ref().is_some_and(|e| !e.is_stale(ttl)))
        });
        if slots.len() < before {
            debug!(evicted = before - slots.len(), "evicted expired cache entries");
        }

        slots.entry(key.to_owned()).or_default().clone()
    }

    /// Returns the fresh value for `key`, running `init` to fetch it when the
    /// entry is missing or expired.
    pub async fn get_or_try_insert_with<F, Fut, E>(&self, key: &str, init: F) -> Result<V, E>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<V, E>>,
    {
        let slot = self.slot(key);
        let mut guard = slot.lock().await;

        if let Some(entry) = guard.as_ref()
            && !entry.is_stale(self.ttl)
        {
            debug!(key, "cache hit");
            return Ok(entry.value.clone());
        }

        debug!(key, "cache miss");
        let value = init().await?;
        *guard = Some(Entry::new(value.clone()));
        Ok(value)
    }

    #[cfg(test)]
    fn len(&self) -> usize {
        self.slots.lock().len()
    }
}
