use std::collections::HashMap;
use std::hash::Hash;
use std::sync::{Arc, Mutex};

use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};

/// Per-key async mutex map.
///
/// Serializes check-then-act sequences on a single contended resource
/// (one queue requester, one team, one competition) while leaving unrelated
/// keys fully parallel. Idle entries are pruned on the next acquire, so the
/// map tracks contended keys rather than every key ever touched.
pub struct KeyedLock<K> {
    entries: Mutex<HashMap<K, Arc<AsyncMutex<()>>>>,
}

impl<K> KeyedLock<K>
where
    K: Eq + Hash + Clone,
{
    pub fn new() -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
        }
    }

    /// Waits for and returns the guard for `key`. The guard releases the key
    /// on drop.
    pub async fn acquire(&self, key: K) -> OwnedMutexGuard<()> {
        let entry = {
            let mut entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
            // A strong count of 1 means only the map still holds the entry:
            // no guard is live and nobody is waiting on it.
            entries.retain(|_, lock| Arc::strong_count(lock) > 1);
            Arc::clone(entries.entry(key).or_insert_with(|| Arc::new(AsyncMutex::new(()))))
        };

        entry.lock_owned().await
    }
}

impl<K> Default for KeyedLock<K>
where
    K: Eq + Hash + Clone,
{
    fn default() -> Self {
        Self::new()
    }
}
