use dashmap::DashMap;
use std::hash::Hash;
use std::sync::Arc;
use tokio::sync::{Mutex, OwnedMutexGuard};

type LockMap<K> = DashMap<K, Arc<Mutex<()>>>;

/// One async mutex per key, created on first use and dropped with its last
/// holder.
///
/// Work on the same key is serialized; different keys never contend.
#[derive(Debug)]
pub struct KeyedLocks<K: Eq + Hash> {
    locks: Arc<LockMap<K>>,
}

impl<K: Eq + Hash> Default for KeyedLocks<K> {
    fn default() -> Self {
        Self {
            locks: Arc::new(DashMap::new()),
        }
    }
}

impl<K: Eq + Hash + Clone> KeyedLocks<K> {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn lock(&self, key: &K) -> KeyedGuard<K> {
        // Clone the Arc out so the map shard is released before awaiting.
        let lock = self.locks.entry(key.clone()).or_default().clone();
        let guard = lock.lock_owned().await;
        KeyedGuard {
            guard: Some(guard),
            key: key.clone(),
            locks: Arc::clone(&self.locks),
        }
    }
}

/// Exclusive hold on one key of a [`KeyedLocks`].
pub struct KeyedGuard<K: Eq + Hash> {
    guard: Option<OwnedMutexGuard<()>>,
    key: K,
    locks: Arc<LockMap<K>>,
}

impl<K: Eq + Hash> Drop for KeyedGuard<K> {
    fn drop(&mut self) {
        drop(self.guard.take());
        // Waiters hold their own clone, so the entry only goes once nobody wants the key.
        self.locks.remove_if(&self.key, |_, lock| Arc::strong_count(lock) == 1);
    }
}
