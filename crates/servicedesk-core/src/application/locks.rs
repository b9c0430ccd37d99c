//! Per-aggregate write serialization
//!
//! One async mutex per key. Writers to different tickets (or teams) never
//! contend; two writers to the same key run one after the other. An entry
//! lives only while someone holds or waits for it.

use dashmap::DashMap;
use std::hash::Hash;
use std::sync::Arc;
use tokio::sync::{Mutex, OwnedMutexGuard};

use crate::domain::value_objects::TicketId;

/// Locks keyed by ticket id.
pub type TicketLocks = KeyedLocks<TicketId>;

/// Locks keyed by team id.
pub type TeamLocks = KeyedLocks<String>;

pub struct KeyedLocks<K: Eq + Hash> {
    locks: DashMap<K, Arc<Mutex<()>>>,
}

impl<K: Eq + Hash> Default for KeyedLocks<K> {
    fn default() -> Self {
        Self { locks: DashMap::new() }
    }
}

impl<K: Eq + Hash + Clone> KeyedLocks<K> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Wait for exclusive access to `key`. Released when the guard drops.
    pub async fn acquire(&self, key: &K) -> KeyGuard<'_, K> {
        // The shard guard is released before awaiting.
        let lock = self.locks.entry(key.clone()).or_default().clone();
        let guard = lock.lock_owned().await;

        KeyGuard {
            locks: self,
            key: key.clone(),
            guard: Some(guard),
        }
    }

    /// Number of keys currently held or waited on.
    pub fn len(&self) -> usize {
        self.locks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.locks.is_empty()
    }
}

/// Exclusive access to one key. Dropping it releases the mutex and removes
/// the entry when nobody else is waiting.
pub struct KeyGuard<'a, K: Eq + Hash> {
    locks: &'a KeyedLocks<K>,
    key: K,
    guard: Option<OwnedMutexGuard<()>>,
}

impl<K: Eq + Hash> Drop for KeyGuard<'_, K> {
    fn drop(&mut self) {
        // Release first so the map holds the only remaining reference.
        drop(self.guard.take());
        // Waiters clone the Arc under the shard lock, so a count of one here
        // means no one can be queued on this mutex.
        self.locks
            .locks
            .remove_if(&self.key, |_, lock| Arc::strong_count(lock) == 1);
    }
}
