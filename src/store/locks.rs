//! Keyed write locks.
//!
//! Writes that check a uniqueness rule and then insert run under the lock
//! for their key, so two callers with the same key cannot both pass the
//! check. Entries are dropped once nobody holds or waits on them.

use std::hash::Hash;
use std::sync::{Arc, Mutex, PoisonError};

use dashmap::DashMap;

#[derive(Debug)]
pub struct KeyedLocks<K: Eq + Hash> {
    locks: Arc<DashMap<K, Arc<Mutex<()>>>>,
}

impl<K: Eq + Hash> Clone for KeyedLocks<K> {
    fn clone(&self) -> Self {
        Self {
            locks: Arc::clone(&self.locks),
        }
    }
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

    /// Run `f` while holding the lock for `key`.
    ///
    /// The mutex guards no data, so a poisoned lock is taken over as is.
    pub fn with<T>(&self, key: K, f: impl FnOnce() -> T) -> T {
        // clone out so the shard lock is released before we block
        let lock = self.locks.entry(key.clone()).or_default().clone();
        let out = {
            let _guard = lock.lock().unwrap_or_else(PoisonError::into_inner);
            f()
        };
        drop(lock);
        // only the map's own handle left: nobody holds or waits on it
        self.locks
            .remove_if(&key, |_, held| Arc::strong_count(held) == 1);
        out
    }

    /// Number of keys with a live lock entry.
    pub fn len(&self) -> usize {
        self.locks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.locks.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Barrier;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn entries_are_released_after_use() {
        let locks = KeyedLocks::new();
        assert_eq!(locks.with(7u64, || 42), 42);
        locks.with(8u64, || ());
        assert!(locks.is_empty());
    }

    #[test]
    fn same_key_is_exclusive() {
        let locks = KeyedLocks::new();
        let inside = Arc::new(AtomicUsize::new(0));
        let barrier = Arc::new(Barrier::new(8));

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let locks = locks.clone();
                let inside = Arc::clone(&inside);
                let barrier = Arc::clone(&barrier);
                std::thread::spawn(move || {
                    barrier.wait();
                    for _ in 0..100 {
                        locks.with("key", || {
                            assert_eq!(inside.fetch_add(1, Ordering::SeqCst), 0);
                            std::thread::yield_now();
                            inside.fetch_sub(1, Ordering::SeqCst);
                        });
                    }
                })
            })
            .collect();
        for h in handles {
            h.join().unwrap();
        }
        assert!(locks.is_empty());
    }

    #[test]
    fn poisoned_lock_is_recovered() {
        let locks = KeyedLocks::new();
        let cloned = locks.clone();
        let panicked = std::thread::spawn(move || {
            cloned.with(1u8, || panic!("writer failed"));
        })
        .join();
        assert!(panicked.is_err());
        assert_eq!(locks.with(1u8, || "ok"), "ok");
    }
}
