// Sharded keyed-lock map (spec §5): a fixed power-of-two number of
// shards, each guarding a map from key to a lightweight per-key lock. A
// worker acquires the shard briefly to fetch-or-insert the per-key lock,
// releases the shard, then holds only the per-key lock across the
// critical section.
//
// This generalizes the teacher's thread-indexed bitset locks
// (daemon/src/core/executor/account_locks.rs, `ThreadSet` /
// `AccountWriteLock`) from *per-thread* slots bounded at 64 to
// *per-shard* buckets sized by `shard_count`, and swaps the lock-free
// bitset (which only needs to track up to 64 thread ids) for a real
// `tokio::sync::Mutex` per key, since here the "threads" are unbounded
// worker-pool tasks rather than a fixed set of executor lanes.

use std::collections::hash_map::DefaultHasher;
use std::collections::HashMap;
use std::hash::{Hash, Hasher};
use std::sync::{Arc, Mutex};
use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};

pub struct ShardedLockMap<K> {
    shards: Vec<Mutex<HashMap<K, Arc<AsyncMutex<()>>>>>,
    mask: usize,
}

impl<K> ShardedLockMap<K>
where
    K: Hash + Eq + Clone,
{
    pub fn new(shard_count: usize) -> Self {
        let shard_count = shard_count.max(1).next_power_of_two();
        let shards = (0..shard_count).map(|_| Mutex::new(HashMap::new())).collect();
        ShardedLockMap {
            shards,
            mask: shard_count - 1,
        }
    }

    fn shard_index(&self, key: &K) -> usize {
        let mut hasher = DefaultHasher::new();
        key.hash(&mut hasher);
        (hasher.finish() as usize) & self.mask
    }

    /// Acquire the exclusive, owned guard for `key`. Holding the guard
    /// is the "serialization token" of spec §4.3: release it (drop the
    /// guard) when the credit's steps 1–9 are done.
    pub async fn acquire(&self, key: K) -> OwnedMutexGuard<()> {
        let idx = self.shard_index(&key);
        let per_key_lock = {
            let mut shard = self.shards[idx].lock().expect("shard lock poisoned");
            shard
                .entry(key)
                .or_insert_with(|| Arc::new(AsyncMutex::new(())))
                .clone()
        };
        per_key_lock.lock_owned().await
    }

    /// Number of shards actually allocated (always a power of two).
    pub fn shard_count(&self) -> usize {
        self.mask + 1
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use reward_common::id::UserId;
    use std::sync::atomic::{AtomicU32, Ordering};

    #[test]
    fn shard_count_rounds_up_to_power_of_two() {
        let map: ShardedLockMap<UserId> = ShardedLockMap::new(5);
        assert_eq!(map.shard_count(), 8);
    }

    #[tokio::test]
    async fn serializes_access_to_the_same_key() {
        let map = Arc::new(ShardedLockMap::<UserId>::new(4));
        let user = UserId::from_bytes_lossy(b"contended");
        let counter = Arc::new(AtomicU32::new(0));
        let mut handles = Vec::new();

        for _ in 0..50 {
            let map = map.clone();
            let counter = counter.clone();
            handles.push(tokio::spawn(async move {
                let _guard = map.acquire(user).await;
                let before = counter.load(Ordering::SeqCst);
                tokio::task::yield_now().await;
                counter.store(before + 1, Ordering::SeqCst);
            }));
        }
        for h in handles {
            h.await.unwrap();
        }
        assert_eq!(counter.load(Ordering::SeqCst), 50);
    }

    #[tokio::test]
    async fn distinct_keys_do_not_block_each_other() {
        let map = Arc::new(ShardedLockMap::<UserId>::new(4));
        let a = UserId::from_bytes_lossy(b"a");
        let b = UserId::from_bytes_lossy(b"b");
        let guard_a = map.acquire(a).await;
        // Must not deadlock: b's lock is independent of a's.
        let _guard_b = map.acquire(b).await;
        drop(guard_a);
    }
}
