//! LRU + byte-budget result cache with per-dataset invalidation, layered on
//! top of [`TtlCache`]'s `DashMap`-backed storage model.

use std::collections::HashSet;
use std::hash::Hash;
use std::sync::Arc;
use std::time::{Duration, Instant};

use dashmap::DashMap;

/// A cached query result entry: the serialized payload plus enough metadata
/// to run LRU-by-size eviction and dataset-scoped invalidation.
#[derive(Clone)]
struct Entry<V> {
    value: V,
    byte_size: usize,
    inserted_at: Instant,
    last_access: Instant,
    dataset_id: String,
}

/// Result cache keyed by a query fingerprint `K` (e.g. `setu-compiler`'s
/// `Fingerprint`), storing values of type `V` (e.g. an encoded `QueryResult`).
///
/// Bounds total storage by `max_bytes`; when an insert would exceed the
/// budget, the least-recently-accessed entries are evicted first. A
/// `dataset_id -> HashSet<K>` secondary index lets `invalidate_dataset`
/// drop every cached result for a dataset in one pass, without scanning the
/// whole cache.
pub struct ResultCache<K, V> {
    entries: DashMap<K, Entry<V>>,
    dataset_index: DashMap<String, HashSet<K>>,
    ttl: Duration,
    max_bytes: usize,
    current_bytes: std::sync::atomic::AtomicUsize,
}

impl<K, V> ResultCache<K, V>
where
    K: Eq + Hash + Clone + Send + Sync + 'static,
    V: Clone + Send + Sync + 'static,
{
    pub fn new(ttl: Duration, max_bytes: usize) -> Self {
        Self {
            entries: DashMap::new(),
            dataset_index: DashMap::new(),
            ttl,
            max_bytes,
            current_bytes: std::sync::atomic::AtomicUsize::new(0),
        }
    }

    /// Look up a cached value, evicting it if expired.
    pub fn get(&self, key: &K) -> Option<V> {
        let mut expired = false;
        let result = self.entries.get_mut(key).and_then(|mut entry| {
            if entry.inserted_at.elapsed() >= self.ttl {
                expired = true;
                None
            } else {
                entry.last_access = Instant::now();
                Some(entry.value.clone())
            }
        });
        if expired {
            self.remove(key);
        }
        result
    }

    /// Insert a value, running byte-budget eviction first if needed.
    pub fn insert(&self, key: K, value: V, byte_size: usize, dataset_id: impl Into<String>) {
        let dataset_id = dataset_id.into();
        self.evict_to_fit(byte_size);

        let now = Instant::now();
        if let Some(old) = self.entries.insert(
            key.clone(),
            Entry {
                value,
                byte_size,
                inserted_at: now,
                last_access: now,
                dataset_id: dataset_id.clone(),
            },
        ) {
            self.current_bytes
                .fetch_sub(old.byte_size, std::sync::atomic::Ordering::Relaxed);
            if old.dataset_id != dataset_id {
                if let Some(mut set) = self.dataset_index.get_mut(&old.dataset_id) {
                    set.remove(&key);
                }
            }
        }
        self.current_bytes
            .fetch_add(byte_size, std::sync::atomic::Ordering::Relaxed);
        self.dataset_index
            .entry(dataset_id)
            .or_default()
            .insert(key);
    }

    pub fn remove(&self, key: &K) {
        if let Some((_, entry)) = self.entries.remove(key) {
            self.current_bytes
                .fetch_sub(entry.byte_size, std::sync::atomic::Ordering::Relaxed);
            if let Some(mut set) = self.dataset_index.get_mut(&entry.dataset_id) {
                set.remove(key);
            }
        }
    }

    /// Drop every cached result belonging to a dataset (e.g. on catalog
    /// reload or explicit cache-bust).
    pub fn invalidate_dataset(&self, dataset_id: &str) {
        if let Some((_, keys)) = self.dataset_index.remove(dataset_id) {
            for key in keys {
                if let Some((_, entry)) = self.entries.remove(&key) {
                    self.current_bytes
                        .fetch_sub(entry.byte_size, std::sync::atomic::Ordering::Relaxed);
                }
            }
        }
    }

    pub fn evict_expired(&self) {
        let ttl = self.ttl;
        let mut freed = 0usize;
        self.entries.retain(|_, entry| {
            let keep = entry.inserted_at.elapsed() < ttl;
            if !keep {
                freed += entry.byte_size;
            }
            keep
        });
        if freed > 0 {
            self.current_bytes
                .fetch_sub(freed, std::sync::atomic::Ordering::Relaxed);
        }
        // dataset_index may now contain stale keys pointing at removed
        // entries; the invariant only needs to hold for invalidate/insert,
        // so a lazy prune here is not required for correctness.
    }

    pub fn current_bytes(&self) -> usize {
        self.current_bytes.load(std::sync::atomic::Ordering::Relaxed)
    }

    /// Evict least-recently-accessed entries until `incoming_bytes` fits
    /// within the budget.
    fn evict_to_fit(&self, incoming_bytes: usize) {
        if incoming_bytes > self.max_bytes {
            return; // cannot fit regardless; caller's insert will simply exceed budget
        }
        while self.current_bytes() + incoming_bytes > self.max_bytes {
            let oldest = self
                .entries
                .iter()
                .min_by_key(|e| e.last_access)
                .map(|e| e.key().clone());
            match oldest {
                Some(key) => self.remove(&key),
                None => break,
            }
        }
    }
}

/// Object-safe handle to a cache's expired-entry sweep, so `setu-scheduler`
/// can hold a `Vec<Arc<dyn Sweepable>>` without naming each `ResultCache<K,
/// V>`'s concrete key/value types.
pub trait Sweepable: Send + Sync {
    fn sweep(&self);
}

impl<K, V> Sweepable for ResultCache<K, V>
where
    K: Eq + Hash + Clone + Send + Sync + 'static,
    V: Clone + Send + Sync + 'static,
{
    fn sweep(&self) {
        self.evict_expired();
    }
}

/// Per-key single-flight coalescing: concurrent requests for the same key
/// wait on one in-flight computation instead of duplicating upstream work.
///
/// Each key gets a `tokio::sync::Notify` lane. The first caller to register
/// becomes the leader and runs the supplied future; followers wait on the
/// lane's `Notify` and then re-check the cache (passed in by the caller via
/// `check_cache`). If the leader's lane is dropped without a notification
/// (leader panicked or was cancelled), followers time out their wait and
/// retry as a new leader.
pub struct SingleFlightGroup<K> {
    lanes: DashMap<K, Arc<tokio::sync::Notify>>,
}

impl<K> SingleFlightGroup<K>
where
    K: Eq + Hash + Clone + Send + Sync + 'static,
{
    pub fn new() -> Self {
        Self {
            lanes: DashMap::new(),
        }
    }

    /// Run `compute` for `key`, coalescing concurrent callers.
    ///
    /// `check_cache` is called by followers after being woken (or timing
    /// out) to see whether the leader already populated the result; if it
    /// returns `Some`, that value short-circuits a redundant `compute` call.
    pub async fn run<F, Fut, C, T>(&self, key: K, check_cache: C, compute: F) -> T
    where
        F: FnOnce() -> Fut,
        Fut: std::future::Future<Output = T>,
        C: Fn() -> Option<T>,
    {
        loop {
            if let Some(cached) = check_cache() {
                return cached;
            }

            let (notify, is_leader) = match self.lanes.entry(key.clone()) {
                dashmap::mapref::entry::Entry::Occupied(entry) => (entry.get().clone(), false),
                dashmap::mapref::entry::Entry::Vacant(entry) => {
                    let notify = Arc::new(tokio::sync::Notify::new());
                    entry.insert(notify.clone());
                    (notify, true)
                }
            };

            if is_leader {
                let result = compute().await;
                self.lanes.remove(&key);
                notify.notify_waiters();
                return result;
            }

            // Follower: wait for the leader to finish, bounded so a leader
            // failure (panic, cancellation) can't wedge followers forever.
            let waited = tokio::time::timeout(Duration::from_secs(30), notify.notified()).await;
            if waited.is_err() {
                // Leader lane vanished without notifying; promote ourselves
                // and retry from the top (becoming the new leader if the
                // lane is still gone).
                continue;
            }
        }
    }
}

impl<K> Default for SingleFlightGroup<K>
where
    K: Eq + Hash + Clone + Send + Sync + 'static,
{
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn insert_and_get_round_trips() {
        let cache: ResultCache<String, Vec<u8>> = ResultCache::new(Duration::from_secs(60), 1024);
        cache.insert("q1".to_string(), vec![1, 2, 3], 3, "orders");
        assert_eq!(cache.get(&"q1".to_string()), Some(vec![1, 2, 3]));
    }

    #[test]
    fn invalidate_dataset_drops_all_its_entries() {
        let cache: ResultCache<String, Vec<u8>> = ResultCache::new(Duration::from_secs(60), 1024);
        cache.insert("q1".to_string(), vec![1], 1, "orders");
        cache.insert("q2".to_string(), vec![2], 1, "orders");
        cache.insert("q3".to_string(), vec![3], 1, "users");
        cache.invalidate_dataset("orders");
        assert!(cache.get(&"q1".to_string()).is_none());
        assert!(cache.get(&"q2".to_string()).is_none());
        assert_eq!(cache.get(&"q3".to_string()), Some(vec![3]));
    }

    #[test]
    fn byte_budget_evicts_least_recently_accessed() {
        let cache: ResultCache<String, Vec<u8>> = ResultCache::new(Duration::from_secs(60), 10);
        cache.insert("a".to_string(), vec![0; 5], 5, "d");
        cache.insert("b".to_string(), vec![0; 5], 5, "d");
        // touch "b" so "a" becomes the least-recently-accessed entry
        cache.get(&"b".to_string());
        cache.insert("c".to_string(), vec![0; 5], 5, "d");
        assert!(cache.get(&"a".to_string()).is_none());
        assert!(cache.get(&"b".to_string()).is_some());
        assert!(cache.get(&"c".to_string()).is_some());
    }

    #[tokio::test]
    async fn single_flight_coalesces_concurrent_callers() {
        use std::sync::atomic::{AtomicUsize, Ordering};

        let group: Arc<SingleFlightGroup<String>> = Arc::new(SingleFlightGroup::new());
        let calls = Arc::new(AtomicUsize::new(0));
        let cached: Arc<DashMap<String, u32>> = Arc::new(DashMap::new());

        let mut handles = Vec::new();
        for _ in 0..8 {
            let group = group.clone();
            let calls = calls.clone();
            let cached = cached.clone();
            handles.push(tokio::spawn(async move {
                group
                    .run(
                        "k".to_string(),
                        || cached.get("k").map(|v| *v),
                        || {
                            let calls = calls.clone();
                            let cached = cached.clone();
                            async move {
                                calls.fetch_add(1, Ordering::SeqCst);
                                tokio::time::sleep(Duration::from_millis(20)).await;
                                cached.insert("k".to_string(), 42);
                                42
                            }
                        },
                    )
                    .await
            }));
        }

        for handle in handles {
            assert_eq!(handle.await.unwrap(), 42);
        }
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
