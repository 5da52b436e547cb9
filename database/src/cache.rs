use lru::LruCache;
use parking_lot::Mutex;
use std::{collections::hash_map::RandomState, hash::BuildHasher, num::NonZeroUsize, sync::Arc};

/// Sizing policy of a store cache. Capacities count entries.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CachePolicy {
    /// No caching at all
    Empty,
    /// Up to `n` entries, with map storage growing on demand
    Count(usize),
    /// Up to `n` entries, with map storage allocated upfront
    Preallocated(usize),
}

impl CachePolicy {
    pub fn capacity(&self) -> usize {
        match *self {
            CachePolicy::Empty => 0,
            CachePolicy::Count(n) | CachePolicy::Preallocated(n) => n,
        }
    }

    pub fn prealloc(&self) -> bool {
        matches!(self, CachePolicy::Preallocated(_))
    }
}

/// A thread-safe least-recently-used cache. Clones share the same underlying storage.
#[derive(Clone)]
pub struct Cache<TKey, TData, S = RandomState>
where
    TKey: Clone + std::hash::Hash + Eq + Send + Sync,
    TData: Clone + Send + Sync,
{
    inner: Arc<Mutex<LruCache<TKey, TData, S>>>,
    capacity: usize,
}

impl<TKey, TData, S> Cache<TKey, TData, S>
where
    TKey: Clone + std::hash::Hash + Eq + Send + Sync,
    TData: Clone + Send + Sync,
    S: BuildHasher + Default,
{
    pub fn new(policy: CachePolicy) -> Self {
        let capacity = policy.capacity();
        let lru = match NonZeroUsize::new(capacity) {
            Some(cap) if policy.prealloc() => LruCache::with_hasher(cap, S::default()),
            // Bounded manually on insertion, see `insert_impl`
            _ => LruCache::unbounded_with_hasher(S::default()),
        };
        Self { inner: Arc::new(Mutex::new(lru)), capacity }
    }

    /// Returns a clone of the cached value and marks it as most recently used
    pub fn get(&self, key: &TKey) -> Option<TData> {
        if self.capacity == 0 {
            return None;
        }
        self.inner.lock().get(key).cloned()
    }

    pub fn contains_key(&self, key: &TKey) -> bool {
        if self.capacity == 0 {
            return false;
        }
        self.inner.lock().contains(key)
    }

    fn insert_impl(&self, inner: &mut LruCache<TKey, TData, S>, key: TKey, data: TData) {
        inner.put(key, data);
        while inner.len() > self.capacity {
            inner.pop_lru();
        }
    }

    pub fn insert(&self, key: TKey, data: TData) {
        if self.capacity == 0 {
            return;
        }
        let mut guard = self.inner.lock();
        self.insert_impl(&mut guard, key, data);
    }

    pub fn len(&self) -> usize {
        self.inner.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
