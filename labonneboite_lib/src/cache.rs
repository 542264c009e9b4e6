//! Bounded in-memory memoization cache backed by `DashMap` for concurrent access.

use dashmap::DashMap;
use std::hash::Hash;
use std::sync::atomic::{AtomicU64, Ordering};

/// A single cached value with the logical time it was last read or written.
struct CacheEntry<V> {
    value: V,
    last_used: AtomicU64,
}

/// Hit/miss counters and current size of a cache.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    pub len: usize,
    pub capacity: usize,
}

impl CacheStats {
    pub fn hit_ratio(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }
}

/// Thread-safe fixed-capacity cache with least-recently-used eviction.
///
/// When an insert would exceed the capacity, the least recently used eighth of
/// the entries is dropped in one pass. Concurrent fills of the same key are
/// allowed: the last write wins, which is harmless because every cached
/// function in this crate is pure.
pub struct BoundedCache<K, V> {
    store: DashMap<K, CacheEntry<V>>,
    capacity: usize,
    clock: AtomicU64,
    hits: AtomicU64,
    misses: AtomicU64,
}

impl<K, V> BoundedCache<K, V>
where
    K: Eq + Hash + Clone,
    V: Clone,
{
    /// Creates a cache holding at most `capacity` entries (minimum 1).
    pub fn new(capacity: usize) -> Self {
        Self {
            store: DashMap::new(),
            capacity: capacity.max(1),
            clock: AtomicU64::new(0),
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
        }
    }

    fn tick(&self) -> u64 {
        self.clock.fetch_add(1, Ordering::Relaxed)
    }

    /// Returns the cached value for `key` and marks it as recently used.
    pub fn get(&self, key: &K) -> Option<V> {
        match self.store.get(key) {
            Some(entry) => {
                entry.last_used.store(self.tick(), Ordering::Relaxed);
                self.hits.fetch_add(1, Ordering::Relaxed);
                Some(entry.value.clone())
            }
            None => {
                self.misses.fetch_add(1, Ordering::Relaxed);
                None
            }
        }
    }

    /// Inserts or overwrites an entry, evicting old entries first if full.
    pub fn insert(&self, key: K, value: V) {
        if self.store.len() >= self.capacity && !self.store.contains_key(&key) {
            self.evict();
        }
        self.store.insert(
            key,
            CacheEntry {
                value,
                last_used: AtomicU64::new(self.tick()),
            },
        );
    }

    /// Returns the cached value or computes, stores and returns it.
    /// Errors are returned as-is and never cached.
    pub fn get_or_try_insert_with<E, F>(&self, key: K, compute: F) -> Result<V, E>
    where
        F: FnOnce() -> Result<V, E>,
    {
        if let Some(value) = self.get(&key) {
            return Ok(value);
        }
        let value = compute()?;
        self.insert(key, value.clone());
        Ok(value)
    }

    fn evict(&self) {
        let keep = self.capacity - (self.capacity / 8).max(1);
        let mut stamps: Vec<(K, u64)> = self
            .store
            .iter()
            .map(|entry| (entry.key().clone(), entry.value().last_used.load(Ordering::Relaxed)))
            .collect();
        let excess = stamps.len().saturating_sub(keep);
        if excess == 0 {
            return;
        }
        stamps.sort_unstable_by_key(|(_, stamp)| *stamp);
        for (key, _) in stamps.into_iter().take(excess) {
            self.store.remove(&key);
        }
        tracing::debug!(evicted = excess, capacity = self.capacity, "cache eviction");
    }

    pub fn contains_key(&self, key: &K) -> bool {
        self.store.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.store.len()
    }

    pub fn is_empty(&self) -> bool {
        self.store.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Removes all entries. Counters are kept.
    pub fn clear(&self) {
        self.store.clear();
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            len: self.store.len(),
            capacity: self.capacity,
        }
    }
}
