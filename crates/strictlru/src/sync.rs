//! Shared handle serializing access to one [`LruCache`]
//!
//! The cache itself has no internal locking. This wrapper puts the whole
//! cache behind a single mutex so every operation, reads included (they
//! reorder the recency list), runs exclusively.

use std::borrow::Borrow;
use std::fmt;
use std::hash::{BuildHasher, Hash};
use std::sync::Arc;

use ahash::RandomState;
use parking_lot::Mutex;

use crate::error::Result;
use crate::lru::LruCache;
use crate::stats::CacheStats;

/// Cloneable, thread-safe handle to an LRU cache
pub struct SharedLruCache<K, V, S = RandomState> {
    inner: Arc<Mutex<LruCache<K, V, S>>>,
}

impl<K, V> SharedLruCache<K, V, RandomState>
where
    K: Hash + Eq + Clone,
{
    /// Create a new shared cache with the given capacity
    pub fn new<C>(capacity: C) -> Result<Self>
    where
        C: TryInto<usize> + fmt::Display + Copy,
    {
        Ok(Self::from_cache(LruCache::new(capacity)?))
    }
}

impl<K, V, S> SharedLruCache<K, V, S>
where
    K: Hash + Eq + Clone,
    S: BuildHasher,
{
    /// Share an existing cache
    pub fn from_cache(cache: LruCache<K, V, S>) -> Self {
        Self {
            inner: Arc::new(Mutex::new(cache)),
        }
    }

    /// Get a copy of a value, marking it most recently used
    pub fn get<Q>(&self, key: &Q) -> Option<V>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
        V: Clone,
    {
        self.inner.lock().get(key).cloned()
    }

    /// Insert or update a value; returns the evicted entry, if any
    pub fn put(&self, key: K, value: V) -> Option<(K, V)> {
        self.inner.lock().put(key, value)
    }

    /// Remove a key from the cache
    pub fn remove<Q>(&self, key: &Q) -> Option<V>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        self.inner.lock().remove(key)
    }

    /// Check membership without changing recency
    pub fn contains<Q>(&self, key: &Q) -> bool
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        self.inner.lock().contains(key)
    }

    /// Run `f` with exclusive access to the underlying cache
    pub fn with_lock<R>(&self, f: impl FnOnce(&mut LruCache<K, V, S>) -> R) -> R {
        f(&mut self.inner.lock())
    }
}

impl<K, V, S> SharedLruCache<K, V, S> {
    /// Get current number of entries
    pub fn len(&self) -> usize {
        self.inner.lock().len()
    }

    /// Check if the cache is empty
    pub fn is_empty(&self) -> bool {
        self.inner.lock().is_empty()
    }

    /// Get cache capacity
    pub fn capacity(&self) -> usize {
        self.inner.lock().capacity()
    }

    /// Snapshot of the operation counters
    pub fn stats(&self) -> CacheStats {
        *self.inner.lock().stats()
    }

    /// Drop every entry
    pub fn clear(&self) {
        self.inner.lock().clear();
    }
}

impl<K, V, S> Clone for SharedLruCache<K, V, S> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<K: fmt::Debug, V: fmt::Debug, S> fmt::Debug for SharedLruCache<K, V, S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("SharedLruCache")
            .field(&*self.inner.lock())
            .finish()
    }
}
