//! LRU (Least Recently Used) cache implementation
//!
//! Entries live in a slot arena. The key index maps each key to its entry's
//! handle, and the recency list threads the same entries together through
//! `prev`/`next` handles, head = most recently used, tail = next to evict.
//! Every mutation updates both views before returning.

use std::borrow::Borrow;
use std::collections::HashMap;
use std::fmt;
use std::hash::{BuildHasher, Hash};
use std::iter::FusedIterator;

use ahash::RandomState;
use tracing::{debug, trace};

use crate::arena::{Arena, Handle};
use crate::config::LruConfig;
use crate::error::{Error, InvariantError, Result};
use crate::stats::CacheStats;

/// Upper bound on slots reserved up front; larger caches grow on demand
const MAX_PREALLOC: usize = 4096;

/// Entry in the recency list
struct Entry<K, V> {
    key: K,
    value: V,
    prev: Option<Handle>,
    next: Option<Handle>,
}

/// LRU cache with fixed capacity
///
/// ```
/// use strictlru::LruCache;
///
/// let mut cache = LruCache::new(2).unwrap();
/// cache.put("a", 1);
/// cache.put("b", 2);
/// cache.get(&"a");
/// cache.put("c", 3); // evicts "b"
///
/// assert_eq!(cache.to_string(), "[c=>3, a=>1]");
/// ```
pub struct LruCache<K, V, S = RandomState> {
    map: HashMap<K, Handle, S>,
    entries: Arena<Entry<K, V>>,
    head: Option<Handle>,
    tail: Option<Handle>,
    capacity: usize,
    stats: CacheStats,
}

impl<K, V> LruCache<K, V, RandomState>
where
    K: Hash + Eq + Clone,
{
    /// Create a new LRU cache holding at most `capacity` entries.
    ///
    /// Fails with [`Error::InvalidConfiguration`] if `capacity` is zero,
    /// negative, or does not fit in `usize`.
    pub fn new<C>(capacity: C) -> Result<Self>
    where
        C: TryInto<usize> + fmt::Display + Copy,
    {
        Self::with_config(LruConfig::try_from_int(capacity)?)
    }

    /// Create a cache from a config
    pub fn with_config(config: LruConfig) -> Result<Self> {
        Self::with_config_and_hasher(config, RandomState::new())
    }
}

impl<K, V, S> LruCache<K, V, S>
where
    K: Hash + Eq + Clone,
    S: BuildHasher,
{
    /// Create a cache whose key index uses `hasher`
    pub fn with_hasher(capacity: usize, hasher: S) -> Result<Self> {
        Self::with_config_and_hasher(LruConfig::new(capacity), hasher)
    }

    /// Create a cache from a config, with a custom index hasher
    pub fn with_config_and_hasher(config: LruConfig, hasher: S) -> Result<Self> {
        config.validate()?;
        let capacity = config.max_entries();
        let reserve = capacity.min(MAX_PREALLOC);
        debug!(capacity, "creating LRU cache");

        Ok(Self {
            map: HashMap::with_capacity_and_hasher(reserve, hasher),
            entries: Arena::with_capacity(reserve),
            head: None,
            tail: None,
            capacity,
            stats: CacheStats::new(),
        })
    }

    /// Get a value and mark its entry most recently used
    pub fn get<Q>(&mut self, key: &Q) -> Option<&V>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        let handle = self.touch(key)?;
        self.entries.get(handle).map(|entry| &entry.value)
    }

    /// Like [`get`](Self::get), but hands out a mutable reference
    pub fn get_mut<Q>(&mut self, key: &Q) -> Option<&mut V>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        let handle = self.touch(key)?;
        self.entries.get_mut(handle).map(|entry| &mut entry.value)
    }

    /// Checked lookup for callers holding an optional key.
    ///
    /// An absent key is rejected with [`Error::InvalidArgument`]; a present
    /// key that is not cached is `Ok(None)`.
    pub fn try_get<Q>(&mut self, key: Option<&Q>) -> Result<Option<&V>>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        let key = key.ok_or(Error::InvalidArgument("key must be present"))?;
        Ok(self.get(key))
    }

    /// Get a value without changing recency
    pub fn peek<Q>(&self, key: &Q) -> Option<&V>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        let handle = *self.map.get(key)?;
        self.entries.get(handle).map(|entry| &entry.value)
    }

    /// Check membership without changing recency
    pub fn contains<Q>(&self, key: &Q) -> bool
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        self.map.contains_key(key)
    }

    /// Insert or update a key-value pair, making it the most recently used.
    ///
    /// Inserting a new key into a full cache evicts the least recently used
    /// entry first; that entry is returned.
    pub fn put(&mut self, key: K, value: V) -> Option<(K, V)> {
        if let Some(&handle) = self.map.get(&key) {
            if let Some(entry) = self.entries.get_mut(handle) {
                entry.value = value;
            }
            self.stats.record_update();
            self.move_to_front(handle);
            return None;
        }

        let evicted = if self.map.len() >= self.capacity {
            self.pop_lru()
        } else {
            None
        };

        let handle = self.entries.insert(Entry {
            key: key.clone(),
            value,
            prev: None,
            next: None,
        });
        self.push_front(handle);
        self.map.insert(key, handle);
        self.stats.record_insert();

        evicted
    }

    /// Checked insert for callers holding an optional key and value.
    ///
    /// Both are validated before the cache is touched, so a rejected call
    /// leaves it unchanged.
    pub fn try_put(&mut self, key: Option<K>, value: Option<V>) -> Result<Option<(K, V)>> {
        let key = key.ok_or(Error::InvalidArgument("key must be present"))?;
        let value = value.ok_or(Error::InvalidArgument("value must be present"))?;
        Ok(self.put(key, value))
    }

    /// Remove a key from the cache
    pub fn remove<Q>(&mut self, key: &Q) -> Option<V>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        let handle = *self.map.get(key)?;
        let (_, value) = self.detach(handle)?;
        self.stats.record_removal();
        trace!(len = self.map.len(), "removed entry");
        Some(value)
    }

    /// Evict the least recently used entry
    pub fn pop_lru(&mut self) -> Option<(K, V)> {
        let tail = self.tail?;
        let evicted = self.detach(tail)?;
        self.stats.record_eviction();
        trace!(len = self.map.len(), "evicted least recently used entry");
        Some(evicted)
    }

    /// Verify that the key index and the recency list describe the same
    /// entries in a consistent order
    pub fn check_invariants(&self) -> std::result::Result<(), InvariantError> {
        let len = self.map.len();
        if len > self.capacity {
            return Err(InvariantError::new(format!(
                "index holds {} keys, capacity is {}",
                len, self.capacity
            )));
        }
        if self.entries.len() != len {
            return Err(InvariantError::new(format!(
                "arena holds {} entries, index holds {} keys",
                self.entries.len(),
                len
            )));
        }

        let mut walked = 0;
        let mut prev = None;
        let mut cursor = self.head;
        while let Some(handle) = cursor {
            let entry = self.entries.get(handle).ok_or_else(|| {
                InvariantError::new(format!("list links to free slot {}", handle.index()))
            })?;
            if entry.prev != prev {
                return Err(InvariantError::new(format!(
                    "slot {} has an inconsistent prev link",
                    handle.index()
                )));
            }
            match self.map.get(&entry.key) {
                Some(&indexed) if indexed == handle => {}
                _ => {
                    return Err(InvariantError::new(format!(
                        "slot {} is not indexed under its key",
                        handle.index()
                    )))
                }
            }
            walked += 1;
            if walked > len {
                return Err(InvariantError::new("recency list is longer than the index"));
            }
            prev = cursor;
            cursor = entry.next;
        }

        if self.tail != prev {
            return Err(InvariantError::new("tail is not the last list entry"));
        }
        if walked != len {
            return Err(InvariantError::new(format!(
                "recency list has {} entries, index holds {} keys",
                walked, len
            )));
        }
        Ok(())
    }

    /// Look up `key` and move its entry to the head
    fn touch<Q>(&mut self, key: &Q) -> Option<Handle>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        match self.map.get(key) {
            Some(&handle) => {
                self.stats.record_hit();
                self.move_to_front(handle);
                Some(handle)
            }
            None => {
                self.stats.record_miss();
                None
            }
        }
    }

    /// Take an entry out of the list, the index, and the arena
    fn detach(&mut self, handle: Handle) -> Option<(K, V)> {
        self.unlink(handle);
        let entry = self.entries.remove(handle)?;
        self.map.remove(&entry.key);
        Some((entry.key, entry.value))
    }
}

impl<K, V, S> LruCache<K, V, S> {
    /// Get the current number of entries
    pub fn len(&self) -> usize {
        self.map.len()
    }

    /// Check if the cache is empty
    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }

    /// Maximum number of entries, fixed at construction
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Operation counters since construction or the last reset
    pub fn stats(&self) -> &CacheStats {
        &self.stats
    }

    /// Zero the operation counters
    pub fn reset_stats(&mut self) {
        self.stats.reset();
    }

    /// Drop every entry. Statistics are kept.
    pub fn clear(&mut self) {
        let dropped = self.map.len();
        self.map.clear();
        self.entries.clear();
        self.head = None;
        self.tail = None;
        debug!(dropped, "cleared LRU cache");
    }

    /// Least recently used entry, without touching it
    pub fn peek_lru(&self) -> Option<(&K, &V)> {
        let entry = self.entries.get(self.tail?)?;
        Some((&entry.key, &entry.value))
    }

    /// Most recently used entry, without touching it
    pub fn peek_mru(&self) -> Option<(&K, &V)> {
        let entry = self.entries.get(self.head?)?;
        Some((&entry.key, &entry.value))
    }

    /// Iterate from most to least recently used without touching anything
    pub fn iter(&self) -> Iter<'_, K, V> {
        Iter {
            entries: &self.entries,
            front: self.head,
            back: self.tail,
            remaining: self.map.len(),
        }
    }

    /// Keys from most to least recently used
    pub fn keys(&self) -> impl DoubleEndedIterator<Item = &K> + ExactSizeIterator + '_ {
        self.iter().map(|(key, _)| key)
    }

    fn move_to_front(&mut self, handle: Handle) {
        if self.head == Some(handle) {
            return; // Already at front
        }

        self.unlink(handle);
        self.push_front(handle);
    }

    fn push_front(&mut self, handle: Handle) {
        let old_head = self.head;

        if let Some(entry) = self.entries.get_mut(handle) {
            entry.prev = None;
            entry.next = old_head;
        }

        match old_head {
            Some(head_handle) => {
                if let Some(head) = self.entries.get_mut(head_handle) {
                    head.prev = Some(handle);
                }
            }
            None => {
                self.tail = Some(handle);
            }
        }

        self.head = Some(handle);
    }

    fn unlink(&mut self, handle: Handle) {
        let (prev, next) = match self.entries.get_mut(handle) {
            Some(entry) => (entry.prev.take(), entry.next.take()),
            None => return,
        };

        match prev {
            Some(prev_handle) => {
                if let Some(prev_entry) = self.entries.get_mut(prev_handle) {
                    prev_entry.next = next;
                }
            }
            None => {
                self.head = next;
            }
        }

        match next {
            Some(next_handle) => {
                if let Some(next_entry) = self.entries.get_mut(next_handle) {
                    next_entry.prev = prev;
                }
            }
            None => {
                self.tail = prev;
            }
        }
    }
}

/// Iterator over cache entries, most recently used first
pub struct Iter<'a, K, V> {
    entries: &'a Arena<Entry<K, V>>,
    front: Option<Handle>,
    back: Option<Handle>,
    remaining: usize,
}

impl<K, V> Clone for Iter<'_, K, V> {
    fn clone(&self) -> Self {
        Self {
            entries: self.entries,
            front: self.front,
            back: self.back,
            remaining: self.remaining,
        }
    }
}

impl<'a, K, V> Iterator for Iter<'a, K, V> {
    type Item = (&'a K, &'a V);

    fn next(&mut self) -> Option<Self::Item> {
        if self.remaining == 0 {
            return None;
        }
        let entry = self.entries.get(self.front?)?;
        self.front = entry.next;
        self.remaining -= 1;
        Some((&entry.key, &entry.value))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.remaining, Some(self.remaining))
    }
}

impl<K, V> DoubleEndedIterator for Iter<'_, K, V> {
    fn next_back(&mut self) -> Option<Self::Item> {
        if self.remaining == 0 {
            return None;
        }
        let entry = self.entries.get(self.back?)?;
        self.back = entry.prev;
        self.remaining -= 1;
        Some((&entry.key, &entry.value))
    }
}

impl<K, V> ExactSizeIterator for Iter<'_, K, V> {}

impl<K, V> FusedIterator for Iter<'_, K, V> {}

impl<'a, K, V, S> IntoIterator for &'a LruCache<K, V, S> {
    type Item = (&'a K, &'a V);
    type IntoIter = Iter<'a, K, V>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

/// `[k1=>v1, k2=>v2]`, most recently used first
impl<K: fmt::Display, V: fmt::Display, S> fmt::Display for LruCache<K, V, S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("[")?;
        for (i, (key, value)) in self.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{}=>{}", key, value)?;
        }
        f.write_str("]")
    }
}

struct Ordered<'a, K, V>(Iter<'a, K, V>);

impl<K: fmt::Debug, V: fmt::Debug> fmt::Debug for Ordered<'_, K, V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map().entries(self.0.clone()).finish()
    }
}

impl<K: fmt::Debug, V: fmt::Debug, S> fmt::Debug for LruCache<K, V, S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LruCache")
            .field("len", &self.len())
            .field("capacity", &self.capacity)
            .field("entries", &Ordered(self.iter()))
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn order<S>(cache: &LruCache<i32, &'static str, S>) -> Vec<i32> {
        cache.keys().copied().collect()
    }

    #[test]
    fn test_lru_basic() {
        let mut cache = LruCache::new(2).unwrap();

        cache.put(1, "a");
        cache.put(2, "b");

        assert_eq!(cache.get(&1), Some(&"a"));
        assert_eq!(cache.get(&2), Some(&"b"));
        assert_eq!(cache.len(), 2);
        cache.check_invariants().unwrap();
    }

    #[test]
    fn test_lru_eviction() {
        let mut cache = LruCache::new(2).unwrap();

        cache.put(1, "a");
        cache.put(2, "b");
        let evicted = cache.put(3, "c"); // Should evict 1

        assert_eq!(evicted, Some((1, "a")));
        assert_eq!(cache.get(&1), None);
        assert_eq!(cache.get(&2), Some(&"b"));
        assert_eq!(cache.get(&3), Some(&"c"));
        assert_eq!(cache.stats().evictions(), 1);
    }

    #[test]
    fn test_lru_update() {
        let mut cache = LruCache::new(2).unwrap();

        cache.put(1, "a");
        cache.put(2, "b");
        cache.get(&1); // Move 1 to front
        cache.put(3, "c"); // Should evict 2

        assert_eq!(cache.get(&1), Some(&"a"));
        assert_eq!(cache.get(&2), None);
        assert_eq!(cache.get(&3), Some(&"c"));
    }

    #[test]
    fn test_lru_remove() {
        let mut cache = LruCache::new(3).unwrap();

        cache.put(1, "a");
        cache.put(2, "b");
        cache.put(3, "c");

        assert_eq!(cache.remove(&2), Some("b"));
        assert_eq!(cache.remove(&2), None);
        assert_eq!(cache.len(), 2);
        assert_eq!(cache.get(&2), None);
        assert_eq!(order(&cache), vec![3, 1]);
        cache.check_invariants().unwrap();
    }

    #[test]
    fn test_lru_remove_reuses_slot() {
        let mut cache = LruCache::new(3).unwrap();

        cache.put(1, "a");
        cache.put(2, "b");
        cache.remove(&1);
        cache.put(3, "c");
        cache.put(4, "d");

        assert_eq!(order(&cache), vec![4, 3, 2]);
        cache.check_invariants().unwrap();
    }

    #[test]
    fn test_lru_clear() {
        let mut cache = LruCache::new(3).unwrap();

        cache.put(1, "a");
        cache.put(2, "b");
        cache.clear();

        assert_eq!(cache.len(), 0);
        assert!(cache.is_empty());
        assert_eq!(cache.peek_lru(), None);
        assert_eq!(cache.peek_mru(), None);
        cache.check_invariants().unwrap();

        cache.put(3, "c");
        assert_eq!(order(&cache), vec![3]);
    }

    #[test]
    fn test_lru_overwrite() {
        let mut cache = LruCache::new(2).unwrap();

        cache.put(1, "a");
        cache.put(1, "b"); // Overwrite

        assert_eq!(cache.get(&1), Some(&"b"));
        assert_eq!(cache.len(), 1);
        assert_eq!(cache.stats().inserts(), 1);
        assert_eq!(cache.stats().updates(), 1);
    }

    #[test]
    fn test_lru_overwrite_moves_to_front() {
        let mut cache = LruCache::new(3).unwrap();

        cache.put(1, "a");
        cache.put(2, "b");
        cache.put(3, "c");
        cache.put(1, "z");

        assert_eq!(order(&cache), vec![1, 3, 2]);
        assert_eq!(cache.peek_lru(), Some((&2, &"b")));
        cache.check_invariants().unwrap();
    }

    #[test]
    fn test_lru_touch_head_is_noop() {
        let mut cache = LruCache::new(3).unwrap();

        cache.put(1, "a");
        cache.put(2, "b");
        cache.get(&2);
        cache.put(2, "b2");

        assert_eq!(order(&cache), vec![2, 1]);
        assert_eq!(cache.peek(&2), Some(&"b2"));
        cache.check_invariants().unwrap();
    }

    #[test]
    fn test_lru_capacity_one() {
        let mut cache = LruCache::new(1).unwrap();

        cache.put(1, "a");
        assert_eq!(cache.put(2, "b"), Some((1, "a")));
        assert_eq!(cache.len(), 1);
        assert_eq!(cache.get(&1), None);
        assert_eq!(cache.get(&2), Some(&"b"));
        cache.check_invariants().unwrap();
    }

    #[test]
    fn test_lru_peek_does_not_touch() {
        let mut cache = LruCache::new(2).unwrap();

        cache.put(1, "a");
        cache.put(2, "b");
        assert_eq!(cache.peek(&1), Some(&"a"));
        assert!(cache.contains(&1));
        cache.put(3, "c");

        assert!(!cache.contains(&1));
        assert_eq!(cache.stats().hits(), 0);
    }

    #[test]
    fn test_lru_get_mut() {
        let mut cache = LruCache::new(2).unwrap();

        cache.put("x", 1);
        cache.put("y", 2);
        if let Some(value) = cache.get_mut(&"x") {
            *value += 10;
        }

        assert_eq!(cache.peek(&"x"), Some(&11));
        assert_eq!(cache.peek_mru(), Some((&"x", &11)));
    }

    #[test]
    fn test_lru_pop_lru() {
        let mut cache = LruCache::new(3).unwrap();

        cache.put(1, "a");
        cache.put(2, "b");

        assert_eq!(cache.pop_lru(), Some((1, "a")));
        assert_eq!(cache.pop_lru(), Some((2, "b")));
        assert_eq!(cache.pop_lru(), None);
        assert!(cache.is_empty());
        cache.check_invariants().unwrap();
    }

    #[test]
    fn test_lru_iter_both_ends() {
        let mut cache = LruCache::new(3).unwrap();

        cache.put(1, "a");
        cache.put(2, "b");
        cache.put(3, "c");

        let forward: Vec<_> = cache.iter().map(|(k, _)| *k).collect();
        let backward: Vec<_> = cache.iter().rev().map(|(k, _)| *k).collect();
        assert_eq!(forward, vec![3, 2, 1]);
        assert_eq!(backward, vec![1, 2, 3]);

        let mut iter = cache.iter();
        assert_eq!(iter.len(), 3);
        assert_eq!(iter.next(), Some((&3, &"c")));
        assert_eq!(iter.next_back(), Some((&1, &"a")));
        assert_eq!(iter.next(), Some((&2, &"b")));
        assert_eq!(iter.next_back(), None);
    }

    #[test]
    fn test_lru_checked_entry_points() {
        let mut cache: LruCache<String, i32> = LruCache::new(2).unwrap();
        cache.put("a".to_string(), 1);

        assert_eq!(
            cache.try_put(None, Some(2)),
            Err(Error::InvalidArgument("key must be present"))
        );
        assert_eq!(
            cache.try_put(Some("b".to_string()), None),
            Err(Error::InvalidArgument("value must be present"))
        );
        assert_eq!(
            cache.try_get(None::<&str>),
            Err(Error::InvalidArgument("key must be present"))
        );
        assert_eq!(cache.len(), 1);
        assert_eq!(cache.stats().misses(), 0);

        assert_eq!(cache.try_put(Some("b".to_string()), Some(2)), Ok(None));
        assert_eq!(cache.try_get(Some("b")), Ok(Some(&2)));
        assert_eq!(cache.try_get(Some("c")), Ok(None));
    }

    #[test]
    fn test_lru_invalid_capacity() {
        assert!(matches!(
            LruCache::<i32, i32>::new(0),
            Err(Error::InvalidConfiguration(_))
        ));
        assert!(matches!(
            LruCache::<i32, i32>::new(-1),
            Err(Error::InvalidConfiguration(_))
        ));
        assert!(matches!(
            LruCache::<i32, i32>::with_hasher(0, RandomState::new()),
            Err(Error::InvalidConfiguration(_))
        ));
    }

    #[test]
    fn test_lru_display() {
        let mut cache = LruCache::new(3).unwrap();
        assert_eq!(cache.to_string(), "[]");

        cache.put("Key0", "Value0");
        cache.put("Key1", "Value1");
        assert_eq!(cache.to_string(), "[Key1=>Value1, Key0=>Value0]");
    }

    #[test]
    fn test_lru_debug() {
        let mut cache = LruCache::new(2).unwrap();
        cache.put(1, "a");
        cache.put(2, "b");

        assert_eq!(
            format!("{:?}", cache),
            r#"LruCache { len: 2, capacity: 2, entries: {2: "b", 1: "a"} }"#
        );
    }

    #[test]
    fn test_lru_stats() {
        let mut cache = LruCache::new(2).unwrap();

        cache.put(1, "a");
        cache.get(&1); // hit
        cache.get(&2); // miss
        cache.put(2, "b");
        cache.put(3, "c"); // evicts 1
        cache.remove(&2);

        let stats = cache.stats();
        assert_eq!(stats.hits(), 1);
        assert_eq!(stats.misses(), 1);
        assert_eq!(stats.inserts(), 3);
        assert_eq!(stats.evictions(), 1);
        assert_eq!(stats.removals(), 1);

        cache.clear();
        assert_eq!(cache.stats().hits(), 1);
        cache.reset_stats();
        assert_eq!(cache.stats().hits(), 0);
    }

    #[test]
    fn test_lru_large_capacity_is_lazy() {
        let mut cache = LruCache::new(usize::MAX).unwrap();
        cache.put(1, "a");
        assert_eq!(cache.capacity(), usize::MAX);
        assert_eq!(cache.len(), 1);
    }
}
