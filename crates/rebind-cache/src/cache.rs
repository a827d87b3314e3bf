// Copyright 2025 eraflo
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! The bounded cache itself.

use crate::config::{CacheConfig, EvictionOrder};
use crate::stats::CacheStats;
use indexmap::IndexMap;
use std::fmt;
use std::hash::Hash;
use std::sync::{Mutex, MutexGuard, PoisonError};

struct Inner<K, V> {
    /// Entries in eviction order: index 0 is the next entry to go.
    entries: IndexMap<K, V, ahash::RandomState>,
    stats: CacheStats,
}

/// A thread-safe mapping from keys to values with a fixed capacity.
///
/// When a new key is inserted into a full cache, entries are evicted one at a
/// time in the configured [`EvictionOrder`] until there is room for exactly one
/// more. A single mutex guards the whole map, so every operation is atomic with
/// respect to the others.
///
/// A cache created with `max_size == 0` is disabled: `put` never stores anything
/// and `get` always misses.
pub struct BoundedCache<K, V> {
    inner: Mutex<Inner<K, V>>,
    max_size: usize,
    eviction: EvictionOrder,
}

impl<K: Eq + Hash, V> BoundedCache<K, V> {
    /// Creates an empty cache holding at most `max_size` entries.
    pub fn new(max_size: usize, eviction: EvictionOrder) -> Self {
        Self {
            inner: Mutex::new(Inner {
                entries: IndexMap::with_capacity_and_hasher(
                    max_size.min(1024),
                    ahash::RandomState::new(),
                ),
                stats: CacheStats::default(),
            }),
            max_size,
            eviction,
        }
    }

    /// Creates an empty cache from a [`CacheConfig`].
    pub fn with_config(config: &CacheConfig) -> Self {
        Self::new(config.max_size, config.eviction)
    }

    fn lock(&self) -> MutexGuard<'_, Inner<K, V>> {
        // Every mutation completes before the guard drops, so a poisoned
        // lock still protects a consistent map.
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Inserts or replaces the value for `key`.
    ///
    /// A `None` value is a no-op: an existing entry for `key` is left untouched.
    pub fn put(&self, key: K, value: Option<V>) {
        if let Some(value) = value {
            self.insert(key, value);
        }
    }

    /// Inserts or replaces the value for `key`, evicting if the cache is full.
    ///
    /// Replacing an existing key never evicts. Under [`EvictionOrder::Access`]
    /// the key becomes the most recently used one.
    pub fn insert(&self, key: K, value: V) {
        if self.max_size == 0 {
            return;
        }

        let mut inner = self.lock();
        if let Some(index) = inner.entries.get_index_of(&key) {
            inner.entries[index] = value;
            if self.eviction == EvictionOrder::Access {
                let last = inner.entries.len() - 1;
                inner.entries.move_index(index, last);
            }
            return;
        }

        let mut evicted = 0;
        while inner.entries.len() >= self.max_size {
            if inner.entries.shift_remove_index(0).is_none() {
                break;
            }
            evicted += 1;
        }
        if evicted > 0 {
            inner.stats.evictions += evicted;
            log::trace!(
                "BoundedCache: evicted {} entr{} ({:?} order)",
                evicted,
                if evicted == 1 { "y" } else { "ies" },
                self.eviction
            );
        }

        inner.entries.insert(key, value);
        inner.stats.insertions += 1;
    }

    /// Removes `key` and returns its value, if it was present.
    pub fn remove(&self, key: &K) -> Option<V> {
        self.lock().entries.shift_remove(key)
    }

    /// Returns `true` if `key` is present. Does not count as an access.
    pub fn contains_key(&self, key: &K) -> bool {
        self.lock().entries.contains_key(key)
    }

    /// Current number of entries.
    pub fn len(&self) -> usize {
        self.lock().entries.len()
    }

    /// Returns `true` if the cache holds no entries.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// The capacity fixed at construction.
    pub fn max_size(&self) -> usize {
        self.max_size
    }

    /// The eviction order fixed at construction.
    pub fn eviction(&self) -> EvictionOrder {
        self.eviction
    }

    /// Drops every entry. Counters are kept.
    pub fn clear(&self) {
        self.lock().entries.clear();
    }

    /// Returns a snapshot of the access counters.
    pub fn stats(&self) -> CacheStats {
        self.lock().stats
    }
}

impl<K: Eq + Hash, V: Clone> BoundedCache<K, V> {
    /// Returns a clone of the value for `key`.
    ///
    /// Under [`EvictionOrder::Access`] a hit marks `key` as most recently used.
    pub fn get(&self, key: &K) -> Option<V> {
        let mut inner = self.lock();
        let Some(index) = inner.entries.get_index_of(key) else {
            inner.stats.misses += 1;
            return None;
        };

        inner.stats.hits += 1;
        let index = if self.eviction == EvictionOrder::Access {
            let last = inner.entries.len() - 1;
            inner.entries.move_index(index, last);
            last
        } else {
            index
        };
        inner.entries.get_index(index).map(|(_, value)| value.clone())
    }

    /// Snapshot of the current values, next-to-be-evicted first.
    pub fn values(&self) -> Vec<V> {
        self.lock().entries.values().cloned().collect()
    }
}

impl<K: Eq + Hash + Clone, V> BoundedCache<K, V> {
    /// Snapshot of the current keys, next-to-be-evicted first.
    pub fn keys(&self) -> Vec<K> {
        self.lock().entries.keys().cloned().collect()
    }
}

impl<K: Eq + Hash, V> fmt::Debug for BoundedCache<K, V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BoundedCache")
            .field("len", &self.len())
            .field("max_size", &self.max_size)
            .field("eviction", &self.eviction)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn filled(eviction: EvictionOrder) -> BoundedCache<&'static str, i32> {
        let cache = BoundedCache::new(3, eviction);
        cache.insert("a", 1);
        cache.insert("b", 2);
        cache.insert("c", 3);
        cache
    }

    #[test]
    fn test_fifo_evicts_oldest_insertion() {
        let cache = filled(EvictionOrder::Insertion);
        assert_eq!(cache.get(&"a"), Some(1));
        cache.insert("d", 4);

        assert!(!cache.contains_key(&"a"));
        assert_eq!(cache.keys(), vec!["b", "c", "d"]);
    }

    #[test]
    fn test_fifo_replace_keeps_position() {
        let cache = filled(EvictionOrder::Insertion);
        cache.insert("a", 10);
        assert_eq!(cache.keys(), vec!["a", "b", "c"]);

        cache.insert("d", 4);
        assert!(!cache.contains_key(&"a"));
    }

    #[test]
    fn test_lru_get_refreshes_recency() {
        let cache = filled(EvictionOrder::Access);
        assert_eq!(cache.get(&"a"), Some(1));
        cache.insert("d", 4);

        assert!(cache.contains_key(&"a"));
        assert!(!cache.contains_key(&"b"));
        assert_eq!(cache.keys(), vec!["c", "a", "d"]);
    }

    #[test]
    fn test_lru_put_existing_refreshes_recency() {
        let cache = filled(EvictionOrder::Access);
        cache.insert("a", 10);
        cache.insert("d", 4);

        assert_eq!(cache.get(&"a"), Some(10));
        assert!(!cache.contains_key(&"b"));
    }

    #[test]
    fn test_contains_key_is_not_an_access() {
        let cache = filled(EvictionOrder::Access);
        assert!(cache.contains_key(&"a"));
        cache.insert("d", 4);
        assert!(!cache.contains_key(&"a"));
    }

    #[test]
    fn test_replace_never_evicts() {
        let cache = filled(EvictionOrder::Insertion);
        cache.insert("c", 30);
        assert_eq!(cache.len(), 3);
        assert_eq!(cache.stats().evictions, 0);
    }

    #[test]
    fn test_put_none_is_noop() {
        let cache = filled(EvictionOrder::Insertion);
        cache.put("a", None);
        cache.put("z", None);

        assert_eq!(cache.len(), 3);
        assert_eq!(cache.get(&"a"), Some(1));
        assert!(!cache.contains_key(&"z"));
    }

    #[test]
    fn test_zero_capacity_is_disabled() {
        let cache = BoundedCache::new(0, EvictionOrder::Access);
        cache.insert("a", 1);
        cache.put("b", Some(2));

        assert_eq!(cache.len(), 0);
        assert_eq!(cache.get(&"a"), None);
        assert_eq!(cache.stats().insertions, 0);
    }

    #[test]
    fn test_remove_returns_prior_value() {
        let cache = filled(EvictionOrder::Insertion);
        assert_eq!(cache.remove(&"b"), Some(2));
        assert_eq!(cache.remove(&"b"), None);
        assert_eq!(cache.len(), 2);
    }

    #[test]
    fn test_clear() {
        let cache = filled(EvictionOrder::Access);
        cache.clear();
        assert_eq!(cache.len(), 0);
        assert!(cache.is_empty());
        assert_eq!(cache.get(&"a"), None);
    }

    #[test]
    fn test_stats_counters() {
        let cache = BoundedCache::new(1, EvictionOrder::Insertion);
        cache.insert(1, "one");
        cache.insert(2, "two");
        let _ = cache.get(&1);
        let _ = cache.get(&2);

        let stats = cache.stats();
        assert_eq!(stats.insertions, 2);
        assert_eq!(stats.evictions, 1);
        assert_eq!(stats.hits, 1);
        assert_eq!(stats.misses, 1);
    }

    #[test]
    fn test_values_in_eviction_order() {
        let cache = filled(EvictionOrder::Access);
        let _ = cache.get(&"b");
        assert_eq!(cache.values(), vec![1, 3, 2]);
    }
}
