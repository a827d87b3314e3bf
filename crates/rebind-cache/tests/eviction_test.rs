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

use rebind_cache::{BoundedCache, CacheConfig, EvictionOrder};
use std::sync::Arc;
use std::thread;

#[test]
fn test_size_never_exceeds_capacity() {
    for eviction in [EvictionOrder::Insertion, EvictionOrder::Access] {
        let cache = BoundedCache::new(5, eviction);
        for i in 0..50u32 {
            cache.insert(i % 17, i);
            if i % 3 == 0 {
                let _ = cache.get(&(i % 7));
            }
            assert!(cache.len() <= 5, "size exceeded after put #{i}");
        }
    }
}

#[test]
fn test_fifo_overflow_drops_first_key() {
    let n = 4;
    let cache = BoundedCache::new(n, EvictionOrder::Insertion);
    for k in 1..=n + 1 {
        cache.insert(k, k * 10);
    }

    assert!(!cache.contains_key(&1));
    for k in 2..=n + 1 {
        assert!(cache.contains_key(&k), "key {k} should survive");
    }
}

#[test]
fn test_lru_overflow_spares_touched_key() {
    let n = 4;
    let cache = BoundedCache::new(n, EvictionOrder::Access);
    for k in 1..=n {
        cache.insert(k, k);
    }
    assert_eq!(cache.get(&1), Some(1));
    cache.insert(n + 1, n + 1);

    assert!(cache.contains_key(&1));
    assert!(!cache.contains_key(&2));
    assert_eq!(cache.len(), n);
}

#[test]
fn test_lru_scenario_two_slots() {
    let cache = BoundedCache::with_config(&CacheConfig::new(2, EvictionOrder::Access));
    cache.put("a", Some(1));
    cache.put("b", Some(2));
    let _ = cache.get(&"a");
    cache.put("c", Some(3));

    assert!(!cache.contains_key(&"b"));
    assert!(cache.contains_key(&"a"));
    assert!(cache.contains_key(&"c"));
}

#[test]
fn test_put_none_keeps_existing_mapping() {
    let cache = BoundedCache::new(2, EvictionOrder::Insertion);
    cache.put("a", Some(1));
    let before = cache.len();
    cache.put("a", None::<i32>);

    assert_eq!(cache.len(), before);
    assert_eq!(cache.get(&"a"), Some(1));
}

#[test]
fn test_clear_then_lookup() {
    let cache = BoundedCache::new(3, EvictionOrder::Access);
    cache.insert("x", 1);
    cache.insert("y", 2);
    cache.clear();

    assert_eq!(cache.len(), 0);
    assert_eq!(cache.get(&"x"), None);
    assert_eq!(cache.get(&"never-inserted"), None);
}

#[test]
fn test_concurrent_writers_respect_capacity() {
    let cache = Arc::new(BoundedCache::new(16, EvictionOrder::Access));
    let handles: Vec<_> = (0..8u64)
        .map(|t| {
            let cache = Arc::clone(&cache);
            thread::spawn(move || {
                for i in 0..500u64 {
                    let key = (t * 1_000 + i) % 40;
                    cache.insert(key, i);
                    let _ = cache.get(&((key + 1) % 40));
                    assert!(cache.len() <= 16);
                }
            })
        })
        .collect();

    for handle in handles {
        handle.join().expect("writer thread panicked");
    }

    assert!(cache.len() <= 16);
    let stats = cache.stats();
    assert_eq!(stats.hits + stats.misses, 8 * 500);
}
