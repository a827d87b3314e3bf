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

use criterion::{criterion_group, criterion_main, Criterion};
use rebind_cache::{BoundedCache, EvictionOrder};
use std::hint::black_box;

const CAPACITY: usize = 256;
const KEY_SPACE: u64 = 1_024;

fn bench_cache(c: &mut Criterion) {
    let mut group = c.benchmark_group("BoundedCache");

    for (label, eviction) in [
        ("Insertion", EvictionOrder::Insertion),
        ("Access", EvictionOrder::Access),
    ] {
        let cache = BoundedCache::new(CAPACITY, eviction);
        for key in 0..CAPACITY as u64 {
            cache.insert(key, key);
        }

        group.bench_function(format!("put churn ({label})"), |b| {
            let mut key = 0u64;
            b.iter(|| {
                key = (key + 7) % KEY_SPACE;
                cache.insert(black_box(key), key);
            });
        });

        group.bench_function(format!("get mixed ({label})"), |b| {
            let mut key = 0u64;
            b.iter(|| {
                key = (key + 13) % KEY_SPACE;
                black_box(cache.get(&key));
            });
        });
    }

    group.finish();
}

criterion_group!(benches, bench_cache);
criterion_main!(benches);
