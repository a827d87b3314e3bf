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

use anyhow::Result;
use crossbeam_channel::Sender;
use rebind_cache::{BoundedCache, EvictionOrder};
use rebind_engine::{EngineConfig, LoadContext, LoadEngine, LoadResult, Loader};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

// --- Test Setup: a thumbnail loader that consults a cache before decoding ---

#[derive(Default)]
struct Slot {
    thumbnail: Mutex<Option<Arc<Vec<u8>>>>,
}

struct ThumbnailLoader {
    cache: BoundedCache<String, Arc<Vec<u8>>>,
    decodes: AtomicUsize,
    applied: Sender<(String, bool)>,
}

impl Loader for ThumbnailLoader {
    type Target = Slot;
    type Asset = String;
    type Payload = Arc<Vec<u8>>;

    fn initialise(&self, slot: &Slot, _path: &String) -> bool {
        *slot.thumbnail.lock().unwrap() = None;
        true
    }

    fn load(
        &self,
        _slot: &Slot,
        path: &String,
        _context: &LoadContext<'_>,
    ) -> Result<LoadResult<String, Arc<Vec<u8>>>> {
        if let Some(bytes) = self.cache.get(path) {
            return Ok(LoadResult::cached(bytes, path.clone()));
        }
        self.decodes.fetch_add(1, Ordering::SeqCst);
        let bytes = Arc::new(path.bytes().rev().collect::<Vec<u8>>());
        self.cache.insert(path.clone(), Arc::clone(&bytes));
        Ok(LoadResult::loaded(bytes, path.clone()))
    }

    fn apply(&self, slot: &Slot, result: LoadResult<String, Arc<Vec<u8>>>) {
        *slot.thumbnail.lock().unwrap() = result.payload;
        let _ = self.applied.send((result.asset, result.cached));
    }
}

// ---

#[test]
fn test_second_request_is_served_from_cache() -> Result<()> {
    let _ = env_logger::builder().is_test(true).try_init();
    let (applied, rx) = crossbeam_channel::unbounded();
    let loader = ThumbnailLoader {
        cache: BoundedCache::new(8, EvictionOrder::Access),
        decodes: AtomicUsize::new(0),
        applied,
    };
    let engine = LoadEngine::new(loader, EngineConfig::default().with_pool_sizes(1, 2))?;
    let first = Arc::new(Slot::default());
    let second = Arc::new(Slot::default());

    engine.load_into(&first, "beach.jpg".to_string())?;
    assert_eq!(
        rx.recv_timeout(Duration::from_secs(5))?,
        ("beach.jpg".to_string(), false)
    );

    engine.load_into(&second, "beach.jpg".to_string())?;
    assert_eq!(
        rx.recv_timeout(Duration::from_secs(5))?,
        ("beach.jpg".to_string(), true)
    );

    assert_eq!(engine.loader().decodes.load(Ordering::SeqCst), 1);
    assert_eq!(engine.loader().cache.stats().hits, 1);
    let shown = second.thumbnail.lock().unwrap().clone();
    assert_eq!(shown.as_deref(), Some(&b"gpj.hcaeb".to_vec()));
    Ok(())
}

#[test]
fn test_evicted_entry_is_decoded_again() -> Result<()> {
    let (applied, rx) = crossbeam_channel::unbounded();
    let loader = ThumbnailLoader {
        cache: BoundedCache::new(1, EvictionOrder::Insertion),
        decodes: AtomicUsize::new(0),
        applied,
    };
    let engine = LoadEngine::new(loader, EngineConfig::default().with_pool_sizes(1, 1))?;
    let slot = Arc::new(Slot::default());

    for path in ["a.jpg", "b.jpg", "a.jpg"] {
        engine.load_into(&slot, path.to_string())?;
        let (asset, cached) = rx.recv_timeout(Duration::from_secs(5))?;
        assert_eq!(asset, path);
        assert!(!cached);
    }

    assert_eq!(engine.loader().decodes.load(Ordering::SeqCst), 3);
    assert_eq!(engine.loader().cache.keys(), vec!["a.jpg".to_string()]);
    Ok(())
}
