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

//! Simulates a scrolling list whose row views are recycled.
//!
//! Five row views show a list of forty items. Every "frame" the list scrolls by
//! one item, so every row is rebound to a new item while its previous load may
//! still be running. Loads are debounced, results are cached, and applies run on
//! the main thread when it pumps the apply queue, as a UI loop would.

use anyhow::Result;
use rebind_cache::{BoundedCache, CacheConfig, EvictionOrder};
use rebind_engine::{EngineConfig, LoadContext, LoadEngine, LoadResult, Loader, ManualApplyQueue};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::thread;
use std::time::Duration;

const ITEMS: usize = 40;
const ROWS: usize = 5;
const FRAMES: usize = 24;
const FRAME_TIME: Duration = Duration::from_millis(16);

/// A recycled row view.
struct RowView {
    index: usize,
    text: Mutex<String>,
}

impl RowView {
    fn text(&self) -> String {
        self.text
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn set_text(&self, text: String) {
        *self.text.lock().unwrap_or_else(PoisonError::into_inner) = text;
    }
}

/// "Renders" an item description into a label, slowly.
struct LabelLoader {
    cache: BoundedCache<usize, Arc<str>>,
    renders: AtomicUsize,
}

impl Loader for LabelLoader {
    type Target = RowView;
    type Asset = usize;
    type Payload = Arc<str>;

    fn initialise(&self, row: &RowView, item: &usize) -> bool {
        if *item >= ITEMS {
            return false;
        }
        // Still bind when the label is cached, so the row's previous load is superseded.
        match self.cache.get(item) {
            Some(label) => row.set_text(label.to_string()),
            None => row.set_text(format!("item #{item:02} (loading)")),
        }
        true
    }

    fn load(
        &self,
        _row: &RowView,
        item: &usize,
        context: &LoadContext<'_>,
    ) -> Result<LoadResult<usize, Arc<str>>> {
        if let Some(label) = self.cache.get(item) {
            return Ok(LoadResult::cached(label, *item));
        }
        if item % 13 == 12 {
            anyhow::bail!("item #{item} has a corrupt thumbnail");
        }

        thread::sleep(Duration::from_millis(10 + (*item as u64 * 7) % 40));
        if context.is_stale() {
            // The row scrolled on while rendering.
            return Ok(LoadResult::empty(*item));
        }
        self.renders.fetch_add(1, Ordering::Relaxed);
        let label: Arc<str> = format!("item #{item:02} [{}]", "*".repeat(item % 5 + 1)).into();
        self.cache.insert(*item, Arc::clone(&label));
        Ok(LoadResult::loaded(label, *item))
    }

    fn apply(&self, row: &RowView, result: LoadResult<usize, Arc<str>>) {
        if let Some(label) = result.payload {
            log::debug!("row {} <- {}", row.index, label);
            row.set_text(label.to_string());
        }
    }
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cache_config = CacheConfig::new(16, EvictionOrder::Access);
    let loader = LabelLoader {
        cache: BoundedCache::with_config(&cache_config),
        renders: AtomicUsize::new(0),
    };
    let engine_config = EngineConfig::default()
        .with_default_delay(Duration::from_millis(30))
        .with_thread_name("demo");

    let ui_queue = ManualApplyQueue::new();
    let engine = LoadEngine::with_executor(loader, engine_config, Arc::new(ui_queue.clone()))?;

    let rows: Vec<Arc<RowView>> = (0..ROWS)
        .map(|index| {
            Arc::new(RowView {
                index,
                text: Mutex::new(String::new()),
            })
        })
        .collect();

    // Scroll down, then back up so that cached labels get reused.
    let offsets = (0..FRAMES / 2).chain((0..FRAMES / 2).rev());
    for offset in offsets {
        for row in &rows {
            let item = (offset + row.index) % ITEMS;
            engine.load_into(row, item)?;
        }
        ui_queue.run_pending_timeout(FRAME_TIME);
    }

    // Let the last requests settle.
    for _ in 0..20 {
        ui_queue.run_pending_timeout(FRAME_TIME);
    }

    for row in &rows {
        log::info!("row {}: {}", row.index, row.text());
    }

    let stats = engine.stats();
    let cache_stats = engine.loader().cache.stats();
    log::info!(
        "requests={} scheduled={} loads={} failures={} stale={} applied={} renders={}",
        stats.requested,
        stats.scheduled,
        stats.loads_started,
        stats.load_failures,
        stats.stale_total(),
        stats.applied,
        engine.loader().renders.load(Ordering::Relaxed)
    );
    log::info!(
        "cache: {} entries, hit rate {:.0}%, {} evictions",
        engine.loader().cache.len(),
        cache_stats.hit_rate() * 100.0,
        cache_stats.evictions
    );

    engine.dispose();
    Ok(())
}
