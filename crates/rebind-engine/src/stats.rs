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

//! Counters describing what the engine did with each request.

use std::sync::atomic::{AtomicU64, Ordering};

/// A snapshot of the engine's counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EngineStats {
    /// `load_into` calls accepted while the engine was live.
    pub requested: u64,
    /// Requests whose `initialise` returned `false`.
    pub aborted: u64,
    /// Loads handed to the scheduler or the pool.
    pub scheduled: u64,
    /// Calls made to the loader's `load`.
    pub loads_started: u64,
    /// `load` calls that returned an error or panicked.
    pub load_failures: u64,
    /// `load` calls that succeeded without a payload.
    pub empty_results: u64,
    /// Loads skipped because the target was rebound before they started.
    pub stale_before_load: u64,
    /// Results dropped because the target was rebound while loading.
    pub stale_after_load: u64,
    /// Results dropped on the apply context just before `apply`.
    pub stale_before_apply: u64,
    /// Calls made to the loader's `apply`.
    pub applied: u64,
}

impl EngineStats {
    /// Total results discarded by any of the three freshness checks.
    pub fn stale_total(&self) -> u64 {
        self.stale_before_load + self.stale_after_load + self.stale_before_apply
    }
}

#[derive(Debug, Default)]
pub(crate) struct Counters {
    pub(crate) requested: AtomicU64,
    pub(crate) aborted: AtomicU64,
    pub(crate) scheduled: AtomicU64,
    pub(crate) loads_started: AtomicU64,
    pub(crate) load_failures: AtomicU64,
    pub(crate) empty_results: AtomicU64,
    pub(crate) stale_before_load: AtomicU64,
    pub(crate) stale_after_load: AtomicU64,
    pub(crate) stale_before_apply: AtomicU64,
    pub(crate) applied: AtomicU64,
}

impl Counters {
    pub(crate) fn bump(counter: &AtomicU64) {
        counter.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn snapshot(&self) -> EngineStats {
        let read = |counter: &AtomicU64| counter.load(Ordering::Relaxed);
        EngineStats {
            requested: read(&self.requested),
            aborted: read(&self.aborted),
            scheduled: read(&self.scheduled),
            loads_started: read(&self.loads_started),
            load_failures: read(&self.load_failures),
            empty_results: read(&self.empty_results),
            stale_before_load: read(&self.stale_before_load),
            stale_after_load: read(&self.stale_after_load),
            stale_before_apply: read(&self.stale_before_apply),
            applied: read(&self.applied),
        }
    }
}
