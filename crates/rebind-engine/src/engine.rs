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

//! The load-and-apply orchestrator.
//!
//! A request binds a target to an asset, then a pool worker runs the loader's
//! `load` and a serialized executor runs its `apply`. A result is only applied
//! while the target is still bound to the request that produced it. Freshness
//! is checked three times:
//!
//! 1. on the worker, before `load` (a superseded request never loads),
//! 2. on the worker, after `load` (a superseded result is never posted),
//! 3. on the apply executor, right before `apply`.
//!
//! The first two only save work. The third is what makes the guarantee hold:
//! it runs synchronously on the same context as `apply`, so nothing posted to
//! that context can rebind the target between the check and the apply.

use crate::config::EngineConfig;
use crate::error::{EngineError, EngineResult};
use crate::executor::{panic_message, ApplyExecutor, ApplyThread, DelayScheduler, Job, WorkerPool};
use crate::loader::{LoadContext, LoadResult, Loader};
use crate::registry::{Registry, Ticket};
use crate::stats::{Counters, EngineStats};
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// A `(target, asset)` pair captured when a load is requested.
struct PendingLoad<T, A> {
    target: Arc<T>,
    asset: A,
    ticket: Ticket,
}

/// Which freshness check dropped a request.
#[derive(Debug, Clone, Copy)]
enum Checkpoint {
    BeforeLoad,
    AfterLoad,
    BeforeApply,
}

struct Shared<L: Loader> {
    loader: L,
    registry: Registry<L::Target, L::Asset>,
    apply: Arc<dyn ApplyExecutor>,
    disposed: AtomicBool,
    counters: Counters,
}

impl<L: Loader> Shared<L> {
    fn is_disposed(&self) -> bool {
        self.disposed.load(Ordering::Acquire)
    }

    /// Returns `true` if `pending` may proceed past `checkpoint`.
    fn is_fresh(&self, pending: &PendingLoad<L::Target, L::Asset>, checkpoint: Checkpoint) -> bool {
        if self.is_disposed() {
            return false;
        }
        if self.registry.is_current(&pending.target, pending.ticket) {
            return true;
        }

        let counter = match checkpoint {
            Checkpoint::BeforeLoad => &self.counters.stale_before_load,
            Checkpoint::AfterLoad => &self.counters.stale_after_load,
            Checkpoint::BeforeApply => &self.counters.stale_before_apply,
        };
        Counters::bump(counter);
        log::trace!(
            "Dropping stale load of {:?} for target {:p} ({:?})",
            pending.asset,
            Arc::as_ptr(&pending.target),
            checkpoint
        );
        false
    }

    /// Worker side: checkpoints 1 and 2 around the loader's `load`.
    fn run_load(self: &Arc<Self>, pending: PendingLoad<L::Target, L::Asset>) {
        if !self.is_fresh(&pending, Checkpoint::BeforeLoad) {
            return;
        }

        Counters::bump(&self.counters.loads_started);
        let still_current =
            || !self.is_disposed() && self.registry.is_current(&pending.target, pending.ticket);
        let context = LoadContext::new(&still_current);
        let outcome = panic::catch_unwind(AssertUnwindSafe(|| {
            self.loader.load(&pending.target, &pending.asset, &context)
        }));
        let result = match outcome {
            Ok(Ok(result)) => result,
            Ok(Err(e)) => {
                Counters::bump(&self.counters.load_failures);
                log::error!(
                    "Failed to load payload for asset {:?} (target {:p}): {e:#}",
                    pending.asset,
                    Arc::as_ptr(&pending.target)
                );
                return;
            }
            Err(payload) => {
                Counters::bump(&self.counters.load_failures);
                log::error!(
                    "Loader panicked for asset {:?} (target {:p}): {}",
                    pending.asset,
                    Arc::as_ptr(&pending.target),
                    panic_message(payload.as_ref())
                );
                return;
            }
        };

        if !result.has_payload() {
            Counters::bump(&self.counters.empty_results);
            log::trace!("Nothing to apply for asset {:?}", pending.asset);
            return;
        }
        if !self.is_fresh(&pending, Checkpoint::AfterLoad) {
            return;
        }

        let shared = Arc::clone(self);
        let posted = self
            .apply
            .post(Box::new(move || shared.run_apply(pending, result)));
        if !posted {
            log::debug!("Apply executor closed, dropping loaded result.");
        }
    }

    /// Apply side: checkpoint 3, then the loader's `apply`.
    fn run_apply(
        &self,
        pending: PendingLoad<L::Target, L::Asset>,
        result: LoadResult<L::Asset, L::Payload>,
    ) {
        if !self.is_fresh(&pending, Checkpoint::BeforeApply) || !result.has_payload() {
            return;
        }
        self.loader.apply(&pending.target, result);
        Counters::bump(&self.counters.applied);
    }
}

/// Loads payloads for targets in the background and applies them on a single
/// serialized executor, discarding results for targets rebound in the meantime.
///
/// Binding a target again with [`load_into`](Self::load_into) supersedes every
/// earlier request for it, whether or not the asset changed. Calling it rapidly
/// with a delay therefore debounces: only the last request loads.
///
/// The engine owns its worker pool, its timer thread and (unless another
/// executor was supplied) its apply thread; [`dispose`](Self::dispose) releases
/// them all and is also run on drop.
pub struct LoadEngine<L: Loader> {
    shared: Arc<Shared<L>>,
    pool: Arc<WorkerPool>,
    scheduler: DelayScheduler,
    config: EngineConfig,
}

impl<L: Loader> LoadEngine<L> {
    /// Creates an engine that applies results on a dedicated thread.
    pub fn new(loader: L, config: EngineConfig) -> EngineResult<Self> {
        config.validate()?;
        let apply = Arc::new(ApplyThread::spawn(&config.thread_name)?);
        Self::with_executor(loader, config, apply)
    }

    /// Creates an engine that posts applies to `executor`.
    ///
    /// Use a [`ManualApplyQueue`](crate::ManualApplyQueue) to run applies on a
    /// thread the caller already owns.
    pub fn with_executor(
        loader: L,
        config: EngineConfig,
        executor: Arc<dyn ApplyExecutor>,
    ) -> EngineResult<Self> {
        config.validate()?;
        let pool = Arc::new(WorkerPool::new(
            config.core_pool_size,
            config.max_pool_size,
            config.keep_alive(),
            &config.thread_name,
        ));
        let scheduler = DelayScheduler::spawn(Arc::clone(&pool), &config.thread_name)?;

        log::info!(
            "LoadEngine '{}' started (pool {}..{}, default delay {} ms).",
            config.thread_name,
            config.core_pool_size,
            config.max_pool_size,
            config.default_delay_ms
        );

        Ok(Self {
            shared: Arc::new(Shared {
                loader,
                registry: Registry::new(),
                apply: executor,
                disposed: AtomicBool::new(false),
                counters: Counters::default(),
            }),
            pool,
            scheduler,
            config,
        })
    }

    /// Requests `asset` for `target` after the engine's default delay.
    ///
    /// See [`load_into_with_delay`](Self::load_into_with_delay).
    pub fn load_into(&self, target: &Arc<L::Target>, asset: L::Asset) -> EngineResult<bool> {
        self.load_into_with_delay(target, asset, None)
    }

    /// Requests `asset` for `target` after `delay` (`None` uses the default).
    ///
    /// Returns `Ok(false)` if the loader's `initialise` declined the request,
    /// `Ok(true)` once the load is scheduled, and [`EngineError::Disposed`]
    /// after [`dispose`](Self::dispose), in which case `initialise` is not called.
    pub fn load_into_with_delay(
        &self,
        target: &Arc<L::Target>,
        asset: L::Asset,
        delay: Option<Duration>,
    ) -> EngineResult<bool> {
        if self.shared.is_disposed() {
            return Err(EngineError::Disposed);
        }
        Counters::bump(&self.shared.counters.requested);

        if !self.shared.loader.initialise(target, &asset) {
            Counters::bump(&self.shared.counters.aborted);
            return Ok(false);
        }

        let ticket = self.shared.registry.bind(target, asset.clone());
        let pending = PendingLoad {
            target: Arc::clone(target),
            asset,
            ticket,
        };
        let shared = Arc::clone(&self.shared);
        let job: Job = Box::new(move || shared.run_load(pending));

        let delay = delay.unwrap_or_else(|| self.config.default_delay());
        if delay.is_zero() {
            self.pool.execute(job)?;
        } else {
            self.scheduler.schedule(delay, job)?;
        }
        Counters::bump(&self.shared.counters.scheduled);
        Ok(true)
    }

    /// The asset `target` is currently bound to, if any.
    pub fn bound_asset(&self, target: &Arc<L::Target>) -> Option<L::Asset> {
        self.shared.registry.asset_of(target)
    }

    /// Forgets `target` for good; any in-flight load for it is discarded.
    ///
    /// Returns `true` if the target had a binding.
    pub fn retire(&self, target: &Arc<L::Target>) -> bool {
        self.shared.registry.retire(target)
    }

    /// Number of targets the engine currently tracks.
    pub fn tracked_targets(&self) -> usize {
        self.shared.registry.len()
    }

    /// Drops all pending work and releases the engine's threads.
    ///
    /// Loads already running are allowed to finish and are then discarded.
    /// Once this returns, `apply` is not called again (unless `dispose` runs on
    /// the apply thread itself, where the current apply finishes first).
    /// With a [`ManualApplyQueue`](crate::ManualApplyQueue) there is no thread to
    /// join, so that guarantee only holds when `dispose` is called from the
    /// thread that pumps the queue; a `run_pending` already underway elsewhere
    /// may still finish its current task.
    /// Calling it more than once is harmless.
    pub fn dispose(&self) {
        if self.shared.disposed.swap(true, Ordering::AcqRel) {
            return;
        }
        self.scheduler.shutdown();
        self.pool.shutdown();
        self.shared.apply.shutdown();
        log::info!("LoadEngine '{}' disposed.", self.config.thread_name);
    }

    /// Returns `true` once [`dispose`](Self::dispose) has been called.
    pub fn is_disposed(&self) -> bool {
        self.shared.is_disposed()
    }

    /// A snapshot of the engine's counters.
    pub fn stats(&self) -> EngineStats {
        self.shared.counters.snapshot()
    }

    /// The configuration the engine was built with.
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// The loader the engine drives.
    pub fn loader(&self) -> &L {
        &self.shared.loader
    }
}

impl<L: Loader> Drop for LoadEngine<L> {
    fn drop(&mut self) {
        self.dispose();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;

    /// Doubles numbers; declines negative ones.
    struct Doubler {
        applied: AtomicUsize,
    }

    impl Loader for Doubler {
        type Target = AtomicUsize;
        type Asset = i64;
        type Payload = usize;

        fn initialise(&self, _: &AtomicUsize, asset: &i64) -> bool {
            *asset >= 0
        }

        fn load(
            &self,
            _: &AtomicUsize,
            asset: &i64,
            _: &LoadContext<'_>,
        ) -> anyhow::Result<LoadResult<i64, usize>> {
            Ok(LoadResult::loaded(*asset as usize * 2, *asset))
        }

        fn apply(&self, target: &AtomicUsize, result: LoadResult<i64, usize>) {
            if let Some(value) = result.payload {
                target.store(value, Ordering::SeqCst);
                self.applied.fetch_add(1, Ordering::SeqCst);
            }
        }
    }

    fn engine() -> LoadEngine<Doubler> {
        let config = EngineConfig::default()
            .with_pool_sizes(1, 2)
            .with_thread_name("unit");
        LoadEngine::new(
            Doubler {
                applied: AtomicUsize::new(0),
            },
            config,
        )
        .unwrap()
    }

    #[test]
    fn test_counts_requests() {
        let engine = engine();
        let target = Arc::new(AtomicUsize::new(0));

        assert!(!engine.load_into(&target, -1).unwrap());
        assert!(engine.load_into(&target, 21).unwrap());

        let deadline = std::time::Instant::now() + Duration::from_secs(5);
        while engine.loader().applied.load(Ordering::SeqCst) == 0 {
            assert!(std::time::Instant::now() < deadline);
            std::thread::sleep(Duration::from_millis(2));
        }

        assert_eq!(target.load(Ordering::SeqCst), 42);
        let stats = engine.stats();
        assert_eq!(stats.requested, 2);
        assert_eq!(stats.aborted, 1);
        assert_eq!(stats.scheduled, 1);
        assert_eq!(stats.loads_started, 1);
        assert_eq!(stats.applied, 1);
    }

    #[test]
    fn test_drop_disposes() {
        let engine = engine();
        let target = Arc::new(AtomicUsize::new(0));
        engine
            .load_into_with_delay(&target, 5, Some(Duration::from_secs(30)))
            .unwrap();
        // Dropping must not wait for the delayed load.
        drop(engine);
        assert_eq!(target.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_config_is_kept() {
        let engine = engine();
        assert_eq!(engine.config().core_pool_size, 1);
        assert_eq!(engine.config().max_pool_size, 2);
        assert!(!engine.is_disposed());
    }
}
