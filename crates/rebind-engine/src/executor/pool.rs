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

//! An elastic pool of worker threads.
//!
//! The pool keeps up to `core_size` long-lived workers. When a job arrives and
//! every worker already has a job, an extra worker is spawned, up to `max_size`.
//! Extra workers retire once they have been idle for `keep_alive`.

use super::{panic_message, Job};
use crate::error::{EngineError, EngineResult};
use crossbeam_channel::{Receiver, RecvTimeoutError, Sender};
use std::panic::{self, AssertUnwindSafe};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::thread;
use std::time::Duration;

struct PoolState {
    /// `None` once the pool is shut down; dropping it disconnects idle workers.
    sender: Option<Sender<Job>>,
    workers: usize,
    /// Jobs queued or running.
    outstanding: usize,
    spawned_total: usize,
}

struct PoolShared {
    state: Mutex<PoolState>,
    receiver: Receiver<Job>,
    core_size: usize,
    max_size: usize,
    keep_alive: Duration,
    name: String,
}

impl PoolShared {
    fn lock(&self) -> MutexGuard<'_, PoolState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// A bounded, growable pool of threads executing [`Job`]s in FIFO order.
pub struct WorkerPool {
    shared: Arc<PoolShared>,
}

impl WorkerPool {
    /// Creates a pool. No thread is spawned until the first job arrives.
    pub fn new(core_size: usize, max_size: usize, keep_alive: Duration, name: &str) -> Self {
        let (sender, receiver) = crossbeam_channel::unbounded();
        Self {
            shared: Arc::new(PoolShared {
                state: Mutex::new(PoolState {
                    sender: Some(sender),
                    workers: 0,
                    outstanding: 0,
                    spawned_total: 0,
                }),
                receiver,
                core_size: core_size.max(1),
                max_size: max_size.max(core_size).max(1),
                keep_alive,
                name: name.to_string(),
            }),
        }
    }

    /// Queues a job, spawning a worker if none is free and the pool may grow.
    ///
    /// Fails with [`EngineError::Disposed`] after [`shutdown`](Self::shutdown).
    /// Fails with [`EngineError::ThreadSpawn`] only if the pool has no worker at
    /// all to run the job.
    pub fn execute(&self, job: Job) -> EngineResult<()> {
        let mut state = self.shared.lock();
        let Some(sender) = state.sender.as_ref() else {
            return Err(EngineError::Disposed);
        };
        sender.send(job).map_err(|_| EngineError::Disposed)?;
        state.outstanding += 1;

        let must_grow = state.workers < self.shared.core_size
            || (state.outstanding > state.workers && state.workers < self.shared.max_size);
        if must_grow {
            let id = state.spawned_total;
            let name = format!("{}-worker-{}", self.shared.name, id);
            let shared = Arc::clone(&self.shared);
            match thread::Builder::new()
                .name(name.clone())
                .spawn(move || worker_loop(shared))
            {
                Ok(_) => {
                    state.workers += 1;
                    state.spawned_total += 1;
                    log::debug!("WorkerPool: spawned '{}' ({} live)", name, state.workers);
                }
                Err(source) if state.workers == 0 => {
                    return Err(EngineError::ThreadSpawn { name, source });
                }
                Err(e) => {
                    log::warn!("WorkerPool: could not grow beyond {} workers: {e}", state.workers);
                }
            }
        }
        Ok(())
    }

    /// Stops accepting jobs and drops every job that has not started yet.
    ///
    /// Running jobs are not interrupted; their workers exit once they finish.
    /// Calling this more than once is harmless.
    pub fn shutdown(&self) {
        let mut state = self.shared.lock();
        if state.sender.take().is_none() {
            return;
        }
        let mut dropped = 0;
        while self.shared.receiver.try_recv().is_ok() {
            dropped += 1;
        }
        state.outstanding -= dropped;
        log::debug!(
            "WorkerPool '{}': shut down, {} queued job(s) dropped",
            self.shared.name,
            dropped
        );
    }

    /// Returns `true` once [`shutdown`](Self::shutdown) has been called.
    pub fn is_shut_down(&self) -> bool {
        self.shared.lock().sender.is_none()
    }

    /// Number of live worker threads.
    pub fn worker_count(&self) -> usize {
        self.shared.lock().workers
    }

    /// Jobs waiting for a worker.
    pub fn queued(&self) -> usize {
        self.shared.receiver.len()
    }
}

impl Drop for WorkerPool {
    fn drop(&mut self) {
        self.shutdown();
    }
}

fn worker_loop(shared: Arc<PoolShared>) {
    loop {
        let may_retire = shared.lock().workers > shared.core_size;

        let next = if may_retire {
            shared.receiver.recv_timeout(shared.keep_alive)
        } else {
            shared
                .receiver
                .recv()
                .map_err(|_| RecvTimeoutError::Disconnected)
        };

        match next {
            Ok(job) => {
                if let Err(payload) = panic::catch_unwind(AssertUnwindSafe(job)) {
                    log::error!(
                        "WorkerPool '{}': job panicked: {}",
                        shared.name,
                        panic_message(payload.as_ref())
                    );
                }
                let mut state = shared.lock();
                state.outstanding = state.outstanding.saturating_sub(1);
            }
            Err(RecvTimeoutError::Timeout) => {
                let mut state = shared.lock();
                // Jobs are queued under the lock, so an empty queue here is final.
                if state.workers > shared.core_size && shared.receiver.is_empty() {
                    state.workers -= 1;
                    log::trace!("WorkerPool '{}': idle worker retired", shared.name);
                    return;
                }
            }
            Err(RecvTimeoutError::Disconnected) => {
                shared.lock().workers -= 1;
                return;
            }
        }
    }
}
