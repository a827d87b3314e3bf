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

//! A timer thread that hands delayed jobs to the worker pool once they are due.

use super::{Job, WorkerPool};
use crate::error::{EngineError, EngineResult};
use crossbeam_channel::{Receiver, RecvTimeoutError, Sender};
use std::cmp::Ordering;
use std::collections::BinaryHeap;
use std::sync::{Arc, Mutex, PoisonError};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

enum Command {
    Schedule { deadline: Instant, job: Job },
    Shutdown,
}

struct Timed {
    deadline: Instant,
    seq: u64,
    job: Job,
}

// Reversed so that `BinaryHeap` pops the earliest deadline first; equal
// deadlines keep submission order.
impl Ord for Timed {
    fn cmp(&self, other: &Self) -> Ordering {
        other
            .deadline
            .cmp(&self.deadline)
            .then_with(|| other.seq.cmp(&self.seq))
    }
}

impl PartialOrd for Timed {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl PartialEq for Timed {
    fn eq(&self, other: &Self) -> bool {
        self.deadline == other.deadline && self.seq == other.seq
    }
}

impl Eq for Timed {}

/// Defers jobs by a delay, then submits them to a [`WorkerPool`].
///
/// Jobs still waiting for their deadline when the scheduler shuts down are
/// dropped without running.
pub struct DelayScheduler {
    commands: Sender<Command>,
    handle: Mutex<Option<JoinHandle<()>>>,
}

impl DelayScheduler {
    /// Spawns the timer thread.
    pub fn spawn(pool: Arc<WorkerPool>, name: &str) -> EngineResult<Self> {
        let (commands, receiver) = crossbeam_channel::unbounded();
        let thread_name = format!("{name}-timer");
        let handle = thread::Builder::new()
            .name(thread_name.clone())
            .spawn(move || timer_loop(receiver, pool))
            .map_err(|source| EngineError::ThreadSpawn {
                name: thread_name,
                source,
            })?;

        Ok(Self {
            commands,
            handle: Mutex::new(Some(handle)),
        })
    }

    /// Submits `job` to the pool once `delay` has elapsed.
    pub fn schedule(&self, delay: Duration, job: Job) -> EngineResult<()> {
        let deadline = Instant::now() + delay;
        self.commands
            .send(Command::Schedule { deadline, job })
            .map_err(|_| EngineError::Disposed)
    }

    /// Stops the timer thread, dropping every job that is not yet due.
    pub fn shutdown(&self) {
        let handle = self
            .handle
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(handle) = handle {
            let _ = self.commands.send(Command::Shutdown);
            if handle.join().is_err() {
                log::error!("DelayScheduler: timer thread panicked");
            }
        }
    }
}

impl Drop for DelayScheduler {
    fn drop(&mut self) {
        self.shutdown();
    }
}

fn timer_loop(commands: Receiver<Command>, pool: Arc<WorkerPool>) {
    let mut pending: BinaryHeap<Timed> = BinaryHeap::new();
    let mut seq = 0u64;
    log::debug!("DelayScheduler thread started.");

    loop {
        let now = Instant::now();
        while pending.peek().is_some_and(|next| next.deadline <= now) {
            if let Some(due) = pending.pop() {
                if let Err(e) = pool.execute(due.job) {
                    log::debug!("DelayScheduler: dropping due job: {e}");
                }
            }
        }

        let command = match pending.peek() {
            Some(next) => commands.recv_deadline(next.deadline),
            None => commands
                .recv()
                .map_err(|_| RecvTimeoutError::Disconnected),
        };

        match command {
            Ok(Command::Schedule { deadline, job }) => {
                pending.push(Timed { deadline, seq, job });
                seq += 1;
            }
            Err(RecvTimeoutError::Timeout) => {}
            Ok(Command::Shutdown) | Err(RecvTimeoutError::Disconnected) => break,
        }
    }

    log::debug!(
        "DelayScheduler thread stopped, {} pending job(s) dropped.",
        pending.len()
    );
}
