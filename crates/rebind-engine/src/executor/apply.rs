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

//! Serialized execution contexts for `apply`.
//!
//! Every apply task runs on exactly one logical thread, in the order it was
//! posted. [`ApplyThread`] owns a dedicated thread for that. [`ManualApplyQueue`]
//! lets the caller drain the queue from a thread it already runs, such as a UI
//! loop.

use super::panic_message;
use crate::error::{EngineError, EngineResult};
use crossbeam_channel::{Receiver, RecvTimeoutError, Sender, TryRecvError};
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::thread::{self, JoinHandle, ThreadId};
use std::time::Duration;

/// A task posted to an [`ApplyExecutor`].
pub type ApplyTask = Box<dyn FnOnce() + Send + 'static>;

/// A serialized execution context.
///
/// Implementations run posted tasks one at a time, in submission order, each
/// exactly once, until [`shutdown`](ApplyExecutor::shutdown).
pub trait ApplyExecutor: Send + Sync {
    /// Queues `task`. Returns `false` if the executor no longer accepts work.
    fn post(&self, task: ApplyTask) -> bool;

    /// Stops accepting tasks and discards the ones not yet started.
    ///
    /// Once this returns, no task posted to the executor starts running, unless
    /// it is called from within a task, in which case that task finishes first.
    fn shutdown(&self);
}

/// An [`ApplyExecutor`] backed by one dedicated thread.
///
/// A panic inside a task is logged and the thread moves on to the next task.
pub struct ApplyThread {
    sender: Mutex<Option<Sender<ApplyTask>>>,
    closed: Arc<AtomicBool>,
    handle: Mutex<Option<JoinHandle<()>>>,
    thread_id: ThreadId,
}

impl ApplyThread {
    /// Spawns the apply thread, named `"{name}-apply"`.
    pub fn spawn(name: &str) -> EngineResult<Self> {
        let (sender, receiver) = crossbeam_channel::unbounded::<ApplyTask>();
        let closed = Arc::new(AtomicBool::new(false));
        let thread_closed = Arc::clone(&closed);
        let thread_name = format!("{name}-apply");

        let handle = thread::Builder::new()
            .name(thread_name.clone())
            .spawn(move || apply_loop(receiver, thread_closed))
            .map_err(|source| EngineError::ThreadSpawn {
                name: thread_name,
                source,
            })?;

        Ok(Self {
            sender: Mutex::new(Some(sender)),
            closed,
            thread_id: handle.thread().id(),
            handle: Mutex::new(Some(handle)),
        })
    }
}

impl ApplyExecutor for ApplyThread {
    fn post(&self, task: ApplyTask) -> bool {
        if self.closed.load(Ordering::Acquire) {
            return false;
        }
        let sender = self.sender.lock().unwrap_or_else(PoisonError::into_inner);
        match sender.as_ref() {
            Some(sender) => sender.send(task).is_ok(),
            None => false,
        }
    }

    fn shutdown(&self) {
        self.closed.store(true, Ordering::Release);
        // Dropping the sender ends the loop once the queue is empty.
        drop(
            self.sender
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .take(),
        );

        if thread::current().id() == self.thread_id {
            return;
        }
        let handle = self
            .handle
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(handle) = handle {
            if handle.join().is_err() {
                log::error!("ApplyThread: apply thread panicked");
            }
        }
    }
}

impl Drop for ApplyThread {
    fn drop(&mut self) {
        self.shutdown();
    }
}

fn apply_loop(receiver: Receiver<ApplyTask>, closed: Arc<AtomicBool>) {
    log::debug!("Apply thread started.");
    for task in receiver.iter() {
        if closed.load(Ordering::Acquire) {
            break;
        }
        if let Err(payload) = panic::catch_unwind(AssertUnwindSafe(task)) {
            log::error!(
                "Apply task panicked: {}",
                panic_message(payload.as_ref())
            );
        }
    }
    log::debug!("Apply thread stopped.");
}

/// An [`ApplyExecutor`] whose tasks run only when the owner pumps it.
///
/// Call [`run_pending`](Self::run_pending) from the thread that owns the
/// targets, e.g. once per frame. Panics inside a task propagate to that caller.
///
/// `shutdown` cannot wait for a task running on another thread, so dispose the
/// engine from the same thread that pumps the queue.
#[derive(Clone)]
pub struct ManualApplyQueue {
    sender: Sender<ApplyTask>,
    receiver: Receiver<ApplyTask>,
    closed: Arc<AtomicBool>,
}

impl ManualApplyQueue {
    /// Creates an empty queue.
    pub fn new() -> Self {
        let (sender, receiver) = crossbeam_channel::unbounded();
        Self {
            sender,
            receiver,
            closed: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Runs every task queued so far on the calling thread.
    ///
    /// Returns the number of tasks run.
    pub fn run_pending(&self) -> usize {
        let mut ran = 0;
        loop {
            if self.closed.load(Ordering::Acquire) {
                break;
            }
            match self.receiver.try_recv() {
                Ok(task) => {
                    task();
                    ran += 1;
                }
                Err(TryRecvError::Empty) | Err(TryRecvError::Disconnected) => break,
            }
        }
        ran
    }

    /// Waits up to `timeout` for a task, then runs everything queued.
    ///
    /// Returns the number of tasks run.
    pub fn run_pending_timeout(&self, timeout: Duration) -> usize {
        if self.closed.load(Ordering::Acquire) {
            return 0;
        }
        match self.receiver.recv_timeout(timeout) {
            Ok(task) => {
                task();
                1 + self.run_pending()
            }
            Err(RecvTimeoutError::Timeout) | Err(RecvTimeoutError::Disconnected) => 0,
        }
    }

    /// Tasks waiting to run.
    pub fn len(&self) -> usize {
        self.receiver.len()
    }

    /// Returns `true` if no task is waiting.
    pub fn is_empty(&self) -> bool {
        self.receiver.is_empty()
    }
}

impl Default for ManualApplyQueue {
    fn default() -> Self {
        Self::new()
    }
}

impl ApplyExecutor for ManualApplyQueue {
    fn post(&self, task: ApplyTask) -> bool {
        !self.closed.load(Ordering::Acquire) && self.sender.send(task).is_ok()
    }

    fn shutdown(&self) {
        self.closed.store(true, Ordering::Release);
        while self.receiver.try_recv().is_ok() {}
    }
}
