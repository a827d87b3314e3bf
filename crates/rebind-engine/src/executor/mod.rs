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

//! Threads that run engine work: the elastic worker pool for loads, the timer
//! thread for delayed loads, and the serialized executors for applies.

mod apply;
mod pool;
mod scheduler;

pub use apply::{ApplyExecutor, ApplyTask, ApplyThread, ManualApplyQueue};
pub use pool::WorkerPool;
pub use scheduler::DelayScheduler;

use std::any::Any;

/// A unit of background work.
pub type Job = Box<dyn FnOnce() + Send + 'static>;

/// Extracts a readable message from a panic payload.
pub(crate) fn panic_message(payload: &(dyn Any + Send)) -> &str {
    if let Some(message) = payload.downcast_ref::<&'static str>() {
        message
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.as_str()
    } else {
        "non-string panic payload"
    }
}
