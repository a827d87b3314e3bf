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

//! The association table mapping each target to the binding last made for it.
//!
//! Targets are keyed by the address of their `Arc` allocation. Each record
//! holds a `Weak` to its target, which keeps that allocation (and so the key)
//! from being reused while the record exists, without keeping the target
//! itself alive. Records of dropped targets are swept on later writes.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};

/// Minimum table size before a sweep of dead records is considered.
const MIN_SWEEP_LEN: usize = 64;

/// Identifies one `load_into` call. Strictly increasing per registry.
pub(crate) type Ticket = u64;

struct Binding<T, A> {
    target: Weak<T>,
    ticket: Ticket,
    asset: A,
}

struct Table<T, A> {
    bindings: HashMap<usize, Binding<T, A>>,
    next_ticket: Ticket,
    sweep_at: usize,
}

pub(crate) struct Registry<T, A> {
    table: Mutex<Table<T, A>>,
}

fn identity<T>(target: &Arc<T>) -> usize {
    Arc::as_ptr(target) as *const () as usize
}

impl<T, A> Registry<T, A> {
    pub(crate) fn new() -> Self {
        Self {
            table: Mutex::new(Table {
                bindings: HashMap::new(),
                next_ticket: 0,
                sweep_at: MIN_SWEEP_LEN,
            }),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Table<T, A>> {
        self.table.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Binds `target` to `asset`, superseding any previous binding.
    pub(crate) fn bind(&self, target: &Arc<T>, asset: A) -> Ticket {
        let mut table = self.lock();
        let ticket = table.next_ticket;
        table.next_ticket += 1;
        table.bindings.insert(
            identity(target),
            Binding {
                target: Arc::downgrade(target),
                ticket,
                asset,
            },
        );

        if table.bindings.len() >= table.sweep_at {
            let before = table.bindings.len();
            table.bindings.retain(|_, b| b.target.strong_count() > 0);
            let after = table.bindings.len();
            table.sweep_at = (after * 2).max(MIN_SWEEP_LEN);
            if after < before {
                log::trace!("Registry: swept {} dropped target(s)", before - after);
            }
        }
        ticket
    }

    /// Returns `true` if `ticket` is still the binding of `target`.
    pub(crate) fn is_current(&self, target: &Arc<T>, ticket: Ticket) -> bool {
        self.lock()
            .bindings
            .get(&identity(target))
            .is_some_and(|b| b.ticket == ticket)
    }

    /// Forgets `target`, making any in-flight load for it stale.
    pub(crate) fn retire(&self, target: &Arc<T>) -> bool {
        self.lock().bindings.remove(&identity(target)).is_some()
    }

    /// Number of records, including ones for dropped targets not yet swept.
    pub(crate) fn len(&self) -> usize {
        self.lock().bindings.len()
    }
}

impl<T, A: Clone> Registry<T, A> {
    /// The asset `target` is currently bound to.
    pub(crate) fn asset_of(&self, target: &Arc<T>) -> Option<A> {
        self.lock()
            .bindings
            .get(&identity(target))
            .map(|b| b.asset.clone())
    }
}
