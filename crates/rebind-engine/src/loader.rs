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

//! The capability set a caller plugs into the engine.

use std::fmt::Debug;

/// The outcome of one successful `load`: a payload (possibly absent) and the
/// asset it was produced for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadResult<A, P> {
    /// The produced payload. `None` means there is nothing to apply.
    pub payload: Option<P>,
    /// The asset the payload was produced for.
    pub asset: A,
    /// `true` if the payload came from a cache rather than fresh work.
    pub cached: bool,
}

impl<A, P> LoadResult<A, P> {
    /// A freshly produced payload.
    pub fn loaded(payload: P, asset: A) -> Self {
        Self {
            payload: Some(payload),
            asset,
            cached: false,
        }
    }

    /// A payload served from a cache.
    pub fn cached(payload: P, asset: A) -> Self {
        Self {
            payload: Some(payload),
            asset,
            cached: true,
        }
    }

    /// A result with nothing to apply.
    pub fn empty(asset: A) -> Self {
        Self {
            payload: None,
            asset,
            cached: false,
        }
    }

    /// Returns `true` if there is a payload to apply.
    pub fn has_payload(&self) -> bool {
        self.payload.is_some()
    }
}

/// What a running `load` can ask the engine about its own request.
///
/// A long load can poll [`is_stale`](Self::is_stale) and give up early once the
/// target has been rebound, retired, or the engine disposed. Giving up is
/// optional: a stale result is discarded by the engine either way.
pub struct LoadContext<'a> {
    still_current: &'a dyn Fn() -> bool,
}

fn always_current() -> bool {
    true
}

impl<'a> LoadContext<'a> {
    pub(crate) fn new(still_current: &'a dyn Fn() -> bool) -> Self {
        Self { still_current }
    }

    /// A context that never reports staleness, for driving a loader directly.
    pub fn detached() -> LoadContext<'static> {
        LoadContext {
            still_current: &always_current,
        }
    }

    /// Returns `true` once the result of this load can no longer be applied.
    pub fn is_stale(&self) -> bool {
        !(self.still_current)()
    }
}

/// The three operations the engine orchestrates.
///
/// The engine is generic over a `Loader` instead of requiring a base type:
/// it owns the scheduling and staleness tracking, the loader owns what a
/// target, an asset and a payload actually are.
pub trait Loader: Send + Sync + 'static {
    /// The reusable slot that receives payloads, e.g. a list row.
    type Target: Send + Sync + 'static;
    /// The descriptor of what should be loaded, e.g. a resource path.
    type Asset: Clone + Debug + Send + Sync + 'static;
    /// The derived value installed on the target, e.g. a decoded image.
    type Payload: Send + 'static;

    /// Prepares `target` for loading `asset`, e.g. shows a placeholder.
    ///
    /// Runs on the thread calling `load_into`. Returning `false` aborts the
    /// request: nothing is recorded and nothing is scheduled.
    fn initialise(&self, target: &Self::Target, asset: &Self::Asset) -> bool;

    /// Produces the payload for `asset`. Runs on a pool worker and may block.
    ///
    /// An error (or a panic) is logged by the engine and nothing is applied.
    /// `context` reports whether the request has been superseded meanwhile.
    fn load(
        &self,
        target: &Self::Target,
        asset: &Self::Asset,
        context: &LoadContext<'_>,
    ) -> anyhow::Result<LoadResult<Self::Asset, Self::Payload>>;

    /// Installs a fresh result on `target`. Runs on the apply executor.
    fn apply(&self, target: &Self::Target, result: LoadResult<Self::Asset, Self::Payload>);
}
