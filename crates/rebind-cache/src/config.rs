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

//! Construction-time configuration for [`BoundedCache`](crate::BoundedCache).

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// The policy deciding which entry leaves the cache when it is full.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum EvictionOrder {
    /// Oldest-inserted entry is evicted first (FIFO).
    ///
    /// Replacing the value of an existing key keeps its original position.
    #[default]
    Insertion,
    /// Least-recently-accessed entry is evicted first (LRU).
    ///
    /// Both `get` and `put` on an existing key count as an access.
    Access,
}

/// Errors raised while reading a [`CacheConfig`].
#[derive(Debug, Error)]
pub enum CacheConfigError {
    /// The RON document could not be parsed.
    #[error("invalid cache configuration: {0}")]
    Parse(#[from] ron::error::SpannedError),
}

/// Configuration for a [`BoundedCache`](crate::BoundedCache).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Maximum number of entries. `0` disables the cache.
    pub max_size: usize,
    /// Which entry is evicted when the cache is full.
    pub eviction: EvictionOrder,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            max_size: 64,
            eviction: EvictionOrder::Insertion,
        }
    }
}

impl CacheConfig {
    /// Creates a configuration with the given capacity and eviction order.
    pub fn new(max_size: usize, eviction: EvictionOrder) -> Self {
        Self { max_size, eviction }
    }

    /// Parses a configuration from a RON document.
    ///
    /// Missing fields fall back to their [`Default`] values.
    pub fn from_ron_str(text: &str) -> Result<Self, CacheConfigError> {
        Ok(ron::from_str(text)?)
    }
}
