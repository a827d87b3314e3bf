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

//! # Rebind Cache
//!
//! A thread-safe, bounded key/value cache with a configurable eviction order.
//!
//! The cache is the companion of the load engine: a loader consults it before
//! doing real work and populates it with fresh payloads. Nothing enforces that
//! coupling, so the cache is usable on its own.
//!
//! ```
//! use rebind_cache::{BoundedCache, EvictionOrder};
//!
//! let cache = BoundedCache::new(2, EvictionOrder::Access);
//! cache.insert("a", 1);
//! cache.insert("b", 2);
//! assert_eq!(cache.get(&"a"), Some(1));
//! cache.insert("c", 3);
//!
//! // "b" was the least recently used entry.
//! assert!(!cache.contains_key(&"b"));
//! assert!(cache.contains_key(&"a"));
//! ```

#![warn(missing_docs)]

pub mod cache;
pub mod config;
pub mod stats;

pub use cache::BoundedCache;
pub use config::{CacheConfig, CacheConfigError, EvictionOrder};
pub use stats::CacheStats;
