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

//! Construction-time configuration for the load engine.

use crate::error::{EngineError, EngineResult};
use serde::{Deserialize, Serialize};
use std::thread;
use std::time::Duration;

fn cpu_count() -> usize {
    thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1)
}

/// Configuration for a [`LoadEngine`](crate::LoadEngine).
///
/// The pool sizes given here are honored as-is; the defaults derive them from
/// the number of available CPUs (`cpus + 1` core workers, `cpus * 2 + 1` max).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Delay applied to `load_into` calls that do not specify one, in milliseconds.
    pub default_delay_ms: u64,
    /// Workers kept alive even when idle.
    pub core_pool_size: usize,
    /// Hard upper bound on concurrent workers.
    pub max_pool_size: usize,
    /// How long a worker above the core size may stay idle before it exits.
    pub keep_alive_ms: u64,
    /// Prefix for the names of every thread the engine spawns.
    pub thread_name: String,
}

impl Default for EngineConfig {
    fn default() -> Self {
        let cpus = cpu_count();
        Self {
            default_delay_ms: 0,
            core_pool_size: cpus + 1,
            max_pool_size: cpus * 2 + 1,
            keep_alive_ms: 0,
            thread_name: "rebind".to_string(),
        }
    }
}

impl EngineConfig {
    /// Sets the default load delay.
    pub fn with_default_delay(mut self, delay: Duration) -> Self {
        self.default_delay_ms = delay.as_millis().try_into().unwrap_or(u64::MAX);
        self
    }

    /// Sets the core and maximum worker counts.
    pub fn with_pool_sizes(mut self, core: usize, max: usize) -> Self {
        self.core_pool_size = core;
        self.max_pool_size = max;
        self
    }

    /// Sets the thread name prefix.
    pub fn with_thread_name(mut self, name: impl Into<String>) -> Self {
        self.thread_name = name.into();
        self
    }

    /// The default load delay as a [`Duration`].
    pub fn default_delay(&self) -> Duration {
        Duration::from_millis(self.default_delay_ms)
    }

    /// The idle keep-alive of extra workers as a [`Duration`].
    pub fn keep_alive(&self) -> Duration {
        Duration::from_millis(self.keep_alive_ms)
    }

    /// Checks that the pool sizes are usable.
    pub fn validate(&self) -> EngineResult<()> {
        if self.core_pool_size == 0 {
            return Err(EngineError::InvalidConfig(
                "core_pool_size must be at least 1".to_string(),
            ));
        }
        if self.max_pool_size < self.core_pool_size {
            return Err(EngineError::InvalidConfig(format!(
                "max_pool_size ({}) is smaller than core_pool_size ({})",
                self.max_pool_size, self.core_pool_size
            )));
        }
        Ok(())
    }

    /// Parses and validates a configuration from a RON document.
    ///
    /// Missing fields fall back to their [`Default`] values.
    pub fn from_ron_str(text: &str) -> EngineResult<Self> {
        let config: Self = ron::from_str(text)?;
        config.validate()?;
        Ok(config)
    }
}
