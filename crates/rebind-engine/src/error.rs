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

//! Errors surfaced by the load engine.

use thiserror::Error;

/// An error returned by [`LoadEngine`](crate::LoadEngine) and its executors.
///
/// Failures of the caller's `load` operation never appear here: they are caught
/// on the worker, logged, and treated as "nothing to apply".
#[derive(Debug, Error)]
pub enum EngineError {
    /// The engine (or the executor) has been disposed.
    #[error("the load engine has been disposed")]
    Disposed,
    /// An OS thread could not be started.
    #[error("failed to spawn thread '{name}': {source}")]
    ThreadSpawn {
        /// Name of the thread that failed to start.
        name: String,
        /// The underlying OS error.
        #[source]
        source: std::io::Error,
    },
    /// The configuration failed validation.
    #[error("invalid engine configuration: {0}")]
    InvalidConfig(String),
    /// A RON configuration document could not be parsed.
    #[error("failed to parse engine configuration: {0}")]
    Config(#[from] ron::error::SpannedError),
}

/// A specialized `Result` for engine operations.
pub type EngineResult<T> = Result<T, EngineError>;
