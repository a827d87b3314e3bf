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

//! # Rebind Engine
//!
//! Loads payloads for reusable targets in the background and applies them back,
//! but only while the target is still bound to the asset it was loaded for.
//!
//! The typical case is a recycled list row: a slow image load started for row 5
//! must not land on row 5 after it has been reused for a different item. The
//! caller implements [`Loader`] (`initialise`, `load`, `apply`) and calls
//! [`LoadEngine::load_into`]; the engine handles scheduling, delays, the worker
//! pool and the staleness checks.
//!
//! ```no_run
//! use rebind_engine::{EngineConfig, LoadContext, LoadEngine, LoadResult, Loader};
//! use std::sync::{Arc, Mutex};
//!
//! struct Row(Mutex<String>);
//!
//! struct Upper;
//!
//! impl Loader for Upper {
//!     type Target = Row;
//!     type Asset = String;
//!     type Payload = String;
//!
//!     fn initialise(&self, row: &Row, _: &String) -> bool {
//!         *row.0.lock().unwrap() = "loading...".into();
//!         true
//!     }
//!
//!     fn load(
//!         &self,
//!         _: &Row,
//!         asset: &String,
//!         _: &LoadContext<'_>,
//!     ) -> anyhow::Result<LoadResult<String, String>> {
//!         Ok(LoadResult::loaded(asset.to_uppercase(), asset.clone()))
//!     }
//!
//!     fn apply(&self, row: &Row, result: LoadResult<String, String>) {
//!         if let Some(text) = result.payload {
//!             *row.0.lock().unwrap() = text;
//!         }
//!     }
//! }
//!
//! let engine = LoadEngine::new(Upper, EngineConfig::default())?;
//! let row = Arc::new(Row(Mutex::new(String::new())));
//! engine.load_into(&row, "cat".to_string())?;
//! engine.load_into(&row, "dog".to_string())?; // "cat" will never be applied
//! # Ok::<(), rebind_engine::EngineError>(())
//! ```

#![warn(missing_docs)]

pub mod config;
pub mod engine;
pub mod error;
pub mod executor;
pub mod loader;
mod registry;
pub mod stats;

pub use config::EngineConfig;
pub use engine::LoadEngine;
pub use error::{EngineError, EngineResult};
pub use executor::{ApplyExecutor, ApplyTask, ApplyThread, ManualApplyQueue, WorkerPool};
pub use loader::{LoadContext, LoadResult, Loader};
pub use stats::EngineStats;
