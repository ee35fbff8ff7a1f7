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

//! # Lumen Core
//!
//! Foundational crate containing the contracts and shared state types of the
//! render-cache subsystem: GPU context identity and lifetime, the GPU command
//! contract, the lazy color state machine, traversal state elements and the
//! process-wide cache settings.
//!
//! The decision engine itself (cache lists and recorded caches) lives in
//! `lumen-lanes`; concrete GPU backends live in `lumen-infra`.

#![warn(missing_docs)]

pub mod config;
pub mod context;
pub mod math;
pub mod renderer;
pub mod state;

pub use config::CacheSettings;
pub use context::{ContextDestructionListener, ContextRegistry, GpuContextId};
