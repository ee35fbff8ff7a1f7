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

//! Provides the public, backend-agnostic rendering contracts used by the cache subsystem.
//!
//! This module defines the "common language" between the cache decision engine
//! and whatever actually talks to the GPU. It contains the abstract
//! [`GraphicsContext`] trait, the [`GpuCommand`] data model, the
//! [`LazyColorState`] that defers redundant color/material state changes, and
//! the error types.
//!
//! The 'how' is handled by a concrete backend in the `lumen-infra` crate which
//! implements these traits. `lumen-lanes` then records and replays caches
//! without knowing the specifics of the backend.

pub mod api;
pub mod error;
pub mod lazy;
pub mod traits;

// Re-export the most important traits and types for easier use.
pub use self::api::*;
pub use self::error::{CacheError, RenderError, ResourceError};
pub use self::lazy::{CachedColorState, ColorState, LazyColorState};
pub use self::traits::GraphicsContext;
