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

//! # Lumen Lanes
//!
//! Hot-path execution of the render cache: deciding, for every cacheable
//! group of a scene traversal, whether a recorded command list can be
//! replayed instead of traversing the group again.
//!
//! The lane is single-threaded per GPU context. Everything shared across
//! contexts (the [`ContextRegistry`](lumen_core::ContextRegistry) and the cache
//! lists it notifies) is internally synchronized.

#![warn(missing_docs)]

pub mod render_lane;
