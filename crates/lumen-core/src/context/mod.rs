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

//! GPU context identity and lifetime tracking.

mod registry;

pub use self::registry::{ContextDestructionListener, ContextRegistry};

use std::fmt;

/// An opaque identifier for one independent GPU command-submission target
/// (typically one window or viewer).
///
/// Ids are referenced by value everywhere; nothing owns them. Recorded caches
/// are tagged with the id of the context they were recorded in and are never
/// replayed in another one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, serde::Serialize)]
pub struct GpuContextId(pub u32);

impl fmt::Display for GpuContextId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ctx#{}", self.0)
    }
}
