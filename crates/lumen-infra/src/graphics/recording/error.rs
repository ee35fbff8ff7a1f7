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

use lumen_core::renderer::{DisplayListId, RenderError, ResourceError};

/// Errors raised by the in-memory backend.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum BackendError {
    /// Recording the command would exceed the list memory budget.
    #[error("display list memory exhausted ({limit} commands)")]
    ListMemoryExhausted {
        /// The budget, in commands.
        limit: usize,
    },
    /// A list was replayed or ended that does not exist.
    #[error("unknown display list {0:?}")]
    UnknownList(DisplayListId),
}

impl From<BackendError> for RenderError {
    fn from(err: BackendError) -> Self {
        match err {
            BackendError::ListMemoryExhausted { .. } => ResourceError::OutOfMemory.into(),
            BackendError::UnknownList(list) => ResourceError::InvalidList(list).into(),
        }
    }
}
