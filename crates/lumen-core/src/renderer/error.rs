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

//! Defines the hierarchy of error types for the rendering and caching subsystems.

use crate::context::GpuContextId;
use crate::renderer::api::DisplayListId;
use std::fmt;

/// An error related to the creation or use of a GPU resource.
#[derive(Debug, Clone, PartialEq)]
pub enum ResourceError {
    /// The backend ran out of memory for recorded command lists.
    OutOfMemory,
    /// The display list handle does not refer to a live list in this context.
    InvalidList(DisplayListId),
    /// An error originating from the specific graphics backend implementation.
    BackendError(String),
}

impl fmt::Display for ResourceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ResourceError::OutOfMemory => write!(f, "Out of memory for recorded command lists."),
            ResourceError::InvalidList(id) => write!(f, "Invalid display list handle: {id:?}"),
            ResourceError::BackendError(msg) => {
                write!(f, "Backend-specific resource error: {msg}")
            }
        }
    }
}

impl std::error::Error for ResourceError {}

/// A high-level error reported by a [`GraphicsContext`](crate::renderer::GraphicsContext).
#[derive(Debug, Clone, PartialEq)]
pub enum RenderError {
    /// An error occurred while managing a GPU resource.
    ResourceError(ResourceError),
    /// A list recording was started while another one was still open.
    RecordingInProgress,
    /// A list recording was ended, but none was open.
    NotRecording,
    /// The context was lost and can no longer execute commands.
    ContextLost(GpuContextId),
}

impl fmt::Display for RenderError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RenderError::ResourceError(err) => {
                write!(f, "Graphics resource operation failed: {err}")
            }
            RenderError::RecordingInProgress => {
                write!(f, "A display list is already being recorded.")
            }
            RenderError::NotRecording => write!(f, "No display list is being recorded."),
            RenderError::ContextLost(ctx) => {
                write!(f, "The graphics context {ctx} was lost.")
            }
        }
    }
}

impl std::error::Error for RenderError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            RenderError::ResourceError(err) => Some(err),
            _ => None,
        }
    }
}

impl From<ResourceError> for RenderError {
    fn from(err: ResourceError) -> Self {
        RenderError::ResourceError(err)
    }
}

/// A violation of the recorded-cache contract, or a failed recording.
#[derive(Debug, Clone, PartialEq)]
pub enum CacheError {
    /// An operation was attempted in a lifecycle phase that does not allow it
    /// (opening twice, replaying an unclosed or invalidated cache, ...).
    InvalidState {
        /// The rejected operation.
        operation: &'static str,
        /// The phase the cache was in.
        phase: &'static str,
    },
    /// A cache was replayed in a context other than the one it was recorded in.
    ContextMismatch {
        /// The context the cache belongs to.
        expected: GpuContextId,
        /// The context of the current traversal.
        found: GpuContextId,
    },
    /// The backend failed while recording.
    Recording(RenderError),
}

impl fmt::Display for CacheError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CacheError::InvalidState { operation, phase } => {
                write!(f, "Cannot {operation} a render cache that is {phase}")
            }
            CacheError::ContextMismatch { expected, found } => {
                write!(
                    f,
                    "Render cache recorded in {expected} cannot be replayed in {found}"
                )
            }
            CacheError::Recording(err) => write!(f, "Recording failed: {err}"),
        }
    }
}

impl std::error::Error for CacheError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            CacheError::Recording(err) => Some(err),
            _ => None,
        }
    }
}

impl From<RenderError> for CacheError {
    fn from(err: RenderError) -> Self {
        CacheError::Recording(err)
    }
}
