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

use crate::context::GpuContextId;
use crate::renderer::api::{DisplayListId, GpuCommand};
use crate::renderer::error::RenderError;

/// A trait representing one GPU context's command stream.
///
/// Commands submitted through a `GraphicsContext` execute immediately. While
/// a list is being recorded (between [`begin_list`](Self::begin_list) and
/// [`end_list`](Self::end_list)) they are executed *and* captured, so the
/// first traversal of a cached subgraph renders normally while producing the
/// recording.
///
/// A context is driven from a single thread; implementations need not be
/// thread-safe.
pub trait GraphicsContext {
    /// Returns the id of this context.
    fn context_id(&self) -> GpuContextId;

    /// Executes a command, capturing it too when a list is being recorded.
    fn submit(&mut self, command: GpuCommand);

    /// Starts recording a new list.
    ///
    /// Only one list may be recorded at a time.
    fn begin_list(&mut self) -> Result<DisplayListId, RenderError>;

    /// Finishes recording `list`, making it replayable.
    fn end_list(&mut self, list: DisplayListId) -> Result<(), RenderError>;

    /// Replays a recorded list. Replaying while another list is recorded
    /// captures the call itself, not its expansion.
    fn call_list(&mut self, list: DisplayListId);

    /// Releases the GPU storage of a list. Unknown ids are ignored.
    fn delete_list(&mut self, list: DisplayListId);

    /// Returns `true` while a list is being recorded.
    fn is_recording(&self) -> bool;

    /// Returns and clears the first error raised since the last call, mirroring
    /// the error-polling model of immediate-mode GPU APIs.
    fn take_error(&mut self) -> Option<RenderError>;
}
