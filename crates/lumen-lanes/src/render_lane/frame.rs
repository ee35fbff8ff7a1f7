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

//! Drives whole frames of one GPU context.

use std::sync::Arc;

use lumen_core::context::ContextRegistry;
use lumen_core::renderer::GraphicsContext;

use super::{RenderNode, TraversalState};

/// What happened during one frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, serde::Serialize)]
pub struct FrameReport {
    /// Index of the frame, starting at 0.
    pub frame_index: u64,
    /// Display lists released before traversal.
    pub released_lists: usize,
    /// Whether the GPU reported an error during the frame.
    pub gpu_error: bool,
}

/// Renders frames of a scene into one GPU context.
///
/// Display lists whose last owner went away are released at the start of
/// the next frame of their context, when that context is current.
#[derive(Debug)]
pub struct FrameRenderer {
    registry: Arc<ContextRegistry>,
    frame_index: u64,
}

impl FrameRenderer {
    /// Creates a frame renderer releasing resources through `registry`.
    #[must_use]
    pub fn new(registry: Arc<ContextRegistry>) -> Self {
        Self {
            registry,
            frame_index: 0,
        }
    }

    /// Number of frames rendered so far.
    pub fn frames_rendered(&self) -> u64 {
        self.frame_index
    }

    /// Renders one frame of `root`.
    pub fn render_frame(
        &mut self,
        root: &dyn RenderNode,
        state: &mut TraversalState,
        gpu: &mut dyn GraphicsContext,
    ) -> FrameReport {
        debug_assert_eq!(state.context(), gpu.context_id());

        let released_lists = self.registry.flush_pending_releases(gpu);

        state.begin_frame();
        root.render(state, gpu);

        let mut gpu_error = false;
        while let Some(err) = gpu.take_error() {
            log::error!(
                "GPU error in {} during frame {}: {err}",
                gpu.context_id(),
                self.frame_index
            );
            gpu_error = true;
        }

        let report = FrameReport {
            frame_index: self.frame_index,
            released_lists,
            gpu_error,
        };
        self.frame_index += 1;
        report
    }
}
