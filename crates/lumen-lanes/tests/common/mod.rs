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

//! Shared helpers for the render lane integration tests.

#![allow(dead_code)]

use std::sync::Arc;

use lumen_core::config::CacheSettings;
use lumen_core::context::ContextRegistry;
use lumen_core::math::{LinearRgba, Mat4, IDENTITY};
use lumen_core::renderer::{GpuCommand, ShapeId};
use lumen_infra::graphics::RecordingContext;
use lumen_lanes::render_lane::{FrameRenderer, RenderNode, TraversalState};

/// Settings independent of the test process environment.
pub fn settings() -> CacheSettings {
    CacheSettings {
        debug_level: 2,
        gpu_error_checks: true,
        ..CacheSettings::default()
    }
}

/// A draw, together with the GPU state it was drawn with.
#[derive(Debug, Clone, PartialEq)]
pub struct EffectiveDraw {
    pub shape: ShapeId,
    pub diffuse: LinearRgba,
    pub matrix: Mat4,
}

/// Mirrors the GPU state a command stream leaves behind, across frames.
#[derive(Debug)]
pub struct GpuMirror {
    diffuse: LinearRgba,
    matrix: Mat4,
}

impl Default for GpuMirror {
    fn default() -> Self {
        Self {
            diffuse: LinearRgba::BLACK,
            matrix: IDENTITY,
        }
    }
}

impl GpuMirror {
    pub fn apply(&mut self, commands: &[GpuCommand]) -> Vec<EffectiveDraw> {
        let mut draws = Vec::new();
        for command in commands {
            match command {
                GpuCommand::SetDiffuse(color) => self.diffuse = *color,
                GpuCommand::SetModelMatrix(matrix) => self.matrix = *matrix,
                GpuCommand::Draw { shape, .. } => draws.push(EffectiveDraw {
                    shape: *shape,
                    diffuse: self.diffuse,
                    matrix: self.matrix,
                }),
                _ => {}
            }
        }
        draws
    }
}

/// One GPU context rendering frames.
pub struct Viewer {
    pub gpu: RecordingContext,
    pub state: TraversalState,
    pub frames: FrameRenderer,
    mirror: GpuMirror,
}

impl Viewer {
    pub fn new(registry: &Arc<ContextRegistry>) -> Self {
        let context = registry.allocate_context_id();
        Self {
            gpu: RecordingContext::new(context),
            state: TraversalState::new(context),
            frames: FrameRenderer::new(Arc::clone(registry)),
            mirror: GpuMirror::default(),
        }
    }

    /// Renders one frame and returns what was drawn.
    pub fn frame(&mut self, root: &dyn RenderNode) -> Vec<EffectiveDraw> {
        let report = self.frames.render_frame(root, &mut self.state, &mut self.gpu);
        assert!(!report.gpu_error, "GPU error in frame {}", report.frame_index);
        let executed = self.gpu.take_executed();
        self.mirror.apply(&executed)
    }
}

/// Routes `log` output of the code under test through the test harness.
pub fn init_logging() {
    lumen_infra::logging::init_for_tests();
}
