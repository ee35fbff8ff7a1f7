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

//! Defines the GPU commands emitted by a traversal and captured by recordings.

use crate::math::LinearRgba;

/// An opaque handle to a recorded, replayable command list living in one GPU context.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DisplayListId(pub u64);

/// An opaque handle to GPU-resident geometry.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub struct ShapeId(pub u64);

/// An opaque handle to a compiled render pipeline.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub struct PipelineId(pub u64);

/// The lighting model used when shading subsequent geometry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum LightModel {
    /// Geometry is drawn with its diffuse color only.
    BaseColor,
    /// Full per-light Phong shading.
    #[default]
    Phong,
}

/// Source and destination factors of an enabled blend state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BlendFactors {
    /// Color source factor (backend-defined enumerant).
    pub src: u32,
    /// Color destination factor (backend-defined enumerant).
    pub dst: u32,
    /// Separate alpha factors, when the backend supports them.
    pub alpha: Option<(u32, u32)>,
}

/// A single state change or draw issued to a GPU context.
#[derive(Debug, Clone, PartialEq)]
pub enum GpuCommand {
    /// Selects the lighting model.
    SetLightModel(LightModel),
    /// Sets the diffuse (base) material color.
    SetDiffuse(LinearRgba),
    /// Sets the ambient material color.
    SetAmbient(LinearRgba),
    /// Sets the specular material color.
    SetSpecular(LinearRgba),
    /// Sets the emissive material color.
    SetEmissive(LinearRgba),
    /// Sets the specular exponent, normalized to `[0, 1]`.
    SetShininess(f32),
    /// Enables blending with the given factors, or disables it with `None`.
    SetBlending(Option<BlendFactors>),
    /// Toggles two-sided lighting.
    SetTwoSidedLighting(bool),
    /// Toggles flat shading.
    SetFlatShading(bool),
    /// Loads the model matrix (column-major).
    SetModelMatrix([[f32; 4]; 4]),
    /// Binds a render pipeline.
    BindPipeline(PipelineId),
    /// Draws a range of vertices of a shape.
    Draw {
        /// The geometry to draw.
        shape: ShapeId,
        /// First vertex of the range.
        first_vertex: u32,
        /// Number of vertices drawn.
        vertex_count: u32,
    },
    /// Replays a previously recorded list.
    CallList(DisplayListId),
}

impl GpuCommand {
    /// Returns `true` for commands that produce fragments (as opposed to state changes).
    pub fn is_draw(&self) -> bool {
        matches!(self, GpuCommand::Draw { .. })
    }
}
