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

//! Leaf nodes used to build renderable scenes.
//!
//! Each leaf does one thing to the traversal: draw, change the material,
//! change the transform, change the complexity, or raise the invalidation
//! signal. Leaves are mutable through `&self`; after changing a leaf, notify
//! every [`CachingGroup`](super::CachingGroup) above it.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, MutexGuard};

use lumen_core::math::{self, LinearRgba, Mat4};
use lumen_core::renderer::{BlendFactors, GpuCommand, GraphicsContext, LazyMask, ShapeId};
use lumen_core::state::{AutoCacheBits, Complexity, ElementKind, ElementStamp};

use super::{RenderNode, TraversalState};

/// `GL_SRC_ALPHA`.
const BLEND_SRC_ALPHA: u32 = 0x0302;
/// `GL_ONE_MINUS_SRC_ALPHA`.
const BLEND_ONE_MINUS_SRC_ALPHA: u32 = 0x0303;

/// The stamp of a leaf, renewed whenever the leaf changes.
#[derive(Debug)]
struct NodeStamp(AtomicU64);

impl NodeStamp {
    fn new() -> Self {
        Self(AtomicU64::new(ElementStamp::fresh().0))
    }

    fn get(&self) -> ElementStamp {
        ElementStamp(self.0.load(Ordering::Relaxed))
    }

    fn renew(&self) {
        self.0.store(ElementStamp::fresh().0, Ordering::Relaxed);
    }
}

/// Draws a shape with the current material and model matrix.
#[derive(Debug)]
pub struct DrawShape {
    shape: ShapeId,
    vertex_count: u32,
}

impl DrawShape {
    /// Creates a leaf drawing `vertex_count` vertices of `shape`.
    pub fn new(shape: ShapeId, vertex_count: u32) -> Self {
        Self {
            shape,
            vertex_count,
        }
    }
}

impl RenderNode for DrawShape {
    fn node_name(&self) -> &'static str {
        "DrawShape"
    }

    fn render(&self, state: &mut TraversalState, gpu: &mut dyn GraphicsContext) {
        state.read_element(ElementKind::ShapeStyle);
        state.read_element(ElementKind::ModelMatrix);
        state.read_element(ElementKind::Complexity);

        if state.complexity() == Complexity::ObjectSpace {
            state.should_auto_cache(AutoCacheBits::DO_AUTO_CACHE);
            state.inc_num_shapes();
        } else {
            state.should_auto_cache(AutoCacheBits::DONT_AUTO_CACHE);
        }

        state.lazy_mut().send(gpu, LazyMask::ALL);
        gpu.submit(GpuCommand::SetModelMatrix(*state.model_matrix()));
        gpu.submit(GpuCommand::Draw {
            shape: self.shape,
            first_vertex: 0,
            vertex_count: self.vertex_count,
        });
    }
}

/// Material values applied by a [`SetMaterial`] leaf. `None` fields leave
/// the inherited value untouched.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Material {
    /// Diffuse color.
    pub diffuse: LinearRgba,
    /// Ambient color.
    pub ambient: Option<LinearRgba>,
    /// Emissive color.
    pub emissive: Option<LinearRgba>,
    /// Shininess.
    pub shininess: Option<f32>,
    /// Alpha-blended when `true`.
    pub transparent: bool,
}

impl Material {
    /// An opaque material with only a diffuse color.
    pub fn diffuse(color: LinearRgba) -> Self {
        Self {
            diffuse: color,
            ambient: None,
            emissive: None,
            shininess: None,
            transparent: false,
        }
    }
}

/// Changes the current material.
#[derive(Debug)]
pub struct SetMaterial {
    material: Mutex<Material>,
    stamp: NodeStamp,
}

impl SetMaterial {
    /// Creates a leaf applying `material`.
    pub fn new(material: Material) -> Self {
        Self {
            material: Mutex::new(material),
            stamp: NodeStamp::new(),
        }
    }

    /// The material applied.
    pub fn material(&self) -> Material {
        *lock(&self.material)
    }

    /// Replaces the material applied.
    pub fn set_material(&self, material: Material) {
        *lock(&self.material) = material;
        self.stamp.renew();
    }
}

impl RenderNode for SetMaterial {
    fn node_name(&self) -> &'static str {
        "SetMaterial"
    }

    fn render(&self, state: &mut TraversalState, _gpu: &mut dyn GraphicsContext) {
        let material = self.material();
        let stamp = self.stamp.get();

        let lazy = state.lazy_mut();
        lazy.set_diffuse(material.diffuse, stamp.0);
        if let Some(ambient) = material.ambient {
            lazy.set_ambient(ambient);
        }
        if let Some(emissive) = material.emissive {
            lazy.set_emissive(emissive);
        }
        if let Some(shininess) = material.shininess {
            lazy.set_shininess(shininess);
        }
        lazy.set_blending(material.transparent.then_some(BlendFactors {
            src: BLEND_SRC_ALPHA,
            dst: BLEND_ONE_MINUS_SRC_ALPHA,
            alpha: None,
        }));

        // Transparency changes how shapes are sorted and drawn.
        state.set_element(ElementKind::ShapeStyle, stamp);
    }
}

/// Multiplies the model matrix by a local transform.
#[derive(Debug)]
pub struct SetTransform {
    matrix: Mutex<Mat4>,
    stamp: NodeStamp,
}

impl SetTransform {
    /// Creates a leaf applying `matrix`.
    pub fn new(matrix: Mat4) -> Self {
        Self {
            matrix: Mutex::new(matrix),
            stamp: NodeStamp::new(),
        }
    }

    /// Creates a leaf translating by `(x, y, z)`.
    pub fn translation(x: f32, y: f32, z: f32) -> Self {
        Self::new(math::translation(x, y, z))
    }

    /// The local transform.
    pub fn matrix(&self) -> Mat4 {
        *lock(&self.matrix)
    }

    /// Replaces the local transform.
    pub fn set_matrix(&self, matrix: Mat4) {
        *lock(&self.matrix) = matrix;
        self.stamp.renew();
    }
}

impl RenderNode for SetTransform {
    fn node_name(&self) -> &'static str {
        "SetTransform"
    }

    fn render(&self, state: &mut TraversalState, _gpu: &mut dyn GraphicsContext) {
        let parent = state.read_element(ElementKind::ModelMatrix);
        let matrix = math::mul(state.model_matrix(), &self.matrix());
        state.set_model_matrix(matrix, parent.combine(self.stamp.get()));
    }
}

/// Changes the rendering complexity.
#[derive(Debug)]
pub struct SetComplexity {
    complexity: Mutex<Complexity>,
    stamp: NodeStamp,
}

impl SetComplexity {
    /// Creates a leaf applying `complexity`.
    pub fn new(complexity: Complexity) -> Self {
        Self {
            complexity: Mutex::new(complexity),
            stamp: NodeStamp::new(),
        }
    }

    /// Replaces the complexity applied.
    pub fn set_complexity(&self, complexity: Complexity) {
        *lock(&self.complexity) = complexity;
        self.stamp.renew();
    }
}

impl RenderNode for SetComplexity {
    fn node_name(&self) -> &'static str {
        "SetComplexity"
    }

    fn render(&self, state: &mut TraversalState, _gpu: &mut dyn GraphicsContext) {
        let complexity = *lock(&self.complexity);
        state.set_complexity(complexity, self.stamp.get());
    }
}

/// Raises the invalidation signal on every traversal, for content that
/// changes every frame and must never be recorded.
#[derive(Debug, Default)]
pub struct Invalidate;

impl RenderNode for Invalidate {
    fn node_name(&self) -> &'static str {
        "Invalidate"
    }

    fn render(&self, state: &mut TraversalState, _gpu: &mut dyn GraphicsContext) {
        state.invalidate();
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}
