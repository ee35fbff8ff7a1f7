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

//! Lazy color/material state.
//!
//! Traversal code sets the *desired* material state freely; only the components
//! that actually differ from what the GPU already holds are sent, and only when
//! geometry is about to be drawn. This makes recordings sensitive to the state
//! that was current when they began: a recording that relied on an ambient
//! color already being set (and therefore never sent it) must not be replayed
//! under a different ambient color. [`LazyColorState`] tracks exactly that while
//! a recording is open and produces a pair of [`CachedColorState`] snapshots
//! that are checked and applied around every replay.

use crate::math::LinearRgba;
use crate::renderer::api::{BlendFactors, GpuCommand, LazyMask, LightModel};
use crate::renderer::traits::GraphicsContext;

/// A complete color/material state.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ColorState {
    /// Lighting model.
    pub light_model: LightModel,
    /// Diffuse color.
    pub diffuse: LinearRgba,
    /// Id of the node that provided the diffuse color. Diffuse dependencies are
    /// compared by node rather than by value.
    pub diffuse_node: u64,
    /// Ambient color.
    pub ambient: LinearRgba,
    /// Specular color.
    pub specular: LinearRgba,
    /// Emissive color.
    pub emissive: LinearRgba,
    /// Shininess in `[0, 1]`.
    pub shininess: f32,
    /// Blending factors, `None` when blending is disabled.
    pub blending: Option<BlendFactors>,
    /// Two-sided lighting.
    pub two_sided: bool,
    /// Flat shading.
    pub flat_shading: bool,
}

impl Default for ColorState {
    fn default() -> Self {
        Self {
            light_model: LightModel::Phong,
            diffuse: LinearRgba::rgb(0.8, 0.8, 0.8),
            diffuse_node: 0,
            ambient: LinearRgba::rgb(0.2, 0.2, 0.2),
            specular: LinearRgba::BLACK,
            emissive: LinearRgba::BLACK,
            shininess: 0.2,
            blending: None,
            two_sided: false,
            flat_shading: false,
        }
    }
}

impl ColorState {
    fn component_eq(&self, other: &Self, component: LazyMask) -> bool {
        match component {
            LazyMask::LIGHT_MODEL => self.light_model == other.light_model,
            LazyMask::DIFFUSE => self.diffuse == other.diffuse,
            LazyMask::AMBIENT => self.ambient == other.ambient,
            LazyMask::SPECULAR => self.specular == other.specular,
            LazyMask::EMISSIVE => self.emissive == other.emissive,
            LazyMask::SHININESS => self.shininess == other.shininess,
            LazyMask::BLENDING => self.blending == other.blending,
            LazyMask::TWO_SIDE => self.two_sided == other.two_sided,
            LazyMask::SHADE_MODEL => self.flat_shading == other.flat_shading,
            _ => true,
        }
    }

    fn copy_component(&mut self, from: &Self, component: LazyMask) {
        match component {
            LazyMask::LIGHT_MODEL => self.light_model = from.light_model,
            LazyMask::DIFFUSE => {
                self.diffuse = from.diffuse;
                self.diffuse_node = from.diffuse_node;
            }
            LazyMask::AMBIENT => self.ambient = from.ambient,
            LazyMask::SPECULAR => self.specular = from.specular,
            LazyMask::EMISSIVE => self.emissive = from.emissive,
            LazyMask::SHININESS => self.shininess = from.shininess,
            LazyMask::BLENDING => self.blending = from.blending,
            LazyMask::TWO_SIDE => self.two_sided = from.two_sided,
            LazyMask::SHADE_MODEL => self.flat_shading = from.flat_shading,
            _ => {}
        }
    }

    fn command(&self, component: LazyMask) -> Option<GpuCommand> {
        let command = match component {
            LazyMask::LIGHT_MODEL => GpuCommand::SetLightModel(self.light_model),
            LazyMask::DIFFUSE => GpuCommand::SetDiffuse(self.diffuse),
            LazyMask::AMBIENT => GpuCommand::SetAmbient(self.ambient),
            LazyMask::SPECULAR => GpuCommand::SetSpecular(self.specular),
            LazyMask::EMISSIVE => GpuCommand::SetEmissive(self.emissive),
            LazyMask::SHININESS => GpuCommand::SetShininess(self.shininess),
            LazyMask::BLENDING => GpuCommand::SetBlending(self.blending),
            LazyMask::TWO_SIDE => GpuCommand::SetTwoSidedLighting(self.two_sided),
            LazyMask::SHADE_MODEL => GpuCommand::SetFlatShading(self.flat_shading),
            _ => return None,
        };
        Some(command)
    }
}

/// A color state snapshot stored with a recording, together with the
/// components of that snapshot that are meaningful.
///
/// For the snapshot taken before recording, `mask` holds the components the
/// recording *depends on*. For the snapshot taken after, `mask` holds the
/// components the recording *changed*.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct CachedColorState {
    /// The state values.
    pub state: ColorState,
    /// Components of `state` that matter.
    pub mask: LazyMask,
}

#[derive(Debug, Clone, Copy)]
struct CacheTracking {
    pre: ColorState,
    did_set: LazyMask,
    didnt_set: LazyMask,
    diffuse_dependency: bool,
    force_diffuse: bool,
}

/// Deferred color/material state for one traversal.
#[derive(Debug, Clone, Default)]
pub struct LazyColorState {
    desired: ColorState,
    applied: ColorState,
    known: LazyMask,
    changed: LazyMask,
    stack: Vec<ColorState>,
    tracking: Option<CacheTracking>,
}

impl LazyColorState {
    /// Creates a lazy state for a context whose GPU state is unknown.
    pub fn new() -> Self {
        Self::default()
    }

    /// The state traversal asked for.
    pub fn desired(&self) -> &ColorState {
        &self.desired
    }

    /// The state last sent to the GPU. Only components in [`known`](Self::known) are meaningful.
    pub fn applied(&self) -> &ColorState {
        &self.applied
    }

    /// Components whose GPU-side value is known.
    pub fn known(&self) -> LazyMask {
        self.known
    }

    /// Returns `true` while a recording is tracking dependencies.
    pub fn is_caching(&self) -> bool {
        self.tracking.is_some()
    }

    /// Saves the desired state, to be restored by [`pop`](Self::pop).
    pub fn push(&mut self) {
        self.stack.push(self.desired);
    }

    /// Restores the desired state saved by the matching [`push`](Self::push).
    pub fn pop(&mut self) {
        if let Some(saved) = self.stack.pop() {
            self.desired = saved;
        } else {
            log::warn!("LazyColorState::pop called without a matching push.");
        }
    }

    /// Sets the lighting model.
    pub fn set_light_model(&mut self, model: LightModel) {
        self.desired.light_model = model;
        self.changed |= LazyMask::LIGHT_MODEL;
    }

    /// Sets the diffuse color provided by node `node_id`.
    pub fn set_diffuse(&mut self, color: LinearRgba, node_id: u64) {
        self.desired.diffuse = color;
        self.desired.diffuse_node = node_id;
        self.changed |= LazyMask::DIFFUSE;
    }

    /// Sets the ambient color.
    pub fn set_ambient(&mut self, color: LinearRgba) {
        self.desired.ambient = color;
        self.changed |= LazyMask::AMBIENT;
    }

    /// Sets the specular color.
    pub fn set_specular(&mut self, color: LinearRgba) {
        self.desired.specular = color;
        self.changed |= LazyMask::SPECULAR;
    }

    /// Sets the emissive color.
    pub fn set_emissive(&mut self, color: LinearRgba) {
        self.desired.emissive = color;
        self.changed |= LazyMask::EMISSIVE;
    }

    /// Sets the shininess.
    pub fn set_shininess(&mut self, shininess: f32) {
        self.desired.shininess = shininess;
        self.changed |= LazyMask::SHININESS;
    }

    /// Enables (`Some`) or disables (`None`) blending.
    pub fn set_blending(&mut self, blending: Option<BlendFactors>) {
        self.desired.blending = blending;
        self.changed |= LazyMask::BLENDING;
    }

    /// Toggles two-sided lighting.
    pub fn set_two_sided(&mut self, two_sided: bool) {
        self.desired.two_sided = two_sided;
        self.changed |= LazyMask::TWO_SIDE;
    }

    /// Toggles flat shading.
    pub fn set_flat_shading(&mut self, flat: bool) {
        self.desired.flat_shading = flat;
        self.changed |= LazyMask::SHADE_MODEL;
    }

    /// Sends the components in `mask` whose desired value differs from the GPU value.
    pub fn send(&mut self, gpu: &mut dyn GraphicsContext, mask: LazyMask) {
        for component in mask.iter() {
            let differs = !self.known.contains(component)
                || !self.applied.component_eq(&self.desired, component);

            let mut force = false;
            if component == LazyMask::DIFFUSE {
                if let Some(tracking) = self.tracking.as_mut() {
                    // Material coming from outside the recording.
                    if tracking.pre.diffuse_node == self.desired.diffuse_node {
                        tracking.diffuse_dependency = true;
                    }
                    force = tracking.force_diffuse;
                    tracking.force_diffuse = false;
                }
            }

            if differs || force {
                if let Some(command) = self.desired.command(component) {
                    gpu.submit(command);
                }
                self.applied.copy_component(&self.desired, component);
                self.known |= component;
                self.did_set(component);
            } else {
                self.didnt_set(component);
            }
        }
    }

    /// Forgets the GPU value of the components in `mask`, forcing them to be
    /// re-sent. Use after issuing raw GPU state changes behind this state's back.
    pub fn reset(&mut self, mask: LazyMask) {
        self.known = self.known.difference(mask);
        if self.tracking.is_some() {
            self.changed |= mask;
        }
    }

    /// Starts tracking dependencies for a new recording.
    ///
    /// Everything pending is sent first so the recording starts from a
    /// fully known GPU state.
    pub fn begin_caching(&mut self, gpu: &mut dyn GraphicsContext) {
        self.tracking = None;
        self.send(gpu, LazyMask::ALL);

        let mut pre = self.applied;
        pre.diffuse_node = self.desired.diffuse_node;
        self.tracking = Some(CacheTracking {
            pre,
            did_set: LazyMask::NONE,
            didnt_set: LazyMask::NONE,
            diffuse_dependency: false,
            force_diffuse: true,
        });
        self.changed = LazyMask::NONE;
    }

    /// Stops tracking and returns the `(pre, post)` snapshots of the recording.
    pub fn end_caching(&mut self) -> (CachedColorState, CachedColorState) {
        let Some(tracking) = self.tracking.take() else {
            log::warn!("LazyColorState::end_caching called without begin_caching.");
            return (CachedColorState::default(), CachedColorState::default());
        };

        let mut pre_mask = tracking.didnt_set.difference(LazyMask::DIFFUSE);
        if tracking.diffuse_dependency {
            pre_mask |= LazyMask::DIFFUSE;
        }

        let pre = CachedColorState {
            state: tracking.pre,
            mask: pre_mask,
        };
        let post = CachedColorState {
            state: self.applied,
            mask: self.changed | tracking.did_set,
        };
        self.changed = LazyMask::NONE;
        (pre, post)
    }

    /// Returns `true` when the current desired state satisfies every
    /// dependency recorded in `pre`.
    pub fn pre_cache_call(&self, pre: &CachedColorState) -> bool {
        pre.mask.iter().all(|component| {
            if component == LazyMask::DIFFUSE {
                pre.state.diffuse_node == self.desired.diffuse_node
            } else {
                pre.state.component_eq(&self.desired, component)
            }
        })
    }

    /// Records the GPU state a replayed recording left behind.
    pub fn post_cache_call(&mut self, post: &CachedColorState) {
        for component in post.mask.iter() {
            self.applied.copy_component(&post.state, component);
            self.known |= component;
        }
    }

    /// Folds the dependencies and changes of a recording replayed while
    /// another recording is open into the open one.
    pub fn merge_cache_info(&mut self, pre: &CachedColorState, post: &CachedColorState) {
        let Some(tracking) = self.tracking.as_mut() else {
            return;
        };

        if pre.mask.contains(LazyMask::DIFFUSE) && !tracking.did_set.contains(LazyMask::DIFFUSE) {
            tracking.diffuse_dependency = true;
        }
        tracking.didnt_set |= pre.mask.difference(tracking.did_set);
        tracking.did_set |= post.mask;
        if post.mask.contains(LazyMask::DIFFUSE) {
            tracking.force_diffuse = false;
        }
        self.changed |= post.mask;
    }

    fn did_set(&mut self, component: LazyMask) {
        if let Some(tracking) = self.tracking.as_mut() {
            tracking.did_set |= component;
        }
    }

    fn didnt_set(&mut self, component: LazyMask) {
        if let Some(tracking) = self.tracking.as_mut() {
            tracking.didnt_set |= component.difference(tracking.did_set);
        }
    }
}
