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

//! The per-context state carried through a render traversal.

use std::collections::HashMap;
use std::sync::Arc;

use lumen_core::context::GpuContextId;
use lumen_core::math::{Mat4, IDENTITY};
use lumen_core::renderer::LazyColorState;
use lumen_core::state::{AutoCacheBits, Complexity, ElementKind, ElementStamp};

use super::RenderCache;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct ElementEntry {
    stamp: ElementStamp,
    depth: usize,
}

#[derive(Debug, Clone)]
struct SavedLevel {
    elements: HashMap<ElementKind, ElementEntry>,
    model_matrix: Mat4,
    complexity: Complexity,
}

/// State of one traversal of one GPU context.
///
/// Besides the element stack, the state carries the bookkeeping the cache
/// lists share during a traversal:
/// - the *invalidation signal*, raised by anything that makes the subgraph
///   being traversed unsuitable for recording;
/// - the *open cache* slot, holding the one recording in progress;
/// - the shape counter and auto-cache votes cast by the shapes drawn so far.
///
/// A `TraversalState` is kept alive across frames, because the lazy color
/// state mirrors what the GPU context holds.
#[derive(Debug)]
pub struct TraversalState {
    context: GpuContextId,
    depth: usize,
    elements: HashMap<ElementKind, ElementEntry>,
    saved: Vec<SavedLevel>,
    model_matrix: Mat4,
    complexity: Complexity,
    invalid: bool,
    open_cache: Option<Arc<RenderCache>>,
    num_shapes: u32,
    auto_cache_bits: AutoCacheBits,
    direct_rendering: bool,
    lazy: LazyColorState,
}

impl TraversalState {
    /// Creates the traversal state of `context`, which renders directly.
    pub fn new(context: GpuContextId) -> Self {
        Self {
            context,
            depth: 0,
            elements: HashMap::new(),
            saved: Vec::new(),
            model_matrix: IDENTITY,
            complexity: Complexity::default(),
            invalid: false,
            open_cache: None,
            num_shapes: 0,
            auto_cache_bits: AutoCacheBits::NONE,
            direct_rendering: true,
            lazy: LazyColorState::new(),
        }
    }

    /// The GPU context this traversal renders into.
    pub fn context(&self) -> GpuContextId {
        self.context
    }

    /// Current element stack depth.
    pub fn depth(&self) -> usize {
        self.depth
    }

    /// Prepares the state for a new frame.
    pub fn begin_frame(&mut self) {
        if self.depth != 0 {
            log::warn!(
                "Traversal of {} started a frame at depth {}; unbalanced push/pop.",
                self.context,
                self.depth
            );
        }
        if let Some(cache) = self.open_cache.take() {
            log::warn!(
                "Traversal of {} started a frame with a recording still open; abandoning it.",
                self.context
            );
            cache.invalidate();
        }
        self.invalid = false;
        self.auto_cache_bits = self.initial_auto_cache_bits();
        self.num_shapes = 0;
    }

    /// Saves every element, to be restored by [`pop`](Self::pop).
    pub fn push(&mut self) {
        self.saved.push(SavedLevel {
            elements: self.elements.clone(),
            model_matrix: self.model_matrix,
            complexity: self.complexity,
        });
        self.lazy.push();
        self.depth += 1;
    }

    /// Restores the elements saved by the matching [`push`](Self::push).
    pub fn pop(&mut self) {
        let Some(level) = self.saved.pop() else {
            log::warn!("TraversalState::pop called without a matching push.");
            return;
        };
        self.elements = level.elements;
        self.model_matrix = level.model_matrix;
        self.complexity = level.complexity;
        self.lazy.pop();
        self.depth -= 1;
    }

    /// Sets the stamp of an element at the current depth.
    pub fn set_element(&mut self, kind: ElementKind, stamp: ElementStamp) {
        self.elements.insert(
            kind,
            ElementEntry {
                stamp,
                depth: self.depth,
            },
        );
    }

    /// Returns the stamp of an element without recording a dependency.
    pub fn element_stamp(&self, kind: ElementKind) -> ElementStamp {
        self.elements
            .get(&kind)
            .map_or(ElementStamp::DEFAULT, |entry| entry.stamp)
    }

    /// Returns the stamp of an element, recording a dependency on it in the
    /// open cache if the element was set outside the recorded subgraph.
    pub fn read_element(&mut self, kind: ElementKind) -> ElementStamp {
        let entry = self.elements.get(&kind).copied().unwrap_or(ElementEntry {
            stamp: ElementStamp::DEFAULT,
            depth: 0,
        });
        if let Some(cache) = &self.open_cache {
            if entry.depth < cache.depth() {
                cache.add_dependency(kind, entry.stamp);
            }
        }
        entry.stamp
    }

    /// Returns `true` when `kind` was set outside a recording opened at `depth`.
    pub(crate) fn is_outside(&self, kind: ElementKind, depth: usize) -> bool {
        self.elements.get(&kind).map_or(0, |entry| entry.depth) < depth
    }

    /// The accumulated model matrix.
    pub fn model_matrix(&self) -> &Mat4 {
        &self.model_matrix
    }

    /// Replaces the model matrix; `stamp` identifies the new value.
    pub fn set_model_matrix(&mut self, matrix: Mat4, stamp: ElementStamp) {
        self.model_matrix = matrix;
        self.set_element(ElementKind::ModelMatrix, stamp);
    }

    /// The current rendering complexity.
    pub fn complexity(&self) -> Complexity {
        self.complexity
    }

    /// Sets the rendering complexity; `stamp` identifies the new value.
    pub fn set_complexity(&mut self, complexity: Complexity, stamp: ElementStamp) {
        self.complexity = complexity;
        self.set_element(ElementKind::Complexity, stamp);
    }

    /// Returns the invalidation signal.
    pub fn is_invalid(&self) -> bool {
        self.invalid
    }

    /// Sets the invalidation signal and returns its previous value.
    pub fn set_invalid(&mut self, invalid: bool) -> bool {
        std::mem::replace(&mut self.invalid, invalid)
    }

    /// Raises the invalidation signal: whatever is being recorded right now
    /// must not be kept.
    pub fn invalidate(&mut self) {
        self.invalid = true;
        if let Some(cache) = &self.open_cache {
            cache.invalidate();
        }
    }

    /// The recording in progress, if any.
    pub fn open_cache(&self) -> Option<&Arc<RenderCache>> {
        self.open_cache.as_ref()
    }

    /// Returns `true` while a recording is in progress.
    pub fn any_open(&self) -> bool {
        self.open_cache.is_some()
    }

    pub(crate) fn set_open_cache(&mut self, cache: Arc<RenderCache>) {
        if self.open_cache.is_some() {
            log::warn!("Replacing the open cache of {}; nested recordings are not supported.", self.context);
        }
        self.open_cache = Some(cache);
    }

    pub(crate) fn clear_open_cache(&mut self, cache: &Arc<RenderCache>) {
        if self
            .open_cache
            .as_ref()
            .is_some_and(|open| Arc::ptr_eq(open, cache))
        {
            self.open_cache = None;
        }
    }

    /// Number of shapes drawn since the counter was last reset.
    pub fn num_shapes(&self) -> u32 {
        self.num_shapes
    }

    /// Counts one more shape drawn.
    pub fn inc_num_shapes(&mut self) {
        self.num_shapes += 1;
    }

    /// The auto-cache votes cast since the bits were last reset.
    pub fn auto_cache_bits(&self) -> AutoCacheBits {
        self.auto_cache_bits
    }

    /// Casts an auto-cache vote.
    pub fn should_auto_cache(&mut self, bits: AutoCacheBits) {
        self.auto_cache_bits |= bits;
    }

    /// Replaces the auto-cache votes.
    pub fn set_auto_cache_bits(&mut self, bits: AutoCacheBits) {
        self.auto_cache_bits = bits;
    }

    /// Returns the votes cast so far and starts a new ballot. The shape
    /// counter is reset as well.
    pub fn reset_auto_cache_bits(&mut self) -> AutoCacheBits {
        let previous = self.auto_cache_bits;
        self.auto_cache_bits = self.initial_auto_cache_bits();
        self.num_shapes = 0;
        previous
    }

    /// Returns `true` when commands reach a local GPU directly.
    pub fn is_direct_rendering(&self) -> bool {
        self.direct_rendering
    }

    /// Declares whether commands reach a local GPU directly. Remote
    /// rendering always favors caching, since every replay saves a round
    /// trip.
    pub fn set_direct_rendering(&mut self, direct: bool) {
        self.direct_rendering = direct;
    }

    /// The lazy color state.
    pub fn lazy(&self) -> &LazyColorState {
        &self.lazy
    }

    /// The lazy color state, mutably.
    pub fn lazy_mut(&mut self) -> &mut LazyColorState {
        &mut self.lazy
    }

    fn initial_auto_cache_bits(&self) -> AutoCacheBits {
        if self.direct_rendering {
            AutoCacheBits::NONE
        } else {
            AutoCacheBits::DO_AUTO_CACHE
        }
    }
}
