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

//! A recorded, replayable command sequence for one subgraph in one context.

use std::sync::{Arc, Mutex, MutexGuard};

use lumen_core::context::{ContextRegistry, GpuContextId};
use lumen_core::renderer::{
    CacheError, CachedColorState, DisplayListId, GraphicsContext, RenderError,
};
use lumen_core::state::{ElementKind, ElementStamp};

use super::TraversalState;

/// Lifecycle phase of a [`RenderCache`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CachePhase {
    /// Created, nothing recorded yet.
    Created,
    /// Capturing the commands of a traversal.
    Recording,
    /// Recording finished; the cache is immutable and replayable.
    Closed,
}

impl CachePhase {
    fn name(self) -> &'static str {
        match self {
            CachePhase::Created => "not yet opened",
            CachePhase::Recording => "recording",
            CachePhase::Closed => "closed",
        }
    }
}

#[derive(Debug)]
struct RenderCacheInner {
    phase: CachePhase,
    list: Option<DisplayListId>,
    depth: usize,
    dependencies: Vec<(ElementKind, ElementStamp)>,
    nested: Vec<Arc<RenderCache>>,
    pre_color: CachedColorState,
    post_color: CachedColorState,
    invalidated: bool,
    failure: Option<RenderError>,
}

struct Replay {
    list: DisplayListId,
    pre_color: CachedColorState,
    post_color: CachedColorState,
    dependencies: Vec<(ElementKind, ElementStamp)>,
}

/// A recorded command list plus what it takes to replay it safely.
///
/// A cache is only ever replayed in the context it was recorded in, and only
/// while every traversal element it read from outside still holds the value
/// observed while recording. Handles are shared with `Arc`; the GPU list is
/// released through the [`ContextRegistry`] once the last handle drops.
#[derive(Debug)]
pub struct RenderCache {
    context: GpuContextId,
    registry: Arc<ContextRegistry>,
    inner: Mutex<RenderCacheInner>,
}

impl RenderCache {
    /// Creates an empty cache bound to `context`.
    #[must_use]
    pub fn new(context: GpuContextId, registry: Arc<ContextRegistry>) -> Arc<Self> {
        Arc::new(Self {
            context,
            registry,
            inner: Mutex::new(RenderCacheInner {
                phase: CachePhase::Created,
                list: None,
                depth: 0,
                dependencies: Vec::new(),
                nested: Vec::new(),
                pre_color: CachedColorState::default(),
                post_color: CachedColorState::default(),
                invalidated: false,
                failure: None,
            }),
        })
    }

    /// The context this cache was created for.
    pub fn context(&self) -> GpuContextId {
        self.context
    }

    /// Current lifecycle phase.
    pub fn phase(&self) -> CachePhase {
        self.lock().phase
    }

    /// The recorded display list, once recording started successfully.
    pub fn display_list(&self) -> Option<DisplayListId> {
        self.lock().list
    }

    /// Starts capturing the commands of the current traversal.
    ///
    /// The cache must be installed as the traversal's open cache by the
    /// caller. A backend failure leaves the cache recording nothing; it
    /// surfaces as [`CacheError::Recording`] and the cache never becomes valid.
    pub fn open(
        &self,
        state: &mut TraversalState,
        gpu: &mut dyn GraphicsContext,
    ) -> Result<(), CacheError> {
        if gpu.context_id() != self.context {
            return Err(contract_violation(CacheError::ContextMismatch {
                expected: self.context,
                found: gpu.context_id(),
            }));
        }
        {
            let mut inner = self.lock();
            if inner.phase != CachePhase::Created {
                return Err(contract_violation(CacheError::InvalidState {
                    operation: "open",
                    phase: inner.phase.name(),
                }));
            }
            inner.phase = CachePhase::Recording;
            inner.depth = state.depth();
        }

        state.lazy_mut().begin_caching(gpu);

        match gpu.begin_list() {
            Ok(list) => {
                self.lock().list = Some(list);
                Ok(())
            }
            Err(err) => {
                self.lock().failure = Some(err.clone());
                Err(CacheError::Recording(err))
            }
        }
    }

    /// Finishes the recording and freezes the cache.
    pub fn close(
        &self,
        state: &mut TraversalState,
        gpu: &mut dyn GraphicsContext,
    ) -> Result<(), CacheError> {
        let list = {
            let inner = self.lock();
            if inner.phase != CachePhase::Recording {
                return Err(contract_violation(CacheError::InvalidState {
                    operation: "close",
                    phase: inner.phase.name(),
                }));
            }
            inner.list
        };

        let (pre_color, post_color) = state.lazy_mut().end_caching();
        let ended = match list {
            Some(list) => gpu.end_list(list),
            None => Ok(()),
        };

        let mut inner = self.lock();
        inner.phase = CachePhase::Closed;
        inner.pre_color = pre_color;
        inner.post_color = post_color;
        if let Err(err) = ended {
            inner.failure = Some(err.clone());
            return Err(CacheError::Recording(err));
        }
        match &inner.failure {
            Some(err) => Err(CacheError::Recording(err.clone())),
            None => Ok(()),
        }
    }

    /// Returns `true` if the cache can be replayed in the current traversal:
    /// it is closed, was never invalidated, belongs to the traversal's
    /// context and every element it depends on still holds the same value.
    ///
    /// Lazy color dependencies are checked separately, with
    /// [`LazyColorState::pre_cache_call`](lumen_core::renderer::LazyColorState::pre_cache_call).
    pub fn is_valid(&self, state: &TraversalState) -> bool {
        let inner = self.lock();
        inner.phase == CachePhase::Closed
            && !inner.invalidated
            && inner.failure.is_none()
            && inner.list.is_some()
            && self.context == state.context()
            && inner
                .dependencies
                .iter()
                .all(|(kind, stamp)| state.element_stamp(*kind) == *stamp)
    }

    /// Returns the first dependency that no longer matches, if any.
    pub fn invalid_element(&self, state: &TraversalState) -> Option<ElementKind> {
        self.lock()
            .dependencies
            .iter()
            .find(|(kind, stamp)| state.element_stamp(*kind) != *stamp)
            .map(|(kind, _)| *kind)
    }

    /// Checks that [`call`](Self::call) would be accepted, without touching
    /// the GPU or the traversal.
    pub fn ensure_replayable(
        &self,
        state: &TraversalState,
        gpu: &dyn GraphicsContext,
    ) -> Result<(), CacheError> {
        self.replay_parts(state, gpu).map(|_| ())
    }

    /// Replays the recording.
    ///
    /// Validity is not re-checked: callers are expected to have asked
    /// [`is_valid`](Self::is_valid) first. Replaying while another recording
    /// is open nests this cache into it.
    pub fn call(
        self: &Arc<Self>,
        state: &mut TraversalState,
        gpu: &mut dyn GraphicsContext,
    ) -> Result<(), CacheError> {
        let replay = self.replay_parts(state, gpu)?;

        gpu.call_list(replay.list);

        if let Some(outer) = state.open_cache().cloned() {
            let outer_depth = outer.depth();
            for (kind, stamp) in replay.dependencies {
                if state.is_outside(kind, outer_depth) {
                    outer.add_dependency(kind, stamp);
                }
            }
            outer.add_nested(Arc::clone(self));
            state
                .lazy_mut()
                .merge_cache_info(&replay.pre_color, &replay.post_color);
        }
        Ok(())
    }

    fn replay_parts(
        &self,
        state: &TraversalState,
        gpu: &dyn GraphicsContext,
    ) -> Result<Replay, CacheError> {
        if gpu.context_id() != self.context || state.context() != self.context {
            return Err(contract_violation(CacheError::ContextMismatch {
                expected: self.context,
                found: state.context(),
            }));
        }

        let inner = self.lock();
        let replayable = inner.phase == CachePhase::Closed && !inner.invalidated;
        match inner.list {
            Some(list) if replayable => Ok(Replay {
                list,
                pre_color: inner.pre_color,
                post_color: inner.post_color,
                dependencies: inner.dependencies.clone(),
            }),
            _ => {
                let phase = if inner.invalidated {
                    "invalidated"
                } else {
                    inner.phase.name()
                };
                Err(contract_violation(CacheError::InvalidState {
                    operation: "replay",
                    phase,
                }))
            }
        }
    }

    /// Marks the cache as unusable. It stays in its cache list until evicted.
    pub fn invalidate(&self) {
        self.lock().invalidated = true;
    }

    /// Returns `true` once [`invalidate`](Self::invalidate) was called.
    pub fn is_invalidated(&self) -> bool {
        self.lock().invalidated
    }

    /// The elements this cache depends on, with the stamps observed while recording.
    pub fn dependencies(&self) -> Vec<(ElementKind, ElementStamp)> {
        self.lock().dependencies.clone()
    }

    /// Lazy color state this cache depends on.
    pub fn pre_color(&self) -> CachedColorState {
        self.lock().pre_color
    }

    /// Lazy color state this cache leaves behind.
    pub fn post_color(&self) -> CachedColorState {
        self.lock().post_color
    }

    pub(crate) fn depth(&self) -> usize {
        self.lock().depth
    }

    pub(crate) fn add_dependency(&self, kind: ElementKind, stamp: ElementStamp) {
        let mut inner = self.lock();
        if inner.phase != CachePhase::Recording {
            return;
        }
        if !inner.dependencies.iter().any(|(known, _)| *known == kind) {
            inner.dependencies.push((kind, stamp));
        }
    }

    fn add_nested(&self, cache: Arc<RenderCache>) {
        let mut inner = self.lock();
        if !inner.nested.iter().any(|known| Arc::ptr_eq(known, &cache)) {
            inner.nested.push(cache);
        }
    }

    fn lock(&self) -> MutexGuard<'_, RenderCacheInner> {
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl Drop for RenderCache {
    fn drop(&mut self) {
        let inner = self
            .inner
            .get_mut()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        if let Some(list) = inner.list.take() {
            self.registry.schedule_release(self.context, list);
        }
    }
}

/// Escalates a caller contract violation: fatal in debug builds, logged and
/// returned as an error otherwise.
fn contract_violation(err: CacheError) -> CacheError {
    if cfg!(debug_assertions) {
        panic!("{err}");
    }
    log::error!("{err}");
    err
}
