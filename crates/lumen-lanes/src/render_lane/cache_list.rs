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

//! The per-group list of recorded caches and the decisions around it.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, Weak};

use lumen_core::config::CacheSettings;
use lumen_core::context::{ContextDestructionListener, ContextRegistry, GpuContextId};
use lumen_core::renderer::{GraphicsContext, LazyMask};
use lumen_core::state::{AutoCacheBits, ElementKind};

use super::{HeuristicCounters, RenderCache, TraversalState};

/// A snapshot of a cache list, for diagnostics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
pub struct CacheListStats {
    /// Maximum number of recordings kept.
    pub capacity: usize,
    /// Number of recordings currently kept.
    pub len: usize,
    /// Whether a recording is in progress in any context.
    pub recording: bool,
    /// Decision counters.
    pub counters: HeuristicCounters,
    /// Raw auto-cache votes of the subgraph, as seen at the last close of
    /// every context.
    pub auto_cache_bits: u32,
}

/// Bookkeeping of one open/close pass, kept per context so traversals of
/// different contexts may be inside the same group at once.
#[derive(Debug, Default)]
struct PassState {
    open_cache: Option<Arc<RenderCache>>,
    need_close: bool,
    saved_invalid: bool,
    recording_failed: bool,
    auto_cache_bits: AutoCacheBits,
}

#[derive(Debug)]
struct CacheListInner {
    capacity: usize,
    items: Vec<Arc<RenderCache>>,
    passes: HashMap<GpuContextId, PassState>,
    counters: HeuristicCounters,
}

impl CacheListInner {
    fn remove_context(&mut self, context: GpuContextId) -> usize {
        let before = self.items.len();
        self.items.retain(|cache| cache.context() != context);
        self.passes.remove(&context);
        before - self.items.len()
    }
}

/// The recordings of one cacheable group, least recently used first.
///
/// A traversal drives a cache list through three calls:
/// 1. [`call`](Self::call) tries to replay a matching recording;
/// 2. on a miss, [`open`](Self::open) decides whether to record the
///    traversal of the group's children;
/// 3. [`close`](Self::close) keeps or discards what was recorded.
///
/// Recordings live in exactly one GPU context. The list listens to the
/// [`ContextRegistry`] and drops the recordings of destroyed contexts.
///
/// Open/close bookkeeping is kept per context, so traversals of different
/// contexts may be inside the same group at the same time. The decision
/// counters are shared by all of them.
pub struct CacheList {
    inner: Arc<Mutex<CacheListInner>>,
    registry: Arc<ContextRegistry>,
    listener: Arc<dyn ContextDestructionListener>,
    settings: CacheSettings,
}

impl CacheList {
    /// Creates a list keeping at most `capacity` recordings, configured by
    /// the process-wide [`CacheSettings`].
    #[must_use]
    pub fn new(capacity: usize, registry: Arc<ContextRegistry>) -> Self {
        Self::with_settings(capacity, registry, *CacheSettings::global())
    }

    /// Creates a list with explicit settings.
    #[must_use]
    pub fn with_settings(
        capacity: usize,
        registry: Arc<ContextRegistry>,
        settings: CacheSettings,
    ) -> Self {
        let inner = Arc::new(Mutex::new(CacheListInner {
            capacity,
            items: Vec::with_capacity(capacity),
            passes: HashMap::new(),
            counters: HeuristicCounters::default(),
        }));

        let weak: Weak<Mutex<CacheListInner>> = Arc::downgrade(&inner);
        let listener: Arc<dyn ContextDestructionListener> =
            Arc::new(move |context: GpuContextId| {
                if let Some(inner) = weak.upgrade() {
                    let removed = lock(&inner).remove_context(context);
                    if removed > 0 {
                        log::debug!("Dropped {removed} cache(s) of destroyed context {context}.");
                    }
                }
            });
        registry.register_destruction_callback(Arc::clone(&listener));

        Self {
            inner,
            registry,
            listener,
            settings,
        }
    }

    /// Maximum number of recordings kept.
    pub fn capacity(&self) -> usize {
        self.lock().capacity
    }

    /// Number of recordings kept.
    pub fn len(&self) -> usize {
        self.lock().items.len()
    }

    /// Returns `true` when no recording is kept.
    pub fn is_empty(&self) -> bool {
        self.lock().items.is_empty()
    }

    /// The kept recordings, least recently used first.
    pub fn caches(&self) -> Vec<Arc<RenderCache>> {
        self.lock().items.clone()
    }

    /// The contexts that own at least one kept recording.
    pub fn contexts(&self) -> Vec<GpuContextId> {
        let mut contexts: Vec<_> = self.lock().items.iter().map(|c| c.context()).collect();
        contexts.sort();
        contexts.dedup();
        contexts
    }

    /// The settings this list was created with.
    pub fn settings(&self) -> &CacheSettings {
        &self.settings
    }

    /// A snapshot of the list's size and counters.
    pub fn stats(&self) -> CacheListStats {
        let inner = self.lock();
        CacheListStats {
            capacity: inner.capacity,
            len: inner.items.len(),
            recording: inner.passes.values().any(|pass| pass.open_cache.is_some()),
            counters: inner.counters,
            auto_cache_bits: inner
                .passes
                .values()
                .fold(AutoCacheBits::NONE, |bits, pass| bits | pass.auto_cache_bits)
                .bits(),
        }
    }

    /// Replays the first recording valid in the current traversal.
    ///
    /// On a hit the recording becomes the most recently used one and `true`
    /// is returned; the caller must then skip the group's children.
    pub fn call(&self, state: &mut TraversalState, gpu: &mut dyn GraphicsContext) -> bool {
        let mut inner = self.lock();
        if inner.items.is_empty() {
            return false;
        }

        let context = state.context();
        let Some(index) = inner.items.iter().position(|cache| {
            cache.context() == context
                && cache.is_valid(state)
                && state.lazy().pre_cache_call(&cache.pre_color())
        }) else {
            if self.settings.logs_decisions() {
                self.log_miss(&inner.items, state);
            }
            return false;
        };

        let cache = Arc::clone(&inner.items[index]);
        if let Err(err) = cache.ensure_replayable(state, gpu) {
            log::error!("Refusing to replay a cache in {context}: {err}");
            return false;
        }

        inner.items.remove(index);
        inner.items.push(Arc::clone(&cache));

        state.lazy_mut().send(gpu, LazyMask::ALL);
        if let Err(err) = cache.call(state, gpu) {
            log::error!("Failed to replay a valid cache: {err}");
            return false;
        }
        state.lazy_mut().post_cache_call(&cache.post_color());
        inner.counters.times_used += 1;

        if self.settings.gpu_error_checks {
            if let Some(err) = gpu.take_error() {
                log::error!("GPU error after replaying a cache in {context}: {err}");
            }
        }
        log::trace!("Replayed cache in {context} ({} uses).", inner.counters.times_used);
        true
    }

    /// Prepares the traversal of the group's children, possibly starting a
    /// new recording.
    ///
    /// `auto` selects automatic mode, where the decision also depends on the
    /// votes cast by the subgraph's shapes and on the discard history.
    pub fn open(&self, state: &mut TraversalState, gpu: &mut dyn GraphicsContext, auto: bool) {
        let mut guard = self.lock();
        let inner = &mut *guard;
        let context = state.context();
        let pass = inner.passes.entry(context).or_default();

        if inner.capacity == 0 || (auto && !self.settings.auto_caching) {
            pass.need_close = false;
            return;
        }

        pass.need_close = true;
        pass.recording_failed = false;
        pass.saved_invalid = state.set_invalid(false);

        if state.any_open() {
            return;
        }

        let should_create =
            inner
                .counters
                .should_create(auto, pass.auto_cache_bits, self.settings.smart_caching);

        if self.settings.logs_decisions() && inner.counters.frames_ok >= 2 {
            log::debug!(
                "Considering a new cache in {context}: frames_ok={}, used={}, discarded={}, create={should_create}",
                inner.counters.frames_ok,
                inner.counters.times_used,
                inner.counters.times_discarded,
            );
        }

        if should_create {
            if inner.items.len() >= inner.capacity {
                inner.items.remove(0);
                inner.counters.times_discarded += 1;
            }

            let cache = RenderCache::new(context, Arc::clone(&self.registry));
            state.set_open_cache(Arc::clone(&cache));
            if let Err(err) = cache.open(state, gpu) {
                log::warn!("Could not start recording in {context}: {err}");
                pass.recording_failed = true;
            }
            state.read_element(ElementKind::ShapeStyle);
            pass.open_cache = Some(cache);

            if self.settings.logs_decisions() {
                log::debug!("Recording a new cache in {context}.");
            }
        }

        pass.auto_cache_bits = state.reset_auto_cache_bits();
        inner.counters.shapes_seen_last_close = 0;
    }

    /// Finishes the traversal started by [`open`](Self::open) in the same
    /// context, keeping the new recording unless the invalidation signal
    /// fired meanwhile or the recording failed.
    pub fn close(&self, state: &mut TraversalState, gpu: &mut dyn GraphicsContext) {
        let mut guard = self.lock();
        let inner = &mut *guard;
        let context = state.context();
        let Some(pass) = inner.passes.get_mut(&context) else {
            return;
        };
        if !pass.need_close {
            return;
        }
        pass.need_close = false;

        if let Some(cache) = pass.open_cache.clone() {
            if let Err(err) = cache.close(state, gpu) {
                log::warn!("Recording in {context} failed: {err}");
                pass.recording_failed = true;
            }
            state.clear_open_cache(&cache);
        }

        let fired = state.set_invalid(pass.saved_invalid);
        if fired {
            state.set_invalid(true);
        }

        if fired || pass.recording_failed {
            inner.counters.frames_ok = 0;
            if pass.open_cache.take().is_some() {
                inner.counters.times_discarded += 1;
                if self.settings.logs_decisions() {
                    log::debug!("Discarded a new cache in {context}.");
                }
            }
        } else {
            inner.counters.frames_ok += 1;
        }

        if let Some(cache) = pass.open_cache.take() {
            // Another context may have filled the list since this pass opened.
            while inner.items.len() >= inner.capacity {
                inner.items.remove(0);
                inner.counters.times_discarded += 1;
            }
            inner.items.push(cache);
            if self.settings.logs_decisions() {
                log::debug!(
                    "Kept a new cache in {context} ({} of {}).",
                    inner.items.len(),
                    inner.capacity
                );
            }
        }

        inner.counters.shapes_seen_last_close = state.num_shapes();
        let subgraph_votes = state.reset_auto_cache_bits();
        state.set_auto_cache_bits(subgraph_votes | pass.auto_cache_bits);
        pass.auto_cache_bits = subgraph_votes;
    }

    /// Drops every kept recording. Call when anything below the group changed.
    ///
    /// A recording in progress is left alone; the change raises the
    /// invalidation signal, which discards it at close.
    pub fn invalidate_all(&self) {
        let mut inner = self.lock();
        let count = inner.items.len();
        if count > 0 && self.settings.logs_invalidations() {
            log::debug!("Invalidating {count} cache(s).");
        }
        inner.items.clear();
        inner.counters.times_discarded = inner
            .counters
            .times_discarded
            .saturating_add(u32::try_from(count).unwrap_or(u32::MAX));
        inner.counters.frames_ok = 0;
    }

    fn log_miss(&self, items: &[Arc<RenderCache>], state: &TraversalState) {
        for cache in items.iter().filter(|c| c.context() == state.context()) {
            match cache.invalid_element(state) {
                Some(kind) => log::debug!("Cache miss in {}: {kind:?} changed.", state.context()),
                None => log::debug!("Cache miss in {}: lazy color state changed.", state.context()),
            }
        }
    }

    fn lock(&self) -> MutexGuard<'_, CacheListInner> {
        lock(&self.inner)
    }
}

impl Drop for CacheList {
    fn drop(&mut self) {
        self.registry.unregister_destruction_callback(&self.listener);
    }
}

impl std::fmt::Debug for CacheList {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CacheList")
            .field("stats", &self.stats())
            .finish()
    }
}

fn lock(inner: &Mutex<CacheListInner>) -> MutexGuard<'_, CacheListInner> {
    inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::render_lane::{DrawShape, RenderNode};
    use lumen_core::renderer::ShapeId;
    use lumen_core::state::ElementStamp;
    use lumen_infra::graphics::RecordingContext;

    struct Fixture {
        registry: Arc<ContextRegistry>,
        gpu: RecordingContext,
        state: TraversalState,
    }

    fn fixture() -> Fixture {
        let registry = Arc::new(ContextRegistry::new());
        let context = registry.allocate_context_id();
        Fixture {
            registry,
            gpu: RecordingContext::new(context),
            state: TraversalState::new(context),
        }
    }

    fn settings(smart_caching: bool) -> CacheSettings {
        CacheSettings {
            smart_caching,
            ..CacheSettings::default()
        }
    }

    /// One traversal of a group with `shapes` shapes, without trying to replay.
    fn traverse(list: &CacheList, f: &mut Fixture, auto: bool, shapes: u64) {
        f.state.begin_frame();
        f.state.push();
        list.open(&mut f.state, &mut f.gpu, auto);
        for shape in 0..shapes {
            DrawShape::new(ShapeId(shape), 3).render(&mut f.state, &mut f.gpu);
        }
        f.state.pop();
        list.close(&mut f.state, &mut f.gpu);
    }

    fn try_call(list: &CacheList, f: &mut Fixture) -> bool {
        f.state.push();
        let hit = list.call(&mut f.state, &mut f.gpu);
        f.state.pop();
        hit
    }

    #[test]
    fn test_explicit_mode_eviction_and_lru_scenario() {
        let mut f = fixture();
        let list = CacheList::with_settings(2, Arc::clone(&f.registry), settings(false));

        // First quiet frame: nothing recorded yet.
        traverse(&list, &mut f, false, 1);
        assert!(list.is_empty());

        let stamps: Vec<_> = (0..3).map(|_| ElementStamp::fresh()).collect();
        for stamp in &stamps {
            f.state.set_element(ElementKind::ModelMatrix, *stamp);
            traverse(&list, &mut f, false, 1);
        }

        let caches = list.caches();
        assert_eq!(caches.len(), 2);
        assert_eq!(list.stats().counters.times_discarded, 1);
        let (s2, s3) = (Arc::clone(&caches[0]), Arc::clone(&caches[1]));
        assert!(s2.dependencies().contains(&(ElementKind::ModelMatrix, stamps[1])));
        assert!(s3.dependencies().contains(&(ElementKind::ModelMatrix, stamps[2])));

        // Back to the state S2 was recorded in.
        f.state.set_element(ElementKind::ModelMatrix, stamps[1]);
        assert!(try_call(&list, &mut f));
        let caches = list.caches();
        assert!(Arc::ptr_eq(&caches[0], &s3));
        assert!(Arc::ptr_eq(&caches[1], &s2));
        assert_eq!(list.stats().counters.times_used, 1);
    }

    #[test]
    fn test_auto_mode_mid_sized_subgraph_records_after_two_quiet_frames() {
        let mut f = fixture();
        let list = CacheList::with_settings(2, Arc::clone(&f.registry), settings(true));

        traverse(&list, &mut f, true, 50);
        traverse(&list, &mut f, true, 50);
        let stats = list.stats();
        assert_eq!(stats.counters.frames_ok, 2);
        assert_eq!(stats.counters.shapes_seen_last_close, 50);
        assert_eq!(stats.auto_cache_bits, AutoCacheBits::DO_AUTO_CACHE.bits());
        assert!(list.is_empty());

        traverse(&list, &mut f, true, 50);
        assert_eq!(list.len(), 1);
        assert!(try_call(&list, &mut f));
    }

    #[test]
    fn test_auto_mode_small_subgraph_waits_longer_with_smart_caching() {
        let mut f = fixture();
        let list = CacheList::with_settings(2, Arc::clone(&f.registry), settings(true));

        for _ in 0..4 {
            traverse(&list, &mut f, true, 1);
        }
        assert!(list.is_empty(), "a single shape needs five quiet frames");
        traverse(&list, &mut f, true, 1);
        traverse(&list, &mut f, true, 1);
        assert_eq!(list.len(), 1);
    }

    #[test]
    fn test_auto_mode_ignores_subgraphs_voting_against_caching() {
        let mut f = fixture();
        let list = CacheList::with_settings(2, Arc::clone(&f.registry), settings(false));

        for _ in 0..5 {
            f.state.begin_frame();
            f.state.push();
            list.open(&mut f.state, &mut f.gpu, true);
            f.state.should_auto_cache(AutoCacheBits::DONT_AUTO_CACHE);
            f.state.pop();
            list.close(&mut f.state, &mut f.gpu);
        }
        assert!(list.is_empty());
        assert_eq!(list.stats().counters.frames_ok, 5);
    }

    #[test]
    fn test_disabled_auto_caching_never_opens() {
        let mut f = fixture();
        let disabled = CacheSettings {
            auto_caching: false,
            ..CacheSettings::default()
        };
        let list = CacheList::with_settings(2, Arc::clone(&f.registry), disabled);

        for _ in 0..5 {
            traverse(&list, &mut f, true, 50);
        }
        assert!(list.is_empty());
        assert_eq!(list.stats().counters.frames_ok, 0, "close is a no-op when open was");
    }

    #[test]
    fn test_zero_capacity_disables_caching() {
        let mut f = fixture();
        let list = CacheList::with_settings(0, Arc::clone(&f.registry), settings(false));
        for _ in 0..5 {
            traverse(&list, &mut f, false, 1);
        }
        assert!(list.is_empty());
        assert!(!try_call(&list, &mut f));
    }

    #[test]
    fn test_capacity_holds_after_every_close() {
        let mut f = fixture();
        let list = CacheList::with_settings(3, Arc::clone(&f.registry), settings(false));
        let mut closed = Vec::new();

        for frame in 0..12 {
            f.state.set_element(ElementKind::ModelMatrix, ElementStamp::fresh());
            traverse(&list, &mut f, false, 1);
            assert!(list.len() <= 3, "frame {frame}");
            if let Some(last) = list.caches().last() {
                if !closed.iter().any(|c| Arc::ptr_eq(c, last)) {
                    closed.push(Arc::clone(last));
                }
            }
        }

        // The survivors are the three most recently closed, in close order.
        let survivors = list.caches();
        let expected = &closed[closed.len() - 3..];
        assert!(survivors
            .iter()
            .zip(expected)
            .all(|(a, b)| Arc::ptr_eq(a, b)));
    }

    #[test]
    fn test_open_cache_is_not_listed_until_closed() {
        let mut f = fixture();
        let list = CacheList::with_settings(2, Arc::clone(&f.registry), settings(false));
        traverse(&list, &mut f, false, 1);

        f.state.push();
        list.open(&mut f.state, &mut f.gpu, false);
        let open = f.state.open_cache().cloned().unwrap();
        assert!(list.stats().recording);
        assert!(!list.caches().iter().any(|c| Arc::ptr_eq(c, &open)));
        f.state.pop();
        list.close(&mut f.state, &mut f.gpu);

        assert!(!f.state.any_open());
        assert!(list.caches().iter().any(|c| Arc::ptr_eq(c, &open)));
    }

    #[test]
    fn test_invalidation_during_recording_discards_it() {
        let mut f = fixture();
        let list = CacheList::with_settings(2, Arc::clone(&f.registry), settings(false));
        traverse(&list, &mut f, false, 1);
        assert_eq!(list.stats().counters.frames_ok, 1);

        f.state.push();
        list.open(&mut f.state, &mut f.gpu, false);
        assert!(f.state.any_open());
        f.state.invalidate();
        f.state.pop();
        list.close(&mut f.state, &mut f.gpu);

        let stats = list.stats();
        assert!(list.is_empty());
        assert_eq!(stats.counters.frames_ok, 0);
        assert_eq!(stats.counters.times_discarded, 1);
        assert!(f.state.is_invalid(), "the signal reaches enclosing groups");
    }

    #[test]
    fn test_failed_recording_is_treated_as_dirty() {
        let registry = Arc::new(ContextRegistry::new());
        let context = registry.allocate_context_id();
        let mut f = Fixture {
            gpu: RecordingContext::new(context).with_list_memory_limit(0),
            state: TraversalState::new(context),
            registry,
        };
        let list = CacheList::with_settings(2, Arc::clone(&f.registry), settings(false));

        traverse(&list, &mut f, false, 1);
        traverse(&list, &mut f, false, 1);

        let stats = list.stats();
        assert!(list.is_empty());
        assert_eq!(stats.counters.frames_ok, 0);
        assert_eq!(stats.counters.times_discarded, 1);
        assert!(!f.state.is_invalid(), "a failed recording is not an invalidation");
    }

    #[test]
    fn test_caches_never_match_another_context() {
        let mut f = fixture();
        let list = CacheList::with_settings(2, Arc::clone(&f.registry), settings(false));
        traverse(&list, &mut f, false, 1);
        traverse(&list, &mut f, false, 1);
        assert_eq!(list.len(), 1);

        let other = f.registry.allocate_context_id();
        let mut gpu = RecordingContext::new(other);
        let mut state = TraversalState::new(other);
        assert!(!list.call(&mut state, &mut gpu));
        assert!(gpu.executed().is_empty());
        assert_eq!(list.contexts(), vec![f.state.context()]);
    }

    #[test]
    fn test_interleaved_contexts_keep_separate_passes() {
        let mut a = fixture();
        let other = a.registry.allocate_context_id();
        let mut b = Fixture {
            registry: Arc::clone(&a.registry),
            gpu: RecordingContext::new(other),
            state: TraversalState::new(other),
        };
        let list = CacheList::with_settings(2, Arc::clone(&a.registry), settings(false));
        traverse(&list, &mut a, false, 1);

        // Both traversals are inside the group at the same time.
        for f in [&mut a, &mut b] {
            f.state.begin_frame();
            f.state.push();
        }
        list.open(&mut a.state, &mut a.gpu, false);
        list.open(&mut b.state, &mut b.gpu, false);
        assert_eq!(list.stats().counters.times_discarded, 0);
        for f in [&mut a, &mut b] {
            assert!(f.state.any_open());
            DrawShape::new(ShapeId(7), 3).render(&mut f.state, &mut f.gpu);
            f.state.pop();
        }
        list.close(&mut a.state, &mut a.gpu);
        list.close(&mut b.state, &mut b.gpu);

        for f in [&a, &b] {
            assert!(!f.state.any_open(), "{} left a recording open", f.state.context());
            assert!(!f.gpu.is_recording());
        }
        assert_eq!(list.contexts(), vec![a.state.context(), b.state.context()]);
        assert_eq!(list.stats().counters.times_discarded, 0);
        assert!(!list.stats().recording);

        assert!(try_call(&list, &mut a));
        assert!(try_call(&list, &mut b));
    }

    #[test]
    fn test_interleaved_closes_respect_capacity() {
        let mut a = fixture();
        let other = a.registry.allocate_context_id();
        let mut b = Fixture {
            registry: Arc::clone(&a.registry),
            gpu: RecordingContext::new(other),
            state: TraversalState::new(other),
        };
        let list = CacheList::with_settings(1, Arc::clone(&a.registry), settings(false));
        traverse(&list, &mut a, false, 1);

        for f in [&mut a, &mut b] {
            f.state.begin_frame();
            f.state.push();
        }
        list.open(&mut a.state, &mut a.gpu, false);
        list.open(&mut b.state, &mut b.gpu, false);
        for f in [&mut a, &mut b] {
            f.state.pop();
        }
        list.close(&mut a.state, &mut a.gpu);
        list.close(&mut b.state, &mut b.gpu);

        assert_eq!(list.len(), 1);
        assert_eq!(list.contexts(), vec![b.state.context()]);
        assert_eq!(list.stats().counters.times_discarded, 1);
    }

    #[test]
    fn test_invalidate_all_counts_discards() {
        let mut f = fixture();
        let list = CacheList::with_settings(2, Arc::clone(&f.registry), settings(false));
        for _ in 0..3 {
            f.state.set_element(ElementKind::ModelMatrix, ElementStamp::fresh());
            traverse(&list, &mut f, false, 1);
        }
        assert_eq!(list.len(), 2);

        list.invalidate_all();
        let stats = list.stats();
        assert!(list.is_empty());
        assert_eq!(stats.counters.times_discarded, 2);
        assert_eq!(stats.counters.frames_ok, 0);

        // Released when the context is next current.
        assert_eq!(f.registry.flush_pending_releases(&mut f.gpu), 2);
    }

    #[test]
    fn test_context_destruction_drops_its_caches() {
        let mut f = fixture();
        let list = CacheList::with_settings(2, Arc::clone(&f.registry), settings(false));
        traverse(&list, &mut f, false, 1);
        traverse(&list, &mut f, false, 1);
        assert_eq!(list.len(), 1);

        f.registry.notify_context_destroyed(f.state.context());
        assert!(list.is_empty());
        assert_eq!(f.registry.pending_release_count(f.state.context()), 0);
    }

    #[test]
    fn test_handles_outliving_their_context_release_nothing() {
        let mut f = fixture();
        let list = CacheList::with_settings(2, Arc::clone(&f.registry), settings(false));
        traverse(&list, &mut f, false, 1);
        traverse(&list, &mut f, false, 1);
        let held = list.caches();
        assert_eq!(held.len(), 1);

        f.registry.notify_context_destroyed(f.state.context());
        assert!(list.is_empty());
        drop(held);

        assert_eq!(f.registry.pending_release_count(f.state.context()), 0);
    }

    #[test]
    fn test_drop_unregisters_from_the_registry() {
        let registry = Arc::new(ContextRegistry::new());
        let list = CacheList::with_settings(2, Arc::clone(&registry), settings(false));
        assert_eq!(registry.listener_count(), 1);
        drop(list);
        assert_eq!(registry.listener_count(), 0);
    }
}
