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

//! Registry of per-context destruction callbacks and deferred GPU releases.
//!
//! The [`ContextRegistry`] is the single place where the lifetime of a GPU
//! context is announced. Components that hold per-context resources (cache
//! lists, most notably) register a [`ContextDestructionListener`] and drop
//! everything tagged with a context when it is torn down.
//!
//! The registry also owns the deferred release queue: a display list whose
//! last handle is dropped while its context is not current cannot be deleted
//! right away, so it is queued here and deleted the next time that context
//! is bound for rendering.

use super::GpuContextId;
use crate::renderer::api::DisplayListId;
use crate::renderer::traits::GraphicsContext;
use std::collections::{HashMap, HashSet};
use std::fmt;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

/// A component that must be told when a GPU context is destroyed.
///
/// Listeners are invoked synchronously, on the thread that destroys the
/// context, in registration order.
pub trait ContextDestructionListener: Send + Sync {
    /// Called once for every destroyed context.
    fn on_context_destroyed(&self, context: GpuContextId);
}

impl<F> ContextDestructionListener for F
where
    F: Fn(GpuContextId) + Send + Sync,
{
    fn on_context_destroyed(&self, context: GpuContextId) {
        self(context)
    }
}

/// Thread-safe registry of context destruction listeners.
///
/// The registry is meant to be created once and injected (as an
/// `Arc<ContextRegistry>`) into every component that needs it.
pub struct ContextRegistry {
    listeners: Mutex<Vec<Arc<dyn ContextDestructionListener>>>,
    releases: Mutex<ReleaseQueue>,
    next_context_id: AtomicU32,
}

#[derive(Debug, Default)]
struct ReleaseQueue {
    pending: HashMap<GpuContextId, Vec<DisplayListId>>,
    // Lists of these contexts died with them; late releases are ignored.
    destroyed: HashSet<GpuContextId>,
}

impl ContextRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self {
            listeners: Mutex::new(Vec::new()),
            releases: Mutex::new(ReleaseQueue::default()),
            next_context_id: AtomicU32::new(1),
        }
    }

    /// Hands out a context id that no other caller of this registry has received.
    pub fn allocate_context_id(&self) -> GpuContextId {
        GpuContextId(self.next_context_id.fetch_add(1, Ordering::Relaxed))
    }

    /// Appends a listener. Registering the same listener twice is allowed;
    /// it will then be invoked twice.
    pub fn register_destruction_callback(&self, listener: Arc<dyn ContextDestructionListener>) {
        lock(&self.listeners).push(listener);
    }

    /// Removes the first registration of `listener` (pointer identity).
    ///
    /// Returns `false` and does nothing when the listener is not registered.
    pub fn unregister_destruction_callback(
        &self,
        listener: &Arc<dyn ContextDestructionListener>,
    ) -> bool {
        let mut listeners = lock(&self.listeners);
        match listeners.iter().position(|l| Arc::ptr_eq(l, listener)) {
            Some(index) => {
                listeners.remove(index);
                true
            }
            None => false,
        }
    }

    /// Returns the number of active registrations.
    pub fn listener_count(&self) -> usize {
        lock(&self.listeners).len()
    }

    /// Announces that `context` has been destroyed.
    ///
    /// Every listener registered at the time of the call is invoked, in
    /// registration order. The listener list is snapshotted first and the
    /// lock is released while callbacks run, so a listener may unregister
    /// itself. Releases queued for the context, now or at any later time,
    /// are dropped: the GPU objects died with their context.
    pub fn notify_context_destroyed(&self, context: GpuContextId) {
        lock(&self.releases).destroyed.insert(context);
        let snapshot: Vec<_> = lock(&self.listeners).clone();
        log::debug!(
            "Context {context} destroyed, notifying {} listener(s).",
            snapshot.len()
        );

        for listener in &snapshot {
            listener.on_context_destroyed(context);
        }

        if let Some(dropped) = lock(&self.releases).pending.remove(&context) {
            log::trace!(
                "Dropped {} pending display list release(s) for {context}.",
                dropped.len()
            );
        }
    }

    /// Queues `list` for deletion the next time `context` is current.
    ///
    /// Ignored when `context` was already destroyed.
    pub fn schedule_release(&self, context: GpuContextId, list: DisplayListId) {
        let mut releases = lock(&self.releases);
        if releases.destroyed.contains(&context) {
            log::trace!("Ignoring release of {list:?}: {context} is already destroyed.");
            return;
        }
        releases.pending.entry(context).or_default().push(list);
    }

    /// Returns `true` once `context` has been announced as destroyed.
    pub fn is_destroyed(&self, context: GpuContextId) -> bool {
        lock(&self.releases).destroyed.contains(&context)
    }

    /// Returns the number of display lists waiting to be deleted in `context`.
    pub fn pending_release_count(&self, context: GpuContextId) -> usize {
        lock(&self.releases)
            .pending
            .get(&context)
            .map_or(0, Vec::len)
    }

    /// Deletes every display list queued for the context `gpu` renders to.
    ///
    /// Must be called on the thread that owns `gpu`, typically right before
    /// a frame is traversed. Returns the number of lists deleted.
    pub fn flush_pending_releases(&self, gpu: &mut dyn GraphicsContext) -> usize {
        let context = gpu.context_id();
        let lists = lock(&self.releases)
            .pending
            .remove(&context)
            .unwrap_or_default();

        for list in &lists {
            gpu.delete_list(*list);
        }
        if !lists.is_empty() {
            log::trace!("Released {} deferred display list(s) in {context}.", lists.len());
        }
        lists.len()
    }
}

impl Default for ContextRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for ContextRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ContextRegistry")
            .field("listeners", &self.listener_count())
            .field("next_context_id", &self.next_context_id)
            .finish()
    }
}

// A panicking listener must not take the whole registry down with it.
fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex
        .lock()
        .unwrap_or_else(std::sync::PoisonError::into_inner)
}
