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

//! A group node that caches the rendering of its children.

use std::sync::Arc;

use lumen_core::config::CacheSettings;
use lumen_core::context::ContextRegistry;
use lumen_core::renderer::GraphicsContext;

use super::{CacheList, CacheListStats, RenderNode, TraversalState};

/// How a [`CachingGroup`] uses its cache list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum CacheMode {
    /// Record as soon as the children stayed unchanged for one frame.
    On,
    /// Never record or replay.
    Off,
    /// Let the children's votes and the discard history decide.
    #[default]
    Auto,
}

/// A group that isolates the state changes of its children and caches
/// their rendering.
pub struct CachingGroup {
    name: &'static str,
    mode: CacheMode,
    children: Vec<Arc<dyn RenderNode>>,
    cache_list: CacheList,
}

impl CachingGroup {
    /// Creates an automatic group sized by the process-wide settings.
    #[must_use]
    pub fn new(registry: Arc<ContextRegistry>) -> Self {
        Self::with_settings(registry, *CacheSettings::global())
    }

    /// Creates an automatic group with explicit settings. Its capacity is
    /// `settings.max_caches`.
    #[must_use]
    pub fn with_settings(registry: Arc<ContextRegistry>, settings: CacheSettings) -> Self {
        Self {
            name: "CachingGroup",
            mode: CacheMode::default(),
            children: Vec::new(),
            cache_list: CacheList::with_settings(settings.max_caches, registry, settings),
        }
    }

    /// Sets the name reported in logs.
    #[must_use]
    pub fn named(mut self, name: &'static str) -> Self {
        self.name = name;
        self
    }

    /// Sets the caching mode.
    #[must_use]
    pub fn with_mode(mut self, mode: CacheMode) -> Self {
        self.mode = mode;
        self
    }

    /// Appends a child.
    #[must_use]
    pub fn with_child(mut self, child: Arc<dyn RenderNode>) -> Self {
        self.children.push(child);
        self
    }

    /// Appends a child.
    pub fn add_child(&mut self, child: Arc<dyn RenderNode>) {
        self.children.push(child);
    }

    /// The caching mode.
    pub fn mode(&self) -> CacheMode {
        self.mode
    }

    /// Changes the caching mode.
    pub fn set_mode(&mut self, mode: CacheMode) {
        self.mode = mode;
    }

    /// The group's cache list.
    pub fn cache_list(&self) -> &CacheList {
        &self.cache_list
    }

    /// Shortcut for `cache_list().stats()`.
    pub fn stats(&self) -> CacheListStats {
        self.cache_list.stats()
    }

    /// Tells the group that something below it changed. Every recording is dropped.
    pub fn notify(&self) {
        log::trace!("{} notified; invalidating its caches.", self.name);
        self.cache_list.invalidate_all();
    }
}

impl RenderNode for CachingGroup {
    fn node_name(&self) -> &'static str {
        self.name
    }

    fn render(&self, state: &mut TraversalState, gpu: &mut dyn GraphicsContext) {
        state.push();

        let mut create = false;
        if self.mode != CacheMode::Off && self.cache_list.capacity() > 0 {
            if self.cache_list.call(state, gpu) {
                state.pop();
                return;
            }
            create = !state.any_open();
        }

        if create {
            self.cache_list.open(state, gpu, self.mode == CacheMode::Auto);
        }

        for child in &self.children {
            child.render(state, gpu);
        }

        state.pop();

        if create {
            self.cache_list.close(state, gpu);
        }
    }
}

impl std::fmt::Debug for CachingGroup {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CachingGroup")
            .field("name", &self.name)
            .field("mode", &self.mode)
            .field("children", &self.children.len())
            .field("cache_list", &self.cache_list)
            .finish()
    }
}
