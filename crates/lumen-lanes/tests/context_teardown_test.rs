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

//! Integration tests for recordings shared by several GPU contexts.

mod common;

use std::sync::Arc;

use common::{settings, Viewer};
use lumen_core::context::ContextRegistry;
use lumen_core::math::LinearRgba;
use lumen_core::renderer::ShapeId;
use lumen_lanes::render_lane::{CacheMode, CachingGroup, DrawShape, Material, SetMaterial};

fn scene(registry: &Arc<ContextRegistry>) -> CachingGroup {
    CachingGroup::with_settings(Arc::clone(registry), settings())
        .with_mode(CacheMode::On)
        .with_child(Arc::new(SetMaterial::new(Material::diffuse(LinearRgba::YELLOW))))
        .with_child(Arc::new(DrawShape::new(ShapeId(1), 36)))
}

#[test]
fn test_each_context_replays_its_own_recording() {
    // ARRANGE
    common::init_logging();
    let registry = Arc::new(ContextRegistry::new());
    let group = scene(&registry);
    let mut left = Viewer::new(&registry);
    let mut right = Viewer::new(&registry);

    // ACT
    for _ in 0..4 {
        left.frame(&group);
        right.frame(&group);
    }

    // ASSERT
    let mut expected = vec![left.state.context(), right.state.context()];
    expected.sort();
    assert_eq!(group.cache_list().contexts(), expected);
    for cache in group.cache_list().caches() {
        let list = cache.display_list().unwrap();
        let gpu = if cache.context() == left.state.context() {
            &left.gpu
        } else {
            &right.gpu
        };
        assert!(gpu.is_list_alive(list));
    }
}

#[test]
fn test_destroyed_context_leaves_no_recording_behind() {
    // ARRANGE
    let registry = Arc::new(ContextRegistry::new());
    let group = scene(&registry);
    let mut left = Viewer::new(&registry);
    let mut right = Viewer::new(&registry);
    for _ in 0..3 {
        left.frame(&group);
        right.frame(&group);
    }
    let used_before = group.stats().counters.times_used;

    // ACT
    registry.notify_context_destroyed(left.state.context());

    // ASSERT
    assert_eq!(group.cache_list().contexts(), vec![right.state.context()]);
    assert_eq!(registry.pending_release_count(left.state.context()), 0);

    let draws = right.frame(&group);
    assert_eq!(draws.len(), 1);
    assert_eq!(draws[0].diffuse, LinearRgba::YELLOW);
    assert_eq!(group.stats().counters.times_used, used_before + 1);
}

#[test]
fn test_dropping_the_scene_unregisters_every_cache_list() {
    let registry = Arc::new(ContextRegistry::new());
    let group = scene(&registry);
    let nested = CachingGroup::with_settings(Arc::clone(&registry), settings())
        .with_child(Arc::new(group));
    assert_eq!(registry.listener_count(), 2);

    drop(nested);
    assert_eq!(registry.listener_count(), 0);
}
