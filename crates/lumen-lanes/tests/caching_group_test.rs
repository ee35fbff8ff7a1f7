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

//! Integration tests for caching groups: replayed frames must draw exactly
//! what traversed frames draw.

mod common;

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use common::{settings, Viewer};
use lumen_core::context::ContextRegistry;
use lumen_core::math::{rotation_z, LinearRgba};
use lumen_core::renderer::{GpuCommand, GraphicsContext, ShapeId};
use lumen_lanes::render_lane::{
    CacheMode, CachingGroup, DrawShape, Invalidate, Material, RenderNode, SetMaterial,
    SetTransform, TraversalState,
};

struct Scene {
    root: Arc<CachingGroup>,
    cached: Arc<CachingGroup>,
    automatic: Arc<CachingGroup>,
    inner_material: Arc<SetMaterial>,
}

fn build_scene(registry: &Arc<ContextRegistry>, caching: bool) -> Scene {
    let (explicit, auto) = if caching {
        (CacheMode::On, CacheMode::Auto)
    } else {
        (CacheMode::Off, CacheMode::Off)
    };

    let inner_material = Arc::new(SetMaterial::new(Material::diffuse(LinearRgba::GREEN)));
    let cached = Arc::new(
        CachingGroup::with_settings(Arc::clone(registry), settings())
            .named("cached")
            .with_mode(explicit)
            .with_child(Arc::new(SetTransform::translation(1.0, 0.0, 0.0)))
            .with_child(inner_material.clone())
            .with_child(Arc::new(DrawShape::new(ShapeId(1), 3))),
    );
    let automatic = Arc::new(
        CachingGroup::with_settings(Arc::clone(registry), settings())
            .named("automatic")
            .with_mode(auto)
            .with_child(Arc::new(DrawShape::new(ShapeId(3), 3)))
            .with_child(Arc::new(DrawShape::new(ShapeId(4), 3))),
    );
    let root = Arc::new(
        CachingGroup::with_settings(Arc::clone(registry), settings())
            .named("root")
            .with_mode(CacheMode::Off)
            .with_child(Arc::new(SetMaterial::new(Material::diffuse(LinearRgba::RED))))
            .with_child(cached.clone())
            .with_child(Arc::new(DrawShape::new(ShapeId(2), 3)))
            .with_child(automatic.clone()),
    );

    Scene {
        root,
        cached,
        automatic,
        inner_material,
    }
}

#[test]
fn test_replayed_frames_draw_like_traversed_frames() {
    // ARRANGE
    common::init_logging();
    let registry = Arc::new(ContextRegistry::new());
    let plain = build_scene(&registry, false);
    let cached = build_scene(&registry, true);
    let mut plain_viewer = Viewer::new(&registry);
    let mut cached_viewer = Viewer::new(&registry);

    // ACT & ASSERT
    for frame in 0..6 {
        let expected = plain_viewer.frame(plain.root.as_ref());
        let actual = cached_viewer.frame(cached.root.as_ref());
        assert_eq!(actual, expected, "frame {frame}");
        assert_eq!(expected.len(), 4);
    }

    assert!(cached.cached.stats().counters.times_used >= 3);
    assert!(cached.automatic.stats().counters.times_used >= 2);
    assert!(plain.cached.cache_list().is_empty());
}

#[test]
fn test_notify_drops_stale_recordings() {
    // ARRANGE
    let registry = Arc::new(ContextRegistry::new());
    let scene = build_scene(&registry, true);
    let mut viewer = Viewer::new(&registry);
    for _ in 0..3 {
        viewer.frame(scene.root.as_ref());
    }
    assert_eq!(scene.cached.cache_list().len(), 1);

    // ACT
    scene
        .inner_material
        .set_material(Material::diffuse(LinearRgba::BLUE));
    scene.cached.notify();
    let draws = viewer.frame(scene.root.as_ref());

    // ASSERT
    assert_eq!(draws[0].shape, ShapeId(1));
    assert_eq!(draws[0].diffuse, LinearRgba::BLUE);
    assert_eq!(draws[1].diffuse, LinearRgba::RED);
    assert_eq!(scene.cached.stats().counters.times_discarded, 1);

    let stats = serde_json::to_value(scene.cached.stats()).unwrap();
    assert_eq!(stats["len"], 0);
    assert_eq!(stats["recording"], false);
    assert_eq!(stats["counters"]["times_discarded"], 1);
    assert_eq!(stats["counters"]["frames_ok"], 1);
}

/// Applies one of two fixed transforms, outside any cached group.
struct Toggle {
    first: AtomicBool,
    a: SetTransform,
    b: SetTransform,
}

impl RenderNode for Toggle {
    fn node_name(&self) -> &'static str {
        "Toggle"
    }

    fn render(&self, state: &mut TraversalState, gpu: &mut dyn GraphicsContext) {
        if self.first.load(Ordering::Relaxed) {
            self.a.render(state, gpu);
        } else {
            self.b.render(state, gpu);
        }
    }
}

#[test]
fn test_outside_changes_select_among_recordings() {
    // ARRANGE
    let registry = Arc::new(ContextRegistry::new());
    let toggle = Arc::new(Toggle {
        first: AtomicBool::new(true),
        a: SetTransform::new(rotation_z(0.5)),
        b: SetTransform::translation(0.0, 4.0, 0.0),
    });
    let group = Arc::new(
        CachingGroup::with_settings(Arc::clone(&registry), settings())
            .with_mode(CacheMode::On)
            .with_child(Arc::new(DrawShape::new(ShapeId(9), 6))),
    );
    let root = CachingGroup::with_settings(Arc::clone(&registry), settings())
        .with_mode(CacheMode::Off)
        .with_child(toggle.clone())
        .with_child(group.clone());
    let mut viewer = Viewer::new(&registry);

    // ACT
    viewer.frame(&root);
    viewer.frame(&root); // records under A
    toggle.first.store(false, Ordering::Relaxed);
    let under_b = viewer.frame(&root); // records under B
    toggle.first.store(true, Ordering::Relaxed);
    let under_a = viewer.frame(&root); // replays A

    // ASSERT
    let stats = group.stats();
    assert_eq!(stats.len, 2);
    assert_eq!(stats.counters.times_used, 1);
    assert_eq!(under_b[0].matrix, lumen_core::math::translation(0.0, 4.0, 0.0));
    assert_eq!(under_a[0].matrix, rotation_z(0.5));
}

#[test]
fn test_invalidating_content_is_never_recorded() {
    // ARRANGE
    let registry = Arc::new(ContextRegistry::new());
    let volatile = Arc::new(
        CachingGroup::with_settings(Arc::clone(&registry), settings())
            .with_mode(CacheMode::On)
            .with_child(Arc::new(DrawShape::new(ShapeId(1), 3)))
            .with_child(Arc::new(Invalidate)),
    );
    let root = CachingGroup::with_settings(Arc::clone(&registry), settings())
        .with_mode(CacheMode::On)
        .with_child(volatile.clone())
        .with_child(Arc::new(DrawShape::new(ShapeId(2), 3)));
    let mut viewer = Viewer::new(&registry);

    // ACT
    for _ in 0..5 {
        assert_eq!(viewer.frame(&root).len(), 2);
    }

    // ASSERT
    assert!(volatile.cache_list().is_empty());
    assert!(root.cache_list().is_empty(), "the signal reaches the enclosing group");
    assert_eq!(root.stats().counters.frames_ok, 0);
    assert!(viewer.state.is_invalid());
}

#[test]
fn test_replay_inside_a_recording_nests_the_inner_list() {
    // ARRANGE
    let registry = Arc::new(ContextRegistry::new());
    let inner = Arc::new(
        CachingGroup::with_settings(Arc::clone(&registry), settings())
            .named("inner")
            .with_mode(CacheMode::On)
            .with_child(Arc::new(DrawShape::new(ShapeId(5), 3))),
    );
    let outer = CachingGroup::with_settings(Arc::clone(&registry), settings())
        .named("outer")
        .with_mode(CacheMode::On)
        .with_child(Arc::new(SetMaterial::new(Material::diffuse(LinearRgba::CYAN))))
        .with_child(inner.clone());
    let mut viewer = Viewer::new(&registry);

    viewer.frame(&outer);
    viewer.frame(&outer); // outer records, inner is traversed into it
    outer.notify();
    viewer.frame(&outer); // inner records
    viewer.frame(&outer); // outer records, inner replays into it

    // ACT
    let outer_cache = outer.cache_list().caches().pop().unwrap();
    let inner_cache = inner.cache_list().caches().pop().unwrap();
    let outer_list = outer_cache.display_list().unwrap();
    let inner_list = inner_cache.display_list().unwrap();
    inner.notify();
    drop(inner_cache);
    let draws = viewer.frame(&outer);

    // ASSERT
    assert!(viewer
        .gpu
        .list_commands(outer_list)
        .unwrap()
        .contains(&GpuCommand::CallList(inner_list)));
    assert!(viewer.gpu.is_list_alive(inner_list), "kept alive by the outer recording");
    assert_eq!(draws.len(), 1);
    assert_eq!(draws[0].diffuse, LinearRgba::CYAN);
}
