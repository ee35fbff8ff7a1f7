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

// Lumen Sandbox
// Renders an animated scene into two GPU contexts and reports how the
// render cache behaved.

use std::sync::Arc;

use anyhow::Result;
use lumen_core::context::GpuContextId;
use lumen_core::math::{rotation_z, LinearRgba};
use lumen_core::renderer::{GraphicsContext, ShapeId};
use lumen_core::state::Complexity;
use lumen_core::{CacheSettings, ContextRegistry};
use lumen_infra::graphics::RecordingContext;
use lumen_lanes::render_lane::{
    CacheListStats, CacheMode, CachingGroup, DrawShape, FrameRenderer, Invalidate, Material,
    SetComplexity, SetMaterial, SetTransform, TraversalState,
};

const FRAMES: u64 = 120;
const DESTROY_PREVIEW_AT: u64 = 60;
const GRID_SIZE: u32 = 4;

struct Scene {
    root: CachingGroup,
    spinner: Arc<SetTransform>,
    spinner_group: Arc<CachingGroup>,
    watched: Vec<(&'static str, Arc<CachingGroup>)>,
}

fn build_scene(registry: &Arc<ContextRegistry>, settings: CacheSettings) -> Scene {
    let group = || CachingGroup::with_settings(Arc::clone(registry), settings);

    let mut grid = group().named("grid");
    for row in 0..GRID_SIZE {
        for col in 0..GRID_SIZE {
            let tint = (row * GRID_SIZE + col) as f32 / (GRID_SIZE * GRID_SIZE) as f32;
            let tile = group()
                .named("tile")
                .with_child(Arc::new(SetTransform::translation(col as f32, row as f32, 0.0)))
                .with_child(Arc::new(SetMaterial::new(Material::diffuse(
                    LinearRgba::rgb(tint, tint, 1.0 - tint),
                ))))
                .with_child(Arc::new(DrawShape::new(ShapeId(1), 6)));
            grid.add_child(Arc::new(tile));
        }
    }
    let grid = Arc::new(grid);

    let spinner = Arc::new(SetTransform::new(rotation_z(0.0)));
    let spinner_group = Arc::new(
        group()
            .named("spinner")
            .with_child(spinner.clone())
            .with_child(Arc::new(SetMaterial::new(Material {
                emissive: Some(LinearRgba::rgb(0.2, 0.0, 0.0)),
                ..Material::diffuse(LinearRgba::RED)
            })))
            .with_child(Arc::new(DrawShape::new(ShapeId(2), 36))),
    );

    let overlay = Arc::new(
        group()
            .named("overlay")
            .with_mode(CacheMode::On)
            .with_child(Arc::new(SetComplexity::new(Complexity::ScreenSpace)))
            .with_child(Arc::new(DrawShape::new(ShapeId(3), 120)))
            .with_child(Arc::new(Invalidate)),
    );

    let root = group()
        .named("root")
        .with_mode(CacheMode::Off)
        .with_child(Arc::new(SetMaterial::new(Material::diffuse(LinearRgba::WHITE))))
        .with_child(grid.clone())
        .with_child(spinner_group.clone())
        .with_child(overlay.clone());

    Scene {
        root,
        spinner,
        spinner_group: spinner_group.clone(),
        watched: vec![("grid", grid), ("spinner", spinner_group), ("overlay", overlay)],
    }
}

struct Window {
    name: &'static str,
    gpu: RecordingContext,
    state: TraversalState,
    frames: FrameRenderer,
    draws: usize,
}

impl Window {
    fn new(name: &'static str, registry: &Arc<ContextRegistry>) -> Self {
        let context = registry.allocate_context_id();
        Self {
            name,
            gpu: RecordingContext::new(context),
            state: TraversalState::new(context),
            frames: FrameRenderer::new(Arc::clone(registry)),
            draws: 0,
        }
    }
}

#[derive(serde::Serialize)]
struct WindowSummary {
    name: &'static str,
    context: GpuContextId,
    frames: u64,
    draws: usize,
    live_lists: usize,
    deleted_lists: usize,
}

#[derive(serde::Serialize)]
struct Summary {
    settings: CacheSettings,
    windows: Vec<WindowSummary>,
    groups: Vec<(&'static str, CacheListStats)>,
}

fn summarize(window: &Window) -> WindowSummary {
    WindowSummary {
        name: window.name,
        context: window.gpu.context_id(),
        frames: window.frames.frames_rendered(),
        draws: window.draws,
        live_lists: window.gpu.list_count(),
        deleted_lists: window.gpu.deleted_list_count(),
    }
}

fn main() -> Result<()> {
    lumen_infra::logging::init("info")?;

    let settings = *CacheSettings::global();
    log::info!("Cache settings: {}", serde_json::to_string(&settings)?);

    let registry = Arc::new(ContextRegistry::new());
    let scene = build_scene(&registry, settings);
    let mut windows = vec![
        Window::new("main", &registry),
        Window::new("preview", &registry),
    ];
    let mut closed = Vec::new();

    for frame in 0..FRAMES {
        scene.spinner.set_matrix(rotation_z(frame as f32 * 0.05));
        scene.spinner_group.notify();

        for window in &mut windows {
            let report = window
                .frames
                .render_frame(&scene.root, &mut window.state, &mut window.gpu);
            if report.gpu_error {
                log::warn!("{} reported a GPU error in frame {frame}.", window.name);
            }
            window.draws += window
                .gpu
                .take_executed()
                .iter()
                .filter(|command| command.is_draw())
                .count();
        }

        if frame == DESTROY_PREVIEW_AT {
            if let Some(preview) = windows.pop() {
                log::info!(
                    "Closing {} ({}) after {} frames.",
                    preview.name,
                    preview.gpu.context_id(),
                    preview.frames.frames_rendered()
                );
                registry.notify_context_destroyed(preview.gpu.context_id());
                closed.push(summarize(&preview));
            }
        }
    }

    for (name, group) in &scene.watched {
        log::info!("{name}: {}", serde_json::to_string(&group.stats())?);
    }

    let summary = Summary {
        settings,
        windows: windows.iter().map(summarize).chain(closed).collect(),
        groups: scene
            .watched
            .iter()
            .map(|(name, group)| (*name, group.stats()))
            .collect(),
    };
    println!("{}", serde_json::to_string_pretty(&summary)?);
    Ok(())
}
