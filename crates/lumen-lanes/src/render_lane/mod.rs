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

//! Render lane - recording, replaying and invalidating cached subgraphs.
//!
//! A traversal walks a tree of [`RenderNode`]s with a [`TraversalState`].
//! [`CachingGroup`]s consult their [`CacheList`] before traversing their
//! children: on a hit the recorded [`RenderCache`] is replayed, on a miss the
//! children are traversed while a new recording may be captured.

use lumen_core::renderer::GraphicsContext;

mod cache_list;
mod frame;
mod group;
mod heuristics;
mod nodes;
mod render_cache;
mod state;

pub use cache_list::*;
pub use frame::*;
pub use group::*;
pub use heuristics::*;
pub use nodes::*;
pub use render_cache::*;
pub use state::*;

/// A node of a renderable scene.
///
/// Nodes are shared between the traversals of every GPU context, so they
/// render through `&self` and keep any mutable data behind interior
/// synchronization.
pub trait RenderNode: Send + Sync {
    /// Returns a short human-readable name, used in logs.
    fn node_name(&self) -> &'static str;

    /// Emits the commands of this node (and its children) into `gpu`.
    fn render(&self, state: &mut TraversalState, gpu: &mut dyn GraphicsContext);
}
