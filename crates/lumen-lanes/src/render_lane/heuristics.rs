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

//! Counters steering when a cache list starts recording.

use lumen_core::state::AutoCacheBits;

/// Per-list counters feeding the recording decision.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, serde::Serialize)]
pub struct HeuristicCounters {
    /// Consecutive frames in which the group traversed without invalidation.
    pub frames_ok: u32,
    /// Number of successful replays.
    pub times_used: u32,
    /// Number of recordings thrown away (evicted, invalidated or failed).
    pub times_discarded: u32,
    /// Shapes drawn below the group during the last traversal.
    pub shapes_seen_last_close: u32,
}

impl HeuristicCounters {
    /// Decides whether to start a recording.
    ///
    /// - Explicit caching records as soon as one frame went by without
    ///   invalidation.
    /// - Automatic caching needs two quiet frames and a subgraph that voted
    ///   exactly [`AutoCacheBits::DO_AUTO_CACHE`]. With `smart_caching`, small
    ///   and very large subgraphs must stay quiet longer. Groups that keep
    ///   losing their recordings are then throttled: no recording while
    ///   `times_discarded² >= frames_ok + times_used`.
    pub fn should_create(
        &self,
        auto: bool,
        subgraph_votes: AutoCacheBits,
        smart_caching: bool,
    ) -> bool {
        if !auto {
            return self.frames_ok >= 1;
        }

        if self.frames_ok < 2 || subgraph_votes != AutoCacheBits::DO_AUTO_CACHE {
            return false;
        }

        if smart_caching && self.frames_ok < smart_frame_threshold(self.shapes_seen_last_close) {
            return false;
        }

        let discarded = u64::from(self.times_discarded);
        discarded * discarded < u64::from(self.frames_ok) + u64::from(self.times_used)
    }
}

/// Quiet frames a subgraph of `shapes` shapes needs before recording.
pub fn smart_frame_threshold(shapes: u32) -> u32 {
    match shapes {
        0..=1 => 5,
        2..=4 => 4,
        5..=9 => 3,
        1001.. => 4,
        101..=1000 => 3,
        _ => 2,
    }
}
