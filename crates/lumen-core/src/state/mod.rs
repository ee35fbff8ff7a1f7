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

//! Traversal state vocabulary shared by cache producers and consumers.
//!
//! A traversal carries a set of *elements* (model matrix, shape style, ...).
//! Caches do not store element values; they store the [`ElementStamp`] each
//! element held while recording and compare stamps before replaying.

use std::sync::atomic::{AtomicU64, Ordering};

static NEXT_STAMP: AtomicU64 = AtomicU64::new(1);

/// The kinds of traversal state element a recording can depend on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, serde::Serialize)]
pub enum ElementKind {
    /// The accumulated model matrix.
    ModelMatrix,
    /// Shape style (lighting on/off, textures on/off, transparency...).
    /// Every recording depends on it.
    ShapeStyle,
    /// Draw style (filled, lines, points).
    DrawStyle,
    /// Bound textures.
    Texture,
    /// Active lights.
    Lights,
    /// Clipping planes.
    Clipping,
    /// Rendering complexity.
    Complexity,
    /// An application-defined element.
    Custom(u32),
}

/// Identity of the value an element holds.
///
/// Two equal stamps mean the element was set by the same node to the same
/// value. `ElementStamp::DEFAULT` is the stamp of an element nobody set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, serde::Serialize)]
pub struct ElementStamp(pub u64);

impl ElementStamp {
    /// The stamp of an element still holding its default value.
    pub const DEFAULT: Self = Self(0);

    /// Returns a process-unique stamp.
    pub fn fresh() -> Self {
        Self(NEXT_STAMP.fetch_add(1, Ordering::Relaxed))
    }

    /// Derives the stamp of an accumulated value (such as a model matrix
    /// multiplied by a local transform) from the stamp of the value it
    /// accumulates onto and the stamp of the local contribution.
    pub fn combine(self, local: Self) -> Self {
        Self(self.0.rotate_left(17) ^ local.0.wrapping_mul(0x9E37_79B9_7F4A_7C15))
    }
}

/// How much effort is spent drawing shapes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Complexity {
    /// Full geometry, independent of the camera. Cheap to cache.
    #[default]
    ObjectSpace,
    /// Tessellation depends on the projected size, so recordings go stale
    /// whenever the camera moves.
    ScreenSpace,
    /// Only bounding boxes are drawn.
    BoundingBox,
}

/// Votes cast by the shapes below a group on whether the group should cache.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct AutoCacheBits {
    bits: u32,
}

impl AutoCacheBits {
    /// No vote.
    pub const NONE: Self = Self { bits: 0 };
    /// Something below would benefit from caching.
    pub const DO_AUTO_CACHE: Self = Self { bits: 1 << 0 };
    /// Something below would make a recording go stale quickly.
    pub const DONT_AUTO_CACHE: Self = Self { bits: 1 << 1 };

    /// Creates the bits from a raw value; unknown bits are dropped.
    pub const fn from_bits(bits: u32) -> Self {
        Self { bits: bits & 0b11 }
    }

    /// Returns the raw bits.
    pub const fn bits(&self) -> u32 {
        self.bits
    }

    /// Checks whether every bit of `other` is present.
    pub const fn contains(&self, other: Self) -> bool {
        (self.bits & other.bits) == other.bits
    }

    /// Checks whether no vote was cast.
    pub const fn is_empty(&self) -> bool {
        self.bits == 0
    }
}

impl std::ops::BitOr for AutoCacheBits {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self::Output {
        Self {
            bits: self.bits | rhs.bits,
        }
    }
}

impl std::ops::BitOrAssign for AutoCacheBits {
    fn bitor_assign(&mut self, rhs: Self) {
        self.bits |= rhs.bits;
    }
}
