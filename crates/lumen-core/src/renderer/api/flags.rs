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

//! Flags selecting components of the lazy color state.

/// A set of lazy color state components.
///
/// Used to say which parts of the state should be sent to the GPU, which
/// parts a recording changed, and which parts a recording depends on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct LazyMask {
    bits: u32,
}

impl LazyMask {
    /// No components.
    pub const NONE: Self = Self { bits: 0 };
    /// Lighting model.
    pub const LIGHT_MODEL: Self = Self { bits: 1 << 0 };
    /// Diffuse color (tracked by the id of the node that set it).
    pub const DIFFUSE: Self = Self { bits: 1 << 1 };
    /// Ambient color.
    pub const AMBIENT: Self = Self { bits: 1 << 2 };
    /// Specular color.
    pub const SPECULAR: Self = Self { bits: 1 << 3 };
    /// Emissive color.
    pub const EMISSIVE: Self = Self { bits: 1 << 4 };
    /// Shininess.
    pub const SHININESS: Self = Self { bits: 1 << 5 };
    /// Blending enable and factors.
    pub const BLENDING: Self = Self { bits: 1 << 6 };
    /// Two-sided lighting.
    pub const TWO_SIDE: Self = Self { bits: 1 << 7 };
    /// Flat or smooth shading.
    pub const SHADE_MODEL: Self = Self { bits: 1 << 8 };
    /// Every component.
    pub const ALL: Self = Self { bits: (1 << 9) - 1 };

    /// Every single-component mask, in send order.
    pub const COMPONENTS: [Self; 9] = [
        Self::LIGHT_MODEL,
        Self::DIFFUSE,
        Self::AMBIENT,
        Self::SPECULAR,
        Self::EMISSIVE,
        Self::SHININESS,
        Self::BLENDING,
        Self::TWO_SIDE,
        Self::SHADE_MODEL,
    ];

    /// Creates a mask from raw bits; unknown bits are dropped.
    pub const fn from_bits(bits: u32) -> Self {
        Self {
            bits: bits & Self::ALL.bits,
        }
    }

    /// Returns the raw bits.
    pub const fn bits(&self) -> u32 {
        self.bits
    }

    /// Combines two masks.
    pub const fn union(self, other: Self) -> Self {
        Self {
            bits: self.bits | other.bits,
        }
    }

    /// Removes the components of `other`.
    pub const fn difference(self, other: Self) -> Self {
        Self {
            bits: self.bits & !other.bits,
        }
    }

    /// Checks whether every component of `other` is present.
    pub const fn contains(&self, other: Self) -> bool {
        (self.bits & other.bits) == other.bits
    }

    /// Checks whether the mask is empty.
    pub const fn is_empty(&self) -> bool {
        self.bits == 0
    }

    /// Iterates over the single-component masks present in `self`.
    pub fn iter(self) -> impl Iterator<Item = Self> {
        Self::COMPONENTS
            .into_iter()
            .filter(move |component| self.contains(*component))
    }
}

impl std::ops::BitOr for LazyMask {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self::Output {
        self.union(rhs)
    }
}

impl std::ops::BitOrAssign for LazyMask {
    fn bitor_assign(&mut self, rhs: Self) {
        *self = self.union(rhs);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_all_covers_every_component() {
        for component in LazyMask::COMPONENTS {
            assert!(LazyMask::ALL.contains(component));
        }
        assert_eq!(LazyMask::ALL.iter().count(), LazyMask::COMPONENTS.len());
    }

    #[test]
    fn test_difference_and_iteration() {
        let mask = LazyMask::DIFFUSE | LazyMask::AMBIENT | LazyMask::BLENDING;
        let without = mask.difference(LazyMask::DIFFUSE);
        assert!(!without.contains(LazyMask::DIFFUSE));
        assert_eq!(
            without.iter().collect::<Vec<_>>(),
            vec![LazyMask::AMBIENT, LazyMask::BLENDING]
        );
        assert!(LazyMask::NONE.is_empty());
        assert_eq!(LazyMask::from_bits(u32::MAX), LazyMask::ALL);
    }
}
