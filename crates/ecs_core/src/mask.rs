//! Composition masks.

use serde::{Deserialize, Serialize};

/// Bitwise union of the component bits attached to an entity.
///
/// Also used as the archetype key: all entities with an identical mask share
/// one archetype set.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
pub struct Mask(pub u64);

impl Mask {
    /// The empty composition. Freshly created entities start here.
    pub const EMPTY: Mask = Mask(0);

    /// Number of distinct bits, and so the component type limit per world.
    pub const BITS: u32 = u64::BITS;

    /// The single-bit mask for bit position `bit`.
    #[must_use]
    pub const fn bit(bit: u32) -> Self {
        Self(1 << bit)
    }

    /// Returns `true` if every bit of `other` is set in `self`.
    #[must_use]
    pub const fn contains(self, other: Mask) -> bool {
        self.0 & other.0 == other.0
    }

    /// Returns `true` if `self` and `other` share any bit.
    #[must_use]
    pub const fn intersects(self, other: Mask) -> bool {
        self.0 & other.0 != 0
    }

    /// Union of both masks.
    #[must_use]
    pub const fn with(self, other: Mask) -> Self {
        Self(self.0 | other.0)
    }

    /// This mask with every bit of `other` cleared.
    #[must_use]
    pub const fn without(self, other: Mask) -> Self {
        Self(self.0 & !other.0)
    }

    /// Returns `true` if no bit is set.
    #[must_use]
    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }

    /// Iterates the bit positions set in this mask, lowest first.
    pub fn bits(self) -> impl Iterator<Item = u32> {
        let mut rest = self.0;
        std::iter::from_fn(move || {
            if rest == 0 {
                return None;
            }
            let bit = rest.trailing_zeros();
            rest &= rest - 1;
            Some(bit)
        })
    }
}

impl std::fmt::Display for Mask {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:#b}", self.0)
    }
}
