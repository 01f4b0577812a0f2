//! Strongly-typed identifiers: levels, directions, faces, source kinds.

use std::fmt;

/// Identifies a refinement level. Level 0 is the coarsest.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct LevelId(pub u32);

impl LevelId {
    /// The next coarser level, or `None` for level 0.
    pub fn coarser(self) -> Option<LevelId> {
        self.0.checked_sub(1).map(LevelId)
    }

    /// The next finer level.
    pub fn finer(self) -> LevelId {
        LevelId(self.0 + 1)
    }

    /// Position of this level in a per-level vector.
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for LevelId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u32> for LevelId {
    fn from(v: u32) -> Self {
        Self(v)
    }
}

/// A spatial direction.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Direction {
    /// First coordinate axis.
    X,
    /// Second coordinate axis.
    Y,
    /// Third coordinate axis.
    Z,
}

impl Direction {
    /// All directions in axis order.
    pub const ALL: [Direction; 3] = [Direction::X, Direction::Y, Direction::Z];

    /// Axis index (0, 1, 2).
    pub fn index(self) -> usize {
        match self {
            Self::X => 0,
            Self::Y => 1,
            Self::Z => 2,
        }
    }

    /// Direction for an axis index, or `None` if out of range.
    pub fn from_index(i: usize) -> Option<Direction> {
        Self::ALL.get(i).copied()
    }

    /// The first `ndim` directions.
    pub fn active(ndim: usize) -> impl Iterator<Item = Direction> {
        Self::ALL.into_iter().take(ndim.min(3))
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::X => "x",
            Self::Y => "y",
            Self::Z => "z",
        };
        f.write_str(s)
    }
}

/// Low or high side of a box along one direction.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Side {
    /// The low face.
    Lo,
    /// The high face.
    Hi,
}

impl Side {
    /// Both sides, low first.
    pub const BOTH: [Side; 2] = [Side::Lo, Side::Hi];

    /// 0 for `Lo`, 1 for `Hi`.
    pub fn index(self) -> usize {
        match self {
            Self::Lo => 0,
            Self::Hi => 1,
        }
    }
}

/// Which copy of the level state an operation targets.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum TimeLevel {
    /// State at the start of the step. Immutable while the step runs.
    Old,
    /// State at the end of the step. Mutated in place.
    New,
}

/// The physical source terms a level advance can apply.
///
/// Declaration order is the canonical construction order. A term that
/// declares ordering constraints is stably deferred past the kinds it
/// must follow.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum SourceKind {
    /// User-supplied external forcing.
    External,
    /// Thermodynamic relaxation.
    Thermo,
    /// Outflow sponge damping.
    Sponge,
    /// Thermal (and in 1-D, species) diffusion.
    Diffusion,
    /// Hybrid angular-momentum correction.
    HybridMomentum,
    /// Self-gravity.
    Gravity,
    /// Rotating-frame forces.
    Rotation,
}

impl SourceKind {
    /// All kinds in canonical order.
    pub const ALL: [SourceKind; 7] = [
        SourceKind::External,
        SourceKind::Thermo,
        SourceKind::Sponge,
        SourceKind::Diffusion,
        SourceKind::HybridMomentum,
        SourceKind::Gravity,
        SourceKind::Rotation,
    ];

    /// Short name used in logs and diagnostics.
    pub fn name(self) -> &'static str {
        match self {
            Self::External => "ext",
            Self::Thermo => "thermo",
            Self::Sponge => "sponge",
            Self::Diffusion => "diffusion",
            Self::HybridMomentum => "hybrid_momentum",
            Self::Gravity => "gravity",
            Self::Rotation => "rotation",
        }
    }

    /// Position in the canonical order.
    pub fn canonical_index(self) -> usize {
        self as usize
    }
}

impl fmt::Display for SourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn level_neighbours() {
        assert_eq!(LevelId(0).coarser(), None);
        assert_eq!(LevelId(2).coarser(), Some(LevelId(1)));
        assert_eq!(LevelId(2).finer(), LevelId(3));
    }

    #[test]
    fn active_directions_follow_ndim() {
        let dirs: Vec<_> = Direction::active(2).collect();
        assert_eq!(dirs, vec![Direction::X, Direction::Y]);
        assert_eq!(Direction::active(5).count(), 3);
    }

    #[test]
    fn canonical_order_matches_declaration() {
        for (i, kind) in SourceKind::ALL.iter().enumerate() {
            assert_eq!(kind.canonical_index(), i);
        }
        assert!(SourceKind::Gravity > SourceKind::HybridMomentum);
        assert_eq!(SourceKind::HybridMomentum.to_string(), "hybrid_momentum");
    }
}
