//! Error types for grid operations.

use std::fmt;

use nova_core::IntVect;

/// Errors arising from level nesting checks and inter-level transfers.
#[derive(Debug, Clone, PartialEq)]
pub enum GridError {
    /// A fine patch does not start and end on coarse cell boundaries.
    Misaligned {
        /// Refinement ratio.
        ratio: i64,
        /// Fine patch low corner.
        lo: IntVect,
        /// Fine patch high corner.
        hi: IntVect,
    },
    /// A fine patch plus its one-cell buffer is not covered by its parent.
    NotNested {
        /// What went wrong.
        reason: String,
    },
    /// Fine and coarse arrays carry different component counts.
    ComponentMismatch {
        /// Fine component count.
        fine: usize,
        /// Coarse component count.
        coarse: usize,
    },
    /// Interpolation needed coarse data the coarse array does not hold.
    OutsideCoarseData {
        /// The coarse cell that was required.
        point: IntVect,
    },
}

impl fmt::Display for GridError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Misaligned { ratio, lo, hi } => {
                write!(f, "patch {lo:?}..{hi:?} is not aligned to ratio {ratio}")
            }
            Self::NotNested { reason } => write!(f, "improper nesting: {reason}"),
            Self::ComponentMismatch { fine, coarse } => {
                write!(f, "fine has {fine} components, coarse has {coarse}")
            }
            Self::OutsideCoarseData { point } => {
                write!(f, "coarse cell {point:?} is outside the coarse array")
            }
        }
    }
}

impl std::error::Error for GridError {}
