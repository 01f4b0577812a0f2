//! Errors from flux staging and refluxing.

use nova_core::{ArrayError, IntVect, LevelId};

use std::error::Error;
use std::fmt;

/// Errors from [`FluxRegister`](crate::FluxRegister) and
/// [`FluxAccumulator`](crate::FluxAccumulator).
#[derive(Clone, Debug, PartialEq)]
pub enum FluxError {
    /// Reflux was requested before the fine level covered the coarse step.
    Premature {
        /// Fine level owning the register.
        level: LevelId,
        /// Fine time posted so far.
        covered: f64,
        /// Coarse step to be covered.
        expected: f64,
    },
    /// The fine level posted more time than the coarse step spans.
    Overrun {
        /// Fine level owning the register.
        level: LevelId,
        /// Fine time posted so far.
        covered: f64,
        /// Coarse step to be covered.
        expected: f64,
    },
    /// The fine patch does not align with the refinement ratio.
    Misaligned {
        /// Refinement ratio.
        ratio: i64,
        /// Low corner of the fine patch.
        lo: IntVect,
        /// High corner of the fine patch.
        hi: IntVect,
    },
    /// A correction target lies outside the coarse state.
    OutsideCoarse {
        /// The coarse cell.
        cell: IntVect,
    },
    /// Flux or state arrays disagree in shape.
    Shape(ArrayError),
}

impl fmt::Display for FluxError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Premature {
                level,
                covered,
                expected,
            } => write!(
                f,
                "reflux of level {level} after {covered} of {expected} coarse time covered"
            ),
            Self::Overrun {
                level,
                covered,
                expected,
            } => write!(
                f,
                "level {level} posted {covered} fine time for a coarse step of {expected}"
            ),
            Self::Misaligned { ratio, lo, hi } => {
                write!(f, "fine patch {lo:?}..={hi:?} is not aligned to ratio {ratio}")
            }
            Self::OutsideCoarse { cell } => {
                write!(f, "reflux target {cell:?} lies outside the coarse state")
            }
            Self::Shape(e) => write!(f, "flux shape: {e}"),
        }
    }
}

impl Error for FluxError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Shape(e) => Some(e),
            _ => None,
        }
    }
}

impl From<ArrayError> for FluxError {
    fn from(e: ArrayError) -> Self {
        Self::Shape(e)
    }
}
