//! Error types shared across the Nova workspace.
//!
//! Organized by subsystem: schema and geometry setup, array shape checks,
//! collaborator failures (solvers, EOS, reactions, hydro, ghost fill), and
//! source-term construction.

use std::error::Error;
use std::fmt;

use crate::geometry::{GridBox, IntVect};
use crate::id::SourceKind;

/// Errors from [`StateSchemaBuilder::build`](crate::StateSchemaBuilder::build).
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SchemaError {
    /// Dimensionality outside 1..=3.
    InvalidDimension {
        /// The rejected value.
        ndim: usize,
    },
    /// Hybrid momentum is only defined in three dimensions.
    HybridRequiresThreeDimensions {
        /// The configured dimensionality.
        ndim: usize,
    },
    /// Two species share a name.
    DuplicateSpecies {
        /// The repeated name.
        name: String,
    },
    /// A species name is empty.
    EmptySpeciesName {
        /// Position of the offending species.
        index: usize,
    },
}

impl fmt::Display for SchemaError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidDimension { ndim } => {
                write!(f, "ndim must be 1, 2 or 3, got {ndim}")
            }
            Self::HybridRequiresThreeDimensions { ndim } => {
                write!(f, "hybrid momentum requires ndim = 3, got {ndim}")
            }
            Self::DuplicateSpecies { name } => write!(f, "duplicate species '{name}'"),
            Self::EmptySpeciesName { index } => write!(f, "species {index} has an empty name"),
        }
    }
}

impl Error for SchemaError {}

/// Errors from [`LevelGeometry`](crate::LevelGeometry) construction.
#[derive(Clone, Debug, PartialEq)]
pub enum GeometryError {
    /// Domain or patch box is empty.
    EmptyBox,
    /// Domain and patch disagree on dimensionality.
    DimensionMismatch {
        /// Domain dimensionality.
        expected: usize,
        /// Patch dimensionality.
        found: usize,
    },
    /// A box is not contained where it must be.
    NotContained {
        /// The box that should be inside.
        inner: GridBox,
        /// The enclosing box.
        outer: GridBox,
    },
    /// Cell spacing is not finite and positive.
    InvalidSpacing {
        /// The rejected spacing.
        value: f64,
    },
    /// Refinement ratio below 2.
    InvalidRatio {
        /// The rejected ratio.
        ratio: i64,
    },
    /// Only one side of a direction is periodic.
    HalfPeriodic {
        /// Direction index.
        dir: usize,
    },
}

impl fmt::Display for GeometryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::EmptyBox => write!(f, "box is empty"),
            Self::DimensionMismatch { expected, found } => {
                write!(f, "dimension mismatch: expected {expected}, found {found}")
            }
            Self::NotContained { inner, outer } => write!(
                f,
                "box {:?}..{:?} is not contained in {:?}..{:?}",
                inner.lo(),
                inner.hi(),
                outer.lo(),
                outer.hi()
            ),
            Self::InvalidSpacing { value } => {
                write!(f, "cell spacing must be finite and positive, got {value}")
            }
            Self::InvalidRatio { ratio } => {
                write!(f, "refinement ratio must be at least 2, got {ratio}")
            }
            Self::HalfPeriodic { dir } => {
                write!(f, "direction {dir} is periodic on one side only")
            }
        }
    }
}

impl Error for GeometryError {}

/// Array shape errors.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ArrayError {
    /// Two arrays combined element-wise have different shapes.
    ShapeMismatch {
        /// Cell count of the receiving array.
        expected_cells: usize,
        /// Component count of the receiving array.
        expected_ncomp: usize,
        /// Cell count of the other array.
        found_cells: usize,
        /// Component count of the other array.
        found_ncomp: usize,
    },
}

impl fmt::Display for ArrayError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ShapeMismatch {
                expected_cells,
                expected_ncomp,
                found_cells,
                found_ncomp,
            } => write!(
                f,
                "shape mismatch: expected {expected_cells} cells x {expected_ncomp} comps, \
                 found {found_cells} x {found_ncomp}"
            ),
        }
    }
}

impl Error for ArrayError {}

/// Failures reported by a linear-solve collaborator.
#[derive(Clone, Debug, PartialEq)]
pub enum SolveError {
    /// The solver stopped without reaching its tolerance.
    NotConverged {
        /// Which solve failed.
        solver: String,
        /// Final residual norm.
        residual: f64,
        /// Iterations performed.
        iterations: usize,
    },
    /// The solver rejected its input.
    InvalidInput {
        /// Description of the problem.
        reason: String,
    },
}

impl fmt::Display for SolveError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotConverged {
                solver,
                residual,
                iterations,
            } => write!(
                f,
                "{solver} solve did not converge after {iterations} iterations \
                 (residual {residual:e})"
            ),
            Self::InvalidInput { reason } => write!(f, "invalid solver input: {reason}"),
        }
    }
}

impl Error for SolveError {}

/// Failures reported by an equation of state.
#[derive(Clone, Debug, PartialEq)]
pub enum EosError {
    /// Density, energy, or temperature outside the EOS domain.
    UnphysicalInput {
        /// Description of the problem.
        reason: String,
    },
}

impl fmt::Display for EosError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnphysicalInput { reason } => write!(f, "unphysical EOS input: {reason}"),
        }
    }
}

impl Error for EosError {}

/// Failures reported by a reaction network.
#[derive(Clone, Debug, PartialEq)]
pub enum ReactionError {
    /// The integrator failed to complete the burn.
    BurnFailed {
        /// Description of the failure.
        reason: String,
    },
}

impl fmt::Display for ReactionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::BurnFailed { reason } => write!(f, "burn failed: {reason}"),
        }
    }
}

impl Error for ReactionError {}

/// Failures reported by the hyperbolic-flux collaborator.
#[derive(Clone, Debug, PartialEq)]
pub enum HydroError {
    /// The flux computation failed.
    ExecutionFailed {
        /// Description of the failure.
        reason: String,
    },
    /// A computed flux is NaN or infinite.
    NonFinite {
        /// Face index of the first bad flux.
        face: IntVect,
        /// Normal direction of that face.
        dir: usize,
    },
}

impl fmt::Display for HydroError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ExecutionFailed { reason } => write!(f, "hydro failed: {reason}"),
            Self::NonFinite { face, dir } => {
                write!(f, "non-finite flux at face {face:?} (dir {dir})")
            }
        }
    }
}

impl Error for HydroError {}

/// Failures reported by a ghost-fill collaborator.
#[derive(Clone, Debug, PartialEq)]
pub enum FillError {
    /// The patch could not be filled.
    Failed {
        /// Description of the failure.
        reason: String,
    },
    /// A time outside the available coarse interval was requested.
    TimeOutOfRange {
        /// Requested time.
        time: f64,
        /// Start of the available interval.
        t_old: f64,
        /// End of the available interval.
        t_new: f64,
    },
}

impl fmt::Display for FillError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Failed { reason } => write!(f, "ghost fill failed: {reason}"),
            Self::TimeOutOfRange { time, t_old, t_new } => write!(
                f,
                "ghost fill time {time} outside coarse interval [{t_old}, {t_new}]"
            ),
        }
    }
}

impl Error for FillError {}

/// Errors from constructing or applying a source term.
#[derive(Clone, Debug, PartialEq)]
pub enum SourceError {
    /// A linear solve the source depends on failed or did not converge.
    SolveFailed {
        /// The source that requested the solve.
        kind: SourceKind,
        /// The solver's report.
        error: SolveError,
    },
    /// The source computation failed for another reason.
    ExecutionFailed {
        /// The failing source.
        kind: SourceKind,
        /// Description of the failure.
        reason: String,
    },
    /// The source produced a NaN or infinite value.
    NonFinite {
        /// The offending source.
        kind: SourceKind,
        /// First bad cell.
        cell: IntVect,
    },
    /// The EOS rejected a state the source needed to evaluate.
    Eos {
        /// The source that called the EOS.
        kind: SourceKind,
        /// The EOS report.
        error: EosError,
    },
    /// Source and state arrays disagree in shape.
    Shape(ArrayError),
}

impl SourceError {
    /// The source kind involved, if any.
    pub fn kind(&self) -> Option<SourceKind> {
        match self {
            Self::SolveFailed { kind, .. }
            | Self::ExecutionFailed { kind, .. }
            | Self::NonFinite { kind, .. }
            | Self::Eos { kind, .. } => Some(*kind),
            Self::Shape(_) => None,
        }
    }

    /// Whether this is a solver non-convergence, which the retry policy
    /// may treat as retryable.
    pub fn is_solve_failure(&self) -> bool {
        matches!(self, Self::SolveFailed { .. })
    }
}

impl fmt::Display for SourceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::SolveFailed { kind, error } => write!(f, "source '{kind}': {error}"),
            Self::ExecutionFailed { kind, reason } => {
                write!(f, "source '{kind}' failed: {reason}")
            }
            Self::NonFinite { kind, cell } => {
                write!(f, "source '{kind}' produced a non-finite value at {cell:?}")
            }
            Self::Eos { kind, error } => write!(f, "source '{kind}': {error}"),
            Self::Shape(e) => write!(f, "source shape: {e}"),
        }
    }
}

impl Error for SourceError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::SolveFailed { error, .. } => Some(error),
            Self::Eos { error, .. } => Some(error),
            Self::Shape(e) => Some(e),
            _ => None,
        }
    }
}

impl From<ArrayError> for SourceError {
    fn from(e: ArrayError) -> Self {
        Self::Shape(e)
    }
}
