//! The error surfaced by a level advance.

use std::error::Error;
use std::fmt;

use nova_core::{ArrayError, FillError, HydroError, LevelId, SourceError};
use nova_flux::FluxError;
use nova_grid::GridError;
use nova_state::StateError;

/// Errors from [`AdvanceController::advance`](crate::AdvanceController::advance)
/// and the hierarchy driver.
///
/// Step violations never appear here: the retry manager handles them.
/// What does appear stops the run; the level is left at its pre-step
/// state.
#[derive(Debug, PartialEq)]
pub enum AdvanceError {
    /// Retry and sub-step budgets are exhausted, or a hard violation
    /// occurred with retry disabled.
    Fatal {
        /// Level that failed.
        level: LevelId,
        /// What the last attempt violated.
        reason: String,
    },
    /// A gravity or diffusion solve did not converge and solve failures
    /// are not retryable.
    SolveFailed(SourceError),
    /// The proposed timestep is non-finite or non-positive.
    InvalidDt {
        /// The rejected value.
        dt: f64,
    },
    /// The hyperbolic solver failed.
    Hydro(HydroError),
    /// A source term failed for a reason other than non-convergence.
    Source(SourceError),
    /// Flux staging or reflux failed.
    Flux(FluxError),
    /// A ghost fill failed.
    Fill(FillError),
    /// Primitive conversion or an EOS refresh failed.
    State(StateError),
    /// An inter-level transfer failed.
    Grid(GridError),
    /// Arrays disagree in shape.
    Shape(ArrayError),
}

impl fmt::Display for AdvanceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Fatal { level, reason } => write!(f, "level {level} advance failed: {reason}"),
            Self::SolveFailed(e) => write!(f, "solve failed: {e}"),
            Self::InvalidDt { dt } => write!(f, "invalid timestep {dt}"),
            Self::Hydro(e) => write!(f, "hydro: {e}"),
            Self::Source(e) => write!(f, "source: {e}"),
            Self::Flux(e) => write!(f, "flux: {e}"),
            Self::Fill(e) => write!(f, "ghost fill: {e}"),
            Self::State(e) => write!(f, "state: {e}"),
            Self::Grid(e) => write!(f, "grid: {e}"),
            Self::Shape(e) => write!(f, "shape: {e}"),
        }
    }
}

impl Error for AdvanceError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::SolveFailed(e) | Self::Source(e) => Some(e),
            Self::Hydro(e) => Some(e),
            Self::Flux(e) => Some(e),
            Self::Fill(e) => Some(e),
            Self::State(e) => Some(e),
            Self::Grid(e) => Some(e),
            Self::Shape(e) => Some(e),
            Self::Fatal { .. } | Self::InvalidDt { .. } => None,
        }
    }
}

impl From<SourceError> for AdvanceError {
    fn from(e: SourceError) -> Self {
        if e.is_solve_failure() {
            Self::SolveFailed(e)
        } else {
            Self::Source(e)
        }
    }
}

impl From<HydroError> for AdvanceError {
    fn from(e: HydroError) -> Self {
        Self::Hydro(e)
    }
}

impl From<FluxError> for AdvanceError {
    fn from(e: FluxError) -> Self {
        Self::Flux(e)
    }
}

impl From<FillError> for AdvanceError {
    fn from(e: FillError) -> Self {
        Self::Fill(e)
    }
}

impl From<StateError> for AdvanceError {
    fn from(e: StateError) -> Self {
        Self::State(e)
    }
}

impl From<GridError> for AdvanceError {
    fn from(e: GridError) -> Self {
        Self::Grid(e)
    }
}

impl From<ArrayError> for AdvanceError {
    fn from(e: ArrayError) -> Self {
        Self::Shape(e)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use nova_core::{SolveError, SourceKind};

    #[test]
    fn solve_failures_are_distinguished() {
        let solve = SourceError::SolveFailed {
            kind: SourceKind::Gravity,
            error: SolveError::NotConverged {
                solver: "poisson".to_string(),
                residual: 1.0,
                iterations: 10,
            },
        };
        assert!(matches!(
            AdvanceError::from(solve),
            AdvanceError::SolveFailed(_)
        ));
        let other = SourceError::ExecutionFailed {
            kind: SourceKind::Sponge,
            reason: "boom".to_string(),
        };
        assert!(matches!(AdvanceError::from(other), AdvanceError::Source(_)));
    }

    #[test]
    fn fatal_names_the_level() {
        let e = AdvanceError::Fatal {
            level: LevelId(2),
            reason: "out of sub-steps".to_string(),
        };
        assert_eq!(e.to_string(), "level 2 advance failed: out of sub-steps");
        assert!(e.source().is_none());
    }
}
