//! Error types for state conversion.

use std::error::Error;
use std::fmt;

use nova_core::{EosError, IntVect};

/// Errors from primitive conversion and EOS refreshes.
#[derive(Clone, Debug, PartialEq)]
pub enum StateError {
    /// A cell has non-positive or non-finite density.
    BadDensity {
        /// The offending cell.
        cell: IntVect,
        /// Its density.
        value: f64,
    },
    /// The EOS rejected a cell.
    Eos {
        /// The offending cell.
        cell: IntVect,
        /// The EOS report.
        error: EosError,
    },
}

impl fmt::Display for StateError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::BadDensity { cell, value } => {
                write!(f, "density {value} at {cell:?} is not positive")
            }
            Self::Eos { cell, error } => write!(f, "at {cell:?}: {error}"),
        }
    }
}

impl Error for StateError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Eos { error, .. } => Some(error),
            Self::BadDensity { .. } => None,
        }
    }
}
