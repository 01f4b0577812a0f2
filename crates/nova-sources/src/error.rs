//! Errors raised while assembling the source list.

use nova_core::SourceKind;

use std::error::Error;
use std::fmt;

/// A source kind could not be built from its configuration.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum AssembleError {
    /// A configuration value is out of range.
    InvalidConfig {
        /// The misconfigured kind.
        kind: SourceKind,
        /// Description of the bad field.
        reason: String,
    },
    /// An enabled kind needs a collaborator that was not supplied.
    MissingService {
        /// The enabled kind.
        kind: SourceKind,
        /// The absent collaborator.
        service: &'static str,
    },
}

impl fmt::Display for AssembleError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidConfig { kind, reason } => {
                write!(f, "invalid '{kind}' configuration: {reason}")
            }
            Self::MissingService { kind, service } => {
                write!(f, "source '{kind}' is enabled but no {service} was supplied")
            }
        }
    }
}

impl Error for AssembleError {}
