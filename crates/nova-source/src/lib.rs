//! Source terms for the level advance.
//!
//! A [`SourceTerm`] computes a rate for the conserved state at the old
//! or new time of an attempt. The [`SourceTermEngine`] owns the active
//! terms, validates their ordering constraints once via
//! [`validate_sources`], constructs them in plan order, and combines
//! old- and new-time contributions according to each component's
//! [`Centering`]. [`apply`] adds rates and time-centered corrections to
//! a state.

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

pub mod apply;
pub mod context;
pub mod diagnostics;
pub mod engine;
pub mod plan;
pub mod set;
pub mod source;

pub use apply::{add_source, apply_correction, apply_source_to_state, time_center};
pub use context::SourceContext;
pub use diagnostics::{evaluate_source_change, log_source_change, SourceChange};
pub use engine::{SourceRequest, SourceTermEngine};
pub use plan::{validate_sources, PlanError, SourceOrder, SourcePlan};
pub use set::{SourceContribution, SourceTermSet};
pub use source::{Centering, SourceTerm};
