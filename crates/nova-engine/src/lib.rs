//! Time advance of compressible hydrodynamics on refinement levels.
//!
//! [`AdvanceController`] advances one level: hyperbolic fluxes from an
//! injected solver, time-centered source terms, optional Strang-split
//! reactions, and state repair, all under a [`RetryManager`] that rolls
//! back and shrinks or splits steps whose diagnostics are unacceptable.
//! Either a single stage or a method-of-lines Runge-Kutta scheme
//! ([`ButcherTableau`]) integrates the hyperbolic part.
//!
//! [`AmrHierarchy`] drives a stack of controllers with subcycling in
//! time, reflux, and average-down, keeping the composite solution
//! conservative.

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

pub mod config;
pub mod controller;
pub mod error;
pub mod hierarchy;
mod kernels;
pub mod metrics;
pub mod retry;

pub use config::{AdvanceConfig, ButcherTableau, ConfigError, IntegratorConfig, RetryConfig};
pub use controller::{
    AdvanceController, AdvanceServices, DtEstimate, DtLimiter, LevelLinks, StepOutcome,
};
pub use error::AdvanceError;
pub use hierarchy::AmrHierarchy;
pub use metrics::AdvanceMetrics;
pub use retry::{
    AdvanceAttempt, AttemptDiagnostics, AttemptPlan, RetryManager, RetryPhase, RetryState,
    Violation,
};
