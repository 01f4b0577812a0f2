//! Test utilities and mock collaborators for Nova development.
//!
//! Provides mock implementations of the collaborator traits in
//! `nova_core::traits` ([`IdealGasEos`], [`RusanovSolver`],
//! [`UniformFieldSolver`], [`CentralDifferenceDiffusion`], reaction
//! networks) and seeded state fixtures.

#![forbid(unsafe_code)]
#![allow(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]

pub mod eos;
pub mod fixtures;
pub mod hydro;
pub mod reactions;
pub mod solvers;

pub use eos::IdealGasEos;
pub use fixtures::{
    outflow_geometry, periodic_geometry, perturbed_state, uniform_state, FlowSpec,
};
pub use hydro::{FailingHydro, FixedWaveSpeedHydro, RusanovSolver};
pub use reactions::{ConstantReleaseNetwork, FailingNetwork};
pub use solvers::{
    CentralDifferenceDiffusion, NonConvergingDiffusion, NonConvergingPoisson, UniformFieldSolver,
};
