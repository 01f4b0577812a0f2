//! Concrete source terms.
//!
//! One [`SourceTerm`](nova_source::SourceTerm) per
//! [`SourceKind`](nova_core::SourceKind): external forcing, thermodynamic
//! relaxation, sponge damping, diffusion, hybrid momentum, self-gravity
//! and rotation. [`assemble_sources`] builds the enabled set from a
//! [`SourcesConfig`] and the injected collaborators in
//! [`SourceServices`].

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

pub mod assemble;
pub mod config;
pub mod diffusion;
pub mod error;
pub mod ext;
mod fields;
pub mod gravity;
pub mod hybrid;
pub mod rotation;
pub mod sponge;
pub mod thermo;

pub use assemble::{assemble_sources, SourceServices};
pub use config::{
    DiffusionConfig, GravityConfig, GravityEnergy, GravityMode, HybridConfig, RotationConfig,
    SourcesConfig, SpongeConfig, ThermoConfig,
};
pub use diffusion::DiffusionSource;
pub use error::AssembleError;
pub use ext::ExternalSource;
pub use gravity::{GravityService, GravitySource};
pub use hybrid::{hybrid_to_linear, linear_to_hybrid, HybridMomentumSource};
pub use rotation::RotationSource;
pub use sponge::SpongeSource;
pub use thermo::ThermoSource;
