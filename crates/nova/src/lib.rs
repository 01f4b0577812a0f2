//! Nova: time advance of compressible hydrodynamics on adaptive meshes.
//!
//! This is the top-level facade crate that re-exports the public API from
//! all Nova sub-crates. Hyperbolic solvers, equations of state, linear
//! solvers, and reaction networks are supplied by the caller through the
//! traits in [`types`].
//!
//! # Quick start
//!
//! ```rust
//! use std::sync::Arc;
//!
//! use nova::prelude::*;
//! use nova_test_utils::{periodic_geometry, uniform_state, FlowSpec, IdealGasEos, RusanovSolver};
//!
//! let schema = Arc::new(StateSchema::builder().ndim(1).build().unwrap());
//! let geom = periodic_geometry(1, 16);
//! let state = uniform_state(&schema, &geom, 2, FlowSpec::default());
//! let services = AdvanceServices::new(Arc::new(RusanovSolver), Arc::new(IdealGasEos::new(1.4)));
//! let level = AdvanceController::new(
//!     schema,
//!     geom,
//!     state,
//!     0.0,
//!     Vec::new(),
//!     services,
//!     AdvanceConfig::default(),
//! )
//! .unwrap();
//!
//! let mut hierarchy = AmrHierarchy::new(vec![level], 2).unwrap();
//! let dt = hierarchy.estimate_dt().unwrap();
//! let taken = hierarchy.advance(dt).unwrap();
//! assert_eq!(hierarchy.time(), taken);
//! ```
//!
//! # Modules
//!
//! | Module | Sub-crate | Contents |
//! |--------|-----------|----------|
//! | [`types`] | `nova-core` | IDs, schema, boxes, arrays, errors, collaborator traits |
//! | [`grid`] | `nova-grid` | Ghost fill, average-down, nesting checks |
//! | [`state`] | `nova-state` | Snapshots, repair, primitive conversion |
//! | [`source`] | `nova-source` | Source-term trait, plan, engine |
//! | [`sources`] | `nova-sources` | The built-in source terms |
//! | [`flux`] | `nova-flux` | Flux accumulation and reflux registers |
//! | [`engine`] | `nova-engine` | Level controller, retries, hierarchy |

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

/// Core types, traits, and IDs (`nova-core`).
///
/// The collaborator traits ([`types::HyperbolicSolver`], [`types::Eos`],
/// [`types::PoissonSolver`], [`types::ReactionNetwork`], ...) live here.
pub use nova_core as types;

/// Ghost-cell fill and inter-level transfer (`nova-grid`).
pub use nova_grid as grid;

/// Two-time-level snapshots and state repair (`nova-state`).
pub use nova_state as state;

/// Source-term interface and engine (`nova-source`).
///
/// Implement [`source::SourceTerm`] to add a custom term.
pub use nova_source as source;

/// Built-in source terms (`nova-sources`).
///
/// [`sources::assemble_sources`] builds the enabled set from a
/// [`sources::SourcesConfig`].
pub use nova_sources as sources;

/// Conservative flux bookkeeping (`nova-flux`).
pub use nova_flux as flux;

/// Level advance and hierarchy driver (`nova-engine`).
///
/// [`engine::AdvanceController`] for one level,
/// [`engine::AmrHierarchy`] for a subcycled stack.
pub use nova_engine as engine;

/// Common imports for typical Nova usage.
///
/// ```rust
/// use nova::prelude::*;
/// ```
pub mod prelude {
    // Core types and traits
    pub use nova_core::{
        Direction, Eos, GhostFill, GridBox, HyperbolicSolver, LevelGeometry, LevelId,
        PoissonSolver, ReactionNetwork, SourceKind, StateArray, StateSchema, TimeLevel,
    };

    // Errors
    pub use nova_core::{FillError, HydroError, SourceError};
    pub use nova_engine::{AdvanceError, ConfigError};

    // Grid
    pub use nova_grid::{CoarseFineFill, PhysicalBoundaryFill};

    // State
    pub use nova_state::{RepairConfig, RepairReport, StateSnapshot};

    // Sources
    pub use nova_source::{SourceOrder, SourceTerm};
    pub use nova_sources::{assemble_sources, SourceServices, SourcesConfig};

    // Engine
    pub use nova_engine::{
        AdvanceConfig, AdvanceController, AdvanceMetrics, AdvanceServices, AmrHierarchy,
        ButcherTableau, DtEstimate, IntegratorConfig, LevelLinks, RetryConfig, StepOutcome,
    };
}
