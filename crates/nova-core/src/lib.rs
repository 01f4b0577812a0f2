//! Core types and traits for Nova level advances.
//!
//! This is the leaf crate with no internal dependencies. It defines the
//! conserved-state schema, index boxes and level geometry, cell and face
//! arrays, error types, and the collaborator traits through which a level
//! advance reaches solvers, the equation of state, and ghost fill.

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

pub mod array;
pub mod error;
pub mod geometry;
pub mod id;
pub mod primitive;
pub mod schema;
pub mod traits;

pub use array::{FaceArray, FaceFluxes, StateArray};
pub use error::{
    ArrayError, EosError, FillError, GeometryError, HydroError, ReactionError, SchemaError,
    SolveError, SourceError,
};
pub use geometry::{BoundaryKind, GridBox, IntVect, LevelGeometry};
pub use id::{Direction, LevelId, Side, SourceKind, TimeLevel};
pub use primitive::PrimitiveLayout;
pub use schema::{StateSchema, StateSchemaBuilder};
pub use traits::{
    BcCode, BurnZone, DiffusedQuantity, DiffusionRequest, DiffusionSolution, DiffusionSolver, Eos,
    EosInput, EosState, ExternalForcing, GhostFill, HydroOutcome, HydroRequest, HyperbolicSolver,
    PoissonRequest, PoissonSolver, PotentialSolution, ReactionNetwork, SolveMode,
};
