//! Level state and its repair invariants.
//!
//! [`StateSnapshot`] holds the old- and new-time conserved state of a
//! level. [`RepairPolicy`] restores the density floor, species sum, and
//! internal-energy consistency and reports what it touched. [`convert`]
//! builds primitive variables and refreshes temperature through the EOS.
//! Per-cell kernels run in parallel over cell records.

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

pub mod config;
pub mod convert;
pub mod error;
pub mod repair;
pub mod snapshot;

pub use config::RepairConfig;
pub use convert::{compute_temperature, cons_to_prim, max_signal_rate};
pub use error::StateError;
pub use repair::{kinetic_energy, RepairPolicy, RepairReport};
pub use snapshot::StateSnapshot;
