//! Ghost fill and inter-level transfers for Nova levels.
//!
//! - [`PhysicalBoundaryFill`]: periodic, outflow, and reflecting domain edges
//! - [`CoarseFineFill`]: fine-level ghosts from the coarser level, linear in time
//! - [`average_down`]: conservative restriction onto the parent level
//! - [`check_nesting`]: alignment and one-cell buffer between adjacent levels

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

pub mod average;
pub mod boundary;
pub mod coarse_fine;
pub mod error;
pub mod nesting;

pub use average::average_down;
pub use boundary::{bc_codes, image, Image, PhysicalBoundaryFill};
pub use coarse_fine::{coarse_index, prolong, CoarseFineFill};
pub use error::GridError;
pub use nesting::check_nesting;
