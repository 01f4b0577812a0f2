//! Conservative coarse-fine flux bookkeeping.
//!
//! A level stages the time-integrated fluxes of each attempt in a
//! [`FluxAccumulator`]; only accepted attempts are committed into the
//! [`FluxRegister`]s shared with the neighbouring levels. After every fine
//! sub-step has signalled completion, the coarse level refluxes: the
//! coarse cells just outside the fine patch are corrected by the
//! difference between fine and coarse boundary fluxes.

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

pub mod accumulator;
pub mod completion;
pub mod error;
pub mod register;

pub use accumulator::FluxAccumulator;
pub use completion::{CompletionSender, SubcycleComplete};
pub use error::FluxError;
pub use register::FluxRegister;
