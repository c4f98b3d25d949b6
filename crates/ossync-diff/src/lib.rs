//! Diff engine for ossync.
//!
//! Compares two enumerated sides (local walk, remote listing) by relative
//! name, size and optionally content digest, producing the records present
//! on one side only.
//!
//! # Key Types
//!
//! - [`diff`] -- one direction: left records missing from the right
//! - [`Side`] -- a side's records plus its name-normalization offset
//! - [`DiffReport`] / [`DiffStatus`] -- both directions and the exit status

pub mod engine;
pub mod error;
pub mod report;

pub use engine::{diff, Side};
pub use error::{DiffError, DiffResult};
pub use report::{DiffReport, DiffStatus};
