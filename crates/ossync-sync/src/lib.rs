//! Synchronization engine for ossync.
//!
//! Reconciles a local tree with a remote prefix: enumerate both sides,
//! derive remote keys from local paths, and move objects through a bounded
//! pool of workers.
//!
//! # Building blocks
//!
//! - [`JobQueue`] -- one producer, `concurrency` workers, cooperative
//!   cancellation
//! - [`join2`] / [`join_all`] -- fork-join over spawned tasks
//! - [`RemoteLister`] -- paginated listing with partial results on failure
//! - [`walk`] / [`scan`] -- local enumeration with optional MD5 stage
//! - [`mapping`] -- local path to remote key rules and argument parsing
//! - [`Transfer`] -- upload and download drivers
//! - [`compare`] -- two-sided diff of a local root and a remote prefix

pub mod compare;
pub mod error;
pub mod fork_join;
pub mod lister;
pub mod mapping;
pub mod options;
pub mod queue;
pub mod stats;
pub mod transfer;
pub mod walker;

#[cfg(test)]
mod testutil;

pub use compare::{compare, Comparison, DiffPlan};
pub use error::{SyncError, SyncResult};
pub use fork_join::{join2, join_all, run_blocking};
pub use lister::{ListError, Listing, RemoteLister};
pub use options::{default_concurrency, RunOptions, MAX_CONCURRENCY};
pub use queue::{JobQueue, JobSender};
pub use stats::{human_bytes, human_duration, TransferStats};
pub use transfer::{DownloadJob, Transfer, TransferEvent, UploadJob, UploadOutcome};
pub use walker::{scan, walk, LocalScan, Walk};
