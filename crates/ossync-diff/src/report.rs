use serde::Serialize;

use ossync_types::ObjectRecord;

use crate::engine::{diff, Side};
use crate::error::DiffResult;

/// Outcome of a two-sided comparison, as a process exit status.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DiffStatus {
    Identical,
    LocalOnly,
    RemoteOnly,
    Both,
    /// An enumeration failed; nothing was compared.
    Incomplete,
}

impl DiffStatus {
    pub fn exit_code(self) -> i32 {
        match self {
            Self::Identical => 0,
            Self::LocalOnly => 1,
            Self::RemoteOnly => 2,
            Self::Both => 3,
            Self::Incomplete => 4,
        }
    }
}

/// Both directions of a comparison.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct DiffReport {
    pub local_only: Vec<ObjectRecord>,
    pub remote_only: Vec<ObjectRecord>,
}

impl DiffReport {
    /// Compare both directions in the calling thread. Both sides must be
    /// complete.
    pub fn compute(local: Side<'_>, remote: Side<'_>, check_digest: bool) -> DiffResult<Self> {
        local.ensure_complete()?;
        remote.ensure_complete()?;
        Ok(Self {
            local_only: diff(local.records, remote.records, local.offset, remote.offset, check_digest),
            remote_only: diff(remote.records, local.records, remote.offset, local.offset, check_digest),
        })
    }

    pub fn status(&self) -> DiffStatus {
        match (self.local_only.is_empty(), self.remote_only.is_empty()) {
            (true, true) => DiffStatus::Identical,
            (false, true) => DiffStatus::LocalOnly,
            (true, false) => DiffStatus::RemoteOnly,
            (false, false) => DiffStatus::Both,
        }
    }
}
