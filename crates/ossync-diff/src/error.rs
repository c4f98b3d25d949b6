//! Error types for the diff crate.

/// Errors that can occur before a diff is computed.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum DiffError {
    /// One side could not be enumerated completely; diffing it would report
    /// spurious differences.
    #[error("{side} side is incomplete: {failures} unreadable entries")]
    IncompleteSide { side: &'static str, failures: usize },
}

impl DiffError {
    /// Exit status for this failure.
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::IncompleteSide { .. } => crate::report::DiffStatus::Incomplete.exit_code(),
        }
    }
}

/// Convenience alias for diff results.
pub type DiffResult<T> = Result<T, DiffError>;
