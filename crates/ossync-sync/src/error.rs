use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum SyncError {
    #[error(transparent)]
    Store(#[from] ossync_store::StoreError),

    #[error("{}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("walk failed: {0}")]
    Walk(#[from] walkdir::Error),

    /// Bad arguments; the run cannot start.
    #[error("{0}")]
    Configuration(String),

    #[error("operation cancelled")]
    Cancelled,
}

impl SyncError {
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration(message.into())
    }
}

pub type SyncResult<T> = Result<T, SyncError>;
