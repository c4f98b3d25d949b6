use ossync_crypto::CryptoError;
use ossync_protocol::{ProtocolError, RemoteError};

/// Errors from object store operations.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// The request never produced a response, or the body broke off.
    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// The store answered with a non-200 status.
    #[error("{0}")]
    Remote(#[from] RemoteError),

    /// A response body could not be decoded.
    #[error("protocol error: {0}")]
    Protocol(#[from] ProtocolError),

    /// The request could not be signed.
    #[error("signing error: {0}")]
    Signing(#[from] CryptoError),

    /// The endpoint or key does not form a valid URL.
    #[error("invalid url {url}: {reason}")]
    InvalidUrl { url: String, reason: String },
}

impl StoreError {
    /// HTTP status of a remote rejection, if this is one.
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Remote(e) => Some(e.status),
            Self::Transport(e) => e.status().map(|s| s.as_u16()),
            _ => None,
        }
    }
}

/// Result alias for store operations.
pub type StoreResult<T> = Result<T, StoreError>;
