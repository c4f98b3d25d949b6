use thiserror::Error;

#[derive(Debug, Error)]
pub enum ProtocolError {
    #[error("malformed {document} document: {reason}")]
    Deserialization {
        document: &'static str,
        reason: String,
    },

    #[error("response body is not UTF-8: {0}")]
    Encoding(#[from] std::str::Utf8Error),
}

pub type ProtocolResult<T> = Result<T, ProtocolError>;
