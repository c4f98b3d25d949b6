use std::fmt;

use bytes::{Bytes, BytesMut};
use futures_util::stream::BoxStream;
use futures_util::StreamExt;
use ossync_types::Digest;

use crate::error::StoreResult;

/// Metadata returned by a HEAD request.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ObjectHead {
    /// The ETag as an MD5 digest. `None` for multipart or otherwise
    /// non-MD5 ETags.
    pub digest: Option<Digest>,
    pub size: Option<u64>,
    pub content_type: Option<String>,
}

/// Body of a GET request, streamed chunk by chunk.
pub struct ObjectBody {
    pub content_type: Option<String>,
    pub content_length: Option<u64>,
    pub stream: BoxStream<'static, StoreResult<Bytes>>,
}

impl ObjectBody {
    /// Buffer the whole body.
    pub async fn collect(mut self) -> StoreResult<Bytes> {
        let mut buf = BytesMut::new();
        while let Some(chunk) = self.stream.next().await {
            buf.extend_from_slice(&chunk?);
        }
        Ok(buf.freeze())
    }
}

impl fmt::Debug for ObjectBody {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ObjectBody")
            .field("content_type", &self.content_type)
            .field("content_length", &self.content_length)
            .finish_non_exhaustive()
    }
}
