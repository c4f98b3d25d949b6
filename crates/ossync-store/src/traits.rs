use async_trait::async_trait;
use bytes::Bytes;
use ossync_protocol::{ListBucketResult, ListQuery};
use ossync_types::Digest;

use crate::error::StoreResult;
use crate::object::{ObjectBody, ObjectHead};

/// A bucket-scoped flat-namespace object store.
///
/// Implementations must be safe to share between worker tasks. Object keys
/// are slash-prefixed. No method retries.
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Fetch one page of a listing.
    async fn list_page(&self, query: &ListQuery) -> StoreResult<ListBucketResult>;

    /// Object metadata, or `Ok(None)` when the key does not exist.
    async fn head(&self, key: &str) -> StoreResult<Option<ObjectHead>>;

    /// Store `body` under `key`. `content_md5` is sent for server-side
    /// integrity checking.
    async fn put(&self, key: &str, body: Bytes, content_md5: &Digest) -> StoreResult<()>;

    /// Start downloading an object.
    async fn get(&self, key: &str) -> StoreResult<ObjectBody>;

    /// A URL granting anonymous GET access to `key` until `expires`
    /// (Unix seconds).
    fn presigned_url(&self, key: &str, expires: i64) -> StoreResult<String>;
}
