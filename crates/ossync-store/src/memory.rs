use std::collections::BTreeMap;
use std::ops::Bound;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::RwLock;

use async_trait::async_trait;
use bytes::Bytes;
use futures_util::stream;
use futures_util::StreamExt;
use ossync_crypto::ContentHasher;
use ossync_protocol::{
    sniff_content_type, CommonPrefix, ListBucketResult, ListQuery, ObjectSummary, RemoteError,
};
use ossync_types::Digest;

use crate::error::{StoreError, StoreResult};
use crate::object::{ObjectBody, ObjectHead};
use crate::traits::ObjectStore;

#[derive(Clone, Debug)]
struct StoredObject {
    data: Bytes,
    digest: Digest,
    content_type: &'static str,
}

/// In-memory object store with the listing semantics of the real service.
///
/// Intended for tests. Objects live in a `BTreeMap` behind a `RwLock`, so
/// listings come back in key order like the remote store's. Page size and a
/// listing failure can be forced to exercise pagination and partial results.
pub struct InMemoryObjectStore {
    objects: RwLock<BTreeMap<String, StoredObject>>,
    page_size: Option<u32>,
    fail_listing_after: Option<usize>,
    pages_served: AtomicUsize,
    puts: AtomicUsize,
    heads: AtomicUsize,
}

impl InMemoryObjectStore {
    /// Create a new empty in-memory store.
    pub fn new() -> Self {
        Self {
            objects: RwLock::new(BTreeMap::new()),
            page_size: None,
            fail_listing_after: None,
            pages_served: AtomicUsize::new(0),
            puts: AtomicUsize::new(0),
            heads: AtomicUsize::new(0),
        }
    }

    /// Serve at most `size` entries per listing page.
    pub fn with_page_size(mut self, size: u32) -> Self {
        self.page_size = Some(size.max(1));
        self
    }

    /// Answer listing requests with a server error once `pages` pages have
    /// been served.
    pub fn failing_listing_after(mut self, pages: usize) -> Self {
        self.fail_listing_after = Some(pages);
        self
    }

    /// Store an object directly, bypassing digest checks.
    pub fn insert(&self, key: &str, data: impl Into<Bytes>) {
        let data = data.into();
        let object = StoredObject {
            digest: ContentHasher::digest(&data),
            content_type: sniff_content_type(&data),
            data,
        };
        self.objects
            .write()
            .expect("lock poisoned")
            .insert(store_key(key).to_string(), object);
    }

    /// Contents of an object, if present.
    pub fn object(&self, key: &str) -> Option<Bytes> {
        self.objects
            .read()
            .expect("lock poisoned")
            .get(store_key(key))
            .map(|o| o.data.clone())
    }

    /// Number of objects currently stored.
    pub fn len(&self) -> usize {
        self.objects.read().expect("lock poisoned").len()
    }

    /// Returns `true` if the store is empty.
    pub fn is_empty(&self) -> bool {
        self.objects.read().expect("lock poisoned").is_empty()
    }

    /// Listing pages served so far.
    pub fn pages_served(&self) -> usize {
        self.pages_served.load(Ordering::SeqCst)
    }

    /// Successful PUT requests so far.
    pub fn put_count(&self) -> usize {
        self.puts.load(Ordering::SeqCst)
    }

    /// HEAD requests so far.
    pub fn head_count(&self) -> usize {
        self.heads.load(Ordering::SeqCst)
    }
}

impl Default for InMemoryObjectStore {
    fn default() -> Self {
        Self::new()
    }
}

fn store_key(key: &str) -> &str {
    key.trim_start_matches('/')
}

fn no_such_key() -> StoreError {
    StoreError::Remote(RemoteError {
        status: 404,
        code: Some("NoSuchKey".into()),
        message: "The specified key does not exist.".into(),
        request_id: None,
    })
}

#[async_trait]
impl ObjectStore for InMemoryObjectStore {
    async fn list_page(&self, query: &ListQuery) -> StoreResult<ListBucketResult> {
        let served = self.pages_served.fetch_add(1, Ordering::SeqCst);
        if self.fail_listing_after.is_some_and(|limit| served >= limit) {
            return Err(StoreError::Remote(RemoteError {
                status: 500,
                code: Some("InternalError".into()),
                message: "We encountered an internal error. Please try again.".into(),
                request_id: None,
            }));
        }

        let max_keys = self
            .page_size
            .map_or(query.max_keys, |size| size.min(query.max_keys)) as usize;
        let lower = match &query.marker {
            Some(marker) => Bound::Excluded(marker.clone()),
            None => Bound::Unbounded,
        };

        let map = self.objects.read().expect("lock poisoned");
        let mut page = ListBucketResult {
            prefix: query.prefix.clone(),
            marker: query.marker.clone().unwrap_or_default(),
            max_keys: max_keys as u32,
            delimiter: if query.delimited { "/".into() } else { String::new() },
            ..ListBucketResult::default()
        };
        let mut last = None;
        let mut entries = 0;

        for (key, object) in map.range((lower, Bound::Unbounded)) {
            if !key.starts_with(&query.prefix) {
                // keys sharing the prefix are contiguous
                if key.as_str() > query.prefix.as_str() {
                    break;
                }
                continue;
            }
            // a marker naming a common prefix skips everything below it
            if query.delimited
                && query
                    .marker
                    .as_deref()
                    .is_some_and(|m| m.ends_with('/') && key.starts_with(m))
            {
                continue;
            }
            let common = query.delimited.then(|| {
                key[query.prefix.len()..]
                    .find('/')
                    .map(|i| key[..query.prefix.len() + i + 1].to_string())
            });
            if let Some(Some(dir)) = &common {
                if page.common_prefixes.last().is_some_and(|p| &p.prefix == dir) {
                    continue;
                }
                if entries == max_keys {
                    page.is_truncated = true;
                    break;
                }
                page.common_prefixes.push(CommonPrefix { prefix: dir.clone() });
                last = Some(dir.clone());
            } else {
                if entries == max_keys {
                    page.is_truncated = true;
                    break;
                }
                page.contents.push(ObjectSummary {
                    key: key.clone(),
                    last_modified: String::new(),
                    etag: format!("\"{}\"", object.digest.to_hex().to_uppercase()),
                    size: object.data.len() as u64,
                });
                last = Some(key.clone());
            }
            entries += 1;
        }

        if page.is_truncated {
            page.next_marker = last.unwrap_or_default();
        }
        Ok(page)
    }

    async fn head(&self, key: &str) -> StoreResult<Option<ObjectHead>> {
        self.heads.fetch_add(1, Ordering::SeqCst);
        let map = self.objects.read().expect("lock poisoned");
        Ok(map.get(store_key(key)).map(|o| ObjectHead {
            digest: Some(o.digest),
            size: Some(o.data.len() as u64),
            content_type: Some(o.content_type.to_string()),
        }))
    }

    async fn put(&self, key: &str, body: Bytes, content_md5: &Digest) -> StoreResult<()> {
        let digest = ContentHasher::digest(&body);
        if &digest != content_md5 {
            return Err(StoreError::Remote(RemoteError {
                status: 400,
                code: Some("InvalidDigest".into()),
                message: "The Content-MD5 you specified was invalid.".into(),
                request_id: None,
            }));
        }
        let object = StoredObject {
            content_type: sniff_content_type(&body),
            data: body,
            digest,
        };
        self.objects
            .write()
            .expect("lock poisoned")
            .insert(store_key(key).to_string(), object);
        self.puts.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn get(&self, key: &str) -> StoreResult<ObjectBody> {
        let object = self
            .objects
            .read()
            .expect("lock poisoned")
            .get(store_key(key))
            .cloned()
            .ok_or_else(no_such_key)?;
        Ok(ObjectBody {
            content_type: Some(object.content_type.to_string()),
            content_length: Some(object.data.len() as u64),
            stream: stream::iter([Ok(object.data)]).boxed(),
        })
    }

    fn presigned_url(&self, key: &str, expires: i64) -> StoreResult<String> {
        Ok(format!("memory://bucket/{}?Expires={expires}", store_key(key)))
    }
}

impl std::fmt::Debug for InMemoryObjectStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let count = self.len();
        f.debug_struct("InMemoryObjectStore")
            .field("object_count", &count)
            .field("page_size", &self.page_size)
            .finish()
    }
}
