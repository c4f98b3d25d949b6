use std::sync::Arc;

use ossync_protocol::ListQuery;
use ossync_store::{ObjectStore, StoreError};
use ossync_types::{Digest, DirectoryRecord, ObjectRecord};
use tracing::debug;

use crate::fork_join::join_all;

/// Everything under a prefix.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Listing {
    pub files: Vec<ObjectRecord>,
    /// Common prefixes; only filled by non-recursive listings.
    pub dirs: Vec<DirectoryRecord>,
}

/// A listing that stopped early. `partial` holds the pages received before
/// the failure.
#[derive(Debug, thiserror::Error)]
#[error("listing {prefix:?} failed after {} entries: {source}", .partial.files.len() + .partial.dirs.len())]
pub struct ListError {
    pub prefix: String,
    pub partial: Listing,
    #[source]
    pub source: StoreError,
}

/// Slash-prefixed key with repeated separators collapsed. A trailing
/// separator is kept for directories.
fn record_name(key: &str) -> String {
    let mut name = String::with_capacity(key.len() + 1);
    for part in key.split('/').filter(|p| !p.is_empty()) {
        name.push('/');
        name.push_str(part);
    }
    if name.is_empty() || key.ends_with('/') {
        name.push('/');
    }
    name
}

/// Paginated prefix listing.
#[derive(Clone)]
pub struct RemoteLister {
    store: Arc<dyn ObjectStore>,
}

impl RemoteLister {
    pub fn new(store: Arc<dyn ObjectStore>) -> Self {
        Self { store }
    }

    /// List every object under `prefix`, following continuation markers
    /// until the store reports the listing complete.
    ///
    /// Without `recursive`, keys below the next `/` are folded into
    /// directory records.
    pub async fn list(&self, prefix: &str, recursive: bool) -> Result<Listing, ListError> {
        let mut listing = Listing::default();
        let mut query = ListQuery::new(prefix, recursive);
        loop {
            let page = match self.store.list_page(&query).await {
                Ok(page) => page,
                Err(source) => {
                    return Err(ListError {
                        prefix: prefix.to_string(),
                        partial: listing,
                        source,
                    })
                }
            };
            debug!(
                prefix,
                files = page.contents.len(),
                dirs = page.common_prefixes.len(),
                truncated = page.is_truncated,
                "received listing page"
            );
            listing.files.extend(page.contents.iter().map(|o| ObjectRecord {
                name: record_name(&o.key),
                size: o.size,
                digest: Digest::from_etag(&o.etag),
                error: None,
            }));
            listing
                .dirs
                .extend(page.common_prefixes.iter().map(|p| DirectoryRecord::new(record_name(&p.prefix))));

            if !page.is_truncated {
                return Ok(listing);
            }
            // Stores that omit NextMarker continue after the last key.
            let marker = if page.next_marker.is_empty() {
                page.contents.last().map(|o| o.key.clone()).unwrap_or_default()
            } else {
                page.next_marker
            };
            if marker.is_empty() {
                return Ok(listing);
            }
            query = query.after(marker);
        }
    }

    /// List several prefixes concurrently; results keep argument order.
    pub async fn list_many(&self, prefixes: Vec<String>, recursive: bool) -> Vec<Result<Listing, ListError>> {
        join_all(prefixes.into_iter().map(|prefix| {
            let lister = self.clone();
            async move { lister.list(&prefix, recursive).await }
        }))
        .await
    }
}
