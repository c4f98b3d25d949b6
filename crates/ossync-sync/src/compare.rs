//! Two-sided comparison of a local root and a remote prefix.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};

use ossync_diff::{diff, DiffError, DiffReport, DiffResult};
use ossync_store::ObjectStore;
use ossync_types::{key, ObjectRecord};
use tracing::debug;

use crate::error::{SyncError, SyncResult};
use crate::fork_join::{join2, run_blocking};
use crate::lister::{ListError, RemoteLister};
use crate::queue::JobQueue;
use crate::walker::{path_name, scan};

/// Resolved `diff` arguments.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DiffPlan {
    /// Absolute, cleaned local path.
    pub local: PathBuf,
    /// Listing prefix, without a leading `/`.
    pub prefix: String,
    pub local_offset: usize,
    pub remote_offset: usize,
}

fn offset_of(dir: &str) -> usize {
    if dir == "/" {
        0
    } else {
        dir.len()
    }
}

impl DiffPlan {
    /// Resolve a local path against the working directory and compute the
    /// name offsets that line both sides up.
    ///
    /// A regular file is compared against the remote key itself, relative to
    /// both parents. Anything else is treated as a directory compared
    /// against everything below `remote/`.
    pub fn resolve(local: &str, remote: &str) -> SyncResult<Self> {
        let absolute = std::path::absolute(local).map_err(|e| SyncError::io(local, e))?;
        let local = key::clean(&path_name(&absolute));
        let trimmed = key::clean(&key::rooted(remote)).trim_matches('/').to_string();
        let rooted = format!("/{trimmed}");

        if Path::new(&local).is_file() {
            return Ok(Self {
                local_offset: offset_of(&key::parent(&local)),
                remote_offset: offset_of(&key::parent(&rooted)),
                local: PathBuf::from(local),
                prefix: trimmed,
            });
        }
        let prefix = if trimmed.is_empty() {
            trimmed
        } else {
            format!("{trimmed}/")
        };
        Ok(Self {
            local_offset: offset_of(&local),
            remote_offset: offset_of(&rooted),
            local: PathBuf::from(local),
            prefix,
        })
    }
}

/// Both enumerations, ready to diff.
#[derive(Debug)]
pub struct Comparison {
    pub plan: DiffPlan,
    pub check_digest: bool,
    pub local: Arc<Vec<ObjectRecord>>,
    pub remote: Arc<Vec<ObjectRecord>>,
    /// Error that cut the local walk short.
    pub local_error: Option<SyncError>,
    pub remote_error: Option<ListError>,
    pub local_elapsed: Duration,
    pub remote_elapsed: Duration,
}

impl Comparison {
    /// Local records that could not be read.
    pub fn local_failures(&self) -> impl Iterator<Item = &ObjectRecord> {
        self.local.iter().filter(|r| r.is_failed())
    }

    /// Fail unless both sides were enumerated in full.
    pub fn ensure_complete(&self) -> DiffResult<()> {
        let local = self.local_failures().count() + usize::from(self.local_error.is_some());
        if local > 0 {
            return Err(DiffError::IncompleteSide {
                side: "local",
                failures: local,
            });
        }
        if self.remote_error.is_some() {
            return Err(DiffError::IncompleteSide {
                side: "remote",
                failures: 1,
            });
        }
        Ok(())
    }

    /// Diff both directions concurrently.
    pub async fn report(&self) -> DiffResult<DiffReport> {
        self.ensure_complete()?;
        let (lo, ro) = (self.plan.local_offset, self.plan.remote_offset);
        let check = self.check_digest;
        let (l, r) = (Arc::clone(&self.local), Arc::clone(&self.remote));
        let forward = run_blocking(move || diff(&l, &r, lo, ro, check));
        let (l, r) = (Arc::clone(&self.local), Arc::clone(&self.remote));
        let backward = run_blocking(move || diff(&r, &l, ro, lo, check));
        let (local_only, remote_only) = join2(forward, backward).await;
        Ok(DiffReport {
            local_only,
            remote_only,
        })
    }
}

/// Walk the local side and list the remote side concurrently.
///
/// With `check_digest` every local file is hashed through `queue`. A
/// cancelled queue yields [`SyncError::Cancelled`]; enumeration failures
/// are kept on the [`Comparison`].
pub async fn compare(
    store: Arc<dyn ObjectStore>,
    plan: DiffPlan,
    queue: JobQueue,
    check_digest: bool,
) -> SyncResult<Comparison> {
    let root = plan.local.clone();
    let local = async move {
        let started = Instant::now();
        let scanned = scan(root, &queue, check_digest).await;
        (scanned, started.elapsed())
    };
    let lister = RemoteLister::new(store);
    let prefix = plan.prefix.clone();
    let remote = async move {
        let started = Instant::now();
        let listed = lister.list(&prefix, true).await;
        (listed, started.elapsed())
    };

    let ((scanned, local_elapsed), (listed, remote_elapsed)) = join2(local, remote).await;
    let scanned = scanned?;
    let (remote, remote_error) = match listed {
        Ok(listing) => (listing.files, None),
        Err(e) => (Vec::new(), Some(e)),
    };
    debug!(
        local = scanned.records.len(),
        remote = remote.len(),
        ?local_elapsed,
        ?remote_elapsed,
        "both sides enumerated"
    );
    Ok(Comparison {
        plan,
        check_digest,
        local: Arc::new(scanned.records),
        remote: Arc::new(remote),
        local_error: scanned.walk_error,
        remote_error,
        local_elapsed,
        remote_elapsed,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::fixture_tree;
    use ossync_diff::DiffStatus;
    use ossync_store::InMemoryObjectStore;

    fn fixtures_plan(dir: &tempfile::TempDir, remote: &str) -> DiffPlan {
        DiffPlan::resolve(&path_name(&dir.path().join("fixtures")), remote).unwrap()
    }

    fn relative(records: &[ObjectRecord], offset: usize) -> Vec<&str> {
        records.iter().map(|r| r.relative_name(offset)).collect()
    }

    #[test]
    fn directory_plan_offsets() {
        let dir = fixture_tree();
        let plan = fixtures_plan(&dir, "//backup//photos/");
        assert_eq!(plan.prefix, "backup/photos/");
        assert_eq!(plan.remote_offset, "/backup/photos".len());
        assert_eq!(plan.local_offset, path_name(&plan.local).len());
    }

    #[test]
    fn root_remote_has_no_offset() {
        let dir = fixture_tree();
        let plan = fixtures_plan(&dir, "/");
        assert_eq!(plan.prefix, "");
        assert_eq!(plan.remote_offset, 0);
    }

    #[test]
    fn file_plan_uses_parents() {
        let dir = fixture_tree();
        let file = dir.path().join("fixtures/f");
        let plan = DiffPlan::resolve(&path_name(&file), "docs/f").unwrap();
        assert_eq!(plan.prefix, "docs/f");
        assert_eq!(plan.remote_offset, "/docs".len());
        assert_eq!(plan.local_offset, path_name(&dir.path().join("fixtures")).len());

        let top = DiffPlan::resolve(&path_name(&file), "f").unwrap();
        assert_eq!(top.remote_offset, 0);
    }

    #[test]
    fn relative_local_paths_become_absolute() {
        let plan = DiffPlan::resolve("some/relative/dir", "/").unwrap();
        assert!(plan.local.is_absolute());
        assert!(path_name(&plan.local).ends_with("/some/relative/dir"));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn compare_against_remote_prefix() {
        let dir = fixture_tree();
        let store = InMemoryObjectStore::new().with_page_size(1);
        store.insert("backup/a/b/c", "c");
        store.insert("backup/f", "hello world");
        store.insert("backup/g", "extra");
        store.insert("other/f", "hello world");

        let plan = fixtures_plan(&dir, "backup");
        let cmp = compare(Arc::new(store), plan, JobQueue::new(2), false).await.unwrap();
        assert!(cmp.ensure_complete().is_ok());
        let report = cmp.report().await.unwrap();
        assert_eq!(relative(&report.local_only, cmp.plan.local_offset), ["/d/e"]);
        assert_eq!(relative(&report.remote_only, cmp.plan.remote_offset), ["/g"]);
        assert_eq!(report.status(), DiffStatus::Both);
    }

    #[tokio::test]
    async fn digest_check_catches_same_size_changes() {
        let dir = fixture_tree();
        let store = Arc::new(InMemoryObjectStore::new());
        store.insert("a/b/c", "X");
        store.insert("d/e", "ee");
        store.insert("f", "hello world");

        let by_size = compare(store.clone(), fixtures_plan(&dir, "/"), JobQueue::new(2), false)
            .await
            .unwrap();
        assert_eq!(by_size.report().await.unwrap().status(), DiffStatus::Identical);

        let by_digest = compare(store, fixtures_plan(&dir, "/"), JobQueue::new(2), true)
            .await
            .unwrap();
        let report = by_digest.report().await.unwrap();
        assert_eq!(relative(&report.local_only, by_digest.plan.local_offset), ["/a/b/c"]);
        assert_eq!(relative(&report.remote_only, 0), ["/a/b/c"]);
    }

    #[tokio::test]
    async fn failed_listing_is_incomplete() {
        let dir = fixture_tree();
        let store = InMemoryObjectStore::new().failing_listing_after(0);
        let cmp = compare(Arc::new(store), fixtures_plan(&dir, "/"), JobQueue::new(1), false)
            .await
            .unwrap();
        assert!(cmp.remote_error.is_some());
        let err = cmp.report().await.unwrap_err();
        assert!(matches!(err, DiffError::IncompleteSide { side: "remote", .. }));
        assert_eq!(err.exit_code(), 4);
    }

    #[tokio::test]
    async fn missing_local_root_is_incomplete() {
        let dir = fixture_tree();
        let plan = DiffPlan::resolve(&path_name(&dir.path().join("absent")), "/").unwrap();
        let cmp = compare(Arc::new(InMemoryObjectStore::new()), plan, JobQueue::new(1), false)
            .await
            .unwrap();
        assert!(cmp.local_error.is_some());
        assert!(matches!(
            cmp.ensure_complete(),
            Err(DiffError::IncompleteSide { side: "local", failures: 1 })
        ));
    }
}
