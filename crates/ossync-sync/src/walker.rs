//! Local filesystem enumeration.
//!
//! [`walk`] lazily yields every regular file under a root in file-name
//! order. [`scan`] drives a walk on a blocking thread and, when asked,
//! digests every file through a [`JobQueue`].

use std::fs::File;
use std::io::{self, Read};
use std::path::{Path, PathBuf};

use ossync_crypto::ContentHasher;
use ossync_types::{Digest, ObjectRecord};
use tokio::sync::mpsc;
use tracing::debug;
use walkdir::WalkDir;

use crate::error::{SyncError, SyncResult};
use crate::fork_join::run_blocking;
use crate::queue::JobQueue;

const READ_CHUNK: usize = 64 * 1024;

/// Iterator over the regular files below a root.
///
/// Symlinks and other non-regular entries are skipped. The first error is
/// yielded and ends the iteration.
pub struct Walk {
    entries: walkdir::IntoIter,
    finished: bool,
}

/// Walk `root`. A regular file yields itself; a directory is visited
/// recursively.
pub fn walk(root: impl AsRef<Path>) -> Walk {
    Walk {
        entries: WalkDir::new(root)
            .follow_links(false)
            .sort_by_file_name()
            .into_iter(),
        finished: false,
    }
}

impl Iterator for Walk {
    type Item = SyncResult<ObjectRecord>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.finished {
            return None;
        }
        loop {
            let entry = match self.entries.next()? {
                Ok(entry) => entry,
                Err(e) => {
                    self.finished = true;
                    return Some(Err(e.into()));
                }
            };
            if !entry.file_type().is_file() {
                continue;
            }
            return match entry.metadata() {
                Ok(meta) => Some(Ok(ObjectRecord::new(path_name(entry.path()), meta.len()))),
                Err(e) => {
                    self.finished = true;
                    Some(Err(e.into()))
                }
            };
        }
    }
}

pub(crate) fn path_name(path: &Path) -> String {
    path.to_string_lossy().into_owned()
}

/// MD5 of a file's full contents.
pub fn digest_file(path: &Path) -> io::Result<Digest> {
    let mut file = File::open(path)?;
    let mut hasher = ContentHasher::new();
    let mut buf = vec![0u8; READ_CHUNK];
    loop {
        let n = file.read(&mut buf)?;
        if n == 0 {
            break;
        }
        hasher.update(&buf[..n]);
    }
    Ok(hasher.finalize())
}

/// Result of enumerating one local root.
#[derive(Debug, Default)]
pub struct LocalScan {
    /// Files in walk order. With digests requested, each carries either its
    /// digest or the read error.
    pub records: Vec<ObjectRecord>,
    /// The error that cut the walk short, if any.
    pub walk_error: Option<SyncError>,
}

impl LocalScan {
    /// Records carrying a read error.
    pub fn failures(&self) -> impl Iterator<Item = &ObjectRecord> {
        self.records.iter().filter(|r| r.is_failed())
    }

    pub fn is_complete(&self) -> bool {
        self.walk_error.is_none() && self.failures().next().is_none()
    }
}

/// Enumerate `root`, optionally attaching an MD5 digest to every file.
///
/// Digests are computed by `queue`'s workers; output keeps walk order. A
/// cancelled queue yields [`SyncError::Cancelled`].
pub async fn scan(root: PathBuf, queue: &JobQueue, with_digest: bool) -> SyncResult<LocalScan> {
    let (records, walk_error) = run_blocking(move || {
        let mut records = Vec::new();
        for item in walk(&root) {
            match item {
                Ok(record) => records.push(record),
                Err(e) => return (records, Some(e)),
            }
        }
        (records, None)
    })
    .await;
    debug!(files = records.len(), "local walk finished");

    let records = if with_digest {
        digest_all(records, queue).await?
    } else {
        records
    };
    Ok(LocalScan {
        records,
        walk_error,
    })
}

async fn digest_all(records: Vec<ObjectRecord>, queue: &JobQueue) -> SyncResult<Vec<ObjectRecord>> {
    let total = records.len();
    let (tx, mut rx) = mpsc::unbounded_channel::<(usize, ObjectRecord)>();
    let results = tx.clone();
    queue
        .run(
            move |jobs| async move {
                for job in records.into_iter().enumerate() {
                    if !jobs.send(job).await {
                        break;
                    }
                }
            },
            move |(index, record): (usize, ObjectRecord)| {
                let results = results.clone();
                async move {
                    let path = PathBuf::from(&record.name);
                    let digested = match run_blocking(move || digest_file(&path)).await {
                        Ok(digest) => record.with_digest(digest),
                        Err(e) => record.with_error(e.to_string()),
                    };
                    // the receiver outlives the queue run
                    let _ = results.send((index, digested));
                }
            },
        )
        .await;
    drop(tx);

    let mut out = Vec::with_capacity(total);
    while let Some(item) = rx.recv().await {
        out.push(item);
    }
    if out.len() < total && queue.cancellation().is_cancelled() {
        return Err(SyncError::Cancelled);
    }
    out.sort_by_key(|(index, _)| *index);
    Ok(out.into_iter().map(|(_, record)| record).collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::fixture_tree;
    use tempfile::TempDir;

    fn names(records: &[ObjectRecord], base: &Path) -> Vec<String> {
        records
            .iter()
            .map(|r| r.name.strip_prefix(&path_name(base)).unwrap_or(&r.name).to_string())
            .collect()
    }

    #[test]
    fn walks_files_in_name_order() {
        let dir = fixture_tree();
        let records: Vec<_> = walk(dir.path().join("fixtures")).collect::<SyncResult<_>>().unwrap();
        assert_eq!(
            names(&records, dir.path()),
            ["/fixtures/a/b/c", "/fixtures/d/e", "/fixtures/f"]
        );
        assert_eq!(records[2].size, 11);
    }

    #[test]
    fn single_file_root() {
        let dir = fixture_tree();
        let file = dir.path().join("fixtures/f");
        let records: Vec<_> = walk(&file).collect::<SyncResult<_>>().unwrap();
        assert_eq!(records, vec![ObjectRecord::new(path_name(&file), 11)]);
    }

    #[test]
    fn missing_root_yields_one_error() {
        let dir = TempDir::new().unwrap();
        let mut it = walk(dir.path().join("nope"));
        assert!(matches!(it.next(), Some(Err(SyncError::Walk(_)))));
        assert!(it.next().is_none());
    }

    #[cfg(unix)]
    #[test]
    fn symlinks_are_skipped() {
        let dir = fixture_tree();
        let root = dir.path().join("fixtures");
        std::os::unix::fs::symlink(root.join("f"), root.join("link")).unwrap();
        let records: Vec<_> = walk(&root).collect::<SyncResult<_>>().unwrap();
        assert_eq!(records.len(), 3);
    }

    #[test]
    fn digest_file_matches_content() {
        let dir = fixture_tree();
        let digest = digest_file(&dir.path().join("fixtures/f")).unwrap();
        assert_eq!(digest.to_hex(), "5eb63bbbe01eeed093cb22bb8f5acdc3");
    }

    #[tokio::test]
    async fn scan_with_digest_keeps_order() {
        let dir = fixture_tree();
        let scan = scan(dir.path().join("fixtures"), &JobQueue::new(4), true).await.unwrap();
        assert!(scan.is_complete());
        assert_eq!(
            names(&scan.records, dir.path()),
            ["/fixtures/a/b/c", "/fixtures/d/e", "/fixtures/f"]
        );
        assert!(scan.records.iter().all(|r| r.digest.is_some()));
        assert_eq!(scan.records[2].digest, Some(ContentHasher::digest(b"hello world")));
    }

    #[tokio::test]
    async fn scan_without_digest() {
        let dir = fixture_tree();
        let scan = scan(dir.path().join("fixtures"), &JobQueue::new(1), false).await.unwrap();
        assert_eq!(scan.records.len(), 3);
        assert!(scan.records.iter().all(|r| r.digest.is_none()));
    }

    #[tokio::test]
    async fn scan_reports_walk_error() {
        let dir = TempDir::new().unwrap();
        let scan = scan(dir.path().join("missing"), &JobQueue::new(1), false).await.unwrap();
        assert!(scan.records.is_empty());
        assert!(scan.walk_error.is_some());
        assert!(!scan.is_complete());
    }

    #[tokio::test]
    async fn unreadable_file_is_attached_not_raised() {
        let dir = fixture_tree();
        let records = vec![
            ObjectRecord::new(path_name(&dir.path().join("fixtures/f")), 11),
            ObjectRecord::new(path_name(&dir.path().join("fixtures/gone")), 1),
        ];
        let out = digest_all(records, &JobQueue::new(2)).await.unwrap();
        assert!(out[0].digest.is_some());
        assert!(out[1].is_failed());
    }
}
