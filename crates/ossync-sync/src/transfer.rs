//! Upload and download drivers.
//!
//! Each driver feeds jobs through a [`JobQueue`] sized by the run's
//! concurrency. A failed job is counted and reported through the event sink;
//! its siblings carry on.

use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

use bytes::Bytes;
use futures_util::StreamExt;
use ossync_crypto::ContentHasher;
use ossync_store::{ObjectBody, ObjectStore};
use tokio::io::{AsyncWrite, AsyncWriteExt};
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::error::{SyncError, SyncResult};
use crate::fork_join::{join2, run_blocking};
use crate::mapping::{local_to_remote, rooted_local_to_remote};
use crate::options::RunOptions;
use crate::queue::{JobQueue, JobSender};
use crate::stats::{TransferCounters, TransferStats};
use crate::walker::{path_name, walk};

/// Local file to remote key.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct UploadJob {
    pub local: PathBuf,
    pub remote: String,
}

impl UploadJob {
    pub fn new(local: impl Into<PathBuf>, remote: impl Into<String>) -> Self {
        Self {
            local: local.into(),
            remote: remote.into(),
        }
    }
}

/// Remote key to local file.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DownloadJob {
    pub remote: String,
    pub local: PathBuf,
}

impl DownloadJob {
    pub fn new(remote: impl Into<String>, local: impl Into<PathBuf>) -> Self {
        Self {
            remote: remote.into(),
            local: local.into(),
        }
    }
}

/// What happened to one upload.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum UploadOutcome {
    Uploaded,
    /// The remote ETag already matches the content.
    Unchanged,
}

/// Progress notifications for the caller to render.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum TransferEvent {
    Uploaded { local: PathBuf, remote: String, bytes: u64 },
    Unchanged { local: PathBuf, remote: String },
    Downloaded { remote: String, local: PathBuf, bytes: u64 },
    /// Dry run: the transfer that would have happened.
    Planned { from: String, to: String },
    Failed { subject: String, message: String },
}

type EventSink = Arc<dyn Fn(TransferEvent) + Send + Sync>;

/// Transfer driver bound to one store and one run's options.
#[derive(Clone)]
pub struct Transfer {
    store: Arc<dyn ObjectStore>,
    options: RunOptions,
    cancel: CancellationToken,
    events: EventSink,
}

impl fmt::Debug for Transfer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Transfer")
            .field("options", &self.options)
            .field("cancelled", &self.cancel.is_cancelled())
            .finish_non_exhaustive()
    }
}

impl Transfer {
    pub fn new(store: Arc<dyn ObjectStore>, options: RunOptions) -> Self {
        Self {
            store,
            options,
            cancel: CancellationToken::new(),
            events: Arc::new(|_| {}),
        }
    }

    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn with_events(mut self, sink: impl Fn(TransferEvent) + Send + Sync + 'static) -> Self {
        self.events = Arc::new(sink);
        self
    }

    fn queue(&self) -> JobQueue {
        JobQueue::new(self.options.concurrency).with_cancellation(self.cancel.clone())
    }

    fn emit(&self, event: TransferEvent) {
        (self.events)(event);
    }

    fn fail(&self, counters: &TransferCounters, subject: impl Into<String>, error: &dyn fmt::Display) {
        let subject = subject.into();
        warn!(%subject, %error, "transfer failed");
        counters.failed();
        self.emit(TransferEvent::Failed {
            subject,
            message: error.to_string(),
        });
    }

    /// Upload `body` to `remote` unless the remote ETag already matches.
    ///
    /// The MD5 and the HEAD request run concurrently. A failed HEAD does not
    /// prevent the upload.
    pub async fn upload_bytes(&self, remote: &str, body: Bytes) -> SyncResult<UploadOutcome> {
        let hashed = body.clone();
        let store = Arc::clone(&self.store);
        let key = remote.to_string();
        let (digest, head) = join2(run_blocking(move || ContentHasher::digest(&hashed)), async move {
            store.head(&key).await
        })
        .await;

        match head {
            Ok(Some(head)) if head.digest == Some(digest) => {
                debug!(remote, "no changes, ignored");
                return Ok(UploadOutcome::Unchanged);
            }
            Ok(_) => {}
            Err(e) => debug!(remote, error = %e, "existence check failed, uploading"),
        }
        self.store.put(remote, body, &digest).await?;
        Ok(UploadOutcome::Uploaded)
    }

    async fn upload_one(&self, job: UploadJob, counters: &TransferCounters) {
        let local = path_name(&job.local);
        if self.options.dry_run {
            self.emit(TransferEvent::Planned {
                from: local,
                to: job.remote,
            });
            return;
        }
        let body = match tokio::fs::read(&job.local).await {
            Ok(data) => Bytes::from(data),
            Err(e) => return self.fail(counters, local, &e),
        };
        let size = body.len() as u64;
        match self.upload_bytes(&job.remote, body).await {
            Ok(UploadOutcome::Uploaded) => {
                counters.transferred(size);
                self.emit(TransferEvent::Uploaded {
                    local: job.local,
                    remote: job.remote,
                    bytes: size,
                });
            }
            Ok(UploadOutcome::Unchanged) => {
                counters.skipped();
                self.emit(TransferEvent::Unchanged {
                    local: job.local,
                    remote: job.remote,
                });
            }
            Err(e) => self.fail(counters, local, &e),
        }
    }

    async fn run_uploads<P, PF>(&self, counters: Arc<TransferCounters>, producer: P) -> TransferStats
    where
        P: FnOnce(JobSender<UploadJob>) -> PF,
        PF: std::future::Future<Output = ()> + Send + 'static,
    {
        let started = Instant::now();
        let this = self.clone();
        let shared = Arc::clone(&counters);
        self.queue()
            .run(producer, move |job: UploadJob| {
                let this = this.clone();
                let counters = Arc::clone(&shared);
                async move { this.upload_one(job, &counters).await }
            })
            .await;
        counters.snapshot(started.elapsed())
    }

    /// Upload prepared jobs.
    pub async fn upload_many(&self, jobs: Vec<UploadJob>) -> TransferStats {
        self.run_uploads(Arc::default(), |tx| async move {
            for job in jobs {
                if !tx.send(job).await {
                    break;
                }
            }
        })
        .await
    }

    /// Upload local files and directory trees below `remote`.
    ///
    /// Keys follow [`local_to_remote`] for files and
    /// [`rooted_local_to_remote`] for files found under a directory source.
    /// Unreadable sources count as failures.
    pub async fn upload_sources(&self, locals: Vec<String>, remote: String, parents: bool) -> TransferStats {
        let counters = Arc::new(TransferCounters::default());
        let walk_counters = Arc::clone(&counters);
        let this = self.clone();
        self.run_uploads(counters, move |tx| async move {
            run_blocking(move || {
                let multiple = locals.len() > 1;
                for source in &locals {
                    let meta = match std::fs::metadata(source) {
                        Ok(meta) => meta,
                        Err(e) => {
                            this.fail(&walk_counters, source.as_str(), &e);
                            continue;
                        }
                    };
                    if !meta.is_dir() {
                        let key = local_to_remote(source, &remote, multiple, parents);
                        if !tx.blocking_send(UploadJob::new(source, key)) {
                            return;
                        }
                        continue;
                    }
                    for item in walk(source) {
                        match item {
                            Ok(record) => {
                                let key = rooted_local_to_remote(source, &record.name, &remote, parents);
                                if !tx.blocking_send(UploadJob::new(&record.name, key)) {
                                    return;
                                }
                            }
                            Err(e) => this.fail(&walk_counters, source.as_str(), &e),
                        }
                    }
                }
            })
            .await
        })
        .await
    }

    /// Open a remote object for streaming.
    pub async fn open(&self, remote: &str) -> SyncResult<ObjectBody> {
        Ok(self.store.get(remote).await?)
    }

    /// Download one object, writing through a temporary file in the target
    /// directory that is renamed into place once complete.
    pub async fn download_one(&self, job: &DownloadJob) -> SyncResult<u64> {
        let body = self.open(&job.remote).await?;
        let dir = match job.local.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => PathBuf::from("."),
        };
        let temp = tempfile::Builder::new()
            .prefix(".ossync-")
            .tempfile_in(&dir)
            .map_err(|e| SyncError::io(&dir, e))?;
        let (file, temp_path) = temp.into_parts();
        let mut file = tokio::fs::File::from_std(file);
        let written = copy_body(body, &mut file, &job.local).await?;
        file.sync_all().await.map_err(|e| SyncError::io(&job.local, e))?;
        drop(file);
        temp_path
            .persist(&job.local)
            .map_err(|e| SyncError::io(&job.local, e.error))?;
        Ok(written)
    }

    /// Download prepared jobs.
    pub async fn download_many(&self, jobs: Vec<DownloadJob>) -> TransferStats {
        let started = Instant::now();
        let counters = Arc::new(TransferCounters::default());
        let this = self.clone();
        let shared = Arc::clone(&counters);
        self.queue()
            .run(
                |tx| async move {
                    for job in jobs {
                        if !tx.send(job).await {
                            break;
                        }
                    }
                },
                move |job: DownloadJob| {
                    let this = this.clone();
                    let counters = Arc::clone(&shared);
                    async move {
                        if this.options.dry_run {
                            this.emit(TransferEvent::Planned {
                                from: job.remote,
                                to: path_name(&job.local),
                            });
                            return;
                        }
                        match this.download_one(&job).await {
                            Ok(bytes) => {
                                counters.transferred(bytes);
                                this.emit(TransferEvent::Downloaded {
                                    remote: job.remote,
                                    local: job.local,
                                    bytes,
                                });
                            }
                            Err(e) => this.fail(&counters, job.remote, &e),
                        }
                    }
                },
            )
            .await;
        counters.snapshot(started.elapsed())
    }

    /// `curl` command fetching `remote` through a signed URL that expires at
    /// `expires` (Unix seconds).
    pub fn curl_command(&self, remote: &str, local: Option<&Path>, expires: i64) -> SyncResult<String> {
        let url = self.store.presigned_url(remote, expires)?;
        Ok(match local {
            Some(local) => format!("curl -o \"{}\" \"{url}\"", local.display()),
            None => format!("curl \"{url}\""),
        })
    }
}

/// Stream an object body into `writer`; returns the bytes written.
pub async fn copy_body<W>(mut body: ObjectBody, writer: &mut W, target: &Path) -> SyncResult<u64>
where
    W: AsyncWrite + Unpin,
{
    let mut written = 0u64;
    while let Some(chunk) = body.stream.next().await {
        let chunk = chunk?;
        writer
            .write_all(&chunk)
            .await
            .map_err(|e| SyncError::io(target, e))?;
        written += chunk.len() as u64;
    }
    writer.flush().await.map_err(|e| SyncError::io(target, e))?;
    Ok(written)
}
