//! Bounded producer/consumer job execution.
//!
//! A single producer task pushes jobs through a channel of capacity
//! `concurrency`; `concurrency` worker tasks drain it. The queue returns once
//! the producer has finished and every job it sent has been handled, or once
//! the cancellation token fires and the workers have stopped.
//!
//! Results are not collected here. Handlers record their effects through
//! whatever the caller captured (atomic counters, a result channel).

use std::future::Future;
use std::panic;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use tokio::sync::{mpsc, Mutex};
use tokio::task::{JoinError, JoinSet};
use tokio_util::sync::CancellationToken;
use tracing::debug;

/// Sending half handed to a producer.
pub struct JobSender<J> {
    tx: mpsc::Sender<J>,
    cancel: CancellationToken,
}

impl<J> Clone for JobSender<J> {
    fn clone(&self) -> Self {
        Self {
            tx: self.tx.clone(),
            cancel: self.cancel.clone(),
        }
    }
}

impl<J: Send> JobSender<J> {
    /// Queue a job, waiting while all workers are busy.
    ///
    /// Returns `false` once the run is cancelled or the workers are gone; the
    /// producer should stop then.
    pub async fn send(&self, job: J) -> bool {
        tokio::select! {
            biased;
            () = self.cancel.cancelled() => false,
            sent = self.tx.send(job) => sent.is_ok(),
        }
    }

    /// [`send`](Self::send) for producers running on a blocking thread.
    ///
    /// Must not be called from async code.
    pub fn blocking_send(&self, job: J) -> bool {
        !self.cancel.is_cancelled() && self.tx.blocking_send(job).is_ok()
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }
}

/// Runs jobs with at most `concurrency` handlers in flight.
#[derive(Clone, Debug)]
pub struct JobQueue {
    concurrency: usize,
    cancel: CancellationToken,
}

impl JobQueue {
    /// # Panics
    ///
    /// If `concurrency` is zero.
    pub fn new(concurrency: usize) -> Self {
        assert!(concurrency >= 1, "job queue concurrency must be at least 1, got {concurrency}");
        Self {
            concurrency,
            cancel: CancellationToken::new(),
        }
    }

    /// Stop producing and handling jobs when `cancel` fires.
    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn concurrency(&self) -> usize {
        self.concurrency
    }

    pub fn cancellation(&self) -> &CancellationToken {
        &self.cancel
    }

    /// Run `producer` once and `handler` for every job it sends.
    ///
    /// Returns the number of jobs handled. A panic in the producer or a
    /// handler is re-raised here after the other tasks have stopped.
    pub async fn run<J, P, PF, H, HF>(&self, producer: P, handler: H) -> usize
    where
        J: Send + 'static,
        P: FnOnce(JobSender<J>) -> PF,
        PF: Future<Output = ()> + Send + 'static,
        H: Fn(J) -> HF + Send + Sync + 'static,
        HF: Future<Output = ()> + Send + 'static,
    {
        let (tx, rx) = mpsc::channel(self.concurrency);
        let producer = tokio::spawn(producer(JobSender {
            tx,
            cancel: self.cancel.clone(),
        }));

        let rx = Arc::new(Mutex::new(rx));
        let handler = Arc::new(handler);
        let handled = Arc::new(AtomicUsize::new(0));
        let mut workers = JoinSet::new();
        for worker in 0..self.concurrency {
            let rx = Arc::clone(&rx);
            let handler = Arc::clone(&handler);
            let handled = Arc::clone(&handled);
            let cancel = self.cancel.clone();
            workers.spawn(async move {
                loop {
                    let job = {
                        let mut rx = rx.lock().await;
                        tokio::select! {
                            biased;
                            () = cancel.cancelled() => None,
                            job = rx.recv() => job,
                        }
                    };
                    let Some(job) = job else { break };
                    (*handler)(job).await;
                    handled.fetch_add(1, Ordering::Relaxed);
                }
                debug!(worker, "worker finished");
            });
        }

        let mut panicked = None;
        while let Some(joined) = workers.join_next().await {
            if let Err(e) = joined {
                panicked = panicked.or(into_panic(e));
            }
        }
        // Closing the receiver unblocks a producer still waiting on a full
        // channel after cancellation.
        drop(rx);
        if let Err(e) = producer.await {
            panicked = panicked.or(into_panic(e));
        }
        if let Some(payload) = panicked {
            panic::resume_unwind(payload);
        }
        handled.load(Ordering::Relaxed)
    }
}

fn into_panic(e: JoinError) -> Option<Box<dyn std::any::Any + Send>> {
    e.try_into_panic().ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicU64;
    use std::time::Duration;

    #[tokio::test]
    async fn handles_every_job() {
        let sum = Arc::new(AtomicU64::new(0));
        let acc = Arc::clone(&sum);
        let handled = JobQueue::new(4)
            .run(
                |tx| async move {
                    for i in 1..=100u64 {
                        assert!(tx.send(i).await);
                    }
                },
                move |i| {
                    let acc = Arc::clone(&acc);
                    async move {
                        acc.fetch_add(i, Ordering::Relaxed);
                    }
                },
            )
            .await;
        assert_eq!(handled, 100);
        assert_eq!(sum.load(Ordering::Relaxed), 5050);
    }

    async fn aggregate(concurrency: usize) -> (usize, u64) {
        let sum = Arc::new(AtomicU64::new(0));
        let acc = Arc::clone(&sum);
        let handled = JobQueue::new(concurrency)
            .run(
                |tx| async move {
                    for i in 0..64u64 {
                        tx.send(i * i).await;
                    }
                },
                move |v| {
                    let acc = Arc::clone(&acc);
                    async move {
                        tokio::task::yield_now().await;
                        acc.fetch_add(v, Ordering::Relaxed);
                    }
                },
            )
            .await;
        (handled, sum.load(Ordering::Relaxed))
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrency_does_not_change_aggregates() {
        assert_eq!(aggregate(1).await, aggregate(8).await);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn never_exceeds_concurrency() {
        let active = Arc::new(AtomicUsize::new(0));
        let peak = Arc::new(AtomicUsize::new(0));
        let (a, p) = (Arc::clone(&active), Arc::clone(&peak));
        JobQueue::new(3)
            .run(
                |tx| async move {
                    for i in 0..30 {
                        tx.send(i).await;
                    }
                },
                move |_| {
                    let (a, p) = (Arc::clone(&a), Arc::clone(&p));
                    async move {
                        let now = a.fetch_add(1, Ordering::SeqCst) + 1;
                        p.fetch_max(now, Ordering::SeqCst);
                        tokio::time::sleep(Duration::from_millis(2)).await;
                        a.fetch_sub(1, Ordering::SeqCst);
                    }
                },
            )
            .await;
        let peak = peak.load(Ordering::SeqCst);
        assert!(peak >= 1 && peak <= 3, "peak {peak}");
    }

    #[tokio::test]
    async fn empty_producer() {
        let handled = JobQueue::new(2)
            .run(|_tx: JobSender<u32>| async {}, |_| async {})
            .await;
        assert_eq!(handled, 0);
    }

    #[tokio::test]
    async fn blocking_producer() {
        let handled = JobQueue::new(2)
            .run(
                |tx| async move {
                    tokio::task::spawn_blocking(move || {
                        for i in 0..10 {
                            tx.blocking_send(i);
                        }
                    })
                    .await
                    .unwrap();
                },
                |_| async {},
            )
            .await;
        assert_eq!(handled, 10);
    }

    #[tokio::test]
    async fn cancellation_stops_producer_and_workers() {
        let cancel = CancellationToken::new();
        let queue = JobQueue::new(2).with_cancellation(cancel.clone());
        let stop = cancel.clone();
        let handled = queue
            .run(
                |tx| async move {
                    let mut i = 0u64;
                    while tx.send(i).await {
                        i += 1;
                    }
                },
                move |i| {
                    let stop = stop.clone();
                    async move {
                        if i == 5 {
                            stop.cancel();
                        }
                    }
                },
            )
            .await;
        assert!(cancel.is_cancelled());
        assert!(handled < 1000);
    }

    #[tokio::test]
    #[should_panic(expected = "handler blew up")]
    async fn handler_panic_is_reraised() {
        JobQueue::new(2)
            .run(
                |tx| async move {
                    tx.send(1).await;
                },
                |_| async { panic!("handler blew up") },
            )
            .await;
    }

    #[test]
    #[should_panic(expected = "at least 1")]
    fn zero_concurrency_panics() {
        JobQueue::new(0);
    }
}
