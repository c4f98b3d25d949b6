//! Fork-join over spawned tasks.
//!
//! Every branch runs on its own runtime task and the call returns only when
//! all of them have finished. A panicking branch is re-raised in the caller
//! once the others are done.

use std::future::Future;
use std::panic;

use tokio::task::JoinError;

fn settle<T>(joined: Result<T, JoinError>) -> T {
    match joined {
        Ok(value) => value,
        Err(e) => match e.try_into_panic() {
            Ok(payload) => panic::resume_unwind(payload),
            // Branches are never aborted, so this only happens when the
            // runtime itself is shutting down.
            Err(e) => panic!("fork-join branch did not complete: {e}"),
        },
    }
}

/// Run two futures concurrently and wait for both.
pub async fn join2<A, B, FA, FB>(a: FA, b: FB) -> (A, B)
where
    FA: Future<Output = A> + Send + 'static,
    FB: Future<Output = B> + Send + 'static,
    A: Send + 'static,
    B: Send + 'static,
{
    let a = tokio::spawn(a);
    let b = tokio::spawn(b);
    let a = a.await;
    let b = b.await;
    (settle(a), settle(b))
}

/// Run blocking work (file walking, hashing) on the blocking pool.
pub async fn run_blocking<F, T>(f: F) -> T
where
    F: FnOnce() -> T + Send + 'static,
    T: Send + 'static,
{
    settle(tokio::task::spawn_blocking(f).await)
}

/// Run every future concurrently and wait for all; results keep input order.
pub async fn join_all<T, F, I>(branches: I) -> Vec<T>
where
    I: IntoIterator<Item = F>,
    F: Future<Output = T> + Send + 'static,
    T: Send + 'static,
{
    let handles: Vec<_> = branches.into_iter().map(tokio::spawn).collect();
    let mut joined = Vec::with_capacity(handles.len());
    for handle in handles {
        joined.push(handle.await);
    }
    joined.into_iter().map(settle).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn join2_returns_both() {
        let (a, b) = join2(async { 1 }, async { "two" }).await;
        assert_eq!((a, b), (1, "two"));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn join2_runs_concurrently() {
        let (tx, rx) = tokio::sync::oneshot::channel();
        // each branch needs the other to make progress
        let (sent, got) = join2(
            async move {
                tokio::time::sleep(Duration::from_millis(5)).await;
                tx.send(7).is_ok()
            },
            async move { rx.await.unwrap_or_default() },
        )
        .await;
        assert!(sent);
        assert_eq!(got, 7);
    }

    #[tokio::test]
    async fn join_all_keeps_order() {
        let out = join_all((0..5u64).map(|i| async move {
            tokio::time::sleep(Duration::from_millis(10 - 2 * i)).await;
            i
        }))
        .await;
        assert_eq!(out, vec![0, 1, 2, 3, 4]);
    }

    #[tokio::test]
    async fn join_all_empty() {
        let out: Vec<u8> = join_all(Vec::<std::future::Ready<u8>>::new()).await;
        assert!(out.is_empty());
    }

    #[tokio::test]
    async fn run_blocking_returns_value() {
        assert_eq!(run_blocking(|| 6 * 7).await, 42);
    }

    #[tokio::test]
    #[should_panic(expected = "branch failed")]
    async fn panic_is_reraised() {
        join2(async { panic!("branch failed") }, async { 1 }).await;
    }
}
