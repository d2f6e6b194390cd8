//! Bounded-concurrency execution for chain reads. RPC providers throttle
//! aggressively, so enumeration fetches ("tickets 0..N-1") run in fixed-size
//! windows instead of all at once or one by one.

use futures_util::future::join_all;
use std::future::Future;

/// Run `tasks` in windows of `batch_size`, preserving input order in the
/// output. Within a window all tasks run concurrently; the next window
/// starts only when the previous one has fully settled, so no more than
/// `batch_size` tasks are ever in flight.
///
/// All-settled semantics: a task that resolves to an `Err` value is just an
/// element of the output and never aborts its siblings or later windows.
pub async fn run_batched<F>(tasks: Vec<F>, batch_size: usize) -> Vec<F::Output>
where
    F: Future,
{
    let batch_size = batch_size.max(1);
    let mut results = Vec::with_capacity(tasks.len());
    let mut iter = tasks.into_iter();
    loop {
        let window: Vec<F> = iter.by_ref().take(batch_size).collect();
        if window.is_empty() {
            break;
        }
        results.extend(join_all(window).await);
    }
    results
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use std::time::Duration;

    async fn tracked(i: usize, active: Arc<AtomicUsize>, max_seen: Arc<AtomicUsize>) -> usize {
        let now = active.fetch_add(1, Ordering::SeqCst) + 1;
        max_seen.fetch_max(now, Ordering::SeqCst);
        tokio::time::sleep(Duration::from_millis(10)).await;
        active.fetch_sub(1, Ordering::SeqCst);
        i
    }

    #[tokio::test(start_paused = true)]
    async fn concurrency_never_exceeds_window_size() {
        let active = Arc::new(AtomicUsize::new(0));
        let max_seen = Arc::new(AtomicUsize::new(0));

        let tasks: Vec<_> = (0..12)
            .map(|i| tracked(i, Arc::clone(&active), Arc::clone(&max_seen)))
            .collect();
        let results = run_batched(tasks, 5).await;

        assert_eq!(results, (0..12).collect::<Vec<_>>());
        // Full window runs in parallel, but never more than the window.
        assert_eq!(max_seen.load(Ordering::SeqCst), 5);
        assert_eq!(active.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn failures_settle_in_place() {
        let tasks: Vec<_> = (0..5)
            .map(|i| async move {
                if i == 2 {
                    Err(format!("call {i} failed"))
                } else {
                    Ok(i)
                }
            })
            .collect();
        let results = run_batched(tasks, 2).await;

        assert_eq!(results.len(), 5);
        assert!(results[2].is_err());
        assert_eq!(results[4], Ok(4));
        assert_eq!(results.iter().filter(|r| r.is_ok()).count(), 4);
    }

    #[tokio::test]
    async fn zero_window_is_treated_as_one() {
        let tasks: Vec<_> = (0..3).map(|i| async move { i }).collect();
        assert_eq!(run_batched(tasks, 0).await, vec![0, 1, 2]);
    }

    #[tokio::test]
    async fn empty_input_yields_empty_output() {
        let tasks: Vec<std::future::Ready<u8>> = Vec::new();
        assert!(run_batched(tasks, 5).await.is_empty());
    }
}
