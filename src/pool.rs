// src/pool.rs

use crate::queue::WorkQueue;
use crate::stats::{ErrorLog, JobError};
use std::future::Future;
use std::sync::Arc;

/// Drains `queue` with `workers` concurrent tasks and waits for all of them.
///
/// Each item runs in its own task, so an error or panic is recorded in
/// `errors` and the worker moves on to the next item. Returns how many items
/// each worker took.
pub async fn run_phase<T, F, Fut>(
    queue: Arc<WorkQueue<T>>,
    workers: usize,
    errors: Arc<ErrorLog>,
    work: F,
) -> Vec<usize>
where
    T: Send + 'static,
    F: Fn(T) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<(), JobError>> + Send + 'static,
{
    let work = Arc::new(work);
    let mut handles = Vec::with_capacity(workers);

    for worker in 0..workers {
        let queue = queue.clone();
        let errors = errors.clone();
        let work = work.clone();

        handles.push(tokio::spawn(async move {
            let mut processed = 0;
            while let Some(item) = queue.pop().await {
                processed += 1;
                match tokio::spawn(work(item)).await {
                    Ok(Ok(())) => {}
                    Ok(Err(e)) => errors.record(e).await,
                    Err(e) => errors.record(e).await,
                }
            }
            tracing::debug!(worker, processed, "worker finished");
            processed
        }));
    }

    let mut processed = Vec::with_capacity(handles.len());
    for handle in handles {
        match handle.await {
            Ok(count) => processed.push(count),
            Err(e) => {
                errors.record(e).await;
                processed.push(0);
            }
        }
    }
    processed
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classifier::ClassifyError;
    use std::collections::HashSet;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tokio::sync::Mutex;

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn more_workers_than_items() {
        let queue: Arc<WorkQueue<usize>> = Arc::new((0..5).collect());
        let seen = Arc::new(Mutex::new(Vec::new()));
        let errors = Arc::new(ErrorLog::new());

        let sink = seen.clone();
        let counts = run_phase(queue.clone(), 16, errors.clone(), move |item| {
            let sink = sink.clone();
            async move {
                sink.lock().await.push(item);
                Ok::<(), JobError>(())
            }
        })
        .await;

        assert_eq!(counts.len(), 16);
        assert_eq!(counts.iter().sum::<usize>(), 5);
        let seen = seen.lock().await;
        assert_eq!(seen.iter().copied().collect::<HashSet<_>>().len(), 5);
        assert_eq!(seen.len(), 5);
        assert!(queue.is_empty().await);
        assert_eq!(errors.count(), 0);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn every_item_processed_exactly_once() {
        let queue: Arc<WorkQueue<usize>> = Arc::new((0..1000).collect());
        let hits: Arc<Vec<AtomicUsize>> = Arc::new((0..1000).map(|_| AtomicUsize::new(0)).collect());
        let errors = Arc::new(ErrorLog::new());

        let tally = hits.clone();
        let counts = run_phase(queue, 8, errors, move |item| {
            let tally = tally.clone();
            async move {
                tally[item].fetch_add(1, Ordering::SeqCst);
                tokio::task::yield_now().await;
                Ok::<(), JobError>(())
            }
        })
        .await;

        assert_eq!(counts.iter().sum::<usize>(), 1000);
        assert!(hits.iter().all(|h| h.load(Ordering::SeqCst) == 1));
    }

    #[tokio::test]
    async fn failures_and_panics_do_not_stop_workers() {
        let queue: Arc<WorkQueue<usize>> = Arc::new((0..10).collect());
        let done = Arc::new(AtomicUsize::new(0));
        let errors = Arc::new(ErrorLog::new());

        let finished = done.clone();
        let counts = run_phase(queue, 2, errors.clone(), move |item| {
            let finished = finished.clone();
            async move {
                match item {
                    3 => Err(JobError::from(ClassifyError::UnsupportedType("text/html".into()))),
                    7 => panic!("worker blew up"),
                    _ => {
                        finished.fetch_add(1, Ordering::SeqCst);
                        Ok(())
                    }
                }
            }
        })
        .await;

        assert_eq!(counts.iter().sum::<usize>(), 10);
        assert_eq!(done.load(Ordering::SeqCst), 8);
        assert_eq!(errors.count(), 2);
    }

    #[tokio::test]
    async fn empty_queue_returns_immediately() {
        let queue: Arc<WorkQueue<usize>> = Arc::new(WorkQueue::new());
        let errors = Arc::new(ErrorLog::new());
        let counts = run_phase(queue, 3, errors, |_| async { Ok::<(), JobError>(()) }).await;
        assert_eq!(counts, [0, 0, 0]);
    }
}
