//! Bounded worker pool.
//!
//! Maps a handler over work items with at most `workers` items in flight.
//! Results come back in submission order regardless of completion order:
//! every task carries its submission index and fills exactly that slot.

use async_trait::async_trait;
use std::sync::Arc;
use testbed_common::{HarnessError, HarnessResult};
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::debug;

/// A single operation the pool can apply to each work item.
#[async_trait]
pub trait WorkHandler: Send + Sync + 'static {
    type Item: Send + 'static;
    type Output: Send + 'static;

    async fn execute(&self, item: Self::Item) -> HarnessResult<Self::Output>;
}

#[derive(Debug, Clone)]
pub struct WorkerPool {
    workers: usize,
}

impl WorkerPool {
    pub fn new(workers: usize) -> Self {
        Self {
            workers: workers.max(1),
        }
    }

    pub fn workers(&self) -> usize {
        self.workers
    }

    /// Open a batch that shares this pool's concurrency bound
    pub fn batch<H: WorkHandler>(&self, handler: Arc<H>) -> Batch<H> {
        Batch {
            handler,
            semaphore: Arc::new(Semaphore::new(self.workers)),
            tasks: JoinSet::new(),
            submitted: 0,
        }
    }

    /// Apply `handler` to every item; the i-th output belongs to the i-th item.
    ///
    /// Returns only once every item has finished, or as soon as one fails.
    /// On failure the remaining items are cancelled.
    pub async fn map_parallel<H: WorkHandler>(
        &self,
        handler: Arc<H>,
        items: Vec<H::Item>,
    ) -> HarnessResult<Vec<H::Output>> {
        let mut batch = self.batch(handler);
        for item in items {
            batch.submit(item);
        }
        debug!(items = batch.len(), workers = self.workers, "Batch submitted");
        batch.collect().await
    }
}

/// In-flight work submitted to a [`WorkerPool`]
pub struct Batch<H: WorkHandler> {
    handler: Arc<H>,
    semaphore: Arc<Semaphore>,
    tasks: JoinSet<(usize, HarnessResult<H::Output>)>,
    submitted: usize,
}

impl<H: WorkHandler> Batch<H> {
    /// Queue one item; the returned handle is its slot in the collected results.
    pub fn submit(&mut self, item: H::Item) -> usize {
        let index = self.submitted;
        self.submitted += 1;

        let handler = Arc::clone(&self.handler);
        let semaphore = Arc::clone(&self.semaphore);
        self.tasks.spawn(async move {
            let result = match semaphore.acquire_owned().await {
                Ok(_permit) => handler.execute(item).await,
                Err(_) => Err(HarnessError::Worker("worker pool closed".to_string())),
            };
            (index, result)
        });

        index
    }

    pub fn len(&self) -> usize {
        self.submitted
    }

    pub fn is_empty(&self) -> bool {
        self.submitted == 0
    }

    /// Wait for every submitted item and return outputs in submission order.
    pub async fn collect(mut self) -> HarnessResult<Vec<H::Output>> {
        if self.is_empty() {
            return Ok(Vec::new());
        }
        let mut slots: Vec<Option<H::Output>> = (0..self.submitted).map(|_| None).collect();

        while let Some(joined) = self.tasks.join_next().await {
            let failure = match joined {
                Ok((index, Ok(output))) => {
                    slots[index] = Some(output);
                    continue;
                }
                Ok((index, Err(e))) => {
                    debug!(index, error = %e, "Work item failed, cancelling batch");
                    e
                }
                Err(e) => HarnessError::Worker(e.to_string()),
            };
            self.tasks.shutdown().await;
            return Err(failure);
        }

        slots
            .into_iter()
            .enumerate()
            .map(|(index, slot)| {
                slot.ok_or_else(|| HarnessError::Worker(format!("no result for item {}", index)))
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    /// Sleeps longer for earlier items so completion order is reversed
    struct ReverseSleeper {
        total: u64,
    }

    #[async_trait]
    impl WorkHandler for ReverseSleeper {
        type Item = u64;
        type Output = String;

        async fn execute(&self, item: u64) -> HarnessResult<String> {
            tokio::time::sleep(Duration::from_millis((self.total - item) * 5)).await;
            Ok(format!("item-{}", item))
        }
    }

    struct InFlight {
        current: AtomicUsize,
        peak: AtomicUsize,
    }

    #[async_trait]
    impl WorkHandler for InFlight {
        type Item = usize;
        type Output = usize;

        async fn execute(&self, item: usize) -> HarnessResult<usize> {
            let now = self.current.fetch_add(1, Ordering::SeqCst) + 1;
            self.peak.fetch_max(now, Ordering::SeqCst);
            tokio::time::sleep(Duration::from_millis(10)).await;
            self.current.fetch_sub(1, Ordering::SeqCst);
            Ok(item * 2)
        }
    }

    struct FailOn {
        bad: usize,
        finished: AtomicUsize,
    }

    #[async_trait]
    impl WorkHandler for FailOn {
        type Item = usize;
        type Output = usize;

        async fn execute(&self, item: usize) -> HarnessResult<usize> {
            if item == self.bad {
                return Err(HarnessError::Config(format!("bad item {}", item)));
            }
            tokio::time::sleep(Duration::from_millis(200)).await;
            self.finished.fetch_add(1, Ordering::SeqCst);
            Ok(item)
        }
    }

    #[tokio::test]
    async fn test_results_follow_submission_order() {
        let pool = WorkerPool::new(4);
        let items: Vec<u64> = (0..12).collect();
        let results = pool
            .map_parallel(Arc::new(ReverseSleeper { total: 12 }), items)
            .await
            .unwrap();

        let expected: Vec<String> = (0..12).map(|i| format!("item-{}", i)).collect();
        assert_eq!(results, expected);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrency_is_bounded() {
        let handler = Arc::new(InFlight {
            current: AtomicUsize::new(0),
            peak: AtomicUsize::new(0),
        });
        let pool = WorkerPool::new(3);
        let results = pool
            .map_parallel(Arc::clone(&handler), (0..20).collect())
            .await
            .unwrap();

        assert_eq!(results.len(), 20);
        assert_eq!(results[7], 14);
        assert!(handler.peak.load(Ordering::SeqCst) <= 3);
        assert!(handler.peak.load(Ordering::SeqCst) >= 1);
    }

    #[tokio::test]
    async fn test_single_worker_runs_sequentially() {
        let handler = Arc::new(InFlight {
            current: AtomicUsize::new(0),
            peak: AtomicUsize::new(0),
        });
        let results = WorkerPool::new(1)
            .map_parallel(Arc::clone(&handler), vec![3, 1, 2])
            .await
            .unwrap();

        assert_eq!(results, vec![6, 2, 4]);
        assert_eq!(handler.peak.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_failure_stops_the_batch() {
        let handler = Arc::new(FailOn {
            bad: 2,
            finished: AtomicUsize::new(0),
        });
        let err = WorkerPool::new(8)
            .map_parallel(Arc::clone(&handler), (0..6).collect())
            .await
            .unwrap_err();

        assert!(matches!(err, HarnessError::Config(_)));
        // The failing item returns immediately; the sleepers get cancelled.
        assert_eq!(handler.finished.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_batch_submit_returns_slot_handles() {
        let pool = WorkerPool::new(2);
        let mut batch = pool.batch(Arc::new(ReverseSleeper { total: 3 }));
        assert!(batch.is_empty());
        assert_eq!(batch.submit(0), 0);
        assert_eq!(batch.submit(1), 1);
        assert_eq!(batch.submit(2), 2);
        assert_eq!(batch.len(), 3);

        let results = batch.collect().await.unwrap();
        assert_eq!(results, vec!["item-0", "item-1", "item-2"]);
    }

    #[tokio::test]
    async fn test_empty_input_yields_empty_output() {
        let results = WorkerPool::new(2)
            .map_parallel(Arc::new(ReverseSleeper { total: 0 }), Vec::new())
            .await
            .unwrap();
        assert!(results.is_empty());
        assert_eq!(WorkerPool::new(0).workers(), 1);
    }
}
