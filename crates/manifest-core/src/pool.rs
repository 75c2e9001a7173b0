//! Bounded worker pool
//!
//! Runs a batch of jobs on a fixed number of workers:
//! - Workers pull from one shared queue, so at most `size` jobs are in flight
//! - Each job runs in its own task; a panic is reported, not propagated
//! - Results stream back over a channel for single-threaded aggregation
//!
//! Completions are delivered through the result channel rather than by
//! invoking a callback from the finishing job, so long runs of back-to-back
//! completions never nest.

use crate::error::PoolError;
use std::future::Future;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::{mpsc, Mutex};

/// Pool statistics
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PoolStats {
    /// Jobs handed to the pool
    pub submitted: usize,
    /// Jobs that ran to completion
    pub completed: usize,
    /// Jobs that panicked
    pub panicked: usize,
    /// Highest number of jobs running at once
    pub peak_in_flight: usize,
}

#[derive(Debug, Default)]
struct PoolCounters {
    submitted: AtomicUsize,
    completed: AtomicUsize,
    panicked: AtomicUsize,
    in_flight: AtomicUsize,
    peak_in_flight: AtomicUsize,
}

impl PoolCounters {
    fn snapshot(&self) -> PoolStats {
        PoolStats {
            submitted: self.submitted.load(Ordering::Acquire),
            completed: self.completed.load(Ordering::Acquire),
            panicked: self.panicked.load(Ordering::Acquire),
            peak_in_flight: self.peak_in_flight.load(Ordering::Acquire),
        }
    }
}

/// Fixed-size worker pool
#[derive(Debug, Clone)]
pub struct WorkerPool {
    /// Number of workers
    size: usize,
    /// Statistics, shared with running workers
    counters: Arc<PoolCounters>,
}

impl WorkerPool {
    /// Create pool with `size` workers
    ///
    /// # Errors
    /// `PoolError::InvalidSize` if `size` is zero
    pub fn new(size: usize) -> Result<Self, PoolError> {
        if size == 0 {
            return Err(PoolError::InvalidSize(size));
        }
        Ok(Self {
            size,
            counters: Arc::new(PoolCounters::default()),
        })
    }

    /// Number of workers
    #[inline]
    #[must_use]
    pub fn size(&self) -> usize {
        self.size
    }

    /// Statistics accumulated over every dispatch
    #[inline]
    #[must_use]
    pub fn stats(&self) -> PoolStats {
        self.counters.snapshot()
    }

    /// Queue `items` and start workers running `job` over them
    ///
    /// The returned receiver yields one result per item, in completion
    /// order, and closes once every item has been processed. Must be
    /// called from within a Tokio runtime.
    pub fn dispatch<I, T, F, Fut>(
        &self,
        items: Vec<I>,
        job: F,
    ) -> mpsc::UnboundedReceiver<Result<T, PoolError>>
    where
        I: Send + 'static,
        T: Send + 'static,
        F: Fn(I) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = T> + Send + 'static,
    {
        let (result_tx, result_rx) = mpsc::unbounded_channel();
        let (queue_tx, queue_rx) = mpsc::unbounded_channel();

        let workers = self.size.min(items.len());
        self.counters
            .submitted
            .fetch_add(items.len(), Ordering::AcqRel);
        for item in items {
            // Receiver is alive until the workers below exit
            let _ = queue_tx.send(item);
        }
        drop(queue_tx);

        let queue = Arc::new(Mutex::new(queue_rx));
        let job = Arc::new(job);
        for _ in 0..workers {
            tokio::spawn(worker_task(
                Arc::clone(&queue),
                Arc::clone(&job),
                result_tx.clone(),
                Arc::clone(&self.counters),
            ));
        }

        tracing::debug!(workers, "Worker pool dispatched");
        result_rx
    }
}

/// Worker loop (runs in separate tokio task)
async fn worker_task<I, T, F, Fut>(
    queue: Arc<Mutex<mpsc::UnboundedReceiver<I>>>,
    job: Arc<F>,
    results: mpsc::UnboundedSender<Result<T, PoolError>>,
    counters: Arc<PoolCounters>,
) where
    I: Send + 'static,
    T: Send + 'static,
    F: Fn(I) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = T> + Send + 'static,
{
    loop {
        let next = queue.lock().await.recv().await;
        let Some(item) = next else {
            break;
        };

        let running = counters.in_flight.fetch_add(1, Ordering::AcqRel) + 1;
        counters.peak_in_flight.fetch_max(running, Ordering::AcqRel);

        let result = match tokio::spawn((*job)(item)).await {
            Ok(value) => {
                counters.completed.fetch_add(1, Ordering::AcqRel);
                Ok(value)
            }
            Err(e) => {
                counters.panicked.fetch_add(1, Ordering::AcqRel);
                Err(PoolError::TaskPanicked(e.to_string()))
            }
        };

        counters.in_flight.fetch_sub(1, Ordering::AcqRel);

        if results.send(result).is_err() {
            // Caller stopped listening
            break;
        }
    }
}
