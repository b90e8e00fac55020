//! Command queue guarding the BLE radio.
//!
//! A single worker runs submitted tasks one at a time in submission order.
//! Task starts are spaced by at least the configured control interval,
//! because device firmware drops BLE writes that arrive back to back. Each
//! task is bounded by a timeout; on expiry the caller's wait is rejected and
//! the task is left to finish on its own.

use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use futures::future::{BoxFuture, FutureExt};
use serde::{Deserialize, Serialize};
use tokio::sync::{mpsc, oneshot};
use tokio::time::Instant;

/// Default time budget of a single task.
pub const DEFAULT_TASK_TIMEOUT: Duration = Duration::from_secs(10);

type Job = BoxFuture<'static, ()>;

/// Queue configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueueConfig {
    /// Minimum spacing between task starts
    pub interval: Duration,
    /// Time budget of a single task
    pub task_timeout: Duration,
    /// Maximum number of waiting tasks before `submit` waits for room
    pub capacity: usize,
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(5),
            task_timeout: DEFAULT_TASK_TIMEOUT,
            capacity: 1000,
        }
    }
}

/// Queue statistics.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct QueueStats {
    /// Number of tasks accepted
    pub submitted: u64,
    /// Number of tasks that ran to completion
    pub completed: u64,
    /// Number of tasks that exceeded their time budget
    pub timed_out: u64,
    /// Number of tasks that panicked
    pub failed: u64,
    /// Tasks accepted but not finished
    pub pending: u64,
}

#[derive(Default)]
struct Counters {
    submitted: AtomicU64,
    completed: AtomicU64,
    timed_out: AtomicU64,
    failed: AtomicU64,
}

/// Single-concurrency, interval-paced task queue.
pub struct CommandQueue {
    sender: mpsc::Sender<Job>,
    counters: Arc<Counters>,
    config: QueueConfig,
}

impl CommandQueue {
    /// Create a queue and spawn its worker on the current tokio runtime.
    pub fn new(config: QueueConfig) -> Self {
        let (sender, receiver) = mpsc::channel(config.capacity.max(1));
        tokio::spawn(run_worker(receiver, config.interval));

        Self {
            sender,
            counters: Arc::new(Counters::default()),
            config,
        }
    }

    /// Queue configuration.
    pub fn config(&self) -> &QueueConfig {
        &self.config
    }

    /// Run `task` on the queue and wait for its output.
    pub async fn submit<F, T>(&self, task: F) -> Result<T, QueueError>
    where
        F: Future<Output = T> + Send + 'static,
        T: Send + 'static,
    {
        let (tx, rx) = oneshot::channel();
        let counters = self.counters.clone();
        let budget = self.config.task_timeout;

        let job: Job = async move {
            // Spawned so a timed-out task keeps running detached.
            let handle = tokio::spawn(task);
            let outcome = match tokio::time::timeout(budget, handle).await {
                Ok(Ok(output)) => {
                    counters.completed.fetch_add(1, Ordering::Release);
                    Ok(output)
                }
                Ok(Err(e)) => {
                    counters.failed.fetch_add(1, Ordering::Release);
                    Err(QueueError::Failed(e.to_string()))
                }
                Err(_) => {
                    counters.timed_out.fetch_add(1, Ordering::Release);
                    tracing::warn!("Queued task exceeded {:?}, abandoning wait", budget);
                    Err(QueueError::Timeout(budget))
                }
            };
            let _ = tx.send(outcome);
        }
        .boxed();

        // Counted before the worker can see the job, so `completed` never
        // runs ahead of `submitted`.
        self.counters.submitted.fetch_add(1, Ordering::Relaxed);
        if self.sender.send(job).await.is_err() {
            self.counters.submitted.fetch_sub(1, Ordering::Relaxed);
            return Err(QueueError::Closed);
        }

        rx.await.map_err(|_| QueueError::Closed)?
    }

    /// Get queue statistics.
    pub fn stats(&self) -> QueueStats {
        // Finished counters first: every finished task was counted as
        // submitted before it reached the worker.
        let completed = self.counters.completed.load(Ordering::Acquire);
        let timed_out = self.counters.timed_out.load(Ordering::Acquire);
        let failed = self.counters.failed.load(Ordering::Acquire);
        let submitted = self.counters.submitted.load(Ordering::Acquire);

        QueueStats {
            submitted,
            completed,
            timed_out,
            failed,
            pending: submitted.saturating_sub(completed + timed_out + failed),
        }
    }

    /// Check if the worker is still accepting tasks.
    pub fn is_closed(&self) -> bool {
        self.sender.is_closed()
    }
}

async fn run_worker(mut receiver: mpsc::Receiver<Job>, interval: Duration) {
    let mut next_start: Option<Instant> = None;

    while let Some(job) = receiver.recv().await {
        if let Some(at) = next_start {
            tokio::time::sleep_until(at).await;
        }
        next_start = Some(Instant::now() + interval);
        job.await;
    }

    tracing::debug!("Command queue worker stopped");
}

/// Queue error types.
#[derive(Debug, Clone, thiserror::Error, PartialEq, Eq)]
pub enum QueueError {
    #[error("Queued task timed out after {0:?}")]
    Timeout(Duration),

    #[error("Queue is closed")]
    Closed,

    #[error("Queued task failed: {0}")]
    Failed(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(interval_ms: u64) -> QueueConfig {
        QueueConfig {
            interval: Duration::from_millis(interval_ms),
            ..Default::default()
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_queue_returns_task_output() {
        let queue = CommandQueue::new(config(100));
        let value = queue.submit(async { 41 + 1 }).await.unwrap();
        assert_eq!(value, 42);

        let stats = queue.stats();
        assert_eq!(stats.submitted, 1);
        assert_eq!(stats.completed, 1);
        assert_eq!(stats.pending, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_queue_timeout() {
        let queue = CommandQueue::new(config(0));
        let result = queue
            .submit(async {
                tokio::time::sleep(Duration::from_secs(30)).await;
            })
            .await;
        assert_eq!(result, Err(QueueError::Timeout(DEFAULT_TASK_TIMEOUT)));
        assert_eq!(queue.stats().timed_out, 1);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_completed_never_exceeds_submitted() {
        let queue = Arc::new(CommandQueue::new(config(0)));

        let watcher = {
            let queue = queue.clone();
            tokio::spawn(async move {
                for _ in 0..2000 {
                    let stats = queue.stats();
                    assert!(stats.completed + stats.failed + stats.timed_out <= stats.submitted);
                    tokio::task::yield_now().await;
                }
            })
        };

        for i in 0..200 {
            assert_eq!(queue.submit(async move { i }).await.unwrap(), i);
        }
        watcher.await.unwrap();
        assert_eq!(queue.stats().submitted, 200);
        assert_eq!(queue.stats().completed, 200);
    }

    #[tokio::test]
    async fn test_closed_submit_is_not_counted() {
        let (sender, receiver) = mpsc::channel(1);
        drop(receiver);
        let queue = CommandQueue {
            sender,
            counters: Arc::new(Counters::default()),
            config: config(0),
        };

        assert_eq!(queue.submit(async {}).await, Err(QueueError::Closed));
        assert_eq!(queue.stats().submitted, 0);
        assert!(queue.is_closed());
    }

    #[tokio::test(start_paused = true)]
    async fn test_queue_panicking_task() {
        let queue = CommandQueue::new(config(0));
        let result: Result<(), _> = queue.submit(async { panic!("boom") }).await;
        assert!(matches!(result, Err(QueueError::Failed(_))));
        assert_eq!(queue.stats().failed, 1);

        // The worker survives.
        assert_eq!(queue.submit(async { 7 }).await.unwrap(), 7);
    }
}
