//! Bounded worker pool for lifecycle operations.

use crate::error::{RegistryError, Result};
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};
use tokio::sync::Semaphore;
use tokio::task::JoinHandle;
use tokio_util::task::TaskTracker;

/// Runs submitted tasks on the tokio runtime, at most `size` at a time.
#[derive(Debug, Clone)]
pub struct WorkerPool {
    permits: Arc<Semaphore>,
    tracker: TaskTracker,
    size: usize,
}

impl WorkerPool {
    /// Creates a pool running at most `size` tasks concurrently (minimum 1).
    #[must_use]
    pub fn new(size: usize) -> Self {
        let size = size.max(1);
        Self {
            permits: Arc::new(Semaphore::new(size)),
            tracker: TaskTracker::new(),
            size,
        }
    }

    /// Maximum number of concurrently running tasks.
    #[must_use]
    pub fn size(&self) -> usize {
        self.size
    }

    /// Number of submitted tasks that have not finished.
    #[must_use]
    pub fn in_flight(&self) -> usize {
        self.tracker.len()
    }

    /// Returns true once [`close`](Self::close) was called.
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.tracker.is_closed()
    }

    /// Submits a task. After [`close`](Self::close) the handle resolves to
    /// [`RegistryError::ShuttingDown`] without running the task.
    ///
    /// Must be called from within a tokio runtime.
    pub fn submit<F, T>(&self, task: F) -> TaskHandle<T>
    where
        F: Future<Output = Result<T>> + Send + 'static,
        T: Send + 'static,
    {
        if self.tracker.is_closed() {
            return TaskHandle::ready(Err(RegistryError::ShuttingDown));
        }
        let permits = self.permits.clone();
        let handle = self.tracker.spawn(async move {
            let _permit = permits
                .acquire_owned()
                .await
                .map_err(|_| RegistryError::ShuttingDown)?;
            task.await
        });
        TaskHandle {
            inner: HandleInner::Spawned(handle),
        }
    }

    /// Stops accepting tasks. Running and queued tasks still complete.
    pub fn close(&self) {
        self.tracker.close();
    }

    /// Waits until the pool is closed and every task has finished.
    pub async fn wait(&self) {
        self.tracker.wait().await;
    }
}

/// Completion handle of a pooled task.
///
/// Awaiting it yields the task's result; a panicked task yields
/// [`RegistryError::TaskFailed`]. Dropping the handle does not cancel the task.
#[must_use = "a TaskHandle does nothing unless awaited; the task runs regardless"]
pub struct TaskHandle<T> {
    inner: HandleInner<T>,
}

enum HandleInner<T> {
    Spawned(JoinHandle<Result<T>>),
    Ready(Option<Result<T>>),
}

impl<T> TaskHandle<T> {
    /// A handle that is already complete.
    pub fn ready(result: Result<T>) -> Self {
        Self {
            inner: HandleInner::Ready(Some(result)),
        }
    }

    /// Returns true if the task has finished.
    #[must_use]
    pub fn is_finished(&self) -> bool {
        match &self.inner {
            HandleInner::Spawned(handle) => handle.is_finished(),
            HandleInner::Ready(_) => true,
        }
    }
}

impl<T> Unpin for TaskHandle<T> {}

impl<T> Future for TaskHandle<T> {
    type Output = Result<T>;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        match &mut self.get_mut().inner {
            HandleInner::Spawned(handle) => Pin::new(handle).poll(cx).map(|joined| {
                joined.unwrap_or_else(|err| {
                    Err(RegistryError::TaskFailed {
                        message: err.to_string(),
                    })
                })
            }),
            HandleInner::Ready(result) => Poll::Ready(result.take().unwrap_or_else(|| {
                Err(RegistryError::TaskFailed {
                    message: "handle polled after completion".to_string(),
                })
            })),
        }
    }
}

impl<T> std::fmt::Debug for TaskHandle<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TaskHandle")
            .field("finished", &self.is_finished())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    #[tokio::test]
    async fn test_submit_returns_result() {
        let pool = WorkerPool::new(2);
        assert_eq!(pool.submit(async { Ok(7) }).await.unwrap(), 7);
        let err = pool
            .submit(async { Err::<(), _>(RegistryError::Cancelled) })
            .await
            .unwrap_err();
        assert!(matches!(err, RegistryError::Cancelled));
    }

    #[tokio::test]
    async fn test_panicking_task_reports_failure() {
        let pool = WorkerPool::new(1);
        let fail = true;
        let handle = pool.submit(async move {
            if fail {
                panic!("task bug");
            }
            Ok(())
        });
        assert!(matches!(handle.await, Err(RegistryError::TaskFailed { .. })));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrency_is_bounded() {
        let pool = WorkerPool::new(2);
        let running = Arc::new(AtomicUsize::new(0));
        let peak = Arc::new(AtomicUsize::new(0));

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let running = running.clone();
                let peak = peak.clone();
                pool.submit(async move {
                    let now = running.fetch_add(1, Ordering::SeqCst) + 1;
                    peak.fetch_max(now, Ordering::SeqCst);
                    tokio::time::sleep(Duration::from_millis(20)).await;
                    running.fetch_sub(1, Ordering::SeqCst);
                    Ok(())
                })
            })
            .collect();
        for handle in handles {
            handle.await.unwrap();
        }
        assert!(peak.load(Ordering::SeqCst) <= 2);
        assert_eq!(pool.in_flight(), 0);
    }

    #[tokio::test]
    async fn test_closed_pool_rejects() {
        let pool = WorkerPool::new(1);
        let slow = pool.submit(async {
            tokio::time::sleep(Duration::from_millis(10)).await;
            Ok(1)
        });
        pool.close();
        assert!(matches!(
            pool.submit(async { Ok(2) }).await,
            Err(RegistryError::ShuttingDown)
        ));
        pool.wait().await;
        assert_eq!(pool.in_flight(), 0);
        assert_eq!(slow.await.unwrap(), 1);
    }
}
