//! Concurrency primitives
//!
//! Two shapes: a one-shot [`Task`] handle for starting an operation early
//! and joining it later, and an order-preserving parallel map. Both take an
//! [`ExecMode`]; `Serial` runs every operation inline in launch order so
//! tests can drive the reconciler deterministically.

use std::future::Future;
use std::pin::Pin;

use tokio::task::JoinHandle;

use crate::error::Result;

/// How tasks are executed
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ExecMode {
    /// Spawn onto the tokio runtime
    #[default]
    Parallel,
    /// Run inline, in launch order
    Serial,
}

/// A one-shot handle to an operation that may already be running.
///
/// In `Parallel` mode the operation is started immediately on a background
/// task; in `Serial` mode it runs when [`Task::join`] is awaited.
pub enum Task<T> {
    /// Running on the tokio runtime
    Spawned(JoinHandle<T>),
    /// Deferred, runs inline at join time
    Inline(Pin<Box<dyn Future<Output = T> + Send>>),
}

impl<T: Send + 'static> Task<T> {
    /// Launch `fut` according to `mode`
    pub fn spawn<F>(mode: ExecMode, fut: F) -> Self
    where
        F: Future<Output = T> + Send + 'static,
    {
        match mode {
            ExecMode::Parallel => Self::Spawned(tokio::spawn(fut)),
            ExecMode::Serial => Self::Inline(Box::pin(fut)),
        }
    }

    /// Wait for the operation and yield its output.
    ///
    /// Panics from the task are resumed on the joining thread.
    pub async fn join(self) -> T {
        match self {
            Self::Spawned(handle) => match handle.await {
                Ok(value) => value,
                Err(err) if err.is_panic() => std::panic::resume_unwind(err.into_panic()),
                Err(err) => panic!("task cancelled: {err}"),
            },
            Self::Inline(fut) => fut.await,
        }
    }
}

/// Run `f` over every item, preserving input order in the output.
///
/// All tasks run to completion even when some fail; the first error in
/// input order is returned after the whole batch has finished.
pub async fn try_map_ordered<I, O, F, Fut>(mode: ExecMode, items: Vec<I>, f: F) -> Result<Vec<O>>
where
    F: Fn(usize, I) -> Fut,
    Fut: Future<Output = Result<O>> + Send + 'static,
    O: Send + 'static,
{
    let mut results: Vec<Result<O>> = Vec::with_capacity(items.len());

    match mode {
        ExecMode::Parallel => {
            let handles: Vec<JoinHandle<Result<O>>> = items
                .into_iter()
                .enumerate()
                .map(|(i, item)| tokio::spawn(f(i, item)))
                .collect();
            for handle in handles {
                match handle.await {
                    Ok(result) => results.push(result),
                    Err(err) if err.is_panic() => std::panic::resume_unwind(err.into_panic()),
                    Err(err) => panic!("task cancelled: {err}"),
                }
            }
        }
        ExecMode::Serial => {
            for (i, item) in items.into_iter().enumerate() {
                results.push(f(i, item).await);
            }
        }
    }

    results.into_iter().collect()
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use std::time::Duration;

    use super::*;
    use crate::error::Error;

    #[tokio::test]
    async fn test_task_join() {
        let task = Task::spawn(ExecMode::Parallel, async { 1 + 2 });
        assert_eq!(task.join().await, 3);

        let task = Task::spawn(ExecMode::Serial, async { 1 + 2 });
        assert_eq!(task.join().await, 3);
    }

    #[tokio::test]
    async fn test_map_preserves_order() {
        // Sleep longest on the first item so parallel completion order is
        // (more likely) reversed from input order.
        let out = try_map_ordered(ExecMode::Parallel, vec![3u64, 2, 1], |_, i| async move {
            tokio::time::sleep(Duration::from_millis(i * 3)).await;
            Ok(i + 1)
        })
        .await
        .unwrap();
        assert_eq!(out, vec![4, 3, 2]);
    }

    #[tokio::test]
    async fn test_map_serial_runs_in_launch_order() {
        let order = Arc::new(std::sync::Mutex::new(Vec::new()));
        let out = try_map_ordered(ExecMode::Serial, vec![10, 20, 30], |i, item| {
            let order = order.clone();
            async move {
                order.lock().unwrap().push(item);
                Ok(i)
            }
        })
        .await
        .unwrap();
        assert_eq!(out, vec![0, 1, 2]);
        assert_eq!(*order.lock().unwrap(), vec![10, 20, 30]);
    }

    #[tokio::test]
    async fn test_map_completes_all_on_error() {
        for mode in [ExecMode::Parallel, ExecMode::Serial] {
            let completed = Arc::new(AtomicUsize::new(0));
            let result = try_map_ordered(mode, vec![0, 1, 2, 3], |_, i| {
                let completed = completed.clone();
                async move {
                    completed.fetch_add(1, Ordering::SeqCst);
                    if i == 1 {
                        Err(Error::Internal("boom".to_string()))
                    } else {
                        Ok(i)
                    }
                }
            })
            .await;
            assert!(result.is_err());
            assert_eq!(completed.load(Ordering::SeqCst), 4);
        }
    }
}
