//! Slow operations that finish off the worker.
//!
//! A [`Deferred`] runs its future on its own tokio task. The worker never
//! waits on it; instead [`requeue_when_ready`] turns the result into a new
//! task on the queue, so the follow-up runs in order with everything else.

use std::fmt::Display;
use std::future::Future;

use thiserror::Error;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tracing::{debug, error};

use super::queue::TaskQueue;
use super::task::Task;

#[derive(Debug, Error)]
pub enum DeferredError<E> {
    #[error("deferred operation failed: {0}")]
    Failed(E),

    #[error("deferred operation was abandoned before completing")]
    Abandoned,
}

/// A value that will be produced at most once.
#[derive(Debug)]
pub struct Deferred<T, E> {
    rx: oneshot::Receiver<Result<T, E>>,
}

impl<T, E> Deferred<T, E>
where
    T: Send + 'static,
    E: Send + 'static,
{
    /// Starts `future` in the background.
    pub fn spawn<F>(future: F) -> Self
    where
        F: Future<Output = Result<T, E>> + Send + 'static,
    {
        let (tx, rx) = oneshot::channel();
        tokio::spawn(async move {
            // Nobody listening is fine.
            let _ = tx.send(future.await);
        });
        Deferred { rx }
    }

    /// A deferred that is already resolved.
    pub fn ready(result: Result<T, E>) -> Self {
        let (tx, rx) = oneshot::channel();
        let _ = tx.send(result);
        Deferred { rx }
    }

    pub async fn wait(self) -> Result<T, DeferredError<E>> {
        match self.rx.await {
            Ok(Ok(value)) => Ok(value),
            Ok(Err(e)) => Err(DeferredError::Failed(e)),
            Err(_) => Err(DeferredError::Abandoned),
        }
    }
}

/// When `deferred` succeeds, enqueue `continuation(value)`. On failure, log
/// and enqueue nothing.
pub fn requeue_when_ready<T, E, F>(
    deferred: Deferred<T, E>,
    queue: TaskQueue,
    description: String,
    continuation: F,
) -> JoinHandle<()>
where
    T: Send + 'static,
    E: Display + Send + 'static,
    F: FnOnce(T) -> Task + Send + 'static,
{
    tokio::spawn(async move {
        match deferred.wait().await {
            Ok(value) => {
                debug!(%description, "Deferred operation finished");
                queue.enqueue(continuation(value));
            }
            Err(e) => error!(%description, error = %e, "Deferred operation did not complete"),
        }
    })
}
