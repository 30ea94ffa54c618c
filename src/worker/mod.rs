//! The serialized task pipeline.
//!
//! Every mutation of the tracker or the chat workspace runs on one worker,
//! strictly in enqueue order.
//!
//! - [`task`]: the closed set of task variants
//! - [`queue`]: the multi-producer, single-consumer queue
//! - [`deferred`]: slow operations that rejoin the queue when done
//! - [`worker`]: the coordinator that runs tasks

pub mod deferred;
pub mod queue;
pub mod task;
#[allow(clippy::module_inception)]
pub mod worker;

pub use deferred::{Deferred, DeferredError, requeue_when_ready};
pub use queue::{TaskQueue, TaskReceiver, task_queue};
pub use task::{QueuedTask, Task};
pub use worker::{Coordinator, TaskError, WorkerSettings};
