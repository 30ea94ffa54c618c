//! The task queue feeding the single worker.
//!
//! Any number of producers (request handlers, deferred completions) enqueue
//! tasks; exactly one consumer drains them. Every task gets a sequence number
//! under the same lock that sends it, so sequence order is delivery order.

use std::sync::{Arc, Mutex, PoisonError};

use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TryRecvError;
use tracing::{debug, error};

use super::task::{QueuedTask, Task};

#[derive(Debug)]
struct Sender {
    tx: mpsc::UnboundedSender<QueuedTask>,
    next_sequence: u64,
}

/// The producer side. Cheap to clone; all clones feed the same worker.
#[derive(Debug, Clone)]
pub struct TaskQueue {
    sender: Arc<Mutex<Sender>>,
}

/// The consumer side, owned by the worker.
#[derive(Debug)]
pub struct TaskReceiver {
    rx: mpsc::UnboundedReceiver<QueuedTask>,
}

/// Creates a connected queue and receiver.
pub fn task_queue() -> (TaskQueue, TaskReceiver) {
    let (tx, rx) = mpsc::unbounded_channel();
    let queue = TaskQueue {
        sender: Arc::new(Mutex::new(Sender {
            tx,
            next_sequence: 0,
        })),
    };
    (queue, TaskReceiver { rx })
}

impl TaskQueue {
    /// Appends a task. Never blocks and never fails; if the worker has shut
    /// down the task is logged and dropped.
    pub fn enqueue(&self, task: Task) {
        let mut sender = self.sender.lock().unwrap_or_else(PoisonError::into_inner);
        let sequence = sender.next_sequence;
        sender.next_sequence += 1;
        let kind = task.kind();
        match sender.tx.send(QueuedTask { sequence, task }) {
            Ok(()) => debug!(sequence, kind, "Enqueued task"),
            Err(dropped) => error!(
                sequence,
                kind,
                task = ?dropped.0.task,
                "Worker is gone; dropping task"
            ),
        }
    }

    pub fn new_puzzle(
        &self,
        round_name: &str,
        puzzle_name: &str,
        puzzle_url: &str,
        response_url: Option<&str>,
    ) {
        self.enqueue(Task::NewPuzzle {
            round_name: round_name.to_string(),
            puzzle_name: puzzle_name.to_string(),
            puzzle_url: puzzle_url.to_string(),
            response_url: response_url.map(str::to_string),
        });
    }

    pub fn solved_puzzle(&self, puzzle_name: &str, answer: &str, response_url: Option<&str>) {
        self.enqueue(Task::SolvedPuzzle {
            puzzle_name: puzzle_name.to_string(),
            answer: answer.to_string(),
            response_url: response_url.map(str::to_string),
        });
    }

    pub fn view_closed(&self, view_id: &str) {
        self.enqueue(Task::ViewClosed {
            view_id: view_id.to_string(),
        });
    }
}

impl TaskReceiver {
    /// Waits for the next task. `None` once every producer is gone.
    pub async fn recv(&mut self) -> Option<QueuedTask> {
        self.rx.recv().await
    }

    /// Takes the next task if one is ready.
    pub fn try_recv(&mut self) -> Option<QueuedTask> {
        match self.rx.try_recv() {
            Ok(task) => Some(task),
            Err(TryRecvError::Empty | TryRecvError::Disconnected) => None,
        }
    }

    /// Takes every ready task.
    pub fn drain(&mut self) -> Vec<QueuedTask> {
        std::iter::from_fn(|| self.try_recv()).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn view(id: &str) -> Task {
        Task::ViewClosed {
            view_id: id.to_string(),
        }
    }

    #[test]
    fn single_producer_is_fifo() {
        let (queue, mut rx) = task_queue();
        queue.view_closed("a");
        queue.view_closed("b");
        queue.view_closed("c");

        let tasks = rx.drain();
        let ids: Vec<_> = tasks.iter().map(|t| t.sequence).collect();
        assert_eq!(ids, vec![0, 1, 2]);
        assert_eq!(tasks[0].task, view("a"));
        assert_eq!(tasks[2].task, view("c"));
    }

    #[test]
    fn empty_receiver_yields_nothing() {
        let (_queue, mut rx) = task_queue();
        assert!(rx.try_recv().is_none());
    }

    #[test]
    fn enqueue_after_worker_gone_does_not_panic() {
        let (queue, rx) = task_queue();
        drop(rx);
        queue.view_closed("lost");
    }

    #[tokio::test]
    async fn recv_ends_when_producers_drop() {
        let (queue, mut rx) = task_queue();
        queue.solved_puzzle("Puzzle1", "ANSWER", None);
        drop(queue);
        assert!(rx.recv().await.is_some());
        assert!(rx.recv().await.is_none());
    }

    #[test]
    fn clones_share_the_sequence() {
        let (queue, mut rx) = task_queue();
        let other = queue.clone();
        queue.view_closed("a");
        other.view_closed("b");
        queue.view_closed("c");
        let seqs: Vec<_> = rx.drain().into_iter().map(|t| t.sequence).collect();
        assert_eq!(seqs, vec![0, 1, 2]);
    }

    proptest! {
        /// Concurrent producers: each producer's tasks come out in its own
        /// order, and the sequence numbers the worker sees strictly increase.
        #[test]
        fn prop_per_producer_fifo(counts in prop::collection::vec(1usize..20, 1..6)) {
            let (queue, mut rx) = task_queue();
            std::thread::scope(|scope| {
                for (producer, &count) in counts.iter().enumerate() {
                    let queue = queue.clone();
                    scope.spawn(move || {
                        for i in 0..count {
                            queue.view_closed(&format!("{producer}:{i}"));
                        }
                    });
                }
            });

            let tasks = rx.drain();
            prop_assert_eq!(tasks.len(), counts.iter().sum::<usize>());

            for pair in tasks.windows(2) {
                prop_assert!(pair[0].sequence < pair[1].sequence);
            }

            let mut next = vec![0usize; counts.len()];
            for queued in &tasks {
                let Task::ViewClosed { view_id } = &queued.task else {
                    panic!("unexpected task {:?}", queued.task);
                };
                let (producer, i) = view_id.split_once(':').unwrap();
                let producer: usize = producer.parse().unwrap();
                let i: usize = i.parse().unwrap();
                prop_assert_eq!(i, next[producer]);
                next[producer] += 1;
            }
        }
    }
}
