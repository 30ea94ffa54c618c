//! The single worker that runs every task.
//!
//! All tracker and chat mutations happen here, one task at a time, in queue
//! order. That ordering is what keeps two simultaneous unlocks from both
//! reading the round column before either inserts its row.
//!
//! # Task flow
//!
//! 1. Dequeue the next task (wait if there is none)
//! 2. Run it to completion, including every remote call it makes
//! 3. On error or panic, log it with the task's sequence and kind, then carry on
//!
//! Slow side operations (document creation) run as [`Deferred`]s on their own
//! tokio tasks and come back as new tasks on the same queue.

use std::any::Any;
use std::panic::AssertUnwindSafe;

use futures::FutureExt;
use thiserror::Error;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, instrument, warn};

use crate::chat::dialog::{correct_view, newround_view, unlock_view};
use crate::chat::{ChannelCoordinator, ChatClient, ChatError, DialogKind};
use crate::documents::{DocumentClient, DocumentError};
use crate::tracker::{TrackerClient, TrackerError, TrackerMutator};
use crate::types::{Color, Priority, TrackerRow};

use super::deferred::{Deferred, requeue_when_ready};
use super::queue::{TaskQueue, TaskReceiver};
use super::task::{QueuedTask, Task};

/// Errors that end a single task.
#[derive(Debug, Error)]
pub enum TaskError {
    #[error("tracker error: {0}")]
    Tracker(#[from] TrackerError),

    #[error("chat error: {0}")]
    Chat(#[from] ChatError),

    #[error("document error: {0}")]
    Document(#[from] DocumentError),
}

pub type Result<T> = std::result::Result<T, TaskError>;

/// Behaviour switches for the worker.
#[derive(Debug, Clone, Copy)]
pub struct WorkerSettings {
    /// Whether a new round unlocks a "<Round> Meta" puzzle rather than an
    /// empty placeholder row.
    pub create_metas: bool,
}

impl Default for WorkerSettings {
    fn default() -> Self {
        WorkerSettings { create_metas: true }
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> &str {
    panic
        .downcast_ref::<&str>()
        .copied()
        .or_else(|| panic.downcast_ref::<String>().map(String::as_str))
        .unwrap_or("non-string panic payload")
}

/// Everything an unlock needs, for puzzles and metas alike.
struct Unlock<'a> {
    round_name: &'a str,
    puzzle_name: &'a str,
    puzzle_url: &'a str,
    response_url: Option<&'a str>,
    color: Option<Color>,
    meta: bool,
}

/// Owns the remote capabilities and the worker's memory.
///
/// `last_round` and the in-flight dialog messages (held by the
/// [`ChannelCoordinator`]) start empty at process start and are only touched
/// from the worker.
pub struct Coordinator<T, C, D> {
    tracker: TrackerMutator<T>,
    chat: ChannelCoordinator<C>,
    documents: D,
    queue: TaskQueue,
    settings: WorkerSettings,
    last_round: Option<String>,
}

impl<T, C, D> Coordinator<T, C, D>
where
    T: TrackerClient + Send + Sync,
    C: ChatClient + Send + Sync,
    D: DocumentClient + Clone + Send + Sync + 'static,
{
    /// `queue` is where follow-up tasks go; it should feed the receiver later
    /// passed to [`Coordinator::run`].
    pub fn new(
        tracker: TrackerMutator<T>,
        chat: ChannelCoordinator<C>,
        documents: D,
        queue: TaskQueue,
        settings: WorkerSettings,
    ) -> Self {
        Coordinator {
            tracker,
            chat,
            documents,
            queue,
            settings,
            last_round: None,
        }
    }

    /// The round most recently unlocked into, used as the dialog default.
    pub fn last_round(&self) -> Option<&str> {
        self.last_round.as_deref()
    }

    /// Runs tasks until shutdown or until every producer is gone.
    #[instrument(skip_all)]
    pub async fn run(mut self, mut rx: TaskReceiver, shutdown: CancellationToken) {
        info!("Worker started");
        loop {
            tokio::select! {
                _ = shutdown.cancelled() => {
                    info!("Shutdown signal received, stopping worker");
                    break;
                }

                queued = rx.recv() => {
                    let Some(QueuedTask { sequence, task }) = queued else {
                        info!("Task queue closed");
                        break;
                    };
                    let kind = task.kind();
                    debug!(sequence, kind, "Running task");
                    match AssertUnwindSafe(self.handle(task)).catch_unwind().await {
                        Ok(Ok(())) => {}
                        Ok(Err(e)) => error!(sequence, kind, error = %e, "Task failed"),
                        Err(panic) => {
                            error!(sequence, kind, panic = panic_message(&*panic), "Task panicked");
                        }
                    }
                }
            }
        }
        info!("Worker stopped");
    }

    /// Runs one task to completion.
    pub async fn handle(&mut self, task: Task) -> Result<()> {
        match task {
            Task::NewRound {
                round_name,
                round_url,
                color,
            } => self.new_round(&round_name, &round_url, color).await,
            Task::NewPuzzle {
                round_name,
                puzzle_name,
                puzzle_url,
                response_url,
            } => {
                self.unlock(Unlock {
                    round_name: &round_name,
                    puzzle_name: &puzzle_name,
                    puzzle_url: &puzzle_url,
                    response_url: response_url.as_deref(),
                    color: None,
                    meta: false,
                })
                .await
            }
            Task::SolvedPuzzle {
                puzzle_name,
                answer,
                response_url,
            } => {
                self.solved(&puzzle_name, &answer, response_url.as_deref())
                    .await
            }
            Task::FinishDocumentLink {
                puzzle_name,
                puzzle_url,
                channel_id,
                document_url,
            } => {
                self.finish_document_link(&puzzle_name, &puzzle_url, &channel_id, document_url)
                    .await
            }
            Task::ViewClosed { view_id } => Ok(self.chat.view_closed(&view_id).await?),
            Task::OpenDialog {
                dialog,
                trigger_id,
                user_id,
                channel_name,
            } => {
                self.open_dialog(dialog, &trigger_id, &user_id, channel_name.as_deref())
                    .await
            }
            Task::ArchiveChannel {
                channel_id,
                user_id,
                response_url,
                message,
            } => Ok(self
                .chat
                .archive_on_request(&channel_id, &user_id, &response_url, message)
                .await?),
        }
    }

    #[instrument(skip(self))]
    async fn new_round(
        &mut self,
        round_name: &str,
        round_url: &str,
        color: Option<Color>,
    ) -> Result<()> {
        if self.settings.create_metas {
            let meta_name = format!("{round_name} Meta");
            return self
                .unlock(Unlock {
                    round_name,
                    puzzle_name: &meta_name,
                    puzzle_url: round_url,
                    response_url: None,
                    color,
                    meta: true,
                })
                .await;
        }

        self.last_round = Some(round_name.to_string());
        let color = self.tracker.add_empty_row(round_name, color).await?;
        self.chat
            .announce_round(round_name, round_url, color)
            .await?;
        Ok(())
    }

    #[instrument(skip_all, fields(round = %request.round_name, puzzle = %request.puzzle_name))]
    async fn unlock(&mut self, request: Unlock<'_>) -> Result<()> {
        self.chat
            .acknowledge(
                request.response_url,
                &format!("Adding *{}*...", request.puzzle_name),
            )
            .await;

        if self.tracker.puzzle_exists(request.puzzle_name).await? {
            return Err(TrackerError::Duplicate {
                puzzle: request.puzzle_name.to_string(),
            }
            .into());
        }

        let documents = self.documents.clone();
        let document_name = request.puzzle_name.to_string();
        let document = Deferred::spawn(async move {
            documents.create_puzzle_document(&document_name).await
        });

        self.last_round = Some(request.round_name.to_string());
        let prefix = request.meta.then_some("meta");
        let channel = self.chat.create_channel(request.puzzle_url, prefix).await?;

        // The follow-up can't run before this task ends, so the row will be
        // there by the time it looks.
        let puzzle_name = request.puzzle_name.to_string();
        let puzzle_url = request.puzzle_url.to_string();
        let channel_id = channel.id.clone();
        requeue_when_ready(
            document,
            self.queue.clone(),
            format!("Creating document for {puzzle_name}"),
            move |document_url| Task::FinishDocumentLink {
                puzzle_name,
                puzzle_url,
                channel_id,
                document_url,
            },
        );

        let priority = if request.meta {
            Priority::Low
        } else {
            Priority::Medium
        };
        let row = TrackerRow::unlocked(
            request.round_name,
            request.puzzle_name,
            priority,
            request.puzzle_url,
            self.tracker.channel_link(&channel.name),
        );
        let color = self.tracker.add_row(&row, request.color).await?;

        if request.meta {
            self.chat
                .announce_round(request.round_name, request.puzzle_url, color)
                .await?;
        } else {
            self.chat
                .announce_unlock(
                    Some(request.round_name),
                    request.puzzle_name,
                    request.puzzle_url,
                    &channel,
                    color,
                )
                .await?;
        }
        info!(channel = %channel.name, "Unlocked puzzle");
        Ok(())
    }

    #[instrument(skip(self, document_url))]
    async fn finish_document_link(
        &mut self,
        puzzle_name: &str,
        puzzle_url: &str,
        channel_id: &str,
        document_url: String,
    ) -> Result<()> {
        let document_url = match self
            .tracker
            .set_document_url(puzzle_name, &document_url)
            .await
        {
            Ok(()) => document_url,
            Err(TrackerError::NotFound { .. }) => {
                error!(%document_url, "Puzzle is not in the tracker; leaving the document unlinked");
                document_url
            }
            Err(TrackerError::Ambiguous { matches, .. }) => {
                error!(%document_url, ?matches, "Puzzle matches several rows; leaving the document unlinked");
                document_url
            }
            Err(TrackerError::Conflict { found, discarded }) => {
                warn!(%found, %discarded, "Tracker already links a document; keeping it");
                found
            }
            Err(e) => return Err(e.into()),
        };
        self.chat
            .set_document_topic(channel_id, puzzle_url, &document_url)
            .await?;
        Ok(())
    }

    #[instrument(skip(self, response_url))]
    async fn solved(
        &mut self,
        puzzle_name: &str,
        answer: &str,
        response_url: Option<&str>,
    ) -> Result<()> {
        let answer = answer.to_uppercase();
        self.chat
            .acknowledge(response_url, &format!("Marking *{puzzle_name}* correct..."))
            .await;

        let found = self
            .tracker
            .lookup(puzzle_name)
            .await?
            .ok_or_else(|| TrackerError::NotFound {
                puzzle: puzzle_name.to_string(),
            })?;

        if found.document_url.contains("http") {
            self.documents
                .mark_document_solved(&found.document_url)
                .await?;
        }
        self.tracker.mark_solved(found.row_index, &answer).await?;

        match found.channel {
            Some(channel) => {
                let outcome = self.chat.solved(&channel, &answer).await?;
                debug!(%channel, ?outcome, "Announced solve");
            }
            None => info!("Puzzle has no channel to announce in"),
        }
        Ok(())
    }

    #[instrument(skip(self, trigger_id))]
    async fn open_dialog(
        &mut self,
        dialog: DialogKind,
        trigger_id: &str,
        user_id: &str,
        channel_name: Option<&str>,
    ) -> Result<()> {
        let view = match dialog {
            DialogKind::Unlock => {
                let rounds = self.tracker.all_rounds().await?;
                unlock_view(&rounds, self.last_round.as_deref())
            }
            DialogKind::Correct => {
                let (puzzles, default_puzzle) =
                    self.tracker.unsolved_puzzles_by_round(channel_name).await?;
                correct_view(&puzzles, default_puzzle.as_deref())
            }
            DialogKind::NewRound => newround_view(),
        };
        let view_id = self
            .chat
            .open_dialog(dialog, trigger_id, user_id, &view)
            .await?;
        debug!(%view_id, "Opened dialog");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::chat::{ChatEffect, MemoryChat};
    use crate::documents::MemoryDocuments;
    use crate::documents::memory::Folder;
    use crate::tracker::MemoryTracker;
    use crate::types::{ROUND_COLORS, channel_to_link};
    use crate::worker::queue::task_queue;

    const QM: &str = "CQM";
    const UNLOCKS: &str = "CUNLOCKS";
    const WORKSPACE: &str = "hunt";

    struct Harness {
        tracker: MemoryTracker,
        chat: MemoryChat,
        documents: MemoryDocuments,
        coordinator: Coordinator<MemoryTracker, MemoryChat, MemoryDocuments>,
        rx: TaskReceiver,
        queue: TaskQueue,
    }

    fn harness_with(tracker: MemoryTracker, settings: WorkerSettings) -> Harness {
        let chat = MemoryChat::new();
        let documents = MemoryDocuments::new();
        let (queue, rx) = task_queue();
        let coordinator = Coordinator::new(
            TrackerMutator::new(tracker.clone(), WORKSPACE),
            ChannelCoordinator::new(chat.clone(), QM, UNLOCKS),
            documents.clone(),
            queue.clone(),
            settings,
        );
        Harness {
            tracker,
            chat,
            documents,
            coordinator,
            rx,
            queue,
        }
    }

    fn harness() -> Harness {
        harness_with(MemoryTracker::new(), WorkerSettings::default())
    }

    fn new_puzzle(round: &str, puzzle: &str, url: &str) -> Task {
        Task::NewPuzzle {
            round_name: round.to_string(),
            puzzle_name: puzzle.to_string(),
            puzzle_url: url.to_string(),
            response_url: None,
        }
    }

    fn solved(puzzle: &str, answer: &str) -> Task {
        Task::SolvedPuzzle {
            puzzle_name: puzzle.to_string(),
            answer: answer.to_string(),
            response_url: None,
        }
    }

    async fn next_task(rx: &mut TaskReceiver) -> Task {
        tokio::time::timeout(Duration::from_secs(5), rx.recv())
            .await
            .expect("follow-up task in time")
            .expect("queue open")
            .task
    }

    #[tokio::test]
    async fn unlock_on_empty_tracker() {
        let mut h = harness();
        h.coordinator
            .handle(new_puzzle("Round1", "Puzzle1", "http://x/puzzle1"))
            .await
            .unwrap();

        assert_eq!(
            h.tracker.row(0),
            vec![
                "Round1",
                "Puzzle1",
                "M",
                "http://x/puzzle1",
                "",
                &channel_to_link(WORKSPACE, "puzzle1"),
                "Not started",
            ]
        );
        assert_eq!(h.tracker.background(0, 0), Some(ROUND_COLORS[0]));
        assert_eq!(h.chat.channel_names(), vec!["puzzle1"]);

        let channel_id = h.chat.channel_id("puzzle1").unwrap();
        assert_eq!(h.chat.topic(&channel_id).as_deref(), Some("http://x/puzzle1"));

        let announcement = &h.chat.messages_in(UNLOCKS)[0];
        assert_eq!(announcement.attachments[0].title, "Puzzle1");
        assert_eq!(
            announcement.attachments[0].color.as_deref(),
            Some(ROUND_COLORS[0].to_hex().as_str())
        );
        assert_eq!(h.coordinator.last_round(), Some("Round1"));
    }

    #[tokio::test]
    async fn document_link_comes_back_through_the_queue() {
        let mut h = harness();
        h.coordinator
            .handle(new_puzzle("Round1", "Puzzle1", "http://x/puzzle1"))
            .await
            .unwrap();

        let follow_up = next_task(&mut h.rx).await;
        let Task::FinishDocumentLink { document_url, .. } = &follow_up else {
            panic!("unexpected follow-up {follow_up:?}");
        };
        let document_url = document_url.clone();
        assert_eq!(h.documents.find(&document_url).unwrap().name, "Puzzle1");

        h.coordinator.handle(follow_up).await.unwrap();
        assert_eq!(h.tracker.row(0)[4], document_url);
        let channel_id = h.chat.channel_id("puzzle1").unwrap();
        assert_eq!(
            h.chat.topic(&channel_id).unwrap(),
            format!("http://x/puzzle1 | {document_url}")
        );
    }

    #[tokio::test]
    async fn document_link_conflict_keeps_existing_url() {
        let mut h = harness();
        h.coordinator
            .handle(new_puzzle("Round1", "Puzzle1", "http://x/puzzle1"))
            .await
            .unwrap();
        let channel_id = h.chat.channel_id("puzzle1").unwrap();

        let link = |url: &str| Task::FinishDocumentLink {
            puzzle_name: "Puzzle1".to_string(),
            puzzle_url: "http://x/puzzle1".to_string(),
            channel_id: channel_id.clone(),
            document_url: url.to_string(),
        };
        h.coordinator.handle(link("http://docs/a")).await.unwrap();
        h.coordinator.handle(link("http://docs/b")).await.unwrap();

        assert_eq!(h.tracker.row(0)[4], "http://docs/a");
        assert_eq!(
            h.chat.topic(&channel_id).unwrap(),
            "http://x/puzzle1 | http://docs/a"
        );
    }

    #[tokio::test]
    async fn document_link_for_missing_puzzle_still_sets_topic() {
        let mut h = harness();
        let channel_id = h.chat.add_channel("ghost");
        h.coordinator
            .handle(Task::FinishDocumentLink {
                puzzle_name: "Ghost".to_string(),
                puzzle_url: "http://x/ghost".to_string(),
                channel_id: channel_id.clone(),
                document_url: "http://docs/ghost".to_string(),
            })
            .await
            .unwrap();
        assert_eq!(
            h.chat.topic(&channel_id).unwrap(),
            "http://x/ghost | http://docs/ghost"
        );
    }

    #[tokio::test]
    async fn document_link_for_ambiguous_puzzle_still_sets_topic() {
        let mut h = harness();
        h.coordinator
            .handle(new_puzzle("Round1", "Alpha", "http://x/alpha"))
            .await
            .unwrap();
        h.coordinator
            .handle(new_puzzle("Round1", "Alpha Beta", "http://x/alpha-beta"))
            .await
            .unwrap();
        let channel_id = h.chat.channel_id("alpha").unwrap();

        h.coordinator
            .handle(Task::FinishDocumentLink {
                puzzle_name: "Alpha".to_string(),
                puzzle_url: "http://x/alpha".to_string(),
                channel_id: channel_id.clone(),
                document_url: "http://docs/alpha".to_string(),
            })
            .await
            .unwrap();

        assert_eq!(
            h.chat.topic(&channel_id).unwrap(),
            "http://x/alpha | http://docs/alpha"
        );
        assert_eq!(h.tracker.row(0)[4], "");
        assert_eq!(h.tracker.row(1)[4], "");
    }

    #[tokio::test]
    async fn failed_document_creation_still_unlocks() {
        let mut h = harness();
        h.documents.fail_creation();
        h.coordinator
            .handle(new_puzzle("Round1", "Puzzle1", "http://x/puzzle1"))
            .await
            .unwrap();
        assert_eq!(h.tracker.row(0)[1], "Puzzle1");

        tokio::time::sleep(Duration::from_millis(50)).await;
        assert!(h.rx.try_recv().is_none());
    }

    #[tokio::test]
    async fn duplicate_unlock_is_rejected() {
        let mut h = harness();
        h.coordinator
            .handle(new_puzzle("Round1", "Puzzle1", "http://x/puzzle1"))
            .await
            .unwrap();
        let err = h
            .coordinator
            .handle(new_puzzle("Round1", "puzzle 1", "http://x/puzzle1-again"))
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            TaskError::Tracker(TrackerError::Duplicate { .. })
        ));
        assert_eq!(h.chat.channel_names(), vec!["puzzle1"]);
    }

    #[tokio::test]
    async fn second_puzzle_joins_its_round() {
        let mut h = harness();
        h.coordinator
            .handle(new_puzzle("Round1", "Puzzle1", "http://x/puzzle1"))
            .await
            .unwrap();
        h.coordinator
            .handle(new_puzzle("Round2", "Puzzle2", "http://x/puzzle2"))
            .await
            .unwrap();
        h.coordinator
            .handle(new_puzzle("Round1", "Puzzle3", "http://x/puzzle3"))
            .await
            .unwrap();

        let puzzles: Vec<_> = (0..3).map(|i| h.tracker.row(i)[1].clone()).collect();
        assert_eq!(puzzles, vec!["Puzzle1", "Puzzle3", "Puzzle2"]);
    }

    #[tokio::test]
    async fn solve_with_active_channel_keeps_it_open() {
        let mut h = harness();
        h.coordinator
            .handle(new_puzzle("Round1", "Puzzle1", "http://x/puzzle1"))
            .await
            .unwrap();
        let channel_id = h.chat.channel_id("puzzle1").unwrap();
        h.chat.record_activity(&channel_id);

        h.coordinator
            .handle(solved("Puzzle1", "answer"))
            .await
            .unwrap();

        let row = h.tracker.row(0);
        assert_eq!(row[2], "-");
        assert_eq!(row[6], "Solved");
        assert_eq!(row[7], "ANSWER");
        assert!(!h.chat.is_archived(&channel_id));
        assert!(h.chat.messages_in(&channel_id)[0].text.contains("\"ANSWER\""));
    }

    #[tokio::test]
    async fn solve_with_quiet_channel_archives_it() {
        let mut h = harness();
        h.coordinator
            .handle(new_puzzle("Round1", "Puzzle1", "http://x/puzzle1"))
            .await
            .unwrap();
        let channel_id = h.chat.channel_id("puzzle1").unwrap();

        h.coordinator
            .handle(solved("Puzzle1", "ANSWER"))
            .await
            .unwrap();
        assert!(h.chat.is_archived(&channel_id));
        assert_eq!(h.tracker.row(0)[6], "Solved");
    }

    #[tokio::test]
    async fn solve_marks_linked_document() {
        let mut h = harness();
        h.coordinator
            .handle(new_puzzle("Round1", "Puzzle1", "http://x/puzzle1"))
            .await
            .unwrap();
        let follow_up = next_task(&mut h.rx).await;
        h.coordinator.handle(follow_up).await.unwrap();

        h.coordinator
            .handle(solved("Puzzle1", "ANSWER"))
            .await
            .unwrap();

        let document = &h.documents.documents()[0];
        assert_eq!(document.name, "[SOLVED] Puzzle1");
        assert_eq!(document.folder, Folder::Solved);
    }

    #[tokio::test]
    async fn solve_of_unknown_puzzle_fails() {
        let mut h = harness();
        let err = h
            .coordinator
            .handle(solved("Nothing", "ANSWER"))
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            TaskError::Tracker(TrackerError::NotFound { .. })
        ));
    }

    #[tokio::test]
    async fn new_round_unlocks_a_meta() {
        let mut h = harness();
        h.coordinator
            .handle(Task::NewRound {
                round_name: "Round2".to_string(),
                round_url: "http://x/round2".to_string(),
                color: None,
            })
            .await
            .unwrap();

        let row = h.tracker.row(0);
        assert_eq!(row[1], "Round2 Meta");
        assert_eq!(row[2], "L");
        assert_eq!(row[3], "http://x/round2");
        assert_eq!(h.chat.channel_names(), vec!["meta_round2"]);

        let announcement = &h.chat.messages_in(UNLOCKS)[0];
        assert_eq!(announcement.attachments[0].text, "*New round unlocked!*");
    }

    #[tokio::test]
    async fn new_round_without_metas_adds_placeholder() {
        let explicit = Color::new(0.2, 0.4, 0.6);
        let mut h = harness_with(
            MemoryTracker::new(),
            WorkerSettings {
                create_metas: false,
            },
        );
        h.coordinator
            .handle(Task::NewRound {
                round_name: "Round2".to_string(),
                round_url: "http://x/round2".to_string(),
                color: Some(explicit),
            })
            .await
            .unwrap();

        assert_eq!(h.tracker.row(0)[0], "Round2");
        assert_eq!(h.tracker.row(0)[1], "");
        assert_eq!(h.tracker.background(0, 0), Some(explicit));
        assert!(h.chat.channel_names().is_empty());
        assert_eq!(h.coordinator.last_round(), Some("Round2"));
    }

    #[tokio::test]
    async fn unlock_acknowledges_through_response_url() {
        let mut h = harness();
        h.coordinator
            .handle(Task::NewPuzzle {
                round_name: "Round1".to_string(),
                puzzle_name: "Puzzle1".to_string(),
                puzzle_url: "http://x/puzzle1".to_string(),
                response_url: Some("http://hooks/1".to_string()),
            })
            .await
            .unwrap();

        let acknowledged = h.chat.effects().into_iter().any(|effect| {
            matches!(
                effect,
                ChatEffect::Respond { response_url, body }
                    if response_url == "http://hooks/1" && body["text"] == "Adding *Puzzle1*..."
            )
        });
        assert!(acknowledged);
    }

    #[tokio::test]
    async fn dialog_in_flight_message_removed_on_close() {
        let mut h = harness();
        h.chat.add_user("U1", "alice");
        h.coordinator
            .handle(Task::OpenDialog {
                dialog: DialogKind::Unlock,
                trigger_id: "trigger".to_string(),
                user_id: "U1".to_string(),
                channel_name: None,
            })
            .await
            .unwrap();
        assert_eq!(
            h.chat.messages_in(QM)[0].text,
            "*alice* is adding an unlock..."
        );

        let view_id = h
            .chat
            .effects()
            .into_iter()
            .find_map(|effect| match effect {
                ChatEffect::OpenView { view_id, .. } => Some(view_id),
                _ => None,
            })
            .unwrap();
        h.coordinator
            .handle(Task::ViewClosed { view_id })
            .await
            .unwrap();
        assert!(h.chat.messages_in(QM).is_empty());
    }

    #[tokio::test]
    async fn run_loop_survives_failed_tasks() {
        let h = harness();
        let shutdown = CancellationToken::new();
        let worker = tokio::spawn(h.coordinator.run(h.rx, shutdown.clone()));

        h.queue.enqueue(solved("Missing", "ANSWER"));
        h.queue
            .new_puzzle("Round1", "Puzzle1", "http://x/puzzle1", None);

        let deadline = tokio::time::Instant::now() + Duration::from_secs(5);
        while h.tracker.row(0).is_empty() {
            assert!(tokio::time::Instant::now() < deadline, "worker stalled");
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        assert_eq!(h.tracker.row(0)[1], "Puzzle1");

        shutdown.cancel();
        worker.await.unwrap();
    }

    /// Documents that blow up when a puzzle is marked solved.
    #[derive(Clone)]
    struct ExplodingDocuments(MemoryDocuments);

    impl DocumentClient for ExplodingDocuments {
        async fn create_puzzle_document(
            &self,
            puzzle_name: &str,
        ) -> std::result::Result<String, DocumentError> {
            self.0.create_puzzle_document(puzzle_name).await
        }

        async fn mark_document_solved(
            &self,
            _document_url: &str,
        ) -> std::result::Result<(), DocumentError> {
            panic!("document service exploded");
        }
    }

    #[tokio::test]
    async fn run_loop_survives_panicking_tasks() {
        let tracker = MemoryTracker::with_rows([[
            "Round1",
            "Boom",
            "M",
            "http://x/boom",
            "http://docs/boom",
            "",
            "Not started",
        ]]);
        let (queue, rx) = task_queue();
        let coordinator = Coordinator::new(
            TrackerMutator::new(tracker.clone(), WORKSPACE),
            ChannelCoordinator::new(MemoryChat::new(), QM, UNLOCKS),
            ExplodingDocuments(MemoryDocuments::new()),
            queue.clone(),
            WorkerSettings::default(),
        );
        let shutdown = CancellationToken::new();
        let worker = tokio::spawn(coordinator.run(rx, shutdown.clone()));

        queue.enqueue(solved("Boom", "ANSWER"));
        queue.new_puzzle("Round1", "Puzzle1", "http://x/puzzle1", None);

        let deadline = tokio::time::Instant::now() + Duration::from_secs(5);
        while tracker.row(1).is_empty() {
            assert!(tokio::time::Instant::now() < deadline, "worker stalled");
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        assert_eq!(tracker.row(1)[1], "Puzzle1");
        assert_eq!(tracker.row(0)[6], "Not started");

        shutdown.cancel();
        worker.await.unwrap();
    }

    #[test]
    fn panic_messages_are_extracted() {
        let literal: Box<dyn Any + Send> = Box::new("static");
        let formatted: Box<dyn Any + Send> = Box::new(format!("row {}", 3));
        let other: Box<dyn Any + Send> = Box::new(7u8);
        assert_eq!(panic_message(&*literal), "static");
        assert_eq!(panic_message(&*formatted), "row 3");
        assert_eq!(panic_message(&*other), "non-string panic payload");
    }
}
