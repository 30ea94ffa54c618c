//! The closed set of work items the worker runs.
//!
//! Tasks carry everything they need by value, so the queue's contents can be
//! logged, serialized and compared in tests.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::chat::DialogKind;
use crate::types::Color;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Task {
    /// A round was unlocked.
    NewRound {
        round_name: String,
        round_url: String,
        /// Explicit round color; presets are used when absent.
        color: Option<Color>,
    },

    /// A puzzle was unlocked.
    NewPuzzle {
        round_name: String,
        puzzle_name: String,
        puzzle_url: String,
        /// Where to post an ephemeral acknowledgment, if anywhere.
        response_url: Option<String>,
    },

    /// A puzzle's answer was confirmed.
    SolvedPuzzle {
        puzzle_name: String,
        answer: String,
        response_url: Option<String>,
    },

    /// A puzzle's document is ready; back-fill the tracker and channel topic.
    FinishDocumentLink {
        puzzle_name: String,
        puzzle_url: String,
        channel_id: String,
        document_url: String,
    },

    /// A dialog was closed or submitted.
    ViewClosed { view_id: String },

    /// Open a dialog for a slash command issued without arguments.
    OpenDialog {
        dialog: DialogKind,
        trigger_id: String,
        user_id: String,
        /// The channel the command was issued in.
        channel_name: Option<String>,
    },

    /// Someone pressed the archive button on a solve announcement.
    ArchiveChannel {
        channel_id: String,
        user_id: String,
        response_url: String,
        /// The announcement, as received with the button press.
        message: Map<String, Value>,
    },
}

impl Task {
    /// Short name for logs.
    pub fn kind(&self) -> &'static str {
        match self {
            Task::NewRound { .. } => "new_round",
            Task::NewPuzzle { .. } => "new_puzzle",
            Task::SolvedPuzzle { .. } => "solved_puzzle",
            Task::FinishDocumentLink { .. } => "finish_document_link",
            Task::ViewClosed { .. } => "view_closed",
            Task::OpenDialog { .. } => "open_dialog",
            Task::ArchiveChannel { .. } => "archive_channel",
        }
    }
}

/// A task with its position in the global order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueuedTask {
    pub sequence: u64,
    pub task: Task,
}
