//! Validated commands.
//!
//! Slash commands and dialog submissions both end up here, so the worker only
//! ever sees typed arguments.

use serde::{Deserialize, Serialize};

use crate::types::Color;
use crate::worker::Task;

/// A command that passed validation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "command", rename_all = "snake_case")]
pub enum Command {
    /// `/unlock Puzzle Name https://example.com/puzzle Round Name`
    Unlock {
        puzzle_name: String,
        puzzle_url: String,
        round_name: String,
    },

    /// `/correct Puzzle Name PUZZLE SOLUTION`
    Correct { puzzle_name: String, answer: String },

    /// `/newround Round Name https://example.com/round`
    ///
    /// Only the dialog can set a color.
    NewRound {
        round_name: String,
        round_url: String,
        color: Option<Color>,
    },
}

impl Command {
    /// The ephemeral reply sent as soon as the command is accepted.
    pub fn acknowledgment(&self) -> String {
        match self {
            Command::Unlock { puzzle_name, .. } => format!("Adding {puzzle_name}..."),
            Command::Correct { puzzle_name, .. } => format!("Marking {puzzle_name} solved..."),
            Command::NewRound { round_name, .. } => format!("Adding {round_name}..."),
        }
    }

    /// The task that carries the command out.
    pub fn into_task(self, response_url: Option<String>) -> Task {
        match self {
            Command::Unlock {
                puzzle_name,
                puzzle_url,
                round_name,
            } => Task::NewPuzzle {
                round_name,
                puzzle_name,
                puzzle_url,
                response_url,
            },
            Command::Correct {
                puzzle_name,
                answer,
            } => Task::SolvedPuzzle {
                puzzle_name,
                answer,
                response_url,
            },
            Command::NewRound {
                round_name,
                round_url,
                color,
            } => Task::NewRound {
                round_name,
                round_url,
                color,
            },
        }
    }
}
