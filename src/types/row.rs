//! Tracker row types.
//!
//! The tracker has one row per puzzle (plus optional placeholder rows for
//! rounds), with a fixed column layout:
//!
//! | col | field |
//! |-----|-------|
//! | A (0) | round name |
//! | B (1) | puzzle name |
//! | C (2) | priority |
//! | D (3) | puzzle URL |
//! | E (4) | document URL |
//! | F (5) | channel link |
//! | G (6) | status |
//! | H (7) | answer |

use std::fmt;

use serde::{Deserialize, Serialize};

pub const ROUND_COLUMN: usize = 0;
pub const PUZZLE_COLUMN: usize = 1;
pub const PRIORITY_COLUMN: usize = 2;
pub const PUZZLE_URL_COLUMN: usize = 3;
pub const DOCUMENT_URL_COLUMN: usize = 4;
pub const CHANNEL_COLUMN: usize = 5;
pub const STATUS_COLUMN: usize = 6;
pub const ANSWER_COLUMN: usize = 7;

/// Number of cells written when a row is inserted.
pub const ROW_WIDTH: usize = 7;

/// Round names hidden from selection lists (compared canonically).
pub const SUPPRESSED_ROUNDS: [&str; 3] = ["", "hunt", "meta"];

/// Round cell value marking the catch-all bucket new rounds are inserted above.
pub const EVENT_ROUND: &str = "Event";

/// Index of the first data row; rows above it are headers.
pub const FIRST_DATA_ROW: usize = 2;

/// Puzzle priority as shown in the tracker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Priority {
    /// `-`: nothing to do (solved, or a placeholder row).
    None,
    /// `L`: metas start here until their round is done.
    Low,
    /// `M`: default for freshly unlocked puzzles.
    Medium,
    /// `H`
    High,
}

impl Priority {
    pub fn as_cell(&self) -> &'static str {
        match self {
            Priority::None => "-",
            Priority::Low => "L",
            Priority::Medium => "M",
            Priority::High => "H",
        }
    }

    pub fn from_cell(cell: &str) -> Option<Self> {
        match cell {
            "-" => Some(Priority::None),
            "L" => Some(Priority::Low),
            "M" => Some(Priority::Medium),
            "H" => Some(Priority::High),
            _ => None,
        }
    }
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_cell())
    }
}

/// Puzzle status cell. Humans may type anything here; unknown text is kept.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Status {
    NotStarted,
    Solved,
    Backsolved,
    Other(String),
}

impl Status {
    pub fn as_cell(&self) -> &str {
        match self {
            Status::NotStarted => "Not started",
            Status::Solved => "Solved",
            Status::Backsolved => "Backsolved",
            Status::Other(text) => text,
        }
    }

    pub fn from_cell(cell: &str) -> Self {
        match cell {
            "Not started" => Status::NotStarted,
            "Solved" => Status::Solved,
            "Backsolved" => Status::Backsolved,
            other => Status::Other(other.to_string()),
        }
    }

    /// Returns true for `Solved` and `Backsolved`.
    pub fn is_solved(&self) -> bool {
        matches!(self, Status::Solved | Status::Backsolved)
    }
}

/// The seven cells written when a row is added to the tracker.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrackerRow {
    pub round_name: String,
    pub puzzle_name: String,
    /// `None` for placeholder rows, which leave the cell blank.
    pub priority: Option<Priority>,
    pub puzzle_url: String,
    pub document_url: String,
    /// Cell contents for the channel column, usually a link formula.
    pub channel_link: String,
    /// `None` for placeholder rows, which leave the cell blank.
    pub status: Option<Status>,
}

impl TrackerRow {
    /// A freshly unlocked puzzle with no document yet.
    pub fn unlocked(
        round_name: impl Into<String>,
        puzzle_name: impl Into<String>,
        priority: Priority,
        puzzle_url: impl Into<String>,
        channel_link: impl Into<String>,
    ) -> Self {
        TrackerRow {
            round_name: round_name.into(),
            puzzle_name: puzzle_name.into(),
            priority: Some(priority),
            puzzle_url: puzzle_url.into(),
            document_url: String::new(),
            channel_link: channel_link.into(),
            status: Some(Status::NotStarted),
        }
    }

    /// A placeholder row carrying only a round name.
    pub fn empty(round_name: impl Into<String>) -> Self {
        TrackerRow {
            round_name: round_name.into(),
            puzzle_name: String::new(),
            priority: None,
            puzzle_url: String::new(),
            document_url: String::new(),
            channel_link: String::new(),
            status: None,
        }
    }

    /// Cell contents in column order.
    pub fn cells(&self) -> [String; ROW_WIDTH] {
        [
            self.round_name.clone(),
            self.puzzle_name.clone(),
            self.priority
                .map(|p| p.as_cell().to_string())
                .unwrap_or_default(),
            self.puzzle_url.clone(),
            self.document_url.clone(),
            self.channel_link.clone(),
            self.status
                .as_ref()
                .map(|s| s.as_cell().to_string())
                .unwrap_or_default(),
        ]
    }
}
