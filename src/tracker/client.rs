//! The tracker capability consumed by the mutator.
//!
//! Implementations:
//! - `google::SheetsClient`: the live spreadsheet
//! - `tracker::MemoryTracker`: an in-process grid for tests and dry runs

use std::future::Future;

use serde::{Deserialize, Serialize};

use crate::remote::RemoteError;
use crate::types::Color;

use super::requests::SheetRequest;

/// One cell of the round column, as displayed.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct RoundCell {
    /// The formatted value; empty for blank cells.
    pub name: String,
    /// The effective background color, when the sheet reports one.
    pub background: Option<Color>,
}

impl RoundCell {
    pub fn new(name: impl Into<String>) -> Self {
        RoundCell {
            name: name.into(),
            background: None,
        }
    }

    pub fn with_background(mut self, color: Color) -> Self {
        self.background = Some(color);
        self
    }
}

/// Reads and writes the tracker spreadsheet.
///
/// Reads always go to the live sheet: humans edit it concurrently, so nothing
/// is cached between calls.
pub trait TrackerClient {
    /// Returns the whole round column, header and blank rows included.
    fn read_round_column(&self) -> impl Future<Output = Result<Vec<RoundCell>, RemoteError>> + Send;

    /// Returns the displayed values of every row. Trailing blank cells may be
    /// omitted, so rows can be shorter than the tracker is wide.
    fn read_rows(&self) -> impl Future<Output = Result<Vec<Vec<String>>, RemoteError>> + Send;

    /// Applies a batch of mutations in order.
    fn batch_update(
        &self,
        description: &str,
        requests: Vec<SheetRequest>,
    ) -> impl Future<Output = Result<(), RemoteError>> + Send;
}
