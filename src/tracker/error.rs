//! Tracker error taxonomy.

use thiserror::Error;

use crate::remote::RemoteError;

/// Errors from tracker reads and mutations.
#[derive(Debug, Error)]
pub enum TrackerError {
    /// No row's puzzle name matches.
    #[error("puzzle {puzzle:?} not found in the tracker")]
    NotFound { puzzle: String },

    /// The puzzle is already tracked.
    #[error("puzzle {puzzle:?} is already in the tracker")]
    Duplicate { puzzle: String },

    /// The document URL cell already holds a different URL.
    ///
    /// The existing URL is never overwritten; callers should adopt `found`.
    #[error("found document URL {found:?}, not replacing it with {discarded:?}")]
    Conflict { found: String, discarded: String },

    /// More than one row matches a puzzle name.
    #[error("{} rows match puzzle {query:?}", .matches.len())]
    Ambiguous { query: String, matches: Vec<usize> },

    /// The spreadsheet call itself failed.
    #[error(transparent)]
    Remote(#[from] RemoteError),
}
