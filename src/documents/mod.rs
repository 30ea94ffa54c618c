//! Per-puzzle working documents.
//!
//! Each unlocked puzzle gets a copy of a template spreadsheet. Creating one is
//! slow, so the worker starts it in the background and back-fills the tracker
//! when it finishes.

use std::future::Future;
use std::sync::LazyLock;

use regex::Regex;
use thiserror::Error;

use crate::remote::RemoteError;

pub mod memory;

pub use memory::MemoryDocuments;

/// Title prefix of solved documents.
pub const SOLVED_PREFIX: &str = "[SOLVED]";

#[derive(Debug, Error)]
pub enum DocumentError {
    #[error("can't find a file ID in {url:?}")]
    InvalidUrl { url: String },

    #[error(transparent)]
    Remote(#[from] RemoteError),
}

static FILE_ID_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"/d/([a-zA-Z0-9_-]+)").expect("static regex"));

/// Extracts the Drive file id from a document URL.
pub fn file_id_from_url(url: &str) -> Result<&str, DocumentError> {
    FILE_ID_PATTERN
        .captures(url)
        .and_then(|captures| captures.get(1))
        .map(|m| m.as_str())
        .ok_or_else(|| DocumentError::InvalidUrl {
            url: url.to_string(),
        })
}

/// The edit URL of a spreadsheet.
pub fn spreadsheet_url(file_id: &str) -> String {
    format!("https://docs.google.com/spreadsheets/d/{file_id}/edit")
}

/// Creates and files away puzzle documents.
pub trait DocumentClient {
    /// Copies the template into the puzzles folder and returns the copy's URL.
    fn create_puzzle_document(
        &self,
        puzzle_name: &str,
    ) -> impl Future<Output = Result<String, DocumentError>> + Send;

    /// Prefixes the title with [`SOLVED_PREFIX`] and moves the document to the
    /// solved folder. Already-solved documents are left alone.
    fn mark_document_solved(
        &self,
        document_url: &str,
    ) -> impl Future<Output = Result<(), DocumentError>> + Send;
}
