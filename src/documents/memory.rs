//! In-process puzzle documents for tests and dry runs.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use tracing::info;

use crate::remote::{RemoteError, RemoteService};

use super::{DocumentClient, DocumentError, SOLVED_PREFIX, file_id_from_url, spreadsheet_url};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Folder {
    Puzzles,
    Solved,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Document {
    pub id: String,
    pub name: String,
    pub folder: Folder,
}

#[derive(Debug, Default)]
struct State {
    documents: Vec<Document>,
    fail_creation: bool,
    creation_delay: Option<Duration>,
}

/// In-memory [`DocumentClient`]. Clones share state.
#[derive(Debug, Clone, Default)]
pub struct MemoryDocuments {
    state: Arc<Mutex<State>>,
}

impl MemoryDocuments {
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Makes later creations fail.
    pub fn fail_creation(&self) {
        self.state().fail_creation = true;
    }

    /// Makes creations take `delay` before completing.
    pub fn delay_creation(&self, delay: Duration) {
        self.state().creation_delay = Some(delay);
    }

    pub fn documents(&self) -> Vec<Document> {
        self.state().documents.clone()
    }

    pub fn find(&self, url: &str) -> Option<Document> {
        let id = file_id_from_url(url).ok()?;
        self.state().documents.iter().find(|d| d.id == id).cloned()
    }
}

impl DocumentClient for MemoryDocuments {
    async fn create_puzzle_document(&self, puzzle_name: &str) -> Result<String, DocumentError> {
        info!(puzzle = %puzzle_name, "Creating spreadsheet");
        let delay = self.state().creation_delay;
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        let mut state = self.state();
        if state.fail_creation {
            return Err(RemoteError::permanent(RemoteService::Documents, "template missing").into());
        }
        let id = format!("doc{}", state.documents.len() + 1);
        state.documents.push(Document {
            id: id.clone(),
            name: puzzle_name.to_string(),
            folder: Folder::Puzzles,
        });
        Ok(spreadsheet_url(&id))
    }

    async fn mark_document_solved(&self, document_url: &str) -> Result<(), DocumentError> {
        let id = file_id_from_url(document_url)?;
        let mut state = self.state();
        let document = state
            .documents
            .iter_mut()
            .find(|d| d.id == id)
            .ok_or_else(|| RemoteError::permanent(RemoteService::Documents, "file not found"))?;
        if document.name.starts_with(SOLVED_PREFIX) {
            return Ok(());
        }
        info!(document = %document.name, "Marking document solved");
        document.name = format!("{SOLVED_PREFIX} {}", document.name);
        document.folder = Folder::Solved;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn solving_twice_prefixes_once() {
        let docs = MemoryDocuments::new();
        let url = docs.create_puzzle_document("Puzzle1").await.unwrap();

        docs.mark_document_solved(&url).await.unwrap();
        docs.mark_document_solved(&url).await.unwrap();

        let doc = docs.find(&url).unwrap();
        assert_eq!(doc.name, "[SOLVED] Puzzle1");
        assert_eq!(doc.folder, Folder::Solved);
    }

    #[tokio::test]
    async fn creation_can_fail() {
        let docs = MemoryDocuments::new();
        docs.fail_creation();
        assert!(docs.create_puzzle_document("Puzzle1").await.is_err());
    }
}
