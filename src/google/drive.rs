//! Puzzle documents in Google Drive.

use reqwest::Method;
use serde_json::json;

use crate::documents::{
    DocumentClient, DocumentError, SOLVED_PREFIX, file_id_from_url, spreadsheet_url,
};
use crate::remote::{RemoteError, RemoteService};

use super::client::GoogleClient;

pub const DRIVE_API_BASE: &str = "https://www.googleapis.com/drive/v3/files";

#[derive(Debug, Clone)]
pub struct DriveClient {
    google: GoogleClient,
    template_id: String,
    puzzles_folder_id: String,
    solved_folder_id: String,
}

impl DriveClient {
    pub fn new(
        google: GoogleClient,
        template_id: impl Into<String>,
        puzzles_folder_id: impl Into<String>,
        solved_folder_id: impl Into<String>,
    ) -> Self {
        DriveClient {
            google,
            template_id: template_id.into(),
            puzzles_folder_id: puzzles_folder_id.into(),
            solved_folder_id: solved_folder_id.into(),
        }
    }
}

fn string_field(response: &serde_json::Value, field: &str) -> Result<String, RemoteError> {
    response[field]
        .as_str()
        .map(str::to_string)
        .ok_or_else(|| {
            RemoteError::permanent(RemoteService::Documents, format!("response has no {field}"))
        })
}

impl DocumentClient for DriveClient {
    async fn create_puzzle_document(&self, puzzle_name: &str) -> Result<String, DocumentError> {
        let url = format!("{DRIVE_API_BASE}/{}/copy", self.template_id);
        let body = json!({"name": puzzle_name, "parents": [self.puzzles_folder_id]});
        let response = self
            .google
            .send(
                RemoteService::Documents,
                "Creating spreadsheet",
                Method::POST,
                &url,
                &[],
                Some(&body),
            )
            .await?;
        Ok(spreadsheet_url(&string_field(&response, "id")?))
    }

    async fn mark_document_solved(&self, document_url: &str) -> Result<(), DocumentError> {
        let file_id = file_id_from_url(document_url)?;
        let url = format!("{DRIVE_API_BASE}/{file_id}");

        let response = self
            .google
            .send(
                RemoteService::Documents,
                "Getting puzzle doc title",
                Method::GET,
                &url,
                &[("fields", "name")],
                None,
            )
            .await?;
        let name = string_field(&response, "name")?;
        if name.starts_with(SOLVED_PREFIX) {
            return Ok(());
        }

        // The title catches the eye of solvers with the doc open; the folder
        // keeps the puzzles folder tidy.
        let body = json!({"name": format!("{SOLVED_PREFIX} {name}")});
        self.google
            .send(
                RemoteService::Documents,
                "Updating puzzle doc title",
                Method::PATCH,
                &url,
                &[],
                Some(&body),
            )
            .await?;

        self.google
            .send(
                RemoteService::Documents,
                "Moving puzzle doc to Solved folder",
                Method::PATCH,
                &url,
                &[
                    ("addParents", self.solved_folder_id.as_str()),
                    ("removeParents", self.puzzles_folder_id.as_str()),
                ],
                Some(&json!({})),
            )
            .await?;
        Ok(())
    }
}
