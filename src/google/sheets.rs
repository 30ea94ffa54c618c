//! The tracker as a Google Sheets spreadsheet.

use reqwest::Method;
use serde_json::{Value, json};

use crate::remote::{RemoteError, RemoteService};
use crate::tracker::{RoundCell, SheetRequest, TrackerClient};
use crate::types::Color;

use super::client::GoogleClient;

pub const SHEETS_API_BASE: &str = "https://sheets.googleapis.com/v4/spreadsheets";

/// Tab holding the puzzle list.
pub const TRACKER_SHEET_NAME: &str = "Puzzle List";

#[derive(Debug, Clone)]
pub struct SheetsClient {
    google: GoogleClient,
    spreadsheet_id: String,
    /// Numeric id of the tracker tab, used to address rows in batch updates.
    sheet_id: i64,
}

impl SheetsClient {
    pub fn new(google: GoogleClient, spreadsheet_id: impl Into<String>, sheet_id: i64) -> Self {
        SheetsClient {
            google,
            spreadsheet_id: spreadsheet_id.into(),
            sheet_id,
        }
    }

    fn range(columns: &str) -> String {
        format!("'{TRACKER_SHEET_NAME}'!{columns}")
    }
}

/// Reads the round column out of a `spreadsheets.get` response with grid data.
fn parse_round_column(response: &Value) -> Vec<RoundCell> {
    let rows = response["sheets"][0]["data"][0]["rowData"]
        .as_array()
        .cloned()
        .unwrap_or_default();
    rows.iter()
        .map(|row| {
            let cell = &row["values"][0];
            RoundCell {
                name: cell["formattedValue"].as_str().unwrap_or_default().to_string(),
                background: Color::from_channel_map(&cell["effectiveFormat"]["backgroundColor"]),
            }
        })
        .collect()
}

/// Reads rows out of a `values.get` response. Empty sheets have no `values`.
fn parse_rows(response: &Value) -> Vec<Vec<String>> {
    let Some(rows) = response["values"].as_array() else {
        return Vec::new();
    };
    rows.iter()
        .map(|row| {
            row.as_array()
                .map(|cells| {
                    cells
                        .iter()
                        .map(|cell| match cell {
                            Value::String(s) => s.clone(),
                            Value::Null => String::new(),
                            other => other.to_string(),
                        })
                        .collect()
                })
                .unwrap_or_default()
        })
        .collect()
}

impl TrackerClient for SheetsClient {
    async fn read_round_column(&self) -> Result<Vec<RoundCell>, RemoteError> {
        let url = format!("{SHEETS_API_BASE}/{}", self.spreadsheet_id);
        let range = Self::range("A:A");
        let response = self
            .google
            .send(
                RemoteService::Tracker,
                "Looking up the Round column",
                Method::GET,
                &url,
                &[
                    ("ranges", range.as_str()),
                    ("includeGridData", "true"),
                    (
                        "fields",
                        "sheets.data.rowData.values(formattedValue,effectiveFormat.backgroundColor)",
                    ),
                ],
                None,
            )
            .await?;
        Ok(parse_round_column(&response))
    }

    async fn read_rows(&self) -> Result<Vec<Vec<String>>, RemoteError> {
        let url = format!(
            "{SHEETS_API_BASE}/{}/values/{}",
            self.spreadsheet_id,
            Self::range("A:H")
        );
        let response = self
            .google
            .send(
                RemoteService::Tracker,
                "Fetching tracking sheet",
                Method::GET,
                &url,
                &[],
                None,
            )
            .await?;
        Ok(parse_rows(&response))
    }

    async fn batch_update(
        &self,
        description: &str,
        requests: Vec<SheetRequest>,
    ) -> Result<(), RemoteError> {
        let url = format!("{SHEETS_API_BASE}/{}:batchUpdate", self.spreadsheet_id);
        let body = json!({
            "requests": requests
                .iter()
                .map(|r| r.to_api_json(self.sheet_id))
                .collect::<Vec<_>>(),
        });
        self.google
            .send(
                RemoteService::Tracker,
                description,
                Method::POST,
                &url,
                &[],
                Some(&body),
            )
            .await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_column_keeps_blank_rows_and_backgrounds() {
        let response = json!({
            "sheets": [{"data": [{"rowData": [
                {"values": [{"formattedValue": "Round", "effectiveFormat": {"backgroundColor": {"red": 1, "green": 1, "blue": 1}}}]},
                {},
                {"values": [{"formattedValue": "RoundA", "effectiveFormat": {"backgroundColor": {"red": 0.5}}}]},
            ]}]}]
        });
        let column = parse_round_column(&response);
        assert_eq!(column.len(), 3);
        assert_eq!(column[1], RoundCell::default());
        assert_eq!(column[2].name, "RoundA");
        assert_eq!(column[2].background, Some(Color::new(0.5, 0.0, 0.0)));
    }

    #[test]
    fn rows_of_empty_sheet() {
        assert!(parse_rows(&json!({"range": "A1:H1000"})).is_empty());
    }

    #[test]
    fn rows_are_ragged() {
        let rows = parse_rows(&json!({"values": [["a", "b"], [], ["c"]]}));
        assert_eq!(rows, vec![vec!["a", "b"], vec![], vec!["c"]]);
    }
}
