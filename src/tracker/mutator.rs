//! Tracker reads and writes used by the worker.
//!
//! Every operation re-reads the sheet: rows may have been inserted, moved or
//! edited by hand since the last call, so row indices are only meaningful for
//! the duration of a single task.

use tracing::{debug, info};

use crate::types::row::{
    CHANNEL_COLUMN, DOCUMENT_URL_COLUMN, FIRST_DATA_ROW, PRIORITY_COLUMN,
    PUZZLE_COLUMN, ROUND_COLUMN, ROW_WIDTH, STATUS_COLUMN, SUPPRESSED_ROUNDS,
};
use crate::types::{
    Color, META_BACKGROUND, PLAIN_BACKGROUND, Priority, Status, TrackerRow, canonicalize,
    channel_to_link, link_to_channel,
};

use super::client::TrackerClient;
use super::error::TrackerError;
use super::placement::{Placement, RowPlacementEngine};
use super::requests::{BorderStyle, SheetRequest};

/// A tracked puzzle found by name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Lookup {
    pub row_index: usize,
    /// Contents of the document URL cell; empty until back-filled.
    pub document_url: String,
    /// The puzzle's channel, if the channel cell holds a recognizable link.
    pub channel: Option<String>,
}

/// Unsolved puzzle names of one round, in sheet order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoundPuzzles {
    pub round: String,
    pub puzzles: Vec<String>,
}

/// Applies tracker mutations through a [`TrackerClient`].
#[derive(Debug, Clone)]
pub struct TrackerMutator<T> {
    client: T,
    engine: RowPlacementEngine,
    workspace: String,
}

impl<T: TrackerClient> TrackerMutator<T> {
    /// `workspace` is the Slack workspace used when writing channel links.
    pub fn new(client: T, workspace: impl Into<String>) -> Self {
        TrackerMutator {
            client,
            engine: RowPlacementEngine::default(),
            workspace: workspace.into(),
        }
    }

    /// The channel cell contents linking to `channel`.
    pub fn channel_link(&self, channel: &str) -> String {
        channel_to_link(&self.workspace, channel)
    }

    /// Inserts `row` below its round (or as a new round) and returns the
    /// round's color.
    pub async fn add_row(
        &self,
        row: &TrackerRow,
        explicit_color: Option<Color>,
    ) -> Result<Option<Color>, TrackerError> {
        let column = self.client.read_round_column().await?;
        let placement = self
            .engine
            .place_row(&column, &row.round_name, explicit_color);
        debug!(
            round = %row.round_name,
            puzzle = %row.puzzle_name,
            row_index = placement.row_index,
            new_round = placement.is_new_round,
            "placed tracker row"
        );

        self.client
            .batch_update("Adding row to tracker", add_row_requests(row, &placement))
            .await?;
        Ok(placement.color)
    }

    /// Adds a placeholder row for a round.
    pub async fn add_empty_row(
        &self,
        round_name: &str,
        explicit_color: Option<Color>,
    ) -> Result<Option<Color>, TrackerError> {
        self.add_row(&TrackerRow::empty(round_name), explicit_color)
            .await
    }

    /// Back-fills the document URL of `puzzle_name`'s row.
    ///
    /// Fails with [`TrackerError::Conflict`] if the cell already holds a
    /// different URL; writing the same URL again succeeds without a write.
    pub async fn set_document_url(&self, puzzle_name: &str, url: &str) -> Result<(), TrackerError> {
        let found = self
            .lookup(puzzle_name)
            .await?
            .ok_or_else(|| TrackerError::NotFound {
                puzzle: puzzle_name.to_string(),
            })?;

        if found.document_url.contains("http") {
            if found.document_url == url {
                debug!(puzzle = %puzzle_name, "document URL already set");
                return Ok(());
            }
            return Err(TrackerError::Conflict {
                found: found.document_url,
                discarded: url.to_string(),
            });
        }

        self.client
            .batch_update(
                "Updating tracker row",
                vec![SheetRequest::update_cells(
                    found.row_index,
                    DOCUMENT_URL_COLUMN,
                    [url],
                )],
            )
            .await?;
        Ok(())
    }

    /// Marks a row solved with `answer`.
    ///
    /// The row is not re-checked; a hand edit between lookup and this call can
    /// land the answer on the wrong puzzle.
    pub async fn mark_solved(&self, row_index: usize, answer: &str) -> Result<(), TrackerError> {
        let requests = vec![
            SheetRequest::update_cells(row_index, PRIORITY_COLUMN, [Priority::None.as_cell()]),
            SheetRequest::update_cells(row_index, STATUS_COLUMN, [Status::Solved.as_cell(), answer]),
        ];
        self.client
            .batch_update("Updating tracker row", requests)
            .await?;
        Ok(())
    }

    /// Finds the single row whose puzzle name canonically contains `puzzle_name`.
    pub async fn lookup(&self, puzzle_name: &str) -> Result<Option<Lookup>, TrackerError> {
        let rows = self.client.read_rows().await?;
        let query = canonicalize(puzzle_name);

        let mut matches: Vec<Lookup> = rows
            .iter()
            .enumerate()
            .filter(|(_, row)| row.len() > CHANNEL_COLUMN)
            .filter(|(_, row)| canonicalize(&row[PUZZLE_COLUMN]).contains(&query))
            .map(|(row_index, row)| Lookup {
                row_index,
                document_url: row[DOCUMENT_URL_COLUMN].clone(),
                channel: link_to_channel(&row[CHANNEL_COLUMN]),
            })
            .collect();

        match matches.len() {
            0 => Ok(None),
            1 => Ok(matches.pop()),
            _ => Err(TrackerError::Ambiguous {
                query: puzzle_name.to_string(),
                matches: matches.iter().map(|m| m.row_index).collect(),
            }),
        }
    }

    /// Returns true if any puzzle name canonically contains `puzzle_name`.
    pub async fn puzzle_exists(&self, puzzle_name: &str) -> Result<bool, TrackerError> {
        let rows = self.client.read_rows().await?;
        let query = canonicalize(puzzle_name);
        Ok(rows
            .iter()
            .filter_map(|row| row.get(PUZZLE_COLUMN))
            .any(|cell| canonicalize(cell).contains(&query)))
    }

    /// Distinct round names below the header, in sheet order.
    pub async fn all_rounds(&self) -> Result<Vec<String>, TrackerError> {
        let column = self.client.read_round_column().await?;
        let mut rounds: Vec<String> = Vec::new();
        for cell in column.into_iter().skip(FIRST_DATA_ROW) {
            if SUPPRESSED_ROUNDS.contains(&canonicalize(&cell.name).as_str()) {
                continue;
            }
            if !rounds.contains(&cell.name) {
                rounds.push(cell.name);
            }
        }
        Ok(rounds)
    }

    /// Unsolved puzzles grouped by round, plus the puzzle whose channel is
    /// `channel_name` (solved or not), if any.
    pub async fn unsolved_puzzles_by_round(
        &self,
        channel_name: Option<&str>,
    ) -> Result<(Vec<RoundPuzzles>, Option<String>), TrackerError> {
        let rows = self.client.read_rows().await?;
        let mut grouped: Vec<RoundPuzzles> = Vec::new();
        let mut default_puzzle = None;

        for row in rows.iter().skip(FIRST_DATA_ROW) {
            if row.len() < ROW_WIDTH {
                continue;
            }
            let round = &row[ROUND_COLUMN];
            let name = &row[PUZZLE_COLUMN];
            let status = Status::from_cell(&row[STATUS_COLUMN]);

            if !status.is_solved() && !name.is_empty() {
                match grouped.iter_mut().find(|g| &g.round == round) {
                    Some(group) => group.puzzles.push(name.clone()),
                    None => grouped.push(RoundPuzzles {
                        round: round.clone(),
                        puzzles: vec![name.clone()],
                    }),
                }
            }
            let in_channel = channel_name.is_some_and(|channel| {
                !channel.is_empty()
                    && link_to_channel(&row[CHANNEL_COLUMN]).as_deref() == Some(channel)
            });
            if in_channel {
                default_puzzle = Some(name.clone());
            }
        }

        info!(
            rounds = grouped.len(),
            default = ?default_puzzle,
            "read unsolved puzzles"
        );
        Ok((grouped, default_puzzle))
    }
}

/// The batch that inserts and styles one row.
///
/// A new round's row gets a thick top border with the round and meta-background
/// colors on its first two cells. Any other row has the inherited border and
/// puzzle-cell background cleared so it does not look like a round start.
fn add_row_requests(row: &TrackerRow, placement: &Placement) -> Vec<SheetRequest> {
    let row_index = placement.row_index;
    let mut requests = vec![
        SheetRequest::InsertRow {
            row_index,
            inherit_from_before: true,
        },
        SheetRequest::update_cells(row_index, ROUND_COLUMN, row.cells()),
    ];

    if placement.is_new_round {
        requests.push(SheetRequest::UpdateTopBorder {
            row_index,
            style: BorderStyle::Thick,
        });
        requests.push(SheetRequest::SetBackground {
            row_index,
            start_column: ROUND_COLUMN,
            colors: vec![placement.color.unwrap_or(PLAIN_BACKGROUND), META_BACKGROUND],
        });
    } else {
        requests.push(SheetRequest::UpdateTopBorder {
            row_index,
            style: BorderStyle::None,
        });
        requests.push(SheetRequest::SetBackground {
            row_index,
            start_column: PUZZLE_COLUMN,
            colors: vec![PLAIN_BACKGROUND],
        });
    }
    requests
}
