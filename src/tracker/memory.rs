//! An in-process tracker grid.
//!
//! Applies [`SheetRequest`]s the way the spreadsheet would, closely enough for
//! tests and dry runs. Clones share the same grid.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tracing::info;

use crate::remote::RemoteError;
use crate::types::Color;
use crate::types::row::ROUND_COLUMN;

use super::client::{RoundCell, TrackerClient};
use super::requests::{BorderStyle, SheetRequest};

#[derive(Debug, Clone, Default)]
struct GridRow {
    cells: Vec<String>,
    backgrounds: Vec<Option<Color>>,
    top_border: Option<BorderStyle>,
}

impl GridRow {
    fn set_cell(&mut self, column: usize, value: String) {
        if self.cells.len() <= column {
            self.cells.resize(column + 1, String::new());
        }
        self.cells[column] = value;
    }

    fn set_background(&mut self, column: usize, color: Color) {
        if self.backgrounds.len() <= column {
            self.backgrounds.resize(column + 1, None);
        }
        self.backgrounds[column] = Some(color);
    }
}

/// In-memory [`TrackerClient`].
#[derive(Debug, Clone, Default)]
pub struct MemoryTracker {
    rows: Arc<Mutex<Vec<GridRow>>>,
}

impl MemoryTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// A tracker pre-filled with `rows` of plain cells.
    pub fn with_rows<R, S>(rows: impl IntoIterator<Item = R>) -> Self
    where
        R: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let tracker = Self::new();
        for row in rows {
            tracker.push_row(row);
        }
        tracker
    }

    fn grid(&self) -> MutexGuard<'_, Vec<GridRow>> {
        self.rows.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Appends a row of plain cells.
    pub fn push_row<S: Into<String>>(&self, cells: impl IntoIterator<Item = S>) {
        self.grid().push(GridRow {
            cells: cells.into_iter().map(Into::into).collect(),
            ..GridRow::default()
        });
    }

    pub fn len(&self) -> usize {
        self.grid().len()
    }

    pub fn is_empty(&self) -> bool {
        self.grid().is_empty()
    }

    /// The stored cells of a row; empty for rows past the end.
    pub fn row(&self, index: usize) -> Vec<String> {
        self.grid()
            .get(index)
            .map(|row| row.cells.clone())
            .unwrap_or_default()
    }

    pub fn background(&self, row: usize, column: usize) -> Option<Color> {
        self.grid()
            .get(row)
            .and_then(|r| r.backgrounds.get(column).copied().flatten())
    }

    pub fn set_background(&self, row: usize, column: usize, color: Color) {
        if let Some(r) = self.grid().get_mut(row) {
            r.set_background(column, color);
        }
    }

    pub fn top_border(&self, row: usize) -> Option<BorderStyle> {
        self.grid().get(row).and_then(|r| r.top_border)
    }

    fn apply(grid: &mut Vec<GridRow>, request: SheetRequest) {
        match request {
            SheetRequest::InsertRow {
                row_index,
                inherit_from_before,
            } => {
                let mut row = GridRow::default();
                if inherit_from_before && row_index > 0 {
                    if let Some(above) = grid.get(row_index - 1) {
                        row.backgrounds = above.backgrounds.clone();
                        row.top_border = above.top_border;
                    }
                }
                let at = row_index.min(grid.len());
                grid.insert(at, row);
            }
            SheetRequest::UpdateCells {
                row_index,
                start_column,
                values,
            } => {
                let row = Self::row_mut(grid, row_index);
                for (offset, value) in values.into_iter().enumerate() {
                    row.set_cell(start_column + offset, value.as_str().to_string());
                }
            }
            SheetRequest::UpdateTopBorder { row_index, style } => {
                Self::row_mut(grid, row_index).top_border = Some(style);
            }
            SheetRequest::SetBackground {
                row_index,
                start_column,
                colors,
            } => {
                let row = Self::row_mut(grid, row_index);
                for (offset, color) in colors.into_iter().enumerate() {
                    row.set_background(start_column + offset, color);
                }
            }
        }
    }

    // Writes past the end grow the grid, as they do in a sheet.
    fn row_mut(grid: &mut Vec<GridRow>, index: usize) -> &mut GridRow {
        if grid.len() <= index {
            grid.resize_with(index + 1, GridRow::default);
        }
        &mut grid[index]
    }
}

impl TrackerClient for MemoryTracker {
    async fn read_round_column(&self) -> Result<Vec<RoundCell>, RemoteError> {
        Ok(self
            .grid()
            .iter()
            .map(|row| RoundCell {
                name: row.cells.get(ROUND_COLUMN).cloned().unwrap_or_default(),
                background: row.backgrounds.get(ROUND_COLUMN).copied().flatten(),
            })
            .collect())
    }

    async fn read_rows(&self) -> Result<Vec<Vec<String>>, RemoteError> {
        Ok(self
            .grid()
            .iter()
            .map(|row| {
                let mut cells = row.cells.clone();
                while cells.last().is_some_and(String::is_empty) {
                    cells.pop();
                }
                cells
            })
            .collect())
    }

    async fn batch_update(
        &self,
        description: &str,
        requests: Vec<SheetRequest>,
    ) -> Result<(), RemoteError> {
        info!(requests = requests.len(), "{description}");
        let mut grid = self.grid();
        for request in requests {
            Self::apply(&mut grid, request);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn insert_shifts_rows_down() {
        let tracker = MemoryTracker::with_rows([["a"], ["c"]]);
        tracker
            .batch_update(
                "insert",
                vec![
                    SheetRequest::InsertRow {
                        row_index: 1,
                        inherit_from_before: false,
                    },
                    SheetRequest::update_cells(1, 0, ["b"]),
                ],
            )
            .await
            .unwrap();
        let names: Vec<_> = tracker
            .read_round_column()
            .await
            .unwrap()
            .into_iter()
            .map(|c| c.name)
            .collect();
        assert_eq!(names, vec!["a", "b", "c"]);
    }

    #[tokio::test]
    async fn insert_inherits_formatting_from_above() {
        let tracker = MemoryTracker::with_rows([["a"]]);
        let red = Color::new(1.0, 0.0, 0.0);
        tracker.set_background(0, 0, red);
        tracker
            .batch_update(
                "insert",
                vec![SheetRequest::InsertRow {
                    row_index: 1,
                    inherit_from_before: true,
                }],
            )
            .await
            .unwrap();
        assert_eq!(tracker.background(1, 0), Some(red));
    }

    #[tokio::test]
    async fn read_rows_trims_trailing_blanks() {
        let tracker = MemoryTracker::with_rows([vec!["a", "", "b", "", ""]]);
        assert_eq!(tracker.read_rows().await.unwrap(), vec![vec!["a", "", "b"]]);
    }
}
