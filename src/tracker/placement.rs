//! Decides where a new tracker row goes and what color its round gets.
//!
//! The engine is pure: it is handed a fresh read of the round column on every
//! call and never remembers anything about the sheet.
//!
//! # Rules
//!
//! - Names are matched canonically (see [`canonicalize`]).
//! - A known round gets its new row directly below its last existing row,
//!   so rounds stay grouped and the human ordering within a round survives.
//!   The color is inherited from that row unless one is given.
//! - A new round goes at the first blank round cell below the headers; failing
//!   that, directly above the `Event` bucket; failing that, at the end. Its
//!   color is the given one or the next palette preset.

use std::collections::HashSet;

use crate::types::row::{EVENT_ROUND, FIRST_DATA_ROW};
use crate::types::{Color, ROUND_COLORS, canonicalize};

use super::client::RoundCell;

/// Where a row goes and how it should look.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Placement {
    /// Index the new row will occupy once inserted.
    pub row_index: usize,

    /// True when no existing row belongs to the round.
    pub is_new_round: bool,

    /// The round's color. `None` only when an existing round's row reports
    /// no background.
    pub color: Option<Color>,
}

/// Computes row placement against a snapshot of the round column.
#[derive(Debug, Clone)]
pub struct RowPlacementEngine {
    palette: Vec<Color>,
}

impl Default for RowPlacementEngine {
    fn default() -> Self {
        RowPlacementEngine {
            palette: ROUND_COLORS.to_vec(),
        }
    }
}

impl RowPlacementEngine {
    /// Uses a custom preset palette. An empty palette falls back to the default.
    pub fn with_palette(palette: Vec<Color>) -> Self {
        if palette.is_empty() {
            return Self::default();
        }
        RowPlacementEngine { palette }
    }

    pub fn palette(&self) -> &[Color] {
        &self.palette
    }

    /// Places a row for `round_name`.
    ///
    /// `column` is the full round column including header rows. An explicit
    /// color always wins; otherwise existing rounds inherit and new rounds take
    /// the preset at `distinct canonical names in column % palette length`.
    pub fn place_row(
        &self,
        column: &[RoundCell],
        round_name: &str,
        explicit_color: Option<Color>,
    ) -> Placement {
        let canonical: Vec<String> = column.iter().map(|cell| canonicalize(&cell.name)).collect();
        let target = canonicalize(round_name);

        if let Some(last) = canonical.iter().rposition(|name| *name == target) {
            let color = explicit_color.or(column[last].background);
            return Placement {
                row_index: last + 1,
                is_new_round: false,
                color,
            };
        }

        let row_index = first_blank(column)
            .or_else(|| column.iter().position(|cell| cell.name == EVENT_ROUND))
            .unwrap_or(column.len());

        let color = explicit_color.unwrap_or_else(|| {
            let distinct: HashSet<&str> = canonical.iter().map(String::as_str).collect();
            self.palette[distinct.len() % self.palette.len()]
        });

        Placement {
            row_index,
            is_new_round: true,
            color: Some(color),
        }
    }
}

fn first_blank(column: &[RoundCell]) -> Option<usize> {
    column
        .iter()
        .enumerate()
        .skip(FIRST_DATA_ROW)
        .find(|(_, cell)| cell.name.is_empty())
        .map(|(index, _)| index)
}
