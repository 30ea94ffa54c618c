//! Tracker mutations as data.
//!
//! The mutator never talks to the spreadsheet directly: it builds a batch of
//! `SheetRequest`s and hands it to a `TrackerClient`. This keeps the layout
//! logic testable against the in-memory tracker and lets the Sheets client
//! translate each request into the `batchUpdate` wire format.
//!
//! All indices are zero-based.

use serde::{Deserialize, Serialize};

use crate::types::Color;

/// A single cell write.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum CellValue {
    String(String),
    /// Text starting with `=`, entered as a formula.
    Formula(String),
}

impl CellValue {
    /// Classifies user-entered text the way Sheets would.
    pub fn from_text(text: impl Into<String>) -> Self {
        let text = text.into();
        if text.starts_with('=') {
            CellValue::Formula(text)
        } else {
            CellValue::String(text)
        }
    }

    /// The text as entered.
    pub fn as_str(&self) -> &str {
        match self {
            CellValue::String(s) | CellValue::Formula(s) => s,
        }
    }

    fn to_api_json(&self) -> serde_json::Value {
        match self {
            CellValue::String(s) => serde_json::json!({"userEnteredValue": {"stringValue": s}}),
            CellValue::Formula(f) => serde_json::json!({"userEnteredValue": {"formulaValue": f}}),
        }
    }
}

/// Style of a row's top border.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BorderStyle {
    /// Thick black line marking the first row of a round.
    Thick,
    None,
}

/// A tracker spreadsheet mutation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SheetRequest {
    /// Insert a blank row at `row_index`, shifting later rows down.
    InsertRow {
        row_index: usize,
        /// Copy formatting from the row above.
        inherit_from_before: bool,
    },

    /// Write values into consecutive cells of one row.
    UpdateCells {
        row_index: usize,
        start_column: usize,
        values: Vec<CellValue>,
    },

    /// Set the top border of a whole row.
    UpdateTopBorder { row_index: usize, style: BorderStyle },

    /// Set background colors of consecutive cells of one row.
    SetBackground {
        row_index: usize,
        start_column: usize,
        colors: Vec<Color>,
    },
}

impl SheetRequest {
    /// Convenience for writing plain text cells.
    pub fn update_cells<I, S>(row_index: usize, start_column: usize, values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        SheetRequest::UpdateCells {
            row_index,
            start_column,
            values: values.into_iter().map(CellValue::from_text).collect(),
        }
    }

    /// Renders the request as a Sheets `batchUpdate` request object.
    pub fn to_api_json(&self, sheet_id: i64) -> serde_json::Value {
        match self {
            SheetRequest::InsertRow {
                row_index,
                inherit_from_before,
            } => serde_json::json!({
                "insertDimension": {
                    "range": {
                        "sheetId": sheet_id,
                        "dimension": "ROWS",
                        "startIndex": row_index,
                        "endIndex": row_index + 1,
                    },
                    "inheritFromBefore": inherit_from_before,
                }
            }),
            SheetRequest::UpdateCells {
                row_index,
                start_column,
                values,
            } => serde_json::json!({
                "updateCells": {
                    "rows": [{"values": values.iter().map(CellValue::to_api_json).collect::<Vec<_>>()}],
                    "fields": "userEnteredValue",
                    "start": {
                        "sheetId": sheet_id,
                        "rowIndex": row_index,
                        "columnIndex": start_column,
                    },
                }
            }),
            SheetRequest::UpdateTopBorder { row_index, style } => {
                let top = match style {
                    BorderStyle::Thick => serde_json::json!({
                        "style": "SOLID_THICK",
                        "color": {"red": 0.0, "green": 0.0, "blue": 0.0},
                    }),
                    BorderStyle::None => serde_json::json!({"style": "NONE"}),
                };
                serde_json::json!({
                    "updateBorders": {
                        "range": {
                            "sheetId": sheet_id,
                            "startRowIndex": row_index,
                            "endRowIndex": row_index + 1,
                        },
                        "top": top,
                    }
                })
            }
            SheetRequest::SetBackground {
                row_index,
                start_column,
                colors,
            } => {
                let cells: Vec<_> = colors
                    .iter()
                    .map(|c| {
                        serde_json::json!({"userEnteredFormat": {"backgroundColor": c.to_channel_map()}})
                    })
                    .collect();
                serde_json::json!({
                    "updateCells": {
                        "rows": [{"values": cells}],
                        "fields": "userEnteredFormat.backgroundColor",
                        "range": {
                            "sheetId": sheet_id,
                            "startRowIndex": row_index,
                            "endRowIndex": row_index + 1,
                            "startColumnIndex": start_column,
                            "endColumnIndex": start_column + colors.len(),
                        },
                    }
                })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn formulas_are_detected() {
        assert_eq!(
            CellValue::from_text("=HYPERLINK(\"a\",\"b\")"),
            CellValue::Formula("=HYPERLINK(\"a\",\"b\")".to_string())
        );
        assert_eq!(
            CellValue::from_text("plain"),
            CellValue::String("plain".to_string())
        );
    }

    #[test]
    fn insert_row_wire_format() {
        let json = SheetRequest::InsertRow {
            row_index: 5,
            inherit_from_before: true,
        }
        .to_api_json(42);
        let range = &json["insertDimension"]["range"];
        assert_eq!(range["sheetId"], 42);
        assert_eq!(range["dimension"], "ROWS");
        assert_eq!(range["startIndex"], 5);
        assert_eq!(range["endIndex"], 6);
        assert_eq!(json["insertDimension"]["inheritFromBefore"], true);
    }

    #[test]
    fn update_cells_wire_format() {
        let json = SheetRequest::update_cells(3, 6, ["Solved", "=1+1"]).to_api_json(7);
        let update = &json["updateCells"];
        assert_eq!(update["fields"], "userEnteredValue");
        assert_eq!(update["start"]["rowIndex"], 3);
        assert_eq!(update["start"]["columnIndex"], 6);
        let values = &update["rows"][0]["values"];
        assert_eq!(values[0]["userEnteredValue"]["stringValue"], "Solved");
        assert_eq!(values[1]["userEnteredValue"]["formulaValue"], "=1+1");
    }

    #[test]
    fn border_wire_format() {
        let thick = SheetRequest::UpdateTopBorder {
            row_index: 2,
            style: BorderStyle::Thick,
        }
        .to_api_json(1);
        assert_eq!(thick["updateBorders"]["top"]["style"], "SOLID_THICK");

        let none = SheetRequest::UpdateTopBorder {
            row_index: 2,
            style: BorderStyle::None,
        }
        .to_api_json(1);
        assert_eq!(none["updateBorders"]["top"]["style"], "NONE");
        assert!(none["updateBorders"]["top"].get("color").is_none());
    }

    #[test]
    fn background_wire_format_spans_colors() {
        let json = SheetRequest::SetBackground {
            row_index: 4,
            start_column: 0,
            colors: vec![Color::new(1.0, 0.0, 0.0), Color::new(0.5, 0.5, 0.5)],
        }
        .to_api_json(9);
        let update = &json["updateCells"];
        assert_eq!(update["fields"], "userEnteredFormat.backgroundColor");
        assert_eq!(update["range"]["startColumnIndex"], 0);
        assert_eq!(update["range"]["endColumnIndex"], 2);
        assert_eq!(
            update["rows"][0]["values"][0]["userEnteredFormat"]["backgroundColor"]["red"],
            1.0
        );
    }

    #[test]
    fn requests_serialize_with_type_tag() {
        let json = serde_json::to_value(SheetRequest::InsertRow {
            row_index: 1,
            inherit_from_before: true,
        })
        .unwrap();
        assert_eq!(json["type"], "insert_row");
    }
}
