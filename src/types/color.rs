//! RGB colors as used by the tracker spreadsheet and chat attachments.
//!
//! Sheets represents colors as a map of float channels in `[0, 1]`, with
//! missing channels meaning zero. Chat attachments want `#rrggbb`. `Color`
//! converts between the two.

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// An RGB color with float channels in `[0, 1]`.
///
/// Serializes as the Sheets channel map (`{"red": .., "green": .., "blue": ..}`);
/// missing channels deserialize as `0.0`.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Color {
    #[serde(default)]
    pub red: f64,
    #[serde(default)]
    pub green: f64,
    #[serde(default)]
    pub blue: f64,
}

/// Error parsing a hex color string.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid hex color {0:?}: expected #rrggbb")]
pub struct InvalidHexColor(pub String);

impl Color {
    pub const fn new(red: f64, green: f64, blue: f64) -> Self {
        Color { red, green, blue }
    }

    /// Parses `#rrggbb` (the leading `#` is optional).
    ///
    /// ```
    /// use placebo::types::Color;
    ///
    /// let color = Color::from_hex("#ff0000").unwrap();
    /// assert_eq!(color, Color::new(1.0, 0.0, 0.0));
    /// assert!(Color::from_hex("#fff").is_err());
    /// ```
    pub fn from_hex(hex: &str) -> Result<Self, InvalidHexColor> {
        let digits = hex.trim().trim_start_matches('#');
        if digits.len() != 6 || !digits.bytes().all(|b| b.is_ascii_hexdigit()) {
            return Err(InvalidHexColor(hex.to_string()));
        }
        let channel = |range: std::ops::Range<usize>| {
            u8::from_str_radix(&digits[range], 16)
                .map(|v| f64::from(v) / 255.0)
                .map_err(|_| InvalidHexColor(hex.to_string()))
        };
        Ok(Color {
            red: channel(0..2)?,
            green: channel(2..4)?,
            blue: channel(4..6)?,
        })
    }

    /// Formats as lowercase `#rrggbb`, rounding each channel to the nearest byte.
    pub fn to_hex(&self) -> String {
        format!(
            "#{:02x}{:02x}{:02x}",
            to_byte(self.red),
            to_byte(self.green),
            to_byte(self.blue)
        )
    }

    /// Builds a color from a JSON channel map, treating missing channels as zero.
    pub fn from_channel_map(value: &serde_json::Value) -> Option<Self> {
        let map = value.as_object()?;
        let channel = |name: &str| map.get(name).and_then(|v| v.as_f64()).unwrap_or(0.0);
        Some(Color {
            red: channel("red"),
            green: channel("green"),
            blue: channel("blue"),
        })
    }

    /// Returns the JSON channel map Sheets expects.
    pub fn to_channel_map(&self) -> serde_json::Value {
        serde_json::json!({
            "red": self.red,
            "green": self.green,
            "blue": self.blue,
        })
    }
}

fn to_byte(channel: f64) -> u8 {
    (channel.clamp(0.0, 1.0) * 255.0).round() as u8
}

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

/// Background of the meta column on a round's first row.
pub const META_BACKGROUND: Color = Color::new(0.85, 0.85, 0.85);

/// Background for every cell that isn't a round header.
pub const PLAIN_BACKGROUND: Color = Color::new(1.0, 1.0, 1.0);

/// Preset round colors, rotated through when no color is given.
///
/// Taken from the Sheets palette and ordered so neighbours contrast.
pub const ROUND_COLORS: [Color; 10] = [
    Color::new(0.87, 0.49, 0.42), // light red berry 2
    Color::new(0.81, 0.89, 0.95), // light blue 3
    Color::new(0.71, 0.84, 0.66), // light green 2
    Color::new(0.71, 0.65, 0.84), // light purple 2
    Color::new(0.98, 0.8, 0.61),  // light orange 2
    Color::new(0.84, 0.65, 0.74), // light magenta 2
    Color::new(0.92, 0.6, 0.6),   // light red 2
    Color::new(1.0, 0.9, 0.6),    // light yellow 2
    Color::new(0.85, 0.92, 0.83), // light green 3
    Color::new(0.64, 0.76, 0.96), // light cornflower blue 2
];
