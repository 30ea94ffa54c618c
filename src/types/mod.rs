//! Core domain types for the tracker bot.

pub mod color;
pub mod names;
pub mod row;

pub use color::{Color, InvalidHexColor, META_BACKGROUND, PLAIN_BACKGROUND, ROUND_COLORS};
pub use names::{canonicalize, channel_name_for_url, channel_to_link, link_to_channel};
pub use row::{Priority, Status, TrackerRow};
