//! The puzzle tracker spreadsheet.
//!
//! - [`client`]: the `TrackerClient` capability (read the sheet, apply a batch)
//! - [`requests`]: mutations as data
//! - [`placement`]: where rows go and which color a round gets
//! - [`mutator`]: the operations the worker performs
//! - [`memory`]: an in-process tracker

pub mod client;
pub mod error;
pub mod memory;
pub mod mutator;
pub mod placement;
pub mod requests;

pub use client::{RoundCell, TrackerClient};
pub use error::TrackerError;
pub use memory::MemoryTracker;
pub use mutator::{Lookup, RoundPuzzles, TrackerMutator};
pub use placement::{Placement, RowPlacementEngine};
pub use requests::{BorderStyle, CellValue, SheetRequest};
