//! Slash commands and dialog submissions.
//!
//! # Supported Commands
//!
//! - `/unlock Puzzle Name https://example.com/puzzle Round Name`
//! - `/correct Puzzle Name PUZZLE SOLUTION`
//! - `/newround Round Name https://example.com/round`
//!
//! Each command issued without text opens a dialog instead; the dialog's
//! submission is parsed by [`parse_submission`].
//!
//! # Example
//!
//! ```
//! use placebo::commands::{parse_correct, Command};
//!
//! assert_eq!(
//!     parse_correct("Lorem Ipsum DOLOR SIT"),
//!     Ok(Command::Correct {
//!         puzzle_name: "Lorem Ipsum".to_string(),
//!         answer: "DOLOR SIT".to_string(),
//!     })
//! );
//! ```

mod parser;
mod types;

pub use parser::{
    CommandError, is_url, parse_correct, parse_newround, parse_submission, parse_unlock,
};
pub use types::Command;
