//! Parsers for slash-command text and dialog submissions.
//!
//! All parsers are pure. Errors carry the usage hint shown back to the user.

use std::collections::HashMap;

use thiserror::Error;

use crate::chat::dialog::{
    ANSWER_ACTION, CORRECT_CALLBACK, NEWROUND_CALLBACK, PUZZLE_NAME_ACTION, PUZZLE_URL_ACTION,
    ROUND_COLOR_ACTION, ROUND_NAME_ACTION, ROUND_URL_ACTION, UNLOCK_CALLBACK,
};
use crate::types::{Color, InvalidHexColor};

use super::types::Command;

/// Why a command was rejected.
#[derive(Debug, Error, PartialEq)]
pub enum CommandError {
    #[error("Try it like this: `/unlock Puzzle Name https://example.com/puzzle Round Name`")]
    UnlockUsage,

    #[error("Try it like this: `/correct Puzzle Name PUZZLE SOLUTION`")]
    CorrectUsage,

    #[error("Try it like this: /newround Round Name https://example.com/round")]
    NewRoundUsage,

    #[error("unexpected dialog {callback_id:?}")]
    UnknownDialog { callback_id: String },

    #[error("dialog submission is missing {field:?}")]
    MissingField { field: &'static str },

    #[error(transparent)]
    InvalidColor(#[from] InvalidHexColor),
}

/// A word is a URL if it starts with `http` and contains a `/`.
///
/// ```
/// use placebo::commands::is_url;
///
/// assert!(is_url("https://example.com/puzzle"));
/// assert!(!is_url("http"));
/// assert!(!is_url("example.com/puzzle"));
/// ```
pub fn is_url(word: &str) -> bool {
    word.starts_with("http") && word.contains('/')
}

/// True if the word has cased letters and all of them are upper case.
fn is_upper(word: &str) -> bool {
    word.chars().any(char::is_uppercase) && !word.chars().any(char::is_lowercase)
}

/// Parses `/unlock` text: `<puzzle name> <url> <round name>`.
///
/// Exactly one word must be a URL, with non-empty text on both sides.
///
/// ```
/// use placebo::commands::{parse_unlock, Command};
///
/// assert_eq!(
///     parse_unlock("Lorem Ipsum https://x.com/lorem Round One"),
///     Ok(Command::Unlock {
///         puzzle_name: "Lorem Ipsum".to_string(),
///         puzzle_url: "https://x.com/lorem".to_string(),
///         round_name: "Round One".to_string(),
///     })
/// );
/// ```
pub fn parse_unlock(text: &str) -> Result<Command, CommandError> {
    let words: Vec<&str> = text.split_whitespace().collect();
    let mut urls = words.iter().enumerate().filter(|(_, w)| is_url(w));
    let (url_index, url) = match (urls.next(), urls.next()) {
        (Some(found), None) => found,
        _ => return Err(CommandError::UnlockUsage),
    };

    let puzzle_name = words[..url_index].join(" ");
    let round_name = words[url_index + 1..].join(" ");
    if puzzle_name.is_empty() || round_name.is_empty() {
        return Err(CommandError::UnlockUsage);
    }
    Ok(Command::Unlock {
        puzzle_name,
        puzzle_url: url.to_string(),
        round_name,
    })
}

/// Parses `/correct` text: `<puzzle name> <ANSWER WORDS>`.
///
/// The answer is the longest run of all-caps words at the end.
pub fn parse_correct(text: &str) -> Result<Command, CommandError> {
    let words: Vec<&str> = text.split_whitespace().collect();
    let answer_start = words
        .iter()
        .rposition(|w| !is_upper(w))
        .map_or(0, |last_lower| last_lower + 1);

    let puzzle_name = words[..answer_start].join(" ");
    let answer = words[answer_start..].join(" ");
    if puzzle_name.is_empty() || answer.is_empty() {
        return Err(CommandError::CorrectUsage);
    }
    Ok(Command::Correct {
        puzzle_name,
        answer,
    })
}

/// Parses `/newround` text: `<round name> <url>`.
pub fn parse_newround(text: &str) -> Result<Command, CommandError> {
    let words: Vec<&str> = text.split_whitespace().collect();
    match words.split_last() {
        Some((url, name)) if !name.is_empty() && is_url(url) => Ok(Command::NewRound {
            round_name: name.join(" "),
            round_url: url.to_string(),
            color: None,
        }),
        _ => Err(CommandError::NewRoundUsage),
    }
}

/// Builds a command from a submitted dialog's field values, keyed by action id.
///
/// Blank optional fields may be absent or empty.
pub fn parse_submission(
    callback_id: &str,
    fields: &HashMap<String, String>,
) -> Result<Command, CommandError> {
    let required = |field: &'static str| {
        fields
            .get(field)
            .map(|value| value.trim())
            .filter(|value| !value.is_empty())
            .map(str::to_string)
            .ok_or(CommandError::MissingField { field })
    };

    match callback_id {
        UNLOCK_CALLBACK => Ok(Command::Unlock {
            puzzle_name: required(PUZZLE_NAME_ACTION)?,
            puzzle_url: required(PUZZLE_URL_ACTION)?,
            round_name: required(ROUND_NAME_ACTION)?,
        }),
        CORRECT_CALLBACK => Ok(Command::Correct {
            puzzle_name: required(PUZZLE_NAME_ACTION)?,
            answer: required(ANSWER_ACTION)?,
        }),
        NEWROUND_CALLBACK => {
            let color = match required(ROUND_COLOR_ACTION) {
                Ok(hex) => Some(Color::from_hex(&hex)?),
                Err(_) => None,
            };
            Ok(Command::NewRound {
                round_name: required(ROUND_NAME_ACTION)?,
                round_url: required(ROUND_URL_ACTION)?,
                color,
            })
        }
        other => Err(CommandError::UnknownDialog {
            callback_id: other.to_string(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn fields(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    // ─── /unlock ───

    #[test]
    fn unlock_needs_exactly_one_url() {
        assert_eq!(
            parse_unlock("Puzzle http://a/1 http://a/2 Round"),
            Err(CommandError::UnlockUsage)
        );
        assert_eq!(parse_unlock("Puzzle Round"), Err(CommandError::UnlockUsage));
        assert_eq!(parse_unlock(""), Err(CommandError::UnlockUsage));
    }

    #[test]
    fn unlock_needs_url_in_the_middle() {
        assert_eq!(
            parse_unlock("http://a/1 Round"),
            Err(CommandError::UnlockUsage)
        );
        assert_eq!(
            parse_unlock("Puzzle http://a/1"),
            Err(CommandError::UnlockUsage)
        );
    }

    #[test]
    fn unlock_collapses_whitespace() {
        assert_eq!(
            parse_unlock("  Lorem   Ipsum\thttp://x/lorem  Round  One "),
            Ok(Command::Unlock {
                puzzle_name: "Lorem Ipsum".to_string(),
                puzzle_url: "http://x/lorem".to_string(),
                round_name: "Round One".to_string(),
            })
        );
    }

    // ─── /correct ───

    #[test]
    fn correct_takes_trailing_caps() {
        assert_eq!(
            parse_correct("The Puzzle Name LOREM IPSUM"),
            Ok(Command::Correct {
                puzzle_name: "The Puzzle Name".to_string(),
                answer: "LOREM IPSUM".to_string(),
            })
        );
    }

    #[test]
    fn correct_answer_may_contain_digits_and_punctuation() {
        assert_eq!(
            parse_correct("puzzle 2 A1B2 C'EST"),
            Ok(Command::Correct {
                puzzle_name: "puzzle 2".to_string(),
                answer: "A1B2 C'EST".to_string(),
            })
        );
    }

    #[test]
    fn correct_rejects_all_caps_or_no_caps() {
        assert_eq!(parse_correct("ALL CAPS"), Err(CommandError::CorrectUsage));
        assert_eq!(parse_correct("no caps"), Err(CommandError::CorrectUsage));
        assert_eq!(parse_correct("trailing 42"), Err(CommandError::CorrectUsage));
    }

    #[test]
    fn usage_hints_are_user_facing() {
        assert_eq!(
            CommandError::CorrectUsage.to_string(),
            "Try it like this: `/correct Puzzle Name PUZZLE SOLUTION`"
        );
    }

    // ─── /newround ───

    #[test]
    fn newround_needs_name_and_trailing_url() {
        assert_eq!(
            parse_newround("Round Two http://x/round2"),
            Ok(Command::NewRound {
                round_name: "Round Two".to_string(),
                round_url: "http://x/round2".to_string(),
                color: None,
            })
        );
        assert_eq!(
            parse_newround("http://x/round2"),
            Err(CommandError::NewRoundUsage)
        );
        assert_eq!(
            parse_newround("Round Two"),
            Err(CommandError::NewRoundUsage)
        );
    }

    // ─── Submissions ───

    #[test]
    fn newround_submission_parses_color() {
        let command = parse_submission(
            NEWROUND_CALLBACK,
            &fields(&[
                (ROUND_NAME_ACTION, "Round Two"),
                (ROUND_URL_ACTION, "http://x/round2"),
                (ROUND_COLOR_ACTION, "#ff0000"),
            ]),
        )
        .unwrap();
        assert_eq!(
            command,
            Command::NewRound {
                round_name: "Round Two".to_string(),
                round_url: "http://x/round2".to_string(),
                color: Some(Color::new(1.0, 0.0, 0.0)),
            }
        );
    }

    #[test]
    fn newround_submission_color_is_optional() {
        let command = parse_submission(
            NEWROUND_CALLBACK,
            &fields(&[
                (ROUND_NAME_ACTION, "Round Two"),
                (ROUND_URL_ACTION, "http://x/round2"),
                (ROUND_COLOR_ACTION, ""),
            ]),
        )
        .unwrap();
        assert!(matches!(command, Command::NewRound { color: None, .. }));
    }

    #[test]
    fn newround_submission_rejects_bad_color() {
        let result = parse_submission(
            NEWROUND_CALLBACK,
            &fields(&[
                (ROUND_NAME_ACTION, "Round Two"),
                (ROUND_URL_ACTION, "http://x/round2"),
                (ROUND_COLOR_ACTION, "red"),
            ]),
        );
        assert!(matches!(result, Err(CommandError::InvalidColor(_))));
    }

    #[test]
    fn submission_reports_missing_field() {
        assert_eq!(
            parse_submission(CORRECT_CALLBACK, &fields(&[(PUZZLE_NAME_ACTION, "Puzzle1")])),
            Err(CommandError::MissingField {
                field: ANSWER_ACTION
            })
        );
    }

    #[test]
    fn submission_rejects_unknown_dialog() {
        assert!(matches!(
            parse_submission("mystery", &HashMap::new()),
            Err(CommandError::UnknownDialog { .. })
        ));
    }

    // ─── Property tests ───

    fn arb_name_word() -> impl Strategy<Value = String> {
        "[A-Z][a-z]{1,8}"
    }

    fn arb_answer_word() -> impl Strategy<Value = String> {
        "[A-Z]{1,8}"
    }

    proptest! {
        /// Any name followed by an all-caps answer splits back apart.
        #[test]
        fn correct_splits_name_from_answer(
            name in prop::collection::vec(arb_name_word(), 1..4),
            answer in prop::collection::vec(arb_answer_word(), 1..4),
        ) {
            let text = format!("{} {}", name.join(" "), answer.join(" "));
            prop_assert_eq!(
                parse_correct(&text),
                Ok(Command::Correct {
                    puzzle_name: name.join(" "),
                    answer: answer.join(" "),
                })
            );
        }

        /// The unlock parser never panics and only succeeds with one URL.
        #[test]
        fn unlock_never_panics(text in "[a-zA-Z:/ .]{0,40}") {
            if let Ok(Command::Unlock { puzzle_url, .. }) = parse_unlock(&text) {
                prop_assert!(is_url(&puzzle_url));
            }
        }
    }
}
