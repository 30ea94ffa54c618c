//! Modal dialogs for the slash commands issued without arguments.
//!
//! Callback and action ids here are the contract with the `/interact`
//! submission parser.

use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

use crate::tracker::RoundPuzzles;

use super::message::Text;

pub const UNLOCK_CALLBACK: &str = "unlock";
pub const CORRECT_CALLBACK: &str = "correct";
pub const NEWROUND_CALLBACK: &str = "newround";

pub const PUZZLE_NAME_ACTION: &str = "puzzle_name";
pub const PUZZLE_URL_ACTION: &str = "puzzle_url";
pub const ROUND_NAME_ACTION: &str = "round_name";
pub const ROUND_URL_ACTION: &str = "round_url";
pub const ROUND_COLOR_ACTION: &str = "round_color";
pub const ANSWER_ACTION: &str = "answer";

/// Which dialog to open.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DialogKind {
    Unlock,
    Correct,
    NewRound,
}

impl DialogKind {
    /// Completes "*user* ..." in the in-flight message.
    pub fn activity(&self) -> &'static str {
        match self {
            DialogKind::Unlock => "is adding an unlock...",
            DialogKind::Correct => "is marking a puzzle solved...",
            DialogKind::NewRound => "is adding a round...",
        }
    }
}

fn text_input(label: &str, action_id: &str, placeholder: &str) -> Value {
    json!({
        "type": "input",
        "label": Text::plain(label),
        "element": {
            "type": "plain_text_input",
            "action_id": action_id,
            "placeholder": Text::plain(placeholder),
        },
    })
}

fn option(value: &str) -> Value {
    json!({"text": Text::plain(value), "value": value})
}

fn modal(callback_id: &str, title: &str, blocks: Vec<Value>) -> Value {
    json!({
        "type": "modal",
        "callback_id": callback_id,
        "title": Text::plain(title),
        "blocks": blocks,
        "close": Text::plain("Cancel"),
        "submit": Text::plain("Submit"),
        "notify_on_close": true,
    })
}

/// The `/unlock` dialog. The round select defaults to `last_round` when it is
/// still one of `rounds`.
pub fn unlock_view(rounds: &[String], last_round: Option<&str>) -> Value {
    let mut select = json!({
        "type": "static_select",
        "action_id": ROUND_NAME_ACTION,
        "options": rounds.iter().map(|r| option(r)).collect::<Vec<_>>(),
        "placeholder": Text::plain("Choose a round"),
    });
    if let Some(last) = last_round.filter(|last| rounds.iter().any(|r| r == last)) {
        select["initial_option"] = option(last);
    }

    modal(
        UNLOCK_CALLBACK,
        "Unlock new puzzle",
        vec![
            text_input("Name", PUZZLE_NAME_ACTION, "Lorem Ipsum"),
            text_input("URL", PUZZLE_URL_ACTION, "https://example.com/puzzle/lorem_ipsum"),
            json!({"type": "input", "label": Text::plain("Round"), "element": select}),
        ],
    )
}

/// The `/correct` dialog, listing unsolved puzzles grouped by round.
pub fn correct_view(puzzles: &[RoundPuzzles], default_puzzle: Option<&str>) -> Value {
    let groups: Vec<Value> = puzzles
        .iter()
        .map(|group| {
            json!({
                "label": Text::plain(&group.round),
                "options": group.puzzles.iter().map(|p| option(p)).collect::<Vec<_>>(),
            })
        })
        .collect();
    let mut select = json!({
        "type": "static_select",
        "action_id": PUZZLE_NAME_ACTION,
        "option_groups": groups,
        "placeholder": Text::plain("Choose a puzzle"),
    });
    let listed = |name: &str| puzzles.iter().any(|g| g.puzzles.iter().any(|p| p == name));
    if let Some(default) = default_puzzle.filter(|d| listed(d)) {
        select["initial_option"] = option(default);
    }

    modal(
        CORRECT_CALLBACK,
        "Mark an answer correct",
        vec![
            json!({"type": "input", "label": Text::plain("Puzzle"), "element": select}),
            text_input("Answer", ANSWER_ACTION, "LOREM IPSUM"),
        ],
    )
}

/// The `/newround` dialog.
pub fn newround_view() -> Value {
    let mut color = text_input("Color", ROUND_COLOR_ACTION, "#6789ab");
    color["hint"] = json!(Text::plain(
        "You can leave this blank, and I'll just rotate through some reasonable presets."
    ));
    color["optional"] = Value::Bool(true);

    modal(
        NEWROUND_CALLBACK,
        "Unlock new round",
        vec![
            text_input("Name", ROUND_NAME_ACTION, "Lorem Ipsum"),
            text_input("URL", ROUND_URL_ACTION, "https://example.com/round/lorem_ipsum"),
            color,
        ],
    )
}
