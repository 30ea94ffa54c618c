//! Slash-command endpoints.
//!
//! Each command is validated here and answered straight away with an
//! ephemeral acknowledgment or usage hint; the work itself is queued. A
//! command with no text opens the matching dialog instead.

use axum::Json;
use axum::extract::{Form, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Deserialize;
use tracing::{debug, info};

use super::AppState;
use crate::chat::DialogKind;
use crate::chat::message::EphemeralReply;
use crate::commands::{Command, CommandError, parse_correct, parse_newround, parse_unlock};
use crate::worker::Task;

/// The form fields Slack sends with a slash command.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SlashCommand {
    #[serde(default)]
    pub text: String,
    #[serde(default)]
    pub trigger_id: String,
    #[serde(default)]
    pub user_id: String,
    #[serde(default)]
    pub channel_name: Option<String>,
}

pub async fn unlock_handler(
    State(app_state): State<AppState>,
    Form(form): Form<SlashCommand>,
) -> Response {
    handle(&app_state, form, DialogKind::Unlock, parse_unlock)
}

pub async fn correct_handler(
    State(app_state): State<AppState>,
    Form(form): Form<SlashCommand>,
) -> Response {
    handle(&app_state, form, DialogKind::Correct, parse_correct)
}

pub async fn newround_handler(
    State(app_state): State<AppState>,
    Form(form): Form<SlashCommand>,
) -> Response {
    handle(&app_state, form, DialogKind::NewRound, parse_newround)
}

fn handle(
    app_state: &AppState,
    form: SlashCommand,
    dialog: DialogKind,
    parse: fn(&str) -> Result<Command, CommandError>,
) -> Response {
    if form.text.trim().is_empty() {
        debug!(?dialog, user_id = %form.user_id, "Opening dialog");
        app_state.queue().enqueue(Task::OpenDialog {
            dialog,
            trigger_id: form.trigger_id,
            user_id: form.user_id,
            channel_name: form.channel_name,
        });
        return StatusCode::OK.into_response();
    }

    match parse(&form.text) {
        Ok(command) => {
            let reply = EphemeralReply::new(command.acknowledgment());
            info!(?command, "Accepted command");
            app_state.queue().enqueue(command.into_task(None));
            Json(reply).into_response()
        }
        Err(e) => {
            info!(text = %form.text, error = %e, "Rejected command");
            Json(EphemeralReply::new(e.to_string())).into_response()
        }
    }
}
