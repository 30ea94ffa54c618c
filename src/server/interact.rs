//! The interactivity endpoint: dialog submissions and closes, and button
//! presses.

use std::collections::HashMap;

use axum::extract::{Form, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Deserialize;
use serde_json::{Map, Value};
use thiserror::Error;
use tracing::{debug, warn};

use super::AppState;
use crate::chat::coordinator::ARCHIVE_ACTION;
use crate::commands::{CommandError, parse_submission};
use crate::worker::Task;

#[derive(Debug, Deserialize)]
pub struct InteractForm {
    pub payload: String,
}

/// The interaction payload, tagged by Slack's `type`.
#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Interaction {
    ViewSubmission {
        view: View,
        #[serde(default)]
        response_urls: Vec<ResponseUrl>,
    },
    ViewClosed {
        view: View,
    },
    BlockActions {
        user: User,
        actions: Vec<Action>,
        response_url: String,
        message: Map<String, Value>,
    },
}

#[derive(Debug, Deserialize)]
pub struct View {
    pub id: String,
    #[serde(default)]
    pub callback_id: String,
    #[serde(default)]
    pub state: ViewState,
}

#[derive(Debug, Default, Deserialize)]
pub struct ViewState {
    /// Block id, then action id, to the element's state.
    #[serde(default)]
    pub values: HashMap<String, HashMap<String, ElementState>>,
}

#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ElementState {
    PlainTextInput { value: Option<String> },
    StaticSelect { selected_option: Option<SelectedOption> },
}

#[derive(Debug, Deserialize)]
pub struct SelectedOption {
    pub value: String,
}

#[derive(Debug, Deserialize)]
pub struct ResponseUrl {
    pub response_url: String,
}

#[derive(Debug, Deserialize)]
pub struct User {
    pub id: String,
}

#[derive(Debug, Deserialize)]
pub struct Action {
    pub action_id: String,
    #[serde(default)]
    pub value: String,
}

impl ViewState {
    /// Flattens the submitted values to action id → value. Empty inputs and
    /// unselected selects are left out.
    pub fn fields(self) -> HashMap<String, String> {
        self.values
            .into_values()
            .flatten()
            .filter_map(|(action_id, element)| {
                let value = match element {
                    ElementState::PlainTextInput { value } => value,
                    ElementState::StaticSelect { selected_option } => {
                        selected_option.map(|o| o.value)
                    }
                };
                value.map(|v| (action_id, v))
            })
            .collect()
    }
}

#[derive(Debug, Error)]
pub enum InteractError {
    #[error("invalid interaction payload: {0}")]
    InvalidPayload(#[from] serde_json::Error),

    #[error("invalid dialog submission: {0}")]
    Submission(#[from] CommandError),

    #[error("got {0} actions, expected 1")]
    ActionCount(usize),

    #[error("unexpected action {0:?}")]
    UnexpectedAction(String),
}

impl IntoResponse for InteractError {
    fn into_response(self) -> Response {
        (StatusCode::BAD_REQUEST, self.to_string()).into_response()
    }
}

pub async fn interact_handler(
    State(app_state): State<AppState>,
    Form(form): Form<InteractForm>,
) -> Result<StatusCode, InteractError> {
    let interaction: Interaction = serde_json::from_str(&form.payload).inspect_err(|e| {
        warn!(error = %e, payload = %form.payload, "Unparseable interaction");
    })?;
    debug!(?interaction, "Received interaction");
    let queue = app_state.queue();

    match interaction {
        Interaction::ViewSubmission {
            view,
            response_urls,
        } => {
            let command = parse_submission(&view.callback_id, &view.state.fields())?;
            let response_url = response_urls.into_iter().next().map(|r| r.response_url);
            queue.enqueue(command.into_task(response_url));
            queue.view_closed(&view.id);
        }
        Interaction::ViewClosed { view } => queue.view_closed(&view.id),
        Interaction::BlockActions {
            user,
            mut actions,
            response_url,
            message,
        } => {
            if actions.len() != 1 {
                return Err(InteractError::ActionCount(actions.len()));
            }
            let action = actions.remove(0);
            if action.action_id != ARCHIVE_ACTION {
                return Err(InteractError::UnexpectedAction(action.action_id));
            }
            queue.enqueue(Task::ArchiveChannel {
                channel_id: action.value,
                user_id: user.id,
                response_url,
                message,
            });
        }
    }
    Ok(StatusCode::OK)
}
