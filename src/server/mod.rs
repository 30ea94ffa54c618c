//! HTTP server for the Slack app.
//!
//! Handlers validate what Slack sends, queue tasks for the worker and answer
//! immediately; nothing here touches the tracker or the chat API.
//!
//! # Endpoints
//!
//! - `POST /unlock`, `POST /correct`, `POST /newround` - slash commands
//! - `POST /interact` - dialog submissions and closes, button presses
//! - `GET /health` - returns 200 if the server is running
//!
//! Slack endpoints require a valid request signature when a signing secret
//! is configured.

use std::sync::Arc;

use axum::middleware;
use axum::routing::{get, post};

pub mod health;
pub mod interact;
pub mod signature;
pub mod slash;

pub use health::health_handler;
pub use interact::interact_handler;
pub use signature::verify_slack_request;
pub use slash::{correct_handler, newround_handler, unlock_handler};

use crate::worker::TaskQueue;

/// Shared application state, passed to handlers via axum's `State`.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    queue: TaskQueue,
    /// Slack signing secret; `None` disables verification.
    signing_secret: Option<Vec<u8>>,
}

impl AppState {
    pub fn new(queue: TaskQueue, signing_secret: Option<Vec<u8>>) -> Self {
        AppState {
            inner: Arc::new(AppStateInner {
                queue,
                signing_secret,
            }),
        }
    }

    pub fn queue(&self) -> &TaskQueue {
        &self.inner.queue
    }

    pub fn signing_secret(&self) -> Option<&[u8]> {
        self.inner.signing_secret.as_deref()
    }
}

/// Builds the axum Router with all endpoints.
pub fn build_router(app_state: AppState) -> axum::Router {
    let slack = axum::Router::new()
        .route("/unlock", post(unlock_handler))
        .route("/correct", post(correct_handler))
        .route("/newround", post(newround_handler))
        .route("/interact", post(interact_handler))
        .route_layer(middleware::from_fn_with_state(
            app_state.clone(),
            verify_slack_request,
        ));

    axum::Router::new()
        .merge(slack)
        .route("/health", get(health_handler))
        .with_state(app_state)
}
