//! The chat capability consumed by the channel coordinator.

use std::future::Future;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::error::ChatError;
use super::message::Message;

/// A channel as reported by the workspace.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Channel {
    pub id: String,
    pub name: String,
}

/// Slack Web API operations the bot uses.
pub trait ChatClient {
    /// Creates a public channel. Slack may normalize the name, so the returned
    /// channel carries the name actually used.
    fn create_channel(&self, name: &str) -> impl Future<Output = Result<Channel, ChatError>> + Send;

    /// Finds an unarchived public channel by exact name.
    fn find_channel_id(&self, name: &str) -> impl Future<Output = Result<String, ChatError>> + Send;

    fn set_topic(
        &self,
        channel_id: &str,
        topic: &str,
    ) -> impl Future<Output = Result<(), ChatError>> + Send;

    /// Posts as the bot and returns the message timestamp.
    fn post_message(
        &self,
        channel_id: &str,
        message: &Message,
    ) -> impl Future<Output = Result<String, ChatError>> + Send;

    fn delete_message(
        &self,
        channel_id: &str,
        ts: &str,
    ) -> impl Future<Output = Result<(), ChatError>> + Send;

    /// Returns true if anything was posted in the channel after `since`.
    fn has_recent_activity(
        &self,
        channel_id: &str,
        since: DateTime<Utc>,
    ) -> impl Future<Output = Result<bool, ChatError>> + Send;

    fn archive_channel(&self, channel_id: &str) -> impl Future<Output = Result<(), ChatError>> + Send;

    /// The display handle of a user.
    fn user_name(&self, user_id: &str) -> impl Future<Output = Result<String, ChatError>> + Send;

    /// Opens a modal view and returns its view id.
    fn open_view(
        &self,
        trigger_id: &str,
        view: &Value,
    ) -> impl Future<Output = Result<String, ChatError>> + Send;

    /// Posts a JSON body to an interaction's response URL.
    fn respond(
        &self,
        response_url: &str,
        body: &Value,
    ) -> impl Future<Output = Result<(), ChatError>> + Send;
}
