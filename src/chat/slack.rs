//! Slack Web API client.
//!
//! Every call is logged with a one-line description before it is sent.
//! Transient failures (HTTP 429/5xx, network errors, `ratelimited`) are
//! retried with backoff; API-level errors are mapped onto [`ChatError`].

use chrono::{DateTime, Utc};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::{Value, json};
use tracing::{debug, error, info};

use crate::remote::{
    Backoff, RemoteError, RemoteService, retry_after_header, retry_with_backoff,
};

use super::client::{Channel, ChatClient};
use super::error::ChatError;
use super::message::Message;

pub const API_BASE: &str = "https://slack.com/api";

const BOT_USERNAME: &str = "Control Group";
const BOT_ICON: &str = ":robot_face:";
const CHANNEL_PAGE_SIZE: &str = "100";

#[derive(Debug, Deserialize)]
struct Envelope {
    ok: bool,
    #[serde(default)]
    error: Option<String>,
}

/// How a Slack call failed.
#[derive(Debug)]
enum CallError {
    /// `ok: false` with this error code.
    Api(String),
    Remote(RemoteError),
}

impl CallError {
    /// Maps onto the chat taxonomy; `name` is the channel the call was about.
    fn into_chat(self, name: &str) -> ChatError {
        match self {
            CallError::Api(code) if code == "name_taken" => ChatError::NameTaken {
                name: name.to_string(),
            },
            CallError::Api(code) if code == "channel_not_found" => ChatError::ChannelNotFound {
                name: name.to_string(),
            },
            CallError::Api(code) => RemoteError::permanent(RemoteService::Chat, code).into(),
            CallError::Remote(e) => e.into(),
        }
    }
}

enum Payload<'a> {
    Json(&'a Value),
    Form(&'a [(&'a str, String)]),
}

#[derive(Debug, Clone)]
pub struct SlackClient {
    http: reqwest::Client,
    token: String,
    retry: Backoff,
}

impl SlackClient {
    pub fn new(token: impl Into<String>) -> Self {
        SlackClient {
            http: reqwest::Client::new(),
            token: token.into(),
            retry: Backoff::STANDARD,
        }
    }

    async fn send_once(&self, method: &str, payload: &Payload<'_>) -> Result<Value, RemoteError> {
        let request = self
            .http
            .post(format!("{API_BASE}/{method}"))
            .bearer_auth(&self.token);
        let request = match payload {
            Payload::Json(body) => request.json(body),
            Payload::Form(fields) => request.form(fields),
        };
        let response = request
            .send()
            .await
            .map_err(|e| RemoteError::from_reqwest(RemoteService::Chat, e))?;

        let status = response.status();
        if !status.is_success() {
            let retry_after = retry_after_header(&response);
            let body = response.text().await.unwrap_or_default();
            return Err(
                RemoteError::from_status(RemoteService::Chat, status.as_u16(), body)
                    .with_retry_after(retry_after.as_deref()),
            );
        }
        let body: Value = response
            .json()
            .await
            .map_err(|e| RemoteError::from_reqwest(RemoteService::Chat, e))?;

        // Slack reports rate limiting in-band as well.
        if body["error"] == "ratelimited" {
            return Err(RemoteError::transient(RemoteService::Chat, "ratelimited"));
        }
        Ok(body)
    }

    async fn call<R: DeserializeOwned>(
        &self,
        description: &str,
        method: &str,
        payload: Payload<'_>,
    ) -> Result<R, CallError> {
        info!("{description}");
        let payload = &payload;
        let body = retry_with_backoff(self.retry, description, || self.send_once(method, payload))
            .await
            .map_err(CallError::Remote)?;

        let envelope: Envelope = serde_json::from_value(body.clone()).map_err(|e| {
            CallError::Remote(RemoteError::permanent(
                RemoteService::Chat,
                format!("{method}: malformed response: {e}"),
            ))
        })?;
        if !envelope.ok {
            let code = envelope.error.unwrap_or_else(|| "unknown_error".to_string());
            error!(method, error = %code, "Slack call failed");
            return Err(CallError::Api(code));
        }
        debug!(method, response = %body, "Slack call succeeded");

        serde_json::from_value(body).map_err(|e| {
            CallError::Remote(RemoteError::permanent(
                RemoteService::Chat,
                format!("{method}: unexpected response shape: {e}"),
            ))
        })
    }
}

#[derive(Debug, Deserialize)]
struct ChannelResponse {
    channel: Channel,
}

#[derive(Debug, Deserialize)]
struct ChannelList {
    channels: Vec<Channel>,
    #[serde(default)]
    response_metadata: Option<ResponseMetadata>,
}

#[derive(Debug, Deserialize)]
struct ResponseMetadata {
    #[serde(default)]
    next_cursor: String,
}

#[derive(Debug, Deserialize)]
struct PostResponse {
    ts: String,
}

#[derive(Debug, Deserialize)]
struct History {
    messages: Vec<Value>,
}

#[derive(Debug, Deserialize)]
struct UserResponse {
    user: User,
}

#[derive(Debug, Deserialize)]
struct User {
    name: String,
}

#[derive(Debug, Deserialize)]
struct ViewResponse {
    view: View,
}

#[derive(Debug, Deserialize)]
struct View {
    id: String,
}

#[derive(Debug, Deserialize)]
struct Empty {}

impl ChatClient for SlackClient {
    async fn create_channel(&self, name: &str) -> Result<Channel, ChatError> {
        let response: ChannelResponse = self
            .call(
                "Creating channel",
                "conversations.create",
                Payload::Json(&json!({"name": name})),
            )
            .await
            .map_err(|e| e.into_chat(name))?;
        Ok(response.channel)
    }

    async fn find_channel_id(&self, name: &str) -> Result<String, ChatError> {
        let mut cursor = String::new();
        loop {
            let mut fields = vec![
                ("exclude_archived", "true".to_string()),
                ("limit", CHANNEL_PAGE_SIZE.to_string()),
                ("types", "public_channel".to_string()),
            ];
            if !cursor.is_empty() {
                fields.push(("cursor", cursor.clone()));
            }
            let page: ChannelList = self
                .call("Getting channel list", "conversations.list", Payload::Form(&fields))
                .await
                .map_err(|e| e.into_chat(name))?;

            if let Some(channel) = page.channels.into_iter().find(|c| c.name == name) {
                return Ok(channel.id);
            }
            match page.response_metadata {
                Some(meta) if !meta.next_cursor.is_empty() => cursor = meta.next_cursor,
                _ => break,
            }
        }
        Err(ChatError::ChannelNotFound {
            name: name.to_string(),
        })
    }

    async fn set_topic(&self, channel_id: &str, topic: &str) -> Result<(), ChatError> {
        let _: Empty = self
            .call(
                "Setting topic",
                "conversations.setTopic",
                Payload::Json(&json!({"channel": channel_id, "topic": topic})),
            )
            .await
            .map_err(|e| e.into_chat(channel_id))?;
        Ok(())
    }

    async fn post_message(&self, channel_id: &str, message: &Message) -> Result<String, ChatError> {
        let mut body = serde_json::to_value(message).map_err(|e| {
            RemoteError::permanent(RemoteService::Chat, format!("unserializable message: {e}"))
        })?;
        body["channel"] = json!(channel_id);
        body["username"] = json!(BOT_USERNAME);
        body["icon_emoji"] = json!(BOT_ICON);

        let response: PostResponse = self
            .call("Posting message", "chat.postMessage", Payload::Json(&body))
            .await
            .map_err(|e| e.into_chat(channel_id))?;
        Ok(response.ts)
    }

    async fn delete_message(&self, channel_id: &str, ts: &str) -> Result<(), ChatError> {
        let _: Empty = self
            .call(
                "Removing message",
                "chat.delete",
                Payload::Json(&json!({"channel": channel_id, "ts": ts})),
            )
            .await
            .map_err(|e| e.into_chat(channel_id))?;
        Ok(())
    }

    async fn has_recent_activity(
        &self,
        channel_id: &str,
        since: DateTime<Utc>,
    ) -> Result<bool, ChatError> {
        let fields = [
            ("channel", channel_id.to_string()),
            ("oldest", since.timestamp().to_string()),
            ("limit", "1".to_string()),
        ];
        let history: History = self
            .call("Getting latest messages", "conversations.history", Payload::Form(&fields))
            .await
            .map_err(|e| e.into_chat(channel_id))?;
        Ok(!history.messages.is_empty())
    }

    async fn archive_channel(&self, channel_id: &str) -> Result<(), ChatError> {
        let _: Empty = self
            .call(
                "Archiving puzzle channel",
                "conversations.archive",
                Payload::Json(&json!({"channel": channel_id})),
            )
            .await
            .map_err(|e| e.into_chat(channel_id))?;
        Ok(())
    }

    async fn user_name(&self, user_id: &str) -> Result<String, ChatError> {
        let fields = [("user", user_id.to_string())];
        let response: UserResponse = self
            .call("Looking up username", "users.info", Payload::Form(&fields))
            .await
            .map_err(|e| e.into_chat(user_id))?;
        Ok(response.user.name)
    }

    async fn open_view(&self, trigger_id: &str, view: &Value) -> Result<String, ChatError> {
        let response: ViewResponse = self
            .call(
                "Opening modal",
                "views.open",
                Payload::Json(&json!({"trigger_id": trigger_id, "view": view})),
            )
            .await
            .map_err(|e| e.into_chat(trigger_id))?;
        Ok(response.view.id)
    }

    async fn respond(&self, response_url: &str, body: &Value) -> Result<(), ChatError> {
        debug!(response_url, "Posting to response URL");
        let response = self
            .http
            .post(response_url)
            .json(body)
            .send()
            .await
            .map_err(|e| RemoteError::from_reqwest(RemoteService::Chat, e))?;
        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(RemoteError::from_status(RemoteService::Chat, status.as_u16(), text).into());
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn api_errors_map_onto_chat_errors() {
        let taken = CallError::Api("name_taken".to_string()).into_chat("puzzle1");
        assert!(matches!(taken, ChatError::NameTaken { name } if name == "puzzle1"));

        let missing = CallError::Api("channel_not_found".to_string()).into_chat("C1");
        assert!(matches!(missing, ChatError::ChannelNotFound { .. }));

        let other = CallError::Api("not_in_channel".to_string()).into_chat("C1");
        match other {
            ChatError::Remote(e) => {
                assert!(!e.is_retriable());
                assert_eq!(e.message, "not_in_channel");
            }
            e => panic!("unexpected {e:?}"),
        }
    }

    #[test]
    fn channel_list_tolerates_missing_metadata() {
        let list: ChannelList = serde_json::from_value(json!({
            "ok": true,
            "channels": [{"id": "C1", "name": "general", "is_archived": false}],
        }))
        .unwrap();
        assert_eq!(list.channels[0].id, "C1");
        assert!(list.response_metadata.is_none());
    }
}
