//! An in-process chat workspace for tests and dry runs.
//!
//! Every call is recorded as a [`ChatEffect`] so tests can assert on what the
//! bot did; clones share state.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use chrono::{DateTime, Utc};
use serde_json::Value;
use tracing::info;

use crate::remote::{RemoteError, RemoteService};

use super::client::{Channel, ChatClient};
use super::error::ChatError;
use super::message::Message;

/// A recorded chat call.
#[derive(Debug, Clone, PartialEq)]
pub enum ChatEffect {
    CreateChannel { name: String, id: String },
    SetTopic { channel_id: String, topic: String },
    Post { channel_id: String, ts: String, message: Message },
    Delete { channel_id: String, ts: String },
    Archive { channel_id: String },
    OpenView { trigger_id: String, view_id: String, view: Value },
    Respond { response_url: String, body: Value },
}

#[derive(Debug, Default)]
struct ChannelState {
    id: String,
    name: String,
    topic: Option<String>,
    archived: bool,
    last_activity: Option<DateTime<Utc>>,
    messages: Vec<(String, Message)>,
}

#[derive(Debug, Default)]
struct State {
    channels: Vec<ChannelState>,
    users: HashMap<String, String>,
    effects: Vec<ChatEffect>,
    history_fails: bool,
    next_id: u64,
}

impl State {
    fn next(&mut self, prefix: char) -> String {
        self.next_id += 1;
        format!("{prefix}{:04}", self.next_id)
    }

    fn channel_mut(&mut self, id: &str) -> Result<&mut ChannelState, ChatError> {
        self.channels
            .iter_mut()
            .find(|c| c.id == id)
            .ok_or_else(|| ChatError::ChannelNotFound {
                name: id.to_string(),
            })
    }
}

/// In-memory [`ChatClient`].
#[derive(Debug, Clone, Default)]
pub struct MemoryChat {
    state: Arc<Mutex<State>>,
}

impl MemoryChat {
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Adds a channel directly, returning its id.
    pub fn add_channel(&self, name: &str) -> String {
        let mut state = self.state();
        let id = state.next('C');
        state.channels.push(ChannelState {
            id: id.clone(),
            name: name.to_string(),
            ..ChannelState::default()
        });
        id
    }

    pub fn add_user(&self, id: &str, name: &str) {
        self.state().users.insert(id.to_string(), name.to_string());
    }

    /// Marks the channel as having a message just now.
    pub fn record_activity(&self, channel_id: &str) {
        if let Ok(channel) = self.state().channel_mut(channel_id) {
            channel.last_activity = Some(Utc::now());
        }
    }

    /// Makes every later history read fail.
    pub fn fail_history_reads(&self) {
        self.state().history_fails = true;
    }

    pub fn effects(&self) -> Vec<ChatEffect> {
        self.state().effects.clone()
    }

    pub fn channel_names(&self) -> Vec<String> {
        self.state().channels.iter().map(|c| c.name.clone()).collect()
    }

    pub fn channel_id(&self, name: &str) -> Option<String> {
        self.state()
            .channels
            .iter()
            .find(|c| c.name == name)
            .map(|c| c.id.clone())
    }

    pub fn topic(&self, channel_id: &str) -> Option<String> {
        self.state()
            .channels
            .iter()
            .find(|c| c.id == channel_id)
            .and_then(|c| c.topic.clone())
    }

    pub fn is_archived(&self, channel_id: &str) -> bool {
        self.state()
            .channels
            .iter()
            .any(|c| c.id == channel_id && c.archived)
    }

    /// Messages currently in a channel, oldest first.
    pub fn messages_in(&self, channel_id: &str) -> Vec<Message> {
        self.state()
            .channels
            .iter()
            .find(|c| c.id == channel_id)
            .map(|c| c.messages.iter().map(|(_, m)| m.clone()).collect())
            .unwrap_or_default()
    }

    // Well-known channels like the QM channel are addressed by configured id
    // and may never have been added explicitly.
    fn channel_or_insert<'a>(state: &'a mut State, id: &str) -> &'a mut ChannelState {
        if let Some(index) = state.channels.iter().position(|c| c.id == id) {
            return &mut state.channels[index];
        }
        state.channels.push(ChannelState {
            id: id.to_string(),
            name: id.to_lowercase(),
            ..ChannelState::default()
        });
        let last = state.channels.len() - 1;
        &mut state.channels[last]
    }
}

impl ChatClient for MemoryChat {
    async fn create_channel(&self, name: &str) -> Result<Channel, ChatError> {
        info!(channel = %name, "Creating channel");
        let mut state = self.state();
        if state.channels.iter().any(|c| c.name == name) {
            return Err(ChatError::NameTaken {
                name: name.to_string(),
            });
        }
        let id = state.next('C');
        state.channels.push(ChannelState {
            id: id.clone(),
            name: name.to_string(),
            ..ChannelState::default()
        });
        state.effects.push(ChatEffect::CreateChannel {
            name: name.to_string(),
            id: id.clone(),
        });
        Ok(Channel {
            id,
            name: name.to_string(),
        })
    }

    async fn find_channel_id(&self, name: &str) -> Result<String, ChatError> {
        self.state()
            .channels
            .iter()
            .find(|c| c.name == name && !c.archived)
            .map(|c| c.id.clone())
            .ok_or_else(|| ChatError::ChannelNotFound {
                name: name.to_string(),
            })
    }

    async fn set_topic(&self, channel_id: &str, topic: &str) -> Result<(), ChatError> {
        info!(channel_id, "Setting topic");
        let mut state = self.state();
        state.channel_mut(channel_id)?.topic = Some(topic.to_string());
        state.effects.push(ChatEffect::SetTopic {
            channel_id: channel_id.to_string(),
            topic: topic.to_string(),
        });
        Ok(())
    }

    async fn post_message(&self, channel_id: &str, message: &Message) -> Result<String, ChatError> {
        info!(channel_id, "Posting message");
        let mut state = self.state();
        let ts = state.next('T');
        let channel = Self::channel_or_insert(&mut state, channel_id);
        channel.messages.push((ts.clone(), message.clone()));
        channel.last_activity = Some(Utc::now());
        state.effects.push(ChatEffect::Post {
            channel_id: channel_id.to_string(),
            ts: ts.clone(),
            message: message.clone(),
        });
        Ok(ts)
    }

    async fn delete_message(&self, channel_id: &str, ts: &str) -> Result<(), ChatError> {
        info!(channel_id, ts, "Removing message");
        let mut state = self.state();
        state
            .channel_mut(channel_id)?
            .messages
            .retain(|(message_ts, _)| message_ts != ts);
        state.effects.push(ChatEffect::Delete {
            channel_id: channel_id.to_string(),
            ts: ts.to_string(),
        });
        Ok(())
    }

    async fn has_recent_activity(
        &self,
        channel_id: &str,
        since: DateTime<Utc>,
    ) -> Result<bool, ChatError> {
        let mut state = self.state();
        if state.history_fails {
            return Err(RemoteError::transient(RemoteService::Chat, "history unavailable").into());
        }
        let channel = state.channel_mut(channel_id)?;
        Ok(channel.last_activity.is_some_and(|at| at > since))
    }

    async fn archive_channel(&self, channel_id: &str) -> Result<(), ChatError> {
        info!(channel_id, "Archiving channel");
        let mut state = self.state();
        state.channel_mut(channel_id)?.archived = true;
        state.effects.push(ChatEffect::Archive {
            channel_id: channel_id.to_string(),
        });
        Ok(())
    }

    async fn user_name(&self, user_id: &str) -> Result<String, ChatError> {
        self.state()
            .users
            .get(user_id)
            .cloned()
            .ok_or_else(|| RemoteError::permanent(RemoteService::Chat, "user_not_found").into())
    }

    async fn open_view(&self, trigger_id: &str, view: &Value) -> Result<String, ChatError> {
        info!(trigger_id, "Opening modal");
        let mut state = self.state();
        let view_id = state.next('V');
        state.effects.push(ChatEffect::OpenView {
            trigger_id: trigger_id.to_string(),
            view_id: view_id.clone(),
            view: view.clone(),
        });
        Ok(view_id)
    }

    async fn respond(&self, response_url: &str, body: &Value) -> Result<(), ChatError> {
        info!(response_url, "Responding to interaction");
        self.state().effects.push(ChatEffect::Respond {
            response_url: response_url.to_string(),
            body: body.clone(),
        });
        Ok(())
    }
}
