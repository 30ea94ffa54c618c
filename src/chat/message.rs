//! Typed Slack message payloads.
//!
//! Only the subset of Block Kit and legacy attachments the bot posts is
//! modelled. Everything serializes to the JSON shape Slack expects.

use serde::{Deserialize, Serialize};

/// A Block Kit text object.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Text {
    PlainText {
        text: String,
        #[serde(default)]
        emoji: bool,
    },
    Mrkdwn {
        text: String,
    },
}

impl Text {
    pub fn plain(text: impl Into<String>) -> Self {
        Text::PlainText {
            text: text.into(),
            emoji: false,
        }
    }

    /// Plain text with `:emoji:` codes rendered.
    pub fn plain_emoji(text: impl Into<String>) -> Self {
        Text::PlainText {
            text: text.into(),
            emoji: true,
        }
    }

    pub fn mrkdwn(text: impl Into<String>) -> Self {
        Text::Mrkdwn { text: text.into() }
    }

    pub fn as_str(&self) -> &str {
        match self {
            Text::PlainText { text, .. } | Text::Mrkdwn { text } => text,
        }
    }
}

/// A confirmation dialog shown before a button's action runs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Confirm {
    pub title: Text,
    pub text: Text,
    pub confirm: Text,
    pub deny: Text,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Accessory {
    Button {
        text: Text,
        value: String,
        action_id: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        confirm: Option<Confirm>,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Block {
    Section {
        text: Text,
        #[serde(skip_serializing_if = "Option::is_none")]
        accessory: Option<Accessory>,
    },
}

impl Block {
    pub fn section(text: Text) -> Self {
        Block::Section {
            text,
            accessory: None,
        }
    }
}

/// A legacy attachment, used for the colored unlock announcements.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Attachment {
    /// `#rrggbb` bar color.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
    pub title: String,
    pub title_link: String,
    pub text: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub mrkdwn_in: Vec<String>,
}

/// A message to post.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Message {
    /// Fallback text for notifications.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub text: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub blocks: Vec<Block>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub attachments: Vec<Attachment>,
}

impl Message {
    pub fn text(text: impl Into<String>) -> Self {
        Message {
            text: text.into(),
            ..Message::default()
        }
    }

    pub fn with_attachment(attachment: Attachment) -> Self {
        Message {
            attachments: vec![attachment],
            ..Message::default()
        }
    }
}

/// An ephemeral reply posted to a slash command's response URL.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EphemeralReply {
    pub response_type: String,
    pub text: String,
}

impl EphemeralReply {
    pub fn new(text: impl Into<String>) -> Self {
        EphemeralReply {
            response_type: "ephemeral".to_string(),
            text: text.into(),
        }
    }
}
