//! Chat-side effects of the worker's tasks.
//!
//! The coordinator owns the only piece of chat state the bot keeps: the
//! in-flight messages posted to the QM channel while someone has a dialog
//! open, keyed by view id. It is owned by the worker, so it is only ever
//! touched from one task at a time, and it starts empty at process start.

use std::collections::HashMap;
use std::hash::{Hash, Hasher};

use chrono::{Duration, Utc};
use serde_json::{Map, Value};
use tracing::{debug, error, info, warn};

use crate::types::{Color, channel_name_for_url};

use super::client::{Channel, ChatClient};
use super::dialog::DialogKind;
use super::error::ChatError;
use super::message::{Accessory, Attachment, Block, Confirm, EphemeralReply, Message, Text};

/// Celebration emoji for solved puzzles.
pub const SUCCESS_EMOJI: [&str; 33] = [
    "sunglasses",
    "hugging_face",
    "dancer",
    "muscle",
    "thumbsup",
    "clap",
    "raised_hands",
    "brain",
    "boom",
    "fireworks",
    "sparkler",
    "sparkles",
    "balloon",
    "tada",
    "confetti_ball",
    "medal",
    "trophy",
    "first_place_medal",
    "dart",
    "star",
    "stars",
    "rainbow",
    "fire",
    "musical_note",
    "notes",
    "ballot_box_with_check",
    "100",
    "checkered_flag",
    "awesome",
    "bananadance",
    "bb8",
    "parrot",
    "woo",
];

// Weighted towards 4 and 5.
const EMOJI_COUNTS: [usize; 6] = [3, 4, 4, 5, 5, 6];

/// Action id of the archive button on solve announcements.
pub const ARCHIVE_ACTION: &str = "archive";

const ARCHIVE_NOTE: &str =
    "\n\nThis channel will be archived, but feel free to un-archive it if you want to keep talking.";

/// A channel with no messages for this long is archived when its puzzle is solved.
pub const INACTIVITY_WINDOW_MINUTES: i64 = 30;

/// Picks 3 to 6 distinct emoji codes, deterministically from `seed`.
pub fn celebration_emoji(seed: &str) -> String {
    let mut hasher = std::hash::DefaultHasher::new();
    seed.hash(&mut hasher);
    let mut state = hasher.finish();

    let count = EMOJI_COUNTS[(state % EMOJI_COUNTS.len() as u64) as usize];
    let mut pool = SUCCESS_EMOJI.to_vec();
    let mut emoji = String::new();
    for _ in 0..count {
        state = state
            .wrapping_mul(6364136223846793005)
            .wrapping_add(1442695040888963407);
        let index = ((state >> 33) % pool.len() as u64) as usize;
        emoji.push(':');
        emoji.push_str(pool.swap_remove(index));
        emoji.push(':');
    }
    emoji
}

/// What happened to a puzzle channel on solve.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SolveOutcome {
    Archived,
    /// Left open with an archive button.
    KeptOpen,
}

/// Posts announcements and manages puzzle channels.
#[derive(Debug)]
pub struct ChannelCoordinator<C> {
    client: C,
    qm_channel_id: String,
    unlocks_channel_id: String,
    in_flight: HashMap<String, String>,
}

impl<C: ChatClient> ChannelCoordinator<C> {
    pub fn new(
        client: C,
        qm_channel_id: impl Into<String>,
        unlocks_channel_id: impl Into<String>,
    ) -> Self {
        ChannelCoordinator {
            client,
            qm_channel_id: qm_channel_id.into(),
            unlocks_channel_id: unlocks_channel_id.into(),
            in_flight: HashMap::new(),
        }
    }

    /// Number of in-flight messages awaiting their dialog's close.
    pub fn in_flight_count(&self) -> usize {
        self.in_flight.len()
    }

    /// Creates the channel for a puzzle URL, or reuses the existing channel of
    /// the same name, and sets its topic to the URL.
    pub async fn create_channel(
        &self,
        puzzle_url: &str,
        prefix: Option<&str>,
    ) -> Result<Channel, ChatError> {
        let name = channel_name_for_url(puzzle_url, prefix);
        let channel = match self.client.create_channel(&name).await {
            Ok(channel) => channel,
            Err(ChatError::NameTaken { .. }) => {
                let id = self.client.find_channel_id(&name).await?;
                info!(channel = %name, "reusing existing channel");
                Channel { id, name }
            }
            Err(e) => return Err(e),
        };
        self.client.set_topic(&channel.id, puzzle_url).await?;
        Ok(channel)
    }

    /// Sets the topic once the puzzle's document exists.
    pub async fn set_document_topic(
        &self,
        channel_id: &str,
        puzzle_url: &str,
        document_url: &str,
    ) -> Result<(), ChatError> {
        self.client
            .set_topic(channel_id, &format!("{puzzle_url} | {document_url}"))
            .await
    }

    /// Announces a puzzle unlock in the unlocks channel.
    pub async fn announce_unlock(
        &self,
        round_name: Option<&str>,
        puzzle_name: &str,
        puzzle_url: &str,
        channel: &Channel,
        color: Option<Color>,
    ) -> Result<(), ChatError> {
        let mut lines = Vec::new();
        if let Some(round) = round_name.filter(|r| !r.is_empty()) {
            lines.push(format!("Round: {round}"));
        }
        lines.push(format!("<#{}|{}>", channel.id, channel.name));

        let message = Message::with_attachment(Attachment {
            color: color.map(|c| c.to_hex()),
            title: puzzle_name.to_string(),
            title_link: puzzle_url.to_string(),
            text: lines.join("\n"),
            mrkdwn_in: Vec::new(),
        });
        self.client
            .post_message(&self.unlocks_channel_id, &message)
            .await?;
        Ok(())
    }

    /// Announces a new round in the unlocks channel.
    pub async fn announce_round(
        &self,
        round_name: &str,
        round_url: &str,
        color: Option<Color>,
    ) -> Result<(), ChatError> {
        let message = Message::with_attachment(Attachment {
            color: color.map(|c| c.to_hex()),
            title: round_name.to_string(),
            title_link: round_url.to_string(),
            text: "*New round unlocked!*".to_string(),
            mrkdwn_in: vec!["text".to_string()],
        });
        self.client
            .post_message(&self.unlocks_channel_id, &message)
            .await?;
        Ok(())
    }

    /// Congratulates the channel and archives it if it has gone quiet.
    ///
    /// A failed recency check counts as activity.
    pub async fn solved(&self, channel_name: &str, answer: &str) -> Result<SolveOutcome, ChatError> {
        let channel_id = self.client.find_channel_id(channel_name).await?;
        let since = Utc::now() - Duration::minutes(INACTIVITY_WINDOW_MINUTES);
        let active = match self.client.has_recent_activity(&channel_id, since).await {
            Ok(active) => active,
            Err(e) => {
                warn!(channel = %channel_name, error = %e, "could not read channel history, keeping it open");
                true
            }
        };

        let message = solve_message(channel_name, &channel_id, answer, !active);
        self.client.post_message(&channel_id, &message).await?;

        if active {
            info!(channel = %channel_name, "not archiving puzzle channel");
            return Ok(SolveOutcome::KeptOpen);
        }
        self.client.archive_channel(&channel_id).await?;
        Ok(SolveOutcome::Archived)
    }

    /// Handles a press of the archive button.
    ///
    /// The button is replaced with a note naming the user. A failure to
    /// update the message is logged; the channel is archived regardless.
    pub async fn archive_on_request(
        &self,
        channel_id: &str,
        user_id: &str,
        response_url: &str,
        message: Map<String, Value>,
    ) -> Result<(), ChatError> {
        let replacement = remove_archive_offer(
            message,
            &format!("Archiving this channel at <@{user_id}>'s request."),
        );
        if let Err(e) = self
            .client
            .respond(response_url, &Value::Object(replacement))
            .await
        {
            error!(error = %e, "could not update the archive offer");
        }
        self.client.archive_channel(channel_id).await
    }

    /// Posts an ephemeral reply to a command's response URL. Never fails.
    pub async fn acknowledge(&self, response_url: Option<&str>, text: &str) {
        let Some(url) = response_url.filter(|u| !u.is_empty()) else {
            return;
        };
        info!("logging ephemeral acknowledgment");
        let reply = match serde_json::to_value(EphemeralReply::new(text)) {
            Ok(reply) => reply,
            Err(e) => {
                error!(error = %e, "could not serialize acknowledgment");
                return;
            }
        };
        if let Err(e) = self.client.respond(url, &reply).await {
            error!(error = %e, "could not log ephemeral acknowledgment");
        }
    }

    /// Opens a dialog and tells the QM channel who is using it.
    pub async fn open_dialog(
        &mut self,
        kind: DialogKind,
        trigger_id: &str,
        user_id: &str,
        view: &Value,
    ) -> Result<String, ChatError> {
        let view_id = self.client.open_view(trigger_id, view).await?;
        self.post_in_flight(&view_id, user_id, kind.activity()).await?;
        Ok(view_id)
    }

    async fn post_in_flight(
        &mut self,
        view_id: &str,
        user_id: &str,
        activity: &str,
    ) -> Result<(), ChatError> {
        let user_name = self.client.user_name(user_id).await?;
        let ts = self
            .client
            .post_message(
                &self.qm_channel_id,
                &Message::text(format!("*{user_name}* {activity}")),
            )
            .await?;
        debug!(view_id, ts = %ts, "storing in-flight message");
        self.in_flight.insert(view_id.to_string(), ts);
        Ok(())
    }

    /// Removes the in-flight message of a closed or submitted dialog.
    pub async fn view_closed(&mut self, view_id: &str) -> Result<(), ChatError> {
        let Some(ts) = self.in_flight.remove(view_id) else {
            info!(view_id, "no in-flight message stored for view");
            return Ok(());
        };
        self.client.delete_message(&self.qm_channel_id, &ts).await
    }
}

fn solve_message(channel_name: &str, channel_id: &str, answer: &str, archiving: bool) -> Message {
    let mut text = format!(
        "This puzzle is solved! \"{answer}\" is correct. Congratulations! {}",
        celebration_emoji(answer)
    );
    if archiving {
        text.push_str(ARCHIVE_NOTE);
        return Message {
            blocks: vec![Block::section(Text::plain_emoji(text.clone()))],
            text,
            ..Message::default()
        };
    }

    let offer = Block::Section {
        text: Text::plain("If you're done using this channel, would you like to clean it up?"),
        accessory: Some(Accessory::Button {
            text: Text::plain(format!("Archive #{channel_name}")),
            value: channel_id.to_string(),
            action_id: ARCHIVE_ACTION.to_string(),
            confirm: Some(Confirm {
                title: Text::plain(format!("Archive #{channel_name}?")),
                text: Text::plain(
                    "You won't be able to send messages to it anymore, but you'll still be able \
                     to read it, and you can always un-archive it if you like.",
                ),
                confirm: Text::plain("Yes, archive it"),
                deny: Text::plain("No, leave it open"),
            }),
        }),
    };
    Message {
        blocks: vec![Block::section(Text::plain_emoji(text.clone())), offer],
        text,
        ..Message::default()
    }
}

/// Replaces the archive offer (the second block) of a solve announcement,
/// keeping the congratulation.
pub fn remove_archive_offer(
    mut message: Map<String, Value>,
    replacement_text: &str,
) -> Map<String, Value> {
    let note = serde_json::json!({
        "type": "section",
        "text": Text::mrkdwn(replacement_text),
    });
    match message.get_mut("blocks").and_then(Value::as_array_mut) {
        Some(blocks) if blocks.len() > 1 => blocks[1] = note,
        Some(blocks) => blocks.push(note),
        None => {
            message.insert("blocks".to_string(), Value::Array(vec![note]));
        }
    }
    message.insert("replace_original".to_string(), Value::Bool(true));
    message
}
