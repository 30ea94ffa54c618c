//! The chat workspace: puzzle channels, announcements and dialogs.

pub mod client;
pub mod coordinator;
pub mod dialog;
pub mod error;
pub mod memory;
pub mod message;
pub mod slack;

pub use client::{Channel, ChatClient};
pub use coordinator::{ChannelCoordinator, SolveOutcome};
pub use dialog::DialogKind;
pub use error::ChatError;
pub use memory::{ChatEffect, MemoryChat};
pub use message::{Attachment, Block, Message, Text};
pub use slack::SlackClient;
