//! Placebo - a Slack bot that keeps a puzzle-hunt tracker in sync.
//!
//! Slash commands and dialogs arrive over HTTP ([`server`]), are turned into
//! tasks ([`commands`]) and run one at a time by the [`worker`], which drives
//! the tracker spreadsheet ([`tracker`]), puzzle channels ([`chat`]) and
//! puzzle documents ([`documents`]).

pub mod alerts;
pub mod chat;
pub mod commands;
pub mod config;
pub mod documents;
pub mod google;
pub mod remote;
pub mod server;
pub mod tracker;
pub mod types;
pub mod worker;

#[cfg(test)]
mod test_utils;
