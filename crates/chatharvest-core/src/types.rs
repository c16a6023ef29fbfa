// SPDX-FileCopyrightText: 2026 Chatharvest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Domain types shared by the store, the scraper, and the analysis stage.

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

/// Canonical textual form of [`Message::time_sent`] in the store.
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Health status reported by adapter health checks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HealthStatus {
    /// Adapter is fully operational.
    Healthy,
    /// Adapter is operational but experiencing issues.
    Degraded(String),
    /// Adapter is not operational.
    Unhealthy(String),
}

/// Identifies the kind of adapter behind a [`PluginAdapter`](crate::PluginAdapter).
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
pub enum AdapterType {
    Storage,
    Browser,
}

/// Which side of the conversation wrote a message.
///
/// The string forms are the CRM's own markers (`you` for the contact, `me`
/// for the account operator) and are what the `messages.sender` column holds.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
pub enum Sender {
    #[strum(serialize = "you")]
    #[serde(rename = "you")]
    Customer,
    #[strum(serialize = "me")]
    #[serde(rename = "me")]
    Support,
}

/// One CRM contact as stored in the `users` table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: i64,
    pub line_name: String,
    /// Link to the contact's detail page, relative to the CRM base URL.
    pub href: String,
    /// Support agent assigned from the assignment sheet.
    pub support: Option<String>,
    /// `YYYY-MM-DD HH:MM` as shown on the detail page.
    pub friend_registered_at: Option<String>,
    /// Comma-joined tag names.
    pub tags: Option<String>,
    /// JSON object of profile-panel label/value pairs.
    pub friend_value: Option<String>,
}

/// A user row to be inserted during roster scraping.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewUser {
    pub line_name: String,
    pub href: String,
    pub friend_registered_at: Option<String>,
    pub support: Option<String>,
}

/// The (id, href) pair handed to the message and tag scrapers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserLink {
    pub id: i64,
    pub href: String,
}

/// A transcript entry ready to be persisted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    pub user_id: i64,
    pub sender: Sender,
    pub sender_name: Option<String>,
    /// Message body; embedded line breaks are preserved.
    pub text: String,
    pub time_sent: NaiveDateTime,
}

impl Message {
    /// The `time_sent` value in its stored textual form.
    pub fn time_sent_text(&self) -> String {
        self.time_sent.format(TIMESTAMP_FORMAT).to_string()
    }
}

/// A message read back from the store, with its row id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredMessage {
    pub id: i64,
    pub message: Message,
}

/// A user together with their full transcript, as consumed by the analysis stage.
#[derive(Debug, Clone)]
pub struct Conversation {
    pub user: User,
    pub messages: Vec<StoredMessage>,
}

/// Result of applying a name-to-agent mapping to the `users` table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SupportSyncReport {
    /// Rows whose `support` column was rewritten.
    pub updated: usize,
    /// Total rows in `users` at the time of the sync.
    pub total: usize,
}
