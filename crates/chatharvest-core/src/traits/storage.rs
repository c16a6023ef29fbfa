// SPDX-FileCopyrightText: 2026 Chatharvest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Storage adapter trait for the users/messages store.

use async_trait::async_trait;

use crate::error::HarvestError;
use crate::traits::adapter::PluginAdapter;
use crate::types::{
    Conversation, Message, NewUser, StoredMessage, SupportSyncReport, User, UserLink,
};

/// Adapter for the durable users/messages store.
///
/// Every call is a discrete unit of work: no transaction spans two calls, so a
/// crash loses at most the write in flight.
#[async_trait]
pub trait StorageAdapter: PluginAdapter {
    /// Initializes the storage backend (migrations, pragmas).
    async fn initialize(&self) -> Result<(), HarvestError>;

    /// Closes the storage backend, flushing pending writes.
    async fn close(&self) -> Result<(), HarvestError>;

    /// Deletes every row of both tables.
    async fn reset(&self) -> Result<(), HarvestError>;

    // --- Users ---

    /// Inserts a user and returns the assigned id.
    async fn insert_user(&self, user: &NewUser) -> Result<i64, HarvestError>;

    /// All users as (id, href) pairs in ascending id order.
    async fn list_user_links(&self) -> Result<Vec<UserLink>, HarvestError>;

    async fn list_users(&self) -> Result<Vec<User>, HarvestError>;

    async fn get_user(&self, id: i64) -> Result<Option<User>, HarvestError>;

    async fn update_friend_value(&self, id: i64, friend_value: &str) -> Result<(), HarvestError>;

    async fn update_tags(&self, id: i64, tags: &str) -> Result<(), HarvestError>;

    /// Sets `support` on every user whose `line_name` matches a mapping entry.
    async fn apply_support_assignments(
        &self,
        assignments: &[(String, String)],
    ) -> Result<SupportSyncReport, HarvestError>;

    async fn count_users(&self) -> Result<i64, HarvestError>;

    // --- Messages ---

    /// Stores one user's transcript atomically, replacing any rows already
    /// held for that user. Returns the number of rows written.
    async fn insert_messages(
        &self,
        user_id: i64,
        messages: &[Message],
    ) -> Result<usize, HarvestError>;

    /// A user's messages ordered by `time_sent`, then insertion order.
    async fn messages_for_user(&self, user_id: i64) -> Result<Vec<StoredMessage>, HarvestError>;

    /// Every user assigned to `support`, each with their full transcript.
    async fn conversations_for_support(
        &self,
        support: &str,
    ) -> Result<Vec<Conversation>, HarvestError>;

    async fn count_messages(&self) -> Result<i64, HarvestError>;
}
