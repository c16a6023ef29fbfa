// SPDX-FileCopyrightText: 2026 Chatharvest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Message CRUD operations.

use std::str::FromStr;

use chatharvest_core::HarvestError;
use chatharvest_core::types::{
    Conversation, Message, Sender, StoredMessage, TIMESTAMP_FORMAT,
};
use chrono::NaiveDateTime;
use rusqlite::types::Type;
use rusqlite::{params, Connection, Row};
use tracing::debug;

use crate::database::Database;
use crate::queries::users::user_from_row;

fn conversion_error(
    idx: usize,
    err: impl std::error::Error + Send + Sync + 'static,
) -> rusqlite::Error {
    rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(err))
}

fn stored_message_from_row(row: &Row<'_>) -> rusqlite::Result<StoredMessage> {
    let sender: String = row.get(3)?;
    let time_sent: String = row.get(5)?;
    Ok(StoredMessage {
        id: row.get(0)?,
        message: Message {
            user_id: row.get(1)?,
            sender_name: row.get(2)?,
            sender: Sender::from_str(&sender).map_err(|e| conversion_error(3, e))?,
            text: row.get(4)?,
            time_sent: NaiveDateTime::parse_from_str(&time_sent, TIMESTAMP_FORMAT)
                .map_err(|e| conversion_error(5, e))?,
        },
    })
}

fn select_for_user(conn: &Connection, user_id: i64) -> rusqlite::Result<Vec<StoredMessage>> {
    let mut stmt = conn.prepare(
        "SELECT id, user_id, sender_name, sender, message, time_sent
         FROM messages WHERE user_id = ?1
         ORDER BY time_sent ASC, id ASC",
    )?;
    let rows = stmt.query_map(params![user_id], stored_message_from_row)?;
    rows.collect()
}

/// Store one user's transcript in a single transaction, in document order.
///
/// Any rows already held for `user_id` are deleted first, so scraping a user
/// twice leaves one copy. Either the whole replacement lands or nothing
/// changes.
pub async fn insert_messages(
    db: &Database,
    user_id: i64,
    messages: &[Message],
) -> Result<usize, HarvestError> {
    let messages = messages.to_vec();
    db.connection()
        .call(move |conn| {
            let tx = conn.transaction()?;
            let replaced = tx.execute("DELETE FROM messages WHERE user_id = ?1", params![user_id])?;
            {
                let mut stmt = tx.prepare(
                    "INSERT INTO messages (user_id, sender_name, sender, message, time_sent)
                     VALUES (?1, ?2, ?3, ?4, ?5)",
                )?;
                for msg in &messages {
                    stmt.execute(params![
                        msg.user_id,
                        msg.sender_name,
                        msg.sender.to_string(),
                        msg.text,
                        msg.time_sent_text(),
                    ])?;
                }
            }
            tx.commit()?;
            if replaced > 0 {
                debug!(user_id, replaced, "replaced earlier transcript");
            }
            Ok(messages.len())
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// A user's messages ordered by `time_sent`, ties broken by insertion order.
pub async fn messages_for_user(
    db: &Database,
    user_id: i64,
) -> Result<Vec<StoredMessage>, HarvestError> {
    db.connection()
        .call(move |conn| select_for_user(conn, user_id))
        .await
        .map_err(crate::database::map_tr_err)
}

/// Every user assigned to `support` (ascending id) with their transcripts.
pub async fn conversations_for_support(
    db: &Database,
    support: &str,
) -> Result<Vec<Conversation>, HarvestError> {
    let support = support.to_string();
    db.connection()
        .call(move |conn| {
            let users = {
                let mut stmt = conn.prepare(
                    "SELECT id, line_name, href, support, friend_registered_at, tags, friend_value
                     FROM users WHERE support = ?1 ORDER BY id ASC",
                )?;
                let rows = stmt.query_map(params![support], user_from_row)?;
                rows.collect::<rusqlite::Result<Vec<_>>>()?
            };
            users
                .into_iter()
                .map(|user| {
                    let messages = select_for_user(conn, user.id)?;
                    Ok(Conversation { user, messages })
                })
                .collect()
        })
        .await
        .map_err(crate::database::map_tr_err)
}

pub async fn count_messages(db: &Database) -> Result<i64, HarvestError> {
    db.connection()
        .call(|conn| conn.query_row("SELECT COUNT(*) FROM messages", [], |row| row.get(0)))
        .await
        .map_err(crate::database::map_tr_err)
}
