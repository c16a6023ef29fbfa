// SPDX-FileCopyrightText: 2026 Chatharvest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Transcript assembly: classified blocks in, dated messages out.

use chatharvest_core::{Message, Sender};
use chrono::NaiveDate;
use tracing::{trace, warn};

use crate::classify::Block;
use crate::time::{normalize_time_sent, TimeError};

/// A message that could not be dated and was left out.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DroppedMessage {
    pub time_raw: String,
    pub error: TimeError,
}

/// One user's transcript, ready to persist.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Transcript {
    /// Messages in document order.
    pub messages: Vec<Message>,
    pub dropped: Vec<DroppedMessage>,
}

/// Walk `blocks` in document order, carrying the last date separator forward.
///
/// The carried date starts empty for every call, so no date leaks from one
/// user's transcript into the next. Support messages without a name of their
/// own are attributed to `page_agent`.
pub fn assemble(user_id: i64, blocks: &[Block], page_agent: Option<&str>) -> Transcript {
    let mut current_date: Option<NaiveDate> = None;
    let mut transcript = Transcript::default();

    for block in blocks {
        match block {
            Block::DateHeader(date) => current_date = Some(*date),
            Block::Skip(reason) => trace!(user_id, ?reason, "block skipped"),
            Block::Message(raw) => match normalize_time_sent(current_date, &raw.time_raw) {
                Ok(time_sent) => {
                    let sender_name = match raw.sender {
                        Sender::Support => raw
                            .sender_name
                            .clone()
                            .or_else(|| page_agent.map(str::to_string)),
                        Sender::Customer => raw.sender_name.clone(),
                    };
                    transcript.messages.push(Message {
                        user_id,
                        sender: raw.sender,
                        sender_name,
                        text: raw.text.clone(),
                        time_sent,
                    });
                }
                Err(error) => {
                    warn!(
                        user_id,
                        raw = %raw.time_raw,
                        current_date = ?current_date,
                        %error,
                        "dropping message"
                    );
                    transcript.dropped.push(DroppedMessage {
                        time_raw: raw.time_raw.clone(),
                        error,
                    });
                }
            },
        }
    }

    transcript
}
