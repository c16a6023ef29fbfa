// SPDX-FileCopyrightText: 2026 Chatharvest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! JSONL conversation datasets, one file per support agent.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use chatharvest_config::model::AnalysisConfig;
use chatharvest_core::types::Conversation;
use chatharvest_core::{HarvestError, Sender, StorageAdapter, StoredMessage};
use regex::Regex;
use serde::Serialize;
use thiserror::Error;
use tracing::info;

use crate::metrics::{response_metrics, ResponseMetrics};

static NON_WORD: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[^\w\-]+").expect("static regex is valid"));
static UNDERSCORES: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"_+").expect("static regex is valid"));

#[derive(Debug, Error)]
pub enum DatasetError {
    #[error(transparent)]
    Storage(#[from] HarvestError),

    #[error("could not write {}: {source}", path.display())]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("could not encode record: {0}")]
    Encode(#[from] serde_json::Error),
}

/// File-name-safe form of an agent name. Word characters in any script are kept.
pub fn slug(name: &str) -> String {
    let replaced = NON_WORD.replace_all(name.trim(), "_");
    let collapsed = UNDERSCORES.replace_all(&replaced, "_");
    let trimmed = collapsed.trim_matches('_');
    if trimmed.is_empty() {
        "unknown".to_string()
    } else {
        trimmed.to_string()
    }
}

pub fn dataset_file_name(support: &str) -> String {
    format!("conversations_{}.jsonl", slug(support))
}

#[derive(Debug, Serialize)]
struct MessageRecord<'a> {
    msg_id: i64,
    sender: Sender,
    text: &'a str,
    time: String,
}

#[derive(Debug, Serialize)]
struct ConversationRecord<'a> {
    user_id: i64,
    line_name: &'a str,
    href: &'a str,
    support: Option<&'a str>,
    message_count: usize,
    response_metrics: ResponseMetrics,
    llm_text: String,
    messages: Vec<MessageRecord<'a>>,
}

fn transcript_line(message: &StoredMessage) -> String {
    let m = &message.message;
    format!("[{}] {}: {}\n", m.time_sent_text(), m.sender, m.text.trim())
}

/// The most recent lines of a transcript that fit in `max_chars`, oldest first.
///
/// Lines are kept whole; the first line that would overflow ends the excerpt.
pub fn truncate_for_llm(messages: &[StoredMessage], max_chars: usize) -> String {
    let mut kept = Vec::new();
    let mut total = 0;
    for message in messages.iter().rev() {
        let line = transcript_line(message);
        let len = line.chars().count();
        if total + len > max_chars {
            break;
        }
        total += len;
        kept.push(line);
    }
    kept.reverse();
    kept.concat()
}

fn record(conversation: &Conversation, max_chars: usize) -> ConversationRecord<'_> {
    let user = &conversation.user;
    ConversationRecord {
        user_id: user.id,
        line_name: &user.line_name,
        href: &user.href,
        support: user.support.as_deref(),
        message_count: conversation.messages.len(),
        response_metrics: response_metrics(&conversation.messages),
        llm_text: truncate_for_llm(&conversation.messages, max_chars),
        messages: conversation
            .messages
            .iter()
            .map(|m| MessageRecord {
                msg_id: m.id,
                sender: m.message.sender,
                text: m.message.text.trim(),
                time: m.message.time_sent_text(),
            })
            .collect(),
    }
}

/// Write conversations as JSONL, one record per line.
pub fn write_dataset(
    path: &Path,
    conversations: &[Conversation],
    max_chars: usize,
) -> Result<(), DatasetError> {
    let io_err = |source| DatasetError::Io {
        path: path.to_path_buf(),
        source,
    };
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        std::fs::create_dir_all(parent).map_err(io_err)?;
    }

    let mut out = BufWriter::new(File::create(path).map_err(io_err)?);
    for conversation in conversations {
        serde_json::to_writer(&mut out, &record(conversation, max_chars))?;
        out.write_all(b"\n").map_err(io_err)?;
    }
    out.flush().map_err(io_err)?;
    Ok(())
}

/// Where a dataset went and how many conversations it holds.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DatasetSummary {
    pub path: PathBuf,
    pub conversations: usize,
}

/// Build the dataset for one agent under `config.output_dir`.
pub async fn build_dataset(
    storage: &dyn StorageAdapter,
    support: &str,
    config: &AnalysisConfig,
) -> Result<DatasetSummary, DatasetError> {
    let conversations = storage.conversations_for_support(support).await?;
    let path = Path::new(&config.output_dir).join(dataset_file_name(support));
    write_dataset(&path, &conversations, config.max_transcript_chars)?;

    info!(
        support,
        conversations = conversations.len(),
        path = %path.display(),
        "dataset written"
    );
    Ok(DatasetSummary {
        path,
        conversations: conversations.len(),
    })
}
