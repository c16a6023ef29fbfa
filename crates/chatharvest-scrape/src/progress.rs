// SPDX-FileCopyrightText: 2026 Chatharvest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Progress notifications from the scrape worker to the operator surface.

use std::fmt;

use tokio::sync::mpsc;

use crate::run::RunOutcome;

/// One thing worth telling the operator about.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProgressEvent {
    RunStarted {
        operation: &'static str,
        total: usize,
        resume_after: Option<i64>,
    },
    UserStarted {
        user_id: i64,
        position: usize,
        total: usize,
    },
    UserCompleted {
        user_id: i64,
        stored: usize,
        dropped: usize,
    },
    UserSkipped {
        user_id: i64,
        reason: String,
    },
    RosterUser {
        line_name: String,
        friend_registered_at: Option<String>,
    },
    /// The browser stopped responding; a fresh session is being opened.
    SessionLost {
        url: String,
        error: String,
    },
    SessionRecovered,
    Notice(String),
    RunFinished(RunOutcome),
}

impl fmt::Display for ProgressEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProgressEvent::RunStarted {
                operation,
                total,
                resume_after: Some(last),
            } => write!(f, "{operation}: {total} users to process (resuming after user {last})"),
            ProgressEvent::RunStarted {
                operation, total, ..
            } => write!(f, "{operation}: {total} users to process"),
            ProgressEvent::UserStarted {
                user_id,
                position,
                total,
            } => write!(f, "[{position}/{total}] user {user_id}"),
            ProgressEvent::UserCompleted {
                user_id,
                stored,
                dropped: 0,
            } => write!(f, "user {user_id}: {stored} messages stored"),
            ProgressEvent::UserCompleted {
                user_id,
                stored,
                dropped,
            } => write!(
                f,
                "user {user_id}: {stored} messages stored, {dropped} dropped"
            ),
            ProgressEvent::UserSkipped { user_id, reason } => {
                write!(f, "user {user_id} skipped: {reason}")
            }
            ProgressEvent::RosterUser {
                line_name,
                friend_registered_at,
            } => write!(
                f,
                "{line_name} (added {})",
                friend_registered_at.as_deref().unwrap_or("unknown")
            ),
            ProgressEvent::SessionLost { url, error } => {
                write!(f, "browser not responding at {url} ({error}); restarting")
            }
            ProgressEvent::SessionRecovered => write!(f, "re-login complete, resuming"),
            ProgressEvent::Notice(text) => f.write_str(text),
            ProgressEvent::RunFinished(outcome) => write!(f, "{outcome}"),
        }
    }
}

/// Sending half of the progress channel. Sends never block and are dropped
/// silently once the receiver is gone.
#[derive(Debug, Clone, Default)]
pub struct ProgressSink {
    tx: Option<mpsc::UnboundedSender<ProgressEvent>>,
}

impl ProgressSink {
    pub fn channel() -> (Self, mpsc::UnboundedReceiver<ProgressEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx: Some(tx) }, rx)
    }

    /// A sink that discards everything.
    pub fn disabled() -> Self {
        Self::default()
    }

    pub fn emit(&self, event: ProgressEvent) {
        if let Some(tx) = &self.tx {
            let _ = tx.send(event);
        }
    }

    pub fn notice(&self, text: impl Into<String>) {
        self.emit(ProgressEvent::Notice(text.into()));
    }
}
