// SPDX-FileCopyrightText: 2026 Chatharvest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Error types for Chatharvest.

use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

/// The primary error type used across all adapter traits and run loops.
#[derive(Debug, Error)]
pub enum HarvestError {
    /// Configuration errors (invalid TOML, bad URL, out-of-range tunables).
    #[error("configuration error: {0}")]
    Config(String),

    /// Storage backend errors (database connection, query failure, migration).
    #[error("storage error: {source}")]
    Storage {
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// Browser automation errors (launch failure, script error, detached page).
    #[error("browser error: {message}")]
    Browser {
        message: String,
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// A page navigation did not complete. Triggers session recovery.
    #[error("navigation to {url} failed: {message}")]
    Navigation { url: String, message: String },

    /// A profile or tag panel never rendered within its wait budget.
    #[error("panel `{panel}` did not render within {timeout:?}")]
    PanelTimeout { panel: String, timeout: Duration },

    /// The resume checkpoint file could not be read or written.
    #[error("checkpoint file {}: {source}", path.display())]
    Checkpoint {
        path: PathBuf,
        source: std::io::Error,
    },

    /// The operator cancelled the run at the re-authentication gate.
    #[error("run cancelled by operator")]
    Cancelled,

    /// Internal or unexpected errors.
    #[error("internal error: {0}")]
    Internal(String),
}

impl HarvestError {
    /// Shorthand for a browser error without an underlying source.
    pub fn browser(message: impl Into<String>) -> Self {
        HarvestError::Browser {
            message: message.into(),
            source: None,
        }
    }
}
