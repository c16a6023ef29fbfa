// SPDX-FileCopyrightText: 2026 Chatharvest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Resume checkpoint: the id of the last fully processed user.
//!
//! Stored as plain decimal text in a file outside the database, so an
//! interrupted run can be restarted from where it stopped. The file exists
//! only while a run is incomplete.

use std::io;
use std::path::{Path, PathBuf};

use chatharvest_core::{HarvestError, UserLink};
use tracing::{debug, warn};

/// Handle to the checkpoint file.
#[derive(Debug, Clone)]
pub struct Checkpoint {
    path: PathBuf,
}

impl Checkpoint {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn err(&self, source: io::Error) -> HarvestError {
        HarvestError::Checkpoint {
            path: self.path.clone(),
            source,
        }
    }

    /// The recorded user id, or `None` when no run is pending.
    ///
    /// Content that is not a user id is reported and treated as absent.
    pub fn load(&self) -> Result<Option<i64>, HarvestError> {
        let content = match std::fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(self.err(e)),
        };
        match content.trim().parse::<i64>() {
            Ok(id) => Ok(Some(id)),
            Err(_) => {
                warn!(
                    path = %self.path.display(),
                    content = %content.trim(),
                    "ignoring unreadable checkpoint"
                );
                Ok(None)
            }
        }
    }

    /// Mark a run as in progress. An existing checkpoint is left alone;
    /// a fresh one records `0`, which resumes from the first user.
    pub fn begin(&self) -> Result<(), HarvestError> {
        if self.path.exists() {
            return Ok(());
        }
        self.advance(0)
    }

    /// Record `user_id` as the last fully processed user.
    ///
    /// Written to a sibling temp file and renamed over the old one, so a
    /// crash never leaves a half-written id behind.
    pub fn advance(&self, user_id: i64) -> Result<(), HarvestError> {
        if let Some(parent) = self.path.parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent).map_err(|e| self.err(e))?;
        }
        let tmp = self.path.with_extension("tmp");
        std::fs::write(&tmp, user_id.to_string()).map_err(|e| self.err(e))?;
        std::fs::rename(&tmp, &self.path).map_err(|e| self.err(e))?;
        debug!(user_id, "checkpoint advanced");
        Ok(())
    }

    /// Remove the checkpoint after a complete run. Absent is fine.
    pub fn clear(&self) -> Result<(), HarvestError> {
        match std::fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(self.err(e)),
        }
    }
}

/// Users still to process: those with an id strictly above the checkpoint,
/// in the order given.
pub fn resume_worklist(users: Vec<UserLink>, checkpoint: Option<i64>) -> Vec<UserLink> {
    match checkpoint {
        Some(last) => users.into_iter().filter(|u| u.id > last).collect(),
        None => users,
    }
}
