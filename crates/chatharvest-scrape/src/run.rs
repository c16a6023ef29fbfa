// SPDX-FileCopyrightText: 2026 Chatharvest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The run context shared by the roster, message, and tag operations.

use std::fmt;
use std::sync::Arc;

use chatharvest_config::model::{CrmConfig, HarvestConfig, ScrapeConfig};
use chatharvest_core::{GatePrompt, HarvestError, ReauthGate, SessionFactory, StorageAdapter};
use tokio_util::sync::CancellationToken;

use crate::checkpoint::Checkpoint;
use crate::login::{open_authenticated_session, LoginSettings};
use crate::progress::{ProgressEvent, ProgressSink};
use crate::recovery::SessionGuard;
use crate::scroll::ScrollSettings;

/// How a run ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunOutcome {
    /// Every user in the worklist was processed or skipped.
    Completed { processed: usize, skipped: usize },
    /// Stopped early by the operator or a shutdown signal.
    Interrupted { last_completed: Option<i64> },
}

impl fmt::Display for RunOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RunOutcome::Completed { processed, skipped } => {
                write!(f, "completed: {processed} processed, {skipped} skipped")
            }
            RunOutcome::Interrupted {
                last_completed: Some(id),
            } => write!(f, "interrupted after user {id}; the next run resumes from there"),
            RunOutcome::Interrupted {
                last_completed: None,
            } => write!(f, "interrupted before any user completed"),
        }
    }
}

/// Error kinds that end a single user's work without ending the run.
pub(crate) fn is_user_scoped(err: &HarvestError) -> bool {
    matches!(
        err,
        HarvestError::Browser { .. }
            | HarvestError::Navigation { .. }
            | HarvestError::PanelTimeout { .. }
            | HarvestError::Internal(_)
    )
}

/// Everything a scrape run needs: the store, a way to get browsers, the
/// operator gate, and the tunables.
pub struct Harvester {
    pub(crate) storage: Arc<dyn StorageAdapter>,
    pub(crate) factory: Arc<dyn SessionFactory>,
    pub(crate) gate: Arc<dyn ReauthGate>,
    pub(crate) crm: CrmConfig,
    pub(crate) scrape: ScrapeConfig,
    pub(crate) scroll: ScrollSettings,
    pub(crate) login: LoginSettings,
    pub(crate) progress: ProgressSink,
    pub(crate) cancel: CancellationToken,
}

impl Harvester {
    pub fn new(
        config: &HarvestConfig,
        storage: Arc<dyn StorageAdapter>,
        factory: Arc<dyn SessionFactory>,
        gate: Arc<dyn ReauthGate>,
    ) -> Self {
        Self {
            storage,
            factory,
            gate,
            crm: config.crm.clone(),
            scrape: config.scrape.clone(),
            scroll: ScrollSettings::from(&config.scroll),
            login: LoginSettings::from_config(&config.crm, &config.scrape),
            progress: ProgressSink::disabled(),
            cancel: CancellationToken::new(),
        }
    }

    pub fn with_progress(mut self, progress: ProgressSink) -> Self {
        self.progress = progress;
        self
    }

    /// Stop at the next user boundary once `cancel` fires.
    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn checkpoint(&self) -> Checkpoint {
        Checkpoint::new(&self.scrape.checkpoint_path)
    }

    pub fn storage(&self) -> &Arc<dyn StorageAdapter> {
        &self.storage
    }

    /// Launch a browser and wait for the operator to log in.
    ///
    /// `Ok(None)` when the operator cancels at the gate.
    pub async fn open_session(
        &self,
        prompt: &GatePrompt,
    ) -> Result<Option<SessionGuard>, HarvestError> {
        let session = open_authenticated_session(
            self.factory.as_ref(),
            self.gate.as_ref(),
            &self.login,
            prompt,
        )
        .await?;

        Ok(session.map(|session| {
            SessionGuard::new(
                session,
                self.factory.clone(),
                self.gate.clone(),
                self.login.clone(),
                self.progress.clone(),
            )
        }))
    }

    pub(crate) fn finish(&self, outcome: RunOutcome) -> RunOutcome {
        self.progress.emit(ProgressEvent::RunFinished(outcome.clone()));
        outcome
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn outcomes_render_for_the_console() {
        assert_eq!(
            RunOutcome::Completed {
                processed: 2,
                skipped: 1
            }
            .to_string(),
            "completed: 2 processed, 1 skipped"
        );
        assert_eq!(
            RunOutcome::Interrupted {
                last_completed: Some(41)
            }
            .to_string(),
            "interrupted after user 41; the next run resumes from there"
        );
    }

    #[test]
    fn storage_and_checkpoint_errors_end_the_run() {
        assert!(is_user_scoped(&HarvestError::browser("stale element")));
        assert!(is_user_scoped(&HarvestError::Navigation {
            url: "u".into(),
            message: "m".into()
        }));
        assert!(!is_user_scoped(&HarvestError::Storage {
            source: "disk full".into()
        }));
        assert!(!is_user_scoped(&HarvestError::Cancelled));
    }
}
