// SPDX-FileCopyrightText: 2026 Chatharvest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The message run: per-user transcript extraction with resume and recovery.

use chatharvest_core::{BrowserSession, HarvestError, UserLink};
use tracing::{info, warn};

use crate::assemble::assemble;
use crate::checkpoint::{resume_worklist, Checkpoint};
use crate::classify::{classify_document, page_agent};
use crate::login::login_prompt;
use crate::profile::{parse_friend_info, EMPTY_PROFILE};
use crate::progress::ProgressEvent;
use crate::recovery::{NavigationOutcome, SessionGuard};
use crate::run::{is_user_scoped, Harvester, RunOutcome};
use crate::scroll::exhaust_scroll;
use crate::selectors::{CHAT_BUTTON, FRIEND_INFO_LABEL};

/// What happened to one user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UserScrape {
    Stored { stored: usize, dropped: usize },
    /// The chat view could not be opened; profile set to `{}`.
    NoChat { reason: String },
}

struct RunState {
    processed: usize,
    skipped: usize,
    last_completed: Option<i64>,
}

impl Harvester {
    /// Scrape transcripts for every user after the checkpoint.
    pub async fn scrape_messages(&self) -> Result<RunOutcome, HarvestError> {
        let checkpoint = self.checkpoint();
        let resume_after = checkpoint.load()?.filter(|id| *id > 0);
        let users = self.storage.list_user_links().await?;
        let worklist = resume_worklist(users, resume_after);
        if let Some(last) = resume_after {
            info!(last, remaining = worklist.len(), "resuming message scrape");
        }

        let Some(mut guard) = self.open_session(&login_prompt(None)).await? else {
            return Ok(self.finish(RunOutcome::Interrupted {
                last_completed: resume_after,
            }));
        };

        let result = self
            .run_worklist(&mut guard, &checkpoint, &worklist, resume_after)
            .await;
        guard.shutdown().await;
        result.map(|outcome| self.finish(outcome))
    }

    async fn run_worklist(
        &self,
        guard: &mut SessionGuard,
        checkpoint: &Checkpoint,
        worklist: &[UserLink],
        resume_after: Option<i64>,
    ) -> Result<RunOutcome, HarvestError> {
        checkpoint.begin()?;
        let total = worklist.len();
        self.progress.emit(ProgressEvent::RunStarted {
            operation: "messages",
            total,
            resume_after,
        });

        let mut state = RunState {
            processed: 0,
            skipped: 0,
            last_completed: resume_after,
        };

        for (index, user) in worklist.iter().enumerate() {
            if self.cancel.is_cancelled() {
                info!(user_id = user.id, "shutdown requested, stopping before next user");
                return Ok(RunOutcome::Interrupted {
                    last_completed: state.last_completed,
                });
            }
            self.progress.emit(ProgressEvent::UserStarted {
                user_id: user.id,
                position: index + 1,
                total,
            });

            let url = self.crm.resolve(&user.href);
            match guard.navigate(&url).await {
                NavigationOutcome::Loaded => {}
                NavigationOutcome::Skipped { reason } => {
                    self.skip(&mut state, checkpoint, user.id, reason)?;
                    continue;
                }
                NavigationOutcome::Aborted => {
                    return Ok(RunOutcome::Interrupted {
                        last_completed: state.last_completed,
                    });
                }
            }

            match self.scrape_user(guard.session(), user).await {
                Ok(UserScrape::Stored { stored, dropped }) => {
                    checkpoint.advance(user.id)?;
                    state.processed += 1;
                    state.last_completed = Some(user.id);
                    self.progress.emit(ProgressEvent::UserCompleted {
                        user_id: user.id,
                        stored,
                        dropped,
                    });
                }
                Ok(UserScrape::NoChat { reason }) => {
                    self.skip(&mut state, checkpoint, user.id, reason)?;
                }
                Err(e) if is_user_scoped(&e) => {
                    warn!(user_id = user.id, error = %e, "message scrape failed for user");
                    self.skip(&mut state, checkpoint, user.id, e.to_string())?;
                }
                Err(e) => return Err(e),
            }
        }

        checkpoint.clear()?;
        info!(
            processed = state.processed,
            skipped = state.skipped,
            "message scrape finished"
        );
        Ok(RunOutcome::Completed {
            processed: state.processed,
            skipped: state.skipped,
        })
    }

    fn skip(
        &self,
        state: &mut RunState,
        checkpoint: &Checkpoint,
        user_id: i64,
        reason: String,
    ) -> Result<(), HarvestError> {
        checkpoint.advance(user_id)?;
        state.skipped += 1;
        state.last_completed = Some(user_id);
        self.progress
            .emit(ProgressEvent::UserSkipped { user_id, reason });
        Ok(())
    }

    /// Extract and persist one user's profile and transcript from a loaded
    /// contact page.
    pub async fn scrape_user(
        &self,
        session: &dyn BrowserSession,
        user: &UserLink,
    ) -> Result<UserScrape, HarvestError> {
        let opened = async {
            if !session
                .wait_for(CHAT_BUTTON, self.scrape.chat_button_timeout())
                .await?
            {
                return Err(HarvestError::browser("chat button did not appear"));
            }
            session.click(CHAT_BUTTON).await
        }
        .await;
        if let Err(e) = opened {
            warn!(user_id = user.id, error = %e, "could not open chat view");
            self.storage
                .update_friend_value(user.id, EMPTY_PROFILE)
                .await?;
            return Ok(UserScrape::NoChat {
                reason: format!("chat view unavailable: {e}"),
            });
        }
        tokio::time::sleep(self.scrape.chat_open_delay()).await;

        // The page-level agent is read before scrolling: older history
        // brings in per-message staff labels with the same markup.
        let (friend_value, agent) = match self.read_profile(session).await {
            Ok(html) => (parse_friend_info(&html), page_agent(&html)),
            Err(e @ HarvestError::PanelTimeout { .. }) => {
                warn!(user_id = user.id, error = %e, "profile panel missing, storing empty profile");
                let html = session.page_source().await?;
                (EMPTY_PROFILE.to_string(), page_agent(&html))
            }
            Err(e) => return Err(e),
        };
        self.storage
            .update_friend_value(user.id, &friend_value)
            .await?;

        let report = exhaust_scroll(session, &self.scroll).await?;
        let html = session.page_source().await?;
        let blocks = classify_document(&html);
        let transcript = assemble(user.id, &blocks, agent.as_deref());

        let stored = self
            .storage
            .insert_messages(user.id, &transcript.messages)
            .await?;
        info!(
            user_id = user.id,
            stored,
            dropped = transcript.dropped.len(),
            scroll_rounds = report.rounds,
            "transcript stored"
        );
        Ok(UserScrape::Stored {
            stored,
            dropped: transcript.dropped.len(),
        })
    }

    /// Wait for the profile panel and return the page source it was read from.
    async fn read_profile(&self, session: &dyn BrowserSession) -> Result<String, HarvestError> {
        let timeout = self.scrape.friend_info_timeout();
        if !session.wait_for(FRIEND_INFO_LABEL, timeout).await? {
            return Err(HarvestError::PanelTimeout {
                panel: "friend-info".to_string(),
                timeout,
            });
        }
        session.page_source().await
    }
}
