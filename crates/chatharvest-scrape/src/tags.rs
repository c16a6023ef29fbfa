// SPDX-FileCopyrightText: 2026 Chatharvest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Tag sync: copies each contact's CRM tags into `users.tags`.

use std::sync::LazyLock;

use chatharvest_core::{BrowserSession, HarvestError, UserLink};
use scraper::{Html, Selector};
use tracing::{info, warn};

use crate::login::login_prompt;
use crate::progress::ProgressEvent;
use crate::recovery::NavigationOutcome;
use crate::run::{is_user_scoped, Harvester, RunOutcome};
use crate::selectors::{css, TAG_PANEL, TAG_TAB};

static TAG_ROWS: LazyLock<Selector> = LazyLock::new(|| css("table#table_choose_tag tbody tr"));
static CELLS: LazyLock<Selector> = LazyLock::new(|| css("td"));

/// Tag names from the tag table: the second cell of each body row.
pub fn parse_tags(html: &str) -> Vec<String> {
    let document = Html::parse_document(html);
    document
        .select(&TAG_ROWS)
        .filter_map(|row| {
            let cell = row.select(&CELLS).nth(1)?;
            let name = cell.text().collect::<Vec<_>>().join(" ");
            let name = name.split_whitespace().collect::<Vec<_>>().join(" ");
            (!name.is_empty()).then_some(name)
        })
        .collect()
}

enum TagResult {
    Stored(usize),
    NoTags,
    NoTab,
}

impl Harvester {
    /// Refresh tags for every user. The message checkpoint is not consulted.
    pub async fn sync_tags(&self) -> Result<RunOutcome, HarvestError> {
        let users = self.storage.list_user_links().await?;
        let total = users.len();

        let Some(mut guard) = self.open_session(&login_prompt(None)).await? else {
            return Ok(self.finish(RunOutcome::Interrupted {
                last_completed: None,
            }));
        };
        self.progress.emit(ProgressEvent::RunStarted {
            operation: "tags",
            total,
            resume_after: None,
        });

        let mut processed = 0;
        let mut skipped = 0;
        let mut last_completed = None;
        for (index, user) in users.iter().enumerate() {
            if self.cancel.is_cancelled() {
                guard.shutdown().await;
                return Ok(self.finish(RunOutcome::Interrupted { last_completed }));
            }
            self.progress.emit(ProgressEvent::UserStarted {
                user_id: user.id,
                position: index + 1,
                total,
            });

            match guard.navigate(&self.crm.resolve(&user.href)).await {
                NavigationOutcome::Loaded => {}
                NavigationOutcome::Skipped { reason } => {
                    self.progress.emit(ProgressEvent::UserSkipped {
                        user_id: user.id,
                        reason,
                    });
                    skipped += 1;
                    continue;
                }
                NavigationOutcome::Aborted => {
                    guard.shutdown().await;
                    return Ok(self.finish(RunOutcome::Interrupted { last_completed }));
                }
            }

            match self.tags_for_user(guard.session(), user).await {
                Ok(TagResult::Stored(count)) => {
                    info!(user_id = user.id, tags = count, "tags stored");
                    processed += 1;
                }
                Ok(TagResult::NoTags) => {
                    info!(user_id = user.id, "no tags found");
                    processed += 1;
                }
                Ok(TagResult::NoTab) => {
                    self.progress.emit(ProgressEvent::UserSkipped {
                        user_id: user.id,
                        reason: "tag tab not found".to_string(),
                    });
                    skipped += 1;
                }
                Err(e) if is_user_scoped(&e) => {
                    warn!(user_id = user.id, error = %e, "tag sync failed for user");
                    self.progress.emit(ProgressEvent::UserSkipped {
                        user_id: user.id,
                        reason: e.to_string(),
                    });
                    skipped += 1;
                }
                Err(e) => {
                    guard.shutdown().await;
                    return Err(e);
                }
            }
            last_completed = Some(user.id);
        }

        guard.shutdown().await;
        Ok(self.finish(RunOutcome::Completed { processed, skipped }))
    }

    async fn tags_for_user(
        &self,
        session: &dyn BrowserSession,
        user: &UserLink,
    ) -> Result<TagResult, HarvestError> {
        if !session.wait_for(TAG_TAB, self.scrape.tag_tab_timeout()).await? {
            return Ok(TagResult::NoTab);
        }
        session.click(TAG_TAB).await?;
        tokio::time::sleep(self.scrape.tag_tab_delay()).await;

        // An empty tag list renders no panel at all, so a timeout here is normal.
        session
            .wait_for(TAG_PANEL, self.scrape.tag_panel_timeout())
            .await?;

        let tags = parse_tags(&session.page_source().await?);
        if tags.is_empty() {
            return Ok(TagResult::NoTags);
        }
        self.storage.update_tags(user.id, &tags.join(",")).await?;
        Ok(TagResult::Stored(tags.len()))
    }
}
