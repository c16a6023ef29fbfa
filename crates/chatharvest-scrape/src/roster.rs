// SPDX-FileCopyrightText: 2026 Chatharvest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Friend-list scraping: rebuilds the `users` table from the CRM's roster.

use std::sync::LazyLock;

use chatharvest_core::{BrowserSession, HarvestError, NewUser};
use regex::Regex;
use scraper::{ElementRef, Html, Selector};
use tracing::{debug, info, warn};

use crate::login::login_prompt;
use crate::progress::ProgressEvent;
use crate::run::{Harvester, RunOutcome};
use crate::selectors::{css, DETAIL_TABLE, NEXT_PAGE};

/// Detail links on the friend list all point under this path.
const MY_PAGE_LINK: &str = "a[href*='/basic/friendlist/my_page/']";
const REGISTERED_LABEL: &str = "友だち追加";

static ROWS: LazyLock<Selector> = LazyLock::new(|| css("table tr"));
static LINK: LazyLock<Selector> = LazyLock::new(|| css(MY_PAGE_LINK));
static DETAIL: LazyLock<Selector> = LazyLock::new(|| css(DETAIL_TABLE));
static CELLS: LazyLock<Selector> = LazyLock::new(|| css("td"));
static PAGER: LazyLock<Selector> = LazyLock::new(|| css(NEXT_PAGE));

static REGISTERED_AT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(\d{4}[./-]\d{2}[./-]\d{2})\s+(\d{2}:\d{2})").expect("static regex is valid")
});

/// One friend-list row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RosterRow {
    pub line_name: String,
    pub href: String,
}

fn text_of(el: ElementRef<'_>) -> String {
    el.text().collect::<String>().trim().to_string()
}

/// Rows carrying a detail link, in page order.
pub fn parse_roster_rows(html: &str) -> Vec<RosterRow> {
    let document = Html::parse_document(html);
    document
        .select(&ROWS)
        .filter_map(|row| {
            let link = row.select(&LINK).next()?;
            let href = link.value().attr("href").unwrap_or_default().to_string();
            Some(RosterRow {
                line_name: text_of(link),
                href,
            })
        })
        .collect()
}

/// Pull the "friend added" datetime off a detail page as `YYYY-MM-DD HH:MM`.
pub fn parse_friend_registered_at(html: &str) -> Option<String> {
    let document = Html::parse_document(html);
    let table = document.select(&DETAIL).next()?;

    let cells: Vec<ElementRef<'_>> = table.select(&CELLS).collect();
    let raw = cells.windows(2).find_map(|pair| {
        let label = text_of(pair[0]);
        // Both 友だち追加日付 and 友だち追加日時 appear in the wild.
        label
            .contains(REGISTERED_LABEL)
            .then(|| pair[1].text().collect::<Vec<_>>().join(" "))
    })?;

    let caps = REGISTERED_AT.captures(&raw)?;
    let date = caps[1].replace(['.', '/'], "-");
    Some(format!("{date} {}", &caps[2]))
}

/// Whether the pager arrow is present and its `<li>` is not disabled.
pub fn has_next_page(html: &str) -> bool {
    let document = Html::parse_document(html);
    let Some(arrow) = document.select(&PAGER).next() else {
        return false;
    };
    arrow
        .ancestors()
        .filter_map(ElementRef::wrap)
        .find(|el| el.value().name() == "li")
        .is_some_and(|li| !li.value().classes().any(|c| c == "disabled"))
}

impl Harvester {
    /// Replace the `users` table with the CRM's current friend list.
    ///
    /// Starts from `crm.friend_list_path` when configured, otherwise from
    /// whatever page the operator left open at the login gate.
    pub async fn scrape_roster(&self) -> Result<RunOutcome, HarvestError> {
        let extra = if self.crm.friend_list_path.is_some() {
            None
        } else {
            Some("Open the friend list.")
        };
        let Some(guard) = self.open_session(&login_prompt(extra)).await? else {
            return Ok(self.finish(RunOutcome::Interrupted {
                last_completed: None,
            }));
        };

        let result = self.walk_roster(guard.session()).await;
        guard.shutdown().await;
        result.map(|outcome| self.finish(outcome))
    }

    async fn walk_roster(&self, session: &dyn BrowserSession) -> Result<RunOutcome, HarvestError> {
        if let Some(path) = &self.crm.friend_list_path {
            session.navigate(&self.crm.resolve(path)).await?;
        }

        info!("clearing users and messages before roster import");
        self.storage.reset().await?;
        self.checkpoint().clear()?;
        self.progress.emit(ProgressEvent::RunStarted {
            operation: "roster",
            total: 0,
            resume_after: None,
        });

        let mut inserted = 0usize;
        let mut last_id = None;
        let mut page = 1usize;
        loop {
            let html = session.page_source().await?;
            let rows = parse_roster_rows(&html);
            debug!(page, rows = rows.len(), "friend list page");

            for row in rows {
                if self.cancel.is_cancelled() {
                    return Ok(RunOutcome::Interrupted {
                        last_completed: last_id,
                    });
                }
                let friend_registered_at = self.registered_at(session, &row.href).await;
                let id = self
                    .storage
                    .insert_user(&NewUser {
                        line_name: row.line_name.clone(),
                        href: row.href,
                        friend_registered_at: friend_registered_at.clone(),
                        support: None,
                    })
                    .await?;
                self.progress.emit(ProgressEvent::RosterUser {
                    line_name: row.line_name,
                    friend_registered_at,
                });
                last_id = Some(id);
                inserted += 1;
                tokio::time::sleep(self.scrape.roster_row_delay()).await;
            }

            if !has_next_page(&html) {
                break;
            }
            session.click(NEXT_PAGE).await?;
            tokio::time::sleep(self.scrape.page_turn_delay()).await;
            page += 1;
        }

        info!(users = inserted, pages = page, "roster import finished");
        Ok(RunOutcome::Completed {
            processed: inserted,
            skipped: 0,
        })
    }

    /// Detail-page lookups are best effort; a user without a date is still imported.
    async fn registered_at(&self, session: &dyn BrowserSession, href: &str) -> Option<String> {
        if href.is_empty() {
            return None;
        }
        let url = self.crm.resolve(href);
        match session
            .fetch_detached(&url, DETAIL_TABLE, self.scrape.detail_timeout())
            .await
        {
            Ok(Some(html)) => {
                let value = parse_friend_registered_at(&html);
                if value.is_none() {
                    debug!(url, "no friend-added datetime on detail page");
                }
                value
            }
            Ok(None) => {
                warn!(url, "detail page did not render");
                None
            }
            Err(e) => {
                warn!(url, error = %e, "could not open detail page");
                None
            }
        }
    }
}
