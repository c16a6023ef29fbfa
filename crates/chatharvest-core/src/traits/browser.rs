// SPDX-FileCopyrightText: 2026 Chatharvest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Browser capability interface.
//!
//! The scraper only needs a handful of primitives from the browser: load a
//! URL, read the rendered HTML, run a script, and query or poke elements by
//! CSS selector. Everything else (classification, date handling) operates on
//! the HTML returned by [`BrowserSession::page_source`].

use std::time::Duration;

use async_trait::async_trait;

use crate::error::HarvestError;
use crate::traits::adapter::PluginAdapter;

/// Interval between polls in the default [`BrowserSession::wait_for`].
const WAIT_POLL_INTERVAL: Duration = Duration::from_millis(250);

/// One live, exclusively owned browser session.
#[async_trait]
pub trait BrowserSession: PluginAdapter {
    /// Loads `url` in the main tab. Any failure is reported as
    /// [`HarvestError::Navigation`].
    async fn navigate(&self, url: &str) -> Result<(), HarvestError>;

    /// Serialized HTML of the main tab's current document.
    async fn page_source(&self) -> Result<String, HarvestError>;

    /// Evaluates a script expression in the main tab and returns its JSON value.
    async fn evaluate(&self, script: &str) -> Result<serde_json::Value, HarvestError>;

    /// Number of elements currently matching `selector`.
    async fn count(&self, selector: &str) -> Result<usize, HarvestError>;

    /// Clicks the first element matching `selector`.
    async fn click(&self, selector: &str) -> Result<(), HarvestError>;

    /// Replaces the value of the first input matching `selector` with `text`.
    async fn type_text(&self, selector: &str, text: &str) -> Result<(), HarvestError>;

    /// Opens `url` in a second tab, waits up to `timeout` for `ready_selector`,
    /// returns that tab's HTML and closes it. `Ok(None)` means the selector
    /// never appeared. The main tab is left untouched.
    async fn fetch_detached(
        &self,
        url: &str,
        ready_selector: &str,
        timeout: Duration,
    ) -> Result<Option<String>, HarvestError>;

    /// Polls until `selector` matches at least one element or `timeout` elapses.
    ///
    /// Query errors during the wait count as "not yet present".
    async fn wait_for(&self, selector: &str, timeout: Duration) -> Result<bool, HarvestError> {
        let deadline = tokio::time::Instant::now() + timeout;
        loop {
            if matches!(self.count(selector).await, Ok(n) if n > 0) {
                return Ok(true);
            }
            if tokio::time::Instant::now() >= deadline {
                return Ok(false);
            }
            tokio::time::sleep(WAIT_POLL_INTERVAL).await;
        }
    }
}

/// Produces fresh, not-yet-authenticated browser sessions.
#[async_trait]
pub trait SessionFactory: Send + Sync {
    async fn launch(&self) -> Result<Box<dyn BrowserSession>, HarvestError>;
}
