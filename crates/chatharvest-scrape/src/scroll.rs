// SPDX-FileCopyrightText: 2026 Chatharvest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Scroll-exhaustion for lazily loaded transcripts.
//!
//! The chat view only renders recent history; older messages load as the
//! view is scrolled to the top. [`exhaust_scroll`] keeps scrolling until the
//! block count stops growing for a few consecutive rounds, or gives up after
//! a fixed number of rounds.

use std::time::Duration;

use chatharvest_config::model::ScrollConfig;
use chatharvest_core::{BrowserSession, HarvestError};
use tracing::{debug, warn};

use crate::selectors::{MESSAGE_BLOCKS, SCROLL_CONTAINERS};

/// Loop bounds and pacing for [`exhaust_scroll`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScrollSettings {
    pub max_loops: u32,
    pub stable_rounds: u32,
    pub interval: Duration,
    pub initial_wait: Duration,
    pub empty_retry: Duration,
    pub settle: Duration,
}

impl From<&ScrollConfig> for ScrollSettings {
    fn from(config: &ScrollConfig) -> Self {
        Self {
            max_loops: config.max_loops,
            stable_rounds: config.stable_rounds,
            interval: Duration::from_millis(config.interval_ms),
            initial_wait: Duration::from_secs(config.initial_wait_secs),
            empty_retry: Duration::from_millis(config.empty_retry_ms),
            settle: Duration::from_millis(config.settle_ms),
        }
    }
}

impl Default for ScrollSettings {
    fn default() -> Self {
        Self::from(&ScrollConfig::default())
    }
}

/// What a scroll-exhaustion pass observed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScrollReport {
    /// Rounds actually run, at most `max_loops`.
    pub rounds: u32,
    /// Last non-zero block count seen.
    pub final_count: usize,
    /// True when the count held steady for `stable_rounds` rounds; false
    /// when the round budget ran out first.
    pub stabilized: bool,
}

/// Script that scrolls the first matching container (or the window) to the
/// top and fires a `scroll` event for listeners that load on it.
pub fn scroll_to_top_script() -> String {
    let containers =
        serde_json::to_string(SCROLL_CONTAINERS).unwrap_or_else(|_| "[]".to_string());
    format!(
        "(() => {{\
           const el = {containers}.map(s => document.querySelector(s)).find(e => e);\
           if (el) {{ el.scrollTop = 0; }} else {{ window.scrollTo(0, 0); }}\
           window.dispatchEvent(new Event('scroll'));\
           return el ? el.scrollHeight : null;\
         }})()"
    )
}

/// Query errors count as "nothing rendered yet".
async fn block_count(session: &dyn BrowserSession) -> usize {
    session.count(MESSAGE_BLOCKS).await.unwrap_or(0)
}

/// Scroll the open chat view until its full history has loaded.
///
/// Always returns after at most `max_loops` rounds. A round that sees no
/// blocks at all waits `empty_retry` and does not count toward stability.
pub async fn exhaust_scroll(
    session: &dyn BrowserSession,
    settings: &ScrollSettings,
) -> Result<ScrollReport, HarvestError> {
    if !session.wait_for(MESSAGE_BLOCKS, settings.initial_wait).await? {
        debug!(
            wait = ?settings.initial_wait,
            "no transcript blocks before first scroll"
        );
    }
    tokio::time::sleep(settings.interval).await;

    let script = scroll_to_top_script();
    let mut last_count = block_count(session).await;
    let mut streak = 0;
    let mut rounds = 0;
    let mut stabilized = false;

    while rounds < settings.max_loops {
        rounds += 1;
        if let Err(e) = session.evaluate(&script).await {
            warn!(round = rounds, error = %e, "scroll command failed");
        }
        tokio::time::sleep(settings.interval).await;

        let count = block_count(session).await;
        if count == 0 {
            tokio::time::sleep(settings.empty_retry).await;
            continue;
        }

        if count == last_count {
            streak += 1;
        } else {
            streak = 0;
            last_count = count;
        }
        debug!(round = rounds, count, streak, "scroll round");

        if streak >= settings.stable_rounds {
            stabilized = true;
            break;
        }
    }

    tokio::time::sleep(settings.settle).await;

    if !stabilized {
        warn!(
            rounds,
            count = last_count,
            "transcript still growing when scroll budget ran out"
        );
    }

    Ok(ScrollReport {
        rounds,
        final_count: last_count,
        stabilized,
    })
}
