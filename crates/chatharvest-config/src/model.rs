// SPDX-FileCopyrightText: 2026 Chatharvest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration model structs.
//!
//! All structs use `#[serde(deny_unknown_fields)]` so a misspelled key is
//! reported at startup instead of silently falling back to a default.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Top-level Chatharvest configuration.
///
/// Every section is optional and defaults to the values the CRM scraper was
/// tuned with.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct HarvestConfig {
    #[serde(default)]
    pub logging: LoggingConfig,

    /// CRM location and optional login pre-fill credentials.
    #[serde(default)]
    pub crm: CrmConfig,

    #[serde(default)]
    pub browser: BrowserConfig,

    /// Transcript scroll-exhaustion tunables.
    #[serde(default)]
    pub scroll: ScrollConfig,

    /// Per-user wait budgets and the checkpoint location.
    #[serde(default)]
    pub scrape: ScrapeConfig,

    #[serde(default)]
    pub gate: GateConfig,

    #[serde(default)]
    pub storage: StorageConfig,

    #[serde(default)]
    pub analysis: AnalysisConfig,
}

/// Logging configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct LoggingConfig {
    /// Logging level (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

/// CRM site configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct CrmConfig {
    /// Scheme and host of the CRM. User hrefs are resolved against it.
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Path of the login page, relative to `base_url`.
    #[serde(default = "default_login_path")]
    pub login_path: String,

    /// Pre-filled into the login form when set. The operator still submits it.
    #[serde(default)]
    pub login_email: Option<String>,

    #[serde(default)]
    pub login_password: Option<String>,

    /// Friend-list page the roster scrape starts from. When unset the roster
    /// scrape starts on whatever page the operator left open at the gate.
    #[serde(default)]
    pub friend_list_path: Option<String>,
}

impl Default for CrmConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            login_path: default_login_path(),
            login_email: None,
            login_password: None,
            friend_list_path: None,
        }
    }
}

impl CrmConfig {
    /// Absolute URL for a site-relative path or href.
    pub fn resolve(&self, href: &str) -> String {
        if href.starts_with("http://") || href.starts_with("https://") {
            return href.to_string();
        }
        let base = self.base_url.trim_end_matches('/');
        if href.starts_with('/') {
            format!("{base}{href}")
        } else {
            format!("{base}/{href}")
        }
    }

    pub fn login_url(&self) -> String {
        self.resolve(&self.login_path)
    }
}

fn default_base_url() -> String {
    "https://step.lme.jp".to_string()
}

fn default_login_path() -> String {
    "/".to_string()
}

/// Browser launch configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct BrowserConfig {
    /// Run without a window. The operator cannot log in to a headless browser,
    /// so this is only useful with an already-authenticated profile.
    #[serde(default)]
    pub headless: bool,

    /// Path to a Chrome/Chromium binary. Auto-detected when unset.
    #[serde(default)]
    pub executable: Option<String>,

    /// Persistent profile directory, so cookies survive restarts.
    #[serde(default)]
    pub user_data_dir: Option<String>,

    #[serde(default = "default_launch_timeout_secs")]
    pub launch_timeout_secs: u64,
}

impl Default for BrowserConfig {
    fn default() -> Self {
        Self {
            headless: false,
            executable: None,
            user_data_dir: None,
            launch_timeout_secs: default_launch_timeout_secs(),
        }
    }
}

fn default_launch_timeout_secs() -> u64 {
    20
}

/// Scroll-exhaustion configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct ScrollConfig {
    /// Hard cap on scroll rounds per transcript.
    #[serde(default = "default_max_loops")]
    pub max_loops: u32,

    /// Consecutive rounds without new blocks before history counts as loaded.
    #[serde(default = "default_stable_rounds")]
    pub stable_rounds: u32,

    /// Wait after each scroll command before counting blocks.
    #[serde(default = "default_interval_ms")]
    pub interval_ms: u64,

    /// Wait for the first transcript block before the first round.
    #[serde(default = "default_initial_wait_secs")]
    pub initial_wait_secs: u64,

    /// Extra wait when a round observes no blocks at all.
    #[serde(default = "default_empty_retry_ms")]
    pub empty_retry_ms: u64,

    /// Final wait after the loop so the DOM settles.
    #[serde(default = "default_settle_ms")]
    pub settle_ms: u64,
}

impl Default for ScrollConfig {
    fn default() -> Self {
        Self {
            max_loops: default_max_loops(),
            stable_rounds: default_stable_rounds(),
            interval_ms: default_interval_ms(),
            initial_wait_secs: default_initial_wait_secs(),
            empty_retry_ms: default_empty_retry_ms(),
            settle_ms: default_settle_ms(),
        }
    }
}

fn default_max_loops() -> u32 {
    60
}

fn default_stable_rounds() -> u32 {
    3
}

fn default_interval_ms() -> u64 {
    500
}

fn default_initial_wait_secs() -> u64 {
    15
}

fn default_empty_retry_ms() -> u64 {
    300
}

fn default_settle_ms() -> u64 {
    300
}

/// Per-user scraping configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct ScrapeConfig {
    /// Plain-text file holding the last fully processed user id.
    #[serde(default = "default_checkpoint_path")]
    pub checkpoint_path: String,

    #[serde(default = "default_chat_button_timeout_secs")]
    pub chat_button_timeout_secs: u64,

    /// Pause after opening the chat view.
    #[serde(default = "default_chat_open_delay_ms")]
    pub chat_open_delay_ms: u64,

    #[serde(default = "default_friend_info_timeout_secs")]
    pub friend_info_timeout_secs: u64,

    #[serde(default = "default_tag_tab_timeout_secs")]
    pub tag_tab_timeout_secs: u64,

    #[serde(default = "default_tag_panel_timeout_secs")]
    pub tag_panel_timeout_secs: u64,

    /// Pause after clicking the tag tab.
    #[serde(default = "default_tag_tab_delay_ms")]
    pub tag_tab_delay_ms: u64,

    /// Wait for the detail page opened in a second tab during roster scraping.
    #[serde(default = "default_detail_timeout_secs")]
    pub detail_timeout_secs: u64,

    /// Pause between roster rows.
    #[serde(default = "default_roster_row_delay_ms")]
    pub roster_row_delay_ms: u64,

    /// Pause after turning a roster page.
    #[serde(default = "default_page_turn_delay_ms")]
    pub page_turn_delay_ms: u64,

    /// Wait for the login form fields to appear before pre-filling them.
    #[serde(default = "default_login_form_timeout_secs")]
    pub login_form_timeout_secs: u64,
}

impl Default for ScrapeConfig {
    fn default() -> Self {
        Self {
            checkpoint_path: default_checkpoint_path(),
            chat_button_timeout_secs: default_chat_button_timeout_secs(),
            chat_open_delay_ms: default_chat_open_delay_ms(),
            friend_info_timeout_secs: default_friend_info_timeout_secs(),
            tag_tab_timeout_secs: default_tag_tab_timeout_secs(),
            tag_panel_timeout_secs: default_tag_panel_timeout_secs(),
            tag_tab_delay_ms: default_tag_tab_delay_ms(),
            detail_timeout_secs: default_detail_timeout_secs(),
            roster_row_delay_ms: default_roster_row_delay_ms(),
            page_turn_delay_ms: default_page_turn_delay_ms(),
            login_form_timeout_secs: default_login_form_timeout_secs(),
        }
    }
}

impl ScrapeConfig {
    pub fn chat_button_timeout(&self) -> Duration {
        Duration::from_secs(self.chat_button_timeout_secs)
    }

    pub fn chat_open_delay(&self) -> Duration {
        Duration::from_millis(self.chat_open_delay_ms)
    }

    pub fn friend_info_timeout(&self) -> Duration {
        Duration::from_secs(self.friend_info_timeout_secs)
    }

    pub fn tag_tab_timeout(&self) -> Duration {
        Duration::from_secs(self.tag_tab_timeout_secs)
    }

    pub fn tag_panel_timeout(&self) -> Duration {
        Duration::from_secs(self.tag_panel_timeout_secs)
    }

    pub fn tag_tab_delay(&self) -> Duration {
        Duration::from_millis(self.tag_tab_delay_ms)
    }

    pub fn detail_timeout(&self) -> Duration {
        Duration::from_secs(self.detail_timeout_secs)
    }

    pub fn roster_row_delay(&self) -> Duration {
        Duration::from_millis(self.roster_row_delay_ms)
    }

    pub fn page_turn_delay(&self) -> Duration {
        Duration::from_millis(self.page_turn_delay_ms)
    }

    pub fn login_form_timeout(&self) -> Duration {
        Duration::from_secs(self.login_form_timeout_secs)
    }
}

fn default_checkpoint_path() -> String {
    "last_user_id.txt".to_string()
}

fn default_chat_button_timeout_secs() -> u64 {
    10
}

fn default_chat_open_delay_ms() -> u64 {
    3000
}

fn default_friend_info_timeout_secs() -> u64 {
    12
}

fn default_tag_tab_timeout_secs() -> u64 {
    10
}

fn default_tag_panel_timeout_secs() -> u64 {
    10
}

fn default_tag_tab_delay_ms() -> u64 {
    500
}

fn default_detail_timeout_secs() -> u64 {
    12
}

fn default_roster_row_delay_ms() -> u64 {
    200
}

fn default_page_turn_delay_ms() -> u64 {
    2000
}

fn default_login_form_timeout_secs() -> u64 {
    20
}

/// Operator gate configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct GateConfig {
    /// How often the worker checks for the operator's answer.
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,
}

impl Default for GateConfig {
    fn default() -> Self {
        Self {
            poll_interval_ms: default_poll_interval_ms(),
        }
    }
}

fn default_poll_interval_ms() -> u64 {
    100
}

/// Storage backend configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct StorageConfig {
    /// Path to the SQLite database file.
    #[serde(default = "default_database_path")]
    pub database_path: String,

    /// Enable WAL (Write-Ahead Logging) mode for SQLite.
    #[serde(default = "default_wal_mode")]
    pub wal_mode: bool,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            database_path: default_database_path(),
            wal_mode: default_wal_mode(),
        }
    }
}

fn default_database_path() -> String {
    dirs::data_dir()
        .map(|p| p.join("chatharvest").join("chatharvest.db"))
        .unwrap_or_else(|| std::path::PathBuf::from("chatharvest.db"))
        .to_string_lossy()
        .into_owned()
}

fn default_wal_mode() -> bool {
    true
}

/// Conversation dataset configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct AnalysisConfig {
    /// Directory the JSONL datasets are written to.
    #[serde(default = "default_output_dir")]
    pub output_dir: String,

    /// Budget for the tail-first transcript excerpt in each record.
    #[serde(default = "default_max_transcript_chars")]
    pub max_transcript_chars: usize,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            output_dir: default_output_dir(),
            max_transcript_chars: default_max_transcript_chars(),
        }
    }
}

fn default_output_dir() -> String {
    "analysis_out".to_string()
}

fn default_max_transcript_chars() -> usize {
    12_000
}
