// SPDX-FileCopyrightText: 2026 Chatharvest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Post-deserialization validation for configuration values.
//!
//! Validates semantic constraints that cannot be expressed via serde attributes,
//! such as a well-formed CRM URL, non-empty paths, and non-zero loop bounds.

use url::Url;

use crate::diagnostic::ConfigError;
use crate::model::HarvestConfig;

const LOG_LEVELS: &[&str] = &["trace", "debug", "info", "warn", "error"];

/// Validate a deserialized configuration for semantic correctness.
///
/// Returns `Ok(())` if all validations pass, or `Err(Vec<ConfigError>)` with
/// all collected validation errors (does not fail fast).
pub fn validate_config(config: &HarvestConfig) -> Result<(), Vec<ConfigError>> {
    let mut errors = Vec::new();
    let mut fail = |message: String| errors.push(ConfigError::Validation { message });

    if !LOG_LEVELS.contains(&config.logging.level.to_ascii_lowercase().as_str()) {
        fail(format!(
            "logging.level `{}` is not one of {}",
            config.logging.level,
            LOG_LEVELS.join(", ")
        ));
    }

    match Url::parse(&config.crm.base_url) {
        Ok(url) if matches!(url.scheme(), "http" | "https") => {}
        Ok(url) => fail(format!(
            "crm.base_url must use http or https, got `{}`",
            url.scheme()
        )),
        Err(e) => fail(format!(
            "crm.base_url `{}` is not a valid URL: {e}",
            config.crm.base_url
        )),
    }

    if config.crm.login_password.is_some() && config.crm.login_email.is_none() {
        fail("crm.login_password is set but crm.login_email is not".to_string());
    }

    if config.storage.database_path.trim().is_empty() {
        fail("storage.database_path must not be empty".to_string());
    }

    if config.scrape.checkpoint_path.trim().is_empty() {
        fail("scrape.checkpoint_path must not be empty".to_string());
    }

    if config.analysis.output_dir.trim().is_empty() {
        fail("analysis.output_dir must not be empty".to_string());
    }

    if config.scroll.max_loops == 0 {
        fail("scroll.max_loops must be at least 1".to_string());
    }

    if config.scroll.stable_rounds == 0 {
        fail("scroll.stable_rounds must be at least 1".to_string());
    }

    if config.gate.poll_interval_ms == 0 {
        fail("gate.poll_interval_ms must be greater than 0".to_string());
    }

    if config.analysis.max_transcript_chars == 0 {
        fail("analysis.max_transcript_chars must be greater than 0".to_string());
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
