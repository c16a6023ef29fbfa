// SPDX-FileCopyrightText: 2026 Chatharvest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration loader using Figment for layered config merging.
//!
//! Supports XDG hierarchy: `./chatharvest.toml` > `~/.config/chatharvest/chatharvest.toml`
//! > `/etc/chatharvest/chatharvest.toml`, with environment variable overrides via
//! the `CHATHARVEST_` prefix.

#![allow(clippy::result_large_err)] // figment::Error is external and cannot be boxed without wrapper

use std::path::{Path, PathBuf};

use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};

use tracing::debug;

use crate::diagnostic::section_names;
use crate::model::HarvestConfig;

/// Config file name looked up in each directory of the hierarchy.
pub const CONFIG_FILE_NAME: &str = "chatharvest.toml";

/// The files of the lookup hierarchy, lowest precedence first.
pub fn config_file_candidates() -> Vec<PathBuf> {
    let mut paths = vec![PathBuf::from("/etc/chatharvest").join(CONFIG_FILE_NAME)];
    if let Some(dir) = dirs::config_dir() {
        paths.push(dir.join("chatharvest").join(CONFIG_FILE_NAME));
    }
    paths.push(PathBuf::from(CONFIG_FILE_NAME));
    paths
}

/// Load configuration from the standard XDG hierarchy with env var overrides.
///
/// Merge order (later overrides earlier):
/// 1. Compiled defaults
/// 2. `/etc/chatharvest/chatharvest.toml`
/// 3. `~/.config/chatharvest/chatharvest.toml`
/// 4. `./chatharvest.toml`
/// 5. `CHATHARVEST_*` environment variables
pub fn load_config() -> Result<HarvestConfig, figment::Error> {
    build_figment().extract()
}

/// Load configuration from a TOML string only (no file lookup, no env).
pub fn load_config_from_str(toml_content: &str) -> Result<HarvestConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(HarvestConfig::default()))
        .merge(Toml::string(toml_content))
        .extract()
}

/// Load configuration from a specific file path with env var overrides.
pub fn load_config_from_path(path: &Path) -> Result<HarvestConfig, figment::Error> {
    debug!(path = %path.display(), "loading explicit config file");
    Figment::new()
        .merge(Serialized::defaults(HarvestConfig::default()))
        .merge(Toml::file(path))
        .merge(env_provider())
        .extract()
}

/// Build the Figment used for hierarchy loading, before extraction.
pub fn build_figment() -> Figment {
    config_file_candidates()
        .into_iter()
        .fold(
            Figment::new().merge(Serialized::defaults(HarvestConfig::default())),
            |figment, path| {
                if path.is_file() {
                    debug!(path = %path.display(), "merging config file");
                }
                figment.merge(Toml::file(path))
            },
        )
        .merge(env_provider())
}

/// Environment provider mapping `CHATHARVEST_SCRAPE_CHECKPOINT_PATH` to
/// `scrape.checkpoint_path`.
///
/// Only the first underscore after a known section name becomes a dot, so
/// keys that themselves contain underscores survive intact.
fn env_provider() -> Env {
    Env::prefixed("CHATHARVEST_").map(|key| map_env_key(key.as_str()).into())
}

/// Map a lowercased, prefix-stripped env var name to a dotted config path.
pub fn map_env_key(key: &str) -> String {
    for section in section_names() {
        if let Some(rest) = key.strip_prefix(section).and_then(|r| r.strip_prefix('_')) {
            return format!("{section}.{rest}");
        }
    }
    key.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn env_keys_split_on_section_only() {
        assert_eq!(map_env_key("crm_login_password"), "crm.login_password");
        assert_eq!(map_env_key("scroll_max_loops"), "scroll.max_loops");
        assert_eq!(
            map_env_key("analysis_max_transcript_chars"),
            "analysis.max_transcript_chars"
        );
        assert_eq!(map_env_key("unknown_key"), "unknown_key");
    }

    #[test]
    fn hierarchy_ends_with_local_file() {
        let candidates = config_file_candidates();
        assert_eq!(candidates.last(), Some(&PathBuf::from(CONFIG_FILE_NAME)));
    }

    #[test]
    #[tracing_test::traced_test]
    fn explicit_file_is_logged_and_merged() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(CONFIG_FILE_NAME);
        std::fs::write(&path, "[scroll]\nmax_loops = 7\n").unwrap();

        let config = load_config_from_path(&path).unwrap();
        assert_eq!(config.scroll.max_loops, 7);
        assert!(logs_contain("loading explicit config file"));
    }
}
