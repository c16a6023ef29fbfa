// SPDX-FileCopyrightText: 2026 Chatharvest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Integration tests for the Chatharvest configuration system.

use chatharvest_config::diagnostic::ConfigError;
use chatharvest_config::model::HarvestConfig;
use chatharvest_config::{load_and_validate_path, load_and_validate_str, load_config_from_str};

/// Valid TOML with every section deserializes successfully.
#[test]
fn valid_toml_deserializes_into_harvest_config() {
    let toml = r#"
[logging]
level = "debug"

[crm]
base_url = "https://crm.example"
login_email = "ops@example.com"

[browser]
headless = true
launch_timeout_secs = 5

[scroll]
max_loops = 30
stable_rounds = 2
interval_ms = 250

[scrape]
checkpoint_path = "/var/lib/chatharvest/last_user_id.txt"
chat_open_delay_ms = 1000

[gate]
poll_interval_ms = 50

[storage]
database_path = "/tmp/test.db"
wal_mode = false

[analysis]
output_dir = "out"
max_transcript_chars = 4000
"#;

    let config = load_config_from_str(toml).expect("valid TOML should deserialize");
    assert_eq!(config.logging.level, "debug");
    assert_eq!(config.crm.base_url, "https://crm.example");
    assert_eq!(config.crm.login_email.as_deref(), Some("ops@example.com"));
    assert!(config.crm.login_password.is_none());
    assert!(config.browser.headless);
    assert_eq!(config.browser.launch_timeout_secs, 5);
    assert_eq!(config.scroll.max_loops, 30);
    assert_eq!(config.scroll.stable_rounds, 2);
    assert_eq!(config.scroll.interval_ms, 250);
    assert_eq!(config.scroll.initial_wait_secs, 15);
    assert_eq!(
        config.scrape.checkpoint_path,
        "/var/lib/chatharvest/last_user_id.txt"
    );
    assert_eq!(config.scrape.chat_open_delay_ms, 1000);
    assert_eq!(config.gate.poll_interval_ms, 50);
    assert_eq!(config.storage.database_path, "/tmp/test.db");
    assert!(!config.storage.wal_mode);
    assert_eq!(config.analysis.output_dir, "out");
    assert_eq!(config.analysis.max_transcript_chars, 4000);
}

/// Missing optional sections use defaults without error.
#[test]
fn missing_optional_sections_use_defaults() {
    let config = load_config_from_str("").expect("empty TOML should use defaults");

    assert_eq!(config.logging.level, "info");
    assert_eq!(config.crm.base_url, "https://step.lme.jp");
    assert_eq!(config.crm.login_path, "/");
    assert!(!config.browser.headless);
    assert_eq!(config.scroll.max_loops, 60);
    assert_eq!(config.scroll.stable_rounds, 3);
    assert_eq!(config.scroll.interval_ms, 500);
    assert_eq!(config.scroll.empty_retry_ms, 300);
    assert_eq!(config.scroll.settle_ms, 300);
    assert_eq!(config.scrape.checkpoint_path, "last_user_id.txt");
    assert_eq!(config.scrape.friend_info_timeout_secs, 12);
    assert_eq!(config.gate.poll_interval_ms, 100);
    assert!(config.storage.wal_mode);
    assert!(config.storage.database_path.ends_with("chatharvest.db"));
    assert_eq!(config.analysis.max_transcript_chars, 12_000);
}

/// Unknown field in [scroll] is rejected by deny_unknown_fields.
#[test]
fn unknown_field_in_scroll_produces_error() {
    let toml = r#"
[scroll]
max_loop = 3
"#;

    let err = load_config_from_str(toml).expect_err("should reject unknown field");
    let err_str = format!("{err}");
    assert!(
        err_str.contains("unknown field") || err_str.contains("max_loop"),
        "error should mention unknown field or the bad key, got: {err_str}"
    );
}

/// Unexpected top-level section is rejected.
#[test]
fn deny_unknown_fields_at_top_level() {
    let toml = r#"
[telemetry]
enabled = true
"#;

    let err = load_config_from_str(toml).expect_err("unknown section should be rejected");
    let err_str = format!("{err}");
    assert!(
        err_str.contains("unknown field") || err_str.contains("telemetry"),
        "error should mention unknown field, got: {err_str}"
    );
}

/// A dotted override, as produced from `CHATHARVEST_CRM_LOGIN_PASSWORD`,
/// lands in the right section field.
#[test]
fn env_style_override_sets_login_password() {
    use figment::{
        providers::{Format, Serialized, Toml},
        Figment,
    };

    let config: HarvestConfig = Figment::new()
        .merge(Serialized::defaults(HarvestConfig::default()))
        .merge(Toml::string("[crm]\nlogin_email = \"ops@example.com\"\n"))
        .merge(("crm.login_password", "from-env"))
        .extract()
        .expect("should merge env override");

    assert_eq!(config.crm.login_password.as_deref(), Some("from-env"));
    assert_eq!(config.crm.login_email.as_deref(), Some("ops@example.com"));
}

/// Missing config files are silently skipped (Figment's Toml::file() behavior).
#[test]
fn missing_config_files_silently_skipped() {
    use figment::{
        providers::{Format, Serialized, Toml},
        Figment,
    };

    let config: HarvestConfig = Figment::new()
        .merge(Serialized::defaults(HarvestConfig::default()))
        .merge(Toml::file("/nonexistent/path/chatharvest.toml"))
        .extract()
        .expect("missing file should be silently skipped");

    assert_eq!(config.scroll.max_loops, 60);
}

/// Unknown key produces an UnknownKey diagnostic with a suggestion and the
/// section's valid keys.
#[test]
fn diagnostic_error_includes_suggestion_and_valid_keys() {
    let toml = r#"
[scroll]
max_loop = 3
"#;

    let errors = load_and_validate_str(toml).expect_err("should produce errors");
    let found = errors.iter().any(|e| {
        matches!(e, ConfigError::UnknownKey { key, suggestion, valid_keys, .. } if {
            key == "max_loop"
                && suggestion.as_deref() == Some("max_loops")
                && valid_keys.contains("stable_rounds")
        })
    });
    assert!(found, "expected UnknownKey for max_loop, got: {errors:?}");
}

/// Invalid type (string where number expected) produces a clear message.
#[test]
fn diagnostic_invalid_type_message() {
    let toml = r#"
[scroll]
max_loops = "many"
"#;

    let errors = load_and_validate_str(toml).expect_err("should reject invalid type");
    assert!(
        errors
            .iter()
            .any(|e| matches!(e, ConfigError::InvalidType { key, .. } if key.contains("max_loops"))
                || e.to_string().contains("invalid type")),
        "error should mention type mismatch, got: {errors:?}"
    );
}

/// Semantic validation runs after a successful parse.
#[test]
fn validation_rejects_zero_max_loops() {
    let toml = r#"
[scroll]
max_loops = 0
"#;

    let errors = load_and_validate_str(toml).expect_err("zero loops should fail");
    assert!(errors.iter().any(
        |e| matches!(e, ConfigError::Validation { message } if message.contains("scroll.max_loops"))
    ));
}

/// ConfigError renders through miette's graphical handler with its help text.
#[test]
fn config_error_renders_with_miette() {
    use miette::{Diagnostic, GraphicalReportHandler};

    let error = ConfigError::UnknownKey {
        key: "base_ulr".to_string(),
        suggestion: Some("base_url".to_string()),
        valid_keys: "base_url, login_path, login_email, login_password".to_string(),
        span: None,
        src: None,
    };

    assert!(error.code().is_some());
    let help = error.help().expect("help text").to_string();
    assert!(help.contains("did you mean `base_url`"), "got: {help}");

    let mut buf = String::new();
    GraphicalReportHandler::new()
        .render_report(&mut buf, &error)
        .expect("should render without error");
    assert!(buf.contains("base_ulr"));
}

/// An explicit config file is loaded and validated.
#[test]
fn load_and_validate_explicit_path() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("chatharvest.toml");
    std::fs::write(&path, "[analysis]\noutput_dir = \"datasets\"\n").unwrap();

    let config = load_and_validate_path(&path).expect("file should validate");
    assert_eq!(config.analysis.output_dir, "datasets");
}

/// An explicit config file with a typo yields a span pointing at the key.
#[test]
fn explicit_path_typo_carries_source_span() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("chatharvest.toml");
    std::fs::write(&path, "[crm]\nbase_ulr = \"https://crm.example\"\n").unwrap();

    let errors = load_and_validate_path(&path).expect_err("typo should fail");
    assert!(errors.iter().any(|e| matches!(
        e,
        ConfigError::UnknownKey { key, .. } if key == "base_ulr"
    )));
}

/// A real key under the wrong header names the section it belongs to.
#[test]
fn misplaced_key_points_to_its_section() {
    let toml = "[scrape]\nmax_loops = 10\n";

    let errors = load_and_validate_str(toml).expect_err("misplaced key should fail");
    let error = errors
        .iter()
        .find(|e| matches!(e, ConfigError::MisplacedKey { .. }))
        .unwrap_or_else(|| panic!("expected MisplacedKey, got: {errors:?}"));
    match error {
        ConfigError::MisplacedKey {
            key,
            section,
            belongs_in,
            span,
            ..
        } => {
            assert_eq!(key, "max_loops");
            assert_eq!(section, "scrape");
            assert_eq!(belongs_in, "scroll");
            let span = span.expect("inline source carries a span");
            assert_eq!(&toml[span.offset()..span.offset() + span.len()], "max_loops");
        }
        _ => unreachable!(),
    }

    use miette::Diagnostic;
    let help = error.help().expect("help text").to_string();
    assert_eq!(help, "move it under [scroll]");
}

/// A misspelled section header gets a section suggestion.
#[test]
fn unknown_section_suggests_real_one() {
    let toml = "[scrol]\nmax_loops = 10\n";

    let errors = load_and_validate_str(toml).expect_err("unknown section should fail");
    assert!(
        errors.iter().any(|e| matches!(
            e,
            ConfigError::UnknownSection { name, suggestion, .. }
                if name == "scrol" && suggestion.as_deref() == Some("scroll")
        )),
        "got: {errors:?}"
    );
}

/// A quoted number under a timing key explains the unit.
#[test]
fn invalid_timing_value_names_the_unit() {
    use miette::Diagnostic;

    let toml = "[scrape]\ndetail_timeout_secs = \"12s\"\n";
    let errors = load_and_validate_str(toml).expect_err("string timeout should fail");
    let help = errors
        .iter()
        .find(|e| matches!(e, ConfigError::InvalidType { .. }))
        .and_then(|e| e.help())
        .map(|h| h.to_string())
        .unwrap_or_else(|| panic!("expected InvalidType, got: {errors:?}"));
    assert!(help.contains("seconds"), "got: {help}");
}
