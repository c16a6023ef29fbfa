// SPDX-FileCopyrightText: 2026 Chatharvest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Config errors as miette diagnostics.
//!
//! Figment only says which field it did not expect. The diagnostics here add
//! what is needed to fix a `chatharvest.toml`: the closest real key, the
//! section a misplaced key belongs to, the unit of timing keys, and a span
//! into the file the bad value came from.

#![allow(unused_assignments)] // miette's Diagnostic derive generates code triggering this lint

use miette::{Diagnostic, NamedSource, SourceSpan};
use thiserror::Error;

/// Sections of `chatharvest.toml` and the keys each accepts, in file order.
pub const SCHEMA: &[(&str, &[&str])] = &[
    ("logging", &["level"]),
    (
        "crm",
        &["base_url", "login_path", "login_email", "login_password", "friend_list_path"],
    ),
    (
        "browser",
        &["headless", "executable", "user_data_dir", "launch_timeout_secs"],
    ),
    (
        "scroll",
        &[
            "max_loops",
            "stable_rounds",
            "interval_ms",
            "initial_wait_secs",
            "empty_retry_ms",
            "settle_ms",
        ],
    ),
    (
        "scrape",
        &[
            "checkpoint_path",
            "chat_button_timeout_secs",
            "chat_open_delay_ms",
            "friend_info_timeout_secs",
            "tag_tab_timeout_secs",
            "tag_panel_timeout_secs",
            "tag_tab_delay_ms",
            "detail_timeout_secs",
            "roster_row_delay_ms",
            "page_turn_delay_ms",
            "login_form_timeout_secs",
        ],
    ),
    ("gate", &["poll_interval_ms"]),
    ("storage", &["database_path", "wal_mode"]),
    ("analysis", &["output_dir", "max_transcript_chars"]),
];

/// Minimum Jaro-Winkler similarity score to suggest a correction.
/// Catches `max_loop` -> `max_loops` and `base_ulr` -> `base_url`.
const SUGGESTION_THRESHOLD: f64 = 0.75;

/// Section names in file order.
pub fn section_names() -> impl Iterator<Item = &'static str> {
    SCHEMA.iter().map(|(section, _)| *section)
}

/// The section that accepts `key`, if any.
pub fn section_of(key: &str) -> Option<&'static str> {
    SCHEMA
        .iter()
        .find(|(_, keys)| keys.contains(&key))
        .map(|(section, _)| *section)
}

#[derive(Debug, Error, Diagnostic)]
pub enum ConfigError {
    /// A key that no section of the file accepts.
    #[error("unknown configuration key `{key}`")]
    #[diagnostic(
        code(chatharvest::config::unknown_key),
        help("{}", unknown_key_help(suggestion.as_deref(), valid_keys))
    )]
    UnknownKey {
        key: String,
        /// Closest key of the same section.
        suggestion: Option<String>,
        /// Comma-separated keys of the section.
        valid_keys: String,
        #[label("this key is not recognized")]
        span: Option<SourceSpan>,
        #[source_code]
        src: Option<NamedSource<String>>,
    },

    /// A real key written under the wrong section header.
    #[error("`{key}` is not a [{section}] key")]
    #[diagnostic(
        code(chatharvest::config::misplaced_key),
        help("move it under [{belongs_in}]")
    )]
    MisplacedKey {
        key: String,
        section: String,
        belongs_in: String,
        #[label("belongs in [{belongs_in}]")]
        span: Option<SourceSpan>,
        #[source_code]
        src: Option<NamedSource<String>>,
    },

    /// A `[section]` header that does not exist.
    #[error("unknown configuration section `[{name}]`")]
    #[diagnostic(
        code(chatharvest::config::unknown_section),
        help("{}", unknown_section_help(suggestion.as_deref()))
    )]
    UnknownSection {
        name: String,
        suggestion: Option<String>,
        #[label("no such section")]
        span: Option<SourceSpan>,
        #[source_code]
        src: Option<NamedSource<String>>,
    },

    /// A value of the wrong type, e.g. a quoted number.
    #[error("invalid type for key `{key}`: {detail}")]
    #[diagnostic(code(chatharvest::config::invalid_type), help("{}", expected_help(key, expected)))]
    InvalidType {
        /// Dotted path, e.g. `scroll.max_loops`.
        key: String,
        detail: String,
        expected: String,
        #[label("wrong type here")]
        span: Option<SourceSpan>,
        #[source_code]
        src: Option<NamedSource<String>>,
    },

    /// A value that parsed but is out of range.
    #[error("validation error: {message}")]
    #[diagnostic(code(chatharvest::config::validation))]
    Validation { message: String },

    #[error("configuration error: {0}")]
    #[diagnostic(code(chatharvest::config::other))]
    Other(String),
}

fn unknown_key_help(suggestion: Option<&str>, valid_keys: &str) -> String {
    match suggestion {
        Some(s) => format!("did you mean `{s}`? Valid keys: {valid_keys}"),
        None => format!("valid keys: {valid_keys}"),
    }
}

fn unknown_section_help(suggestion: Option<&str>) -> String {
    let sections = section_names()
        .map(|s| format!("[{s}]"))
        .collect::<Vec<_>>()
        .join(", ");
    match suggestion {
        Some(s) => format!("did you mean [{s}]? Sections: {sections}"),
        None => format!("sections: {sections}"),
    }
}

/// What the value of `key` should look like.
fn expected_help(key: &str, expected: &str) -> String {
    let field = key.rsplit('.').next().unwrap_or(key);
    if field.ends_with("_secs") {
        format!("expected {expected}, a whole number of seconds")
    } else if field.ends_with("_ms") {
        format!("expected {expected}, a whole number of milliseconds")
    } else if key == "logging.level" {
        format!("expected {expected}: one of trace, debug, info, warn, error")
    } else {
        format!("expected {expected}")
    }
}

/// Convert a `figment::Error` into one diagnostic per underlying error.
///
/// `toml_sources` are `(path, content)` pairs of the files that were merged;
/// they are used to attach a span to the offending key.
pub fn figment_to_config_errors(
    err: figment::Error,
    toml_sources: &[(String, String)],
) -> Vec<ConfigError> {
    use figment::error::Kind;

    err.into_iter()
        .map(|error| {
            let path: Vec<String> = error.path.iter().map(|s| s.to_string()).collect();
            match &error.kind {
                Kind::UnknownField(field, expected) => {
                    unknown_field(&error, &path, field, expected, toml_sources)
                }
                Kind::InvalidType(actual, expected) => {
                    let (section, field) = match path.as_slice() {
                        [section, field] => (Some(section.as_str()), field.as_str()),
                        [field] => (None, field.as_str()),
                        _ => (None, ""),
                    };
                    let (span, src) = locate(&error, section, field, toml_sources);
                    ConfigError::InvalidType {
                        key: path.join("."),
                        detail: format!("found {actual}, expected {expected}"),
                        expected: expected.to_string(),
                        span,
                        src,
                    }
                }
                _ => ConfigError::Other(error.to_string()),
            }
        })
        .collect()
}

fn unknown_field(
    error: &figment::error::Error,
    path: &[String],
    field: &str,
    expected: &[&str],
    toml_sources: &[(String, String)],
) -> ConfigError {
    let Some(section) = path.first() else {
        let (span, src) = locate(error, None, field, toml_sources);
        return ConfigError::UnknownSection {
            name: field.to_string(),
            suggestion: suggest_key(field, &section_names().collect::<Vec<_>>()),
            span,
            src,
        };
    };

    let (span, src) = locate(error, Some(section), field, toml_sources);
    match section_of(field) {
        Some(home) if home != section.as_str() => ConfigError::MisplacedKey {
            key: field.to_string(),
            section: section.clone(),
            belongs_in: home.to_string(),
            span,
            src,
        },
        _ => ConfigError::UnknownKey {
            key: field.to_string(),
            suggestion: suggest_key(field, expected),
            valid_keys: expected.join(", "),
            span,
            src,
        },
    }
}

/// Span of `key` in the file the error came from. A single merged source is
/// used even when figment does not record a file, as for inline TOML.
fn locate(
    error: &figment::error::Error,
    section: Option<&str>,
    key: &str,
    toml_sources: &[(String, String)],
) -> (Option<SourceSpan>, Option<NamedSource<String>>) {
    if key.is_empty() {
        return (None, None);
    }
    let from_file = error
        .metadata
        .as_ref()
        .and_then(|m| m.source.as_ref())
        .and_then(|s| match s {
            figment::Source::File(path) => Some(path.display().to_string()),
            _ => None,
        });

    let source = match from_file {
        Some(path) => toml_sources.iter().find(|(p, _)| *p == path),
        None if toml_sources.len() == 1 => toml_sources.first(),
        None => None,
    };

    source
        .and_then(|(path, content)| {
            let offset = find_key_offset(content, section, key)?;
            Some((
                Some(SourceSpan::new(offset.into(), key.len())),
                Some(NamedSource::new(path, content.clone())),
            ))
        })
        .unwrap_or((None, None))
}

/// Byte offset of `key` inside `[section]`, or of a `[key]` header when
/// `section` is `None`. Only the named section is searched; a key of the same
/// name in a later section does not match.
pub fn find_key_offset(content: &str, section: Option<&str>, key: &str) -> Option<usize> {
    let mut current: Option<&str> = None;
    let mut offset = 0;
    for line in content.split_inclusive('\n') {
        let trimmed = line.trim_start();
        let indent = line.len() - trimmed.len();
        if let Some(header) = trimmed.strip_prefix('[') {
            let name = header.split(']').next().unwrap_or_default().trim();
            if section.is_none() && name == key {
                return Some(offset + indent + 1 + header.find(key)?);
            }
            current = Some(name);
        } else if current == section
            && let Some(rest) = trimmed.strip_prefix(key)
            && rest.trim_start().starts_with('=')
        {
            return Some(offset + indent);
        }
        offset += line.len();
    }
    None
}

/// The valid key most similar to `unknown`, if any is close enough.
pub fn suggest_key(unknown: &str, valid_keys: &[&str]) -> Option<String> {
    valid_keys
        .iter()
        .map(|key| (strsim::jaro_winkler(unknown, key), *key))
        .filter(|(score, _)| *score > SUGGESTION_THRESHOLD)
        .max_by(|a, b| a.0.total_cmp(&b.0))
        .map(|(_, key)| key.to_string())
}

/// Render a list of `ConfigError`s to stderr using miette's graphical handler.
pub fn render_errors(errors: &[ConfigError]) {
    use miette::GraphicalReportHandler;

    let handler = GraphicalReportHandler::new();
    for error in errors {
        let mut buf = String::new();
        let diagnostic: &dyn Diagnostic = error;
        if handler.render_report(&mut buf, diagnostic).is_ok() {
            eprint!("{buf}");
        } else {
            eprintln!("Error: {error}");
        }
    }
}
