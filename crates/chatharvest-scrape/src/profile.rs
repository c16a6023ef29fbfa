// SPDX-FileCopyrightText: 2026 Chatharvest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The profile panel on a contact's chat page.

use std::sync::LazyLock;

use scraper::{ElementRef, Html, Selector};
use serde_json::{Map, Value};

use crate::selectors::{css, FRIEND_INFO};

static PANEL: LazyLock<Selector> = LazyLock::new(|| css(FRIEND_INFO));
static ROWS: LazyLock<Selector> = LazyLock::new(|| css("div.mt-\\[20px\\], div.border-b"));
static LABEL: LazyLock<Selector> = LazyLock::new(|| css("p"));
static VALUE: LazyLock<Selector> = LazyLock::new(|| css("span, input, textarea"));

/// Empty profile, also stored when the panel never renders.
pub const EMPTY_PROFILE: &str = "{}";

fn squash(text: impl Iterator<Item = impl AsRef<str>>) -> String {
    text.flat_map(|t| {
        t.as_ref()
            .split_whitespace()
            .map(str::to_string)
            .collect::<Vec<_>>()
    })
    .collect::<Vec<_>>()
    .join(" ")
}

fn value_of(row: ElementRef<'_>, label: ElementRef<'_>) -> String {
    if let Some(value) = row.select(&VALUE).next() {
        return match value.value().name() {
            "input" | "textarea" => value.value().attr("value").unwrap_or("").trim().to_string(),
            _ => squash(value.text()),
        };
    }
    label
        .next_siblings()
        .filter_map(ElementRef::wrap)
        .find(|el| el.value().name() == "div")
        .map(|div| squash(div.text()))
        .unwrap_or_default()
}

/// Read the panel's label/value rows into a compact JSON object.
///
/// Keys keep document order; a repeated label keeps its last value. Rows
/// without a label are ignored. A missing or empty panel yields `{}`.
pub fn parse_friend_info(html: &str) -> String {
    let document = Html::parse_document(html);
    let Some(panel) = document.select(&PANEL).next() else {
        return EMPTY_PROFILE.to_string();
    };

    let mut values = Map::new();
    for row in panel.select(&ROWS) {
        let Some(label_el) = row.select(&LABEL).next() else {
            continue;
        };
        let label = squash(label_el.text());
        if label.is_empty() {
            continue;
        }
        values.insert(label, Value::String(value_of(row, label_el)));
    }

    if values.is_empty() {
        return EMPTY_PROFILE.to_string();
    }
    Value::Object(values).to_string()
}
