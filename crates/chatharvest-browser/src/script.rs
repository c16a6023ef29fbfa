// SPDX-FileCopyrightText: 2026 Chatharvest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Small DOM scripts evaluated in the page.

/// A selector as a JS string literal. JSON string syntax is valid JS.
fn literal(selector: &str) -> String {
    serde_json::Value::String(selector.to_string()).to_string()
}

/// Number of elements matching `selector`; 0 for an invalid selector.
pub fn count(selector: &str) -> String {
    format!(
        "(() => {{ try {{ return document.querySelectorAll({}).length; }} catch (e) {{ return 0; }} }})()",
        literal(selector)
    )
}

/// Empty an input before typing into it.
pub fn clear_value(selector: &str) -> String {
    format!(
        "(() => {{ const el = document.querySelector({}); if (el) {{ el.value = ''; }} return !!el; }})()",
        literal(selector)
    )
}
