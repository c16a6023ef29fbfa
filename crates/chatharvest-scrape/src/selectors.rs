// SPDX-FileCopyrightText: 2026 Chatharvest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! CSS selectors for the CRM's markup.
//!
//! The string forms are what gets sent to the live browser; the parsed
//! [`Selector`]s are what the HTML parsers in this crate match against.

use std::sync::LazyLock;

use scraper::Selector;

/// Transcript blocks: date separators and chat messages.
pub const MESSAGE_BLOCKS: &str = "#messages-container-v2 > div";

/// Scroll targets tried in order; the window is scrolled when none exists.
pub const SCROLL_CONTAINERS: &[&str] = &[
    "#messages-container-v2",
    ".chat-area",
    ".chat-body",
    ".message-body",
    "div[data-role='message-container']",
];

/// Button on a contact's page that opens the chat view.
pub const CHAT_BUTTON: &str = "a.btn-sns-line-my-page";

pub const FRIEND_INFO: &str = "#friend-info";
pub const FRIEND_INFO_LABEL: &str = "#friend-info p";

pub const TAG_TAB: &str = "li[data-name='tag'], [data-name='tag']";
pub const TAG_PANEL: &str = "table#table_choose_tag, #tab-tag";

/// Detail-page table that carries the "friend added" datetime.
pub const DETAIL_TABLE: &str = "table.tbl_info_df";

/// Pager arrow on the friend list.
pub const NEXT_PAGE: &str = ".glyphicon.glyphicon-menu-right";

pub const LOGIN_EMAIL: &str = "#email_login";
pub const LOGIN_PASSWORD: &str = "#password_login";

/// Parse a selector known to be valid at compile time.
pub(crate) fn css(selector: &str) -> Selector {
    Selector::parse(selector).expect("static selector is valid CSS")
}

pub(crate) static BLOCKS: LazyLock<Selector> = LazyLock::new(|| css(MESSAGE_BLOCKS));

/// First element of this class on a chat page names the assigned agent.
pub(crate) static PAGE_AGENT: LazyLock<Selector> =
    LazyLock::new(|| css("span.underline.cursor-pointer"));
