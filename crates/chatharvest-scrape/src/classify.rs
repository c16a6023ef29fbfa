// SPDX-FileCopyrightText: 2026 Chatharvest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! DOM block classification.
//!
//! Each child of the message container is either a date separator, a chat
//! message, or both (the CRM renders a day's separator inside the block of
//! that day's first message). Classification is pure: it takes parsed HTML
//! and returns owned values, so no DOM handle outlives the call.

use std::sync::LazyLock;

use chatharvest_core::Sender;
use chrono::NaiveDate;
use scraper::{ElementRef, Html, Selector};

use crate::selectors::{css, BLOCKS, PAGE_AGENT};
use crate::time::parse_date_header;

static DATE_SEPARATOR: LazyLock<Selector> = LazyLock::new(|| css(".time-center"));
static CUSTOMER_MARKER: LazyLock<Selector> = LazyLock::new(|| css(".you"));
static SUPPORT_MARKER: LazyLock<Selector> = LazyLock::new(|| css(".me"));
static MESSAGE_BODY: LazyLock<Selector> = LazyLock::new(|| css(".message"));
static TIME_SENT: LazyLock<Selector> = LazyLock::new(|| css(".time-send"));

static STAFF_LABEL: LazyLock<Selector> =
    LazyLock::new(|| css(".tooltip-container.staff_name_show span.underline.cursor-pointer"));
static STAFF_ROWS: LazyLock<Selector> =
    LazyLock::new(|| css(".tooltip-container.staff_name_show div"));
static STAFF_ROW_NAME: LazyLock<Selector> =
    LazyLock::new(|| css("span.underline.cursor-pointer"));

static NAME_FALLBACKS: LazyLock<Vec<Selector>> = LazyLock::new(|| {
    [
        ".sender-name",
        ".name",
        ".user-name",
        ".member-name",
        "[data-role='sender-name']",
        "[data-testid='sender-name']",
        ".header .name",
        ".bubble .name",
    ]
    .into_iter()
    .map(css)
    .collect()
});

static IMG_ALT: LazyLock<Selector> = LazyLock::new(|| css("img[alt]"));
static IMG_TITLE: LazyLock<Selector> = LazyLock::new(|| css("img[title]"));

/// Text marking the sender row inside the staff tooltip.
const SENDER_LABEL: &str = "送信者";

/// A chat message as it appears in the DOM, before date resolution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawMessage {
    pub sender: Sender,
    /// Body text; `<br>` and nested elements become line breaks.
    pub text: String,
    /// The displayed time, untouched.
    pub time_raw: String,
    pub sender_name: Option<String>,
}

/// Why a block produced no message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    /// A date separator whose text holds no valid date.
    UnparseableDate,
    /// Neither the customer nor the support marker is present.
    NoSenderMarker,
    MissingText,
    MissingTime,
}

/// One classified unit of a transcript block.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Block {
    DateHeader(NaiveDate),
    Message(RawMessage),
    Skip(SkipReason),
}

/// Concatenation of the element's trimmed text nodes.
fn stripped_text(el: ElementRef<'_>) -> String {
    el.text().map(str::trim).filter(|s| !s.is_empty()).collect()
}

fn first_named(block: ElementRef<'_>, selector: &Selector) -> Option<String> {
    let text = stripped_text(block.select(selector).next()?);
    (!text.is_empty()).then_some(text)
}

/// Classify one child of the message container.
///
/// Yields the date separator first when a block carries both, so carrying
/// the date forward in order is enough to date the message correctly.
/// A block without a sender marker yields only its separator, or a
/// [`SkipReason::NoSenderMarker`] when it has none.
pub fn classify(block: ElementRef<'_>) -> Vec<Block> {
    let mut out = Vec::with_capacity(2);

    if let Some(separator) = block.select(&DATE_SEPARATOR).next() {
        out.push(match parse_date_header(&stripped_text(separator)) {
            Some(date) => Block::DateHeader(date),
            None => Block::Skip(SkipReason::UnparseableDate),
        });
    }

    let sender = if block.select(&CUSTOMER_MARKER).next().is_some() {
        Sender::Customer
    } else if block.select(&SUPPORT_MARKER).next().is_some() {
        Sender::Support
    } else {
        if out.is_empty() {
            out.push(Block::Skip(SkipReason::NoSenderMarker));
        }
        return out;
    };

    let Some(body) = block.select(&MESSAGE_BODY).next() else {
        out.push(Block::Skip(SkipReason::MissingText));
        return out;
    };
    let Some(time) = block.select(&TIME_SENT).next() else {
        out.push(Block::Skip(SkipReason::MissingTime));
        return out;
    };

    out.push(Block::Message(RawMessage {
        sender,
        text: body.text().collect::<Vec<_>>().join("\n").trim().to_string(),
        time_raw: stripped_text(time),
        sender_name: sender_name(block),
    }));
    out
}

/// Resolve the per-message sender name.
///
/// Tried in order: the staff tooltip's name link, the tooltip row labelled
/// `送信者`, generic name-like elements, then an avatar's `alt`/`title`.
pub fn sender_name(block: ElementRef<'_>) -> Option<String> {
    if let Some(name) = first_named(block, &STAFF_LABEL) {
        return Some(name);
    }

    if let Some(row) = block
        .select(&STAFF_ROWS)
        .find(|row| row.text().collect::<String>().contains(SENDER_LABEL))
        && let Some(name) = first_named(row, &STAFF_ROW_NAME)
    {
        return Some(name);
    }

    if let Some(name) = NAME_FALLBACKS
        .iter()
        .find_map(|selector| first_named(block, selector))
    {
        return Some(name);
    }

    let img = block
        .select(&IMG_ALT)
        .next()
        .or_else(|| block.select(&IMG_TITLE).next())?;
    let attr = img
        .value()
        .attr("alt")
        .filter(|s| !s.is_empty())
        .or_else(|| img.value().attr("title"))?
        .trim();
    (!attr.is_empty()).then(|| attr.to_string())
}

/// Classify every transcript block of a chat page, in document order.
pub fn classify_document(html: &str) -> Vec<Block> {
    let document = Html::parse_document(html);
    document.select(&BLOCKS).flat_map(classify).collect()
}

/// Name of the agent assigned to the conversation, if the page shows one.
///
/// Support messages without a name of their own are attributed to it.
pub fn page_agent(html: &str) -> Option<String> {
    let document = Html::parse_document(html);
    let text = document
        .select(&PAGE_AGENT)
        .next()?
        .text()
        .collect::<String>()
        .trim()
        .to_string();
    (!text.is_empty()).then_some(text)
}
