// SPDX-FileCopyrightText: 2026 Chatharvest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Turning the CRM's display times into absolute timestamps.
//!
//! A message shows either a full `YYYY-MM-DD ... HH:MM` stamp or just a clock
//! time (often with a stray `MM/DD` in front). Bare clock times take their
//! calendar date from the nearest date separator above them.

use std::sync::LazyLock;

use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use regex::Regex;
use thiserror::Error;

static FULL_TIMESTAMP: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(\d{4})-(\d{2})-(\d{2}).*?(\d{1,2}):(\d{2})").expect("valid regex")
});

static CLOCK: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(\d{1,2}):(\d{2})").expect("valid regex"));

static DATE_HEADER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(\d{4})年(\d{1,2})月(\d{1,2})日").expect("valid regex"));

/// Why a message timestamp could not be resolved.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TimeError {
    /// No usable clock time in the raw text, or the values are out of range.
    #[error("unparseable time `{raw}`")]
    UnparseableTime { raw: String },

    /// A bare clock time with no date separator seen before it.
    #[error("time `{raw}` has no date context")]
    AmbiguousDate { raw: String },
}

fn num(caps: &regex::Captures<'_>, idx: usize) -> Option<u32> {
    caps.get(idx)?.as_str().parse().ok()
}

/// Resolve a message's displayed time to an absolute timestamp.
///
/// An embedded full date wins over `current_date`. Seconds are always zero.
pub fn normalize_time_sent(
    current_date: Option<NaiveDate>,
    raw: &str,
) -> Result<NaiveDateTime, TimeError> {
    let raw = raw.trim();
    let unparseable = || TimeError::UnparseableTime {
        raw: raw.to_string(),
    };

    if let Some(caps) = FULL_TIMESTAMP.captures(raw) {
        let date = NaiveDate::from_ymd_opt(
            num(&caps, 1).ok_or_else(unparseable)? as i32,
            num(&caps, 2).ok_or_else(unparseable)?,
            num(&caps, 3).ok_or_else(unparseable)?,
        )
        .ok_or_else(unparseable)?;
        let time = NaiveTime::from_hms_opt(
            num(&caps, 4).ok_or_else(unparseable)?,
            num(&caps, 5).ok_or_else(unparseable)?,
            0,
        )
        .ok_or_else(unparseable)?;
        return Ok(date.and_time(time));
    }

    let caps = CLOCK.captures(raw).ok_or_else(unparseable)?;
    let time = NaiveTime::from_hms_opt(
        num(&caps, 1).ok_or_else(unparseable)?,
        num(&caps, 2).ok_or_else(unparseable)?,
        0,
    )
    .ok_or_else(unparseable)?;

    match current_date {
        Some(date) => Ok(date.and_time(time)),
        None => Err(TimeError::AmbiguousDate {
            raw: raw.to_string(),
        }),
    }
}

/// Read a date separator such as `2025年04月02日(水)`.
///
/// `None` when the text carries no date or names an impossible one.
pub fn parse_date_header(text: &str) -> Option<NaiveDate> {
    let caps = DATE_HEADER.captures(text)?;
    NaiveDate::from_ymd_opt(
        caps.get(1)?.as_str().parse().ok()?,
        num(&caps, 2)?,
        num(&caps, 3)?,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use chatharvest_core::types::TIMESTAMP_FORMAT;
    use proptest::prelude::*;

    fn ymd(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn fmt(ts: NaiveDateTime) -> String {
        ts.format(TIMESTAMP_FORMAT).to_string()
    }

    #[test]
    fn embedded_full_date_wins_over_current_date() {
        let ts = normalize_time_sent(Some(ymd(2025, 4, 2)), "2025-01-21 01/21 15:43").unwrap();
        assert_eq!(fmt(ts), "2025-01-21 15:43:00");
    }

    #[test]
    fn bare_time_takes_current_date_zero_padded() {
        let ts = normalize_time_sent(Some(ymd(2025, 4, 2)), "9:05").unwrap();
        assert_eq!(fmt(ts), "2025-04-02 09:05:00");
    }

    #[test]
    fn month_day_prefix_is_ignored() {
        let ts = normalize_time_sent(Some(ymd(2025, 4, 2)), "01/21 15:43").unwrap();
        assert_eq!(fmt(ts), "2025-04-02 15:43:00");
    }

    #[test]
    fn bare_time_without_date_is_ambiguous() {
        assert_eq!(
            normalize_time_sent(None, "15:43"),
            Err(TimeError::AmbiguousDate {
                raw: "15:43".to_string()
            })
        );
    }

    #[test]
    fn text_without_clock_is_unparseable() {
        for raw in ["", "   ", "既読", "15時43分"] {
            assert!(matches!(
                normalize_time_sent(Some(ymd(2025, 4, 2)), raw),
                Err(TimeError::UnparseableTime { .. })
            ));
        }
    }

    #[test]
    fn out_of_range_values_are_unparseable() {
        assert!(matches!(
            normalize_time_sent(Some(ymd(2025, 4, 2)), "25:10"),
            Err(TimeError::UnparseableTime { .. })
        ));
        assert!(matches!(
            normalize_time_sent(None, "2025-02-30 10:00"),
            Err(TimeError::UnparseableTime { .. })
        ));
    }

    #[test]
    fn date_header_parses_with_weekday_suffix() {
        assert_eq!(parse_date_header("2025年04月02日(水)"), Some(ymd(2025, 4, 2)));
        assert_eq!(parse_date_header("2025年4月3日"), Some(ymd(2025, 4, 3)));
        assert_eq!(parse_date_header("今日"), None);
        assert_eq!(parse_date_header("2025年13月01日"), None);
    }

    proptest! {
        #[test]
        fn bare_clock_always_lands_on_current_date(
            y in 2000i32..2100, m in 1u32..=12, d in 1u32..=28,
            hh in 0u32..24, mm in 0u32..60,
        ) {
            let date = ymd(y, m, d);
            let raw = format!("{m:02}/{d:02} {hh}:{mm:02}");
            let ts = normalize_time_sent(Some(date), &raw).unwrap();
            prop_assert_eq!(ts.date(), date);
            prop_assert_eq!(fmt(ts), format!("{y:04}-{m:02}-{d:02} {hh:02}:{mm:02}:00"));
        }

        #[test]
        fn full_stamp_ignores_current_date(
            y in 2000i32..2100, m in 1u32..=12, d in 1u32..=28,
            hh in 0u32..24, mm in 0u32..60, other in 1u32..=28,
        ) {
            let raw = format!("{y:04}-{m:02}-{d:02} {hh:02}:{mm:02}");
            let ts = normalize_time_sent(Some(ymd(1999, 1, other)), &raw).unwrap();
            prop_assert_eq!(ts.date(), ymd(y, m, d));
        }
    }
}
