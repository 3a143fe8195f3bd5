// src/ingest/timestamp.rs
//! Published/updated timestamp normalization.
//!
//! Feeds in the wild carry every date format imaginable. Recognized formats are
//! tried in a fixed order and the first one that parses wins:
//!
//! 1. `2026-02-20T08:30:00Z`
//! 2. `Fri, 20 Feb 2026 08:30:00 +0000` (RFC 822 / 2822 style)
//! 3. `2026-02-20 08:30:00` (naive, read as UTC)
//! 4. `2026-02-20T08:30:00+01:00` (offset, optional fractional seconds)
//! 5. any other RFC 3339 form, e.g. `2026-02-20T08:30:00.5Z`
//! 6. any other RFC 2822 form, e.g. `20 Feb 2026 08:30:00 GMT`
//!
//! Anything else, including the empty string, resolves to "now": an item with an
//! unreadable date is treated as new instead of being dropped.

use chrono::{DateTime, NaiveDateTime, Utc};

const ZULU_FMT: &str = "%Y-%m-%dT%H:%M:%SZ";
const RFC822_FMT: &str = "%a, %d %b %Y %H:%M:%S %z";
const NAIVE_FMT: &str = "%Y-%m-%d %H:%M:%S";
const OFFSET_FMT: &str = "%Y-%m-%dT%H:%M:%S%.f%z";

/// Parse `raw` with the recognized formats. `None` if none of them matches.
pub fn parse(raw: &str) -> Option<DateTime<Utc>> {
    let s = raw.trim();
    if s.is_empty() {
        return None;
    }

    if let Ok(naive) = NaiveDateTime::parse_from_str(s, ZULU_FMT) {
        return Some(naive.and_utc());
    }
    if let Ok(dt) = DateTime::parse_from_str(s, RFC822_FMT) {
        return Some(dt.with_timezone(&Utc));
    }
    if let Ok(naive) = NaiveDateTime::parse_from_str(s, NAIVE_FMT) {
        return Some(naive.and_utc());
    }
    if let Ok(dt) = DateTime::parse_from_str(s, OFFSET_FMT) {
        return Some(dt.with_timezone(&Utc));
    }
    DateTime::parse_from_rfc3339(s)
        .or_else(|_| DateTime::parse_from_rfc2822(s))
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
}

/// Fail-open normalization: unparseable input becomes `now`.
pub fn normalize_or(raw: &str, now: DateTime<Utc>) -> DateTime<Utc> {
    match parse(raw) {
        Some(dt) => dt,
        None => {
            tracing::debug!(raw, "unrecognized timestamp, treating as now");
            now
        }
    }
}

/// Fail-open normalization against the current wall clock.
pub fn normalize(raw: &str) -> DateTime<Utc> {
    normalize_or(raw, Utc::now())
}
