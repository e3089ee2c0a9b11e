//! Recency scoring from the document's `update` stamp.

use serde_json::Value;
use std::sync::OnceLock;

use regex::Regex;

/// Totally ordered key derived from a `DD.MM.YYYY HH:MM` stamp.
///
/// Encoded as `YYYYMMDDHHMM`, so integer order is chronological order.
/// Not a timestamp: only meaningful relative to another key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct RecencyKey(i64);

impl RecencyKey {
    /// Key for a stamp that could not be parsed. Below every parsed key.
    pub const SENTINEL: RecencyKey = RecencyKey(-1);

    pub fn is_sentinel(self) -> bool {
        self == Self::SENTINEL
    }

    pub fn value(self) -> i64 {
        self.0
    }
}

fn stamp_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^([0-9]{2})\.([0-9]{2})\.([0-9]{4})\s+([0-9]{2}):([0-9]{2})$")
            .expect("valid regex")
    })
}

/// Compute the recency key of a (schedule-shaped) value.
///
/// Never fails: a missing, non-string or malformed `update` yields
/// [`RecencyKey::SENTINEL`].
pub fn recency_key(doc: &Value) -> RecencyKey {
    match doc.get("update") {
        Some(Value::String(stamp)) => parse_stamp(stamp).unwrap_or(RecencyKey::SENTINEL),
        _ => RecencyKey::SENTINEL,
    }
}

fn parse_stamp(stamp: &str) -> Option<RecencyKey> {
    let caps = stamp_regex().captures(stamp.trim())?;
    let field = |i: usize| caps.get(i).and_then(|m| m.as_str().parse::<i64>().ok());

    let (day, month, year) = (field(1)?, field(2)?, field(3)?);
    let (hour, minute) = (field(4)?, field(5)?);

    if !(1..=12).contains(&month) || !(1..=31).contains(&day) {
        return None;
    }
    if hour > 23 || minute > 59 {
        return None;
    }

    Some(RecencyKey(
        (((year * 100 + month) * 100 + day) * 100 + hour) * 100 + minute,
    ))
}
