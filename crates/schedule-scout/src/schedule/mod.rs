//! The schedule document and its acceptance criterion.
//!
//! Both acquisition paths (network observation and in-page extraction)
//! decide what counts as a schedule through [`is_schedule`], so a value
//! accepted on one path is always acceptable on the other.

pub mod recency;

pub use recency::{recency_key, RecencyKey};

use serde::Serialize;
use serde_json::Value;

/// Fields every schedule document must carry with a truthy value.
pub const REQUIRED_FIELDS: [&str; 3] = ["data", "today", "update"];

/// Decide whether a decoded value is schedule-shaped.
///
/// True iff `value` is an object whose `data`, `today` and `update` fields
/// are all present and truthy. The nested shape of `data` is never checked.
pub fn is_schedule(value: &Value) -> bool {
    match value {
        Value::Object(map) => REQUIRED_FIELDS
            .iter()
            .all(|field| map.get(*field).is_some_and(is_truthy)),
        _ => false,
    }
}

/// Page-script truthiness: `null`, `false`, `0`, `NaN` and `""` are falsy.
pub(crate) fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0 && !f.is_nan()),
        Value::String(s) => !s.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}

/// A value that passed [`is_schedule`].
///
/// The rest of the payload is opaque and carried through untouched.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(transparent)]
pub struct ScheduleDocument(Value);

impl ScheduleDocument {
    /// Wrap `value` if it is schedule-shaped.
    pub fn from_value(value: Value) -> Option<Self> {
        if is_schedule(&value) {
            Some(Self(value))
        } else {
            None
        }
    }

    /// The self-reported freshness stamp, as published.
    pub fn update(&self) -> &Value {
        &self.0["update"]
    }

    /// The key of today's entry in `data`, rendered as text.
    pub fn today_key(&self) -> String {
        value_as_text(&self.0["today"])
    }

    /// Group keys listed under today's entry in `data`.
    pub fn today_groups(&self) -> Vec<String> {
        today_groups(&self.0)
    }

    /// Recency of this document, derived from its `update` stamp.
    pub fn recency(&self) -> RecencyKey {
        recency_key(&self.0)
    }

    pub fn as_value(&self) -> &Value {
        &self.0
    }

    pub fn into_value(self) -> Value {
        self.0
    }
}

/// Keys of `value.data[value.today]`, enumerated like `Object.keys`.
///
/// Works on any value, schedule-shaped or not: objects give their keys,
/// arrays and strings their indices, everything else nothing.
pub fn today_groups(value: &Value) -> Vec<String> {
    let today = value_as_text(&value["today"]);
    if today.is_empty() {
        return Vec::new();
    }
    match &value["data"][today.as_str()] {
        Value::Object(groups) => groups.keys().cloned().collect(),
        Value::Array(items) => (0..items.len()).map(|i| i.to_string()).collect(),
        Value::String(s) => (0..s.encode_utf16().count()).map(|i| i.to_string()).collect(),
        _ => Vec::new(),
    }
}

/// Render a scalar the way a page script would stringify it.
pub(crate) fn value_as_text(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}
