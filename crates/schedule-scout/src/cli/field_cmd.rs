//! `schedule-scout field` / `field-stdin` — print one top-level JSON field.
//!
//! Meant for CI scripts: any problem prints an empty string and succeeds.

use crate::schedule::value_as_text;
use anyhow::Result;
use serde_json::Value;
use std::io::{Read, Write};
use std::path::Path;

/// Field printed when none is named.
pub const DEFAULT_FIELD: &str = "update";

/// Text of `field` in the JSON document `text`, or `""`.
///
/// Scalars print bare; objects and arrays print as compact JSON. On an
/// array root a numeric name selects the element at that index.
pub fn field_text(text: &str, field: &str) -> String {
    let Ok(root) = serde_json::from_str::<Value>(text) else {
        return String::new();
    };
    let selected = match &root {
        Value::Array(items) => field.parse::<usize>().ok().and_then(|i| items.get(i)),
        other => other.get(field),
    };
    selected.map(value_as_text).unwrap_or_default()
}

/// Print a field of the JSON file at `path`.
pub fn run_file(path: &Path, field: &str) -> Result<()> {
    let text = std::fs::read_to_string(path).unwrap_or_default();
    emit(&field_text(&text, field))
}

/// Print a field of the JSON document on stdin.
pub fn run_stdin(field: &str) -> Result<()> {
    let mut text = String::new();
    let _ = std::io::stdin().read_to_string(&mut text);
    emit(&field_text(&text, field))
}

fn emit(text: &str) -> Result<()> {
    let mut stdout = std::io::stdout().lock();
    stdout.write_all(text.as_bytes())?;
    stdout.flush()?;
    Ok(())
}
