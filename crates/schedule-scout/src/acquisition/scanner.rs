//! Balanced-object scanner for object literals embedded in script source.
//!
//! Recovers `{...}` after an assignment such as `var x = {...};` without a
//! script-language parser: brace depth is tracked, and braces inside single-
//! or double-quoted strings (with backslash escapes) are ignored.

use serde_json::Value;

/// Decode the first balanced `{...}` at or after byte offset `start`.
///
/// Returns `None` when there is no `{`, when the object never closes, when
/// `start` is out of range, or when the balanced span is not valid JSON.
pub fn extract_json_after(text: &str, start: usize) -> Option<Value> {
    let open = start + text.get(start..)?.find('{')?;
    let close = matching_brace(text.as_bytes(), open)?;
    serde_json::from_str(&text[open..=close]).ok()
}

/// Index of the `}` that balances the `{` at `open`.
fn matching_brace(bytes: &[u8], open: usize) -> Option<usize> {
    let mut depth = 0usize;
    let mut quote: Option<u8> = None;
    let mut escaped = false;

    for (i, &b) in bytes.iter().enumerate().skip(open) {
        if let Some(q) = quote {
            if escaped {
                escaped = false;
            } else if b == b'\\' {
                escaped = true;
            } else if b == q {
                quote = None;
            }
            continue;
        }

        match b {
            b'"' | b'\'' => quote = Some(b),
            b'{' => depth += 1,
            b'}' => {
                depth -= 1;
                if depth == 0 {
                    return Some(i);
                }
            }
            _ => {}
        }
    }

    None
}
