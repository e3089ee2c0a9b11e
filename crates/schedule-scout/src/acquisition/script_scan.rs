//! Fallback search through inline script text.
//!
//! Looks for assignments (`a.b = {...}`, `const x = {...}`) whose right-hand
//! side is a JSON object literal that passes the schedule shape check.

use super::scanner::extract_json_after;
use crate::schedule::ScheduleDocument;
use regex::Regex;
use std::sync::OnceLock;

/// Substrings every candidate script must contain before it is scanned.
const PREFILTER: [&str; 3] = ["today", "update", "data"];

/// Assignment-token patterns, in priority order.
fn assignment_patterns() -> &'static [Regex; 2] {
    static PATTERNS: OnceLock<[Regex; 2]> = OnceLock::new();
    PATTERNS.get_or_init(|| {
        [
            // identifier(.identifier)* =
            Regex::new(r"[A-Za-z_$][A-Za-z0-9_$]*(?:\.[A-Za-z_$][A-Za-z0-9_$]*)*\s*=")
                .expect("valid regex"),
            // (const|let|var) identifier =
            Regex::new(r"\b(?:const|let|var)\s+[A-Za-z_$][A-Za-z0-9_$]*\s*=")
                .expect("valid regex"),
        ]
    })
}

/// Find the first schedule-shaped object literal among `scripts`.
///
/// `scripts` are in document order; the most recently added one is searched
/// first. Within a script, assignments are tried left to right.
pub fn scan_scripts<S: AsRef<str>>(scripts: &[S]) -> Option<ScheduleDocument> {
    scripts
        .iter()
        .rev()
        .map(|script| script.as_ref())
        .filter(|text| PREFILTER.iter().all(|needle| text.contains(*needle)))
        .find_map(scan_script)
}

/// Search one script for a schedule-shaped assignment.
pub fn scan_script(text: &str) -> Option<ScheduleDocument> {
    let mut positions: Vec<(usize, usize)> = assignment_patterns()
        .iter()
        .enumerate()
        .flat_map(|(rank, re)| re.find_iter(text).map(move |m| (m.end(), rank)))
        .collect();
    positions.sort_unstable();
    positions.dedup_by_key(|(end, _)| *end);

    positions
        .into_iter()
        .filter_map(|(after_eq, _)| extract_json_after(text, after_eq))
        .find_map(ScheduleDocument::from_value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    const SCHEDULE: &str = r#"const data = {"data":{"2024-01-01":{}},"today":"2024-01-01","update":"01.01.2024 08:00"};"#;

    #[test]
    fn test_finds_const_assignment() {
        let doc = scan_scripts(&[SCHEDULE]).unwrap();
        assert_eq!(doc.update(), &json!("01.01.2024 08:00"));
    }

    #[test]
    fn test_finds_dotted_assignment() {
        let script = r#"window.App.state = {"data":{"a":1},"today":"a","update":"02.01.2024 10:00"};"#;
        let doc = scan_scripts(&[script]).unwrap();
        assert_eq!(doc.today_key(), "a");
    }

    #[test]
    fn test_newest_script_wins() {
        let older = r#"var cfg = {"data":1,"today":1}; // update"#;
        let newer = r#"var s = {"data":{"x":1},"today":"x","update":"03.01.2024 10:00","n":2};"#;
        let doc = scan_scripts(&[older, newer]).unwrap();
        assert_eq!(doc.as_value()["n"], 2);

        let older_schedule = r#"var s = {"data":{"x":1},"today":"x","update":"01.01.2024 10:00","n":1};"#;
        let doc = scan_scripts(&[older_schedule, newer]).unwrap();
        assert_eq!(doc.as_value()["n"], 2);
    }

    #[test]
    fn test_earlier_non_schedule_then_later_schedule_in_same_script() {
        let script = r#"
            var meta = {"data": null, "today": "x", "update": "y"};
            var fact = {"data":{"1":{}},"today":"1","update":"04.01.2024 07:30"};
        "#;
        let doc = scan_script(script).unwrap();
        assert_eq!(doc.update(), &json!("04.01.2024 07:30"));
    }

    #[test]
    fn test_prefilter_skips_scripts_missing_keywords() {
        // Decodes to a schedule, but the text never spells out "update".
        let script = r#"var s = {"data":{"x":1},"today":"x","upd\u0061te":"now"};"#;
        assert!(scan_script(script).is_some());
        assert!(scan_scripts(&[script]).is_none());
    }

    #[test]
    fn test_non_json_literal_is_skipped() {
        let script = r#"var s = {data: 1, today: 2, update: 3}; var t = {"data":{"1":{}},"today":"1","update":"05.01.2024 00:00"};"#;
        let doc = scan_script(script).unwrap();
        assert_eq!(doc.update(), &json!("05.01.2024 00:00"));
    }

    #[test]
    fn test_nothing_found() {
        assert!(scan_scripts::<&str>(&[]).is_none());
        assert!(scan_scripts(&["console.log('today update data')"]).is_none());
    }
}
