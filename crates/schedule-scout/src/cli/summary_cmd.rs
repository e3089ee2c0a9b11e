//! `schedule-scout summary` — short, non-sensitive report of the last run.

use crate::output::{METADATA_FILE, SCHEDULE_FILE, SCRAPED_AT_FIELD};
use crate::schedule::{today_groups, value_as_text};
use anyhow::{Context, Result};
use serde_json::Value;
use std::fmt;
use std::path::Path;

/// What the summary reports.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScrapeSummary {
    pub ok: bool,
    pub update: String,
    pub scraped_at: String,
    pub today: String,
    /// Number of groups listed under today's key.
    pub group_count: usize,
}

impl ScrapeSummary {
    pub fn from_outputs(metadata: &Value, schedule: &Value) -> Self {
        Self {
            ok: metadata["success"].as_bool().unwrap_or(false),
            update: value_as_text(&schedule["update"]),
            scraped_at: value_as_text(&schedule[SCRAPED_AT_FIELD]),
            today: value_as_text(&schedule["today"]),
            group_count: today_groups(schedule).len(),
        }
    }
}

impl fmt::Display for ScrapeSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Scrape OK: {}", self.ok)?;
        writeln!(f, "Schedule update stamp: {}", self.update)?;
        writeln!(f, "Scraped at: {}", self.scraped_at)?;
        writeln!(f, "Today key: {}", self.today)?;
        write!(f, "Group count (today): {}", self.group_count)
    }
}

fn read_json(path: &Path) -> Result<Value> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    serde_json::from_str(&text).with_context(|| format!("invalid JSON in {}", path.display()))
}

/// Run the summary command against an output directory.
pub fn run(dir: &Path) -> Result<()> {
    let metadata = read_json(&dir.join(METADATA_FILE))?;
    let schedule = read_json(&dir.join(SCHEDULE_FILE))?;
    println!("{}", ScrapeSummary::from_outputs(&metadata, &schedule));
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_summary_counts_today_groups() {
        let meta = json!({"success": true});
        let schedule = json!({
            "data": {"1739224800": {"GPV1.1": {}, "GPV1.2": {}, "GPV2.1": {}}, "other": {"x": {}}},
            "today": 1739224800,
            "update": "11.02.2026 21:12",
            "scraped_at": "11.02.2026, 21:15:00"
        });
        let summary = ScrapeSummary::from_outputs(&meta, &schedule);
        assert!(summary.ok);
        assert_eq!(summary.today, "1739224800");
        assert_eq!(summary.group_count, 3);
        assert_eq!(
            summary.to_string(),
            "Scrape OK: true\nSchedule update stamp: 11.02.2026 21:12\nScraped at: 11.02.2026, 21:15:00\nToday key: 1739224800\nGroup count (today): 3"
        );
    }

    #[test]
    fn test_summary_counts_array_groups() {
        let schedule = json!({"data": {"d": [{"g": 1}, {"g": 2}]}, "today": "d"});
        let summary = ScrapeSummary::from_outputs(&json!({"success": true}), &schedule);
        assert_eq!(summary.group_count, 2);
    }

    #[test]
    fn test_summary_tolerates_missing_fields() {
        let summary = ScrapeSummary::from_outputs(&json!({}), &json!({}));
        assert!(!summary.ok);
        assert_eq!(summary.group_count, 0);
        assert_eq!(summary.today, "");
    }

    #[test]
    fn test_run_requires_outputs() {
        let dir = tempfile::tempdir().unwrap();
        assert!(run(dir.path()).is_err());
    }
}
