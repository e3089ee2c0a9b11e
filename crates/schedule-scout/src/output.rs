//! Persisted outputs: the schedule document and the run metadata.
//!
//! Metadata is publishable. It carries the outcome and the document's own
//! stamp, never the target address, the path expression or error details.

use crate::schedule::ScheduleDocument;
use anyhow::{Context, Result};
use chrono::{DateTime, TimeZone, Utc};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::path::{Path, PathBuf};

pub const SCHEDULE_FILE: &str = "schedule.json";
pub const METADATA_FILE: &str = "latest-metadata.json";

/// Field added to the persisted schedule with the scrape time.
pub const SCRAPED_AT_FIELD: &str = "scraped_at";

/// The only error marker metadata ever carries.
pub const FAILURE_MARKER: &str = "scrape_failed";

/// Format a moment as `DD.MM.YYYY, HH:MM:SS` in its own zone.
pub fn format_timestamp<Tz: TimeZone>(at: &DateTime<Tz>) -> String
where
    Tz::Offset: std::fmt::Display,
{
    at.format("%d.%m.%Y, %H:%M:%S").to_string()
}

/// Zone every persisted timestamp is rendered in, independent of the host.
pub const SCRAPE_TIME_ZONE: Tz = chrono_tz::Europe::Kyiv;

/// Kyiv wall-clock rendering of `at`.
pub fn scrape_timestamp_at(at: DateTime<Utc>) -> String {
    format_timestamp(&at.with_timezone(&SCRAPE_TIME_ZONE))
}

/// Current Kyiv time in the persisted format.
pub fn scrape_timestamp() -> String {
    scrape_timestamp_at(Utc::now())
}

/// Outcome record written next to the schedule.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScrapeMetadata {
    pub timestamp: String,
    pub success: bool,
    pub schedule_extracted: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_update: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ScrapeMetadata {
    pub fn success(timestamp: String, document: &ScheduleDocument) -> Self {
        Self {
            timestamp,
            success: true,
            schedule_extracted: true,
            last_update: Some(document.update().clone()),
            error: None,
        }
    }

    pub fn failure(timestamp: String) -> Self {
        Self {
            timestamp,
            success: false,
            schedule_extracted: false,
            last_update: None,
            error: Some(FAILURE_MARKER.to_string()),
        }
    }
}

/// Writes run outputs into one directory.
#[derive(Debug, Clone)]
pub struct OutputWriter {
    dir: PathBuf,
}

impl OutputWriter {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn schedule_path(&self) -> PathBuf {
        self.dir.join(SCHEDULE_FILE)
    }

    pub fn metadata_path(&self) -> PathBuf {
        self.dir.join(METADATA_FILE)
    }

    /// Write the document with a `scraped_at` field added.
    pub fn write_schedule(&self, document: &ScheduleDocument, scraped_at: &str) -> Result<()> {
        let mut value = document.as_value().clone();
        if let Value::Object(map) = &mut value {
            map.insert(SCRAPED_AT_FIELD.to_string(), Value::String(scraped_at.to_string()));
        }
        self.write_json(&self.schedule_path(), &value)
    }

    pub fn write_metadata(&self, metadata: &ScrapeMetadata) -> Result<()> {
        self.write_json(&self.metadata_path(), metadata)
    }

    fn write_json<T: Serialize + ?Sized>(&self, path: &Path, value: &T) -> Result<()> {
        std::fs::create_dir_all(&self.dir)
            .with_context(|| format!("failed to create {}", self.dir.display()))?;
        let json = serde_json::to_string_pretty(value)?;
        std::fs::write(path, json).with_context(|| format!("failed to write {}", path.display()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::FixedOffset;
    use serde_json::json;

    #[test]
    fn test_timestamp_format() {
        let kyiv = FixedOffset::east_opt(2 * 3600).unwrap();
        let at = kyiv.with_ymd_and_hms(2026, 2, 11, 9, 5, 7).unwrap();
        assert_eq!(format_timestamp(&at), "11.02.2026, 09:05:07");
    }

    #[test]
    fn test_scrape_timestamp_is_kyiv_time_regardless_of_host() {
        // Winter: UTC+2.
        let winter = Utc.with_ymd_and_hms(2026, 2, 11, 19, 12, 0).unwrap();
        assert_eq!(scrape_timestamp_at(winter), "11.02.2026, 21:12:00");
        // Summer: UTC+3, crossing midnight.
        let summer = Utc.with_ymd_and_hms(2026, 7, 1, 22, 30, 5).unwrap();
        assert_eq!(scrape_timestamp_at(summer), "02.07.2026, 01:30:05");
    }

    #[test]
    fn test_failure_metadata_shape() {
        let meta = serde_json::to_value(ScrapeMetadata::failure("t".into())).unwrap();
        assert_eq!(
            meta,
            json!({"timestamp": "t", "success": false, "schedule_extracted": false, "error": "scrape_failed"})
        );
    }

    #[test]
    fn test_schedule_gets_scraped_at() {
        let dir = tempfile::tempdir().unwrap();
        let writer = OutputWriter::new(dir.path().join("nested"));
        let doc = ScheduleDocument::from_value(
            json!({"data": {"1": {}}, "today": "1", "update": "01.01.2024 08:00"}),
        )
        .unwrap();

        writer.write_schedule(&doc, "01.01.2024, 08:01:00").unwrap();
        let written: Value =
            serde_json::from_str(&std::fs::read_to_string(writer.schedule_path()).unwrap()).unwrap();
        assert_eq!(written["scraped_at"], "01.01.2024, 08:01:00");
        assert_eq!(written["update"], "01.01.2024 08:00");
    }
}
