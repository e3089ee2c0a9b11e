//! In-page extraction: read the schedule out of the live page.
//!
//! Two strategies, in order: a direct lookup of a configured global path
//! (polled, since the page may still be hydrating), then a scan of inline
//! script text. Failed reads are counted and retried, never propagated.

use super::path::PathExpr;
use super::script_scan::scan_scripts;
use crate::schedule::ScheduleDocument;
use anyhow::Result;
use async_trait::async_trait;
use serde_json::Value;
use std::time::Duration;
use tracing::{debug, trace};

/// Number of direct-lookup attempts before falling back to script text.
pub const DIRECT_LOOKUP_ATTEMPTS: u32 = 10;

/// Read-only view of a loaded page's state.
///
/// The page keeps running while it is read; implementations must not
/// assume the state is stable between calls.
#[async_trait]
pub trait PageEnvironment: Send + Sync {
    /// Resolve `path` in the page's global scope and return a detached copy
    /// of the value, or `None` if any step is missing or it cannot be copied.
    async fn read_path(&self, path: &PathExpr) -> Result<Option<Value>>;

    /// Text of every inline script, in document order.
    async fn script_texts(&self) -> Result<Vec<String>>;
}

/// Which in-page strategy produced a document.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExtractionStrategy {
    DirectLookup,
    ScriptScan,
}

/// Extracts a schedule from the page environment.
#[derive(Debug, Clone)]
pub struct InPageExtractor {
    path: Option<PathExpr>,
    attempts: u32,
    retry_interval: Duration,
    reread_settle: Duration,
}

impl InPageExtractor {
    pub fn new(path: Option<PathExpr>) -> Self {
        Self {
            path,
            attempts: DIRECT_LOOKUP_ATTEMPTS,
            retry_interval: Duration::from_millis(500),
            reread_settle: Duration::from_secs(1),
        }
    }

    /// Override the delay between lookups and the settle delay before the re-read.
    pub fn with_delays(mut self, retry_interval: Duration, reread_settle: Duration) -> Self {
        self.retry_interval = retry_interval;
        self.reread_settle = reread_settle;
        self
    }

    /// Try the direct lookup (when configured), then the script scan.
    pub async fn extract<P>(&self, page: &P) -> Option<(ScheduleDocument, ExtractionStrategy)>
    where
        P: PageEnvironment + ?Sized,
    {
        if let Some(path) = &self.path {
            if let Some(doc) = self.direct_lookup(page, path).await {
                return Some((doc, ExtractionStrategy::DirectLookup));
            }
            debug!(attempts = self.attempts, "direct lookup found nothing");
        }

        scan_page_scripts(page)
            .await
            .map(|doc| (doc, ExtractionStrategy::ScriptScan))
    }

    async fn direct_lookup<P>(&self, page: &P, path: &PathExpr) -> Option<ScheduleDocument>
    where
        P: PageEnvironment + ?Sized,
    {
        for attempt in 1..=self.attempts {
            if let Some(first) = read_schedule(page, path).await {
                trace!(attempt, "direct lookup passed shape check");
                tokio::time::sleep(self.reread_settle).await;
                // Prefer the settled value if it is still a schedule.
                return Some(read_schedule(page, path).await.unwrap_or(first));
            }
            if attempt < self.attempts {
                tokio::time::sleep(self.retry_interval).await;
            }
        }
        None
    }
}

async fn read_schedule<P>(page: &P, path: &PathExpr) -> Option<ScheduleDocument>
where
    P: PageEnvironment + ?Sized,
{
    match page.read_path(path).await {
        Ok(value) => value.and_then(ScheduleDocument::from_value),
        Err(e) => {
            debug!("in-page read failed: {e:#}");
            None
        }
    }
}

async fn scan_page_scripts<P>(page: &P) -> Option<ScheduleDocument>
where
    P: PageEnvironment + ?Sized,
{
    match page.script_texts().await {
        Ok(scripts) => {
            trace!(scripts = scripts.len(), "scanning inline scripts");
            scan_scripts(scripts.as_slice())
        }
        Err(e) => {
            debug!("script enumeration failed: {e:#}");
            None
        }
    }
}
