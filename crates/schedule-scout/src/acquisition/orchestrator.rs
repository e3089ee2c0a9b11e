//! Acquisition orchestrator: one page load, one schedule.
//!
//! ```text
//! Loading → Collecting → (Extracting) → Resolved | Failed
//! ```
//!
//! The network collector is subscribed before navigation starts. After the
//! page settles, the first network candidate is awaited (bounded), a grace
//! period lets a fresher one supersede it, and only if the network produced
//! nothing is the page itself searched.

use super::collector::NetworkCollector;
use super::extractor::{ExtractionStrategy, InPageExtractor};
use crate::config::ScrapeConfig;
use crate::error::AcquisitionError;
use crate::renderer::{RenderContext, Renderer};
use crate::schedule::ScheduleDocument;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Fixed delays and timeouts of a run.
#[derive(Debug, Clone)]
pub struct AcquisitionTimings {
    pub navigation_timeout: Duration,
    /// Wait after navigation before reading anything.
    pub load_settle: Duration,
    /// Upper bound on waiting for the first network candidate.
    pub first_candidate_timeout: Duration,
    /// Extra time for a fresher network candidate to arrive.
    pub grace: Duration,
    /// Wait before in-page extraction (hydration, anti-bot interstitials).
    pub extraction_settle: Duration,
    pub lookup_retry_interval: Duration,
    pub lookup_reread_settle: Duration,
}

impl Default for AcquisitionTimings {
    fn default() -> Self {
        Self {
            navigation_timeout: Duration::from_secs(60),
            load_settle: Duration::from_secs(8),
            first_candidate_timeout: Duration::from_secs(15),
            grace: Duration::from_secs(2),
            extraction_settle: Duration::from_secs(3),
            lookup_retry_interval: Duration::from_millis(500),
            lookup_reread_settle: Duration::from_secs(1),
        }
    }
}

impl AcquisitionTimings {
    /// No settle delays; only the first-candidate wait is kept.
    pub fn immediate(first_candidate_timeout: Duration) -> Self {
        Self {
            navigation_timeout: Duration::from_secs(5),
            load_settle: Duration::ZERO,
            first_candidate_timeout,
            grace: Duration::ZERO,
            extraction_settle: Duration::ZERO,
            lookup_retry_interval: Duration::ZERO,
            lookup_reread_settle: Duration::ZERO,
        }
    }
}

/// States of one acquisition run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AcquisitionState {
    Loading,
    Collecting,
    Extracting,
    Resolved,
    Failed,
}

/// Where the final document came from. Diagnostic only.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CandidateSource {
    Network,
    DirectLookup,
    ScriptScan,
}

impl From<ExtractionStrategy> for CandidateSource {
    fn from(strategy: ExtractionStrategy) -> Self {
        match strategy {
            ExtractionStrategy::DirectLookup => CandidateSource::DirectLookup,
            ExtractionStrategy::ScriptScan => CandidateSource::ScriptScan,
        }
    }
}

/// A resolved schedule and its source.
#[derive(Debug, Clone)]
pub struct Acquired {
    pub document: ScheduleDocument,
    pub source: CandidateSource,
}

/// Run one acquisition against a fresh browser context.
///
/// The context is closed on every path, success or not.
pub async fn acquire(
    renderer: &dyn Renderer,
    config: &ScrapeConfig,
    timings: &AcquisitionTimings,
) -> Result<Acquired, AcquisitionError> {
    let mut ctx = renderer
        .new_context()
        .await
        .map_err(AcquisitionError::Browser)?;

    let outcome = run_on_context(ctx.as_mut(), config, timings).await;

    if let Err(e) = ctx.close().await {
        warn!("failed to close browser context: {e:#}");
    }

    match &outcome {
        Ok(acquired) => info!(
            state = ?AcquisitionState::Resolved,
            source = ?acquired.source,
            "schedule acquired"
        ),
        Err(_) => warn!(state = ?AcquisitionState::Failed, "schedule acquisition failed"),
    }
    outcome
}

async fn run_on_context(
    ctx: &mut dyn RenderContext,
    config: &ScrapeConfig,
    timings: &AcquisitionTimings,
) -> Result<Acquired, AcquisitionError> {
    debug!(state = ?AcquisitionState::Loading, "opening page");

    let collector = Arc::new(NetworkCollector::new());
    let listener = match ctx.subscribe_responses().await {
        Ok(exchanges) => Some(collector.spawn(exchanges)),
        Err(e) => {
            warn!("network observation unavailable: {e:#}");
            None
        }
    };

    let outcome = collect_then_extract(ctx, &collector, config, timings).await;

    if let Some(listener) = listener {
        listener.abort();
    }
    let (observed, accepted) = collector.stats();
    debug!(observed, accepted, "network collection finished");

    outcome
}

async fn collect_then_extract(
    ctx: &mut dyn RenderContext,
    collector: &NetworkCollector,
    config: &ScrapeConfig,
    timings: &AcquisitionTimings,
) -> Result<Acquired, AcquisitionError> {
    let timeout_ms = timings.navigation_timeout.as_millis() as u64;
    match ctx.navigate(config.target_url.as_str(), timeout_ms).await {
        Ok(nav) => info!(load_time_ms = nav.load_time_ms, "page loaded"),
        Err(e) => {
            // The error may carry the address; keep it out of normal logs.
            warn!(state = ?AcquisitionState::Failed, "navigation did not complete");
            debug!("navigation error: {e:#}");
            return Err(AcquisitionError::NoCandidate);
        }
    }

    tokio::time::sleep(timings.load_settle).await;

    debug!(state = ?AcquisitionState::Collecting, "waiting for network candidates");
    let first = collector
        .wait_for_first(timings.first_candidate_timeout)
        .await;
    debug!(first_seen = first.is_some(), "first-candidate wait finished");

    tokio::time::sleep(timings.grace).await;
    if let Some(document) = collector.best() {
        return Ok(Acquired {
            document,
            source: CandidateSource::Network,
        });
    }

    debug!(state = ?AcquisitionState::Extracting, "no network candidate, reading the page");
    tokio::time::sleep(timings.extraction_settle).await;

    let extractor = InPageExtractor::new(config.path.clone())
        .with_delays(timings.lookup_retry_interval, timings.lookup_reread_settle);

    match extractor.extract(&*ctx).await {
        Some((document, strategy)) => Ok(Acquired {
            document,
            source: strategy.into(),
        }),
        None => Err(AcquisitionError::NoCandidate),
    }
}
