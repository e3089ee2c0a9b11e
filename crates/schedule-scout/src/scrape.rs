//! One complete scrape run: acquire, then persist the outcome.

use crate::acquisition::{acquire, Acquired, AcquisitionTimings};
use crate::config::ScrapeConfig;
use crate::output::{scrape_timestamp, OutputWriter, ScrapeMetadata};
use crate::renderer::Renderer;
use anyhow::Result;
use tracing::{error, info};

/// Acquire the schedule and write `schedule.json` plus metadata.
///
/// On any failure exactly one thing is written, the failure metadata, and
/// the error is returned so the caller can mark the run failed.
pub async fn scrape(
    renderer: &dyn Renderer,
    config: &ScrapeConfig,
    timings: &AcquisitionTimings,
) -> Result<Acquired> {
    let writer = OutputWriter::new(&config.output_dir);

    let outcome = acquire_and_persist(renderer, config, timings, &writer).await;
    if outcome.is_err() {
        if let Err(e) = writer.write_metadata(&ScrapeMetadata::failure(scrape_timestamp())) {
            error!("failed to write failure metadata: {e:#}");
        }
    }
    outcome
}

async fn acquire_and_persist(
    renderer: &dyn Renderer,
    config: &ScrapeConfig,
    timings: &AcquisitionTimings,
    writer: &OutputWriter,
) -> Result<Acquired> {
    let acquired = acquire(renderer, config, timings).await?;

    let scraped_at = scrape_timestamp();
    writer.write_schedule(&acquired.document, &scraped_at)?;
    writer.write_metadata(&ScrapeMetadata::success(scraped_at, &acquired.document))?;
    info!(dir = %writer.dir().display(), "saved schedule and metadata");

    Ok(acquired)
}
