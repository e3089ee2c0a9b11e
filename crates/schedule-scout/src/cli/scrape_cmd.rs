//! `schedule-scout scrape` — acquire the schedule and persist it.

use crate::acquisition::AcquisitionTimings;
use crate::config::ScrapeConfig;
use crate::renderer::chromium::ChromiumRenderer;
use crate::renderer::Renderer;
use crate::scrape::scrape;
use anyhow::{Context, Result};
use tracing::{info, warn};

/// Run the scrape command.
pub async fn run(url: Option<&str>, path: Option<&str>, output_dir: Option<&str>) -> Result<()> {
    // Configuration problems end the run before a browser is launched.
    let config = ScrapeConfig::resolve(url, path, output_dir).context("invalid configuration")?;

    info!(
        direct_lookup = config.path.is_some(),
        "starting schedule scrape"
    );

    let renderer = ChromiumRenderer::new().await?;
    let result = scrape(&renderer, &config, &AcquisitionTimings::default()).await;

    if let Err(e) = renderer.shutdown().await {
        warn!("browser shutdown failed: {e:#}");
    }

    let acquired = result?;
    info!(source = ?acquired.source, "scrape completed");
    Ok(())
}
