//! CLI subcommand implementations for the schedule-scout binary.

pub mod field_cmd;
pub mod scrape_cmd;
pub mod summary_cmd;

/// Initialize tracing once for the process.
///
/// `RUST_LOG` overrides the default directive.
pub fn init_tracing(verbose: bool, json: bool) {
    let default_level = if verbose { "debug" } else { "info" };
    let filter = tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        tracing_subscriber::EnvFilter::new(format!("schedule_scout={default_level}"))
    });

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);
    if json {
        builder.json().init();
    } else {
        builder.init();
    }
}
