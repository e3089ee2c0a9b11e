// Copyright 2026 Schedule Scout Contributors
// SPDX-License-Identifier: Apache-2.0

use anyhow::Result;
use clap::{CommandFactory, Parser, Subcommand};
use clap_complete::Shell;
use schedule_scout::cli;
use schedule_scout::config::DEFAULT_OUTPUT_DIR;
use std::path::PathBuf;

#[derive(Parser)]
#[command(
    name = "schedule-scout",
    about = "Schedule Scout — acquire a dynamically rendered schedule document",
    version,
    after_help = "Run 'schedule-scout <command> --help' for details on each command."
)]
struct Cli {
    /// Enable verbose/debug logging
    #[arg(long, short, global = true)]
    verbose: bool,

    /// Emit logs as JSON lines
    #[arg(long, global = true)]
    json_logs: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Load the page, acquire the schedule and write it with its metadata
    Scrape {
        /// Page to load (falls back to TARGET_URL)
        #[arg(long)]
        url: Option<String>,
        /// Global path holding the schedule, e.g. "DisconSchedule.fact"
        /// (falls back to DATA_VARIABLE_NAME)
        #[arg(long)]
        path: Option<String>,
        /// Output directory (falls back to SCRAPE_OUTPUT_DIR, then "scraped-data")
        #[arg(long)]
        output_dir: Option<String>,
    },
    /// Print a top-level field of a JSON file (empty on any error)
    Field {
        /// JSON file to read
        file: PathBuf,
        /// Field name
        #[arg(default_value = cli::field_cmd::DEFAULT_FIELD)]
        name: String,
    },
    /// Print a top-level field of JSON read from stdin (empty on any error)
    FieldStdin {
        /// Field name
        #[arg(default_value = cli::field_cmd::DEFAULT_FIELD)]
        name: String,
    },
    /// Print a short summary of the last scrape
    Summary {
        /// Directory holding schedule.json and latest-metadata.json
        #[arg(long, default_value = DEFAULT_OUTPUT_DIR)]
        dir: PathBuf,
    },
    /// Generate shell completion scripts
    Completions {
        /// Shell type (bash, zsh, fish, powershell)
        shell: Shell,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Scrape {
            url,
            path,
            output_dir,
        } => {
            cli::init_tracing(cli.verbose, cli.json_logs);
            cli::scrape_cmd::run(url.as_deref(), path.as_deref(), output_dir.as_deref()).await
        }
        Commands::Field { file, name } => cli::field_cmd::run_file(&file, &name),
        Commands::FieldStdin { name } => cli::field_cmd::run_stdin(&name),
        Commands::Summary { dir } => cli::summary_cmd::run(&dir),
        Commands::Completions { shell } => {
            let mut cmd = Cli::command();
            clap_complete::generate(shell, &mut cmd, "schedule-scout", &mut std::io::stdout());
            Ok(())
        }
    };

    // Consistent exit codes: 0=success, 1=error
    if let Err(e) = &result {
        eprintln!("  Error: {e:#}");
        std::process::exit(1);
    }

    result
}
