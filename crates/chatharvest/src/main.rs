// SPDX-FileCopyrightText: 2026 Chatharvest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Chatharvest - CRM chat transcript harvester.
//!
//! This is the binary entry point.

mod commands;
mod console;
mod shutdown;
mod status;
mod sync_support;

use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// Chatharvest - scrape CRM chat transcripts into a local store.
#[derive(Parser, Debug)]
#[command(name = "chatharvest", version, about, long_about = None)]
struct Cli {
    /// Use this config file instead of the XDG hierarchy.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

/// Available subcommands.
#[derive(Subcommand, Debug)]
enum Commands {
    /// Rebuild the users table from the CRM friend list.
    Roster,
    /// Scrape chat transcripts, resuming from the checkpoint if present.
    Messages,
    /// Refresh every user's CRM tags.
    Tags,
    /// Apply support-agent assignments from a CSV export of the assignment sheet.
    SyncSupport {
        /// CSV with the LINE name in the first column and the agent in the fifth.
        csv: PathBuf,
        /// Skip the first row.
        #[arg(long)]
        header: bool,
    },
    /// Write the JSONL analysis dataset for one support agent.
    Dataset {
        #[arg(long)]
        support: String,
    },
    /// Show store counts and the resume checkpoint.
    Status {
        /// Output as JSON.
        #[arg(long)]
        json: bool,
        /// Disable colors.
        #[arg(long)]
        plain: bool,
    },
    /// Delete all users and messages and the resume checkpoint.
    Reset {
        /// Do not ask for confirmation.
        #[arg(long)]
        yes: bool,
    },
}

fn init_tracing(log_level: &str) {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("chatharvest={log_level},warn")));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_names(false)
        .with_writer(std::io::stderr)
        .init();
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let loaded = match &cli.config {
        Some(path) => chatharvest_config::load_and_validate_path(path),
        None => chatharvest_config::load_and_validate(),
    };
    let config = match loaded {
        Ok(config) => config,
        Err(errors) => {
            chatharvest_config::render_errors(&errors);
            std::process::exit(1);
        }
    };

    let Some(command) = cli.command else {
        println!("chatharvest: use --help for available commands");
        return;
    };

    init_tracing(&config.logging.level);

    let result = match command {
        Commands::Roster => commands::run_roster(&config).await,
        Commands::Messages => commands::run_messages(&config).await,
        Commands::Tags => commands::run_tags(&config).await,
        Commands::SyncSupport { csv, header } => {
            sync_support::run_sync_support(&config, &csv, header).await
        }
        Commands::Dataset { support } => commands::run_dataset(&config, &support).await,
        Commands::Status { json, plain } => status::run_status(&config, json, plain).await,
        Commands::Reset { yes } => commands::run_reset(&config, yes).await,
    };

    if let Err(e) = result {
        eprintln!("error: {e}");
        std::process::exit(1);
    }
}
