// SPDX-FileCopyrightText: 2026 Chatharvest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! `chatharvest status` command implementation.
//!
//! Shows how much is in the store and whether a message run is waiting to
//! be resumed.

use std::io::IsTerminal;

use chatharvest_config::HarvestConfig;
use chatharvest_core::{HarvestError, StorageAdapter};
use chatharvest_scrape::Checkpoint;
use serde::Serialize;

use crate::commands::open_storage;

/// Structured status output for `--json` mode.
#[derive(Debug, Serialize)]
pub struct StatusResponse {
    pub database_path: String,
    pub users: i64,
    pub messages: i64,
    /// Last completed user of an unfinished message run.
    pub checkpoint: Option<i64>,
    pub checkpoint_path: String,
}

/// Run the `chatharvest status` command.
pub async fn run_status(config: &HarvestConfig, json: bool, plain: bool) -> Result<(), HarvestError> {
    let storage = open_storage(config).await?;
    let response = StatusResponse {
        database_path: config.storage.database_path.clone(),
        users: storage.count_users().await?,
        messages: storage.count_messages().await?,
        checkpoint: Checkpoint::new(&config.scrape.checkpoint_path).load()?,
        checkpoint_path: config.scrape.checkpoint_path.clone(),
    };
    storage.close().await?;

    if json {
        println!(
            "{}",
            serde_json::to_string_pretty(&response).unwrap_or_else(|_| "{}".to_string())
        );
    } else {
        let use_color = !plain && std::io::stdout().is_terminal();
        print_status(&response, use_color);
    }
    Ok(())
}

fn checkpoint_line(checkpoint: Option<i64>) -> String {
    match checkpoint {
        Some(0) => "run started, no user completed yet".to_string(),
        Some(id) => format!("resume after user {id}"),
        None => "none".to_string(),
    }
}

fn print_status(status: &StatusResponse, use_color: bool) {
    println!();
    println!("  chatharvest status");
    println!("  {}", "-".repeat(35));
    println!("    Store:      {}", status.database_path);
    println!("    Users:      {}", status.users);
    println!("    Messages:   {}", status.messages);

    let line = checkpoint_line(status.checkpoint);
    if use_color && status.checkpoint.is_some() {
        use colored::Colorize;
        println!("    Checkpoint: {}", line.yellow());
    } else {
        println!("    Checkpoint: {line}");
    }
    println!();
}
