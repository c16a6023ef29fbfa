// SPDX-FileCopyrightText: 2026 Chatharvest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Scrape, dataset, and reset commands.

use std::io::{IsTerminal, Write};
use std::sync::Arc;
use std::time::Duration;

use chatharvest_analysis::{build_dataset, DatasetError};
use chatharvest_browser::ChromeSessionFactory;
use chatharvest_config::HarvestConfig;
use chatharvest_core::{HarvestError, StorageAdapter};
use chatharvest_scrape::{ChannelGate, Checkpoint, Harvester, ProgressSink, RunOutcome};
use chatharvest_storage::SqliteStorage;
use tracing::info;

use crate::console::{spawn_gate_responder, spawn_progress_printer};
use crate::shutdown::install_signal_handler;

/// Open the store and run migrations.
pub async fn open_storage(config: &HarvestConfig) -> Result<Arc<SqliteStorage>, HarvestError> {
    let storage = Arc::new(SqliteStorage::new(config.storage.clone()));
    storage.initialize().await?;
    Ok(storage)
}

#[derive(Clone, Copy)]
enum Operation {
    Roster,
    Messages,
    Tags,
}

async fn run_scrape(config: &HarvestConfig, operation: Operation) -> Result<(), HarvestError> {
    let storage = open_storage(config).await?;
    let cancel = install_signal_handler();

    let (gate, requests) = ChannelGate::new(
        Duration::from_millis(config.gate.poll_interval_ms),
        cancel.clone(),
    );
    let (progress, events) = ProgressSink::channel();
    let responder = spawn_gate_responder(requests);
    let printer = spawn_progress_printer(events, std::io::stdout().is_terminal());

    let harvester = Harvester::new(
        config,
        storage.clone(),
        Arc::new(ChromeSessionFactory::new(config.browser.clone())),
        Arc::new(gate),
    )
    .with_progress(progress)
    .with_cancellation(cancel);

    let result = match operation {
        Operation::Roster => harvester.scrape_roster().await,
        Operation::Messages => harvester.scrape_messages().await,
        Operation::Tags => harvester.sync_tags().await,
    };

    // Dropping the harvester closes both channels so the console tasks end.
    drop(harvester);
    let _ = printer.await;
    responder.abort();
    storage.close().await?;

    if let Ok(RunOutcome::Interrupted { .. }) = &result {
        info!("run interrupted; rerun the same command to resume");
    }
    result.map(|_| ())
}

pub async fn run_roster(config: &HarvestConfig) -> Result<(), HarvestError> {
    run_scrape(config, Operation::Roster).await
}

pub async fn run_messages(config: &HarvestConfig) -> Result<(), HarvestError> {
    run_scrape(config, Operation::Messages).await
}

pub async fn run_tags(config: &HarvestConfig) -> Result<(), HarvestError> {
    run_scrape(config, Operation::Tags).await
}

pub async fn run_dataset(config: &HarvestConfig, support: &str) -> Result<(), HarvestError> {
    let storage = open_storage(config).await?;
    let summary = build_dataset(storage.as_ref(), support, &config.analysis)
        .await
        .map_err(|e| match e {
            DatasetError::Storage(e) => e,
            other => HarvestError::Internal(other.to_string()),
        })?;
    storage.close().await?;
    println!(
        "wrote {} conversations to {}",
        summary.conversations,
        summary.path.display()
    );
    Ok(())
}

fn confirm_reset() -> bool {
    print!("Delete all users, messages and the resume checkpoint? [y/N] ");
    let _ = std::io::stdout().flush();
    let mut answer = String::new();
    if std::io::stdin().read_line(&mut answer).is_err() {
        return false;
    }
    matches!(answer.trim().to_ascii_lowercase().as_str(), "y" | "yes")
}

pub async fn run_reset(config: &HarvestConfig, yes: bool) -> Result<(), HarvestError> {
    if !yes && !confirm_reset() {
        println!("aborted");
        return Ok(());
    }
    let storage = open_storage(config).await?;
    storage.reset().await?;
    Checkpoint::new(&config.scrape.checkpoint_path).clear()?;
    storage.close().await?;
    println!("store and checkpoint cleared");
    Ok(())
}
