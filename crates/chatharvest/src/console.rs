// SPDX-FileCopyrightText: 2026 Chatharvest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Terminal surface for scrape runs: answers login gates from stdin and
//! prints progress events.

use std::io::BufRead;

use chatharvest_core::GateDecision;
use chatharvest_scrape::{GateRequest, ProgressEvent};
use colored::Colorize;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::debug;

/// Interpret one line typed at the gate. Anything but a cancel word proceeds.
pub fn decision_from_line(line: &str) -> GateDecision {
    match line.trim().to_ascii_lowercase().as_str() {
        "q" | "quit" | "c" | "cancel" | "n" | "no" => GateDecision::Cancel,
        _ => GateDecision::Proceed,
    }
}

/// Read stdin on a plain thread so a pending read never holds up process exit.
fn stdin_lines() -> mpsc::UnboundedReceiver<String> {
    let (tx, rx) = mpsc::unbounded_channel();
    std::thread::spawn(move || {
        for line in std::io::stdin().lock().lines() {
            let Ok(line) = line else { break };
            if tx.send(line).is_err() {
                break;
            }
        }
    });
    rx
}

/// Answer gate requests from the terminal until the gate is dropped.
pub fn spawn_gate_responder(mut requests: mpsc::UnboundedReceiver<GateRequest>) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut lines = stdin_lines();
        while let Some(request) = requests.recv().await {
            println!();
            println!("  {}", request.prompt.title.bold());
            for line in request.prompt.instructions.lines() {
                println!("    {line}");
            }
            println!("  Press Enter to continue, or type q and Enter to cancel.");

            match lines.recv().await {
                Some(line) => match decision_from_line(&line) {
                    GateDecision::Proceed => request.proceed(),
                    GateDecision::Cancel => request.cancel(),
                },
                None => {
                    debug!("stdin closed, cancelling gate");
                    request.cancel();
                }
            }
        }
    })
}

/// One console line for a progress event.
pub fn render_event(event: &ProgressEvent, use_color: bool) -> String {
    let text = event.to_string();
    if !use_color {
        return text;
    }
    match event {
        ProgressEvent::UserCompleted { .. } | ProgressEvent::SessionRecovered => {
            text.green().to_string()
        }
        ProgressEvent::UserSkipped { .. } => text.yellow().to_string(),
        ProgressEvent::SessionLost { .. } => text.red().to_string(),
        ProgressEvent::RunStarted { .. } | ProgressEvent::RunFinished(_) => {
            text.bold().to_string()
        }
        _ => text,
    }
}

pub fn spawn_progress_printer(
    mut events: mpsc::UnboundedReceiver<ProgressEvent>,
    use_color: bool,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        while let Some(event) = events.recv().await {
            println!("{}", render_event(&event, use_color));
        }
    })
}
