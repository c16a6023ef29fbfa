// SPDX-FileCopyrightText: 2026 Chatharvest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Signal handling for scrape runs.

use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Install SIGINT/SIGTERM handlers and return a token that fires on the first one.
///
/// Runs stop at the next user boundary or at the login gate.
pub fn install_signal_handler() -> CancellationToken {
    let token = CancellationToken::new();
    let token_clone = token.clone();

    tokio::spawn(async move {
        match wait_for_signal().await {
            Some(signal) => {
                info!(signal, "stopping after the current user");
                token_clone.cancel();
            }
            None => warn!("no signal handler could be installed, answer q at the login prompt to stop"),
        }
        debug!("shutdown signal handler completed");
    });

    token
}

/// Whether a signal listener's result means the signal arrived. A listener
/// that failed to install is logged and never reads as a shutdown request.
fn arrived(signal: &str, result: std::io::Result<()>) -> bool {
    match result {
        Ok(()) => true,
        Err(e) => {
            warn!(signal, error = %e, "signal handler unavailable");
            false
        }
    }
}

async fn ctrl_c() -> bool {
    arrived("SIGINT", tokio::signal::ctrl_c().await)
}

/// Name of the first signal received, or `None` when no handler could be installed.
#[cfg(unix)]
async fn wait_for_signal() -> Option<&'static str> {
    use tokio::signal::unix::{signal, SignalKind};

    let sigterm = async {
        let result = match signal(SignalKind::terminate()) {
            Ok(mut sigterm) => sigterm.recv().await.ok_or_else(|| {
                std::io::Error::new(std::io::ErrorKind::BrokenPipe, "SIGTERM stream closed")
            }),
            Err(e) => Err(e),
        };
        arrived("SIGTERM", result)
    };

    tokio::select! {
        true = ctrl_c() => Some("SIGINT"),
        true = sigterm => Some("SIGTERM"),
        else => None,
    }
}

#[cfg(not(unix))]
async fn wait_for_signal() -> Option<&'static str> {
    ctrl_c().await.then_some("Ctrl+C")
}
