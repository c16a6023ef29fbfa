// SPDX-FileCopyrightText: 2026 Chatharvest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Channel-backed operator gate.
//!
//! The worker hands a [`GateRequest`] to whatever surface talks to the
//! operator, then polls the request's two flags until one is raised. The
//! surface answers by calling [`GateRequest::proceed`] or
//! [`GateRequest::cancel`] from any task or thread.

use std::time::Duration;

use async_trait::async_trait;
use chatharvest_core::{GateDecision, GatePrompt, ReauthGate};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

/// A pending confirm-or-cancel question for the operator.
#[derive(Debug, Clone)]
pub struct GateRequest {
    pub prompt: GatePrompt,
    proceed: CancellationToken,
    cancel: CancellationToken,
}

impl GateRequest {
    /// The operator finished logging in.
    pub fn proceed(&self) {
        self.proceed.cancel();
    }

    /// The operator wants the run stopped.
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    pub fn is_answered(&self) -> bool {
        self.proceed.is_cancelled() || self.cancel.is_cancelled()
    }
}

/// [`ReauthGate`] that forwards prompts over a channel and polls for the answer.
pub struct ChannelGate {
    tx: mpsc::UnboundedSender<GateRequest>,
    poll_interval: Duration,
    shutdown: CancellationToken,
}

impl ChannelGate {
    /// Build a gate and the receiver the operator surface reads requests from.
    ///
    /// `shutdown` resolves any open gate as cancelled (e.g. on Ctrl+C).
    pub fn new(
        poll_interval: Duration,
        shutdown: CancellationToken,
    ) -> (Self, mpsc::UnboundedReceiver<GateRequest>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (
            Self {
                tx,
                poll_interval,
                shutdown,
            },
            rx,
        )
    }
}

#[async_trait]
impl ReauthGate for ChannelGate {
    async fn confirm(&self, prompt: &GatePrompt) -> GateDecision {
        let request = GateRequest {
            prompt: prompt.clone(),
            proceed: CancellationToken::new(),
            cancel: CancellationToken::new(),
        };
        let (proceed, cancel) = (request.proceed.clone(), request.cancel.clone());

        if self.tx.send(request).is_err() {
            warn!(title = %prompt.title, "no operator surface attached; cancelling");
            return GateDecision::Cancel;
        }
        info!(title = %prompt.title, "waiting for operator");

        let mut ticker = tokio::time::interval(self.poll_interval);
        loop {
            ticker.tick().await;
            if proceed.is_cancelled() {
                return GateDecision::Proceed;
            }
            if cancel.is_cancelled() || self.shutdown.is_cancelled() {
                info!("operator cancelled the run");
                return GateDecision::Cancel;
            }
        }
    }
}
