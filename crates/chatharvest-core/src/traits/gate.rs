// SPDX-FileCopyrightText: 2026 Chatharvest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Operator confirmation gate.

use async_trait::async_trait;

/// What the operator is asked to do before the run continues.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GatePrompt {
    pub title: String,
    pub instructions: String,
}

/// The operator's answer at the gate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GateDecision {
    /// Login completed; continue the run.
    Proceed,
    /// Stop the run.
    Cancel,
}

/// A blocking confirm-or-cancel interaction driven by the operator surface.
///
/// `confirm` does not return until the operator has answered.
#[async_trait]
pub trait ReauthGate: Send + Sync {
    async fn confirm(&self, prompt: &GatePrompt) -> GateDecision;
}
