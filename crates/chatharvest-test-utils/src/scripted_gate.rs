// SPDX-FileCopyrightText: 2026 Chatharvest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Operator gate that answers from a pre-recorded script.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use chatharvest_core::{GateDecision, GatePrompt, ReauthGate};

/// A gate whose answers are fixed up front.
///
/// Each `confirm` pops the next decision; an exhausted script answers
/// [`GateDecision::Cancel`]. Every prompt shown is recorded.
#[derive(Clone, Default)]
pub struct ScriptedGate {
    decisions: Arc<Mutex<VecDeque<GateDecision>>>,
    prompts: Arc<Mutex<Vec<GatePrompt>>>,
}

impl ScriptedGate {
    pub fn new(decisions: impl IntoIterator<Item = GateDecision>) -> Self {
        Self {
            decisions: Arc::new(Mutex::new(decisions.into_iter().collect())),
            prompts: Arc::default(),
        }
    }

    /// A gate that always lets the run continue.
    pub fn always_proceed(times: usize) -> Self {
        Self::new(std::iter::repeat_n(GateDecision::Proceed, times))
    }

    /// Prompts shown so far, oldest first.
    pub fn prompts(&self) -> Vec<GatePrompt> {
        self.prompts.lock().unwrap().clone()
    }
}

#[async_trait]
impl ReauthGate for ScriptedGate {
    async fn confirm(&self, prompt: &GatePrompt) -> GateDecision {
        self.prompts.lock().unwrap().push(prompt.clone());
        self.decisions
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or(GateDecision::Cancel)
    }
}
