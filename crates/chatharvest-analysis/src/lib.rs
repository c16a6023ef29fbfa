// SPDX-FileCopyrightText: 2026 Chatharvest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Analysis inputs built from the scraped store.
//!
//! For one support agent, every assigned conversation becomes a JSONL
//! record carrying reply-latency statistics and a recent-first excerpt sized
//! for an LLM prompt. The prompting itself happens elsewhere.

pub mod dataset;
pub mod metrics;

pub use dataset::{build_dataset, DatasetError, DatasetSummary};
pub use metrics::{response_metrics, ResponseMetrics};
