// SPDX-FileCopyrightText: 2026 Chatharvest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Reply-latency statistics.

use chatharvest_core::{Sender, StoredMessage};
use serde::Serialize;

/// Latency summary in seconds. Serializes as `{"count":0}` when there were
/// no customer-to-support replies.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResponseMetrics {
    pub count: usize,
    #[serde(flatten)]
    pub stats: Option<LatencyStats>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LatencyStats {
    pub avg_sec: f64,
    pub median_sec: f64,
    pub p90_sec: f64,
    pub p95_sec: f64,
    pub min_sec: f64,
    pub max_sec: f64,
}

/// Seconds between each customer message and a support message that
/// directly follows it.
pub fn reply_latencies(messages: &[StoredMessage]) -> Vec<f64> {
    messages
        .windows(2)
        .filter_map(|pair| {
            let (prev, next) = (&pair[0].message, &pair[1].message);
            (prev.sender == Sender::Customer && next.sender == Sender::Support)
                .then(|| (next.time_sent - prev.time_sent).num_seconds() as f64)
        })
        .collect()
}

/// Percentile with linear interpolation between closest ranks.
///
/// `sorted` must be ascending and non-empty.
pub fn percentile(sorted: &[f64], p: f64) -> f64 {
    let k = (sorted.len() - 1) as f64 * p;
    let (lo, hi) = (k.floor() as usize, k.ceil() as usize);
    if lo == hi {
        return sorted[lo];
    }
    sorted[lo] + (sorted[hi] - sorted[lo]) * (k - lo as f64)
}

fn median(sorted: &[f64]) -> f64 {
    let mid = sorted.len() / 2;
    if sorted.len() % 2 == 0 {
        (sorted[mid - 1] + sorted[mid]) / 2.0
    } else {
        sorted[mid]
    }
}

pub fn response_metrics(messages: &[StoredMessage]) -> ResponseMetrics {
    let mut latencies = reply_latencies(messages);
    if latencies.is_empty() {
        return ResponseMetrics {
            count: 0,
            stats: None,
        };
    }
    latencies.sort_by(f64::total_cmp);

    let count = latencies.len();
    ResponseMetrics {
        count,
        stats: Some(LatencyStats {
            avg_sec: latencies.iter().sum::<f64>() / count as f64,
            median_sec: median(&latencies),
            p90_sec: percentile(&latencies, 0.90),
            p95_sec: percentile(&latencies, 0.95),
            min_sec: latencies[0],
            max_sec: latencies[count - 1],
        }),
    }
}
