// SPDX-FileCopyrightText: 2026 Chatharvest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Transcript extraction for Chatharvest.
//!
//! The pure pieces ([`time`], [`classify`], [`assemble`], [`profile`],
//! [`roster`] and [`tags`] parsing) work on HTML strings. The driving pieces
//! ([`scroll`], [`recovery`], and the [`Harvester`] run loops) talk to a
//! [`BrowserSession`](chatharvest_core::BrowserSession) and a
//! [`StorageAdapter`](chatharvest_core::StorageAdapter), so both can be
//! swapped for fakes in tests.

pub mod assemble;
pub mod checkpoint;
pub mod classify;
pub mod gate;
pub mod login;
pub mod messages;
pub mod profile;
pub mod progress;
pub mod recovery;
pub mod roster;
pub mod run;
pub mod scroll;
pub mod selectors;
pub mod tags;
pub mod time;

pub use checkpoint::Checkpoint;
pub use gate::{ChannelGate, GateRequest};
pub use progress::{ProgressEvent, ProgressSink};
pub use recovery::{NavigationOutcome, RecoveryState, SessionGuard};
pub use run::{Harvester, RunOutcome};
pub use time::TimeError;
