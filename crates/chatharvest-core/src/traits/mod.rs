// SPDX-FileCopyrightText: 2026 Chatharvest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Adapter trait definitions.
//!
//! Storage and browser adapters extend the [`PluginAdapter`] base trait and use
//! `#[async_trait]` for dynamic dispatch compatibility. The operator gate is a
//! plain async trait since it has no lifecycle of its own.

pub mod adapter;
pub mod browser;
pub mod gate;
pub mod storage;

pub use adapter::PluginAdapter;
pub use browser::{BrowserSession, SessionFactory};
pub use gate::{GateDecision, GatePrompt, ReauthGate};
pub use storage::StorageAdapter;
