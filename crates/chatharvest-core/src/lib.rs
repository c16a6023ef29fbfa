// SPDX-FileCopyrightText: 2026 Chatharvest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Core library for Chatharvest.
//!
//! This crate holds the shared error type, the domain types persisted by the
//! store (users and their chat messages), and the adapter traits that separate
//! the scraping logic from the browser, the database, and the operator surface.

pub mod error;
pub mod traits;
pub mod types;

// Re-export key items at crate root for ergonomic imports.
pub use error::HarvestError;
pub use types::{AdapterType, HealthStatus, Message, NewUser, Sender, StoredMessage, User, UserLink};

// Re-export all adapter traits at crate root.
pub use traits::{BrowserSession, GateDecision, GatePrompt, PluginAdapter, ReauthGate, SessionFactory, StorageAdapter};
