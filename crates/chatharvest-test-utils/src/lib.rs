// SPDX-FileCopyrightText: 2026 Chatharvest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Test utilities for Chatharvest integration tests.
//!
//! Provides mock adapters and HTML fixtures for fast, deterministic,
//! CI-runnable tests without a real browser or CRM account.
//!
//! # Components
//!
//! - [`MockBrowser`] - In-memory browser serving canned pages by URL
//! - [`MockSessionFactory`] - Hands out pre-built [`MockBrowser`]s in order
//! - [`ScriptedGate`] - Operator gate answering from a fixed script
//! - [`fixtures`] - Builders for CRM-shaped HTML pages

pub mod fixtures;
pub mod mock_browser;
pub mod scripted_gate;

pub use fixtures::ChatPage;
pub use mock_browser::{MockBrowser, MockSessionFactory};
pub use scripted_gate::ScriptedGate;
