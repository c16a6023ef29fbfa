// SPDX-FileCopyrightText: 2026 Chatharvest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Row types, re-exported from `chatharvest-core`.

pub use chatharvest_core::types::{
    Conversation, Message, NewUser, Sender, StoredMessage, SupportSyncReport, User, UserLink,
};
