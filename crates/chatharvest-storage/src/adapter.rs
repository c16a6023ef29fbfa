// SPDX-FileCopyrightText: 2026 Chatharvest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! SQLite implementation of the StorageAdapter trait.

use async_trait::async_trait;
use tokio::sync::OnceCell;
use tracing::debug;

use chatharvest_config::model::StorageConfig;
use chatharvest_core::types::{
    Conversation, Message, NewUser, StoredMessage, SupportSyncReport, User, UserLink,
};
use chatharvest_core::{AdapterType, HarvestError, HealthStatus, PluginAdapter, StorageAdapter};

use crate::database::Database;
use crate::queries;

/// SQLite-backed storage adapter.
///
/// Wraps a [`Database`] handle and delegates all query operations to the
/// typed query modules. The database is lazily initialized on the first
/// call to [`StorageAdapter::initialize`].
pub struct SqliteStorage {
    config: StorageConfig,
    db: OnceCell<Database>,
}

impl SqliteStorage {
    /// Create a new SqliteStorage with the given configuration.
    ///
    /// The database connection is not opened until [`initialize`] is called.
    ///
    /// [`initialize`]: StorageAdapter::initialize
    pub fn new(config: StorageConfig) -> Self {
        Self {
            config,
            db: OnceCell::new(),
        }
    }

    /// Returns a reference to the underlying Database, or an error if not initialized.
    fn db(&self) -> Result<&Database, HarvestError> {
        self.db.get().ok_or_else(|| HarvestError::Storage {
            source: "storage not initialized -- call initialize() first".into(),
        })
    }
}

#[async_trait]
impl PluginAdapter for SqliteStorage {
    fn name(&self) -> &str {
        "sqlite"
    }

    fn version(&self) -> semver::Version {
        semver::Version::new(0, 1, 0)
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::Storage
    }

    async fn health_check(&self) -> Result<HealthStatus, HarvestError> {
        let db = self.db()?;
        db.connection()
            .call(|conn| -> Result<(), rusqlite::Error> {
                conn.execute_batch("SELECT 1;")?;
                Ok(())
            })
            .await
            .map_err(crate::database::map_tr_err)?;
        Ok(HealthStatus::Healthy)
    }

    async fn shutdown(&self) -> Result<(), HarvestError> {
        if let Some(db) = self.db.get() {
            db.checkpoint().await?;
            debug!("shutdown: WAL checkpoint complete");
        }
        Ok(())
    }
}

#[async_trait]
impl StorageAdapter for SqliteStorage {
    async fn initialize(&self) -> Result<(), HarvestError> {
        let db = Database::open(&self.config.database_path, self.config.wal_mode).await?;
        self.db.set(db).map_err(|_| HarvestError::Storage {
            source: "storage already initialized".into(),
        })?;
        debug!(path = %self.config.database_path, "SQLite storage initialized");
        Ok(())
    }

    async fn close(&self) -> Result<(), HarvestError> {
        self.db()?.checkpoint().await?;
        debug!("WAL checkpoint complete");
        Ok(())
    }

    async fn reset(&self) -> Result<(), HarvestError> {
        queries::users::reset(self.db()?).await
    }

    // --- User operations ---

    async fn insert_user(&self, user: &NewUser) -> Result<i64, HarvestError> {
        queries::users::insert_user(self.db()?, user).await
    }

    async fn list_user_links(&self) -> Result<Vec<UserLink>, HarvestError> {
        queries::users::list_user_links(self.db()?).await
    }

    async fn list_users(&self) -> Result<Vec<User>, HarvestError> {
        queries::users::list_users(self.db()?).await
    }

    async fn get_user(&self, id: i64) -> Result<Option<User>, HarvestError> {
        queries::users::get_user(self.db()?, id).await
    }

    async fn update_friend_value(&self, id: i64, friend_value: &str) -> Result<(), HarvestError> {
        queries::users::update_friend_value(self.db()?, id, friend_value).await
    }

    async fn update_tags(&self, id: i64, tags: &str) -> Result<(), HarvestError> {
        queries::users::update_tags(self.db()?, id, tags).await
    }

    async fn apply_support_assignments(
        &self,
        assignments: &[(String, String)],
    ) -> Result<SupportSyncReport, HarvestError> {
        queries::users::apply_support_assignments(self.db()?, assignments).await
    }

    async fn count_users(&self) -> Result<i64, HarvestError> {
        queries::users::count_users(self.db()?).await
    }

    // --- Message operations ---

    async fn insert_messages(
        &self,
        user_id: i64,
        messages: &[Message],
    ) -> Result<usize, HarvestError> {
        queries::messages::insert_messages(self.db()?, user_id, messages).await
    }

    async fn messages_for_user(&self, user_id: i64) -> Result<Vec<StoredMessage>, HarvestError> {
        queries::messages::messages_for_user(self.db()?, user_id).await
    }

    async fn conversations_for_support(
        &self,
        support: &str,
    ) -> Result<Vec<Conversation>, HarvestError> {
        queries::messages::conversations_for_support(self.db()?, support).await
    }

    async fn count_messages(&self) -> Result<i64, HarvestError> {
        queries::messages::count_messages(self.db()?).await
    }
}
