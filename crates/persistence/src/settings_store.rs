//! Key-value settings persistence
//!
//! Currently holds one value: the redirect number inbound calls are dialed
//! through to.

use async_trait::async_trait;

use crate::{PersistenceError, ScyllaClient};

/// Name of the stored inbound-call dial target
pub const REDIRECT_NUMBER: &str = "redirect_number";

/// Store for small named settings
#[async_trait]
pub trait SettingsStore: Send + Sync {
    async fn get(&self, name: &str) -> Result<Option<String>, PersistenceError>;

    async fn set(&self, name: &str, value: &str) -> Result<(), PersistenceError>;
}

/// ScyllaDB implementation of the settings store
#[derive(Clone)]
pub struct ScyllaSettingsStore {
    client: ScyllaClient,
}

impl ScyllaSettingsStore {
    pub fn new(client: ScyllaClient) -> Self {
        Self { client }
    }
}

#[async_trait]
impl SettingsStore for ScyllaSettingsStore {
    async fn get(&self, name: &str) -> Result<Option<String>, PersistenceError> {
        let query = format!(
            "SELECT value FROM {}.settings WHERE name = ?",
            self.client.keyspace()
        );

        let result = self.client.session().query_unpaged(query, (name,)).await?;

        if let Some(rows) = result.rows {
            if let Some(row) = rows.into_iter().next() {
                let (value,): (String,) = row
                    .into_typed()
                    .map_err(|e| PersistenceError::InvalidData(e.to_string()))?;
                return Ok(Some(value));
            }
        }

        Ok(None)
    }

    async fn set(&self, name: &str, value: &str) -> Result<(), PersistenceError> {
        let query = format!(
            "INSERT INTO {}.settings (name, value) VALUES (?, ?)",
            self.client.keyspace()
        );
        self.client.session().query_unpaged(query, (name, value)).await?;

        tracing::debug!(setting = %name, "Setting updated");
        Ok(())
    }
}
