//! Phone number persistence

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use scylla::frame::value::Counter;
use uuid::Uuid;

use callscribe_core::{PhoneNumber, PhoneNumberStatus};

use crate::cql::{from_millis, opt_from_millis, to_millis};
use crate::{PersistenceError, ScyllaClient};

/// Store for phone number bookkeeping
#[async_trait]
pub trait PhoneNumberStore: Send + Sync {
    /// Upsert the number and mark it called at `at`.
    ///
    /// The call counter increments atomically; the row is created on first
    /// touch and only updated afterwards.
    async fn touch(&self, number: &str, at: DateTime<Utc>) -> Result<(), PersistenceError>;

    async fn get(&self, number: &str) -> Result<Option<PhoneNumber>, PersistenceError>;

    async fn list(&self) -> Result<Vec<PhoneNumber>, PersistenceError>;

    async fn set_status(&self, number: &str, status: PhoneNumberStatus) -> Result<(), PersistenceError>;
}

/// ScyllaDB implementation of the phone number store
#[derive(Clone)]
pub struct ScyllaPhoneNumberStore {
    client: ScyllaClient,
}

impl ScyllaPhoneNumberStore {
    pub fn new(client: ScyllaClient) -> Self {
        Self { client }
    }

    async fn counters(&self) -> Result<HashMap<String, i64>, PersistenceError> {
        let query = format!(
            "SELECT number, call_count FROM {}.phone_number_stats",
            self.client.keyspace()
        );

        let result = self.client.session().query_unpaged(query, ()).await?;

        let mut counts = HashMap::new();
        if let Some(rows) = result.rows {
            for row in rows {
                let (number, count): (String, Counter) = row
                    .into_typed()
                    .map_err(|e| PersistenceError::InvalidData(e.to_string()))?;
                counts.insert(number, count.0);
            }
        }
        Ok(counts)
    }
}

type PhoneNumberRow = (String, Uuid, String, Option<i64>, i64);

fn row_to_number(row: PhoneNumberRow, call_count: i64) -> Result<PhoneNumber, PersistenceError> {
    let (number, id, status, last_called, created_at) = row;
    Ok(PhoneNumber {
        id,
        number,
        status: status
            .parse()
            .map_err(PersistenceError::InvalidData)?,
        last_called: opt_from_millis(last_called),
        call_count,
        created_at: from_millis(created_at),
    })
}

#[async_trait]
impl PhoneNumberStore for ScyllaPhoneNumberStore {
    async fn touch(&self, number: &str, at: DateTime<Utc>) -> Result<(), PersistenceError> {
        // Create-once: the id and created_at are fixed by the first touch
        let insert = format!(
            "INSERT INTO {}.phone_numbers (number, id, status, created_at)
             VALUES (?, ?, ?, ?) IF NOT EXISTS",
            self.client.keyspace()
        );
        self.client
            .session()
            .query_unpaged(
                insert,
                (number, Uuid::new_v4(), PhoneNumberStatus::Active.as_str(), to_millis(at)),
            )
            .await?;

        let update = format!(
            "UPDATE {}.phone_numbers SET last_called = ? WHERE number = ?",
            self.client.keyspace()
        );
        self.client
            .session()
            .query_unpaged(update, (to_millis(at), number))
            .await?;

        let bump = format!(
            "UPDATE {}.phone_number_stats SET call_count = call_count + 1 WHERE number = ?",
            self.client.keyspace()
        );
        self.client.session().query_unpaged(bump, (number,)).await?;

        tracing::debug!(number = %number, "Phone number touched");
        Ok(())
    }

    async fn get(&self, number: &str) -> Result<Option<PhoneNumber>, PersistenceError> {
        let query = format!(
            "SELECT number, id, status, last_called, created_at
             FROM {}.phone_numbers WHERE number = ?",
            self.client.keyspace()
        );

        let result = self.client.session().query_unpaged(query, (number,)).await?;

        if let Some(rows) = result.rows {
            if let Some(row) = rows.into_iter().next() {
                let typed: PhoneNumberRow = row
                    .into_typed()
                    .map_err(|e| PersistenceError::InvalidData(e.to_string()))?;

                let count_query = format!(
                    "SELECT call_count FROM {}.phone_number_stats WHERE number = ?",
                    self.client.keyspace()
                );
                let count_result = self
                    .client
                    .session()
                    .query_unpaged(count_query, (number,))
                    .await?;
                let call_count = count_result
                    .rows
                    .and_then(|rows| rows.into_iter().next())
                    .map(|row| row.into_typed::<(Counter,)>())
                    .transpose()
                    .map_err(|e| PersistenceError::InvalidData(e.to_string()))?
                    .map(|(c,)| c.0)
                    .unwrap_or(0);

                return Ok(Some(row_to_number(typed, call_count)?));
            }
        }

        Ok(None)
    }

    async fn list(&self) -> Result<Vec<PhoneNumber>, PersistenceError> {
        let query = format!(
            "SELECT number, id, status, last_called, created_at FROM {}.phone_numbers",
            self.client.keyspace()
        );

        let result = self.client.session().query_unpaged(query, ()).await?;
        let counts = self.counters().await?;

        let mut numbers = Vec::new();
        if let Some(rows) = result.rows {
            for row in rows {
                let typed: PhoneNumberRow = row
                    .into_typed()
                    .map_err(|e| PersistenceError::InvalidData(e.to_string()))?;
                let count = counts.get(&typed.0).copied().unwrap_or(0);
                numbers.push(row_to_number(typed, count)?);
            }
        }

        numbers.sort_by(|a, b| b.last_called.cmp(&a.last_called));
        Ok(numbers)
    }

    async fn set_status(&self, number: &str, status: PhoneNumberStatus) -> Result<(), PersistenceError> {
        let query = format!(
            "UPDATE {}.phone_numbers SET status = ? WHERE number = ?",
            self.client.keyspace()
        );
        self.client
            .session()
            .query_unpaged(query, (status.as_str(), number))
            .await?;

        tracing::debug!(number = %number, status = %status, "Phone number status updated");
        Ok(())
    }
}
