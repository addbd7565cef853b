//! Call persistence

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use callscribe_core::{Call, CallStatus};

use crate::cql::{from_millis, lwt_applied, opt_from_millis, to_millis};
use crate::{PersistenceError, ScyllaClient};

/// Store for calls, keyed by the carrier-assigned call SID
#[async_trait]
pub trait CallStore: Send + Sync {
    /// Create the call if no row with this SID exists yet.
    ///
    /// Returns false when the row already existed, which is how duplicate
    /// webhook deliveries are absorbed.
    async fn create_if_absent(&self, call: &Call) -> Result<bool, PersistenceError>;

    async fn get(&self, call_sid: &str) -> Result<Option<Call>, PersistenceError>;

    /// Apply a carrier status callback.
    async fn update_status(
        &self,
        call_sid: &str,
        status: CallStatus,
        duration_secs: Option<i32>,
        end_time: Option<DateTime<Utc>>,
    ) -> Result<(), PersistenceError>;

    /// Set the duration reported with the finished recording.
    async fn set_duration(&self, call_sid: &str, duration_secs: i32) -> Result<(), PersistenceError>;

    /// Most recent calls first, bounded page size.
    async fn list_recent(&self, limit: i32) -> Result<Vec<Call>, PersistenceError>;

    /// All calls for one phone number, most recent first.
    async fn list_for_number(&self, number: &str) -> Result<Vec<Call>, PersistenceError>;
}

/// ScyllaDB implementation of the call store
#[derive(Clone)]
pub struct ScyllaCallStore {
    client: ScyllaClient,
}

impl ScyllaCallStore {
    pub fn new(client: ScyllaClient) -> Self {
        Self { client }
    }
}

type CallRow = (String, String, String, String, i64, Option<i64>, Option<i32>);

fn row_to_call(row: CallRow) -> Result<Call, PersistenceError> {
    let (call_sid, phone_number, direction, status, start_time, end_time, duration_secs) = row;
    Ok(Call {
        call_sid,
        phone_number,
        direction: direction.parse().map_err(PersistenceError::InvalidData)?,
        status: status.parse().map_err(PersistenceError::InvalidData)?,
        start_time: from_millis(start_time),
        end_time: opt_from_millis(end_time),
        duration_secs,
    })
}

#[async_trait]
impl CallStore for ScyllaCallStore {
    async fn create_if_absent(&self, call: &Call) -> Result<bool, PersistenceError> {
        let query = format!(
            "INSERT INTO {}.calls (call_sid, phone_number, direction, status, start_time, end_time, duration_secs)
             VALUES (?, ?, ?, ?, ?, ?, ?) IF NOT EXISTS",
            self.client.keyspace()
        );

        let result = self
            .client
            .session()
            .query_unpaged(
                query,
                (
                    &call.call_sid,
                    &call.phone_number,
                    call.direction.as_str(),
                    call.status.as_str(),
                    to_millis(call.start_time),
                    call.end_time.map(to_millis),
                    call.duration_secs,
                ),
            )
            .await?;

        let created = lwt_applied(&result);
        if created {
            tracing::debug!(call_sid = %call.call_sid, "Call created");
        } else {
            tracing::debug!(call_sid = %call.call_sid, "Call already exists, duplicate delivery absorbed");
        }
        Ok(created)
    }

    async fn get(&self, call_sid: &str) -> Result<Option<Call>, PersistenceError> {
        let query = format!(
            "SELECT call_sid, phone_number, direction, status, start_time, end_time, duration_secs
             FROM {}.calls WHERE call_sid = ?",
            self.client.keyspace()
        );

        let result = self.client.session().query_unpaged(query, (call_sid,)).await?;

        if let Some(rows) = result.rows {
            if let Some(row) = rows.into_iter().next() {
                let typed: CallRow = row
                    .into_typed()
                    .map_err(|e| PersistenceError::InvalidData(e.to_string()))?;
                return Ok(Some(row_to_call(typed)?));
            }
        }

        Ok(None)
    }

    async fn update_status(
        &self,
        call_sid: &str,
        status: CallStatus,
        duration_secs: Option<i32>,
        end_time: Option<DateTime<Utc>>,
    ) -> Result<(), PersistenceError> {
        // CQL UPDATE would upsert a ghost row for an unknown SID
        if self.get(call_sid).await?.is_none() {
            return Err(PersistenceError::CallNotFound(call_sid.to_string()));
        }

        // Only overwrite what the callback actually reported
        let query = format!(
            "UPDATE {}.calls SET status = ? WHERE call_sid = ?",
            self.client.keyspace()
        );
        self.client
            .session()
            .query_unpaged(query, (status.as_str(), call_sid))
            .await?;

        if let Some(duration) = duration_secs {
            self.set_duration(call_sid, duration).await?;
        }

        if let Some(ended) = end_time {
            let query = format!(
                "UPDATE {}.calls SET end_time = ? WHERE call_sid = ?",
                self.client.keyspace()
            );
            self.client
                .session()
                .query_unpaged(query, (to_millis(ended), call_sid))
                .await?;
        }

        tracing::debug!(call_sid = %call_sid, status = %status, "Call status updated");
        Ok(())
    }

    async fn set_duration(&self, call_sid: &str, duration_secs: i32) -> Result<(), PersistenceError> {
        let query = format!(
            "UPDATE {}.calls SET duration_secs = ? WHERE call_sid = ?",
            self.client.keyspace()
        );
        self.client
            .session()
            .query_unpaged(query, (duration_secs, call_sid))
            .await?;
        Ok(())
    }

    async fn list_recent(&self, limit: i32) -> Result<Vec<Call>, PersistenceError> {
        // Full-partition scan with a bound; in production you'd keep a
        // time-bucketed table for this query.
        let query = format!(
            "SELECT call_sid, phone_number, direction, status, start_time, end_time, duration_secs
             FROM {}.calls LIMIT ?",
            self.client.keyspace()
        );

        let result = self.client.session().query_unpaged(query, (limit,)).await?;

        let mut calls = Vec::new();
        if let Some(rows) = result.rows {
            for row in rows {
                let typed: CallRow = row
                    .into_typed()
                    .map_err(|e| PersistenceError::InvalidData(e.to_string()))?;
                calls.push(row_to_call(typed)?);
            }
        }

        calls.sort_by(|a, b| b.start_time.cmp(&a.start_time));
        Ok(calls)
    }

    async fn list_for_number(&self, number: &str) -> Result<Vec<Call>, PersistenceError> {
        // Note: this requires ALLOW FILTERING; in production you'd use a
        // secondary index or a calls_by_number table.
        let query = format!(
            "SELECT call_sid, phone_number, direction, status, start_time, end_time, duration_secs
             FROM {}.calls WHERE phone_number = ? ALLOW FILTERING",
            self.client.keyspace()
        );

        let result = self.client.session().query_unpaged(query, (number,)).await?;

        let mut calls = Vec::new();
        if let Some(rows) = result.rows {
            for row in rows {
                let typed: CallRow = row
                    .into_typed()
                    .map_err(|e| PersistenceError::InvalidData(e.to_string()))?;
                calls.push(row_to_call(typed)?);
            }
        }

        calls.sort_by(|a, b| b.start_time.cmp(&a.start_time));
        Ok(calls)
    }
}
