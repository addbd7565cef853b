//! Transcription persistence

use async_trait::async_trait;
use chrono::Utc;
use uuid::Uuid;

use callscribe_core::{Transcription, TranscriptionStatus};

use crate::cql::{from_millis, to_millis};
use crate::{PersistenceError, ScyllaClient};

/// Store for transcriptions
#[async_trait]
pub trait TranscriptionStore: Send + Sync {
    async fn create(&self, transcription: &Transcription) -> Result<(), PersistenceError>;

    async fn get(&self, id: Uuid) -> Result<Option<Transcription>, PersistenceError>;

    /// Move the transcription to a terminal status.
    ///
    /// The lifecycle is monotonic; a transition away from a terminal status
    /// fails with `StatusRegression`.
    async fn set_status(&self, id: Uuid, status: TranscriptionStatus) -> Result<(), PersistenceError>;
}

/// ScyllaDB implementation of the transcription store
#[derive(Clone)]
pub struct ScyllaTranscriptionStore {
    client: ScyllaClient,
}

impl ScyllaTranscriptionStore {
    pub fn new(client: ScyllaClient) -> Self {
        Self { client }
    }
}

type TranscriptionRow = (Uuid, Uuid, String, String, String, i64, i64);

fn row_to_transcription(row: TranscriptionRow) -> Result<Transcription, PersistenceError> {
    let (id, recording_id, call_sid, text, status, created_at, updated_at) = row;
    Ok(Transcription {
        id,
        recording_id,
        call_sid,
        text,
        status: status.parse().map_err(PersistenceError::InvalidData)?,
        created_at: from_millis(created_at),
        updated_at: from_millis(updated_at),
    })
}

#[async_trait]
impl TranscriptionStore for ScyllaTranscriptionStore {
    async fn create(&self, transcription: &Transcription) -> Result<(), PersistenceError> {
        let query = format!(
            "INSERT INTO {}.transcriptions (id, recording_id, call_sid, text, status, created_at, updated_at)
             VALUES (?, ?, ?, ?, ?, ?, ?)",
            self.client.keyspace()
        );

        self.client
            .session()
            .query_unpaged(
                query,
                (
                    transcription.id,
                    transcription.recording_id,
                    &transcription.call_sid,
                    &transcription.text,
                    transcription.status.as_str(),
                    to_millis(transcription.created_at),
                    to_millis(transcription.updated_at),
                ),
            )
            .await?;

        tracing::debug!(
            transcription_id = %transcription.id,
            status = %transcription.status,
            "Transcription created"
        );
        Ok(())
    }

    async fn get(&self, id: Uuid) -> Result<Option<Transcription>, PersistenceError> {
        let query = format!(
            "SELECT id, recording_id, call_sid, text, status, created_at, updated_at
             FROM {}.transcriptions WHERE id = ?",
            self.client.keyspace()
        );

        let result = self.client.session().query_unpaged(query, (id,)).await?;

        if let Some(rows) = result.rows {
            if let Some(row) = rows.into_iter().next() {
                let typed: TranscriptionRow = row
                    .into_typed()
                    .map_err(|e| PersistenceError::InvalidData(e.to_string()))?;
                return Ok(Some(row_to_transcription(typed)?));
            }
        }

        Ok(None)
    }

    async fn set_status(&self, id: Uuid, status: TranscriptionStatus) -> Result<(), PersistenceError> {
        let current = self
            .get(id)
            .await?
            .ok_or_else(|| PersistenceError::TranscriptionNotFound(id.to_string()))?;

        if !current.status.can_transition_to(status) {
            return Err(PersistenceError::StatusRegression {
                from: current.status,
                to: status,
            });
        }

        let query = format!(
            "UPDATE {}.transcriptions SET status = ?, updated_at = ? WHERE id = ?",
            self.client.keyspace()
        );

        self.client
            .session()
            .query_unpaged(query, (status.as_str(), Utc::now().timestamp_millis(), id))
            .await?;

        tracing::debug!(transcription_id = %id, status = %status, "Transcription status updated");
        Ok(())
    }
}
