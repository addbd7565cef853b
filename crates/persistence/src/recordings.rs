//! Recording persistence

use async_trait::async_trait;
use uuid::Uuid;

use callscribe_core::Recording;

use crate::cql::{from_millis, lwt_applied, to_millis};
use crate::{PersistenceError, ScyllaClient};

/// Store for recordings, one per call
#[async_trait]
pub trait RecordingStore: Send + Sync {
    /// Create the recording unless one already exists for the call.
    ///
    /// Returns false when the call already has a recording, which drops
    /// duplicate recording callbacks for the same call.
    async fn create_if_absent(&self, recording: &Recording) -> Result<bool, PersistenceError>;

    async fn get_by_call(&self, call_sid: &str) -> Result<Option<Recording>, PersistenceError>;

    async fn get_by_sid(&self, recording_sid: &str) -> Result<Option<Recording>, PersistenceError>;

    /// Link the transcription row once it exists (single-row update).
    async fn set_transcription_id(
        &self,
        call_sid: &str,
        transcription_id: Uuid,
    ) -> Result<(), PersistenceError>;
}

/// ScyllaDB implementation of the recording store
#[derive(Clone)]
pub struct ScyllaRecordingStore {
    client: ScyllaClient,
}

impl ScyllaRecordingStore {
    pub fn new(client: ScyllaClient) -> Self {
        Self { client }
    }
}

type RecordingRow = (String, Uuid, String, String, i64, i32, Option<Uuid>, i64);

fn row_to_recording(row: RecordingRow) -> Recording {
    let (call_sid, id, recording_sid, file_url, file_size, duration_secs, transcription_id, created_at) = row;
    Recording {
        id,
        call_sid,
        recording_sid,
        file_url,
        file_size,
        duration_secs,
        transcription_id,
        created_at: from_millis(created_at),
    }
}

#[async_trait]
impl RecordingStore for ScyllaRecordingStore {
    async fn create_if_absent(&self, recording: &Recording) -> Result<bool, PersistenceError> {
        let query = format!(
            "INSERT INTO {}.recordings
                (call_sid, id, recording_sid, file_url, file_size, duration_secs, transcription_id, created_at)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?) IF NOT EXISTS",
            self.client.keyspace()
        );

        let result = self
            .client
            .session()
            .query_unpaged(
                query,
                (
                    &recording.call_sid,
                    recording.id,
                    &recording.recording_sid,
                    &recording.file_url,
                    recording.file_size,
                    recording.duration_secs,
                    recording.transcription_id,
                    to_millis(recording.created_at),
                ),
            )
            .await?;

        let created = lwt_applied(&result);
        if created {
            tracing::debug!(call_sid = %recording.call_sid, recording_sid = %recording.recording_sid, "Recording created");
        }
        Ok(created)
    }

    async fn get_by_call(&self, call_sid: &str) -> Result<Option<Recording>, PersistenceError> {
        let query = format!(
            "SELECT call_sid, id, recording_sid, file_url, file_size, duration_secs, transcription_id, created_at
             FROM {}.recordings WHERE call_sid = ?",
            self.client.keyspace()
        );

        let result = self.client.session().query_unpaged(query, (call_sid,)).await?;

        if let Some(rows) = result.rows {
            if let Some(row) = rows.into_iter().next() {
                let typed: RecordingRow = row
                    .into_typed()
                    .map_err(|e| PersistenceError::InvalidData(e.to_string()))?;
                return Ok(Some(row_to_recording(typed)));
            }
        }

        Ok(None)
    }

    async fn get_by_sid(&self, recording_sid: &str) -> Result<Option<Recording>, PersistenceError> {
        // Note: this requires ALLOW FILTERING; in production you'd use a
        // secondary index on recording_sid.
        let query = format!(
            "SELECT call_sid, id, recording_sid, file_url, file_size, duration_secs, transcription_id, created_at
             FROM {}.recordings WHERE recording_sid = ? ALLOW FILTERING",
            self.client.keyspace()
        );

        let result = self
            .client
            .session()
            .query_unpaged(query, (recording_sid,))
            .await?;

        if let Some(rows) = result.rows {
            if let Some(row) = rows.into_iter().next() {
                let typed: RecordingRow = row
                    .into_typed()
                    .map_err(|e| PersistenceError::InvalidData(e.to_string()))?;
                return Ok(Some(row_to_recording(typed)));
            }
        }

        Ok(None)
    }

    async fn set_transcription_id(
        &self,
        call_sid: &str,
        transcription_id: Uuid,
    ) -> Result<(), PersistenceError> {
        let query = format!(
            "UPDATE {}.recordings SET transcription_id = ? WHERE call_sid = ?",
            self.client.keyspace()
        );
        self.client
            .session()
            .query_unpaged(query, (transcription_id, call_sid))
            .await?;
        Ok(())
    }
}
