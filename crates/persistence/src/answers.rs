//! Answer persistence
//!
//! Answers are keyed by `(transcription_id, question_id)`, so persisting an
//! answer for the same pair again overwrites in place. Re-running analysis
//! can therefore never create duplicates.

use async_trait::async_trait;
use uuid::Uuid;

use callscribe_core::Answer;

use crate::cql::{from_millis, to_millis};
use crate::{PersistenceError, ScyllaClient};

/// Store for per-transcription answers
#[async_trait]
pub trait AnswerStore: Send + Sync {
    async fn upsert(&self, answer: &Answer) -> Result<(), PersistenceError>;

    async fn list_for_transcription(&self, transcription_id: Uuid) -> Result<Vec<Answer>, PersistenceError>;
}

/// ScyllaDB implementation of the answer store
#[derive(Clone)]
pub struct ScyllaAnswerStore {
    client: ScyllaClient,
}

impl ScyllaAnswerStore {
    pub fn new(client: ScyllaClient) -> Self {
        Self { client }
    }
}

#[async_trait]
impl AnswerStore for ScyllaAnswerStore {
    async fn upsert(&self, answer: &Answer) -> Result<(), PersistenceError> {
        let query = format!(
            "INSERT INTO {}.answers (transcription_id, question_id, question_text, answer, created_at)
             VALUES (?, ?, ?, ?, ?)",
            self.client.keyspace()
        );

        self.client
            .session()
            .query_unpaged(
                query,
                (
                    answer.transcription_id,
                    answer.question_id,
                    &answer.question_text,
                    &answer.answer,
                    to_millis(answer.created_at),
                ),
            )
            .await?;

        tracing::debug!(
            transcription_id = %answer.transcription_id,
            question_id = %answer.question_id,
            "Answer saved"
        );
        Ok(())
    }

    async fn list_for_transcription(&self, transcription_id: Uuid) -> Result<Vec<Answer>, PersistenceError> {
        let query = format!(
            "SELECT transcription_id, question_id, question_text, answer, created_at
             FROM {}.answers WHERE transcription_id = ?",
            self.client.keyspace()
        );

        let result = self
            .client
            .session()
            .query_unpaged(query, (transcription_id,))
            .await?;

        let mut answers = Vec::new();
        if let Some(rows) = result.rows {
            for row in rows {
                let (transcription_id, question_id, question_text, answer, created_at): (
                    Uuid,
                    Uuid,
                    String,
                    String,
                    i64,
                ) = row
                    .into_typed()
                    .map_err(|e| PersistenceError::InvalidData(e.to_string()))?;

                answers.push(Answer {
                    transcription_id,
                    question_id,
                    question_text,
                    answer,
                    created_at: from_millis(created_at),
                });
            }
        }

        Ok(answers)
    }
}
