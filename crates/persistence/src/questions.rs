//! Question persistence
//!
//! `display_order` values stay dense and contiguous: creation appends at the
//! end, moving swaps two orders in one logged batch, deletion renumbers the
//! survivors.

use async_trait::async_trait;
use scylla::batch::Batch;
use uuid::Uuid;

use callscribe_core::{MoveDirection, Question};

use crate::{PersistenceError, ScyllaClient};

/// Store for analysis questions
#[async_trait]
pub trait QuestionStore: Send + Sync {
    /// All questions ordered by `display_order`.
    async fn list_ordered(&self) -> Result<Vec<Question>, PersistenceError>;

    async fn get(&self, id: Uuid) -> Result<Option<Question>, PersistenceError>;

    /// Append a question at the end of the order.
    async fn create(&self, text: &str) -> Result<Question, PersistenceError>;

    /// Delete and renumber the remaining questions contiguously.
    async fn delete(&self, id: Uuid) -> Result<(), PersistenceError>;

    /// Swap orders with the neighbor in `direction`; both updates commit
    /// atomically or not at all.
    async fn move_question(&self, id: Uuid, direction: MoveDirection) -> Result<(), PersistenceError>;
}

/// ScyllaDB implementation of the question store
#[derive(Clone)]
pub struct ScyllaQuestionStore {
    client: ScyllaClient,
}

impl ScyllaQuestionStore {
    pub fn new(client: ScyllaClient) -> Self {
        Self { client }
    }
}

#[async_trait]
impl QuestionStore for ScyllaQuestionStore {
    async fn list_ordered(&self) -> Result<Vec<Question>, PersistenceError> {
        let query = format!(
            "SELECT id, text, display_order FROM {}.questions",
            self.client.keyspace()
        );

        let result = self.client.session().query_unpaged(query, ()).await?;

        let mut questions = Vec::new();
        if let Some(rows) = result.rows {
            for row in rows {
                let (id, text, display_order): (Uuid, String, i32) = row
                    .into_typed()
                    .map_err(|e| PersistenceError::InvalidData(e.to_string()))?;
                questions.push(Question { id, text, display_order });
            }
        }

        questions.sort_by_key(|q| q.display_order);
        Ok(questions)
    }

    async fn get(&self, id: Uuid) -> Result<Option<Question>, PersistenceError> {
        let query = format!(
            "SELECT id, text, display_order FROM {}.questions WHERE id = ?",
            self.client.keyspace()
        );

        let result = self.client.session().query_unpaged(query, (id,)).await?;

        if let Some(rows) = result.rows {
            if let Some(row) = rows.into_iter().next() {
                let (id, text, display_order): (Uuid, String, i32) = row
                    .into_typed()
                    .map_err(|e| PersistenceError::InvalidData(e.to_string()))?;
                return Ok(Some(Question { id, text, display_order }));
            }
        }

        Ok(None)
    }

    async fn create(&self, text: &str) -> Result<Question, PersistenceError> {
        let next_order = self
            .list_ordered()
            .await?
            .last()
            .map(|q| q.display_order + 1)
            .unwrap_or(0);

        let question = Question::new(text, next_order);

        let query = format!(
            "INSERT INTO {}.questions (id, text, display_order) VALUES (?, ?, ?)",
            self.client.keyspace()
        );
        self.client
            .session()
            .query_unpaged(query, (question.id, &question.text, question.display_order))
            .await?;

        tracing::debug!(question_id = %question.id, order = question.display_order, "Question created");
        Ok(question)
    }

    async fn delete(&self, id: Uuid) -> Result<(), PersistenceError> {
        let questions = self.list_ordered().await?;
        if !questions.iter().any(|q| q.id == id) {
            return Err(PersistenceError::QuestionNotFound(id.to_string()));
        }

        let delete = format!("DELETE FROM {}.questions WHERE id = ?", self.client.keyspace());
        self.client.session().query_unpaged(delete, (id,)).await?;

        // Renumber survivors so orders stay contiguous
        let update = format!(
            "UPDATE {}.questions SET display_order = ? WHERE id = ?",
            self.client.keyspace()
        );
        let mut batch = Batch::default();
        let mut values = Vec::new();
        for (index, question) in questions.iter().filter(|q| q.id != id).enumerate() {
            if question.display_order != index as i32 {
                batch.append_statement(update.as_str());
                values.push((index as i32, question.id));
            }
        }

        if !values.is_empty() {
            self.client.session().batch(&batch, values).await?;
        }

        tracing::debug!(question_id = %id, "Question deleted");
        Ok(())
    }

    async fn move_question(&self, id: Uuid, direction: MoveDirection) -> Result<(), PersistenceError> {
        let questions = self.list_ordered().await?;

        let current_index = questions
            .iter()
            .position(|q| q.id == id)
            .ok_or_else(|| PersistenceError::QuestionNotFound(id.to_string()))?;

        let target_index = match direction {
            MoveDirection::Up => current_index.checked_sub(1).ok_or(PersistenceError::MoveOutOfRange)?,
            MoveDirection::Down => {
                let next = current_index + 1;
                if next >= questions.len() {
                    return Err(PersistenceError::MoveOutOfRange);
                }
                next
            }
        };

        let current = &questions[current_index];
        let target = &questions[target_index];

        // Both order updates in one logged batch: the swap is atomic
        let update = format!(
            "UPDATE {}.questions SET display_order = ? WHERE id = ?",
            self.client.keyspace()
        );
        let mut batch = Batch::default();
        batch.append_statement(update.as_str());
        batch.append_statement(update.as_str());

        self.client
            .session()
            .batch(
                &batch,
                (
                    (target.display_order, current.id),
                    (current.display_order, target.id),
                ),
            )
            .await?;

        tracing::debug!(question_id = %id, ?direction, "Question moved");
        Ok(())
    }
}
