//! Question engine
//!
//! Walks the configured questions in display order and asks the answer model
//! each one against the transcript. Answers persist as they arrive, so a
//! mid-run failure leaves the earlier answers in place; the first model
//! failure aborts the run and marks the transcription FAILED.

use std::sync::Arc;

use metrics::counter;
use uuid::Uuid;

use callscribe_core::{Answer, TranscriptionStatus};
use callscribe_persistence::{PersistenceError, StateStore};

use crate::{AnalysisError, AnswerModel};

/// Runs multi-question analysis over completed transcriptions
#[derive(Clone)]
pub struct QuestionEngine {
    store: StateStore,
    model: Arc<dyn AnswerModel>,
}

impl QuestionEngine {
    pub fn new(store: StateStore, model: Arc<dyn AnswerModel>) -> Self {
        Self { store, model }
    }

    /// Analyze one transcription, returning the number of answers persisted.
    ///
    /// With no questions configured this is a no-op that leaves the
    /// transcription status untouched. Re-running against the same
    /// transcription overwrites its answers in place.
    pub async fn analyze(&self, transcription_id: Uuid) -> Result<usize, AnalysisError> {
        let transcription = self
            .store
            .transcriptions
            .get(transcription_id)
            .await?
            .ok_or(AnalysisError::TranscriptionNotFound(transcription_id))?;

        let questions = self.store.questions.list_ordered().await?;
        if questions.is_empty() {
            tracing::info!(transcription_id = %transcription_id, "No questions configured, skipping analysis");
            return Ok(0);
        }

        tracing::info!(
            transcription_id = %transcription_id,
            call_sid = %transcription.call_sid,
            questions = questions.len(),
            "Analysis started"
        );

        for question in &questions {
            let answer = match self.model.answer(&transcription.text, &question.text).await {
                Ok(answer) => answer,
                Err(e) => {
                    tracing::error!(
                        transcription_id = %transcription_id,
                        question_id = %question.id,
                        error = %e,
                        "Answer model failed, aborting analysis"
                    );
                    counter!("analysis_failed_total").increment(1);
                    self.mark(transcription_id, TranscriptionStatus::Failed).await?;
                    return Err(e);
                }
            };

            self.store
                .answers
                .upsert(&Answer::new(transcription_id, question.id, &question.text, answer))
                .await?;
        }

        self.mark(transcription_id, TranscriptionStatus::Completed).await?;
        counter!("analysis_completed_total").increment(1);
        tracing::info!(
            transcription_id = %transcription_id,
            answers = questions.len(),
            "Analysis completed"
        );
        Ok(questions.len())
    }

    /// Set the transcription status, treating a refused regression as benign.
    ///
    /// Re-analysis of an already-terminal transcription keeps its original
    /// status; only the answers change.
    async fn mark(&self, transcription_id: Uuid, status: TranscriptionStatus) -> Result<(), AnalysisError> {
        match self.store.transcriptions.set_status(transcription_id, status).await {
            Ok(()) => Ok(()),
            Err(PersistenceError::StatusRegression { from, to }) => {
                tracing::debug!(
                    transcription_id = %transcription_id,
                    %from,
                    %to,
                    "Keeping terminal transcription status"
                );
                Ok(())
            }
            Err(e) => Err(e.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::prompt::NO_ANSWER_SENTINEL;
    use crate::ScriptedAnswerModel;
    use callscribe_core::{Call, CallDirection, Recording, Transcription};

    async fn seeded_transcription(store: &StateStore, text: &str) -> Uuid {
        let call = Call::new("CA1", "+15551234567", CallDirection::Outbound);
        store.calls.create_if_absent(&call).await.unwrap();
        let recording = Recording::new("CA1", "RE1", "memory://recordings/RE1.mp3", 2048, 30);
        store.recordings.create_if_absent(&recording).await.unwrap();
        let transcription = Transcription::pending(recording.id, "CA1", text);
        store.transcriptions.create(&transcription).await.unwrap();
        transcription.id
    }

    #[tokio::test]
    async fn test_answers_every_question_in_order() {
        let store = StateStore::in_memory();
        let id = seeded_transcription(&store, "We agreed on $50 per month starting Monday.").await;
        let q_price = store.questions.create("What price was quoted?").await.unwrap();
        let q_start = store.questions.create("When does service start?").await.unwrap();

        let model = ScriptedAnswerModel::default();
        model.push_answer("$50 per month");
        model.push_answer("Monday");

        let engine = QuestionEngine::new(store.clone(), Arc::new(model.clone()));
        assert_eq!(engine.analyze(id).await.unwrap(), 2);

        assert_eq!(
            model.questions_asked(),
            vec!["What price was quoted?", "When does service start?"]
        );

        let answers = store.answers.list_for_transcription(id).await.unwrap();
        assert_eq!(answers.len(), 2);
        let price = answers.iter().find(|a| a.question_id == q_price.id).unwrap();
        assert_eq!(price.answer, "$50 per month");
        assert_eq!(price.question_text, "What price was quoted?");
        let start = answers.iter().find(|a| a.question_id == q_start.id).unwrap();
        assert_eq!(start.answer, "Monday");

        let status = store.transcriptions.get(id).await.unwrap().unwrap().status;
        assert_eq!(status, TranscriptionStatus::Completed);
    }

    #[tokio::test]
    async fn test_sentinel_answers_are_persisted_verbatim() {
        let store = StateStore::in_memory();
        let id = seeded_transcription(&store, "We agreed on $50 per month.").await;
        store.questions.create("What price was quoted?").await.unwrap();
        store.questions.create("What is the customer's address?").await.unwrap();

        let model = ScriptedAnswerModel::default();
        model.push_answer("$50 per month");
        model.push_answer(NO_ANSWER_SENTINEL);

        let engine = QuestionEngine::new(store.clone(), Arc::new(model));
        assert_eq!(engine.analyze(id).await.unwrap(), 2);

        let answers = store.answers.list_for_transcription(id).await.unwrap();
        assert!(answers.iter().any(|a| a.answer == NO_ANSWER_SENTINEL));
    }

    #[tokio::test]
    async fn test_first_failure_aborts_and_marks_failed() {
        let store = StateStore::in_memory();
        let id = seeded_transcription(&store, "hello").await;
        for text in ["q0", "q1", "q2"] {
            store.questions.create(text).await.unwrap();
        }

        let model = ScriptedAnswerModel::default();
        model.push_answer("a0");
        model.push_failure("model overloaded");

        let engine = QuestionEngine::new(store.clone(), Arc::new(model));
        let err = engine.analyze(id).await.unwrap_err();
        assert!(matches!(err, AnalysisError::Api { .. }));

        // The answer persisted before the failure survives
        let answers = store.answers.list_for_transcription(id).await.unwrap();
        assert_eq!(answers.len(), 1);
        assert_eq!(answers[0].answer, "a0");

        let status = store.transcriptions.get(id).await.unwrap().unwrap().status;
        assert_eq!(status, TranscriptionStatus::Failed);
    }

    #[tokio::test]
    async fn test_no_questions_is_a_no_op() {
        let store = StateStore::in_memory();
        let id = seeded_transcription(&store, "hello").await;

        let engine = QuestionEngine::new(store.clone(), Arc::new(ScriptedAnswerModel::always("x")));
        assert_eq!(engine.analyze(id).await.unwrap(), 0);

        let status = store.transcriptions.get(id).await.unwrap().unwrap().status;
        assert_eq!(status, TranscriptionStatus::Pending);
        assert!(store.answers.list_for_transcription(id).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_reanalysis_overwrites_answers_and_keeps_status() {
        let store = StateStore::in_memory();
        let id = seeded_transcription(&store, "hello").await;
        store.questions.create("q0").await.unwrap();

        let engine = QuestionEngine::new(store.clone(), Arc::new(ScriptedAnswerModel::always("first")));
        engine.analyze(id).await.unwrap();

        let engine = QuestionEngine::new(store.clone(), Arc::new(ScriptedAnswerModel::always("second")));
        engine.analyze(id).await.unwrap();

        let answers = store.answers.list_for_transcription(id).await.unwrap();
        assert_eq!(answers.len(), 1);
        assert_eq!(answers[0].answer, "second");

        let status = store.transcriptions.get(id).await.unwrap().unwrap().status;
        assert_eq!(status, TranscriptionStatus::Completed);
    }

    #[tokio::test]
    async fn test_unknown_transcription() {
        let store = StateStore::in_memory();
        let engine = QuestionEngine::new(store, Arc::new(ScriptedAnswerModel::always("x")));
        let err = engine.analyze(Uuid::new_v4()).await.unwrap_err();
        assert!(matches!(err, AnalysisError::TranscriptionNotFound(_)));
    }
}
