//! In-process state store
//!
//! Implements every store trait over shared in-memory maps. Used by tests and
//! local runs without a ScyllaDB cluster; semantics (idempotent creates,
//! answer upserts, monotonic transcription status, contiguous question
//! orders) match the Scylla implementations.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use uuid::Uuid;

use callscribe_core::{
    Answer, Call, CallStatus, MoveDirection, PhoneNumber, PhoneNumberStatus, Question, Recording,
    Transcription, TranscriptionStatus,
};

use crate::answers::AnswerStore;
use crate::calls::CallStore;
use crate::error::PersistenceError;
use crate::phone_numbers::PhoneNumberStore;
use crate::questions::QuestionStore;
use crate::recordings::RecordingStore;
use crate::settings_store::SettingsStore;
use crate::transcriptions::TranscriptionStore;

#[derive(Default)]
struct Inner {
    phone_numbers: HashMap<String, PhoneNumber>,
    /// Keyed by call SID
    calls: HashMap<String, Call>,
    /// Keyed by owning call SID (one recording per call)
    recordings: HashMap<String, Recording>,
    transcriptions: HashMap<Uuid, Transcription>,
    questions: Vec<Question>,
    answers: HashMap<(Uuid, Uuid), Answer>,
    settings: HashMap<String, String>,
}

/// In-memory implementation of all state store traits
#[derive(Clone, Default)]
pub struct MemoryStateStore {
    inner: Arc<Mutex<Inner>>,
}

impl MemoryStateStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl PhoneNumberStore for MemoryStateStore {
    async fn touch(&self, number: &str, at: DateTime<Utc>) -> Result<(), PersistenceError> {
        let mut inner = self.inner.lock();
        let entry = inner
            .phone_numbers
            .entry(number.to_string())
            .or_insert_with(|| PhoneNumber::new(number));
        entry.last_called = Some(at);
        entry.call_count += 1;
        Ok(())
    }

    async fn get(&self, number: &str) -> Result<Option<PhoneNumber>, PersistenceError> {
        Ok(self.inner.lock().phone_numbers.get(number).cloned())
    }

    async fn list(&self) -> Result<Vec<PhoneNumber>, PersistenceError> {
        let mut numbers: Vec<PhoneNumber> = self.inner.lock().phone_numbers.values().cloned().collect();
        numbers.sort_by(|a, b| b.last_called.cmp(&a.last_called));
        Ok(numbers)
    }

    async fn set_status(&self, number: &str, status: PhoneNumberStatus) -> Result<(), PersistenceError> {
        if let Some(entry) = self.inner.lock().phone_numbers.get_mut(number) {
            entry.status = status;
        }
        Ok(())
    }
}

#[async_trait]
impl CallStore for MemoryStateStore {
    async fn create_if_absent(&self, call: &Call) -> Result<bool, PersistenceError> {
        let mut inner = self.inner.lock();
        if inner.calls.contains_key(&call.call_sid) {
            return Ok(false);
        }
        inner.calls.insert(call.call_sid.clone(), call.clone());
        Ok(true)
    }

    async fn get(&self, call_sid: &str) -> Result<Option<Call>, PersistenceError> {
        Ok(self.inner.lock().calls.get(call_sid).cloned())
    }

    async fn update_status(
        &self,
        call_sid: &str,
        status: CallStatus,
        duration_secs: Option<i32>,
        end_time: Option<DateTime<Utc>>,
    ) -> Result<(), PersistenceError> {
        let mut inner = self.inner.lock();
        let call = inner
            .calls
            .get_mut(call_sid)
            .ok_or_else(|| PersistenceError::CallNotFound(call_sid.to_string()))?;
        call.status = status;
        if duration_secs.is_some() {
            call.duration_secs = duration_secs;
        }
        if end_time.is_some() {
            call.end_time = end_time;
        }
        Ok(())
    }

    async fn set_duration(&self, call_sid: &str, duration_secs: i32) -> Result<(), PersistenceError> {
        let mut inner = self.inner.lock();
        let call = inner
            .calls
            .get_mut(call_sid)
            .ok_or_else(|| PersistenceError::CallNotFound(call_sid.to_string()))?;
        call.duration_secs = Some(duration_secs);
        Ok(())
    }

    async fn list_recent(&self, limit: i32) -> Result<Vec<Call>, PersistenceError> {
        let mut calls: Vec<Call> = self.inner.lock().calls.values().cloned().collect();
        calls.sort_by(|a, b| b.start_time.cmp(&a.start_time));
        calls.truncate(limit.max(0) as usize);
        Ok(calls)
    }

    async fn list_for_number(&self, number: &str) -> Result<Vec<Call>, PersistenceError> {
        let mut calls: Vec<Call> = self
            .inner
            .lock()
            .calls
            .values()
            .filter(|c| c.phone_number == number)
            .cloned()
            .collect();
        calls.sort_by(|a, b| b.start_time.cmp(&a.start_time));
        Ok(calls)
    }
}

#[async_trait]
impl RecordingStore for MemoryStateStore {
    async fn create_if_absent(&self, recording: &Recording) -> Result<bool, PersistenceError> {
        let mut inner = self.inner.lock();
        if inner.recordings.contains_key(&recording.call_sid) {
            return Ok(false);
        }
        inner
            .recordings
            .insert(recording.call_sid.clone(), recording.clone());
        Ok(true)
    }

    async fn get_by_call(&self, call_sid: &str) -> Result<Option<Recording>, PersistenceError> {
        Ok(self.inner.lock().recordings.get(call_sid).cloned())
    }

    async fn get_by_sid(&self, recording_sid: &str) -> Result<Option<Recording>, PersistenceError> {
        Ok(self
            .inner
            .lock()
            .recordings
            .values()
            .find(|r| r.recording_sid == recording_sid)
            .cloned())
    }

    async fn set_transcription_id(
        &self,
        call_sid: &str,
        transcription_id: Uuid,
    ) -> Result<(), PersistenceError> {
        let mut inner = self.inner.lock();
        let recording = inner
            .recordings
            .get_mut(call_sid)
            .ok_or_else(|| PersistenceError::RecordingNotFound(call_sid.to_string()))?;
        recording.transcription_id = Some(transcription_id);
        Ok(())
    }
}

#[async_trait]
impl TranscriptionStore for MemoryStateStore {
    async fn create(&self, transcription: &Transcription) -> Result<(), PersistenceError> {
        self.inner
            .lock()
            .transcriptions
            .insert(transcription.id, transcription.clone());
        Ok(())
    }

    async fn get(&self, id: Uuid) -> Result<Option<Transcription>, PersistenceError> {
        Ok(self.inner.lock().transcriptions.get(&id).cloned())
    }

    async fn set_status(&self, id: Uuid, status: TranscriptionStatus) -> Result<(), PersistenceError> {
        let mut inner = self.inner.lock();
        let transcription = inner
            .transcriptions
            .get_mut(&id)
            .ok_or_else(|| PersistenceError::TranscriptionNotFound(id.to_string()))?;

        if !transcription.status.can_transition_to(status) {
            return Err(PersistenceError::StatusRegression {
                from: transcription.status,
                to: status,
            });
        }

        transcription.status = status;
        transcription.updated_at = Utc::now();
        Ok(())
    }
}

#[async_trait]
impl QuestionStore for MemoryStateStore {
    async fn list_ordered(&self) -> Result<Vec<Question>, PersistenceError> {
        let mut questions = self.inner.lock().questions.clone();
        questions.sort_by_key(|q| q.display_order);
        Ok(questions)
    }

    async fn get(&self, id: Uuid) -> Result<Option<Question>, PersistenceError> {
        Ok(self.inner.lock().questions.iter().find(|q| q.id == id).cloned())
    }

    async fn create(&self, text: &str) -> Result<Question, PersistenceError> {
        let mut inner = self.inner.lock();
        let next_order = inner
            .questions
            .iter()
            .map(|q| q.display_order + 1)
            .max()
            .unwrap_or(0);
        let question = Question::new(text, next_order);
        inner.questions.push(question.clone());
        Ok(question)
    }

    async fn delete(&self, id: Uuid) -> Result<(), PersistenceError> {
        let mut inner = self.inner.lock();
        let before = inner.questions.len();
        inner.questions.retain(|q| q.id != id);
        if inner.questions.len() == before {
            return Err(PersistenceError::QuestionNotFound(id.to_string()));
        }
        inner.questions.sort_by_key(|q| q.display_order);
        for (index, question) in inner.questions.iter_mut().enumerate() {
            question.display_order = index as i32;
        }
        Ok(())
    }

    async fn move_question(&self, id: Uuid, direction: MoveDirection) -> Result<(), PersistenceError> {
        let mut inner = self.inner.lock();
        inner.questions.sort_by_key(|q| q.display_order);

        let current_index = inner
            .questions
            .iter()
            .position(|q| q.id == id)
            .ok_or_else(|| PersistenceError::QuestionNotFound(id.to_string()))?;

        let target_index = match direction {
            MoveDirection::Up => current_index.checked_sub(1).ok_or(PersistenceError::MoveOutOfRange)?,
            MoveDirection::Down => {
                let next = current_index + 1;
                if next >= inner.questions.len() {
                    return Err(PersistenceError::MoveOutOfRange);
                }
                next
            }
        };

        let current_order = inner.questions[current_index].display_order;
        let target_order = inner.questions[target_index].display_order;
        inner.questions[current_index].display_order = target_order;
        inner.questions[target_index].display_order = current_order;
        Ok(())
    }
}

#[async_trait]
impl AnswerStore for MemoryStateStore {
    async fn upsert(&self, answer: &Answer) -> Result<(), PersistenceError> {
        self.inner
            .lock()
            .answers
            .insert((answer.transcription_id, answer.question_id), answer.clone());
        Ok(())
    }

    async fn list_for_transcription(&self, transcription_id: Uuid) -> Result<Vec<Answer>, PersistenceError> {
        let mut answers: Vec<Answer> = self
            .inner
            .lock()
            .answers
            .values()
            .filter(|a| a.transcription_id == transcription_id)
            .cloned()
            .collect();
        answers.sort_by(|a, b| a.question_id.cmp(&b.question_id));
        Ok(answers)
    }
}

#[async_trait]
impl SettingsStore for MemoryStateStore {
    async fn get(&self, name: &str) -> Result<Option<String>, PersistenceError> {
        Ok(self.inner.lock().settings.get(name).cloned())
    }

    async fn set(&self, name: &str, value: &str) -> Result<(), PersistenceError> {
        self.inner
            .lock()
            .settings
            .insert(name.to_string(), value.to_string());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::StateStore;
    use callscribe_core::CallDirection;

    #[tokio::test]
    async fn test_duplicate_call_creation_absorbed() {
        let store = StateStore::in_memory();
        let call = Call::new("CA123", "+15551234567", CallDirection::Outbound);

        assert!(store.calls.create_if_absent(&call).await.unwrap());
        assert!(!store.calls.create_if_absent(&call).await.unwrap());

        let stored = store.calls.get("CA123").await.unwrap().unwrap();
        assert_eq!(stored.phone_number, "+15551234567");
    }

    #[tokio::test]
    async fn test_phone_number_touch_increments_count() {
        let store = StateStore::in_memory();
        let now = Utc::now();

        store.phone_numbers.touch("+15551234567", now).await.unwrap();
        store.phone_numbers.touch("+15551234567", now).await.unwrap();

        let number = store.phone_numbers.get("+15551234567").await.unwrap().unwrap();
        assert_eq!(number.call_count, 2);
        assert_eq!(number.last_called, Some(now));
    }

    #[tokio::test]
    async fn test_transcription_status_never_regresses() {
        let store = StateStore::in_memory();
        let transcription = Transcription::pending(Uuid::new_v4(), "CA123", "hello");
        store.transcriptions.create(&transcription).await.unwrap();

        store
            .transcriptions
            .set_status(transcription.id, TranscriptionStatus::Completed)
            .await
            .unwrap();

        let err = store
            .transcriptions
            .set_status(transcription.id, TranscriptionStatus::Failed)
            .await
            .unwrap_err();
        assert!(matches!(err, PersistenceError::StatusRegression { .. }));

        let stored = store.transcriptions.get(transcription.id).await.unwrap().unwrap();
        assert_eq!(stored.status, TranscriptionStatus::Completed);
    }

    #[tokio::test]
    async fn test_answer_upsert_overwrites_in_place() {
        let store = StateStore::in_memory();
        let transcription_id = Uuid::new_v4();
        let question_id = Uuid::new_v4();

        store
            .answers
            .upsert(&Answer::new(transcription_id, question_id, "q", "first"))
            .await
            .unwrap();
        store
            .answers
            .upsert(&Answer::new(transcription_id, question_id, "q", "second"))
            .await
            .unwrap();

        let answers = store.answers.list_for_transcription(transcription_id).await.unwrap();
        assert_eq!(answers.len(), 1);
        assert_eq!(answers[0].answer, "second");
    }

    #[tokio::test]
    async fn test_question_create_assigns_dense_orders() {
        let store = StateStore::in_memory();
        for text in ["a", "b", "c"] {
            store.questions.create(text).await.unwrap();
        }

        let questions = store.questions.list_ordered().await.unwrap();
        let orders: Vec<i32> = questions.iter().map(|q| q.display_order).collect();
        assert_eq!(orders, vec![0, 1, 2]);
    }

    #[tokio::test]
    async fn test_move_up_swaps_with_previous() {
        let store = StateStore::in_memory();
        let mut ids = Vec::new();
        for text in ["q0", "q1", "q2", "q3", "q4"] {
            ids.push(store.questions.create(text).await.unwrap().id);
        }

        // Move the question at position 2 up: swaps orders with position 1
        store.questions.move_question(ids[2], MoveDirection::Up).await.unwrap();

        let questions = store.questions.list_ordered().await.unwrap();
        assert_eq!(questions.len(), 5);
        let texts: Vec<&str> = questions.iter().map(|q| q.text.as_str()).collect();
        assert_eq!(texts, vec!["q0", "q2", "q1", "q3", "q4"]);
        let orders: Vec<i32> = questions.iter().map(|q| q.display_order).collect();
        assert_eq!(orders, vec![0, 1, 2, 3, 4]);
    }

    #[tokio::test]
    async fn test_move_past_the_edge_fails() {
        let store = StateStore::in_memory();
        let first = store.questions.create("first").await.unwrap();
        store.questions.create("second").await.unwrap();

        let err = store
            .questions
            .move_question(first.id, MoveDirection::Up)
            .await
            .unwrap_err();
        assert!(matches!(err, PersistenceError::MoveOutOfRange));
    }

    #[tokio::test]
    async fn test_delete_renumbers_and_keeps_answers() {
        let store = StateStore::in_memory();
        let mut ids = Vec::new();
        for text in ["q0", "q1", "q2"] {
            ids.push(store.questions.create(text).await.unwrap().id);
        }

        // Historical answer referencing q1
        let transcription_id = Uuid::new_v4();
        store
            .answers
            .upsert(&Answer::new(transcription_id, ids[1], "q1", "answered"))
            .await
            .unwrap();

        store.questions.delete(ids[1]).await.unwrap();

        let questions = store.questions.list_ordered().await.unwrap();
        let orders: Vec<i32> = questions.iter().map(|q| q.display_order).collect();
        assert_eq!(orders, vec![0, 1]);

        // The answer tied to the deleted question survives
        let answers = store.answers.list_for_transcription(transcription_id).await.unwrap();
        assert_eq!(answers.len(), 1);
        assert_eq!(answers[0].question_text, "q1");
    }
}
