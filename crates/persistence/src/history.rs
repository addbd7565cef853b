//! Read-side projections assembled from the individual stores
//!
//! ScyllaDB has no joins, so the dashboard views are stitched together here:
//! recent call history and the per-number drill-down with nested recordings,
//! transcriptions and answers.

use std::collections::HashMap;

use serde::Serialize;
use uuid::Uuid;

use callscribe_core::{Answer, Call, PhoneNumber, Recording, Transcription, TranscriptionStatus};

use crate::{PersistenceError, StateStore};

/// Transcription status surfaced in list views, without the full text
#[derive(Debug, Clone, Serialize)]
pub struct TranscriptionSummary {
    pub id: Uuid,
    pub status: TranscriptionStatus,
}

/// One row of the recent-calls view
#[derive(Debug, Clone, Serialize)]
pub struct CallHistoryEntry {
    #[serde(flatten)]
    pub call: Call,
    /// Lifetime call count for the remote number
    pub call_count: i64,
    pub recording: Option<Recording>,
    pub transcription: Option<TranscriptionSummary>,
}

/// A call with its full recording, transcription and answers
#[derive(Debug, Clone, Serialize)]
pub struct CallDetail {
    #[serde(flatten)]
    pub call: Call,
    pub recording: Option<Recording>,
    pub transcription: Option<Transcription>,
    /// Ordered by the current question order; answers to deleted questions
    /// come last
    pub answers: Vec<Answer>,
}

/// Everything known about one phone number
#[derive(Debug, Clone, Serialize)]
pub struct NumberDetail {
    #[serde(flatten)]
    pub phone_number: PhoneNumber,
    pub calls: Vec<CallDetail>,
}

impl StateStore {
    /// The most recent `limit` calls, newest first, each joined with its
    /// number stats, recording and transcription status.
    pub async fn call_history(&self, limit: i32) -> Result<Vec<CallHistoryEntry>, PersistenceError> {
        let calls = self.calls.list_recent(limit).await?;

        let mut entries = Vec::with_capacity(calls.len());
        for call in calls {
            let call_count = self
                .phone_numbers
                .get(&call.phone_number)
                .await?
                .map(|n| n.call_count)
                .unwrap_or(0);

            let recording = self.recordings.get_by_call(&call.call_sid).await?;
            let transcription = match recording.as_ref().and_then(|r| r.transcription_id) {
                Some(id) => self
                    .transcriptions
                    .get(id)
                    .await?
                    .map(|t| TranscriptionSummary { id: t.id, status: t.status }),
                None => None,
            };

            entries.push(CallHistoryEntry { call, call_count, recording, transcription });
        }

        Ok(entries)
    }

    /// Full drill-down for one number: every call, each with its recording,
    /// transcription and ordered answers. `None` if the number was never seen.
    pub async fn number_detail(&self, number: &str) -> Result<Option<NumberDetail>, PersistenceError> {
        let Some(phone_number) = self.phone_numbers.get(number).await? else {
            return Ok(None);
        };

        let order_by_question: HashMap<Uuid, i32> = self
            .questions
            .list_ordered()
            .await?
            .into_iter()
            .map(|q| (q.id, q.display_order))
            .collect();

        let calls = self.calls.list_for_number(number).await?;
        let mut details = Vec::with_capacity(calls.len());
        for call in calls {
            let recording = self.recordings.get_by_call(&call.call_sid).await?;

            let transcription = match recording.as_ref().and_then(|r| r.transcription_id) {
                Some(id) => self.transcriptions.get(id).await?,
                None => None,
            };

            let mut answers = match transcription.as_ref() {
                Some(t) => self.answers.list_for_transcription(t.id).await?,
                None => Vec::new(),
            };
            answers.sort_by(|a, b| {
                let rank = |answer: &Answer| {
                    order_by_question
                        .get(&answer.question_id)
                        .copied()
                        .unwrap_or(i32::MAX)
                };
                rank(a).cmp(&rank(b)).then_with(|| a.question_text.cmp(&b.question_text))
            });

            details.push(CallDetail { call, recording, transcription, answers });
        }

        Ok(Some(NumberDetail { phone_number, calls: details }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use callscribe_core::CallDirection;
    use chrono::Utc;

    #[tokio::test]
    async fn test_call_history_joins_recording_and_status() {
        let store = StateStore::in_memory();

        store.phone_numbers.touch("+15551234567", Utc::now()).await.unwrap();
        let call = Call::new("CA1", "+15551234567", CallDirection::Outbound);
        store.calls.create_if_absent(&call).await.unwrap();

        let recording = Recording::new("CA1", "RE1", "https://store/call-recordings/RE1.mp3", 2048, 30);
        store.recordings.create_if_absent(&recording).await.unwrap();

        let transcription = Transcription::pending(recording.id, "CA1", "hello");
        store.transcriptions.create(&transcription).await.unwrap();
        store
            .recordings
            .set_transcription_id("CA1", transcription.id)
            .await
            .unwrap();

        let history = store.call_history(50).await.unwrap();
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].call_count, 1);
        assert_eq!(
            history[0].transcription.as_ref().unwrap().status,
            TranscriptionStatus::Pending
        );
    }

    #[tokio::test]
    async fn test_number_detail_orders_answers_by_question_order() {
        let store = StateStore::in_memory();

        store.phone_numbers.touch("+15551234567", Utc::now()).await.unwrap();
        let call = Call::new("CA1", "+15551234567", CallDirection::Inbound);
        store.calls.create_if_absent(&call).await.unwrap();

        let recording = Recording::new("CA1", "RE1", "https://store/call-recordings/RE1.mp3", 2048, 30);
        store.recordings.create_if_absent(&recording).await.unwrap();
        let transcription = Transcription::pending(recording.id, "CA1", "hello");
        store.transcriptions.create(&transcription).await.unwrap();
        store
            .recordings
            .set_transcription_id("CA1", transcription.id)
            .await
            .unwrap();

        let q0 = store.questions.create("first question").await.unwrap();
        let q1 = store.questions.create("second question").await.unwrap();

        // Persist out of order
        store
            .answers
            .upsert(&Answer::new(transcription.id, q1.id, &q1.text, "b"))
            .await
            .unwrap();
        store
            .answers
            .upsert(&Answer::new(transcription.id, q0.id, &q0.text, "a"))
            .await
            .unwrap();

        let detail = store.number_detail("+15551234567").await.unwrap().unwrap();
        assert_eq!(detail.calls.len(), 1);
        let answers = &detail.calls[0].answers;
        assert_eq!(answers.len(), 2);
        assert_eq!(answers[0].question_text, "first question");
        assert_eq!(answers[1].question_text, "second question");
    }

    #[tokio::test]
    async fn test_number_detail_unknown_number() {
        let store = StateStore::in_memory();
        assert!(store.number_detail("+19999999999").await.unwrap().is_none());
    }
}
