//! Analysis questions and their per-transcription answers

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Direction for the question "move" operation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MoveDirection {
    Up,
    Down,
}

/// A configured analysis question.
///
/// `display_order` is a dense integer defining both presentation order and the
/// sequence the question engine walks. Orders stay contiguous: moving a
/// question swaps two orders atomically, deleting one renumbers the rest.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Question {
    pub id: Uuid,
    pub text: String,
    pub display_order: i32,
}

impl Question {
    pub fn new(text: impl Into<String>, display_order: i32) -> Self {
        Self {
            id: Uuid::new_v4(),
            text: text.into(),
            display_order,
        }
    }
}

/// One answer per (question, transcription) pair.
///
/// The pair is the identity: re-running analysis overwrites in place rather
/// than inserting a duplicate. `question_text` is denormalized so historical
/// answers survive question deletion.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Answer {
    pub transcription_id: Uuid,
    pub question_id: Uuid,
    pub question_text: String,
    pub answer: String,
    pub created_at: DateTime<Utc>,
}

impl Answer {
    pub fn new(
        transcription_id: Uuid,
        question_id: Uuid,
        question_text: impl Into<String>,
        answer: impl Into<String>,
    ) -> Self {
        Self {
            transcription_id,
            question_id,
            question_text: question_text.into(),
            answer: answer.into(),
            created_at: Utc::now(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_answer_carries_question_text() {
        let q = Question::new("What price was quoted?", 0);
        let a = Answer::new(Uuid::new_v4(), q.id, &q.text, "$50/month");
        assert_eq!(a.question_text, "What price was quoted?");
        assert_eq!(a.question_id, q.id);
    }
}
