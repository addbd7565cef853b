//! Recording and transcription entities

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A persisted call recording.
///
/// A Recording exists only after the audio has been durably uploaded to the
/// object store; a call whose download or upload failed never gets one.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Recording {
    pub id: Uuid,
    /// Owning call (one recording per call)
    pub call_sid: String,
    /// Carrier-assigned recording identifier
    pub recording_sid: String,
    /// Object-store location of the audio blob
    pub file_url: String,
    pub file_size: i64,
    pub duration_secs: i32,
    /// Set once the transcription row exists
    pub transcription_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
}

impl Recording {
    pub fn new(
        call_sid: impl Into<String>,
        recording_sid: impl Into<String>,
        file_url: impl Into<String>,
        file_size: i64,
        duration_secs: i32,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            call_sid: call_sid.into(),
            recording_sid: recording_sid.into(),
            file_url: file_url.into(),
            file_size,
            duration_secs,
            transcription_id: None,
            created_at: Utc::now(),
        }
    }
}

/// Transcription status
///
/// The lifecycle is monotonic: PENDING moves to exactly one of COMPLETED or
/// FAILED and never regresses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum TranscriptionStatus {
    Pending,
    Completed,
    Failed,
}

impl TranscriptionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TranscriptionStatus::Pending => "PENDING",
            TranscriptionStatus::Completed => "COMPLETED",
            TranscriptionStatus::Failed => "FAILED",
        }
    }

    /// Whether moving from `self` to `next` respects the monotonic lifecycle.
    pub fn can_transition_to(&self, next: TranscriptionStatus) -> bool {
        match self {
            TranscriptionStatus::Pending => next != TranscriptionStatus::Pending,
            // Terminal states accept nothing further
            TranscriptionStatus::Completed | TranscriptionStatus::Failed => false,
        }
    }
}

impl fmt::Display for TranscriptionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TranscriptionStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "PENDING" => Ok(TranscriptionStatus::Pending),
            "COMPLETED" => Ok(TranscriptionStatus::Completed),
            "FAILED" => Ok(TranscriptionStatus::Failed),
            other => Err(format!("unknown transcription status: {other}")),
        }
    }
}

/// Transcript of one recording, one-to-one with Recording.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Transcription {
    pub id: Uuid,
    pub recording_id: Uuid,
    pub call_sid: String,
    /// Empty when the speech-to-text call failed
    pub text: String,
    pub status: TranscriptionStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Transcription {
    pub fn pending(recording_id: Uuid, call_sid: impl Into<String>, text: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            recording_id,
            call_sid: call_sid.into(),
            text: text.into(),
            status: TranscriptionStatus::Pending,
            created_at: now,
            updated_at: now,
        }
    }

    /// A transcription row recording a speech-to-text failure: empty text,
    /// FAILED from the start, so the failure is observable.
    pub fn failed(recording_id: Uuid, call_sid: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            recording_id,
            call_sid: call_sid.into(),
            text: String::new(),
            status: TranscriptionStatus::Failed,
            created_at: now,
            updated_at: now,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_is_monotonic() {
        let pending = TranscriptionStatus::Pending;
        assert!(pending.can_transition_to(TranscriptionStatus::Completed));
        assert!(pending.can_transition_to(TranscriptionStatus::Failed));
        assert!(!pending.can_transition_to(TranscriptionStatus::Pending));

        assert!(!TranscriptionStatus::Completed.can_transition_to(TranscriptionStatus::Pending));
        assert!(!TranscriptionStatus::Completed.can_transition_to(TranscriptionStatus::Failed));
        assert!(!TranscriptionStatus::Failed.can_transition_to(TranscriptionStatus::Completed));
    }

    #[test]
    fn test_failed_transcription_has_empty_text() {
        let t = Transcription::failed(Uuid::new_v4(), "CA123");
        assert_eq!(t.status, TranscriptionStatus::Failed);
        assert!(t.text.is_empty());
    }

    #[test]
    fn test_status_parse() {
        assert_eq!("pending".parse::<TranscriptionStatus>().unwrap(), TranscriptionStatus::Pending);
        assert!("bogus".parse::<TranscriptionStatus>().is_err());
    }
}
