//! LLM analysis of call transcriptions
//!
//! After a recording is transcribed, the question engine walks the configured
//! questions in display order and asks the answer model each one against the
//! transcript, persisting one answer per question. Work arrives through a
//! bounded queue so webhook handlers never wait on the model.

pub mod engine;
pub mod http;
pub mod prompt;
pub mod queue;
pub mod scripted;

use async_trait::async_trait;
use thiserror::Error;
use uuid::Uuid;

use callscribe_persistence::PersistenceError;

pub use engine::QuestionEngine;
pub use http::{AnswerModelConfig, HttpAnswerModel};
pub use prompt::NO_ANSWER_SENTINEL;
pub use queue::AnalysisQueue;
pub use scripted::ScriptedAnswerModel;

#[derive(Error, Debug)]
pub enum AnalysisError {
    #[error("answer model request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("answer model returned status {status}: {message}")]
    Api { status: u16, message: String },

    #[error("answer model returned no choices")]
    EmptyResponse,

    #[error("transcription not found: {0}")]
    TranscriptionNotFound(Uuid),

    #[error(transparent)]
    Persistence(#[from] PersistenceError),

    #[error("analysis queue is full")]
    QueueFull,

    #[error("analysis queue is closed")]
    QueueClosed,
}

/// Answers one question against one transcript
#[async_trait]
pub trait AnswerModel: Send + Sync {
    async fn answer(&self, transcript: &str, question: &str) -> Result<String, AnalysisError>;
}
