//! Speech-to-text for recorded call audio
//!
//! One trait, two implementations: the OpenAI-compatible HTTP client used in
//! production and a scripted one for tests.

pub mod http;
pub mod scripted;

use std::path::Path;

use async_trait::async_trait;
use thiserror::Error;

pub use http::{HttpTranscriber, TranscriberConfig};
pub use scripted::ScriptedTranscriber;

#[derive(Error, Debug)]
pub enum TranscriptionError {
    #[error("transcription request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("transcription API returned status {status}: {message}")]
    Api { status: u16, message: String },

    #[error("io error reading audio file: {0}")]
    Io(#[from] std::io::Error),
}

/// Converts a recording audio file to text
#[async_trait]
pub trait Transcriber: Send + Sync {
    async fn transcribe(&self, audio_path: &Path) -> Result<String, TranscriptionError>;
}
