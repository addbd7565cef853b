//! OpenAI-compatible speech-to-text client
//!
//! Posts the audio file as multipart form data to `/audio/transcriptions`
//! and reads back `{"text": "..."}`.

use std::path::Path;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::multipart;
use serde::Deserialize;

use crate::{Transcriber, TranscriptionError};

/// Configuration for the HTTP transcriber
#[derive(Debug, Clone)]
pub struct TranscriberConfig {
    pub base_url: String,
    pub api_key: String,
    pub model: String,
    pub timeout: Duration,
}

/// Speech-to-text over an OpenAI-compatible audio API
#[derive(Clone)]
pub struct HttpTranscriber {
    client: reqwest::Client,
    config: TranscriberConfig,
}

#[derive(Deserialize)]
struct TranscriptionResponse {
    text: String,
}

impl HttpTranscriber {
    pub fn new(config: TranscriberConfig) -> Result<Self, TranscriptionError> {
        let client = reqwest::Client::builder().timeout(config.timeout).build()?;
        Ok(Self { client, config })
    }
}

#[async_trait]
impl Transcriber for HttpTranscriber {
    async fn transcribe(&self, audio_path: &Path) -> Result<String, TranscriptionError> {
        let audio = tokio::fs::read(audio_path).await?;
        let file_name = audio_path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "recording.mp3".to_string());

        let form = multipart::Form::new()
            .part(
                "file",
                multipart::Part::bytes(audio)
                    .file_name(file_name)
                    .mime_str("audio/mpeg")?,
            )
            .text("model", self.config.model.clone());

        let url = format!("{}/audio/transcriptions", self.config.base_url.trim_end_matches('/'));
        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.config.api_key)
            .multipart(form)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(TranscriptionError::Api {
                status: status.as_u16(),
                message,
            });
        }

        let body: TranscriptionResponse = response.json().await?;
        tracing::debug!(chars = body.text.len(), "Transcription received");
        Ok(body.text)
    }
}
