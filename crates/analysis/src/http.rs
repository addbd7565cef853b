//! OpenAI-compatible chat completion client for question answering

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::prompt;
use crate::{AnalysisError, AnswerModel};

/// Configuration for the HTTP answer model
#[derive(Debug, Clone)]
pub struct AnswerModelConfig {
    pub base_url: String,
    pub api_key: String,
    pub model: String,
    pub timeout: Duration,
}

/// Answer model over an OpenAI-compatible chat completion API
#[derive(Clone)]
pub struct HttpAnswerModel {
    client: reqwest::Client,
    config: AnswerModelConfig,
}

#[derive(Serialize)]
struct ChatMessage {
    role: &'static str,
    content: String,
}

#[derive(Serialize)]
struct ChatRequest {
    model: String,
    messages: Vec<ChatMessage>,
    temperature: f32,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatResponseMessage,
}

#[derive(Deserialize)]
struct ChatResponseMessage {
    content: String,
}

impl HttpAnswerModel {
    pub fn new(config: AnswerModelConfig) -> Result<Self, AnalysisError> {
        let client = reqwest::Client::builder().timeout(config.timeout).build()?;
        Ok(Self { client, config })
    }
}

#[async_trait]
impl AnswerModel for HttpAnswerModel {
    async fn answer(&self, transcript: &str, question: &str) -> Result<String, AnalysisError> {
        let request = ChatRequest {
            model: self.config.model.clone(),
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: prompt::system_prompt(),
                },
                ChatMessage {
                    role: "user",
                    content: prompt::user_prompt(transcript, question),
                },
            ],
            temperature: 0.0,
        };

        let url = format!("{}/chat/completions", self.config.base_url.trim_end_matches('/'));
        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.config.api_key)
            .json(&request)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(AnalysisError::Api {
                status: status.as_u16(),
                message,
            });
        }

        let body: ChatResponse = response.json().await?;
        let answer = body
            .choices
            .into_iter()
            .next()
            .ok_or(AnalysisError::EmptyResponse)?
            .message
            .content;

        Ok(answer.trim().to_string())
    }
}
