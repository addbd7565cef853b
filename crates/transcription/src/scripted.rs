//! Scripted transcriber for tests

use std::collections::VecDeque;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;

use crate::{Transcriber, TranscriptionError};

/// Transcriber returning pre-scripted outcomes in order.
///
/// Once the script runs out, the last outcome repeats.
#[derive(Clone, Default)]
pub struct ScriptedTranscriber {
    script: Arc<Mutex<VecDeque<Result<String, String>>>>,
    calls: Arc<Mutex<Vec<PathBuf>>>,
}

impl ScriptedTranscriber {
    /// Always succeeds with `text`.
    pub fn always(text: &str) -> Self {
        let this = Self::default();
        this.push_text(text);
        this
    }

    /// Always fails with `message`.
    pub fn failing(message: &str) -> Self {
        let this = Self::default();
        this.push_failure(message);
        this
    }

    pub fn push_text(&self, text: &str) {
        self.script.lock().push_back(Ok(text.to_string()));
    }

    pub fn push_failure(&self, message: &str) {
        self.script.lock().push_back(Err(message.to_string()));
    }

    /// Audio paths this transcriber has been asked to transcribe.
    pub fn calls(&self) -> Vec<PathBuf> {
        self.calls.lock().clone()
    }
}

#[async_trait]
impl Transcriber for ScriptedTranscriber {
    async fn transcribe(&self, audio_path: &Path) -> Result<String, TranscriptionError> {
        self.calls.lock().push(audio_path.to_path_buf());

        let mut script = self.script.lock();
        let outcome = if script.len() > 1 {
            script.pop_front()
        } else {
            script.front().cloned()
        };

        match outcome {
            Some(Ok(text)) => Ok(text),
            Some(Err(message)) => Err(TranscriptionError::Api { status: 500, message }),
            None => Ok(String::new()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_script_plays_in_order_then_repeats() {
        let transcriber = ScriptedTranscriber::default();
        transcriber.push_text("first");
        transcriber.push_text("second");

        let path = Path::new("/tmp/a.mp3");
        assert_eq!(transcriber.transcribe(path).await.unwrap(), "first");
        assert_eq!(transcriber.transcribe(path).await.unwrap(), "second");
        assert_eq!(transcriber.transcribe(path).await.unwrap(), "second");
        assert_eq!(transcriber.calls().len(), 3);
    }

    #[tokio::test]
    async fn test_failing_script() {
        let transcriber = ScriptedTranscriber::failing("model overloaded");
        let err = transcriber.transcribe(Path::new("/tmp/a.mp3")).await.unwrap_err();
        assert!(matches!(err, TranscriptionError::Api { status: 500, .. }));
    }
}
