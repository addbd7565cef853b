//! Scripted answer model for tests

use std::collections::VecDeque;
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;

use crate::{AnalysisError, AnswerModel};

/// Answer model returning pre-scripted outcomes in order.
///
/// Once the script runs out, the last outcome repeats. Questions asked are
/// recorded for assertion.
#[derive(Clone, Default)]
pub struct ScriptedAnswerModel {
    script: Arc<Mutex<VecDeque<Result<String, String>>>>,
    questions_asked: Arc<Mutex<Vec<String>>>,
}

impl ScriptedAnswerModel {
    /// Always succeeds with `answer`.
    pub fn always(answer: &str) -> Self {
        let this = Self::default();
        this.push_answer(answer);
        this
    }

    pub fn push_answer(&self, answer: &str) {
        self.script.lock().push_back(Ok(answer.to_string()));
    }

    pub fn push_failure(&self, message: &str) {
        self.script.lock().push_back(Err(message.to_string()));
    }

    pub fn questions_asked(&self) -> Vec<String> {
        self.questions_asked.lock().clone()
    }
}

#[async_trait]
impl AnswerModel for ScriptedAnswerModel {
    async fn answer(&self, _transcript: &str, question: &str) -> Result<String, AnalysisError> {
        self.questions_asked.lock().push(question.to_string());

        let mut script = self.script.lock();
        let outcome = if script.len() > 1 {
            script.pop_front()
        } else {
            script.front().cloned()
        };

        match outcome {
            Some(Ok(answer)) => Ok(answer),
            Some(Err(message)) => Err(AnalysisError::Api { status: 500, message }),
            None => Err(AnalysisError::EmptyResponse),
        }
    }
}
