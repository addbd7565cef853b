//! Bounded analysis work queue
//!
//! Webhook handlers enqueue a transcription id and return immediately; a
//! single worker drains the queue and runs the question engine. Failures are
//! already recorded on the transcription row by the engine, so the worker
//! only logs them.

use metrics::gauge;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use uuid::Uuid;

use crate::{AnalysisError, QuestionEngine};

/// Handle for submitting transcriptions to the analysis worker
#[derive(Clone)]
pub struct AnalysisQueue {
    tx: mpsc::Sender<Uuid>,
}

impl AnalysisQueue {
    /// Spawn the worker and return the submission handle.
    pub fn start(engine: QuestionEngine, depth: usize) -> (Self, JoinHandle<()>) {
        let (tx, mut rx) = mpsc::channel::<Uuid>(depth);

        let handle = tokio::spawn(async move {
            while let Some(transcription_id) = rx.recv().await {
                gauge!("analysis_queue_depth").decrement(1.0);
                if let Err(e) = engine.analyze(transcription_id).await {
                    tracing::error!(
                        transcription_id = %transcription_id,
                        error = %e,
                        "Analysis run failed"
                    );
                }
            }
            tracing::info!("Analysis worker stopped");
        });

        (Self { tx }, handle)
    }

    /// Enqueue without waiting; a full queue is reported, not blocked on.
    pub fn enqueue(&self, transcription_id: Uuid) -> Result<(), AnalysisError> {
        match self.tx.try_send(transcription_id) {
            Ok(()) => {
                gauge!("analysis_queue_depth").increment(1.0);
                Ok(())
            }
            Err(mpsc::error::TrySendError::Full(_)) => Err(AnalysisError::QueueFull),
            Err(mpsc::error::TrySendError::Closed(_)) => Err(AnalysisError::QueueClosed),
        }
    }
}
