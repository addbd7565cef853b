//! The recording-to-insight pipeline
//!
//! Carrier webhooks feed events in; the pipeline tracks call state, and when
//! a recording callback arrives it downloads the audio, uploads it to object
//! storage, transcribes it and queues the transcription for question
//! analysis.

pub mod download;
pub mod error;
pub mod events;
pub mod orchestrator;

pub use download::{HttpRecordingFetcher, RecordingFetcher};
pub use error::PipelineError;
pub use events::{CallEvent, CallStatusEvent, RecordingEvent};
pub use orchestrator::Pipeline;
