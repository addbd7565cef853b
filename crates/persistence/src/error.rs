//! Persistence error types

use callscribe_core::TranscriptionStatus;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum PersistenceError {
    #[error("ScyllaDB connection error: {0}")]
    Connection(String),

    #[error("ScyllaDB query error: {0}")]
    Query(String),

    #[error("Schema creation failed: {0}")]
    SchemaError(String),

    #[error("Invalid data: {0}")]
    InvalidData(String),

    #[error("Call not found: {0}")]
    CallNotFound(String),

    #[error("Recording not found: {0}")]
    RecordingNotFound(String),

    #[error("Transcription not found: {0}")]
    TranscriptionNotFound(String),

    #[error("Question not found: {0}")]
    QuestionNotFound(String),

    #[error("Transcription status may not move from {from} to {to}")]
    StatusRegression {
        from: TranscriptionStatus,
        to: TranscriptionStatus,
    },

    #[error("Cannot move question further")]
    MoveOutOfRange,
}

impl From<scylla::transport::errors::NewSessionError> for PersistenceError {
    fn from(e: scylla::transport::errors::NewSessionError) -> Self {
        PersistenceError::Connection(e.to_string())
    }
}

impl From<scylla::transport::errors::QueryError> for PersistenceError {
    fn from(e: scylla::transport::errors::QueryError) -> Self {
        PersistenceError::Query(e.to_string())
    }
}
