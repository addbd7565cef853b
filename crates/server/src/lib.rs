//! HTTP surface for the callscribe backend
//!
//! Carrier webhooks on one side, the dashboard REST API on the other, both
//! over the same axum router.

pub mod http;
pub mod markup;
pub mod metrics;
pub mod state;
pub mod webhooks;

use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use thiserror::Error;

use callscribe_analysis::AnalysisError;
use callscribe_persistence::PersistenceError;
use callscribe_pipeline::PipelineError;
use callscribe_storage::StorageError;

pub use state::AppState;

#[derive(Error, Debug)]
pub enum ServerError {
    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    BadRequest(String),

    #[error(transparent)]
    Pipeline(#[from] PipelineError),

    #[error(transparent)]
    Persistence(#[from] PersistenceError),

    #[error(transparent)]
    Storage(#[from] StorageError),

    #[error(transparent)]
    Analysis(#[from] AnalysisError),
}

impl ServerError {
    fn status(&self) -> StatusCode {
        match self {
            ServerError::NotFound(_) => StatusCode::NOT_FOUND,
            ServerError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ServerError::Pipeline(PipelineError::UnknownCall(_)) => StatusCode::NOT_FOUND,
            ServerError::Pipeline(_) => StatusCode::INTERNAL_SERVER_ERROR,
            ServerError::Persistence(e) => match e {
                PersistenceError::CallNotFound(_)
                | PersistenceError::RecordingNotFound(_)
                | PersistenceError::TranscriptionNotFound(_)
                | PersistenceError::QuestionNotFound(_) => StatusCode::NOT_FOUND,
                PersistenceError::MoveOutOfRange => StatusCode::BAD_REQUEST,
                PersistenceError::StatusRegression { .. } => StatusCode::CONFLICT,
                _ => StatusCode::INTERNAL_SERVER_ERROR,
            },
            ServerError::Storage(StorageError::NotFound(_)) => StatusCode::NOT_FOUND,
            ServerError::Storage(StorageError::RangeNotSatisfiable { .. }) => {
                StatusCode::RANGE_NOT_SATISFIABLE
            }
            ServerError::Storage(_) => StatusCode::INTERNAL_SERVER_ERROR,
            ServerError::Analysis(AnalysisError::QueueFull) => StatusCode::SERVICE_UNAVAILABLE,
            ServerError::Analysis(AnalysisError::TranscriptionNotFound(_)) => StatusCode::NOT_FOUND,
            ServerError::Analysis(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ServerError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!(error = %self, "Request failed");
        }

        // An unsatisfiable range answers with the object's actual size
        if let ServerError::Storage(StorageError::RangeNotSatisfiable { total_size }) = &self {
            return (
                status,
                [(header::CONTENT_RANGE, format!("bytes */{total_size}"))],
                Json(json!({ "error": self.to_string() })),
            )
                .into_response();
        }

        (status, Json(json!({ "error": self.to_string() }))).into_response()
    }
}
