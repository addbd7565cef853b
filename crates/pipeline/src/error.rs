//! Pipeline error types

use thiserror::Error;

use callscribe_persistence::PersistenceError;
use callscribe_storage::StorageError;

#[derive(Error, Debug)]
pub enum PipelineError {
    /// A webhook referenced a call SID this system never tracked
    #[error("unknown call: {0}")]
    UnknownCall(String),

    #[error("recording download failed: {0}")]
    Download(String),

    #[error("recording download returned status {0}")]
    DownloadStatus(u16),

    #[error(transparent)]
    Storage(#[from] StorageError),

    #[error(transparent)]
    Persistence(#[from] PersistenceError),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<reqwest::Error> for PipelineError {
    fn from(e: reqwest::Error) -> Self {
        PipelineError::Download(e.to_string())
    }
}
