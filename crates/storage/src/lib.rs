//! Object storage for recording audio
//!
//! Recordings are uploaded once after download from the carrier and then
//! served back to the dashboard, optionally as byte ranges so browser audio
//! players can seek.

pub mod http;
pub mod memory;
pub mod range;

use std::path::Path;

use async_trait::async_trait;
use bytes::Bytes;
use futures_util::stream::BoxStream;
use thiserror::Error;

pub use http::{HttpObjectStore, HttpStorageConfig};
pub use memory::MemoryObjectStore;
pub use range::{content_range, ByteRange};

#[derive(Error, Debug)]
pub enum StorageError {
    #[error("object not found: {0}")]
    NotFound(String),

    #[error("requested range not satisfiable (object is {total_size} bytes)")]
    RangeNotSatisfiable { total_size: u64 },

    #[error("storage request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("storage returned unexpected status {status} for {key}")]
    UnexpectedStatus { status: u16, key: String },

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// An object (or slice of one) fetched from storage.
pub struct FetchedObject {
    /// Body bytes; a slice of the object when `range` is set
    pub stream: BoxStream<'static, Result<Bytes, StorageError>>,
    /// Number of bytes in `stream`
    pub content_length: u64,
    /// The inclusive byte range served, when this is a partial fetch
    pub range: Option<(u64, u64)>,
    /// Full size of the stored object
    pub total_size: u64,
}

impl std::fmt::Debug for FetchedObject {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FetchedObject")
            .field("content_length", &self.content_length)
            .field("range", &self.range)
            .field("total_size", &self.total_size)
            .finish_non_exhaustive()
    }
}

/// Durable store for recording audio blobs
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Upload the file at `path` under `key`, returning the object's URL.
    async fn put(&self, key: &str, path: &Path, content_type: &str) -> Result<String, StorageError>;

    /// Fetch an object, optionally restricted to a byte range.
    async fn get(&self, key: &str, byte_range: Option<ByteRange>) -> Result<FetchedObject, StorageError>;
}
