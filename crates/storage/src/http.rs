//! HTTP object storage backend
//!
//! Talks to an S3-compatible HTTP store: `PUT {base}/{bucket}/{key}` with a
//! bearer token to upload, `GET` with an optional `Range` header to read
//! back. Partial reads surface the remote's `Content-Range` so callers can
//! answer range requests without buffering the object.

use std::path::Path;
use std::time::Duration;

use async_trait::async_trait;
use futures_util::TryStreamExt;
use reqwest::header::{CONTENT_RANGE, RANGE};
use reqwest::StatusCode;

use crate::{ByteRange, FetchedObject, ObjectStore, StorageError};

/// Configuration for the HTTP storage backend
#[derive(Debug, Clone)]
pub struct HttpStorageConfig {
    pub base_url: String,
    pub bucket: String,
    pub api_token: String,
    pub timeout: Duration,
}

/// Object store over an S3-compatible HTTP API
#[derive(Clone)]
pub struct HttpObjectStore {
    client: reqwest::Client,
    config: HttpStorageConfig,
}

impl HttpObjectStore {
    pub fn new(config: HttpStorageConfig) -> Result<Self, StorageError> {
        let client = reqwest::Client::builder().timeout(config.timeout).build()?;
        Ok(Self { client, config })
    }

    fn object_url(&self, key: &str) -> String {
        format!(
            "{}/{}/{}",
            self.config.base_url.trim_end_matches('/'),
            self.config.bucket,
            key
        )
    }
}

#[async_trait]
impl ObjectStore for HttpObjectStore {
    async fn put(&self, key: &str, path: &Path, content_type: &str) -> Result<String, StorageError> {
        let body = tokio::fs::read(path).await?;
        let size = body.len();
        let url = self.object_url(key);

        let response = self
            .client
            .put(&url)
            .bearer_auth(&self.config.api_token)
            .header(reqwest::header::CONTENT_TYPE, content_type)
            .body(body)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(StorageError::UnexpectedStatus {
                status: response.status().as_u16(),
                key: key.to_string(),
            });
        }

        tracing::info!(key = %key, bytes = size, "Recording uploaded");
        Ok(url)
    }

    async fn get(&self, key: &str, byte_range: Option<ByteRange>) -> Result<FetchedObject, StorageError> {
        let mut request = self.client.get(self.object_url(key)).bearer_auth(&self.config.api_token);
        if let Some(range) = byte_range {
            request = request.header(RANGE, range.header_value());
        }

        let response = request.send().await?;

        match response.status() {
            StatusCode::OK => {
                let total_size = response.content_length().unwrap_or(0);
                Ok(FetchedObject {
                    content_length: total_size,
                    range: None,
                    total_size,
                    stream: Box::pin(response.bytes_stream().map_err(StorageError::Request)),
                })
            }
            StatusCode::PARTIAL_CONTENT => {
                let (range, total_size) = response
                    .headers()
                    .get(CONTENT_RANGE)
                    .and_then(|v| v.to_str().ok())
                    .and_then(parse_content_range)
                    .ok_or_else(|| StorageError::UnexpectedStatus {
                        status: 206,
                        key: key.to_string(),
                    })?;
                let (start, end) = range;
                Ok(FetchedObject {
                    content_length: end - start + 1,
                    range: Some(range),
                    total_size,
                    stream: Box::pin(response.bytes_stream().map_err(StorageError::Request)),
                })
            }
            StatusCode::RANGE_NOT_SATISFIABLE => {
                let total_size = response
                    .headers()
                    .get(CONTENT_RANGE)
                    .and_then(|v| v.to_str().ok())
                    .and_then(|v| v.strip_prefix("bytes */"))
                    .and_then(|v| v.parse().ok())
                    .unwrap_or(0);
                Err(StorageError::RangeNotSatisfiable { total_size })
            }
            StatusCode::NOT_FOUND => Err(StorageError::NotFound(key.to_string())),
            status => Err(StorageError::UnexpectedStatus {
                status: status.as_u16(),
                key: key.to_string(),
            }),
        }
    }
}

/// Parse `bytes start-end/total` from a `Content-Range` response header.
fn parse_content_range(value: &str) -> Option<((u64, u64), u64)> {
    let spec = value.strip_prefix("bytes ")?;
    let (range, total) = spec.split_once('/')?;
    let (start, end) = range.split_once('-')?;
    Some(((start.parse().ok()?, end.parse().ok()?), total.parse().ok()?))
}
