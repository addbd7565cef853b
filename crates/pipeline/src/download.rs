//! Recording media download
//!
//! Carrier media URLs require HTTP basic auth with the account SID and auth
//! token. Audio streams into a named temp file that is deleted on drop, so a
//! failure anywhere downstream never leaves stray files behind.

use std::io::Write;
use std::time::Duration;

use async_trait::async_trait;
use futures_util::StreamExt;
use tempfile::NamedTempFile;

use crate::PipelineError;

/// Fetches recording audio into a local temp file
#[async_trait]
pub trait RecordingFetcher: Send + Sync {
    async fn fetch(&self, url: &str) -> Result<NamedTempFile, PipelineError>;
}

/// Fetcher for carrier media URLs
#[derive(Clone)]
pub struct HttpRecordingFetcher {
    client: reqwest::Client,
    account_sid: String,
    auth_token: String,
}

impl HttpRecordingFetcher {
    pub fn new(account_sid: &str, auth_token: &str, timeout: Duration) -> Result<Self, PipelineError> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            account_sid: account_sid.to_string(),
            auth_token: auth_token.to_string(),
        })
    }
}

#[async_trait]
impl RecordingFetcher for HttpRecordingFetcher {
    async fn fetch(&self, url: &str) -> Result<NamedTempFile, PipelineError> {
        let response = self
            .client
            .get(url)
            .basic_auth(&self.account_sid, Some(&self.auth_token))
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(PipelineError::DownloadStatus(response.status().as_u16()));
        }

        let mut file = NamedTempFile::new()?;
        let mut stream = response.bytes_stream();
        let mut bytes = 0u64;
        while let Some(chunk) = stream.next().await {
            let chunk = chunk?;
            bytes += chunk.len() as u64;
            file.as_file_mut().write_all(&chunk)?;
        }
        file.as_file_mut().flush()?;

        tracing::debug!(url = %url, bytes, "Recording downloaded");
        Ok(file)
    }
}
