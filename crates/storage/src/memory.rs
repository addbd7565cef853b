//! In-memory object store for tests and local runs

use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use futures_util::stream;
use parking_lot::Mutex;

use crate::{ByteRange, FetchedObject, ObjectStore, StorageError};

/// Object store over a shared in-memory map
#[derive(Clone, Default)]
pub struct MemoryObjectStore {
    objects: Arc<Mutex<HashMap<String, Bytes>>>,
}

impl MemoryObjectStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed an object directly, bypassing the filesystem.
    pub fn insert(&self, key: &str, bytes: impl Into<Bytes>) {
        self.objects.lock().insert(key.to_string(), bytes.into());
    }

    pub fn contains(&self, key: &str) -> bool {
        self.objects.lock().contains_key(key)
    }

    pub fn size_of(&self, key: &str) -> Option<u64> {
        self.objects.lock().get(key).map(|b| b.len() as u64)
    }
}

#[async_trait]
impl ObjectStore for MemoryObjectStore {
    async fn put(&self, key: &str, path: &Path, _content_type: &str) -> Result<String, StorageError> {
        let body = tokio::fs::read(path).await?;
        self.objects.lock().insert(key.to_string(), Bytes::from(body));
        Ok(format!("memory://{key}"))
    }

    async fn get(&self, key: &str, byte_range: Option<ByteRange>) -> Result<FetchedObject, StorageError> {
        let object = self
            .objects
            .lock()
            .get(key)
            .cloned()
            .ok_or_else(|| StorageError::NotFound(key.to_string()))?;
        let total_size = object.len() as u64;

        let (body, range) = match byte_range {
            Some(requested) => {
                let (start, end) = requested
                    .resolve(total_size)
                    .ok_or(StorageError::RangeNotSatisfiable { total_size })?;
                (object.slice(start as usize..=end as usize), Some((start, end)))
            }
            None => (object, None),
        };

        Ok(FetchedObject {
            content_length: body.len() as u64,
            range,
            total_size,
            stream: Box::pin(stream::once(async move { Ok(body) })),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures_util::TryStreamExt;

    async fn collect(fetched: FetchedObject) -> Vec<u8> {
        let chunks: Vec<Bytes> = fetched.stream.try_collect().await.unwrap();
        chunks.concat()
    }

    #[tokio::test]
    async fn test_full_fetch() {
        let store = MemoryObjectStore::new();
        store.insert("recordings/RE1.mp3", vec![7u8; 1000]);

        let fetched = store.get("recordings/RE1.mp3", None).await.unwrap();
        assert_eq!(fetched.content_length, 1000);
        assert_eq!(fetched.total_size, 1000);
        assert!(fetched.range.is_none());
        assert_eq!(collect(fetched).await.len(), 1000);
    }

    #[tokio::test]
    async fn test_range_fetch_serves_exact_slice() {
        let store = MemoryObjectStore::new();
        let body: Vec<u8> = (0..=255).cycle().take(1000).map(|b| b as u8).collect();
        store.insert("recordings/RE1.mp3", body.clone());

        let range = ByteRange::parse("bytes=100-199").unwrap();
        let fetched = store.get("recordings/RE1.mp3", Some(range)).await.unwrap();
        assert_eq!(fetched.content_length, 100);
        assert_eq!(fetched.range, Some((100, 199)));
        assert_eq!(fetched.total_size, 1000);
        assert_eq!(collect(fetched).await, body[100..200].to_vec());
    }

    #[tokio::test]
    async fn test_unsatisfiable_range() {
        let store = MemoryObjectStore::new();
        store.insert("recordings/RE1.mp3", vec![0u8; 100]);

        let range = ByteRange::parse("bytes=100-").unwrap();
        let err = store.get("recordings/RE1.mp3", Some(range)).await.unwrap_err();
        assert!(matches!(err, StorageError::RangeNotSatisfiable { total_size: 100 }));
    }

    #[tokio::test]
    async fn test_missing_object() {
        let store = MemoryObjectStore::new();
        let err = store.get("recordings/missing.mp3", None).await.unwrap_err();
        assert!(matches!(err, StorageError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_put_reads_from_disk() {
        let store = MemoryObjectStore::new();
        let file = tempfile::NamedTempFile::new().unwrap();
        std::fs::write(file.path(), b"audio bytes").unwrap();

        let url = store.put("recordings/RE1.mp3", file.path(), "audio/mpeg").await.unwrap();
        assert_eq!(url, "memory://recordings/RE1.mp3");
        assert_eq!(store.size_of("recordings/RE1.mp3"), Some(11));
    }
}
