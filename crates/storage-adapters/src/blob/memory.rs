use async_trait::async_trait;
use bytes::Bytes;
use dashmap::DashMap;
use domains::{BlobError, BlobStore};
use mime::Mime;

use super::{is_safe_path, path_under};

/// Process-local blob store for development and tests.
#[derive(Debug)]
pub struct MemoryBlobStore {
    base_url: String,
    objects: DashMap<String, (Bytes, Mime)>,
}

impl MemoryBlobStore {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            objects: DashMap::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.objects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }

    pub fn get(&self, path: &str) -> Option<(Bytes, Mime)> {
        self.objects.get(path).map(|entry| entry.value().clone())
    }
}

#[async_trait]
impl BlobStore for MemoryBlobStore {
    async fn put(&self, path: &str, data: Bytes, media_type: &Mime) -> Result<String, BlobError> {
        if !is_safe_path(path) {
            return Err(BlobError::Backend(format!("unsafe path {path:?}")));
        }
        self.objects
            .insert(path.to_string(), (data, media_type.clone()));
        Ok(format!("{}/{}", self.base_url, path))
    }

    async fn delete(&self, path: &str) -> Result<(), BlobError> {
        self.objects
            .remove(path)
            .map(|_| ())
            .ok_or_else(|| BlobError::NotFound(path.to_string()))
    }

    fn locate(&self, url: &str) -> Option<String> {
        path_under(&self.base_url, url)
    }
}
