//! # Local filesystem blob store
//!
//! Objects live at `<root>/<user>/<name>`. Retrieval URLs point at this
//! process's `/media` route and carry an HMAC signature of the path.

use std::io::ErrorKind;
use std::path::PathBuf;

use async_trait::async_trait;
use bytes::Bytes;
use domains::{BlobError, BlobStore};
use mime::Mime;
use tokio::fs;
use tracing::debug;

use super::{is_safe_path, path_under};
use crate::signing::UrlSigner;

pub const MEDIA_ROUTE: &str = "media";

pub struct LocalBlobStore {
    /// Root directory for all uploads (e.g., "./data/uploads")
    root_path: PathBuf,
    /// Public origin of this service (e.g., "https://ads.example.com")
    public_base: String,
    signer: UrlSigner,
}

impl LocalBlobStore {
    pub fn new(root: PathBuf, public_base: impl Into<String>, signer: UrlSigner) -> Self {
        Self {
            root_path: root,
            public_base: public_base.into().trim_end_matches('/').to_string(),
            signer,
        }
    }

    fn media_base(&self) -> String {
        format!("{}/{MEDIA_ROUTE}", self.public_base)
    }

    fn file_path(&self, path: &str) -> Result<PathBuf, BlobError> {
        if !is_safe_path(path) {
            return Err(BlobError::Backend(format!("unsafe path {path:?}")));
        }
        Ok(self.root_path.join(path))
    }

    /// The signed retrieval URL for a stored path.
    pub fn url_for(&self, path: &str) -> String {
        format!("{}/{}?sig={}", self.media_base(), path, self.signer.sign(path))
    }

    pub fn signer(&self) -> &UrlSigner {
        &self.signer
    }

    /// Reads a stored object for serving, with a media type guessed from its name.
    pub async fn read(&self, path: &str) -> Result<(Bytes, Mime), BlobError> {
        let file = self.file_path(path)?;
        match fs::read(&file).await {
            Ok(data) => {
                let media_type = mime_guess::from_path(&file).first_or_octet_stream();
                Ok((Bytes::from(data), media_type))
            }
            Err(e) if e.kind() == ErrorKind::NotFound => Err(BlobError::NotFound(path.to_string())),
            Err(e) => Err(BlobError::Backend(e.to_string())),
        }
    }
}

#[async_trait]
impl BlobStore for LocalBlobStore {
    async fn put(&self, path: &str, data: Bytes, _media_type: &Mime) -> Result<String, BlobError> {
        let target = self.file_path(path)?;
        if let Some(parent) = target.parent() {
            fs::create_dir_all(parent)
                .await
                .map_err(|e| BlobError::Backend(e.to_string()))?;
        }
        fs::write(&target, &data)
            .await
            .map_err(|e| BlobError::Backend(e.to_string()))?;
        debug!(path = %path, size = data.len(), "blob written");
        Ok(self.url_for(path))
    }

    async fn delete(&self, path: &str) -> Result<(), BlobError> {
        let target = self.file_path(path)?;
        match fs::remove_file(&target).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Err(BlobError::NotFound(path.to_string())),
            Err(e) => Err(BlobError::Backend(e.to_string())),
        }
    }

    fn locate(&self, url: &str) -> Option<String> {
        path_under(&self.media_base(), url)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store(dir: &tempfile::TempDir) -> LocalBlobStore {
        LocalBlobStore::new(
            dir.path().to_path_buf(),
            "https://ads.test/",
            UrlSigner::new("k"),
        )
    }

    #[tokio::test]
    async fn test_put_read_delete() {
        let dir = tempfile::tempdir().unwrap();
        let store = store(&dir);
        let url = store
            .put("u1/a.png", Bytes::from_static(b"png"), &mime::IMAGE_PNG)
            .await
            .unwrap();
        assert!(url.starts_with("https://ads.test/media/u1/a.png?sig="));
        assert_eq!(store.locate(&url).as_deref(), Some("u1/a.png"));

        let (data, media_type) = store.read("u1/a.png").await.unwrap();
        assert_eq!(&data[..], b"png");
        assert_eq!(media_type, mime::IMAGE_PNG);

        store.delete("u1/a.png").await.unwrap();
        assert_eq!(
            store.delete("u1/a.png").await,
            Err(BlobError::NotFound("u1/a.png".into()))
        );
    }

    #[tokio::test]
    async fn test_rejects_traversal() {
        let dir = tempfile::tempdir().unwrap();
        let store = store(&dir);
        let err = store
            .put("../escape.png", Bytes::from_static(b"x"), &mime::IMAGE_PNG)
            .await
            .unwrap_err();
        assert!(matches!(err, BlobError::Backend(_)));
        assert_eq!(store.locate("https://ads.test/media/../x"), None);
    }
}
