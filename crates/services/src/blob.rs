//! # Blob Uploader
//!
//! Turns embedded `data:` images into permanent URLs and removes stored
//! objects again. Batch uploads are fail-fast: one bad entry abandons the
//! whole batch and the objects it already stored are deleted again, so an
//! image is never dropped without the caller hearing about it.

use std::sync::Arc;

use domains::{
    extension_for, AppError, BlobError, BlobStore, EmbeddedImage, ImageRef, MediaProcessor,
    Result, Session, UserId,
};
use tracing::{debug, info, warn};
use uuid::Uuid;

#[derive(Clone)]
pub struct ImageUploader {
    blobs: Arc<dyn BlobStore>,
    processor: Option<Arc<dyn MediaProcessor>>,
}

/// Outcome of resolving an `images` list.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ResolvedImages {
    /// Same length and order as the input, every entry permanent.
    pub urls: Vec<String>,
    /// URLs created by this call; the rollback set if the enclosing write fails.
    pub created: Vec<String>,
}

impl ImageUploader {
    pub fn new(blobs: Arc<dyn BlobStore>) -> Self {
        Self { blobs, processor: None }
    }

    pub fn with_processor(mut self, processor: Arc<dyn MediaProcessor>) -> Self {
        self.processor = Some(processor);
        self
    }

    /// Uploads one embedded image under the signed-in user's namespace.
    pub async fn upload(&self, session: &Session, embedded: &str) -> Result<String> {
        let user = session.require_user()?;
        self.upload_for(user, embedded).await
    }

    /// Order-preserving batch upload; permanent URLs pass through untouched.
    pub async fn upload_many(&self, session: &Session, images: &[String]) -> Result<Vec<String>> {
        let user = session.require_user()?;
        Ok(self.resolve(user, images).await?.urls)
    }

    /// Deletes one of the user's stored objects by its URL. A missing object
    /// counts as deleted.
    pub async fn delete(&self, session: &Session, url: &str) -> Result<()> {
        let user = session.require_user()?;
        if !self.owned_by(user, url) {
            warn!(user = %user, url = %url, "refusing to delete an image outside the user's namespace");
            return Err(AppError::ValidationError(format!(
                "{url} is not one of your stored images"
            )));
        }
        self.delete_url(url).await
    }

    pub(crate) async fn upload_for(&self, user: &UserId, embedded: &str) -> Result<String> {
        let image = EmbeddedImage::parse(embedded)?;
        let (data, media_type) = match &self.processor {
            Some(processor) => processor.prepare(image.data, image.media_type).await?,
            None => (image.data, image.media_type),
        };
        let path = format!("{}/{}.{}", user, Uuid::new_v4(), extension_for(&media_type));
        let size = data.len();
        let url = self.blobs.put(&path, data, &media_type).await?;
        info!(user = %user, path = %path, size, "image uploaded");
        Ok(url)
    }

    pub(crate) async fn resolve(&self, user: &UserId, images: &[String]) -> Result<ResolvedImages> {
        let mut resolved = ResolvedImages {
            urls: Vec::with_capacity(images.len()),
            created: Vec::new(),
        };
        for (index, raw) in images.iter().enumerate() {
            match ImageRef::classify(raw) {
                ImageRef::Permanent(url) => resolved.urls.push(url.to_string()),
                ImageRef::Unrecognized(_) => {
                    self.discard(&resolved.created).await;
                    return Err(AppError::ValidationError(format!(
                        "image {index} is neither a data URL nor an http(s) URL"
                    )));
                }
                ImageRef::Embedded(data) => match self.upload_for(user, data).await {
                    Ok(url) => {
                        resolved.created.push(url.clone());
                        resolved.urls.push(url);
                    }
                    Err(err) => {
                        warn!(user = %user, index, error = %err, "image upload failed, abandoning batch");
                        self.discard(&resolved.created).await;
                        return Err(AppError::UploadFailed {
                            index,
                            reason: err.to_string(),
                        });
                    }
                },
            }
        }
        Ok(resolved)
    }

    /// Best-effort removal of objects whose enclosing write never happened.
    pub(crate) async fn discard(&self, urls: &[String]) {
        for url in urls {
            if let Err(err) = self.delete_url(url).await {
                warn!(url = %url, error = %err, "orphaned upload could not be removed");
            }
        }
    }

    pub(crate) async fn delete_url(&self, url: &str) -> Result<()> {
        let path = self.blobs.locate(url).ok_or_else(|| {
            AppError::ValidationError(format!("{url} is not a stored image URL"))
        })?;
        match self.blobs.delete(&path).await {
            Ok(()) => {
                info!(path = %path, "image deleted");
                Ok(())
            }
            Err(BlobError::NotFound(_)) => {
                debug!(path = %path, "image already gone");
                Ok(())
            }
            Err(err) => Err(err.into()),
        }
    }

    /// Whether `url` lives in this user's namespace of the blob store.
    pub(crate) fn owned_by(&self, user: &UserId, url: &str) -> bool {
        self.blobs
            .locate(url)
            .is_some_and(|path| path.starts_with(&format!("{user}/")))
    }
}
