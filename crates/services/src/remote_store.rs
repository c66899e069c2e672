//! # Remote Record Store
//!
//! Ads of a signed-in user, one document per ad id in the user's collection.

use std::collections::HashSet;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use domains::{Ad, AdId, DocumentStore, Result, UserId};
use tracing::{debug, info, warn};

use crate::blob::ImageUploader;
use crate::events::{ErrorEvents, PersistenceEvent};
use crate::facade::{AdStore, DeleteReport, ImageCleanupFailure};

#[derive(Clone)]
pub struct RemoteAdStore {
    documents: Arc<dyn DocumentStore>,
    uploader: ImageUploader,
    events: ErrorEvents,
    user: UserId,
}

impl RemoteAdStore {
    pub fn new(
        documents: Arc<dyn DocumentStore>,
        uploader: ImageUploader,
        events: ErrorEvents,
        user: UserId,
    ) -> Self {
        Self {
            documents,
            uploader,
            events,
            user,
        }
    }

    pub fn user(&self) -> &UserId {
        &self.user
    }

    /// Distinct images of `target` stored in this user's namespace.
    fn owned_images<'a>(&self, target: &'a Ad) -> Vec<&'a String> {
        let mut seen = HashSet::new();
        target
            .images
            .iter()
            .filter(|url| self.uploader.owned_by(&self.user, url))
            .filter(|url| seen.insert(url.as_str()))
            .collect()
    }

    /// Images of `target` that no other record of this user still shows.
    async fn images_safe_to_delete(&self, target: &Ad) -> Result<Vec<String>> {
        let shared: HashSet<String> = self
            .documents
            .list(&self.user)
            .await?
            .into_iter()
            .filter(|ad| ad.id != target.id)
            .flat_map(|ad| ad.images)
            .collect();

        Ok(self
            .owned_images(target)
            .into_iter()
            .filter(|url| !shared.contains(*url))
            .cloned()
            .collect())
    }

    fn cleanup_failed(&self, id: &AdId, url: String, reason: String) -> ImageCleanupFailure {
        self.events.publish(PersistenceEvent::ImageCleanupFailed {
            ad_id: id.clone(),
            url: url.clone(),
            reason: reason.clone(),
        });
        ImageCleanupFailure { url, reason }
    }
}

#[async_trait]
impl AdStore for RemoteAdStore {
    async fn save(&self, ad: Ad) -> Result<Ad> {
        ad.validate()?;
        // Uploads finish before the write so no data URL reaches the document.
        let resolved = self.uploader.resolve(&self.user, &ad.images).await?;

        let existing = match self.documents.get(&self.user, &ad.id).await {
            Ok(existing) => existing,
            Err(err) => {
                self.uploader.discard(&resolved.created).await;
                return Err(err);
            }
        };

        let mut record = ad;
        record.images = resolved.urls;
        record.user_id = Some(self.user.clone());
        if let Some(existing) = existing {
            record.created_at = existing.created_at.or(record.created_at);
            record.updated_at = existing.updated_at.max(record.updated_at);
        }
        record.touch(Utc::now());

        match self.documents.merge(&self.user, &record).await {
            Ok(stored) => {
                info!(user = %self.user, ad_id = %stored.id, uploaded = resolved.created.len(), "ad saved");
                Ok(stored)
            }
            Err(err) => {
                warn!(user = %self.user, ad_id = %record.id, error = %err, "ad write failed");
                self.uploader.discard(&resolved.created).await;
                Err(err)
            }
        }
    }

    async fn get(&self, id: &AdId) -> Result<Option<Ad>> {
        debug!(user = %self.user, ad_id = %id, "remote lookup");
        self.documents.get(&self.user, id).await
    }

    async fn list(&self) -> Result<Vec<Ad>> {
        self.documents.list(&self.user).await
    }

    async fn delete(&self, id: &AdId) -> Result<DeleteReport> {
        let Some(ad) = self.documents.get(&self.user, id).await? else {
            return Ok(DeleteReport::missing());
        };

        let mut failures = Vec::new();
        match self.images_safe_to_delete(&ad).await {
            Ok(urls) => {
                for url in urls {
                    if let Err(err) = self.uploader.delete_url(&url).await {
                        warn!(user = %self.user, ad_id = %id, url = %url, error = %err, "image cleanup failed");
                        failures.push(self.cleanup_failed(id, url, err.to_string()));
                    }
                }
            }
            Err(err) => {
                // Shared images cannot be told apart, so every owned image stays.
                warn!(user = %self.user, ad_id = %id, error = %err, "image cleanup skipped");
                let reason = format!("other records could not be read: {err}");
                for url in self.owned_images(&ad) {
                    failures.push(self.cleanup_failed(id, url.clone(), reason.clone()));
                }
            }
        }

        let removed = self.documents.delete(&self.user, id).await?;
        info!(user = %self.user, ad_id = %id, removed, "ad deleted");
        Ok(DeleteReport {
            removed,
            image_failures: failures,
        })
    }
}
