//! # Local Record Store
//!
//! Anonymous ads live as one JSON array under a single key per browser
//! profile. Every mutation rewrites the whole list; two tabs writing at the
//! same time can clobber each other, which is an accepted limitation.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use domains::{Ad, AdId, AppError, KeyValueStore, ProfileId, Result};
use tracing::{debug, info};

use crate::facade::{AdStore, DeleteReport};

pub const LOCAL_ADS_KEY: &str = "localAds";

#[derive(Clone)]
pub struct LocalAdStore {
    kv: Arc<dyn KeyValueStore>,
    profile: ProfileId,
}

impl LocalAdStore {
    pub fn new(kv: Arc<dyn KeyValueStore>, profile: ProfileId) -> Self {
        Self { kv, profile }
    }

    fn key(&self) -> String {
        format!("{}:{LOCAL_ADS_KEY}", self.profile)
    }

    async fn load(&self) -> Result<Vec<Ad>> {
        match self.kv.get(&self.key()).await? {
            Some(raw) => serde_json::from_str(&raw).map_err(|e| {
                AppError::Storage(format!("local ads for {} are unreadable: {e}", self.profile))
            }),
            None => Ok(Vec::new()),
        }
    }

    async fn store(&self, ads: &[Ad]) -> Result<()> {
        if ads.is_empty() {
            return self.kv.remove(&self.key()).await;
        }
        let raw = serde_json::to_string(ads)?;
        self.kv.set(&self.key(), raw, None).await
    }

    pub async fn is_empty(&self) -> Result<bool> {
        Ok(self.load().await?.is_empty())
    }

    /// Drops every local record for this profile.
    pub async fn clear(&self) -> Result<()> {
        self.kv.remove(&self.key()).await?;
        info!(profile = %self.profile, "local ads cleared");
        Ok(())
    }
}

#[async_trait]
impl AdStore for LocalAdStore {
    async fn save(&self, mut ad: Ad) -> Result<Ad> {
        ad.validate()?;
        let mut ads = self.load().await?;
        let existing = ads.iter().position(|a| a.id == ad.id);

        if let Some(pos) = existing {
            ad.created_at = ads[pos].created_at.or(ad.created_at);
            ad.updated_at = ads[pos].updated_at.max(ad.updated_at);
        }
        ad.user_id = None;
        ad.touch(Utc::now());

        match existing {
            Some(pos) => ads[pos] = ad.clone(),
            None => ads.push(ad.clone()),
        }
        self.store(&ads).await?;
        info!(profile = %self.profile, ad_id = %ad.id, "ad saved locally");
        Ok(ad)
    }

    async fn get(&self, id: &AdId) -> Result<Option<Ad>> {
        debug!(profile = %self.profile, ad_id = %id, "local lookup");
        Ok(self.load().await?.into_iter().find(|a| &a.id == id))
    }

    async fn list(&self) -> Result<Vec<Ad>> {
        self.load().await
    }

    async fn delete(&self, id: &AdId) -> Result<DeleteReport> {
        let mut ads = self.load().await?;
        let before = ads.len();
        ads.retain(|a| &a.id != id);
        if ads.len() == before {
            return Ok(DeleteReport::missing());
        }
        self.store(&ads).await?;
        info!(profile = %self.profile, ad_id = %id, "local ad deleted");
        Ok(DeleteReport::removed())
    }
}
