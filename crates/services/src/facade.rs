//! # Persistence Facade
//!
//! Chooses the local or the remote record store from an explicit [`Session`]
//! and exposes one save/get/delete contract over both.

use std::sync::Arc;

use async_trait::async_trait;
use domains::{Ad, AdId, DocumentStore, KeyValueStore, Result, Session};
use serde::Serialize;
use tokio::task::JoinHandle;
use tracing::warn;

use crate::blob::ImageUploader;
use crate::events::{ErrorEvents, PersistenceEvent};
use crate::local_store::LocalAdStore;
use crate::remote_store::RemoteAdStore;

/// Capability contract shared by both record stores.
#[async_trait]
pub trait AdStore: Send + Sync {
    /// Validates, stamps and persists the record; returns it as stored.
    async fn save(&self, ad: Ad) -> Result<Ad>;
    async fn get(&self, id: &AdId) -> Result<Option<Ad>>;
    async fn list(&self) -> Result<Vec<Ad>>;
    /// Deleting an unknown id succeeds with `removed == false`.
    async fn delete(&self, id: &AdId) -> Result<DeleteReport>;
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ImageCleanupFailure {
    pub url: String,
    pub reason: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DeleteReport {
    pub removed: bool,
    /// Images that could not be removed; the record is gone regardless.
    pub image_failures: Vec<ImageCleanupFailure>,
}

impl DeleteReport {
    pub fn removed() -> Self {
        Self { removed: true, image_failures: Vec::new() }
    }

    pub fn missing() -> Self {
        Self::default()
    }
}

/// Everything a store needs, shared across requests.
#[derive(Clone)]
pub struct Backends {
    pub kv: Arc<dyn KeyValueStore>,
    pub documents: Arc<dyn DocumentStore>,
    pub uploader: ImageUploader,
    pub events: ErrorEvents,
}

/// The store a session resolves to.
#[derive(Clone)]
pub enum AdStoreKind {
    Local(LocalAdStore),
    Remote(RemoteAdStore),
}

impl AdStoreKind {
    pub fn for_session(session: &Session, backends: &Backends) -> Self {
        match session {
            Session::Anonymous { profile } => {
                AdStoreKind::Local(LocalAdStore::new(backends.kv.clone(), profile.clone()))
            }
            Session::Authenticated { user, .. } => AdStoreKind::Remote(RemoteAdStore::new(
                backends.documents.clone(),
                backends.uploader.clone(),
                backends.events.clone(),
                user.clone(),
            )),
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            AdStoreKind::Local(_) => "local",
            AdStoreKind::Remote(_) => "remote",
        }
    }
}

#[async_trait]
impl AdStore for AdStoreKind {
    async fn save(&self, ad: Ad) -> Result<Ad> {
        match self {
            AdStoreKind::Local(store) => store.save(ad).await,
            AdStoreKind::Remote(store) => store.save(ad).await,
        }
    }

    async fn get(&self, id: &AdId) -> Result<Option<Ad>> {
        match self {
            AdStoreKind::Local(store) => store.get(id).await,
            AdStoreKind::Remote(store) => store.get(id).await,
        }
    }

    async fn list(&self) -> Result<Vec<Ad>> {
        match self {
            AdStoreKind::Local(store) => store.list().await,
            AdStoreKind::Remote(store) => store.list().await,
        }
    }

    async fn delete(&self, id: &AdId) -> Result<DeleteReport> {
        match self {
            AdStoreKind::Local(store) => store.delete(id).await,
            AdStoreKind::Remote(store) => store.delete(id).await,
        }
    }
}

/// Session-bound entry point used by the API layer.
pub struct AdFacade {
    store: AdStoreKind,
    events: ErrorEvents,
}

impl AdFacade {
    pub fn new(session: &Session, backends: &Backends) -> Self {
        Self {
            store: AdStoreKind::for_session(session, backends),
            events: backends.events.clone(),
        }
    }

    /// Remote-only facade; an anonymous session is a precondition failure.
    pub fn remote(session: &Session, backends: &Backends) -> Result<Self> {
        session.require_user()?;
        Ok(Self::new(session, backends))
    }

    pub fn store_kind(&self) -> &'static str {
        self.store.label()
    }

    pub async fn save(&self, ad: Ad) -> Result<Ad> {
        self.store.save(ad).await
    }

    pub async fn get(&self, id: &AdId) -> Result<Option<Ad>> {
        self.store.get(id).await
    }

    /// Most recently updated first.
    pub async fn list(&self) -> Result<Vec<Ad>> {
        let mut ads = self.store.list().await?;
        ads.sort_by(|a, b| b.updated_at.cmp(&a.updated_at));
        Ok(ads)
    }

    pub async fn delete(&self, id: &AdId) -> Result<DeleteReport> {
        self.store.delete(id).await
    }

    /// Runs the delete in the background. Failures go to [`ErrorEvents`];
    /// the handle can be awaited for the report or dropped.
    pub fn spawn_delete(&self, id: AdId) -> JoinHandle<Result<DeleteReport>> {
        let store = self.store.clone();
        let events = self.events.clone();
        tokio::spawn(async move {
            let result = store.delete(&id).await;
            if let Err(err) = &result {
                warn!(ad_id = %id, error = %err, "background delete failed");
                events.publish(PersistenceEvent::DeleteFailed {
                    ad_id: id.clone(),
                    reason: err.to_string(),
                });
            }
            result
        })
    }
}
