//! # Migration Routine
//!
//! Moves a profile's anonymous ads into the signed-in user's collection.
//! The remote write is one all-or-nothing batch; the local copy is cleared
//! only after that batch commits. Any failure leaves local storage as it was
//! and removes the images uploaded during the attempt, so the next sign-in can
//! simply try again. Records are keyed by id, so a retry never duplicates.

use std::sync::Arc;

use chrono::Utc;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use domains::{Ad, ProfileId, Result, Session, UserId};
use serde::Serialize;
use tracing::{error, info, warn};

use crate::facade::{AdStore, Backends};
use crate::local_store::LocalAdStore;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum MigrationOutcome {
    Migrated { count: usize },
    NothingToMigrate,
    /// Another migration for the same profile is in flight.
    AlreadyRunning,
}

pub struct MigrationService {
    backends: Backends,
    in_flight: Arc<DashMap<ProfileId, ()>>,
}

/// Marks a profile as migrating until dropped.
struct InFlight {
    map: Arc<DashMap<ProfileId, ()>>,
    profile: ProfileId,
}

impl InFlight {
    fn acquire(map: &Arc<DashMap<ProfileId, ()>>, profile: &ProfileId) -> Option<Self> {
        match map.entry(profile.clone()) {
            Entry::Occupied(_) => None,
            Entry::Vacant(slot) => {
                slot.insert(());
                Some(Self {
                    map: map.clone(),
                    profile: profile.clone(),
                })
            }
        }
    }
}

impl Drop for InFlight {
    fn drop(&mut self) {
        self.map.remove(&self.profile);
    }
}

impl MigrationService {
    pub fn new(backends: Backends) -> Self {
        Self {
            backends,
            in_flight: Arc::new(DashMap::new()),
        }
    }

    pub fn is_running(&self, profile: &ProfileId) -> bool {
        self.in_flight.contains_key(profile)
    }

    pub async fn migrate(&self, session: &Session) -> Result<MigrationOutcome> {
        let user = session.require_user()?.clone();
        let profile = session.profile().clone();

        let Some(_guard) = InFlight::acquire(&self.in_flight, &profile) else {
            info!(profile = %profile, "migration already running");
            return Ok(MigrationOutcome::AlreadyRunning);
        };

        let local = LocalAdStore::new(self.backends.kv.clone(), profile.clone());
        let records = local.list().await?;
        if records.is_empty() {
            return Ok(MigrationOutcome::NothingToMigrate);
        }

        info!(profile = %profile, user = %user, count = records.len(), "migrating local ads");
        let staged = self.stage(&user, records).await?;
        let uploaded: Vec<String> = staged.iter().flat_map(|(_, created)| created.clone()).collect();
        let ads: Vec<Ad> = staged.into_iter().map(|(ad, _)| ad).collect();

        if let Err(err) = self.backends.documents.commit_batch(&user, &ads).await {
            warn!(profile = %profile, user = %user, error = %err, "migration commit failed, local ads kept");
            self.backends.uploader.discard(&uploaded).await;
            return Err(err);
        }

        if let Err(err) = local.clear().await {
            // Committed remotely; a retry rewrites the same ids.
            error!(profile = %profile, error = %err, "migrated ads could not be cleared locally");
            return Err(err);
        }

        info!(profile = %profile, user = %user, count = ads.len(), "migration complete");
        Ok(MigrationOutcome::Migrated { count: ads.len() })
    }

    /// Uploads every record's images and reshapes it for the remote store.
    /// On failure, everything uploaded so far is discarded.
    async fn stage(&self, user: &UserId, records: Vec<Ad>) -> Result<Vec<(Ad, Vec<String>)>> {
        let now = Utc::now();
        let mut staged: Vec<(Ad, Vec<String>)> = Vec::with_capacity(records.len());

        for mut ad in records {
            match self.backends.uploader.resolve(user, &ad.images).await {
                Ok(resolved) => {
                    ad.images = resolved.urls;
                    ad.user_id = Some(user.clone());
                    ad.touch(now);
                    staged.push((ad, resolved.created));
                }
                Err(err) => {
                    warn!(user = %user, ad_id = %ad.id, error = %err, "migration aborted by image upload");
                    let uploaded: Vec<String> =
                        staged.into_iter().flat_map(|(_, created)| created).collect();
                    self.backends.uploader.discard(&uploaded).await;
                    return Err(err);
                }
            }
        }
        Ok(staged)
    }
}
