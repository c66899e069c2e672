use std::collections::BTreeMap;

use async_trait::async_trait;
use dashmap::DashMap;
use domains::{Ad, AdId, AppError, DocumentStore, Result, UserId};
use serde_json::Value;

use super::merge_fields;

/// Process-local document store. One shard entry per user, so a batch for a
/// user is applied under a single lock.
#[derive(Debug, Default)]
pub struct MemoryDocumentStore {
    collections: DashMap<UserId, BTreeMap<String, Value>>,
}

impl MemoryDocumentStore {
    pub fn new() -> Self {
        Self::default()
    }
}

fn decode(doc: &Value) -> Result<Ad> {
    serde_json::from_value(doc.clone())
        .map_err(|e| AppError::Storage(format!("stored ad is unreadable: {e}")))
}

#[async_trait]
impl DocumentStore for MemoryDocumentStore {
    async fn get(&self, user: &UserId, id: &AdId) -> Result<Option<Ad>> {
        match self.collections.get(user) {
            Some(docs) => docs.get(id.as_str()).map(decode).transpose(),
            None => Ok(None),
        }
    }

    async fn list(&self, user: &UserId) -> Result<Vec<Ad>> {
        match self.collections.get(user) {
            Some(docs) => docs.values().map(decode).collect(),
            None => Ok(Vec::new()),
        }
    }

    async fn merge(&self, user: &UserId, ad: &Ad) -> Result<Ad> {
        let patch = serde_json::to_value(ad)?;
        let mut docs = self.collections.entry(user.clone()).or_default();
        let stored = docs
            .entry(ad.id.as_str().to_string())
            .or_insert_with(|| Value::Object(Default::default()));
        merge_fields(stored, patch);
        decode(stored)
    }

    async fn delete(&self, user: &UserId, id: &AdId) -> Result<bool> {
        Ok(self
            .collections
            .get_mut(user)
            .is_some_and(|mut docs| docs.remove(id.as_str()).is_some()))
    }

    async fn commit_batch(&self, user: &UserId, ads: &[Ad]) -> Result<()> {
        // Encode everything first so a bad record leaves the collection untouched.
        let encoded = ads
            .iter()
            .map(|ad| -> Result<(String, Value)> {
                Ok((ad.id.as_str().to_string(), serde_json::to_value(ad)?))
            })
            .collect::<Result<Vec<_>>>()?;
        let mut docs = self.collections.entry(user.clone()).or_default();
        docs.extend(encoded);
        Ok(())
    }
}
