use std::time::{Duration, Instant};

use async_trait::async_trait;
use dashmap::DashMap;
use domains::{KeyValueStore, Result};

/// Process-local key/value store. Entries with a TTL vanish once expired.
#[derive(Debug, Default)]
pub struct MemoryKeyValueStore {
    entries: DashMap<String, (String, Option<Instant>)>,
}

impl MemoryKeyValueStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl KeyValueStore for MemoryKeyValueStore {
    async fn get(&self, key: &str) -> Result<Option<String>> {
        let now = Instant::now();
        let expired = match self.entries.get(key) {
            Some(entry) => match entry.1 {
                Some(deadline) if deadline <= now => true,
                _ => return Ok(Some(entry.0.clone())),
            },
            None => return Ok(None),
        };
        if expired {
            self.entries.remove(key);
        }
        Ok(None)
    }

    async fn set(&self, key: &str, value: String, ttl: Option<Duration>) -> Result<()> {
        let deadline = ttl.map(|ttl| Instant::now() + ttl);
        self.entries.insert(key.to_string(), (value, deadline));
        Ok(())
    }

    async fn remove(&self, key: &str) -> Result<()> {
        self.entries.remove(key);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_set_get_remove() {
        let kv = MemoryKeyValueStore::new();
        kv.set("p1:localAds", "[]".into(), None).await.unwrap();
        assert_eq!(kv.get("p1:localAds").await.unwrap().as_deref(), Some("[]"));
        kv.remove("p1:localAds").await.unwrap();
        kv.remove("p1:localAds").await.unwrap();
        assert_eq!(kv.get("p1:localAds").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_expired_entries_disappear() {
        let kv = MemoryKeyValueStore::new();
        kv.set("p1:pendingAd", "{}".into(), Some(Duration::ZERO)).await.unwrap();
        assert_eq!(kv.get("p1:pendingAd").await.unwrap(), None);
    }
}
