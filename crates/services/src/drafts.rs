//! Session-scoped handoff of a freshly generated ad from the creation flow to
//! the editor flow.

use std::sync::Arc;
use std::time::Duration;

use domains::{AppError, KeyValueStore, PendingDraft, ProfileId, Result};
use tracing::debug;

pub const PENDING_AD_KEY: &str = "pendingAd";

#[derive(Clone)]
pub struct DraftHandoff {
    kv: Arc<dyn KeyValueStore>,
    ttl: Duration,
}

impl DraftHandoff {
    pub fn new(kv: Arc<dyn KeyValueStore>, ttl: Duration) -> Self {
        Self { kv, ttl }
    }

    fn key(profile: &ProfileId) -> String {
        format!("{profile}:{PENDING_AD_KEY}")
    }

    /// Replaces whatever draft the profile had pending.
    pub async fn stash(&self, profile: &ProfileId, draft: &PendingDraft) -> Result<()> {
        let raw = serde_json::to_string(draft)?;
        self.kv.set(&Self::key(profile), raw, Some(self.ttl)).await?;
        debug!(profile = %profile, "draft stashed");
        Ok(())
    }

    pub async fn peek(&self, profile: &ProfileId) -> Result<Option<PendingDraft>> {
        match self.kv.get(&Self::key(profile)).await? {
            Some(raw) => serde_json::from_str(&raw)
                .map(Some)
                .map_err(|e| AppError::Storage(format!("pending draft is unreadable: {e}"))),
            None => Ok(None),
        }
    }

    /// Reads and clears the pending draft.
    pub async fn take(&self, profile: &ProfileId) -> Result<Option<PendingDraft>> {
        let draft = self.peek(profile).await?;
        if draft.is_some() {
            self.kv.remove(&Self::key(profile)).await?;
        }
        Ok(draft)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use domains::AdType;
    use storage_adapters::kv::MemoryKeyValueStore;

    fn draft() -> PendingDraft {
        PendingDraft {
            title: "Tutoring".into(),
            content: "Maths, all levels.".into(),
            ad_type: AdType::Service,
            images: vec![],
        }
    }

    #[tokio::test]
    async fn test_take_consumes_the_draft() {
        let handoff = DraftHandoff::new(Arc::new(MemoryKeyValueStore::new()), Duration::from_secs(60));
        let profile = ProfileId::new("p1").unwrap();
        handoff.stash(&profile, &draft()).await.unwrap();
        assert_eq!(handoff.peek(&profile).await.unwrap(), Some(draft()));
        assert_eq!(handoff.take(&profile).await.unwrap(), Some(draft()));
        assert_eq!(handoff.take(&profile).await.unwrap(), None);
    }
}
