use serde::{Deserialize, Serialize};

use crate::models::ad::{Ad, AdId, AdType};

/// A freshly generated ad travelling from the creation flow to the editor.
/// It has no id or timestamps until the editor saves it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PendingDraft {
    pub title: String,
    pub content: String,
    #[serde(rename = "type")]
    pub ad_type: AdType,
    #[serde(default)]
    pub images: Vec<String>,
}

impl PendingDraft {
    pub fn into_ad(self, id: AdId) -> Ad {
        Ad::new(id, self.title, self.content, self.ad_type, self.images)
    }
}
