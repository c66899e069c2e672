use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::errors::AppError;
use crate::models::image::{validate_images, ImageRef};
use crate::session::UserId;

pub const TITLE_MAX_CHARS: usize = 200;
pub const CONTENT_MAX_CHARS: usize = 20_000;

/// Opaque, caller-generated ad identifier. Immutable for the record's lifetime.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AdId(String);

impl AdId {
    pub fn new(raw: impl Into<String>) -> Result<Self, AppError> {
        let raw = raw.into();
        if raw.trim().is_empty() {
            return Err(AppError::ValidationError("ad id must not be empty".into()));
        }
        if raw.len() > 128 || raw.contains('/') {
            return Err(AppError::ValidationError(format!("ad id {raw:?} is not a valid key")));
        }
        Ok(Self(raw))
    }

    /// Random id for callers that do not bring their own.
    pub fn generate() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for AdId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// The closed set of ad categories.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum AdType {
    /// A vehicle offered for sale.
    Sale,
    Wanted,
    Item,
    Service,
    RealEstate,
}

impl AdType {
    pub const ALL: [AdType; 5] = [
        AdType::Sale,
        AdType::Wanted,
        AdType::Item,
        AdType::Service,
        AdType::RealEstate,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            AdType::Sale => "sale",
            AdType::Wanted => "wanted",
            AdType::Item => "item",
            AdType::Service => "service",
            AdType::RealEstate => "real-estate",
        }
    }
}

impl fmt::Display for AdType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AdType {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        AdType::ALL
            .into_iter()
            .find(|t| t.as_str() == s)
            .ok_or_else(|| AppError::ValidationError(format!("unknown ad type {s:?}")))
    }
}

/// The persisted unit of content.
///
/// Timestamps and `user_id` are skipped when absent so that a merge write of a
/// fresh record never clobbers values already held by the stored document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Ad {
    pub id: AdId,
    pub title: String,
    /// Markdown body.
    pub content: String,
    #[serde(rename = "type")]
    pub ad_type: AdType,
    /// Display order. Entries are data URLs before upload, permanent URLs after.
    #[serde(default)]
    pub images: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
    /// Owner; only set on records held by the remote store.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<UserId>,
}

impl Ad {
    pub fn new(
        id: AdId,
        title: impl Into<String>,
        content: impl Into<String>,
        ad_type: AdType,
        images: Vec<String>,
    ) -> Self {
        Self {
            id,
            title: title.into(),
            content: content.into(),
            ad_type,
            images,
            created_at: None,
            updated_at: None,
            user_id: None,
        }
    }

    pub fn validate(&self) -> Result<(), AppError> {
        let title = self.title.trim();
        if title.is_empty() {
            return Err(AppError::ValidationError("title must not be empty".into()));
        }
        if title.chars().count() > TITLE_MAX_CHARS {
            return Err(AppError::ValidationError(format!(
                "title exceeds {TITLE_MAX_CHARS} characters"
            )));
        }
        if self.content.chars().count() > CONTENT_MAX_CHARS {
            return Err(AppError::ValidationError(format!(
                "content exceeds {CONTENT_MAX_CHARS} characters"
            )));
        }
        validate_images(&self.images)
    }

    /// Stamps `updated_at` and, on first save only, `created_at`.
    ///
    /// `updated_at` strictly increases even when the clock has not moved since
    /// the previous save.
    pub fn touch(&mut self, now: DateTime<Utc>) {
        let next = match self.updated_at {
            Some(prev) if now <= prev => prev + Duration::microseconds(1),
            _ => now,
        };
        self.updated_at = Some(next);
        if self.created_at.is_none() {
            self.created_at = Some(next);
        }
    }

    pub fn has_embedded_images(&self) -> bool {
        self.images
            .iter()
            .any(|raw| matches!(ImageRef::classify(raw), ImageRef::Embedded(_)))
    }
}
