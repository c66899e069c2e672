//! # Core Traits (Ports)
//!
//! Any adapter must implement these traits to be used by the binary.

use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use mime::Mime;

use crate::errors::{BlobError, Result};
use crate::models::{Ad, AdId, AdType, GeneratedAd, GenerationInput};
use crate::session::UserId;

/// Per-profile persistent key/value storage (the browser storage analogue).
#[cfg_attr(any(test, feature = "testing"), mockall::automock)]
#[async_trait]
pub trait KeyValueStore: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<String>>;
    /// Overwrites the entry. A `ttl` makes the entry session-scoped.
    async fn set(&self, key: &str, value: String, ttl: Option<Duration>) -> Result<()>;
    /// Removing a missing key is not an error.
    async fn remove(&self, key: &str) -> Result<()>;
}

/// Per-user collection of ad documents keyed by ad id.
#[cfg_attr(any(test, feature = "testing"), mockall::automock)]
#[async_trait]
pub trait DocumentStore: Send + Sync {
    async fn get(&self, user: &UserId, id: &AdId) -> Result<Option<Ad>>;
    async fn list(&self, user: &UserId) -> Result<Vec<Ad>>;
    /// Top-level field merge into the stored document, creating it if needed.
    /// Fields absent from the serialized `ad` keep their stored values.
    /// Returns the document as stored after the merge.
    async fn merge(&self, user: &UserId, ad: &Ad) -> Result<Ad>;
    /// Returns whether a document was removed.
    async fn delete(&self, user: &UserId, id: &AdId) -> Result<bool>;
    /// Writes every record or none of them.
    async fn commit_batch(&self, user: &UserId, ads: &[Ad]) -> Result<()>;
}

/// Durable object storage for uploaded images.
#[cfg_attr(any(test, feature = "testing"), mockall::automock)]
#[async_trait]
pub trait BlobStore: Send + Sync {
    /// Stores the object and returns its retrieval URL.
    async fn put(
        &self,
        path: &str,
        data: Bytes,
        media_type: &Mime,
    ) -> std::result::Result<String, BlobError>;
    async fn delete(&self, path: &str) -> std::result::Result<(), BlobError>;
    /// Resolves a retrieval URL back to its storage path, or `None` when the
    /// URL was not issued by this store.
    fn locate(&self, url: &str) -> Option<String>;
}

/// Bounded pre-upload processing of image bytes (e.g. downscaling).
#[cfg_attr(any(test, feature = "testing"), mockall::automock)]
#[async_trait]
pub trait MediaProcessor: Send + Sync {
    async fn prepare(&self, data: Bytes, media_type: Mime) -> Result<(Bytes, Mime)>;
}

/// One request to the hosted generation runtime.
#[cfg_attr(any(test, feature = "testing"), mockall::automock)]
#[async_trait]
pub trait GenerationBackend: Send + Sync {
    async fn run(&self, kind: AdType, input: &GenerationInput) -> Result<GeneratedAd>;
}

/// Turns a bearer token into the signed-in user's id.
#[cfg_attr(any(test, feature = "testing"), mockall::automock)]
#[async_trait]
pub trait IdentityVerifier: Send + Sync {
    async fn verify(&self, token: &str) -> Result<UserId>;
}
