//! # AppError
//!
//! Centralized error handling for the adcraft ecosystem.
//! Maps domain-specific failures to actionable error types.

use thiserror::Error;

/// Failures reported by a [`crate::ports::BlobStore`].
///
/// `NotFound` is kept apart so deletes can treat a missing object as success.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BlobError {
    #[error("object not found at {0}")]
    NotFound(String),

    #[error("blob backend error: {0}")]
    Backend(String),
}

/// The primary error type for all adcraft operations.
#[derive(Error, Debug)]
pub enum AppError {
    /// Resource not found (e.g., ad id unknown for this owner)
    #[error("{0} not found with ID {1}")]
    NotFound(String, String),

    /// Validation failure (e.g., empty title, malformed data URL)
    #[error("validation error: {0}")]
    ValidationError(String),

    /// An authenticated-only operation was attempted without a signed-in user.
    #[error("unauthenticated: {0}")]
    Unauthenticated(String),

    /// The bearer token could not be verified.
    #[error("unauthorized: {0}")]
    Unauthorized(String),

    /// The generation runtime was unavailable or returned unusable output.
    #[error("generation failed: {0}")]
    Generation(String),

    /// Record store rejected a read or write (permission, network, corrupt data).
    #[error("storage error: {0}")]
    Storage(String),

    /// Blob store failure outside of an upload batch.
    #[error(transparent)]
    Blob(#[from] BlobError),

    /// One entry of an upload batch failed; the whole batch was abandoned.
    #[error("image {index} could not be uploaded: {reason}")]
    UploadFailed { index: usize, reason: String },

    /// Resource already exists or is busy
    #[error("conflict: {0}")]
    Conflict(String),

    /// Infrastructure failure that fits nowhere else
    #[error("internal service error: {0}")]
    Internal(String),
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        AppError::Storage(format!("serialization: {err}"))
    }
}

/// A specialized Result type for adcraft logic.
pub type Result<T> = std::result::Result<T, AppError>;
