//! # auth-adapters
//!
//! Implementations of [`domains::IdentityVerifier`]. Sign-in itself happens at
//! an external identity provider; this crate only checks the bearer token the
//! browser presents and extracts the user id from it.

#[cfg(feature = "auth-jwt")]
pub mod jwt;

use async_trait::async_trait;
use domains::{AppError, IdentityVerifier, Result, UserId};

#[cfg(feature = "auth-jwt")]
pub use jwt::{JwtSettings, JwtVerifier};

/// Used when no identity provider is compiled in: every token is rejected,
/// so all sessions stay anonymous.
#[derive(Debug, Default, Clone, Copy)]
pub struct DenyAllVerifier;

#[async_trait]
impl IdentityVerifier for DenyAllVerifier {
    async fn verify(&self, _token: &str) -> Result<UserId> {
        Err(AppError::Unauthorized("sign-in is not enabled".into()))
    }
}
