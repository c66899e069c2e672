//! Builds the explicit [`Session`] for a request.
//!
//! `X-Profile-Id` names the browser profile and is always required. A
//! `Bearer` token, when present, must verify; the session is then
//! authenticated as the token's subject.

use axum::extract::FromRequestParts;
use axum::http::header::AUTHORIZATION;
use axum::http::request::Parts;
use domains::{AppError, ProfileId, Session};
use tracing::debug;

use crate::error::ApiError;
use crate::state::AppState;

pub const PROFILE_HEADER: &str = "x-profile-id";

pub struct CurrentSession(pub Session);

impl FromRequestParts<AppState> for CurrentSession {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let profile = parts
            .headers
            .get(PROFILE_HEADER)
            .and_then(|value| value.to_str().ok())
            .ok_or_else(|| AppError::ValidationError("missing X-Profile-Id header".into()))?;
        let profile = ProfileId::new(profile)?;

        let Some(auth) = parts.headers.get(AUTHORIZATION) else {
            return Ok(CurrentSession(Session::anonymous(profile)));
        };
        let token = auth
            .to_str()
            .ok()
            .and_then(|value| value.strip_prefix("Bearer "))
            .ok_or_else(|| {
                AppError::Unauthorized("expected Authorization: Bearer <token>".into())
            })?;

        let user = state.verifier.verify(token.trim()).await?;
        debug!(profile = %profile, user = %user, "authenticated request");
        Ok(CurrentSession(Session::authenticated(profile, user)))
    }
}
