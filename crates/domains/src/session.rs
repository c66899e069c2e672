//! Explicit session context.
//!
//! Store selection is driven by the value handed to each service, never by
//! ambient global state.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::errors::AppError;

/// Identifier of the signed-in owner of remote records.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(String);

impl UserId {
    pub fn new(raw: impl Into<String>) -> Result<Self, AppError> {
        let raw = raw.into();
        if raw.is_empty() || raw.contains('/') || raw.contains("..") {
            return Err(AppError::ValidationError(format!("invalid user id {raw:?}")));
        }
        Ok(Self(raw))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Identifier of one browser profile; scopes local storage and handoff slots.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ProfileId(String);

impl ProfileId {
    pub fn new(raw: impl Into<String>) -> Result<Self, AppError> {
        let raw = raw.into();
        let valid = !raw.is_empty()
            && raw.len() <= 64
            && raw.chars().all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');
        if !valid {
            return Err(AppError::ValidationError(format!("invalid profile id {raw:?}")));
        }
        Ok(Self(raw))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ProfileId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Session {
    Anonymous { profile: ProfileId },
    Authenticated { profile: ProfileId, user: UserId },
}

impl Session {
    pub fn anonymous(profile: ProfileId) -> Self {
        Session::Anonymous { profile }
    }

    pub fn authenticated(profile: ProfileId, user: UserId) -> Self {
        Session::Authenticated { profile, user }
    }

    pub fn profile(&self) -> &ProfileId {
        match self {
            Session::Anonymous { profile } | Session::Authenticated { profile, .. } => profile,
        }
    }

    pub fn user(&self) -> Option<&UserId> {
        match self {
            Session::Anonymous { .. } => None,
            Session::Authenticated { user, .. } => Some(user),
        }
    }

    /// The signed-in user, or the precondition failure for authenticated-only work.
    pub fn require_user(&self) -> Result<&UserId, AppError> {
        self.user()
            .ok_or_else(|| AppError::Unauthenticated("sign in required".into()))
    }

    pub fn is_authenticated(&self) -> bool {
        self.user().is_some()
    }
}
