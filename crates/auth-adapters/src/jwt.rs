//! HS256 bearer-token verification. The `sub` claim is the user id.

use async_trait::async_trait;
use domains::{AppError, IdentityVerifier, Result, UserId};
use jsonwebtoken::{decode, Algorithm, DecodingKey, Validation};
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use tracing::debug;

#[derive(Debug, Clone)]
pub struct JwtSettings {
    pub secret: SecretString,
    pub issuer: Option<String>,
    pub audience: Option<String>,
    pub leeway_secs: u64,
}

#[derive(Debug, Deserialize)]
struct Claims {
    sub: String,
}

pub struct JwtVerifier {
    key: DecodingKey,
    validation: Validation,
}

impl JwtVerifier {
    pub fn new(settings: &JwtSettings) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = settings.leeway_secs;
        validation.set_required_spec_claims(&["exp", "sub"]);
        if let Some(issuer) = &settings.issuer {
            validation.set_issuer(&[issuer]);
        }
        match &settings.audience {
            Some(audience) => validation.set_audience(&[audience]),
            None => validation.validate_aud = false,
        }
        Self {
            key: DecodingKey::from_secret(settings.secret.expose_secret().as_bytes()),
            validation,
        }
    }
}

#[async_trait]
impl IdentityVerifier for JwtVerifier {
    async fn verify(&self, token: &str) -> Result<UserId> {
        let data = decode::<Claims>(token, &self.key, &self.validation).map_err(|e| {
            debug!(error = %e, "bearer token rejected");
            AppError::Unauthorized(format!("invalid token: {e}"))
        })?;
        UserId::new(data.claims.sub)
            .map_err(|_| AppError::Unauthorized("token subject is not a valid user id".into()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use jsonwebtoken::{encode, EncodingKey, Header};
    use serde::Serialize;

    #[derive(Serialize)]
    struct TestClaims<'a> {
        sub: &'a str,
        exp: i64,
        iss: &'a str,
    }

    fn settings() -> JwtSettings {
        JwtSettings {
            secret: SecretString::from("test-secret"),
            issuer: Some("https://id.test".into()),
            audience: None,
            leeway_secs: 0,
        }
    }

    fn token(secret: &str, sub: &str, exp_offset: i64) -> String {
        let claims = TestClaims {
            sub,
            exp: chrono::Utc::now().timestamp() + exp_offset,
            iss: "https://id.test",
        };
        encode(&Header::default(), &claims, &EncodingKey::from_secret(secret.as_bytes())).unwrap()
    }

    #[tokio::test]
    async fn test_valid_token_yields_subject() {
        let verifier = JwtVerifier::new(&settings());
        let user = verifier.verify(&token("test-secret", "uid-42", 600)).await.unwrap();
        assert_eq!(user.as_str(), "uid-42");
    }

    #[tokio::test]
    async fn test_wrong_key_and_expired_tokens_are_rejected() {
        let verifier = JwtVerifier::new(&settings());
        assert!(verifier.verify(&token("other", "uid-42", 600)).await.is_err());
        assert!(verifier.verify(&token("test-secret", "uid-42", -600)).await.is_err());
        assert!(verifier.verify("garbage").await.is_err());
    }
}
