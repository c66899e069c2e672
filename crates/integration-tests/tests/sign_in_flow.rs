//! Anonymous drafting, sign-in with a real HS256 token, and what each
//! session sees afterwards, all over HTTP.

mod fixtures;

use std::sync::Arc;
use std::time::Duration;

use api_adapters::{router, AppState, Metrics};
use auth_adapters::{JwtSettings, JwtVerifier};
use axum::body::{to_bytes, Body};
use axum::http::{Request, StatusCode};
use axum::Router;
use domains::MockGenerationBackend;
use fixtures::*;
use jsonwebtoken::{encode, EncodingKey, Header};
use serde::Serialize;
use serde_json::{json, Value};
use services::{DraftHandoff, GenerationService, MigrationService};
use tower::ServiceExt;

const SECRET: &str = "integration-secret";

#[derive(Serialize)]
struct Claims<'a> {
    sub: &'a str,
    exp: i64,
}

fn token(sub: &str) -> String {
    let claims = Claims {
        sub,
        exp: chrono::Utc::now().timestamp() + 600,
    };
    encode(&Header::default(), &claims, &EncodingKey::from_secret(SECRET.as_bytes())).unwrap()
}

fn app(harness: &Harness) -> Router {
    let verifier = JwtVerifier::new(&JwtSettings {
        secret: SECRET.to_string().into(),
        issuer: None,
        audience: None,
        leeway_secs: 0,
    });
    let state = AppState {
        backends: harness.backends.clone(),
        migrations: Arc::new(MigrationService::new(harness.backends.clone())),
        generation: GenerationService::new(Arc::new(MockGenerationBackend::new())),
        drafts: DraftHandoff::new(harness.backends.kv.clone(), Duration::from_secs(60)),
        verifier: Arc::new(verifier),
        media: None,
        metrics: Arc::new(Metrics::new()),
    };
    router(state, &[])
}

async fn call(
    app: &Router,
    method: &str,
    uri: &str,
    token: Option<&str>,
    body: Option<Value>,
) -> (StatusCode, Value) {
    let mut builder = Request::builder()
        .method(method)
        .uri(uri)
        .header("x-profile-id", "profile-1");
    if let Some(token) = token {
        builder = builder.header("authorization", format!("Bearer {token}"));
    }
    let req = match body {
        Some(body) => builder
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };
    let resp = app.clone().oneshot(req).await.unwrap();
    let status = resp.status();
    let bytes = to_bytes(resp.into_body(), usize::MAX).await.unwrap();
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, value)
}

fn listing(id: &str, images: &[&str]) -> Value {
    json!({
        "id": id,
        "title": "Mountain bike",
        "content": "Hardtail, 29 inch wheels.",
        "type": "item",
        "images": images,
    })
}

#[tokio::test]
async fn test_drafts_follow_the_user_through_sign_in() {
    let harness = Harness::new();
    let app = app(&harness);

    let (status, _) = call(&app, "PUT", "/api/ads/b1", None, Some(listing("b1", &[JPEG]))).await;
    assert_eq!(status, StatusCode::OK);
    let (status, _) = call(&app, "PUT", "/api/ads/b2", None, Some(listing("b2", &[]))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(harness.blobs.stored(), 0);

    let bearer = token("u1");
    let (status, outcome) = call(&app, "POST", "/api/session/login", Some(&bearer), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(outcome, json!({"status": "migrated", "count": 2}));
    assert_eq!(harness.blobs.stored(), 1);

    let (_, remote) = call(&app, "GET", "/api/ads", Some(&bearer), None).await;
    assert_eq!(remote.as_array().unwrap().len(), 2);

    let (_, local) = call(&app, "GET", "/api/ads", None, None).await;
    assert_eq!(local, json!([]));
}

#[tokio::test]
async fn test_failed_migration_leaves_local_drafts_for_retry() {
    let harness = Harness::new();
    let app = app(&harness);
    call(&app, "PUT", "/api/ads/b1", None, Some(listing("b1", &[JPEG, PNG]))).await;

    harness.blobs.fail_on_put(2);
    let bearer = token("u1");
    let (status, body) = call(&app, "POST", "/api/session/login", Some(&bearer), None).await;
    assert_eq!(status, StatusCode::BAD_GATEWAY);
    assert_eq!(body["index"], 1);

    let (_, local) = call(&app, "GET", "/api/ads", None, None).await;
    assert_eq!(local[0]["images"][0], JPEG);

    harness.blobs.heal();
    let (status, _) = call(&app, "POST", "/api/session/login", Some(&bearer), None).await;
    assert_eq!(status, StatusCode::OK);
    let (_, remote) = call(&app, "GET", "/api/ads", Some(&bearer), None).await;
    assert_eq!(remote.as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn test_tokens_signed_with_another_key_are_rejected() {
    let harness = Harness::new();
    let app = app(&harness);
    let forged = encode(
        &Header::default(),
        &Claims { sub: "u1", exp: chrono::Utc::now().timestamp() + 600 },
        &EncodingKey::from_secret(b"someone-else"),
    )
    .unwrap();

    let (status, body) = call(&app, "GET", "/api/ads", Some(&forged), None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert!(body["error"].is_string());
}
