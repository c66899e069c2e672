//! # Handlers
//!
//! Each request resolves its own session, then talks to the services through
//! it. Nothing here decides which store an ad lives in.

use axum::extract::{Path, Query, State};
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use domains::{Ad, AdId, AdType, AppError, GenerationInput, GenerationOutcome, PendingDraft};
use serde::Deserialize;
use services::AdFacade;
use tracing::{info, warn};

use crate::error::ApiError;
use crate::extract::CurrentSession;
use crate::metrics::CONTENT_TYPE;
use crate::state::AppState;

pub async fn healthz() -> impl IntoResponse {
    Json(serde_json::json!({ "status": "ok" }))
}

pub async fn metrics(State(state): State<AppState>) -> Result<Response, ApiError> {
    let body = state
        .metrics
        .encode()
        .map_err(|e| AppError::Internal(format!("metrics encoding: {e}")))?;
    Ok(([(header::CONTENT_TYPE, CONTENT_TYPE)], body).into_response())
}

/// Runs the category's flow and, on success, leaves the result for the editor.
pub async fn generate(
    State(state): State<AppState>,
    CurrentSession(session): CurrentSession,
    Path(kind): Path<String>,
    Json(input): Json<GenerationInput>,
) -> Result<Response, ApiError> {
    let kind: AdType = kind.parse()?;
    let images = input.images.clone();

    let outcome = state.generation.generate(kind, input).await;
    let (title, body) = match &outcome {
        GenerationOutcome::Generated { title, body } => (title, body),
        GenerationOutcome::Failed { retryable, .. } => {
            let (label, status) = if *retryable {
                ("failed", StatusCode::BAD_GATEWAY)
            } else {
                ("rejected", StatusCode::UNPROCESSABLE_ENTITY)
            };
            state.metrics.generation(label);
            return Ok((status, Json(outcome)).into_response());
        }
    };
    state.metrics.generation("generated");

    let draft = PendingDraft {
        title: title.clone(),
        content: body.clone(),
        ad_type: kind,
        images,
    };
    if let Err(err) = state.drafts.stash(session.profile(), &draft).await {
        // The client still has the outcome and can carry it over itself.
        warn!(profile = %session.profile(), error = %err, "draft handoff failed");
    }
    Ok((StatusCode::OK, Json(outcome)).into_response())
}

/// Hands the pending draft to the editor exactly once.
pub async fn take_pending_draft(
    State(state): State<AppState>,
    CurrentSession(session): CurrentSession,
) -> Result<Response, ApiError> {
    match state.drafts.take(session.profile()).await? {
        Some(draft) => Ok(Json(draft).into_response()),
        None => Ok(StatusCode::NO_CONTENT.into_response()),
    }
}

pub async fn list_ads(
    State(state): State<AppState>,
    CurrentSession(session): CurrentSession,
) -> Result<Json<Vec<Ad>>, ApiError> {
    let facade = AdFacade::new(&session, &state.backends);
    Ok(Json(facade.list().await?))
}

pub async fn get_ad(
    State(state): State<AppState>,
    CurrentSession(session): CurrentSession,
    Path(id): Path<String>,
) -> Result<Json<Ad>, ApiError> {
    let id = AdId::new(id)?;
    let facade = AdFacade::new(&session, &state.backends);
    facade
        .get(&id)
        .await?
        .map(Json)
        .ok_or_else(|| AppError::NotFound("Ad".into(), id.to_string()).into())
}

pub async fn save_ad(
    State(state): State<AppState>,
    CurrentSession(session): CurrentSession,
    Path(id): Path<String>,
    Json(ad): Json<Ad>,
) -> Result<Json<Ad>, ApiError> {
    let id = AdId::new(id)?;
    if ad.id != id {
        return Err(AppError::ValidationError(format!(
            "path id {id} does not match body id {}",
            ad.id
        ))
        .into());
    }

    let facade = AdFacade::new(&session, &state.backends);
    let saved = facade.save(ad).await?;
    state.metrics.save(facade.store_kind());
    info!(ad_id = %saved.id, store = facade.store_kind(), "ad saved");
    Ok(Json(saved))
}

#[derive(Debug, Default, Deserialize)]
pub struct DeleteParams {
    #[serde(default)]
    pub wait: bool,
}

/// Without `?wait=true` the delete runs in the background and failures are
/// published as persistence events.
pub async fn delete_ad(
    State(state): State<AppState>,
    CurrentSession(session): CurrentSession,
    Path(id): Path<String>,
    Query(params): Query<DeleteParams>,
) -> Result<Response, ApiError> {
    let id = AdId::new(id)?;
    let facade = AdFacade::new(&session, &state.backends);

    if params.wait {
        let report = facade.delete(&id).await?;
        if report.removed {
            state.metrics.delete(facade.store_kind());
        }
        return Ok(Json(report).into_response());
    }
    let store = facade.store_kind();
    let metrics = state.metrics.clone();
    let task = facade.spawn_delete(id);
    tokio::spawn(async move {
        if let Ok(Ok(report)) = task.await {
            if report.removed {
                metrics.delete(store);
            }
        }
    });
    Ok(StatusCode::ACCEPTED.into_response())
}

/// Called once the browser has signed in; moves the profile's local ads to
/// the user.
pub async fn login(
    State(state): State<AppState>,
    CurrentSession(session): CurrentSession,
) -> Result<Response, ApiError> {
    session.require_user()?;
    match state.migrations.migrate(&session).await {
        Ok(outcome) => {
            let label = match &outcome {
                services::MigrationOutcome::Migrated { .. } => "migrated",
                services::MigrationOutcome::NothingToMigrate => "nothing_to_migrate",
                services::MigrationOutcome::AlreadyRunning => "already_running",
            };
            state.metrics.migration(label);
            Ok(Json(outcome).into_response())
        }
        Err(err) => {
            state.metrics.migration("failed");
            Err(err.into())
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct MediaParams {
    pub sig: Option<String>,
}

/// Serves images stored by the local blob store.
pub async fn media(
    State(state): State<AppState>,
    Path((user, file)): Path<(String, String)>,
    Query(params): Query<MediaParams>,
) -> Result<Response, ApiError> {
    let Some(store) = &state.media else {
        return Ok(StatusCode::NOT_FOUND.into_response());
    };
    let path = format!("{user}/{file}");
    let signed = params
        .sig
        .as_deref()
        .is_some_and(|sig| store.signer().verify(&path, sig));
    if !signed {
        return Ok(StatusCode::FORBIDDEN.into_response());
    }

    let (data, media_type) = store.read(&path).await.map_err(AppError::from)?;
    Ok((
        [
            (header::CONTENT_TYPE, media_type.to_string()),
            (header::CACHE_CONTROL, "private, max-age=86400".to_string()),
        ],
        data,
    )
        .into_response())
}
