//! # api-adapters
//!
//! HTTP surface of adcraft. Handlers only translate between HTTP and the
//! services; session resolution happens once per request in
//! [`extract::CurrentSession`].

pub mod metrics;

#[cfg(feature = "web-axum")]
pub mod error;
#[cfg(feature = "web-axum")]
pub mod extract;
#[cfg(feature = "web-axum")]
pub mod handlers;
#[cfg(feature = "web-axum")]
pub mod middleware;
#[cfg(feature = "web-axum")]
pub mod state;

pub use metrics::Metrics;

#[cfg(feature = "web-axum")]
pub use state::AppState;

/// Ten photos as base64 data URLs plus the JSON around them.
#[cfg(feature = "web-axum")]
const MAX_BODY_BYTES: usize = 64 * 1024 * 1024;

/// All routes with their middleware. `cors_origins` empty allows any origin.
#[cfg(feature = "web-axum")]
pub fn router(state: AppState, cors_origins: &[String]) -> axum::Router {
    use axum::extract::DefaultBodyLimit;
    use axum::routing::{get, post};

    let routes = axum::Router::new()
        .route("/healthz", get(handlers::healthz))
        .route("/metrics", get(handlers::metrics))
        .route("/api/generate/{kind}", post(handlers::generate))
        .route("/api/drafts/pending", get(handlers::take_pending_draft))
        .route("/api/ads", get(handlers::list_ads))
        .route(
            "/api/ads/{id}",
            get(handlers::get_ad)
                .put(handlers::save_ad)
                .delete(handlers::delete_ad),
        )
        .route("/api/session/login", post(handlers::login))
        .route("/media/{user}/{file}", get(handlers::media))
        .layer(DefaultBodyLimit::max(MAX_BODY_BYTES))
        .with_state(state);

    middleware::apply(routes, cors_origins)
}
