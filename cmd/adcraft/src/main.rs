//! # adcraft
//!
//! Assembles the service from `configs::Settings` and the backends compiled
//! in through cargo features.

use std::sync::Arc;
use std::time::Duration;

use anyhow::{bail, Context};
use api_adapters::{router, AppState, Metrics};
use configs::{BlobBackend, DocumentBackend, KvBackend, LogFormat, Settings};
use domains::{BlobStore, DocumentStore, IdentityVerifier, KeyValueStore, MediaProcessor};
use generation_adapters::{FlowClient, FlowClientSettings};
use secrecy::ExposeSecret;
use services::{
    Backends, DraftHandoff, ErrorEvents, GenerationService, ImageUploader, MigrationService,
    PersistenceEvent,
};
use storage_adapters::blob::{LocalBlobStore, MemoryBlobStore};
use storage_adapters::documents::MemoryDocumentStore;
use storage_adapters::kv::MemoryKeyValueStore;
use storage_adapters::media::{ImageResizer, ResizeOptions};
use tokio::sync::broadcast;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let settings = Settings::load().context("loading settings")?;
    init_tracing(&settings);

    // reqwest and the AWS SDK share one rustls provider.
    let _ = rustls::crypto::ring::default_provider().install_default();

    let kv = key_value_store(&settings)?;
    let documents = document_store(&settings).await?;
    let (blobs, media) = blob_store(&settings).await?;

    let resizer: Arc<dyn MediaProcessor> = Arc::new(ImageResizer::new(ResizeOptions {
        max_dimension: settings.media.max_dimension,
        jpeg_quality: settings.media.jpeg_quality,
        optimize_png: settings.media.optimize_png,
    }));

    let backends = Backends {
        kv: kv.clone(),
        documents,
        uploader: ImageUploader::new(blobs).with_processor(resizer.clone()),
        events: ErrorEvents::default(),
    };
    tokio::spawn(log_persistence_events(backends.events.subscribe()));

    let flow_client = FlowClient::new(&FlowClientSettings {
        base_url: settings.generation.base_url.clone(),
        api_key: settings.generation.api_key.clone(),
        timeout: Duration::from_secs(settings.generation.timeout_secs),
    })?;

    let state = AppState {
        migrations: Arc::new(MigrationService::new(backends.clone())),
        backends,
        generation: GenerationService::new(Arc::new(flow_client)).with_processor(resizer),
        drafts: DraftHandoff::new(kv, Duration::from_secs(settings.drafts.ttl_secs)),
        verifier: identity_verifier(&settings),
        media,
        metrics: Arc::new(Metrics::new()),
    };

    let app = router(state, &settings.server.cors_origins);
    let addr = settings.bind_addr();
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("binding {addr}"))?;
    info!(addr = %addr, "adcraft listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    Ok(())
}

fn init_tracing(settings: &Settings) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&settings.log.filter));
    let builder = tracing_subscriber::fmt().with_env_filter(filter);
    match settings.log.format {
        LogFormat::Json => builder.json().init(),
        LogFormat::Pretty => builder.init(),
    }
}

fn key_value_store(settings: &Settings) -> anyhow::Result<Arc<dyn KeyValueStore>> {
    match settings.storage.kv {
        KvBackend::Memory => {
            warn!("using in-memory key/value store; anonymous ads are lost on restart");
            Ok(Arc::new(MemoryKeyValueStore::new()))
        }
        #[cfg(feature = "redis")]
        KvBackend::Redis => {
            let url = settings
                .storage
                .redis_url
                .as_ref()
                .context("storage.redis_url")?;
            let store = storage_adapters::kv::RedisKeyValueStore::connect(
                url.expose_secret(),
                settings.storage.redis_prefix.clone(),
            )?;
            Ok(Arc::new(store))
        }
        #[cfg(not(feature = "redis"))]
        KvBackend::Redis => bail!("storage.kv = \"redis\" needs the `redis` feature"),
    }
}

async fn document_store(settings: &Settings) -> anyhow::Result<Arc<dyn DocumentStore>> {
    match settings.storage.documents {
        DocumentBackend::Memory => {
            warn!("using in-memory document store; signed-in ads are lost on restart");
            Ok(Arc::new(MemoryDocumentStore::new()))
        }
        #[cfg(feature = "db-postgres")]
        DocumentBackend::Postgres => {
            let url = settings
                .storage
                .database_url
                .as_ref()
                .context("storage.database_url")?;
            let store = storage_adapters::documents::PostgresDocumentStore::connect(
                url.expose_secret(),
                settings.storage.max_connections,
            )
            .await?;
            if settings.storage.run_migrations {
                store.migrate().await?;
            }
            Ok(Arc::new(store))
        }
        #[cfg(not(feature = "db-postgres"))]
        DocumentBackend::Postgres => {
            bail!("storage.documents = \"postgres\" needs the `db-postgres` feature")
        }
    }
}

/// The blob store, plus the local store again when `/media` must serve it.
async fn blob_store(
    settings: &Settings,
) -> anyhow::Result<(Arc<dyn BlobStore>, Option<Arc<LocalBlobStore>>)> {
    match settings.media.backend {
        BlobBackend::Memory => {
            warn!("using in-memory blob store; images are lost on restart");
            let base = format!("{}/memory-blobs", settings.server.public_base_url);
            let store: Arc<dyn BlobStore> = Arc::new(MemoryBlobStore::new(base));
            Ok((store, None))
        }
        #[cfg(feature = "media-local")]
        BlobBackend::Local => {
            let key = settings
                .media
                .signing_key
                .as_ref()
                .context("media.signing_key")?;
            let store = Arc::new(LocalBlobStore::new(
                settings.media.root.clone(),
                settings.server.public_base_url.clone(),
                storage_adapters::UrlSigner::new(key.expose_secret().as_bytes()),
            ));
            info!(root = %settings.media.root.display(), "local blob store configured");
            let blobs: Arc<dyn BlobStore> = store.clone();
            Ok((blobs, Some(store)))
        }
        #[cfg(not(feature = "media-local"))]
        BlobBackend::Local => bail!("media.backend = \"local\" needs the `media-local` feature"),
        #[cfg(feature = "media-s3")]
        BlobBackend::S3 => {
            let bucket = settings.media.s3_bucket.clone().context("media.s3_bucket")?;
            let public_base = settings
                .media
                .s3_public_base_url
                .clone()
                .context("media.s3_public_base_url")?;
            let store = storage_adapters::blob::S3BlobStore::from_env(
                bucket,
                public_base,
                settings.media.s3_endpoint.as_deref(),
            )
            .await;
            let blobs: Arc<dyn BlobStore> = Arc::new(store);
            Ok((blobs, None))
        }
        #[cfg(not(feature = "media-s3"))]
        BlobBackend::S3 => bail!("media.backend = \"s3\" needs the `media-s3` feature"),
    }
}

fn identity_verifier(settings: &Settings) -> Arc<dyn IdentityVerifier> {
    jwt_verifier(settings).unwrap_or_else(|| {
        warn!("no identity provider configured; every session stays anonymous");
        Arc::new(auth_adapters::DenyAllVerifier)
    })
}

#[cfg(feature = "auth-jwt")]
fn jwt_verifier(settings: &Settings) -> Option<Arc<dyn IdentityVerifier>> {
    let secret = settings.auth.jwt_secret.clone()?;
    let verifier = auth_adapters::JwtVerifier::new(&auth_adapters::JwtSettings {
        secret,
        issuer: settings.auth.issuer.clone(),
        audience: settings.auth.audience.clone(),
        leeway_secs: settings.auth.leeway_secs,
    });
    Some(Arc::new(verifier))
}

#[cfg(not(feature = "auth-jwt"))]
fn jwt_verifier(_settings: &Settings) -> Option<Arc<dyn IdentityVerifier>> {
    None
}

async fn log_persistence_events(mut events: broadcast::Receiver<PersistenceEvent>) {
    loop {
        match events.recv().await {
            Ok(PersistenceEvent::DeleteFailed { ad_id, reason }) => {
                warn!(ad_id = %ad_id, reason = %reason, "background delete failed");
            }
            Ok(PersistenceEvent::ImageCleanupFailed { ad_id, url, reason }) => {
                warn!(ad_id = %ad_id, url = %url, reason = %reason, "image left behind after delete");
            }
            Err(broadcast::error::RecvError::Lagged(skipped)) => {
                warn!(skipped, "persistence event log fell behind");
            }
            Err(broadcast::error::RecvError::Closed) => break,
        }
    }
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        warn!(error = %err, "could not listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    info!("shutting down");
}
