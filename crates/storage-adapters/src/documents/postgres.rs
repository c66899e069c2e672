//! # Postgres document store
//!
//! Each ad is one JSONB document keyed by `(user_id, id)`. Merge writes use
//! JSONB concatenation so fields missing from the incoming document keep
//! their stored values.

use async_trait::async_trait;
use domains::{Ad, AdId, AppError, DocumentStore, Result, UserId};
use sqlx::postgres::{PgPool, PgPoolOptions};
use sqlx::types::Json;
use tracing::{debug, info};

pub struct PostgresDocumentStore {
    pool: PgPool,
}

fn storage_err(err: sqlx::Error) -> AppError {
    AppError::Storage(format!("postgres: {err}"))
}

impl PostgresDocumentStore {
    pub async fn connect(database_url: &str, max_connections: u32) -> Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .connect(database_url)
            .await
            .map_err(storage_err)?;
        info!(max_connections, "connected to Postgres");
        Ok(Self { pool })
    }

    pub fn from_pool(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Applies the bundled schema migrations.
    pub async fn migrate(&self) -> Result<()> {
        sqlx::migrate!("./migrations")
            .run(&self.pool)
            .await
            .map_err(|e| AppError::Storage(format!("migration failed: {e}")))
    }
}

const UPSERT_MERGE: &str = "INSERT INTO ads (user_id, id, doc, updated_at) VALUES ($1, $2, $3, now()) \
     ON CONFLICT (user_id, id) DO UPDATE SET doc = ads.doc || EXCLUDED.doc, updated_at = now() \
     RETURNING doc";

const UPSERT_REPLACE: &str = "INSERT INTO ads (user_id, id, doc, updated_at) VALUES ($1, $2, $3, now()) \
     ON CONFLICT (user_id, id) DO UPDATE SET doc = EXCLUDED.doc, updated_at = now()";

#[async_trait]
impl DocumentStore for PostgresDocumentStore {
    async fn get(&self, user: &UserId, id: &AdId) -> Result<Option<Ad>> {
        debug!(user = %user, ad_id = %id, "fetching ad document");
        let doc: Option<Json<Ad>> =
            sqlx::query_scalar("SELECT doc FROM ads WHERE user_id = $1 AND id = $2")
                .bind(user.as_str())
                .bind(id.as_str())
                .fetch_optional(&self.pool)
                .await
                .map_err(storage_err)?;
        Ok(doc.map(|Json(ad)| ad))
    }

    async fn list(&self, user: &UserId) -> Result<Vec<Ad>> {
        let docs: Vec<Json<Ad>> =
            sqlx::query_scalar("SELECT doc FROM ads WHERE user_id = $1 ORDER BY updated_at DESC")
                .bind(user.as_str())
                .fetch_all(&self.pool)
                .await
                .map_err(storage_err)?;
        Ok(docs.into_iter().map(|Json(ad)| ad).collect())
    }

    async fn merge(&self, user: &UserId, ad: &Ad) -> Result<Ad> {
        let Json(stored): Json<Ad> = sqlx::query_scalar(UPSERT_MERGE)
            .bind(user.as_str())
            .bind(ad.id.as_str())
            .bind(Json(ad))
            .fetch_one(&self.pool)
            .await
            .map_err(storage_err)?;
        Ok(stored)
    }

    async fn delete(&self, user: &UserId, id: &AdId) -> Result<bool> {
        let result = sqlx::query("DELETE FROM ads WHERE user_id = $1 AND id = $2")
            .bind(user.as_str())
            .bind(id.as_str())
            .execute(&self.pool)
            .await
            .map_err(storage_err)?;
        Ok(result.rows_affected() > 0)
    }

    /// All rows in one transaction, so a failure leaves no partial set behind.
    async fn commit_batch(&self, user: &UserId, ads: &[Ad]) -> Result<()> {
        let mut tx = self.pool.begin().await.map_err(storage_err)?;

        for ad in ads {
            sqlx::query(UPSERT_REPLACE)
                .bind(user.as_str())
                .bind(ad.id.as_str())
                .bind(Json(ad))
                .execute(&mut *tx)
                .await
                .map_err(storage_err)?;
        }

        tx.commit().await.map_err(storage_err)?;
        info!(user = %user, count = ads.len(), "ad batch committed");
        Ok(())
    }
}
