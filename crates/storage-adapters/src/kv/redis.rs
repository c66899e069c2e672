//! Redis-backed key/value store for multi-instance deployments.

use std::time::Duration;

use async_trait::async_trait;
use deadpool_redis::redis::AsyncCommands;
use deadpool_redis::{Config, Pool, Runtime};
use domains::{AppError, KeyValueStore, Result};
use tracing::info;

pub struct RedisKeyValueStore {
    pool: Pool,
    prefix: String,
}

impl RedisKeyValueStore {
    pub fn connect(redis_url: &str, prefix: impl Into<String>) -> Result<Self> {
        let pool = Config::from_url(redis_url)
            .create_pool(Some(Runtime::Tokio1))
            .map_err(|e| AppError::Storage(format!("failed to create Redis pool: {e}")))?;
        info!("Redis key/value store configured");
        Ok(Self {
            pool,
            prefix: prefix.into(),
        })
    }

    fn key(&self, key: &str) -> String {
        format!("{}:{}", self.prefix, key)
    }

    async fn conn(&self) -> Result<deadpool_redis::Connection> {
        self.pool
            .get()
            .await
            .map_err(|e| AppError::Storage(format!("redis pool: {e}")))
    }
}

fn storage_err(err: deadpool_redis::redis::RedisError) -> AppError {
    AppError::Storage(format!("redis: {err}"))
}

#[async_trait]
impl KeyValueStore for RedisKeyValueStore {
    async fn get(&self, key: &str) -> Result<Option<String>> {
        let mut conn = self.conn().await?;
        conn.get(self.key(key)).await.map_err(storage_err)
    }

    async fn set(&self, key: &str, value: String, ttl: Option<Duration>) -> Result<()> {
        let mut conn = self.conn().await?;
        match ttl {
            Some(ttl) => conn
                .set_ex::<_, _, ()>(self.key(key), value, ttl.as_secs().max(1))
                .await
                .map_err(storage_err),
            None => conn
                .set::<_, _, ()>(self.key(key), value)
                .await
                .map_err(storage_err),
        }
    }

    async fn remove(&self, key: &str) -> Result<()> {
        let mut conn = self.conn().await?;
        conn.del::<_, ()>(self.key(key)).await.map_err(storage_err)
    }
}
