//! # configs
//!
//! Layered settings: `config/default.toml`, then `config/<ADCRAFT_ENV>.toml`,
//! then `ADCRAFT__SECTION__KEY` environment variables. A `.env` file is read
//! first so local development can keep secrets out of the TOML files.

use std::path::PathBuf;

use config::{Config, Environment, File};
use secrecy::SecretString;
use serde::Deserialize;
use thiserror::Error;
use tracing::debug;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to load configuration: {0}")]
    Load(#[from] config::ConfigError),

    #[error("missing setting `{0}` required by the selected backend")]
    Missing(&'static str),

    #[error("invalid setting `{0}`: {1}")]
    Invalid(&'static str, String),
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct Settings {
    pub server: ServerSettings,
    pub log: LogSettings,
    pub storage: StorageSettings,
    pub media: MediaSettings,
    pub auth: AuthSettings,
    pub generation: GenerationSettings,
    pub drafts: DraftSettings,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerSettings {
    pub host: String,
    pub port: u16,
    /// Origin used when building media URLs served by this process.
    pub public_base_url: String,
    /// Allowed browser origins; empty allows any.
    pub cors_origins: Vec<String>,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".into(),
            port: 8080,
            public_base_url: "http://127.0.0.1:8080".into(),
            cors_origins: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Copy, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LogSettings {
    /// `tracing-subscriber` env-filter directive; `RUST_LOG` wins when set.
    pub filter: String,
    pub format: LogFormat,
}

impl Default for LogSettings {
    fn default() -> Self {
        Self {
            filter: "info".into(),
            format: LogFormat::Pretty,
        }
    }
}

#[derive(Debug, Clone, Copy, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum KvBackend {
    #[default]
    Memory,
    Redis,
}

#[derive(Debug, Clone, Copy, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum DocumentBackend {
    #[default]
    Memory,
    Postgres,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct StorageSettings {
    pub kv: KvBackend,
    pub redis_url: Option<SecretString>,
    pub redis_prefix: String,
    pub documents: DocumentBackend,
    pub database_url: Option<SecretString>,
    pub max_connections: u32,
    pub run_migrations: bool,
}

impl Default for StorageSettings {
    fn default() -> Self {
        Self {
            kv: KvBackend::Memory,
            redis_url: None,
            redis_prefix: "adcraft".into(),
            documents: DocumentBackend::Memory,
            database_url: None,
            max_connections: 10,
            run_migrations: true,
        }
    }
}

#[derive(Debug, Clone, Copy, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum BlobBackend {
    #[default]
    Memory,
    Local,
    S3,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct MediaSettings {
    pub backend: BlobBackend,
    /// Upload root for the local backend.
    pub root: PathBuf,
    /// HMAC key for local download URLs.
    pub signing_key: Option<SecretString>,
    pub s3_bucket: Option<String>,
    pub s3_public_base_url: Option<String>,
    pub s3_endpoint: Option<String>,
    pub max_dimension: u32,
    pub jpeg_quality: u8,
    pub optimize_png: bool,
}

impl Default for MediaSettings {
    fn default() -> Self {
        Self {
            backend: BlobBackend::Memory,
            root: PathBuf::from("./data/uploads"),
            signing_key: None,
            s3_bucket: None,
            s3_public_base_url: None,
            s3_endpoint: None,
            max_dimension: 1600,
            jpeg_quality: 82,
            optimize_png: true,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct AuthSettings {
    /// HS256 secret; sign-in is disabled when absent.
    pub jwt_secret: Option<SecretString>,
    pub issuer: Option<String>,
    pub audience: Option<String>,
    pub leeway_secs: u64,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct GenerationSettings {
    pub base_url: String,
    pub api_key: Option<SecretString>,
    pub timeout_secs: u64,
}

impl Default for GenerationSettings {
    fn default() -> Self {
        Self {
            base_url: "http://127.0.0.1:3400".into(),
            api_key: None,
            timeout_secs: 60,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct DraftSettings {
    /// How long a generated draft waits for the editor.
    pub ttl_secs: u64,
}

impl Default for DraftSettings {
    fn default() -> Self {
        Self { ttl_secs: 3600 }
    }
}

impl Settings {
    /// Loads `.env`, the TOML layers and the environment.
    pub fn load() -> Result<Self, ConfigError> {
        if let Ok(path) = dotenvy::dotenv() {
            debug!(path = %path.display(), "loaded .env");
        }
        let env = std::env::var("ADCRAFT_ENV").unwrap_or_else(|_| "development".into());
        let config = Config::builder()
            .add_source(File::with_name("config/default").required(false))
            .add_source(File::with_name(&format!("config/{env}")).required(false))
            .add_source(
                Environment::with_prefix("ADCRAFT")
                    .prefix_separator("__")
                    .separator("__")
                    .list_separator(",")
                    .with_list_parse_key("server.cors_origins")
                    .try_parsing(true),
            )
            .build()?;
        Self::from_config(config)
    }

    pub fn from_config(config: Config) -> Result<Self, ConfigError> {
        let settings: Settings = config.try_deserialize()?;
        settings.validate()?;
        Ok(settings)
    }

    /// Checks that every selected backend has what it needs.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.storage.kv == KvBackend::Redis && self.storage.redis_url.is_none() {
            return Err(ConfigError::Missing("storage.redis_url"));
        }
        if self.storage.documents == DocumentBackend::Postgres && self.storage.database_url.is_none() {
            return Err(ConfigError::Missing("storage.database_url"));
        }
        match self.media.backend {
            BlobBackend::Local if self.media.signing_key.is_none() => {
                return Err(ConfigError::Missing("media.signing_key"));
            }
            BlobBackend::S3 if self.media.s3_bucket.is_none() => {
                return Err(ConfigError::Missing("media.s3_bucket"));
            }
            BlobBackend::S3 if self.media.s3_public_base_url.is_none() => {
                return Err(ConfigError::Missing("media.s3_public_base_url"));
            }
            _ => {}
        }
        if !(1..=100).contains(&self.media.jpeg_quality) {
            return Err(ConfigError::Invalid(
                "media.jpeg_quality",
                format!("{} is outside 1..=100", self.media.jpeg_quality),
            ));
        }
        if self.media.max_dimension < 64 {
            return Err(ConfigError::Invalid(
                "media.max_dimension",
                "must be at least 64 pixels".into(),
            ));
        }
        Ok(())
    }

    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }
}
