//! S3-compatible blob store. Objects are served from a public base URL
//! (bucket website or CDN) in front of the bucket.

use async_trait::async_trait;
use aws_sdk_s3::primitives::ByteStream;
use aws_sdk_s3::Client;
use bytes::Bytes;
use domains::{BlobError, BlobStore};
use mime::Mime;
use tracing::{debug, info};

use super::{is_safe_path, path_under};

pub struct S3BlobStore {
    client: Client,
    bucket: String,
    public_base: String,
}

impl S3BlobStore {
    pub fn new(client: Client, bucket: impl Into<String>, public_base: impl Into<String>) -> Self {
        Self {
            client,
            bucket: bucket.into(),
            public_base: public_base.into().trim_end_matches('/').to_string(),
        }
    }

    /// Builds a client from the ambient AWS configuration chain.
    pub async fn from_env(
        bucket: impl Into<String>,
        public_base: impl Into<String>,
        endpoint: Option<&str>,
    ) -> Self {
        let mut loader = aws_config::defaults(aws_config::BehaviorVersion::latest());
        if let Some(endpoint) = endpoint {
            loader = loader.endpoint_url(endpoint);
        }
        let shared = loader.load().await;
        let conf = aws_sdk_s3::config::Builder::from(&shared)
            .force_path_style(endpoint.is_some())
            .build();
        let bucket = bucket.into();
        info!(bucket = %bucket, "S3 blob store configured");
        Self::new(Client::from_conf(conf), bucket, public_base)
    }
}

#[async_trait]
impl BlobStore for S3BlobStore {
    async fn put(&self, path: &str, data: Bytes, media_type: &Mime) -> Result<String, BlobError> {
        if !is_safe_path(path) {
            return Err(BlobError::Backend(format!("unsafe path {path:?}")));
        }
        self.client
            .put_object()
            .bucket(&self.bucket)
            .key(path)
            .content_type(media_type.essence_str())
            .body(ByteStream::from(data))
            .send()
            .await
            .map_err(|e| BlobError::Backend(format!("put_object: {e}")))?;
        debug!(bucket = %self.bucket, key = %path, "object stored");
        Ok(format!("{}/{}", self.public_base, path))
    }

    async fn delete(&self, path: &str) -> Result<(), BlobError> {
        // S3 deletes are idempotent; a missing key also succeeds.
        self.client
            .delete_object()
            .bucket(&self.bucket)
            .key(path)
            .send()
            .await
            .map_err(|e| BlobError::Backend(format!("delete_object: {e}")))?;
        Ok(())
    }

    fn locate(&self, url: &str) -> Option<String> {
        path_under(&self.public_base, url)
    }
}
