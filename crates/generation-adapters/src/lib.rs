//! # generation-adapters
//!
//! HTTP client for the hosted prompt/flow runtime. Each ad category maps to
//! one flow; a flow is invoked with `POST <base>/<flow>` and a
//! `{"data": ...}` body and answers with `{"result": ...}` or `{"error": ...}`.

use std::time::Duration;

use async_trait::async_trait;
use domains::{AdType, AppError, GeneratedAd, GenerationBackend, GenerationInput, Result};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, warn};

#[derive(Debug, Clone)]
pub struct FlowClientSettings {
    pub base_url: String,
    pub api_key: Option<SecretString>,
    pub timeout: Duration,
}

pub struct FlowClient {
    http: reqwest::Client,
    base_url: String,
    api_key: Option<SecretString>,
}

#[derive(Serialize)]
struct FlowRequest<'a> {
    data: &'a GenerationInput,
}

#[derive(Deserialize)]
struct FlowResponse {
    #[serde(default)]
    result: Option<GeneratedAd>,
    #[serde(default)]
    error: Option<Value>,
}

impl FlowClient {
    pub fn new(settings: &FlowClientSettings) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(settings.timeout)
            .build()
            .map_err(|e| AppError::Internal(format!("http client: {e}")))?;
        Ok(Self {
            http,
            base_url: settings.base_url.trim_end_matches('/').to_string(),
            api_key: settings.api_key.clone(),
        })
    }

    fn flow_url(&self, kind: AdType) -> String {
        format!("{}/{}", self.base_url, kind.flow_name())
    }
}

fn describe_error(error: &Value) -> String {
    match error {
        Value::String(msg) => msg.clone(),
        Value::Object(obj) => obj
            .get("message")
            .and_then(Value::as_str)
            .map(str::to_string)
            .unwrap_or_else(|| error.to_string()),
        other => other.to_string(),
    }
}

#[async_trait]
impl GenerationBackend for FlowClient {
    async fn run(&self, kind: AdType, input: &GenerationInput) -> Result<GeneratedAd> {
        let url = self.flow_url(kind);
        debug!(url = %url, images = input.images.len(), "calling generation flow");

        let mut request = self.http.post(&url).json(&FlowRequest { data: input });
        if let Some(key) = &self.api_key {
            request = request.bearer_auth(key.expose_secret());
        }

        let response = request
            .send()
            .await
            .map_err(|e| AppError::Generation(format!("runtime unreachable: {e}")))?;
        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| AppError::Generation(format!("reading response: {e}")))?;

        let parsed: Option<FlowResponse> = serde_json::from_str(&body).ok();
        if !status.is_success() {
            let detail = parsed
                .and_then(|r| r.error)
                .map(|e| describe_error(&e))
                .unwrap_or_else(|| status.to_string());
            warn!(url = %url, %status, "generation flow failed");
            return Err(AppError::Generation(detail));
        }

        match parsed {
            Some(FlowResponse { error: Some(error), .. }) => {
                Err(AppError::Generation(describe_error(&error)))
            }
            Some(FlowResponse { result: Some(ad), .. }) => Ok(ad),
            _ => Err(AppError::Generation("malformed runtime response".into())),
        }
    }
}
