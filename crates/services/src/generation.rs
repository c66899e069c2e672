//! # Ad Generation Client
//!
//! One request per call, no retries. Every failure comes back as
//! [`GenerationOutcome::Failed`] so callers can render it inline.

use std::sync::Arc;

use domains::{
    AdType, AppError, EmbeddedImage, GenerationBackend, GenerationInput, GenerationOutcome,
    MediaProcessor,
};
use tracing::{info, warn};

#[derive(Clone)]
pub struct GenerationService {
    backend: Arc<dyn GenerationBackend>,
    processor: Option<Arc<dyn MediaProcessor>>,
}

impl GenerationService {
    pub fn new(backend: Arc<dyn GenerationBackend>) -> Self {
        Self { backend, processor: None }
    }

    /// Shrinks photos before they are sent to the runtime.
    pub fn with_processor(mut self, processor: Arc<dyn MediaProcessor>) -> Self {
        self.processor = Some(processor);
        self
    }

    pub async fn generate(&self, kind: AdType, input: GenerationInput) -> GenerationOutcome {
        match self.try_generate(kind, input).await {
            Ok(outcome) => outcome,
            Err(err) => {
                warn!(kind = %kind, error = %err, "ad generation failed");
                GenerationOutcome::Failed {
                    error: failure_message(&err),
                    retryable: !matches!(err, AppError::ValidationError(_)),
                }
            }
        }
    }

    async fn try_generate(
        &self,
        kind: AdType,
        input: GenerationInput,
    ) -> Result<GenerationOutcome, AppError> {
        input.validate_for(kind)?;
        let input = self.shrink(input).await?;

        let generated = self.backend.run(kind, &input).await?;
        if generated.title.trim().is_empty() || generated.ad_text.trim().is_empty() {
            return Err(AppError::Generation("runtime returned an empty ad".into()));
        }
        info!(kind = %kind, flow = kind.flow_name(), "ad generated");
        Ok(generated.into())
    }

    async fn shrink(&self, mut input: GenerationInput) -> Result<GenerationInput, AppError> {
        let Some(processor) = &self.processor else {
            return Ok(input);
        };
        let mut images = Vec::with_capacity(input.images.len());
        for raw in input.images {
            let image = EmbeddedImage::parse(&raw)?;
            let (data, media_type) = processor.prepare(image.data, image.media_type).await?;
            images.push(EmbeddedImage { media_type, data }.to_data_url());
        }
        input.images = images;
        Ok(input)
    }
}

/// Text shown to the user; validation problems are actionable, the rest is not.
fn failure_message(err: &AppError) -> String {
    match err {
        AppError::ValidationError(msg) => msg.clone(),
        _ => "The ad could not be generated right now. Please try again.".to_string(),
    }
}
