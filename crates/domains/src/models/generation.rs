use serde::{Deserialize, Serialize};

use crate::errors::AppError;
use crate::models::ad::AdType;
use crate::models::image::ImageRef;

pub const MAX_GENERATION_IMAGES: usize = 10;
pub const MAX_DESCRIPTION_CHARS: usize = 4_000;

/// What a category's generation flow accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputShape {
    ImagesOnly,
    TextOnly,
    ImagesAndText,
}

impl AdType {
    pub fn input_shape(&self) -> InputShape {
        match self {
            AdType::Sale | AdType::Item => InputShape::ImagesOnly,
            AdType::Wanted | AdType::Service => InputShape::TextOnly,
            AdType::RealEstate => InputShape::ImagesAndText,
        }
    }

    /// Name of the flow on the hosted generation runtime.
    pub fn flow_name(&self) -> &'static str {
        match self {
            AdType::Sale => "vehicleSaleAdFlow",
            AdType::Wanted => "wantedAdFlow",
            AdType::Item => "itemAdFlow",
            AdType::Service => "serviceAdFlow",
            AdType::RealEstate => "realEstateAdFlow",
        }
    }
}

/// User-supplied material for a generation request.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerationInput {
    /// Embedded `data:` images.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub images: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl GenerationInput {
    /// Checks the input against the shape the category's flow expects.
    pub fn validate_for(&self, kind: AdType) -> Result<(), AppError> {
        let shape = kind.input_shape();
        let wants_images = matches!(shape, InputShape::ImagesOnly | InputShape::ImagesAndText);
        let wants_text = matches!(shape, InputShape::TextOnly | InputShape::ImagesAndText);
        let text = self.description.as_deref().map(str::trim).unwrap_or("");

        if wants_images {
            if self.images.is_empty() {
                return Err(AppError::ValidationError(format!(
                    "{kind} ads need at least one photo"
                )));
            }
            if self.images.len() > MAX_GENERATION_IMAGES {
                return Err(AppError::ValidationError(format!(
                    "at most {MAX_GENERATION_IMAGES} photos per request"
                )));
            }
            if let Some(pos) = self
                .images
                .iter()
                .position(|raw| !ImageRef::classify(raw).is_embedded())
            {
                return Err(AppError::ValidationError(format!(
                    "photo {pos} must be an embedded data URL"
                )));
            }
        } else if !self.images.is_empty() {
            return Err(AppError::ValidationError(format!(
                "{kind} ads are generated from a description only"
            )));
        }

        if wants_text {
            if text.is_empty() {
                return Err(AppError::ValidationError(format!(
                    "{kind} ads need a description"
                )));
            }
            if text.chars().count() > MAX_DESCRIPTION_CHARS {
                return Err(AppError::ValidationError(format!(
                    "description exceeds {MAX_DESCRIPTION_CHARS} characters"
                )));
            }
        } else if !text.is_empty() {
            return Err(AppError::ValidationError(format!(
                "{kind} ads are generated from photos only"
            )));
        }
        Ok(())
    }
}

/// Structured result of a generation flow.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GeneratedAd {
    pub title: String,
    pub ad_text: String,
}

/// What callers receive from a generation request. Failures are values.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum GenerationOutcome {
    Generated { title: String, body: String },
    /// `retryable` is false when the input itself was rejected.
    Failed {
        error: String,
        #[serde(default)]
        retryable: bool,
    },
}

impl GenerationOutcome {
    pub fn is_generated(&self) -> bool {
        matches!(self, GenerationOutcome::Generated { .. })
    }
}

impl From<GeneratedAd> for GenerationOutcome {
    fn from(ad: GeneratedAd) -> Self {
        GenerationOutcome::Generated {
            title: ad.title,
            body: ad.ad_text,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PHOTO: &str = "data:image/jpeg;base64,/9j/4AAQ";

    #[test]
    fn test_image_only_kinds_reject_text() {
        let input = GenerationInput {
            images: vec![PHOTO.into()],
            description: Some("red car".into()),
        };
        assert!(input.validate_for(AdType::Sale).is_err());
        let input = GenerationInput {
            images: vec![PHOTO.into()],
            description: None,
        };
        assert!(input.validate_for(AdType::Item).is_ok());
    }

    #[test]
    fn test_text_only_kinds_reject_images() {
        let input = GenerationInput {
            images: vec![PHOTO.into()],
            description: Some("Looking for a bike".into()),
        };
        assert!(input.validate_for(AdType::Wanted).is_err());
    }

    #[test]
    fn test_real_estate_needs_both() {
        let only_text = GenerationInput {
            images: vec![],
            description: Some("2 bed flat".into()),
        };
        assert!(only_text.validate_for(AdType::RealEstate).is_err());
        let both = GenerationInput {
            images: vec![PHOTO.into()],
            description: Some("2 bed flat".into()),
        };
        assert!(both.validate_for(AdType::RealEstate).is_ok());
    }

    #[test]
    fn test_permanent_urls_are_not_generation_input() {
        let input = GenerationInput {
            images: vec!["https://storage/x.jpg".into()],
            description: None,
        };
        assert!(input.validate_for(AdType::Item).is_err());
    }

    #[test]
    fn test_outcome_wire_shape() {
        let ok: GenerationOutcome = GeneratedAd {
            title: "T".into(),
            ad_text: "B".into(),
        }
        .into();
        assert_eq!(serde_json::to_value(&ok).unwrap(), serde_json::json!({"title": "T", "body": "B"}));
        let failed = GenerationOutcome::Failed {
            error: "down".into(),
            retryable: true,
        };
        assert_eq!(
            serde_json::to_value(&failed).unwrap(),
            serde_json::json!({"error": "down", "retryable": true})
        );
    }
}
