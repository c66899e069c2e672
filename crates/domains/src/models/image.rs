//! Image entries of an ad: either inline `data:` URLs awaiting upload or
//! permanent `http(s)` retrieval URLs handed out by a blob store. URL schemes
//! compare case-insensitively.

use base64::Engine;
use bytes::Bytes;
use mime::Mime;

use crate::errors::AppError;

const DATA_URL_PREFIX: &str = "data:";
const PERMANENT_SCHEMES: [&str; 2] = ["https://", "http://"];
const BASE64_MARKER: &str = ";base64";

/// Borrowed classification of one `images` entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageRef<'a> {
    Embedded(&'a str),
    Permanent(&'a str),
    /// Neither a data URL nor an `http(s)` URL.
    Unrecognized(&'a str),
}

impl<'a> ImageRef<'a> {
    pub fn classify(raw: &'a str) -> Self {
        if has_prefix_ignore_case(raw, DATA_URL_PREFIX) {
            ImageRef::Embedded(raw)
        } else if PERMANENT_SCHEMES
            .iter()
            .any(|scheme| has_prefix_ignore_case(raw, scheme))
        {
            ImageRef::Permanent(raw)
        } else {
            ImageRef::Unrecognized(raw)
        }
    }

    pub fn is_embedded(&self) -> bool {
        matches!(self, ImageRef::Embedded(_))
    }
}

/// Checks every entry of an `images` list, naming the first bad position.
pub fn validate_images(images: &[String]) -> Result<(), AppError> {
    match images
        .iter()
        .position(|raw| matches!(ImageRef::classify(raw), ImageRef::Unrecognized(_)))
    {
        Some(pos) => Err(AppError::ValidationError(format!(
            "image {pos} is neither a data URL nor an http(s) URL"
        ))),
        None => Ok(()),
    }
}

fn has_prefix_ignore_case(raw: &str, prefix: &str) -> bool {
    raw.get(..prefix.len())
        .is_some_and(|head| head.eq_ignore_ascii_case(prefix))
}

/// A decoded `data:<media-type>;base64,<payload>` image.
#[derive(Debug, Clone, PartialEq)]
pub struct EmbeddedImage {
    pub media_type: Mime,
    pub data: Bytes,
}

impl EmbeddedImage {
    pub fn parse(raw: &str) -> Result<Self, AppError> {
        if !has_prefix_ignore_case(raw, DATA_URL_PREFIX) {
            return Err(AppError::ValidationError("image is not a data URL".into()));
        }
        let rest = &raw[DATA_URL_PREFIX.len()..];
        let (header, payload) = rest
            .split_once(',')
            .ok_or_else(|| AppError::ValidationError("data URL has no payload".into()))?;
        let media_type = header.strip_suffix(BASE64_MARKER).ok_or_else(|| {
            AppError::ValidationError("only base64 data URLs are supported".into())
        })?;
        let media_type: Mime = media_type
            .parse()
            .map_err(|_| AppError::ValidationError(format!("bad media type {media_type:?}")))?;
        if media_type.type_() != mime::IMAGE {
            return Err(AppError::ValidationError(format!(
                "{media_type} is not an image type"
            )));
        }
        let data = base64::engine::general_purpose::STANDARD
            .decode(payload.trim())
            .map_err(|e| AppError::ValidationError(format!("invalid base64 payload: {e}")))?;
        if data.is_empty() {
            return Err(AppError::ValidationError("image payload is empty".into()));
        }
        Ok(Self {
            media_type,
            data: Bytes::from(data),
        })
    }

    pub fn extension(&self) -> String {
        extension_for(&self.media_type)
    }

    pub fn to_data_url(&self) -> String {
        format!(
            "{DATA_URL_PREFIX}{}{BASE64_MARKER},{}",
            self.media_type.essence_str(),
            base64::engine::general_purpose::STANDARD.encode(&self.data)
        )
    }
}

/// File extension for a stored image, derived from its declared media type.
pub fn extension_for(media_type: &Mime) -> String {
    if media_type.type_() != mime::IMAGE {
        return "bin".to_string();
    }
    match media_type.subtype().as_str() {
        "jpeg" | "jpg" | "pjpeg" => "jpg".to_string(),
        "svg" => "svg".to_string(),
        other if !other.is_empty() && other.chars().all(|c| c.is_ascii_alphanumeric()) => {
            other.to_ascii_lowercase()
        }
        _ => "bin".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify() {
        assert!(ImageRef::classify("data:image/png;base64,AAAA").is_embedded());
        assert!(!ImageRef::classify("https://storage/x.jpg").is_embedded());
    }

    #[test]
    fn test_classify_ignores_scheme_case() {
        let upper = "DATA:image/jpeg;base64,/9j/4AAQ";
        assert_eq!(ImageRef::classify(upper), ImageRef::Embedded(upper));
        assert!(matches!(
            ImageRef::classify("HTTPS://storage/x.jpg"),
            ImageRef::Permanent(_)
        ));
        assert_eq!(EmbeddedImage::parse(upper).unwrap().media_type, mime::IMAGE_JPEG);
    }

    #[test]
    fn test_unrecognized_entries_fail_validation() {
        assert_eq!(ImageRef::classify("not a url"), ImageRef::Unrecognized("not a url"));
        assert!(matches!(ImageRef::classify("ftp://x/a.jpg"), ImageRef::Unrecognized(_)));
        assert!(matches!(ImageRef::classify("dat"), ImageRef::Unrecognized(_)));

        let images = vec!["https://storage/x.jpg".to_string(), "not a url".to_string()];
        let err = validate_images(&images).unwrap_err();
        assert!(matches!(err, AppError::ValidationError(msg) if msg.contains("image 1")));
        assert!(validate_images(&images[..1]).is_ok());
    }

    #[test]
    fn test_parse_data_url() {
        let img = EmbeddedImage::parse("data:image/jpeg;base64,/9j/4AAQ").unwrap();
        assert_eq!(img.media_type, mime::IMAGE_JPEG);
        assert_eq!(img.extension(), "jpg");
        assert_eq!(&img.data[..3], &[0xff, 0xd8, 0xff]);
    }

    #[test]
    fn test_parse_rejects_non_base64_and_non_images() {
        assert!(EmbeddedImage::parse("data:image/png,rawbytes").is_err());
        assert!(EmbeddedImage::parse("data:text/plain;base64,aGVsbG8=").is_err());
        assert!(EmbeddedImage::parse("https://storage/x.jpg").is_err());
    }

    #[test]
    fn test_extension_for_media_types() {
        assert_eq!(extension_for(&mime::IMAGE_PNG), "png");
        assert_eq!(extension_for(&"image/webp".parse().unwrap()), "webp");
        assert_eq!(extension_for(&"image/svg+xml".parse().unwrap()), "svg");
        assert_eq!(extension_for(&mime::APPLICATION_OCTET_STREAM), "bin");
    }

    #[test]
    fn test_data_url_roundtrip_keeps_media_type() {
        let img = EmbeddedImage::parse("data:image/png;base64,iVBORw0K").unwrap();
        assert!(img.to_data_url().starts_with("data:image/png;base64,"));
    }
}
