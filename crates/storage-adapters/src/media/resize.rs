//! # Image resizer
//!
//! Bounded downscale before upload. Images whose longest side is within the
//! limit, animated/vector formats, and anything that fails to decode are
//! passed through untouched.

use std::io::Cursor;

use async_trait::async_trait;
use bytes::Bytes;
use domains::{AppError, MediaProcessor, Result};
use image::codecs::jpeg::JpegEncoder;
use image::imageops::FilterType;
use image::{DynamicImage, ImageFormat, ImageReader};
use mime::Mime;
use tracing::{debug, warn};

#[derive(Debug, Clone, Copy)]
pub struct ResizeOptions {
    /// Longest side in pixels after resizing.
    pub max_dimension: u32,
    /// 1..=100
    pub jpeg_quality: u8,
    /// Run oxipng over re-encoded PNGs.
    pub optimize_png: bool,
}

impl Default for ResizeOptions {
    fn default() -> Self {
        Self {
            max_dimension: 1600,
            jpeg_quality: 82,
            optimize_png: true,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct ImageResizer {
    options: ResizeOptions,
}

impl ImageResizer {
    pub fn new(options: ResizeOptions) -> Self {
        Self { options }
    }
}

#[async_trait]
impl MediaProcessor for ImageResizer {
    async fn prepare(&self, data: Bytes, media_type: Mime) -> Result<(Bytes, Mime)> {
        let options = self.options;
        tokio::task::spawn_blocking(move || resize_blocking(data, media_type, options))
            .await
            .map_err(|e| AppError::Internal(format!("resize task failed: {e}")))
    }
}

fn passes_through(media_type: &Mime) -> bool {
    matches!(media_type.subtype().as_str(), "gif" | "svg")
}

fn resize_blocking(data: Bytes, media_type: Mime, options: ResizeOptions) -> (Bytes, Mime) {
    if passes_through(&media_type) {
        return (data, media_type);
    }

    let decoded = ImageReader::new(Cursor::new(&data[..]))
        .with_guessed_format()
        .ok()
        .and_then(|reader| reader.decode().ok());
    let Some(img) = decoded else {
        debug!(media_type = %media_type, "image not decodable, uploading as-is");
        return (data, media_type);
    };

    let (width, height) = (img.width(), img.height());
    if width.max(height) <= options.max_dimension {
        return (data, media_type);
    }

    // `resize` keeps the aspect ratio and fits inside the bounding box.
    let resized = img.resize(options.max_dimension, options.max_dimension, FilterType::Lanczos3);
    debug!(
        from_w = width,
        from_h = height,
        to_w = resized.width(),
        to_h = resized.height(),
        "image downscaled"
    );

    let keep_png = media_type == mime::IMAGE_PNG || resized.color().has_alpha();
    let encoded = if keep_png {
        encode_png(&resized, options.optimize_png).map(|bytes| (bytes, mime::IMAGE_PNG))
    } else {
        encode_jpeg(&resized, options.jpeg_quality).map(|bytes| (bytes, mime::IMAGE_JPEG))
    };

    match encoded {
        Ok((bytes, media_type)) => (Bytes::from(bytes), media_type),
        Err(err) => {
            warn!(error = %err, "re-encoding failed, uploading original");
            (data, media_type)
        }
    }
}

fn encode_jpeg(img: &DynamicImage, quality: u8) -> image::ImageResult<Vec<u8>> {
    let mut buf = Vec::new();
    let encoder = JpegEncoder::new_with_quality(&mut buf, quality.clamp(1, 100));
    DynamicImage::ImageRgb8(img.to_rgb8()).write_with_encoder(encoder)?;
    Ok(buf)
}

fn encode_png(img: &DynamicImage, optimize: bool) -> image::ImageResult<Vec<u8>> {
    let mut buf = Vec::new();
    img.write_to(&mut Cursor::new(&mut buf), ImageFormat::Png)?;
    if !optimize {
        return Ok(buf);
    }
    match oxipng::optimize_from_memory(&buf, &oxipng::Options::from_preset(2)) {
        Ok(optimized) => Ok(optimized),
        Err(err) => {
            warn!(error = %err, "oxipng failed, keeping unoptimized PNG");
            Ok(buf)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{ImageBuffer, Rgb, Rgba};

    fn png_bytes(width: u32, height: u32) -> Bytes {
        let img = ImageBuffer::from_pixel(width, height, Rgba([10u8, 20, 30, 255]));
        let mut buf = Vec::new();
        DynamicImage::ImageRgba8(img)
            .write_to(&mut Cursor::new(&mut buf), ImageFormat::Png)
            .unwrap();
        Bytes::from(buf)
    }

    fn jpeg_bytes(width: u32, height: u32) -> Bytes {
        let img = ImageBuffer::from_pixel(width, height, Rgb([200u8, 100, 50]));
        let mut buf = Vec::new();
        DynamicImage::ImageRgb8(img)
            .write_to(&mut Cursor::new(&mut buf), ImageFormat::Jpeg)
            .unwrap();
        Bytes::from(buf)
    }

    fn small_limit() -> ImageResizer {
        ImageResizer::new(ResizeOptions {
            max_dimension: 64,
            jpeg_quality: 80,
            optimize_png: false,
        })
    }

    #[tokio::test]
    async fn test_small_images_are_untouched() {
        let data = jpeg_bytes(32, 16);
        let (out, media_type) = small_limit().prepare(data.clone(), mime::IMAGE_JPEG).await.unwrap();
        assert_eq!(out, data);
        assert_eq!(media_type, mime::IMAGE_JPEG);
    }

    #[tokio::test]
    async fn test_large_jpeg_is_bounded_and_keeps_aspect() {
        let (out, media_type) = small_limit()
            .prepare(jpeg_bytes(256, 128), mime::IMAGE_JPEG)
            .await
            .unwrap();
        assert_eq!(media_type, mime::IMAGE_JPEG);
        let img = image::load_from_memory(&out).unwrap();
        assert_eq!((img.width(), img.height()), (64, 32));
    }

    #[tokio::test]
    async fn test_png_stays_png() {
        let (out, media_type) = small_limit()
            .prepare(png_bytes(100, 200), mime::IMAGE_PNG)
            .await
            .unwrap();
        assert_eq!(media_type, mime::IMAGE_PNG);
        let img = image::load_from_memory(&out).unwrap();
        assert_eq!(img.height(), 64);
    }

    #[tokio::test]
    async fn test_undecodable_bytes_pass_through() {
        let data = Bytes::from_static(b"not an image");
        let (out, media_type) = small_limit().prepare(data.clone(), mime::IMAGE_JPEG).await.unwrap();
        assert_eq!(out, data);
        assert_eq!(media_type, mime::IMAGE_JPEG);
    }
}
