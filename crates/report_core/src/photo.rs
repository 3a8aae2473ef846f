use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use image::{codecs::jpeg::JpegEncoder, imageops::FilterType, DynamicImage};
use shared::domain::{InspectorId, PhotoRef};
use uuid::Uuid;

pub const DEFAULT_MAX_WIDTH: u32 = 1200;
pub const DEFAULT_QUALITY: f32 = 0.8;
const MAX_FILE_NAME_CHARS: usize = 120;
const KEY_NONCE_CHARS: usize = 8;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PhotoSettings {
    pub max_width: u32,
    /// JPEG quality in `0.0..=1.0`.
    pub quality: f32,
}

impl Default for PhotoSettings {
    fn default() -> Self {
        Self {
            max_width: DEFAULT_MAX_WIDTH,
            quality: DEFAULT_QUALITY,
        }
    }
}

#[derive(Debug, Clone)]
pub struct RawImage {
    pub file_name: String,
    pub bytes: Vec<u8>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompressedImage {
    pub file_name: String,
    pub mime_type: &'static str,
    pub width: u32,
    pub height: u32,
    pub bytes: Vec<u8>,
}

#[derive(Debug, Clone)]
pub struct StoredPhoto {
    pub photo_ref: PhotoRef,
    pub owner: InspectorId,
    pub mime_type: String,
    pub bytes: Vec<u8>,
    pub created_at: DateTime<Utc>,
}

#[async_trait]
pub trait ImagePipeline: Send + Sync {
    async fn compress(
        &self,
        raw: RawImage,
        max_width: u32,
        quality: f32,
    ) -> Result<CompressedImage>;
}

#[async_trait]
pub trait PhotoStore: Send + Sync {
    async fn store_photo(&self, owner: InspectorId, image: &CompressedImage) -> Result<PhotoRef>;
    async fn load_photo(&self, photo_ref: &PhotoRef) -> Result<Option<StoredPhoto>>;
}

/// Decodes PNG/JPEG input, scales it down to `max_width` and re-encodes as JPEG.
#[derive(Debug, Clone, Copy, Default)]
pub struct JpegPipeline;

#[async_trait]
impl ImagePipeline for JpegPipeline {
    async fn compress(
        &self,
        raw: RawImage,
        max_width: u32,
        quality: f32,
    ) -> Result<CompressedImage> {
        tokio::task::spawn_blocking(move || compress_jpeg(raw, max_width, quality))
            .await
            .context("image compression task panicked")?
    }
}

fn compress_jpeg(raw: RawImage, max_width: u32, quality: f32) -> Result<CompressedImage> {
    if raw.bytes.is_empty() {
        return Err(anyhow!("image '{}' is empty", raw.file_name));
    }
    if max_width == 0 {
        return Err(anyhow!("max width must be positive"));
    }

    let decoded = image::load_from_memory(&raw.bytes)
        .with_context(|| format!("failed to decode image '{}'", raw.file_name))?;
    let scaled = scale_to_width(decoded, max_width);
    let rgb = scaled.to_rgb8();

    let mut bytes = Vec::new();
    JpegEncoder::new_with_quality(&mut bytes, jpeg_quality(quality))
        .encode_image(&rgb)
        .with_context(|| format!("failed to encode '{}' as jpeg", raw.file_name))?;

    Ok(CompressedImage {
        file_name: raw.file_name,
        mime_type: "image/jpeg",
        width: rgb.width(),
        height: rgb.height(),
        bytes,
    })
}

fn scale_to_width(image: DynamicImage, max_width: u32) -> DynamicImage {
    if image.width() <= max_width {
        return image;
    }
    let height = (u64::from(image.height()) * u64::from(max_width) / u64::from(image.width()))
        .max(1) as u32;
    image.resize_exact(max_width, height, FilterType::Triangle)
}

fn jpeg_quality(quality: f32) -> u8 {
    (quality.clamp(0.01, 1.0) * 100.0).round() as u8
}

/// Storage key for a new upload: `signalisations/{owner}/{millis}_{nonce}_{file_name}`.
///
/// The nonce keeps keys unique when one inspector sends the same file name twice
/// within a millisecond.
pub fn photo_key(owner: InspectorId, file_name: &str, at: DateTime<Utc>) -> PhotoRef {
    let cleaned: String = file_name
        .rsplit(['/', '\\'])
        .next()
        .unwrap_or_default()
        .chars()
        .filter(|c| !c.is_control())
        .map(|c| if c.is_whitespace() { '_' } else { c })
        .take(MAX_FILE_NAME_CHARS)
        .collect();
    let cleaned = if cleaned.is_empty() {
        "photo.jpg"
    } else {
        cleaned.as_str()
    };
    let nonce = Uuid::new_v4().simple().to_string();
    PhotoRef(format!(
        "signalisations/{owner}/{}_{}_{cleaned}",
        at.timestamp_millis(),
        &nonce[..KEY_NONCE_CHARS]
    ))
}

#[cfg(test)]
#[path = "tests/photo_tests.rs"]
mod tests;
