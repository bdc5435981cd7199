//! Image codec adapter
//!
//! Decoding goes through the `image` crate so any supported container
//! (PNG, JPEG, TIFF, WebP) is accepted. Encoding always produces lossy
//! WebP via libwebp, since that is the only sticker delivery format.

use crate::config::{StickerConfig, DEFAULT_WEBP_METHOD, DEFAULT_WEBP_QUALITY};
use crate::error::{Result, StickerError};
use image::RgbaImage;
use log::debug;

/// Lossy WebP encoder settings
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WebPSettings {
    /// Quality factor, 0-100
    pub quality: u8,
    /// Compression effort, 0 (fast) to 6 (slowest, smallest)
    pub method: u8,
}

impl Default for WebPSettings {
    fn default() -> Self {
        Self {
            quality: DEFAULT_WEBP_QUALITY,
            method: DEFAULT_WEBP_METHOD,
        }
    }
}

impl From<&StickerConfig> for WebPSettings {
    fn from(config: &StickerConfig) -> Self {
        Self {
            quality: config.webp_quality,
            method: config.webp_method,
        }
    }
}

/// Decode arbitrary image bytes into an RGBA raster
///
/// # Errors
/// - Empty input
/// - Unrecognized or corrupt image data
pub fn decode_rgba(bytes: &[u8]) -> Result<RgbaImage> {
    if bytes.is_empty() {
        return Err(StickerError::decode("input is empty"));
    }

    let format = image::guess_format(bytes)
        .map_err(|e| StickerError::decode(format!("unrecognized image format: {}", e)))?;
    let image = image::load_from_memory_with_format(bytes, format)
        .map_err(|e| StickerError::decode(format!("{:?} data could not be read: {}", format, e)))?;

    debug!(
        "Decoded {:?} input: {}x{} ({:?})",
        format,
        image.width(),
        image.height(),
        image.color()
    );

    Ok(image.to_rgba8())
}

/// Encode an RGBA raster as lossy WebP
///
/// # Errors
/// - Zero-sized raster
/// - Settings out of range
/// - libwebp rejects the buffer
pub fn encode_webp(image: &RgbaImage, settings: &WebPSettings) -> Result<Vec<u8>> {
    let (width, height) = image.dimensions();
    if width == 0 || height == 0 {
        return Err(StickerError::encode(format!(
            "cannot encode empty {}x{} raster",
            width, height
        )));
    }
    if settings.quality > 100 || settings.method > 6 {
        return Err(StickerError::encode(format!(
            "unsupported WebP settings: quality {} method {}",
            settings.quality, settings.method
        )));
    }

    let mut config = webp::WebPConfig::new()
        .map_err(|()| StickerError::encode("libwebp config initialization failed"))?;
    config.lossless = 0;
    config.quality = f32::from(settings.quality);
    config.method = i32::from(settings.method);

    let encoder = webp::Encoder::from_rgba(image.as_raw(), width, height);
    let encoded = encoder
        .encode_advanced(&config)
        .map_err(|e| StickerError::encode(format!("libwebp error: {:?}", e)))?;

    debug!(
        "Encoded {}x{} WebP (q={}, m={}): {} bytes",
        width,
        height,
        settings.quality,
        settings.method,
        encoded.len()
    );

    Ok(encoded.to_vec())
}
