#![allow(clippy::too_many_lines)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]
#![allow(clippy::uninlined_format_args)]
#![allow(clippy::unused_async)]

//! # MiSticker
//!
//! Turns background-removed images into square WebP stickers with a white
//! die-cut outline.
//!
//! The pipeline has three stages:
//!
//! 1. **Border synthesis**: the alpha mask is dilated with a disk of radius
//!    `border_margin` and the grown region is painted white underneath the
//!    subject.
//! 2. **Canvas composition**: the bordered image is downscaled (never
//!    upscaled) to fit a `canvas_size` square, centered on a white canvas and
//!    flattened to full opacity.
//! 3. **Encoding**: the canvas is encoded as lossy WebP.
//!
//! Background removal itself is delegated to a [`Segmenter`]. The crate
//! ships only [`PassthroughSegmenter`] and the [`SegmenterChain`] combinator;
//! network providers are supplied by the caller.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use misticker::{create_sticker, StickerConfig};
//!
//! # fn example() -> anyhow::Result<()> {
//! let cutout = std::fs::read("cutout.png")?;
//! let config = StickerConfig::builder().border_margin(12).build()?;
//! let sticker = create_sticker(&cutout, &config)?;
//! std::fs::write("cutout.sticker.webp", sticker)?;
//! # Ok(())
//! # }
//! ```
//!
//! ### Feature Flags
//!
//! - `cli` (default): command-line interface, progress bars and tracing setup
//! - `tracing-json`: JSON structured log output for the CLI
//! - `tracing-files`: log file output for the CLI
//!
//! ### Library-Only Usage
//!
//! ```toml
//! [dependencies]
//! misticker = { version = "0.1", default-features = false }
//! ```

pub mod border;
pub mod canvas;
#[cfg(feature = "cli")]
pub mod cli;
pub mod codec;
pub mod config;
pub mod error;
pub mod processor;
pub mod segmentation;
pub mod services;
#[cfg(feature = "cli")]
pub mod tracing_config;
pub mod types;

use image::RgbaImage;
use tokio::io::AsyncRead;

// Public API exports
pub use border::{add_border, dilate_alpha, sticker_footprint};
pub use canvas::{fit_to_square, fit_to_square_with_filter, scaled_dimensions};
pub use codec::{decode_rgba, encode_webp, WebPSettings};
pub use config::{ResizeFilter, StickerConfig, StickerConfigBuilder};
pub use error::{Result, SegmentationFailure, StickerError};
pub use processor::StickerProcessor;
pub use segmentation::{segment_with_timeout, PassthroughSegmenter, Segmenter, SegmenterChain};
pub use services::{
    ConsoleProgressReporter, ImageIOService, NoOpProgressReporter, ProcessingStage,
    ProgressReporter, ProgressTracker, ProgressUpdate,
};
pub use types::{AlphaMask, MaskStatistics, ProcessingMetadata, ProcessingTimings, StickerResult};

#[cfg(feature = "cli")]
pub use tracing_config::{
    events, init_cli_tracing, spans, TracingConfig, TracingFormat, TracingGuard, TracingOutput,
};

/// Turn an encoded cutout into an encoded WebP sticker
///
/// `image_bytes` may be PNG, JPEG, WebP or TIFF. Opaque inputs are accepted
/// and simply get a rectangular border.
///
/// # Examples
///
/// ## Web server usage
/// ```rust,no_run
/// use misticker::{create_sticker, StickerConfig};
///
/// # fn example(upload_bytes: Vec<u8>) -> anyhow::Result<Vec<u8>> {
/// let config = StickerConfig::builder().canvas_size(256).build()?;
/// let webp = create_sticker(&upload_bytes, &config)?;
/// # Ok(webp)
/// # }
/// ```
///
/// # Errors
/// - `StickerError::InvalidConfig` for out-of-range settings
/// - `StickerError::Decode` for unreadable input
/// - `StickerError::Encode` when the WebP encoder fails
pub fn create_sticker(image_bytes: &[u8], config: &StickerConfig) -> Result<Vec<u8>> {
    StickerProcessor::new(config.clone())?.create_sticker(image_bytes)
}

/// Build a sticker from a decoded RGBA cutout
///
/// # Examples
/// ```rust,no_run
/// use image::{Rgba, RgbaImage};
/// use misticker::{create_sticker_from_image, StickerConfig};
///
/// # fn example() -> anyhow::Result<()> {
/// let cutout = RgbaImage::from_pixel(64, 64, Rgba([200, 30, 30, 255]));
/// let result = create_sticker_from_image(cutout, &StickerConfig::default())?;
/// result.save("square.webp")?;
/// # Ok(())
/// # }
/// ```
///
/// # Errors
/// - `StickerError::InvalidConfig` for out-of-range settings
/// - `StickerError::Processing` for an empty raster
/// - `StickerError::Encode` when the WebP encoder fails
pub fn create_sticker_from_image(image: RgbaImage, config: &StickerConfig) -> Result<StickerResult> {
    StickerProcessor::new(config.clone())?.process_image(image)
}

/// Build a sticker from an async reader stream
///
/// The stream is read to the end before decoding.
///
/// # Examples
/// ```rust,no_run
/// use misticker::{create_sticker_from_reader, StickerConfig};
/// use tokio::fs::File;
///
/// # async fn example() -> anyhow::Result<()> {
/// let file = File::open("cutout.png").await?;
/// let result = create_sticker_from_reader(file, &StickerConfig::default()).await?;
/// result.save("cutout.webp")?;
/// # Ok(())
/// # }
/// ```
///
/// # Errors
/// - `StickerError::Io` when the stream cannot be read
/// - Any error of [`create_sticker`]
pub async fn create_sticker_from_reader<R: AsyncRead + Unpin>(
    reader: R,
    config: &StickerConfig,
) -> Result<StickerResult> {
    let buffer = ImageIOService::load_from_reader(reader).await?;

    let processor = StickerProcessor::new(config.clone())?;
    tokio::task::spawn_blocking(move || processor.process_bytes(&buffer))
        .await
        .map_err(|e| StickerError::internal(format!("Sticker task failed: {}", e)))?
}

/// Remove the background of a photo with `segmenter`, then build a sticker
///
/// # Examples
/// ```rust,no_run
/// use misticker::{create_sticker_from_photo, PassthroughSegmenter, StickerConfig};
///
/// # async fn example(photo: Vec<u8>) -> anyhow::Result<()> {
/// let result =
///     create_sticker_from_photo(&photo, &PassthroughSegmenter, &StickerConfig::default()).await?;
/// println!("{}", result.timing_summary());
/// # Ok(())
/// # }
/// ```
///
/// # Errors
/// - `StickerError::Segmentation` when the segmenter fails or times out
/// - Any error of [`create_sticker`]
pub async fn create_sticker_from_photo(
    photo: &[u8],
    segmenter: &dyn Segmenter,
    config: &StickerConfig,
) -> Result<StickerResult> {
    StickerProcessor::new(config.clone())?
        .create_sticker_from_photo(photo, segmenter)
        .await
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgba;

    #[test]
    fn test_create_sticker_from_image_defaults() {
        let cutout = RgbaImage::from_pixel(40, 20, Rgba([10, 120, 200, 255]));
        let result = create_sticker_from_image(cutout, &StickerConfig::default()).unwrap();

        assert_eq!(result.dimensions(), (512, 512));
        assert_eq!(result.metadata.bordered_dimensions, (60, 40));
        assert!(!result.metadata.downscaled);
    }

    #[test]
    fn test_invalid_config_is_rejected_before_decoding() {
        let config = StickerConfig {
            canvas_size: 0,
            ..StickerConfig::default()
        };
        assert!(matches!(
            create_sticker(b"not an image", &config),
            Err(StickerError::InvalidConfig(_))
        ));
    }

    #[tokio::test]
    async fn test_reader_api() {
        let cutout = RgbaImage::from_pixel(8, 8, Rgba([0, 0, 0, 255]));
        let mut png = Vec::new();
        image::DynamicImage::ImageRgba8(cutout)
            .write_to(&mut std::io::Cursor::new(&mut png), image::ImageFormat::Png)
            .unwrap();

        let config = StickerConfig::builder().canvas_size(64).build().unwrap();
        let result = create_sticker_from_reader(std::io::Cursor::new(png), &config)
            .await
            .unwrap();
        assert_eq!(result.dimensions(), (64, 64));
        assert_eq!(&result.bytes()[..4], b"RIFF");
    }
}
