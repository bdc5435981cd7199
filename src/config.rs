//! Configuration types for sticker compositing operations

use crate::error::{Result, StickerError};
use image::imageops::FilterType;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Ring thickness used by the sticker border stage
pub const DEFAULT_BORDER_MARGIN: u8 = 10;

/// Side length of the final square sticker canvas
pub const DEFAULT_CANVAS_SIZE: u32 = 512;

/// WebP quality used for the final encode
pub const DEFAULT_WEBP_QUALITY: u8 = 90;

/// libwebp compression method; 6 is the slowest and smallest
pub const DEFAULT_WEBP_METHOD: u8 = 6;

/// Upper bound for external segmentation calls
pub const DEFAULT_SEGMENTATION_TIMEOUT_MS: u64 = 30_000;

/// Largest canvas side accepted by validation
pub const MAX_CANVAS_SIZE: u32 = 16_384;

/// Resampling filter used when the canvas stage has to downscale
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ResizeFilter {
    /// Nearest-neighbor: fastest, blocky artifacts
    Nearest,
    /// Bilinear interpolation
    Triangle,
    /// Bicubic (Catmull-Rom)
    CatmullRom,
    /// Gaussian: smooth output
    Gaussian,
    /// Lanczos with 3 lobes: sharpest, best for photos
    Lanczos3,
}

impl Default for ResizeFilter {
    fn default() -> Self {
        Self::Lanczos3
    }
}

impl ResizeFilter {
    /// Convert to the `image` crate's `FilterType`
    #[must_use]
    pub const fn to_filter_type(self) -> FilterType {
        match self {
            Self::Nearest => FilterType::Nearest,
            Self::Triangle => FilterType::Triangle,
            Self::CatmullRom => FilterType::CatmullRom,
            Self::Gaussian => FilterType::Gaussian,
            Self::Lanczos3 => FilterType::Lanczos3,
        }
    }
}

impl std::fmt::Display for ResizeFilter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Nearest => write!(f, "nearest"),
            Self::Triangle => write!(f, "triangle"),
            Self::CatmullRom => write!(f, "catmull-rom"),
            Self::Gaussian => write!(f, "gaussian"),
            Self::Lanczos3 => write!(f, "lanczos3"),
        }
    }
}

/// Configuration for sticker compositing
///
/// Passed explicitly into [`crate::StickerProcessor`]; the library never
/// reads process environment to fill it in.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StickerConfig {
    /// White ring thickness in pixels (also the disk radius used for dilation)
    pub border_margin: u8,

    /// Side length of the square output canvas
    pub canvas_size: u32,

    /// WebP quality (0-100)
    pub webp_quality: u8,

    /// WebP compression method / effort (0-6)
    pub webp_method: u8,

    /// Filter used when the bordered subject must be scaled down
    pub resize_filter: ResizeFilter,

    /// Timeout applied to each external segmentation attempt
    pub segmentation_timeout_ms: u64,

    /// Enable debug mode (additional logging)
    pub debug: bool,
}

impl Default for StickerConfig {
    fn default() -> Self {
        Self {
            border_margin: DEFAULT_BORDER_MARGIN,
            canvas_size: DEFAULT_CANVAS_SIZE,
            webp_quality: DEFAULT_WEBP_QUALITY,
            webp_method: DEFAULT_WEBP_METHOD,
            resize_filter: ResizeFilter::default(),
            segmentation_timeout_ms: DEFAULT_SEGMENTATION_TIMEOUT_MS,
            debug: false,
        }
    }
}

impl StickerConfig {
    /// Create a new configuration builder for fluent API construction
    ///
    /// # Examples
    ///
    /// ```rust
    /// use misticker::{ResizeFilter, StickerConfig};
    ///
    /// let config = StickerConfig::builder()
    ///     .border_margin(12)
    ///     .canvas_size(256)
    ///     .resize_filter(ResizeFilter::CatmullRom)
    ///     .build()
    ///     .unwrap();
    /// assert_eq!(config.canvas_size, 256);
    /// ```
    #[must_use]
    pub fn builder() -> StickerConfigBuilder {
        StickerConfigBuilder::default()
    }

    /// Validate all configuration parameters
    ///
    /// # Validation Rules
    ///
    /// - Canvas size: 1-16384
    /// - WebP quality: 0-100
    /// - WebP method: 0-6
    /// - Segmentation timeout: greater than zero
    ///
    /// # Errors
    /// Returns `StickerError::InvalidConfig` naming the offending parameter.
    pub fn validate(&self) -> Result<()> {
        if self.canvas_size == 0 || self.canvas_size > MAX_CANVAS_SIZE {
            return Err(StickerError::config_value_error(
                "canvas size",
                self.canvas_size,
                "1-16384",
                Some(DEFAULT_CANVAS_SIZE),
            ));
        }

        if self.webp_quality > 100 {
            return Err(StickerError::config_value_error(
                "WebP quality",
                self.webp_quality,
                "0-100",
                Some(DEFAULT_WEBP_QUALITY),
            ));
        }

        if self.webp_method > 6 {
            return Err(StickerError::config_value_error(
                "WebP method",
                self.webp_method,
                "0-6",
                Some(DEFAULT_WEBP_METHOD),
            ));
        }

        if self.segmentation_timeout_ms == 0 {
            return Err(StickerError::invalid_config(
                "Segmentation timeout must be greater than zero",
            ));
        }

        Ok(())
    }

    /// Segmentation timeout as a `Duration`
    #[must_use]
    pub fn segmentation_timeout(&self) -> std::time::Duration {
        std::time::Duration::from_millis(self.segmentation_timeout_ms)
    }

    /// Parse and validate a configuration from JSON
    ///
    /// Missing fields fall back to their defaults.
    ///
    /// # Errors
    /// - Malformed JSON
    /// - Values outside their valid ranges
    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)
            .map_err(|e| StickerError::invalid_config(format!("Malformed config JSON: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Read, parse and validate a JSON configuration file
    ///
    /// # Errors
    /// - File cannot be read
    /// - Malformed JSON or invalid values
    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .map_err(|e| StickerError::file_io_error("read config file", path, &e))?;
        Self::from_json_str(&content)
    }
}

/// Builder for `StickerConfig`
#[derive(Debug, Default)]
pub struct StickerConfigBuilder {
    config: StickerConfig,
}

impl StickerConfigBuilder {
    /// Set border ring thickness
    #[must_use]
    pub fn border_margin(mut self, margin: u8) -> Self {
        self.config.border_margin = margin;
        self
    }

    /// Set square canvas side length
    #[must_use]
    pub fn canvas_size(mut self, size: u32) -> Self {
        self.config.canvas_size = size;
        self
    }

    /// Set WebP quality
    #[must_use]
    pub fn webp_quality(mut self, quality: u8) -> Self {
        self.config.webp_quality = quality.min(100);
        self
    }

    /// Set WebP compression method
    #[must_use]
    pub fn webp_method(mut self, method: u8) -> Self {
        self.config.webp_method = method.min(6);
        self
    }

    /// Set downscale filter
    #[must_use]
    pub fn resize_filter(mut self, filter: ResizeFilter) -> Self {
        self.config.resize_filter = filter;
        self
    }

    /// Set segmentation timeout in milliseconds
    #[must_use]
    pub fn segmentation_timeout_ms(mut self, timeout_ms: u64) -> Self {
        self.config.segmentation_timeout_ms = timeout_ms;
        self
    }

    /// Enable debug mode
    #[must_use]
    pub fn debug(mut self, debug: bool) -> Self {
        self.config.debug = debug;
        self
    }

    /// Build and validate the configuration
    ///
    /// # Errors
    /// - Canvas size of zero or above 16384
    /// - Segmentation timeout of zero
    pub fn build(self) -> Result<StickerConfig> {
        self.config.validate()?;
        Ok(self.config)
    }
}
