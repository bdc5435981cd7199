//! Core types for sticker compositing operations

use crate::error::{Result, StickerError};
use image::{GrayImage, RgbaImage};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Single-channel opacity buffer derived from an RGBA raster
///
/// Never stored on its own: it is extracted from a raster, transformed,
/// and written back into a raster within the same stage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AlphaMask {
    image: GrayImage,
}

impl AlphaMask {
    /// Extract the alpha channel of an RGBA raster
    #[must_use]
    pub fn from_rgba(image: &RgbaImage) -> Self {
        let (width, height) = image.dimensions();
        let alpha = GrayImage::from_fn(width, height, |x, y| {
            image::Luma([image.get_pixel(x, y)[3]])
        });
        Self { image: alpha }
    }

    /// Extract the alpha channel into a larger, zero-filled buffer
    ///
    /// The source alpha lands at `(pad, pad)`; everything else is zero.
    #[must_use]
    pub fn from_rgba_padded(image: &RgbaImage, pad: u32) -> Self {
        let (width, height) = image.dimensions();
        let mut alpha = GrayImage::new(width + 2 * pad, height + 2 * pad);
        for (x, y, pixel) in image.enumerate_pixels() {
            alpha.put_pixel(x + pad, y + pad, image::Luma([pixel[3]]));
        }
        Self { image: alpha }
    }

    /// Wrap an existing grayscale buffer
    #[must_use]
    pub fn from_gray(image: GrayImage) -> Self {
        Self { image }
    }

    /// Mask dimensions (width, height)
    #[must_use]
    pub fn dimensions(&self) -> (u32, u32) {
        self.image.dimensions()
    }

    /// Opacity at `(x, y)`, zero outside the mask
    #[must_use]
    pub fn value(&self, x: u32, y: u32) -> u8 {
        self.image.get_pixel_checked(x, y).map_or(0, |p| p[0])
    }

    /// Borrow the underlying grayscale buffer
    #[must_use]
    pub fn as_image(&self) -> &GrayImage {
        &self.image
    }

    /// Consume the mask, returning the grayscale buffer
    #[must_use]
    pub fn into_image(self) -> GrayImage {
        self.image
    }

    /// Coverage statistics
    #[must_use]
    pub fn statistics(&self) -> MaskStatistics {
        let total_pixels = self.image.as_raw().len();
        let covered_pixels = self.image.as_raw().iter().filter(|&&a| a > 0).count();
        let opaque_pixels = self.image.as_raw().iter().filter(|&&a| a == u8::MAX).count();
        let coverage_ratio = if total_pixels == 0 {
            0.0
        } else {
            covered_pixels as f32 / total_pixels as f32
        };

        MaskStatistics {
            total_pixels,
            covered_pixels,
            opaque_pixels,
            coverage_ratio,
        }
    }
}

/// Statistics about an alpha mask
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MaskStatistics {
    pub total_pixels: usize,
    /// Pixels with any opacity
    pub covered_pixels: usize,
    /// Pixels at full opacity
    pub opaque_pixels: usize,
    pub coverage_ratio: f32,
}

/// Detailed timing breakdown for one sticker invocation
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProcessingTimings {
    /// External segmentation call, if one was made
    pub segmentation_ms: Option<u64>,

    /// Input decoding
    pub decode_ms: u64,

    /// Border synthesis (dilation and compositing)
    pub border_ms: u64,

    /// Canvas fitting (resize and paste)
    pub canvas_ms: u64,

    /// Final WebP encode
    pub encode_ms: u64,

    /// Total end-to-end processing time
    pub total_ms: u64,
}

impl ProcessingTimings {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Time not attributed to any measured stage
    #[must_use]
    pub fn other_overhead_ms(&self) -> u64 {
        let measured = self.segmentation_ms.unwrap_or(0)
            + self.decode_ms
            + self.border_ms
            + self.canvas_ms
            + self.encode_ms;
        self.total_ms.saturating_sub(measured)
    }
}

/// Metadata about the processing operation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProcessingMetadata {
    pub timings: ProcessingTimings,

    /// Dimensions of the decoded input
    pub original_dimensions: (u32, u32),

    /// Dimensions after the border stage
    pub bordered_dimensions: (u32, u32),

    /// Dimensions the subject occupies on the canvas
    pub placed_dimensions: (u32, u32),

    /// Ring thickness that was applied
    pub border_margin: u8,

    /// Whether the canvas stage had to scale down
    pub downscaled: bool,

    /// Alpha coverage of the input
    pub input_coverage: f32,
}

impl ProcessingMetadata {
    #[must_use]
    pub fn new(original_dimensions: (u32, u32), border_margin: u8) -> Self {
        Self {
            timings: ProcessingTimings::new(),
            original_dimensions,
            bordered_dimensions: original_dimensions,
            placed_dimensions: original_dimensions,
            border_margin,
            downscaled: false,
            input_coverage: 0.0,
        }
    }
}

/// Result of a sticker pipeline run
#[derive(Debug, Clone)]
pub struct StickerResult {
    /// Final square, fully opaque raster
    pub image: RgbaImage,

    /// The raster encoded as WebP
    pub encoded: Vec<u8>,

    pub metadata: ProcessingMetadata,
}

impl StickerResult {
    #[must_use]
    pub fn new(image: RgbaImage, encoded: Vec<u8>, metadata: ProcessingMetadata) -> Self {
        Self {
            image,
            encoded,
            metadata,
        }
    }

    /// Encoded WebP bytes
    #[must_use]
    pub fn bytes(&self) -> &[u8] {
        &self.encoded
    }

    /// Consume the result, keeping only the encoded bytes
    #[must_use]
    pub fn into_bytes(self) -> Vec<u8> {
        self.encoded
    }

    /// Canvas dimensions
    #[must_use]
    pub fn dimensions(&self) -> (u32, u32) {
        self.image.dimensions()
    }

    /// Write the encoded sticker to a file
    ///
    /// # Errors
    /// - Parent directory cannot be created
    /// - File cannot be written
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)
                .map_err(|e| StickerError::file_io_error("create output directory", parent, &e))?;
        }
        std::fs::write(path, &self.encoded)
            .map_err(|e| StickerError::file_io_error("write sticker", path, &e))
    }

    #[must_use]
    pub fn timings(&self) -> &ProcessingTimings {
        &self.metadata.timings
    }

    /// Get timing summary for display
    #[must_use]
    pub fn timing_summary(&self) -> String {
        let t = &self.metadata.timings;
        let mut summary = String::new();
        if let Some(segmentation_ms) = t.segmentation_ms {
            summary.push_str(&format!("Segmentation: {}ms | ", segmentation_ms));
        }
        summary.push_str(&format!(
            "Total: {}ms | Decode: {}ms | Border: {}ms | Canvas: {}ms | Encode: {}ms",
            t.total_ms, t.decode_ms, t.border_ms, t.canvas_ms, t.encode_ms
        ));

        let other_ms = t.other_overhead_ms();
        if other_ms > 5 {
            summary.push_str(&format!(" | Other: {}ms", other_ms));
        }

        summary
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgba;

    #[test]
    fn test_alpha_mask_extraction() {
        let mut image = RgbaImage::from_pixel(3, 2, Rgba([10, 20, 30, 0]));
        image.put_pixel(1, 1, Rgba([10, 20, 30, 200]));

        let mask = AlphaMask::from_rgba(&image);
        assert_eq!(mask.dimensions(), (3, 2));
        assert_eq!(mask.value(1, 1), 200);
        assert_eq!(mask.value(0, 0), 0);
        assert_eq!(mask.value(99, 99), 0);
    }

    #[test]
    fn test_alpha_mask_padding() {
        let image = RgbaImage::from_pixel(2, 2, Rgba([0, 0, 0, 255]));
        let mask = AlphaMask::from_rgba_padded(&image, 3);

        assert_eq!(mask.dimensions(), (8, 8));
        assert_eq!(mask.value(2, 2), 0);
        assert_eq!(mask.value(3, 3), 255);
        assert_eq!(mask.value(4, 4), 255);
        assert_eq!(mask.value(5, 5), 0);
    }

    #[test]
    fn test_mask_statistics() {
        let mask = AlphaMask::from_gray(GrayImage::from_raw(2, 2, vec![255, 128, 0, 0]).unwrap());
        let stats = mask.statistics();

        assert_eq!(stats.total_pixels, 4);
        assert_eq!(stats.covered_pixels, 2);
        assert_eq!(stats.opaque_pixels, 1);
        assert!((stats.coverage_ratio - 0.5).abs() < f32::EPSILON);
    }

    #[test]
    fn test_timing_overhead() {
        let timings = ProcessingTimings {
            segmentation_ms: Some(10),
            decode_ms: 5,
            border_ms: 20,
            canvas_ms: 15,
            encode_ms: 30,
            total_ms: 100,
        };
        assert_eq!(timings.other_overhead_ms(), 20);

        let timings = ProcessingTimings {
            total_ms: 1,
            encode_ms: 5,
            ..ProcessingTimings::default()
        };
        assert_eq!(timings.other_overhead_ms(), 0);
    }

    #[test]
    fn test_timing_summary_includes_segmentation_when_present() {
        let mut metadata = ProcessingMetadata::new((4, 4), 10);
        metadata.timings.segmentation_ms = Some(42);
        let result = StickerResult::new(RgbaImage::new(1, 1), vec![1, 2, 3], metadata);

        let summary = result.timing_summary();
        assert!(summary.starts_with("Segmentation: 42ms"));
        assert!(summary.contains("Border:"));
        assert_eq!(result.bytes(), &[1, 2, 3]);
    }

    #[test]
    fn test_save_writes_encoded_bytes() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("out.webp");
        let result = StickerResult::new(
            RgbaImage::new(1, 1),
            vec![9, 8, 7],
            ProcessingMetadata::new((1, 1), 0),
        );

        result.save(&path).unwrap();
        assert_eq!(std::fs::read(&path).unwrap(), vec![9, 8, 7]);
    }
}
