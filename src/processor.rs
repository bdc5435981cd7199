//! Sticker pipeline orchestration
//!
//! Runs decode, border synthesis, canvas fitting and encode in order,
//! recording per-stage timings. Every invocation owns its own rasters, so a
//! single processor can be shared across threads and tasks freely.

use crate::{
    border::add_border,
    canvas::{fit_to_square_with_filter, scaled_dimensions},
    codec::{decode_rgba, encode_webp, WebPSettings},
    config::StickerConfig,
    error::{Result, StickerError},
    segmentation::{segment_with_timeout, Segmenter},
    services::progress::{ProcessingStage, ProgressReporter, ProgressTracker},
    types::{AlphaMask, ProcessingMetadata, ProcessingTimings, StickerResult},
};
use image::RgbaImage;
use instant::Instant;
use std::sync::Arc;
use tracing::{debug as trace_debug, info as trace_info, instrument, span, Level};

fn elapsed_ms(start: Instant) -> u64 {
    start.elapsed().as_millis() as u64
}

/// Turns cutout images into finished stickers
#[derive(Clone)]
pub struct StickerProcessor {
    config: StickerConfig,
    reporter: Option<Arc<dyn ProgressReporter>>,
}

impl StickerProcessor {
    /// Create a processor for the given configuration
    ///
    /// # Errors
    /// - Configuration values outside their valid ranges
    pub fn new(config: StickerConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            config,
            reporter: None,
        })
    }

    /// Report stage progress of every invocation to `reporter`
    #[must_use]
    pub fn with_progress_reporter(mut self, reporter: Box<dyn ProgressReporter>) -> Self {
        self.reporter = Some(Arc::from(reporter));
        self
    }

    #[must_use]
    pub fn config(&self) -> &StickerConfig {
        &self.config
    }

    fn tracker(&self) -> ProgressTracker {
        match &self.reporter {
            Some(reporter) => ProgressTracker::new(Arc::clone(reporter)),
            None => ProgressTracker::no_op(),
        }
    }

    /// Turn an encoded cutout into an encoded sticker
    ///
    /// `image_bytes` must already have its background removed (alpha zero
    /// outside the subject). The output is a `canvas_size` square WebP.
    ///
    /// # Examples
    /// ```rust,no_run
    /// use misticker::{StickerConfig, StickerProcessor};
    ///
    /// let processor = StickerProcessor::new(StickerConfig::default())?;
    /// let cutout = std::fs::read("cutout.png")?;
    /// let sticker = processor.create_sticker(&cutout)?;
    /// std::fs::write("sticker.webp", sticker)?;
    /// # Ok::<(), Box<dyn std::error::Error>>(())
    /// ```
    ///
    /// # Errors
    /// - `StickerError::Decode` when the input is not a readable image
    /// - `StickerError::Encode` when the WebP encoder fails
    pub fn create_sticker(&self, image_bytes: &[u8]) -> Result<Vec<u8>> {
        self.process_bytes(image_bytes).map(StickerResult::into_bytes)
    }

    /// Decode and process an encoded cutout
    ///
    /// # Errors
    /// - Input decoding failures
    /// - Encoding failures
    #[instrument(skip(self, image_bytes), fields(input_bytes = image_bytes.len()))]
    pub fn process_bytes(&self, image_bytes: &[u8]) -> Result<StickerResult> {
        let total_start = Instant::now();
        let mut tracker = self.tracker();
        let mut timings = ProcessingTimings::default();

        tracker.report_stage(ProcessingStage::Decoding);
        let decode_start = Instant::now();
        let image = decode_rgba(image_bytes).map_err(|e| {
            tracker.report_error(&e.to_string());
            e
        })?;
        timings.decode_ms = elapsed_ms(decode_start);

        self.compose(image, timings, &mut tracker, total_start)
    }

    /// Process an already decoded RGBA cutout
    ///
    /// # Errors
    /// - Empty raster
    /// - Encoding failures
    #[instrument(skip(self, image), fields(dimensions = %format!("{}x{}", image.width(), image.height())))]
    pub fn process_image(&self, image: RgbaImage) -> Result<StickerResult> {
        let total_start = Instant::now();
        let mut tracker = self.tracker();
        self.compose(image, ProcessingTimings::default(), &mut tracker, total_start)
    }

    /// Remove the background of `photo` with `segmenter`, then build a sticker
    ///
    /// The segmentation call is bounded by the configured timeout. The
    /// CPU-bound pipeline runs on the blocking thread pool.
    ///
    /// # Errors
    /// - `StickerError::Segmentation` when the segmenter fails or times out
    /// - Any error of [`StickerProcessor::process_bytes`]
    pub async fn create_sticker_from_photo(
        &self,
        photo: &[u8],
        segmenter: &dyn Segmenter,
    ) -> Result<StickerResult> {
        let mut tracker = self.tracker();
        tracker.report_stage(ProcessingStage::Segmentation);

        trace_info!(
            provider = %segmenter.name(),
            timeout_ms = self.config.segmentation_timeout_ms,
            "Requesting background removal"
        );

        let segmentation_start = Instant::now();
        let cutout = segment_with_timeout(segmenter, photo, self.config.segmentation_timeout())
            .await
            .map_err(|e| {
                tracker.report_error(&e.to_string());
                e
            })?;
        let segmentation_ms = elapsed_ms(segmentation_start);

        let processor = self.clone();
        let mut result = tokio::task::spawn_blocking(move || processor.process_bytes(&cutout))
            .await
            .map_err(|e| StickerError::internal(format!("Sticker task failed: {}", e)))??;

        result.metadata.timings.segmentation_ms = Some(segmentation_ms);
        result.metadata.timings.total_ms += segmentation_ms;
        Ok(result)
    }

    fn compose(
        &self,
        image: RgbaImage,
        mut timings: ProcessingTimings,
        tracker: &mut ProgressTracker,
        total_start: Instant,
    ) -> Result<StickerResult> {
        let original_dimensions = image.dimensions();
        if original_dimensions.0 == 0 || original_dimensions.1 == 0 {
            let error = StickerError::processing_stage_error(
                "border synthesis",
                "source raster is empty",
                Some(&format!("{}x{}", original_dimensions.0, original_dimensions.1)),
            );
            tracker.report_error(&error.to_string());
            return Err(error);
        }

        let margin = self.config.border_margin;
        let canvas_size = self.config.canvas_size;

        let mut metadata = ProcessingMetadata::new(original_dimensions, margin);
        metadata.input_coverage = AlphaMask::from_rgba(&image).statistics().coverage_ratio;

        trace_info!(
            width = original_dimensions.0,
            height = original_dimensions.1,
            margin,
            canvas_size,
            "Starting sticker composition"
        );

        tracker.report_stage(ProcessingStage::BorderSynthesis);
        let border_start = Instant::now();
        let bordered = {
            let _span = span!(Level::DEBUG, "border_synthesis", margin).entered();
            add_border(image, margin)
        };
        timings.border_ms = elapsed_ms(border_start);

        let (bordered_width, bordered_height) = bordered.dimensions();
        metadata.bordered_dimensions = (bordered_width, bordered_height);
        metadata.placed_dimensions = scaled_dimensions(bordered_width, bordered_height, canvas_size);
        metadata.downscaled = metadata.placed_dimensions != metadata.bordered_dimensions;

        tracker.report_stage(ProcessingStage::CanvasComposition);
        let canvas_start = Instant::now();
        let canvas = {
            let _span = span!(
                Level::DEBUG,
                "canvas_composition",
                canvas_size,
                downscaled = metadata.downscaled
            )
            .entered();
            fit_to_square_with_filter(bordered, canvas_size, self.config.resize_filter)
        }
        .map_err(|e| {
            tracker.report_error(&e.to_string());
            e
        })?;
        timings.canvas_ms = elapsed_ms(canvas_start);

        tracker.report_stage(ProcessingStage::Encoding);
        let encode_start = Instant::now();
        let encoded = {
            let _span = span!(Level::DEBUG, "encoding", quality = self.config.webp_quality).entered();
            encode_webp(&canvas, &WebPSettings::from(&self.config))
        }
        .map_err(|e| {
            tracker.report_error(&e.to_string());
            e
        })?;
        timings.encode_ms = elapsed_ms(encode_start);

        timings.total_ms = elapsed_ms(total_start);
        metadata.timings = timings;

        trace_debug!(
            bordered = %format!("{}x{}", bordered_width, bordered_height),
            placed = %format!("{}x{}", metadata.placed_dimensions.0, metadata.placed_dimensions.1),
            encoded_bytes = encoded.len(),
            total_ms = metadata.timings.total_ms,
            "Sticker composed"
        );
        if self.config.debug {
            log::debug!("Sticker timings: {:?}", metadata.timings);
        }

        tracker.report_completion(metadata.timings.clone());
        Ok(StickerResult::new(canvas, encoded, metadata))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::border::WHITE;
    use crate::error::SegmentationFailure;
    use crate::segmentation::PassthroughSegmenter;
    use crate::services::progress::ProgressUpdate;
    use async_trait::async_trait;
    use image::{ImageFormat, Rgba};
    use std::io::Cursor;
    use std::sync::Mutex;
    use std::time::Duration;

    const GREEN: Rgba<u8> = Rgba([30, 160, 60, 255]);

    fn cutout(width: u32, height: u32) -> RgbaImage {
        let mut image = RgbaImage::from_pixel(width, height, Rgba([0, 0, 0, 0]));
        for y in height / 4..height * 3 / 4 {
            for x in width / 4..width * 3 / 4 {
                image.put_pixel(x, y, GREEN);
            }
        }
        image
    }

    fn png_bytes(image: &RgbaImage) -> Vec<u8> {
        let mut buffer = Cursor::new(Vec::new());
        image.write_to(&mut buffer, ImageFormat::Png).unwrap();
        buffer.into_inner()
    }

    struct StageRecorder(Arc<Mutex<Vec<ProcessingStage>>>);

    impl ProgressReporter for StageRecorder {
        fn report_progress(&self, update: ProgressUpdate) {
            self.0.lock().unwrap().push(update.stage);
        }

        fn report_completion(&self, _timings: ProcessingTimings) {
            self.0.lock().unwrap().push(ProcessingStage::Completed);
        }

        fn report_error(&self, _stage: ProcessingStage, _error: &str) {}
    }

    struct SlowSegmenter;

    #[async_trait]
    impl Segmenter for SlowSegmenter {
        fn name(&self) -> &str {
            "slow"
        }

        async fn remove_background(&self, image: &[u8]) -> Result<Vec<u8>> {
            tokio::time::sleep(Duration::from_secs(600)).await;
            Ok(image.to_vec())
        }
    }

    #[test]
    fn test_new_rejects_invalid_config() {
        let mut config = StickerConfig::default();
        config.canvas_size = 0;
        assert!(matches!(
            StickerProcessor::new(config),
            Err(StickerError::InvalidConfig(_))
        ));
    }

    #[test]
    fn test_process_image_rejects_empty_raster() {
        let processor = StickerProcessor::new(StickerConfig::default()).unwrap();
        let err = processor.process_image(RgbaImage::new(0, 5)).unwrap_err();

        assert!(matches!(err, StickerError::Processing(_)));
        assert!(err.to_string().contains("border synthesis on 0x5"));
    }

    #[test]
    fn test_process_image_produces_square_opaque_sticker() {
        let processor = StickerProcessor::new(StickerConfig::default()).unwrap();
        let result = processor.process_image(cutout(100, 200)).unwrap();

        assert_eq!(result.dimensions(), (512, 512));
        assert!(result.image.pixels().all(|p| p[3] == 255));
        assert_eq!(result.metadata.original_dimensions, (100, 200));
        assert_eq!(result.metadata.bordered_dimensions, (120, 220));
        assert_eq!(result.metadata.placed_dimensions, (120, 220));
        assert!(!result.metadata.downscaled);
        assert!((result.metadata.input_coverage - 0.25).abs() < 0.01);
        assert_eq!(&result.bytes()[0..4], b"RIFF");

        // Bordered raster sits at (196, 146) on the canvas.
        assert_eq!(*result.image.get_pixel(256, 256), GREEN);
        assert_eq!(*result.image.get_pixel(10, 10), WHITE);
    }

    #[test]
    fn test_large_input_is_downscaled() {
        let config = StickerConfig::builder().border_margin(2).build().unwrap();
        let processor = StickerProcessor::new(config).unwrap();
        let result = processor.process_image(cutout(996, 196)).unwrap();

        // 1000x200 after the border, scaled to 512x102.
        assert_eq!(result.metadata.bordered_dimensions, (1000, 200));
        assert_eq!(result.metadata.placed_dimensions, (512, 102));
        assert!(result.metadata.downscaled);
        assert_eq!(result.dimensions(), (512, 512));
    }

    #[test]
    fn test_create_sticker_bytes_in_bytes_out() {
        let config = StickerConfig::builder().canvas_size(128).build().unwrap();
        let processor = StickerProcessor::new(config).unwrap();

        let sticker = processor.create_sticker(&png_bytes(&cutout(60, 40))).unwrap();
        let decoded = image::load_from_memory(&sticker).unwrap();
        assert_eq!((decoded.width(), decoded.height()), (128, 128));
    }

    #[test]
    fn test_decode_failure_is_reported_as_decode_error() {
        let processor = StickerProcessor::new(StickerConfig::default()).unwrap();
        assert!(matches!(
            processor.create_sticker(b"not an image"),
            Err(StickerError::Decode(_))
        ));
    }

    #[test]
    fn test_progress_stages_in_order() {
        let stages = Arc::new(Mutex::new(Vec::new()));
        let processor = StickerProcessor::new(StickerConfig::default())
            .unwrap()
            .with_progress_reporter(Box::new(StageRecorder(Arc::clone(&stages))));

        processor.process_bytes(&png_bytes(&cutout(20, 20))).unwrap();

        assert_eq!(
            *stages.lock().unwrap(),
            vec![
                ProcessingStage::Decoding,
                ProcessingStage::BorderSynthesis,
                ProcessingStage::CanvasComposition,
                ProcessingStage::Encoding,
                ProcessingStage::Completed,
            ]
        );
    }

    #[tokio::test]
    async fn test_create_sticker_from_photo_with_passthrough() {
        let processor = StickerProcessor::new(StickerConfig::default()).unwrap();
        let result = processor
            .create_sticker_from_photo(&png_bytes(&cutout(64, 64)), &PassthroughSegmenter)
            .await
            .unwrap();

        assert_eq!(result.dimensions(), (512, 512));
        assert!(result.timings().segmentation_ms.is_some());
    }

    #[tokio::test(start_paused = true)]
    async fn test_create_sticker_from_photo_times_out() {
        let config = StickerConfig::builder()
            .segmentation_timeout_ms(50)
            .build()
            .unwrap();
        let processor = StickerProcessor::new(config).unwrap();

        let err = processor
            .create_sticker_from_photo(b"photo", &SlowSegmenter)
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            StickerError::Segmentation(SegmentationFailure::Timeout { timeout_ms: 50, .. })
        ));
    }
}
