//! Stage-level progress for sticker invocations
//!
//! The pipeline reports where it is; frontends decide whether and how to
//! show it. A processor without a reporter pays only for a no-op call.

use crate::types::ProcessingTimings;
use instant::Instant;
use std::sync::Arc;

/// Stages of a sticker invocation, in execution order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProcessingStage {
    /// Waiting on the external background removal provider
    Segmentation,
    Decoding,
    /// Dilating the alpha footprint and painting the white ring
    BorderSynthesis,
    /// Fitting the bordered raster onto the square canvas
    CanvasComposition,
    Encoding,
    Completed,
}

impl ProcessingStage {
    /// Every stage, in the order a photo passes through them
    pub const PIPELINE: [ProcessingStage; 6] = [
        Self::Segmentation,
        Self::Decoding,
        Self::BorderSynthesis,
        Self::CanvasComposition,
        Self::Encoding,
        Self::Completed,
    ];

    #[must_use]
    pub fn description(&self) -> &'static str {
        match self {
            Self::Segmentation => "Removing background",
            Self::Decoding => "Decoding input image",
            Self::BorderSynthesis => "Adding sticker border",
            Self::CanvasComposition => "Fitting to canvas",
            Self::Encoding => "Encoding WebP",
            Self::Completed => "Sticker completed",
        }
    }

    /// Rough share of the work done once this stage starts
    ///
    /// Border dilation and WebP encoding dominate run time, so they get the
    /// widest bands.
    #[must_use]
    pub fn progress_percentage(&self) -> u8 {
        match self {
            Self::Segmentation => 5,
            Self::Decoding => 40,
            Self::BorderSynthesis => 50,
            Self::CanvasComposition => 75,
            Self::Encoding => 85,
            Self::Completed => 100,
        }
    }
}

impl std::fmt::Display for ProcessingStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.description())
    }
}

/// Snapshot sent to a reporter when a stage starts
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProgressUpdate {
    pub stage: ProcessingStage,
    /// 0-100
    pub progress: u8,
    /// Milliseconds since the invocation started
    pub elapsed_ms: u64,
}

impl ProgressUpdate {
    #[must_use]
    pub fn new(stage: ProcessingStage, started: Instant) -> Self {
        Self {
            stage,
            progress: stage.progress_percentage(),
            elapsed_ms: started.elapsed().as_millis() as u64,
        }
    }
}

/// Receives progress from a [`ProgressTracker`]
///
/// Reporters are shared between concurrent invocations, so implementations
/// must be thread safe.
pub trait ProgressReporter: Send + Sync {
    fn report_progress(&self, update: ProgressUpdate);

    /// Called once after the sticker has been encoded
    fn report_completion(&self, timings: ProcessingTimings);

    /// Called when `stage` aborts the invocation
    fn report_error(&self, stage: ProcessingStage, error: &str);
}

/// Reporter that discards everything
#[derive(Debug, Default, Clone, Copy)]
pub struct NoOpProgressReporter;

impl ProgressReporter for NoOpProgressReporter {
    fn report_progress(&self, _update: ProgressUpdate) {}

    fn report_completion(&self, _timings: ProcessingTimings) {}

    fn report_error(&self, _stage: ProcessingStage, _error: &str) {}
}

/// Reporter that writes one `log` line per stage
#[derive(Debug, Default, Clone, Copy)]
pub struct ConsoleProgressReporter {
    verbose: bool,
}

impl ConsoleProgressReporter {
    /// With `verbose`, lines carry elapsed time and completion carries the stage breakdown
    #[must_use]
    pub fn new(verbose: bool) -> Self {
        Self { verbose }
    }
}

impl ProgressReporter for ConsoleProgressReporter {
    fn report_progress(&self, update: ProgressUpdate) {
        if self.verbose {
            log::info!(
                "🧩 {:>3}% {} (+{}ms)",
                update.progress,
                update.stage,
                update.elapsed_ms
            );
        } else {
            log::info!("🧩 {:>3}% {}", update.progress, update.stage);
        }
    }

    fn report_completion(&self, timings: ProcessingTimings) {
        if !self.verbose {
            log::info!("✅ Sticker ready in {}ms", timings.total_ms);
            return;
        }

        let segmentation = timings
            .segmentation_ms
            .map(|ms| format!("segment {}ms, ", ms))
            .unwrap_or_default();
        log::info!(
            "✅ Sticker ready in {}ms ({}decode {}ms, border {}ms, canvas {}ms, encode {}ms)",
            timings.total_ms,
            segmentation,
            timings.decode_ms,
            timings.border_ms,
            timings.canvas_ms,
            timings.encode_ms
        );
    }

    fn report_error(&self, stage: ProcessingStage, error: &str) {
        log::error!("❌ {} failed: {}", stage, error);
    }
}

/// Per-invocation view onto a shared reporter
///
/// Remembers the running stage so errors can be attributed to it.
pub struct ProgressTracker {
    reporter: Arc<dyn ProgressReporter>,
    started: Instant,
    current_stage: Option<ProcessingStage>,
}

impl ProgressTracker {
    #[must_use]
    pub fn new(reporter: Arc<dyn ProgressReporter>) -> Self {
        Self {
            reporter,
            started: Instant::now(),
            current_stage: None,
        }
    }

    #[must_use]
    pub fn no_op() -> Self {
        Self::new(Arc::new(NoOpProgressReporter))
    }

    pub fn report_stage(&mut self, stage: ProcessingStage) {
        self.current_stage = Some(stage);
        self.reporter
            .report_progress(ProgressUpdate::new(stage, self.started));
    }

    pub fn report_completion(&mut self, timings: ProcessingTimings) {
        self.current_stage = Some(ProcessingStage::Completed);
        self.reporter.report_completion(timings);
    }

    /// Report `error` against the running stage (decoding if none started yet)
    pub fn report_error(&self, error: &str) {
        let stage = self.current_stage.unwrap_or(ProcessingStage::Decoding);
        self.reporter.report_error(stage, error);
    }

    #[must_use]
    pub fn current_stage(&self) -> Option<ProcessingStage> {
        self.current_stage
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    #[derive(Default)]
    struct Recorded {
        updates: Vec<ProgressUpdate>,
        completions: usize,
        errors: Vec<(ProcessingStage, String)>,
    }

    struct RecordingReporter(Arc<Mutex<Recorded>>);

    impl ProgressReporter for RecordingReporter {
        fn report_progress(&self, update: ProgressUpdate) {
            self.0.lock().unwrap().updates.push(update);
        }

        fn report_completion(&self, _timings: ProcessingTimings) {
            self.0.lock().unwrap().completions += 1;
        }

        fn report_error(&self, stage: ProcessingStage, error: &str) {
            self.0.lock().unwrap().errors.push((stage, error.to_string()));
        }
    }

    #[test]
    fn test_pipeline_percentages_increase() {
        for pair in ProcessingStage::PIPELINE.windows(2) {
            assert!(pair[0].progress_percentage() < pair[1].progress_percentage());
        }
        assert_eq!(ProcessingStage::Completed.progress_percentage(), 100);
        assert_eq!(
            ProcessingStage::BorderSynthesis.to_string(),
            "Adding sticker border"
        );
    }

    #[test]
    fn test_tracker_forwards_to_reporter() {
        let recorded = Arc::new(Mutex::new(Recorded::default()));
        let mut tracker = ProgressTracker::new(Arc::new(RecordingReporter(Arc::clone(&recorded))));

        assert_eq!(tracker.current_stage(), None);
        tracker.report_stage(ProcessingStage::Decoding);
        tracker.report_stage(ProcessingStage::BorderSynthesis);
        tracker.report_error("dilation failed");
        tracker.report_completion(ProcessingTimings::default());

        let recorded = recorded.lock().unwrap();
        let stages: Vec<_> = recorded.updates.iter().map(|u| u.stage).collect();
        assert_eq!(
            stages,
            vec![ProcessingStage::Decoding, ProcessingStage::BorderSynthesis]
        );
        assert_eq!(recorded.updates[1].progress, 50);
        assert_eq!(
            recorded.errors,
            vec![(ProcessingStage::BorderSynthesis, "dilation failed".to_string())]
        );
        assert_eq!(recorded.completions, 1);
        assert_eq!(tracker.current_stage(), Some(ProcessingStage::Completed));
    }

    #[test]
    fn test_error_before_any_stage_is_attributed_to_decoding() {
        let recorded = Arc::new(Mutex::new(Recorded::default()));
        let tracker = ProgressTracker::new(Arc::new(RecordingReporter(Arc::clone(&recorded))));

        tracker.report_error("empty input");
        assert_eq!(recorded.lock().unwrap().errors[0].0, ProcessingStage::Decoding);
    }

    #[test]
    fn test_no_op_tracker() {
        let mut tracker = ProgressTracker::no_op();
        tracker.report_stage(ProcessingStage::Segmentation);
        tracker.report_error("ignored");
        assert_eq!(tracker.current_stage(), Some(ProcessingStage::Segmentation));
    }
}
