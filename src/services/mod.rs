//! Frontend-facing services kept apart from the pipeline

pub mod io;
pub mod progress;

pub use io::{ImageIOService, STICKER_SUFFIX};
pub use progress::{
    ConsoleProgressReporter, NoOpProgressReporter, ProcessingStage, ProgressReporter,
    ProgressTracker, ProgressUpdate,
};
