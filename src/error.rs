//! Error types for sticker compositing operations

use thiserror::Error;

/// Result type alias for sticker operations
pub type Result<T> = std::result::Result<T, StickerError>;

/// Comprehensive error types for sticker compositing operations
#[derive(Error, Debug)]
pub enum StickerError {
    /// Reading a source or writing a sticker failed
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Input bytes could not be decoded into a raster
    #[error("Decode failed: {0}")]
    Decode(String),

    /// Final raster could not be serialized
    #[error("Encode failed: {0}")]
    Encode(String),

    /// External background segmentation failed
    #[error("Segmentation failed: {0}")]
    Segmentation(SegmentationFailure),

    /// A setting is out of range, or a collaborator is unusable as configured
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Raster processing errors (dimension mismatches, buffer construction)
    #[error("Raster processing failed: {0}")]
    Processing(String),

    /// A worker task panicked or was cancelled
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Failure modes of the external segmentation collaborator
///
/// A `BadRequest` means the input itself was rejected and no other provider
/// should be tried. Every other variant is a provider-side failure.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SegmentationFailure {
    /// The provider rejected the input image
    #[error("bad request: {0}")]
    BadRequest(String),

    /// The provider failed while handling a valid request
    #[error("provider '{provider}' failed: {message}")]
    Provider { provider: String, message: String },

    /// The provider did not answer within the configured timeout
    #[error("provider '{provider}' timed out after {timeout_ms}ms")]
    Timeout { provider: String, timeout_ms: u64 },

    /// Every provider in a chain failed
    #[error("all providers failed: [{}]", .0.join("; "))]
    Exhausted(Vec<String>),
}

impl StickerError {
    pub fn decode<S: Into<String>>(msg: S) -> Self {
        Self::Decode(msg.into())
    }

    pub fn encode<S: Into<String>>(msg: S) -> Self {
        Self::Encode(msg.into())
    }

    pub fn invalid_config<S: Into<String>>(msg: S) -> Self {
        Self::InvalidConfig(msg.into())
    }

    pub fn processing<S: Into<String>>(msg: S) -> Self {
        Self::Processing(msg.into())
    }

    pub fn internal<S: Into<String>>(msg: S) -> Self {
        Self::Internal(msg.into())
    }

    /// Segmentation rejected the input; chains stop on this
    pub fn bad_request<S: Into<String>>(msg: S) -> Self {
        Self::Segmentation(SegmentationFailure::BadRequest(msg.into()))
    }

    /// Segmentation provider failed; chains continue past this
    pub fn provider<P: Into<String>, S: Into<String>>(provider: P, msg: S) -> Self {
        Self::Segmentation(SegmentationFailure::Provider {
            provider: provider.into(),
            message: msg.into(),
        })
    }

    /// Whether a segmentation chain may move on to its next provider
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::Segmentation(
                SegmentationFailure::Provider { .. } | SegmentationFailure::Timeout { .. }
            )
        )
    }

    /// Whether segmentation rejected the input itself
    #[must_use]
    pub fn is_bad_request(&self) -> bool {
        matches!(self, Self::Segmentation(SegmentationFailure::BadRequest(_)))
    }

    /// I/O error that names the operation and the path involved
    pub fn file_io_error<P: AsRef<std::path::Path>>(
        operation: &str,
        path: P,
        error: &std::io::Error,
    ) -> Self {
        let message = format!(
            "could not {} {}: {}",
            operation,
            path.as_ref().display(),
            error
        );
        Self::Io(std::io::Error::new(error.kind(), message))
    }

    /// Out-of-range setting, naming the accepted range and the default
    pub fn config_value_error<T: std::fmt::Display>(
        parameter: &str,
        value: T,
        valid_range: &str,
        default: Option<T>,
    ) -> Self {
        let hint = default
            .map(|default| format!(", default is {}", default))
            .unwrap_or_default();
        Self::InvalidConfig(format!(
            "{} must be in {}, got {}{}",
            parameter, valid_range, value, hint
        ))
    }

    /// Raster processing failure attributed to a pipeline stage
    pub fn processing_stage_error(stage: &str, details: &str, input_info: Option<&str>) -> Self {
        let message = match input_info {
            Some(info) => format!("{} on {}: {}", stage, info, details),
            None => format!("{}: {}", stage, details),
        };
        Self::Processing(message)
    }
}
