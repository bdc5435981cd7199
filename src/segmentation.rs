//! Background segmentation collaborators
//!
//! The sticker pipeline expects an RGBA image whose alpha channel already
//! separates subject from background. Producing that alpha is delegated to
//! a [`Segmenter`]; no network provider ships with this crate, callers
//! supply their own implementation.

use crate::error::{Result, SegmentationFailure, StickerError};
use async_trait::async_trait;
use log::{info, warn};
use std::time::Duration;

/// External background removal provider
///
/// Implementations take encoded photo bytes and return encoded image bytes
/// with the background made transparent.
///
/// Errors should be reported as [`StickerError::Segmentation`]:
/// `BadRequest` when the provider rejected the input itself, `Provider`
/// for anything on the provider's side.
#[async_trait]
pub trait Segmenter: Send + Sync {
    /// Name used in logs and failure reports
    fn name(&self) -> &str;

    /// Remove the background from an encoded photo
    async fn remove_background(&self, image: &[u8]) -> Result<Vec<u8>>;
}

/// Segmenter for inputs that are already cut out
///
/// Returns its input unchanged.
#[derive(Debug, Clone, Copy, Default)]
pub struct PassthroughSegmenter;

#[async_trait]
impl Segmenter for PassthroughSegmenter {
    fn name(&self) -> &str {
        "passthrough"
    }

    async fn remove_background(&self, image: &[u8]) -> Result<Vec<u8>> {
        Ok(image.to_vec())
    }
}

/// Run one segmentation call bounded by `timeout`
///
/// # Errors
/// - `SegmentationFailure::Timeout` when the provider does not answer in time
/// - Any error the provider itself returns
pub async fn segment_with_timeout(
    segmenter: &dyn Segmenter,
    image: &[u8],
    timeout: Duration,
) -> Result<Vec<u8>> {
    match tokio::time::timeout(timeout, segmenter.remove_background(image)).await {
        Ok(result) => result,
        Err(_) => Err(StickerError::Segmentation(SegmentationFailure::Timeout {
            provider: segmenter.name().to_string(),
            timeout_ms: u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX),
        })),
    }
}

/// Ordered list of interchangeable providers tried one after another
///
/// Each attempt is bounded by the chain's timeout. A bad request stops the
/// chain and is returned as-is; any other failure moves on to the next
/// provider. When every provider fails the error lists each failure.
pub struct SegmenterChain {
    providers: Vec<Box<dyn Segmenter>>,
    timeout: Duration,
}

impl SegmenterChain {
    /// Create an empty chain with the given per-attempt timeout
    #[must_use]
    pub fn new(timeout: Duration) -> Self {
        Self {
            providers: Vec::new(),
            timeout,
        }
    }

    /// Append a provider
    #[must_use]
    pub fn with_provider<S: Segmenter + 'static>(mut self, provider: S) -> Self {
        self.providers.push(Box::new(provider));
        self
    }

    /// Append an already boxed provider
    pub fn push(&mut self, provider: Box<dyn Segmenter>) {
        self.providers.push(provider);
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.providers.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.providers.is_empty()
    }

    /// Provider names in the order they are tried
    #[must_use]
    pub fn provider_names(&self) -> Vec<&str> {
        self.providers.iter().map(|p| p.name()).collect()
    }

    #[must_use]
    pub fn timeout(&self) -> Duration {
        self.timeout
    }
}

#[async_trait]
impl Segmenter for SegmenterChain {
    fn name(&self) -> &str {
        "chain"
    }

    async fn remove_background(&self, image: &[u8]) -> Result<Vec<u8>> {
        if self.providers.is_empty() {
            return Err(StickerError::invalid_config(
                "Segmenter chain has no providers",
            ));
        }

        let mut failures = Vec::with_capacity(self.providers.len());

        for (attempt, provider) in self.providers.iter().enumerate() {
            match segment_with_timeout(provider.as_ref(), image, self.timeout).await {
                Ok(cutout) => {
                    info!(
                        "Segmentation succeeded with provider '{}' (attempt {}/{})",
                        provider.name(),
                        attempt + 1,
                        self.providers.len()
                    );
                    return Ok(cutout);
                },
                Err(e) if e.is_bad_request() => {
                    warn!("Provider '{}' rejected the input: {}", provider.name(), e);
                    return Err(e);
                },
                Err(e) => {
                    warn!("Provider '{}' failed, trying next: {}", provider.name(), e);
                    failures.push(format!("{}: {}", provider.name(), e));
                },
            }
        }

        Err(StickerError::Segmentation(SegmentationFailure::Exhausted(
            failures,
        )))
    }
}
