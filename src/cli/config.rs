//! Configuration conversion utilities for CLI arguments

use crate::cli::main_impl::{Cli, CliResizeFilter};
use crate::config::{ResizeFilter, StickerConfig};
use anyhow::{Context, Result};

impl From<CliResizeFilter> for ResizeFilter {
    fn from(filter: CliResizeFilter) -> Self {
        match filter {
            CliResizeFilter::Nearest => ResizeFilter::Nearest,
            CliResizeFilter::Triangle => ResizeFilter::Triangle,
            CliResizeFilter::CatmullRom => ResizeFilter::CatmullRom,
            CliResizeFilter::Gaussian => ResizeFilter::Gaussian,
            CliResizeFilter::Lanczos3 => ResizeFilter::Lanczos3,
        }
    }
}

/// Convert CLI arguments to a validated `StickerConfig`
pub(crate) struct CliConfigBuilder;

impl CliConfigBuilder {
    /// Build the sticker configuration from CLI arguments
    ///
    /// Starts from `--config` when given, otherwise from the defaults, and
    /// applies every flag that was set explicitly on top.
    pub(crate) fn from_cli(cli: &Cli) -> Result<StickerConfig> {
        let mut config = match &cli.config {
            Some(path) => StickerConfig::from_json_file(path)
                .with_context(|| format!("Failed to load config file {}", path.display()))?,
            None => StickerConfig::default(),
        };

        if let Some(margin) = cli.margin {
            config.border_margin = margin;
        }
        if let Some(size) = cli.size {
            config.canvas_size = size;
        }
        if let Some(quality) = cli.quality {
            config.webp_quality = quality;
        }
        if let Some(method) = cli.method {
            config.webp_method = method;
        }
        if let Some(filter) = cli.filter {
            config.resize_filter = filter.into();
        }
        config.debug = config.debug || cli.verbose >= 2;

        config.validate().context("Invalid sticker settings")?;
        Ok(config)
    }

    /// Validate CLI arguments for consistency
    pub(crate) fn validate_cli(cli: &Cli) -> Result<()> {
        if let Some(pattern) = &cli.pattern {
            glob::Pattern::new(pattern)
                .with_context(|| format!("Invalid file pattern '{}'", pattern))?;
        }

        if cli.input.len() > 1 && cli.input.iter().any(|input| input == "-") {
            anyhow::bail!("Stdin (-) must be the only input");
        }

        Ok(())
    }
}
