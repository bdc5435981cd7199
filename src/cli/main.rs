//! Sticker CLI tool
//!
//! Turns background-removed images into square WebP stickers, one file at a
//! time or as a concurrent batch.

use super::config::CliConfigBuilder;
use crate::{
    processor::StickerProcessor,
    services::{ConsoleProgressReporter, ImageIOService},
    tracing_config::{events, init_cli_tracing, spans, TracingOutput},
    types::StickerResult,
};
use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use futures::stream::{self, StreamExt};
use indicatif::{ProgressBar, ProgressStyle};
use log::{error, info, warn};
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};
use tracing::Instrument;

/// Extensions picked up when walking input directories
const IMAGE_EXTENSIONS: [&str; 6] = ["jpg", "jpeg", "png", "webp", "tiff", "tif"];

/// Sticker compositing CLI tool
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
#[command(name = "misticker")]
pub struct Cli {
    /// Input cutout images or directories (use "-" for stdin)
    #[arg(value_name = "INPUT", required = true)]
    pub input: Vec<String>,

    /// Output file (single input) or directory (batch processing). Use "-" for stdout.
    #[arg(short, long, value_name = "OUTPUT")]
    pub output: Option<String>,

    /// White border thickness in pixels [default: 10]
    #[arg(short, long, value_name = "PIXELS")]
    pub margin: Option<u8>,

    /// Side length of the square sticker canvas [default: 512]
    #[arg(short, long, value_name = "PIXELS")]
    pub size: Option<u32>,

    /// WebP quality (0-100) [default: 90]
    #[arg(short, long)]
    pub quality: Option<u8>,

    /// WebP compression method (0 = fast, 6 = smallest) [default: 6]
    #[arg(long)]
    pub method: Option<u8>,

    /// Resampling filter used when downscaling [default: lanczos3]
    #[arg(long, value_enum)]
    pub filter: Option<CliResizeFilter>,

    /// JSON configuration file; flags given on the command line override it
    #[arg(short, long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Number of stickers processed concurrently (0 = one per CPU core)
    #[arg(short, long, default_value_t = 0)]
    pub jobs: usize,

    /// Enable verbose logging (-v: DEBUG, -vv: TRACE)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Process directories recursively
    #[arg(short, long)]
    pub recursive: bool,

    /// File name pattern for directory inputs (e.g., "*.png")
    #[arg(long)]
    pub pattern: Option<String>,

    /// Also write logs to this file, rotated daily
    #[cfg(feature = "tracing-files")]
    #[arg(long, value_name = "FILE")]
    pub log_file: Option<PathBuf>,
}

#[derive(Copy, Clone, PartialEq, Eq, ValueEnum, Debug)]
pub enum CliResizeFilter {
    Nearest,
    Triangle,
    CatmullRom,
    Gaussian,
    Lanczos3,
}

/// Where a finished sticker goes
#[derive(Debug, Clone, PartialEq, Eq)]
enum OutputTarget {
    File(PathBuf),
    Stdout,
}

impl std::fmt::Display for OutputTarget {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::File(path) => write!(f, "{}", path.display()),
            Self::Stdout => write!(f, "<stdout>"),
        }
    }
}

/// Outcome counts of one CLI run
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
struct RunSummary {
    processed: usize,
    failed: usize,
}

pub async fn main() -> Result<()> {
    let cli = Cli::parse();

    let _tracing_guard =
        init_cli_tracing(cli.verbose, log_output(&cli)).context("Failed to initialize tracing")?;

    CliConfigBuilder::validate_cli(&cli).context("Invalid CLI arguments")?;
    let config = CliConfigBuilder::from_cli(&cli).context("Failed to build configuration")?;

    info!(
        "Sticker settings: margin {}px, canvas {}px, WebP q{} m{}, {} filter",
        config.border_margin,
        config.canvas_size,
        config.webp_quality,
        config.webp_method,
        config.resize_filter
    );

    let mut processor = StickerProcessor::new(config).context("Invalid configuration")?;
    if cli.verbose > 0 {
        processor =
            processor.with_progress_reporter(Box::new(ConsoleProgressReporter::new(cli.verbose > 1)));
    }

    let summary = process_inputs(&cli, &processor).await?;

    if summary.failed > 0 {
        anyhow::bail!(
            "{} of {} sticker(s) failed",
            summary.failed,
            summary.processed + summary.failed
        );
    }

    Ok(())
}

#[cfg_attr(not(feature = "tracing-files"), allow(unused_variables))]
fn log_output(cli: &Cli) -> TracingOutput {
    #[cfg(feature = "tracing-files")]
    if let Some(path) = &cli.log_file {
        return TracingOutput::Both(path.clone());
    }
    TracingOutput::Stderr
}

async fn process_inputs(cli: &Cli, processor: &StickerProcessor) -> Result<RunSummary> {
    if cli.input.len() == 1 && cli.input.first().is_some_and(|s| s == "-") {
        return process_stdin(cli.output.as_deref(), processor).await;
    }

    let mut all_files = Vec::new();

    for input in &cli.input {
        if input == "-" {
            anyhow::bail!("Stdin (-) cannot be combined with other inputs");
        }

        let path = PathBuf::from(input);
        if path.is_file() {
            if ImageIOService::is_supported_format(&path) {
                all_files.push(path);
            } else {
                warn!("Skipping unsupported file: {}", path.display());
            }
        } else if path.is_dir() {
            let dir_files = find_image_files(&path, cli.recursive, cli.pattern.as_deref())?;
            all_files.extend(dir_files);
        } else {
            anyhow::bail!(
                "Input path does not exist or is not accessible: {}",
                path.display()
            );
        }
    }

    if all_files.is_empty() {
        warn!("No supported images found in the provided inputs");
        return Ok(RunSummary::default());
    }

    all_files.sort();
    all_files.dedup();

    let work = plan_outputs(all_files, cli.output.as_deref())?;
    let jobs = resolve_jobs(cli.jobs);
    let file_count = work.len();

    info!("Found {} image(s) to process with {} job(s)", file_count, jobs);

    let progress = (file_count > 1).then(|| {
        let pb = ProgressBar::new(file_count as u64);
        let style = ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} {msg}")
            .map(|style| style.progress_chars("#>-"))
            .unwrap_or_else(|_| ProgressStyle::default_bar());
        pb.set_style(style);
        pb
    });

    let batch_start = Instant::now();
    let outcomes: Vec<(PathBuf, Result<StickerResult>)> = stream::iter(work)
        .map(|(input, output)| {
            let processor = processor.clone();
            let progress = progress.clone();
            async move {
                let span = spans::sticker(&input.display().to_string(), &output.to_string());
                let outcome = process_single_file(processor, &input, &output)
                    .instrument(span)
                    .await;
                if let Some(pb) = &progress {
                    pb.set_message(format!("{}", input.display()));
                    pb.inc(1);
                }
                (input, outcome)
            }
        })
        .buffer_unordered(jobs)
        .collect()
        .instrument(spans::batch(file_count, jobs))
        .await;

    let mut summary = RunSummary::default();
    for (input, outcome) in &outcomes {
        match outcome {
            Ok(_) => summary.processed += 1,
            Err(e) => {
                summary.failed += 1;
                error!("❌ Failed to process {}: {:#}", input.display(), e);
                events::error_with_context(&**e, &input.display().to_string());
            },
        }
    }

    if let Some(pb) = progress {
        pb.finish_with_message(format!(
            "Completed! Processed: {}, Failed: {}",
            summary.processed, summary.failed
        ));
    }

    if file_count > 1 {
        log_batch_summary(summary, batch_start.elapsed());
    }

    Ok(summary)
}

async fn process_stdin(output: Option<&str>, processor: &StickerProcessor) -> Result<RunSummary> {
    info!("Reading image from stdin");

    let image_data = ImageIOService::read_stdin()
        .await
        .context("Failed to read image data from stdin")?;
    if image_data.is_empty() {
        anyhow::bail!("No image data received on stdin");
    }

    let processor = processor.clone();
    let result = tokio::task::spawn_blocking(move || processor.process_bytes(&image_data))
        .await
        .context("Sticker task panicked")?
        .context("Failed to create sticker from stdin")?;

    let target = match output {
        None | Some("-") => OutputTarget::Stdout,
        Some(path) => OutputTarget::File(PathBuf::from(path)),
    };
    write_output(&result, &target).await?;
    info!("✅ stdin -> {} | {}", target, result.timing_summary());

    Ok(RunSummary {
        processed: 1,
        failed: 0,
    })
}

async fn process_single_file(
    processor: StickerProcessor,
    input_path: &Path,
    output: &OutputTarget,
) -> Result<StickerResult> {
    let image_data = tokio::fs::read(input_path)
        .await
        .with_context(|| format!("Failed to read {}", input_path.display()))?;

    let result = tokio::task::spawn_blocking(move || processor.process_bytes(&image_data))
        .await
        .context("Sticker task panicked")?
        .with_context(|| format!("Failed to create sticker from {}", input_path.display()))?;

    write_output(&result, output).await?;

    let timings = result.timings();
    events::stage_completed("border", timings.border_ms);
    events::stage_completed("canvas", timings.canvas_ms);
    events::stage_completed("encode", timings.encode_ms);
    info!(
        "✅ {} -> {} | {}",
        input_path.display(),
        output,
        result.timing_summary()
    );

    Ok(result)
}

async fn write_output(result: &StickerResult, target: &OutputTarget) -> Result<()> {
    match target {
        OutputTarget::File(path) => result
            .save(path)
            .with_context(|| format!("Failed to write {}", path.display())),
        OutputTarget::Stdout => ImageIOService::write_stdout(result.bytes())
            .await
            .map(|_| ())
            .context("Failed to write sticker to stdout"),
    }
}

/// Pair every input with its output target
fn plan_outputs(
    files: Vec<PathBuf>,
    output: Option<&str>,
) -> Result<Vec<(PathBuf, OutputTarget)>> {
    if let [single] = files.as_slice() {
        let target = match output {
            Some("-") => OutputTarget::Stdout,
            Some(path) => OutputTarget::File(PathBuf::from(path)),
            None => OutputTarget::File(ImageIOService::default_output_path(single)),
        };
        return Ok(vec![(single.clone(), target)]);
    }

    let output_dir = match output {
        Some("-") => {
            anyhow::bail!("Cannot use stdout (-) as output when processing multiple files")
        },
        Some(dir) => {
            let dir = PathBuf::from(dir);
            if dir.is_file() {
                anyhow::bail!(
                    "Output path exists and is a file, not a directory: {}",
                    dir.display()
                );
            }
            std::fs::create_dir_all(&dir).with_context(|| {
                format!("Failed to create output directory: {}", dir.display())
            })?;
            Some(dir)
        },
        None => None,
    };

    Ok(files
        .into_iter()
        .map(|input| {
            let target = match &output_dir {
                Some(dir) => ImageIOService::batch_output_path(&input, dir),
                None => ImageIOService::default_output_path(&input),
            };
            (input, OutputTarget::File(target))
        })
        .collect())
}

/// Number of concurrent sticker tasks; 0 means one per available core
fn resolve_jobs(requested: usize) -> usize {
    if requested > 0 {
        return requested;
    }
    std::thread::available_parallelism().map_or(1, std::num::NonZeroUsize::get)
}

fn find_image_files(dir: &Path, recursive: bool, pattern: Option<&str>) -> Result<Vec<PathBuf>> {
    let max_depth = if recursive { usize::MAX } else { 1 };
    let mut files = Vec::new();

    for entry in walkdir::WalkDir::new(dir).max_depth(max_depth) {
        let entry = entry.with_context(|| format!("Failed to read directory {}", dir.display()))?;
        if !entry.file_type().is_file() {
            continue;
        }
        let path = entry.path();
        // Generated stickers are skipped so reruns do not sticker them again.
        let is_sticker = path
            .file_name()
            .and_then(|n| n.to_str())
            .is_some_and(|n| n.ends_with(crate::services::STICKER_SUFFIX));
        if !is_sticker
            && is_image_file(path, &IMAGE_EXTENSIONS)
            && matches_pattern(path, pattern)
        {
            files.push(path.to_path_buf());
        }
    }

    Ok(files)
}

fn is_image_file(path: &Path, extensions: &[&str]) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| extensions.contains(&ext.to_lowercase().as_str()))
}

fn matches_pattern(path: &Path, pattern: Option<&str>) -> bool {
    match pattern {
        Some(pat) => path
            .file_name()
            .and_then(|n| n.to_str())
            .is_some_and(|name| {
                glob::Pattern::new(pat)
                    .map(|p| p.matches(name))
                    .unwrap_or(false)
            }),
        None => true,
    }
}

fn log_batch_summary(summary: RunSummary, elapsed: Duration) {
    info!("📊 Batch summary:");
    info!("  ├─ Stickers created: {}", summary.processed);
    info!("  ├─ Failed: {}", summary.failed);
    info!("  ├─ Total time: {:.2}s", elapsed.as_secs_f64());
    info!(
        "  └─ Average per sticker: {:.2}s",
        if summary.processed > 0 {
            elapsed.as_secs_f64() / summary.processed as f64
        } else {
            0.0
        }
    );
}
