//! Tracing subscriber setup for the command line front end
//!
//! The library only emits `log` records and `tracing` spans; installing a
//! subscriber is left to the binary. `log` records are bridged into the
//! subscriber by `tracing-subscriber`'s default `tracing-log` integration.

use tracing_subscriber::{
    fmt,
    layer::{Layered, SubscriberExt},
    util::SubscriberInitExt,
    EnvFilter, Layer, Registry,
};

type FilteredRegistry = Layered<EnvFilter, Registry>;
type BoxedLayer = Box<dyn Layer<FilteredRegistry> + Send + Sync + 'static>;

/// How log lines are rendered
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TracingFormat {
    /// Colored single-line output for terminals
    #[default]
    Pretty,
    /// Uncolored single-line output, for CI logs and pipes
    Compact,
    /// One JSON object per event, including the active span list
    #[cfg(feature = "tracing-json")]
    Json,
}

/// Where log lines go
///
/// Stderr is the only console target: stdout may carry sticker bytes.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum TracingOutput {
    #[default]
    Stderr,
    /// A single, never rotated log file
    #[cfg(feature = "tracing-files")]
    File(std::path::PathBuf),
    /// Stderr plus a daily rotated log file
    #[cfg(feature = "tracing-files")]
    Both(std::path::PathBuf),
}

/// Keeps background log writers alive; drop it only at process exit
#[derive(Default)]
#[must_use]
pub struct TracingGuard {
    #[cfg(feature = "tracing-files")]
    _file_writer: Option<tracing_appender::non_blocking::WorkerGuard>,
}

/// Subscriber settings, applied once per process by [`TracingConfig::init`]
#[derive(Debug, Clone, Default)]
pub struct TracingConfig {
    /// Number of `-v` flags given
    pub verbosity: u8,
    pub format: TracingFormat,
    pub output: TracingOutput,
    /// Filter directives that replace the verbosity mapping, e.g. `misticker::border=trace`
    pub directives: Option<String>,
    /// Id logged at startup so a run's lines can be correlated
    pub session_id: Option<String>,
}

impl TracingConfig {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_verbosity(mut self, verbosity: u8) -> Self {
        self.verbosity = verbosity;
        self
    }

    #[must_use]
    pub fn with_format(mut self, format: TracingFormat) -> Self {
        self.format = format;
        self
    }

    #[must_use]
    pub fn with_output(mut self, output: TracingOutput) -> Self {
        self.output = output;
        self
    }

    #[must_use]
    pub fn with_directives<S: Into<String>>(mut self, directives: S) -> Self {
        self.directives = Some(directives.into());
        self
    }

    #[must_use]
    pub fn with_session_id<S: Into<String>>(mut self, session_id: S) -> Self {
        self.session_id = Some(session_id.into());
        self
    }

    /// Filter directives in effect: explicit directives win over verbosity
    ///
    /// Other crates stay one level quieter than `misticker` at every verbosity.
    #[must_use]
    pub fn effective_directives(&self) -> &str {
        if let Some(directives) = &self.directives {
            return directives;
        }
        match self.verbosity {
            0 => "warn,misticker=info",
            1 => "info,misticker=debug",
            _ => "debug,misticker=trace",
        }
    }

    /// Install the global subscriber
    ///
    /// # Errors
    /// - Invalid filter directives
    /// - A global subscriber is already installed
    pub fn init(self) -> anyhow::Result<TracingGuard> {
        let filter = EnvFilter::try_new(self.effective_directives())?;

        #[allow(unused_mut)]
        let mut guard = TracingGuard::default();
        let mut layers: Vec<BoxedLayer> = Vec::with_capacity(2);

        match &self.output {
            TracingOutput::Stderr => layers.push(stderr_layer(self.format)),
            #[cfg(feature = "tracing-files")]
            TracingOutput::File(path) => {
                let (layer, worker) =
                    file_layer(path, tracing_appender::rolling::Rotation::NEVER, self.format);
                layers.push(layer);
                guard._file_writer = Some(worker);
            },
            #[cfg(feature = "tracing-files")]
            TracingOutput::Both(path) => {
                layers.push(stderr_layer(self.format));
                let (layer, worker) =
                    file_layer(path, tracing_appender::rolling::Rotation::DAILY, self.format);
                layers.push(layer);
                guard._file_writer = Some(worker);
            },
        }

        Registry::default().with(filter).with(layers).try_init()?;

        if let Some(session_id) = &self.session_id {
            tracing::debug!(session_id = %session_id, "Sticker session started");
        }

        Ok(guard)
    }
}

fn stderr_layer(format: TracingFormat) -> BoxedLayer {
    let layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(false);

    match format {
        TracingFormat::Pretty => layer.with_ansi(true).compact().boxed(),
        TracingFormat::Compact => layer.with_ansi(false).compact().boxed(),
        #[cfg(feature = "tracing-json")]
        TracingFormat::Json => layer
            .json()
            .with_current_span(true)
            .with_span_list(true)
            .boxed(),
    }
}

#[cfg(feature = "tracing-files")]
fn file_layer(
    path: &std::path::Path,
    rotation: tracing_appender::rolling::Rotation,
    format: TracingFormat,
) -> (BoxedLayer, tracing_appender::non_blocking::WorkerGuard) {
    use std::path::Path;

    let directory = path
        .parent()
        .filter(|dir| !dir.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));
    let file_name = path
        .file_name()
        .map_or_else(|| "misticker.log".into(), std::ffi::OsStr::to_os_string);

    let appender = tracing_appender::rolling::RollingFileAppender::new(rotation, directory, file_name);
    let (writer, worker) = tracing_appender::non_blocking(appender);

    let layer = fmt::layer().with_ansi(false).with_writer(writer);
    let layer = match format {
        #[cfg(feature = "tracing-json")]
        TracingFormat::Json => layer.json().with_current_span(true).boxed(),
        _ => layer.compact().boxed(),
    };

    (layer, worker)
}

/// Initialize tracing for the CLI with a fresh session id
///
/// # Errors
/// - A global subscriber is already installed
pub fn init_cli_tracing(verbosity: u8, output: TracingOutput) -> anyhow::Result<TracingGuard> {
    TracingConfig::new()
        .with_verbosity(verbosity)
        .with_output(output)
        .with_session_id(uuid::Uuid::new_v4().to_string())
        .init()
}

/// Spans wrapping CLI work units
pub mod spans {
    use tracing::{Level, Span};

    /// One sticker, from input read to output write
    pub fn sticker(input: &str, output: &str) -> Span {
        tracing::span!(Level::INFO, "sticker", input = %input, output = %output)
    }

    /// A batch run over many inputs
    pub fn batch(file_count: usize, jobs: usize) -> Span {
        tracing::span!(Level::INFO, "batch", file_count, jobs)
    }
}

/// Structured events shared by the CLI
pub mod events {
    use tracing::{debug, error};

    pub fn stage_completed(stage: &str, duration_ms: u64) {
        debug!(stage = %stage, duration_ms, "Stage completed");
    }

    /// Record a failure together with the input it belongs to
    pub fn error_with_context(error: &dyn std::error::Error, context: &str) {
        error!(error = %error, context = %context, "Sticker failed");
    }
}
