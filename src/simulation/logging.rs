//! Logging and tracing configuration
//!
//! Two outputs live here. `LoggingConfig` sets up the process-wide `tracing`
//! subscriber. `RunLog` is the plain-text trace a run hands back to its caller;
//! every line it records is mirrored to `tracing` as well.

use std::io;
use std::path::PathBuf;
use tracing::{info, Level};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::{non_blocking, rolling};
use tracing_subscriber::{
    filter::ParseError,
    fmt::{self, format::FmtSpan},
    layer::SubscriberExt,
    util::{SubscriberInitExt, TryInitError},
    EnvFilter, Layer, Registry,
};

/// Failure to install the process-wide subscriber
#[derive(Debug, thiserror::Error)]
pub enum LoggingError {
    /// The filter directive does not parse
    #[error("Invalid log filter: {0}")]
    Filter(#[from] ParseError),
    /// Another subscriber is already installed
    #[error("Logging already initialized: {0}")]
    AlreadyInitialized(#[from] TryInitError),
}

/// Console rendering
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    /// Multi-line human output
    #[default]
    Pretty,
    /// One JSON object per event
    Json,
}

/// Daily-rolling JSON file sink
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileSink {
    /// Directory the files roll in
    pub directory: PathBuf,
    /// File name prefix, the date is appended
    pub prefix: String,
}

/// Process-wide logging setup
#[derive(Debug, Clone)]
pub struct LoggingConfig {
    /// Default level for this crate when no `RUST_LOG` is set
    pub level: Level,
    /// Console rendering
    pub format: LogFormat,
    /// Optional file sink, always JSON
    pub file: Option<FileSink>,
    /// Emit span open and close events, e.g. around a run
    pub span_events: bool,
    /// Colored console output
    pub ansi: bool,
    /// Explicit filter directive, overrides `level` and `RUST_LOG`
    pub filter: Option<String>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: Level::INFO,
            format: LogFormat::Pretty,
            file: None,
            span_events: false,
            ansi: true,
            filter: None,
        }
    }
}

impl LoggingConfig {
    /// Create a new logging configuration
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the log level
    pub fn with_level(mut self, level: Level) -> Self {
        self.level = level;
        self
    }

    /// Render console events as JSON
    pub fn with_json_format(mut self) -> Self {
        self.format = LogFormat::Json;
        self
    }

    /// Also write JSON events to `directory/prefix.YYYY-MM-DD`
    pub fn with_file_logging(mut self, directory: impl Into<PathBuf>, prefix: impl Into<String>) -> Self {
        self.file = Some(FileSink { directory: directory.into(), prefix: prefix.into() });
        self
    }

    /// Enable span events
    pub fn with_span_events(mut self) -> Self {
        self.span_events = true;
        self
    }

    /// Disable ANSI colors
    pub fn without_ansi(mut self) -> Self {
        self.ansi = false;
        self
    }

    /// Set an explicit filter directive
    pub fn with_env_filter(mut self, filter: impl Into<String>) -> Self {
        self.filter = Some(filter.into());
        self
    }

    fn fmt_span(&self) -> FmtSpan {
        if self.span_events {
            FmtSpan::NEW | FmtSpan::CLOSE
        } else {
            FmtSpan::NONE
        }
    }

    fn build_filter(&self) -> Result<EnvFilter, LoggingError> {
        if let Some(filter) = &self.filter {
            return Ok(EnvFilter::try_new(filter)?);
        }
        Ok(EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new(format!("prodline_sim={}", self.level))))
    }

    /// Install the global subscriber
    ///
    /// With a file sink the returned guard flushes the background writer when
    /// dropped, so the caller keeps it alive until the process ends.
    pub fn init(self) -> Result<Option<WorkerGuard>, LoggingError> {
        let console = match self.format {
            LogFormat::Json => fmt::layer()
                .json()
                .with_writer(io::stderr)
                .with_span_events(self.fmt_span())
                .boxed(),
            LogFormat::Pretty => fmt::layer()
                .pretty()
                .with_writer(io::stderr)
                .with_ansi(self.ansi)
                .with_span_events(self.fmt_span())
                .boxed(),
        };

        let (file, guard) = match &self.file {
            Some(sink) => {
                let (writer, guard) = non_blocking(rolling::daily(&sink.directory, &sink.prefix));
                let layer = fmt::layer().json().with_writer(writer).with_span_events(self.fmt_span());
                (Some(layer), Some(guard))
            }
            None => (None, None),
        };

        Registry::default().with(self.build_filter()?).with(console).with(file).try_init()?;

        info!(level = %self.level, format = ?self.format, file = self.file.is_some(), "Logging initialized");
        Ok(guard)
    }

    /// Warnings only, no colors; repeated calls are harmless
    pub fn init_test() -> Result<Option<WorkerGuard>, LoggingError> {
        Self::new().with_level(Level::WARN).without_ansi().init()
    }

    /// Progress of every run, with run spans
    pub fn init_verbose() -> Result<Option<WorkerGuard>, LoggingError> {
        Self::new().with_level(Level::INFO).with_span_events().init()
    }

    /// Every pool grant and event dispatch
    pub fn init_debug() -> Result<Option<WorkerGuard>, LoggingError> {
        Self::new().with_level(Level::DEBUG).with_span_events().init()
    }
}

/// Severity of a run log line
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel {
    /// Detailed trace
    Debug,
    /// Normal progress
    Info,
    /// Something was skipped
    Warn,
    /// The run cannot continue
    Error,
}

/// Human-readable trace returned with every run
#[derive(Debug, Clone, Default)]
pub struct RunLog {
    lines: Vec<String>,
}

impl RunLog {
    /// Create an empty log
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a line at the given level and mirror it to `tracing`
    pub fn push(&mut self, level: LogLevel, line: impl Into<String>) {
        let line = line.into();
        match level {
            LogLevel::Debug => tracing::debug!(target: "prodline_sim::run_log", "{}", line),
            LogLevel::Info => tracing::info!(target: "prodline_sim::run_log", "{}", line),
            LogLevel::Warn => tracing::warn!(target: "prodline_sim::run_log", "{}", line),
            LogLevel::Error => tracing::error!(target: "prodline_sim::run_log", "{}", line),
        }
        self.lines.push(line);
    }

    /// Record an informational line
    pub fn info(&mut self, line: impl Into<String>) {
        self.push(LogLevel::Info, line);
    }

    /// Record a warning line
    pub fn warn(&mut self, line: impl Into<String>) {
        self.push(LogLevel::Warn, line);
    }

    /// Record an error line
    pub fn error(&mut self, line: impl Into<String>) {
        self.push(LogLevel::Error, line);
    }

    /// Recorded lines in order
    pub fn lines(&self) -> &[String] {
        &self.lines
    }

    /// Consume the log into its lines
    pub fn into_lines(self) -> Vec<String> {
        self.lines
    }

    /// Number of recorded lines
    pub fn len(&self) -> usize {
        self.lines.len()
    }

    /// Whether nothing was recorded
    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    /// Whether any line contains the given text
    pub fn contains(&self, needle: &str) -> bool {
        self.lines.iter().any(|line| line.contains(needle))
    }
}

/// Structured engine event tagged with `component = "simulation"`
#[macro_export]
macro_rules! sim_event {
    ($level:ident, $message:expr, $($key:ident = $value:expr),* $(,)?) => {
        tracing::$level!(
            message = $message,
            component = "simulation",
            $($key = $value,)*
        );
    };
    ($level:ident, $message:expr) => {
        tracing::$level!(
            message = $message,
            component = "simulation",
        );
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_log_pretty_to_console_only() {
        let config = LoggingConfig::new();
        assert_eq!(config.level, Level::INFO);
        assert_eq!(config.format, LogFormat::Pretty);
        assert!(config.file.is_none());
        assert_eq!(config.fmt_span(), FmtSpan::NONE);
    }

    #[test]
    fn test_file_sink_and_filter() {
        let config = LoggingConfig::new()
            .with_level(Level::DEBUG)
            .with_json_format()
            .with_file_logging("run_logs", "line_a")
            .with_span_events()
            .without_ansi();

        assert_eq!(config.format, LogFormat::Json);
        assert_eq!(
            config.file,
            Some(FileSink { directory: PathBuf::from("run_logs"), prefix: "line_a".to_string() })
        );
        assert!(!config.ansi);
        assert_eq!(config.fmt_span(), FmtSpan::NEW | FmtSpan::CLOSE);

        let bad = LoggingConfig::new().with_env_filter("prodline_sim=loudest");
        assert!(matches!(bad.build_filter(), Err(LoggingError::Filter(_))));
    }

    #[test]
    fn test_run_log_records_lines() {
        let mut log = RunLog::new();
        assert!(log.is_empty());

        log.info("[Engine] start");
        log.warn("order A1 skipped");
        log.push(LogLevel::Debug, "detail");

        assert_eq!(log.len(), 3);
        assert!(log.contains("skipped"));
        assert!(!log.contains("missing"));
        assert_eq!(log.into_lines()[0], "[Engine] start");
    }
}
