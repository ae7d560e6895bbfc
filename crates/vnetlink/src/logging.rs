//! Leveled logging setup on top of `tracing-subscriber`.
//!
//! The library itself only emits `tracing` events. Applications that do not
//! bring their own subscriber can install one here:
//!
//! ```no_run
//! use vnetlink::logging::{LogConfig, LogLevel, LogSink};
//!
//! let _guard = LogConfig::new()
//!     .sink(LogSink::File("/tmp/testbed.log".into()))
//!     .threshold(LogLevel::Info)
//!     .init()
//!     .expect("logger");
//! tracing::info!("testbed up");
//! ```

use std::fs::{File, OpenOptions};
use std::io::IsTerminal;
use std::path::PathBuf;
use std::sync::Arc;

use tracing::Subscriber;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::fmt::writer::BoxMakeWriter;

use crate::netlink::{Error, Result};

/// A type-erased subscriber built from a [`LogConfig`].
pub type BoxedSubscriber = Box<dyn Subscriber + Send + Sync + 'static>;

/// Log severity, lowest first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum LogLevel {
    Debug,
    #[default]
    Info,
    Warning,
    Error,
}

impl LogLevel {
    /// All levels, lowest first.
    pub const ALL: [LogLevel; 4] = [Self::Debug, Self::Info, Self::Warning, Self::Error];

    /// Upper-case label.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Debug => "DEBUG",
            Self::Info => "INFO",
            Self::Warning => "WARNING",
            Self::Error => "ERROR",
        }
    }
}

impl From<LogLevel> for LevelFilter {
    fn from(level: LogLevel) -> Self {
        match level {
            LogLevel::Debug => LevelFilter::DEBUG,
            LogLevel::Info => LevelFilter::INFO,
            LogLevel::Warning => LevelFilter::WARN,
            LogLevel::Error => LevelFilter::ERROR,
        }
    }
}

impl std::str::FromStr for LogLevel {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "debug" => Ok(Self::Debug),
            "info" => Ok(Self::Info),
            "warn" | "warning" => Ok(Self::Warning),
            "error" => Ok(Self::Error),
            _ => Err(Error::InvalidConfig(format!("unknown log level: {s}"))),
        }
    }
}

/// Where log lines go.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum LogSink {
    #[default]
    Stderr,
    Stdout,
    /// Append to a file, creating it if needed.
    File(PathBuf),
}

/// Logger settings.
#[derive(Debug, Clone, Default)]
pub struct LogConfig {
    pub sink: LogSink,
    /// ANSI colors; `None` colors terminals and never files.
    pub colorize: Option<bool>,
    pub threshold: LogLevel,
    /// Extra `EnvFilter` directives, e.g. `"vnetlink::netlink=trace"`.
    pub filter: Option<String>,
}

impl LogConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn sink(mut self, sink: LogSink) -> Self {
        self.sink = sink;
        self
    }

    /// Force colors on or off regardless of the sink.
    pub fn colorize(mut self, enabled: bool) -> Self {
        self.colorize = Some(enabled);
        self
    }

    pub fn threshold(mut self, level: LogLevel) -> Self {
        self.threshold = level;
        self
    }

    pub fn filter(mut self, directives: impl Into<String>) -> Self {
        self.filter = Some(directives.into());
        self
    }

    fn env_filter(&self) -> EnvFilter {
        EnvFilter::builder()
            .with_default_directive(LevelFilter::from(self.threshold).into())
            .parse_lossy(self.filter.as_deref().unwrap_or(""))
    }

    /// Build the subscriber without installing it.
    pub fn build(&self) -> Result<(BoxedSubscriber, LogGuard)> {
        let (writer, ansi, file) = match &self.sink {
            LogSink::Stderr => (
                BoxMakeWriter::new(std::io::stderr),
                std::io::stderr().is_terminal(),
                None,
            ),
            LogSink::Stdout => (
                BoxMakeWriter::new(std::io::stdout),
                std::io::stdout().is_terminal(),
                None,
            ),
            LogSink::File(path) => {
                let file = Arc::new(OpenOptions::new().create(true).append(true).open(path)?);
                (BoxMakeWriter::new(Arc::clone(&file)), false, Some(file))
            }
        };

        let subscriber = tracing_subscriber::fmt()
            .with_env_filter(self.env_filter())
            .with_ansi(self.colorize.unwrap_or(ansi))
            .with_writer(writer)
            .finish();

        Ok((Box::new(subscriber), LogGuard { file }))
    }

    /// Install the subscriber as the global default.
    ///
    /// Keep the returned guard alive for as long as logging is needed.
    pub fn init(&self) -> Result<LogGuard> {
        let (subscriber, guard) = self.build()?;
        tracing::subscriber::set_global_default(subscriber)
            .map_err(|e| Error::InvalidConfig(format!("cannot install logger: {e}")))?;
        Ok(guard)
    }
}

/// Flushes the file sink when dropped.
#[derive(Debug)]
#[must_use = "dropping the guard flushes the log file"]
pub struct LogGuard {
    file: Option<Arc<File>>,
}

impl Drop for LogGuard {
    fn drop(&mut self) {
        if let Some(file) = &self.file {
            let _ = file.sync_all();
        }
    }
}
