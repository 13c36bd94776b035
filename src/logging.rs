//! Log sink
//!
//! The merge core reports progress and diagnostics through [`MergeLogger`].
//! The CLI installs [`TracingLogger`]; tests capture entries with
//! [`MemoryLogger`].

use merger_xml::SourceFilePosition;
use serde::{Deserialize, Serialize};
use std::cell::RefCell;
use std::fmt;
use std::str::FromStr;
use tracing_subscriber::EnvFilter;

/// Severity of a log entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum LogLevel {
    Verbose,
    Info,
    Warning,
    Error,
}

impl LogLevel {
    /// Directive for a tracing `EnvFilter`
    pub fn filter_directive(&self) -> &'static str {
        match self {
            Self::Verbose => "debug",
            Self::Info => "info",
            Self::Warning => "warn",
            Self::Error => "error",
        }
    }
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Verbose => write!(f, "VERBOSE"),
            Self::Info => write!(f, "INFO"),
            Self::Warning => write!(f, "WARNING"),
            Self::Error => write!(f, "ERROR"),
        }
    }
}

impl FromStr for LogLevel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "VERBOSE" => Ok(Self::Verbose),
            "INFO" => Ok(Self::Info),
            "WARNING" => Ok(Self::Warning),
            "ERROR" => Ok(Self::Error),
            _ => Err(format!(
                "invalid log level '{}', expected one of VERBOSE, INFO, WARNING, ERROR",
                s
            )),
        }
    }
}

/// Abstract sink of (level, message, position) triples
pub trait MergeLogger {
    fn log(&self, level: LogLevel, message: &str, position: Option<&SourceFilePosition>);

    fn verbose(&self, message: &str) {
        self.log(LogLevel::Verbose, message, None);
    }

    fn info(&self, message: &str) {
        self.log(LogLevel::Info, message, None);
    }

    fn warning(&self, message: &str) {
        self.log(LogLevel::Warning, message, None);
    }

    fn error(&self, message: &str) {
        self.log(LogLevel::Error, message, None);
    }
}

/// Forwards entries to `tracing` events
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingLogger;

impl MergeLogger for TracingLogger {
    fn log(&self, level: LogLevel, message: &str, position: Option<&SourceFilePosition>) {
        let position = position.map(ToString::to_string).unwrap_or_default();
        match level {
            LogLevel::Verbose => tracing::debug!(%position, "{}", message),
            LogLevel::Info => tracing::info!(%position, "{}", message),
            LogLevel::Warning => tracing::warn!(%position, "{}", message),
            LogLevel::Error => tracing::error!(%position, "{}", message),
        }
    }
}

/// Discards everything
#[derive(Debug, Default, Clone, Copy)]
pub struct NullLogger;

impl MergeLogger for NullLogger {
    fn log(&self, _level: LogLevel, _message: &str, _position: Option<&SourceFilePosition>) {}
}

/// A captured log entry
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogEntry {
    pub level: LogLevel,
    pub message: String,
    pub position: Option<SourceFilePosition>,
}

/// Keeps every entry in memory
#[derive(Debug, Default)]
pub struct MemoryLogger {
    entries: RefCell<Vec<LogEntry>>,
}

impl MemoryLogger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn entries(&self) -> Vec<LogEntry> {
        self.entries.borrow().clone()
    }

    /// Entries at or above `level`
    pub fn at_least(&self, level: LogLevel) -> Vec<LogEntry> {
        self.entries
            .borrow()
            .iter()
            .filter(|e| e.level >= level)
            .cloned()
            .collect()
    }
}

impl MergeLogger for MemoryLogger {
    fn log(&self, level: LogLevel, message: &str, position: Option<&SourceFilePosition>) {
        self.entries.borrow_mut().push(LogEntry {
            level,
            message: message.to_string(),
            position: position.cloned(),
        });
    }
}

/// Install a stderr `tracing` subscriber.
///
/// `RUST_LOG` takes precedence over `level` when set.
pub fn init_tracing(level: LogLevel) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(level.filter_directive()));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_level_parsing() {
        assert_eq!("verbose".parse::<LogLevel>(), Ok(LogLevel::Verbose));
        assert_eq!("WARNING".parse::<LogLevel>(), Ok(LogLevel::Warning));
        assert!("loud".parse::<LogLevel>().is_err());
        assert!(LogLevel::Error > LogLevel::Warning);
    }

    #[test]
    fn test_memory_logger() {
        let logger = MemoryLogger::new();
        logger.verbose("walking");
        logger.warning("careful");
        logger.log(LogLevel::Error, "broken", Some(&SourceFilePosition::unknown()));

        assert_eq!(logger.entries().len(), 3);
        let serious = logger.at_least(LogLevel::Warning);
        assert_eq!(serious.len(), 2);
        assert_eq!(serious[1].message, "broken");
        assert!(serious[1].position.is_some());
    }
}
