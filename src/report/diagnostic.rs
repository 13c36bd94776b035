//! Diagnostics

use merger_xml::SourceFilePosition;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::logging::LogLevel;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Severity {
    Info,
    Warning,
    Error,
}

impl Severity {
    pub fn log_level(&self) -> LogLevel {
        match self {
            Self::Info => LogLevel::Info,
            Self::Warning => LogLevel::Warning,
            Self::Error => LogLevel::Error,
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Info => write!(f, "Info"),
            Self::Warning => write!(f, "Warning"),
            Self::Error => write!(f, "Error"),
        }
    }
}

/// A message attached to a source position
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Diagnostic {
    pub severity: Severity,
    pub position: SourceFilePosition,

    /// The other declaration involved in a conflict
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub secondary: Option<SourceFilePosition>,

    pub message: String,
}

impl Diagnostic {
    pub fn new(
        severity: Severity,
        position: SourceFilePosition,
        message: impl Into<String>,
    ) -> Self {
        Self {
            severity,
            position,
            secondary: None,
            message: message.into(),
        }
    }

    pub fn with_secondary(mut self, secondary: SourceFilePosition) -> Self {
        self.secondary = Some(secondary);
        self
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}:\n\t{}", self.position, self.severity, self.message)
    }
}
