//! Source files and positions

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;

/// Where a document came from.
///
/// Documents loaded from disk carry a path; synthetic contributions (build
/// configuration, implied defaults) carry a description instead.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SourceFile {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl SourceFile {
    pub fn from_path(path: &Path) -> Self {
        Self {
            path: Some(path.to_string_lossy().to_string()),
            description: None,
        }
    }

    pub fn named(description: impl Into<String>) -> Self {
        Self {
            path: None,
            description: Some(description.into()),
        }
    }

    pub fn unknown() -> Self {
        Self::default()
    }

    pub fn is_unknown(&self) -> bool {
        self.path.is_none() && self.description.is_none()
    }
}

impl fmt::Display for SourceFile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (&self.path, &self.description) {
            (Some(path), _) => write!(f, "{}", path),
            (None, Some(description)) => write!(f, "{}", description),
            (None, None) => write!(f, "[unknown]"),
        }
    }
}

/// 1-based line and column; either may be unknown
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SourcePosition {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub line: Option<u32>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub column: Option<u32>,
}

impl SourcePosition {
    pub fn new(line: u32, column: u32) -> Self {
        Self {
            line: Some(line),
            column: Some(column),
        }
    }

    pub fn unknown() -> Self {
        Self::default()
    }
}

impl fmt::Display for SourcePosition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (self.line, self.column) {
            (Some(line), Some(column)) => write!(f, "{}:{}", line, column),
            (Some(line), None) => write!(f, "{}", line),
            _ => Ok(()),
        }
    }
}

/// A position inside a particular source file
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SourceFilePosition {
    pub file: SourceFile,

    #[serde(default)]
    pub position: SourcePosition,
}

impl SourceFilePosition {
    pub fn new(file: SourceFile, position: SourcePosition) -> Self {
        Self { file, position }
    }

    /// A position with no file and no line information
    pub fn unknown() -> Self {
        Self::default()
    }

    pub fn line(&self) -> Option<u32> {
        self.position.line
    }
}

impl fmt::Display for SourceFilePosition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.position.line.is_some() {
            write!(f, "{}:{}", self.file, self.position)
        } else {
            write!(f, "{}", self.file)
        }
    }
}
