//! Loading errors

use crate::position::{SourceFile, SourcePosition};

/// Failure to read or parse a source document.
///
/// Both variants are fatal: a merge never starts from a document that could
/// not be loaded.
#[derive(Debug, thiserror::Error)]
pub enum XmlError {
    #[error("IO error reading {path}: {message}")]
    Io { path: String, message: String },

    #[error("{file}:{position}: malformed XML: {message}")]
    Malformed {
        file: SourceFile,
        position: SourcePosition,
        message: String,
    },
}

impl XmlError {
    pub(crate) fn malformed(
        file: &SourceFile,
        position: SourcePosition,
        message: impl Into<String>,
    ) -> Self {
        Self::Malformed {
            file: file.clone(),
            position,
            message: message.into(),
        }
    }
}
