//! Android manifest merger
//!
//! Merges a main `AndroidManifest.xml` with its overlays and library
//! manifests into one document, following the `tools:` merge instructions the
//! documents carry. Every decision is recorded per element and attribute, so
//! the merged document can be annotated line by line with where each part
//! came from.

pub mod blame;
pub mod cli;
pub mod config;
pub mod inject;
pub mod logging;
pub mod merge;
pub mod model;
pub mod report;

pub use blame::blame;
pub use cli::UsageError;
pub use config::{ConfigError, EffectiveConfig};
pub use inject::ManifestSystemProperty;
pub use logging::{init_tracing, LogLevel, MemoryLogger, MergeLogger, NullLogger, TracingLogger};
pub use merge::{merge, Invoker, MergeFeatures, MergeRequest, MergeType};
pub use report::{
    Diagnostic, MergeStatus, MergedDocumentKind, MergingReport, ReportSummary, Severity,
};

pub use merger_actions::{
    ActionRecord, ActionType, Actions, ActionsError, AttributeOperationType, NodeKey,
    NodeOperationType,
};
pub use merger_xml::{load, parse, SourceFile, SourceFilePosition, XmlDocument, XmlError, XmlName};
