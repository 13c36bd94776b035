//! Report assembly during a merge session

use indexmap::IndexMap;
use merger_actions::Actions;
use merger_xml::SourceFilePosition;

use super::diagnostic::{Diagnostic, Severity};
use super::{MergeStage, MergedDocumentKind, MergingReport};
use crate::logging::MergeLogger;

/// Collects diagnostics, documents and stages while a merge runs.
///
/// Diagnostics are forwarded to the logger as they arrive.
pub struct ReportBuilder<'l> {
    logger: &'l dyn MergeLogger,
    diagnostics: Vec<Diagnostic>,
    documents: IndexMap<MergedDocumentKind, String>,
    stages: Vec<MergeStage>,
}

impl<'l> ReportBuilder<'l> {
    pub fn new(logger: &'l dyn MergeLogger) -> Self {
        Self {
            logger,
            diagnostics: Vec::new(),
            documents: IndexMap::new(),
            stages: Vec::new(),
        }
    }

    pub fn logger(&self) -> &'l dyn MergeLogger {
        self.logger
    }

    pub fn add(&mut self, diagnostic: Diagnostic) {
        let message = match &diagnostic.secondary {
            Some(secondary) => {
                format!("{} (other declaration at {})", diagnostic.message, secondary)
            }
            None => diagnostic.message.clone(),
        };
        self.logger
            .log(diagnostic.severity.log_level(), &message, Some(&diagnostic.position));
        self.diagnostics.push(diagnostic);
    }

    pub fn error(&mut self, position: SourceFilePosition, message: impl Into<String>) {
        self.add(Diagnostic::new(Severity::Error, position, message));
    }

    pub fn warning(&mut self, position: SourceFilePosition, message: impl Into<String>) {
        self.add(Diagnostic::new(Severity::Warning, position, message));
    }

    pub fn info(&mut self, position: SourceFilePosition, message: impl Into<String>) {
        self.add(Diagnostic::new(Severity::Info, position, message));
    }

    /// Error naming two declarations
    pub fn conflict(
        &mut self,
        position: SourceFilePosition,
        secondary: SourceFilePosition,
        message: impl Into<String>,
    ) {
        self.add(Diagnostic::new(Severity::Error, position, message).with_secondary(secondary));
    }

    pub fn has_errors(&self) -> bool {
        self.diagnostics.iter().any(|d| d.severity == Severity::Error)
    }

    pub fn set_document(&mut self, kind: MergedDocumentKind, text: String) {
        self.documents.insert(kind, text);
    }

    pub fn add_stage(&mut self, label: impl Into<String>, text: String) {
        self.stages.push(MergeStage {
            label: label.into(),
            text,
        });
    }

    pub fn build(self, actions: Actions) -> MergingReport {
        MergingReport::new(self.documents, self.diagnostics, actions, self.stages)
    }
}
