//! Merge report
//!
//! A [`MergingReport`] holds the merged document variants, every diagnostic
//! raised during the merge, the decision trail, and the derived status.

mod builder;
mod diagnostic;
mod summary;

pub use builder::ReportBuilder;
pub use diagnostic::{Diagnostic, Severity};
pub use summary::{ReportSummary, REPORT_SUMMARY_SCHEMA_ID, REPORT_SUMMARY_SCHEMA_VERSION};

use indexmap::IndexMap;
use merger_actions::Actions;
use merger_xml::XmlError;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::blame;

/// Overall outcome of a merge
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum MergeStatus {
    Success,
    Warning,
    Error,
}

impl MergeStatus {
    /// True when the build may proceed
    pub fn is_success(&self) -> bool {
        !matches!(self, Self::Error)
    }

    fn from_diagnostics(diagnostics: &[Diagnostic]) -> Self {
        match diagnostics.iter().map(|d| d.severity).max() {
            Some(Severity::Error) => Self::Error,
            Some(Severity::Warning) => Self::Warning,
            _ => Self::Success,
        }
    }
}

impl fmt::Display for MergeStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Success => write!(f, "SUCCESS"),
            Self::Warning => write!(f, "WARNING"),
            Self::Error => write!(f, "ERROR"),
        }
    }
}

/// Variants of the merged document
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MergedDocumentKind {
    /// The merged manifest
    Merged,
    /// Merged manifest with the incremental bootstrap application
    InstantRun,
    /// Merged manifest with unresolved placeholders encoded for aapt
    AaptSafe,
    /// Line annotated provenance of the merged manifest
    Blame,
}

/// Snapshot of the accumulator after one source was folded in
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MergeStage {
    pub label: String,
    pub text: String,
}

#[derive(Debug, Clone)]
pub struct MergingReport {
    documents: IndexMap<MergedDocumentKind, String>,
    diagnostics: Vec<Diagnostic>,
    actions: Actions,
    stages: Vec<MergeStage>,
    status: MergeStatus,
}

impl MergingReport {
    pub(crate) fn new(
        documents: IndexMap<MergedDocumentKind, String>,
        diagnostics: Vec<Diagnostic>,
        actions: Actions,
        stages: Vec<MergeStage>,
    ) -> Self {
        let status = MergeStatus::from_diagnostics(&diagnostics);
        Self {
            documents,
            diagnostics,
            actions,
            stages,
            status,
        }
    }

    pub fn status(&self) -> MergeStatus {
        self.status
    }

    pub fn diagnostics(&self) -> &[Diagnostic] {
        &self.diagnostics
    }

    pub fn actions(&self) -> &Actions {
        &self.actions
    }

    pub fn merged_document(&self, kind: MergedDocumentKind) -> Option<&str> {
        self.documents.get(&kind).map(String::as_str)
    }

    /// Intermediate accumulator snapshots; empty unless requested
    pub fn intermediate_stages(&self) -> &[MergeStage] {
        &self.stages
    }

    /// One line summary for presentation
    pub fn report_string(&self) -> String {
        let issues: Vec<&Diagnostic> = self
            .diagnostics
            .iter()
            .filter(|d| d.severity != Severity::Info)
            .collect();
        match issues.as_slice() {
            [] => "Manifest merger succeeded".to_string(),
            [single] => single.message.clone(),
            _ => "Multiple merge issues, see logs".to_string(),
        }
    }

    /// Blame of the merged document, `None` when the merge produced none
    pub fn blame(&self) -> Result<Option<String>, XmlError> {
        if let Some(blame) = self.documents.get(&MergedDocumentKind::Blame) {
            return Ok(Some(blame.clone()));
        }
        match self.documents.get(&MergedDocumentKind::Merged) {
            Some(merged) => blame::blame(merged, &self.actions).map(Some),
            None => Ok(None),
        }
    }

    /// Compute the blame once and keep it as a document variant
    pub fn with_blame(mut self) -> Result<Self, XmlError> {
        if let Some(blame) = self.blame()? {
            self.documents.insert(MergedDocumentKind::Blame, blame);
        }
        Ok(self)
    }

    pub fn summary(&self) -> ReportSummary {
        ReportSummary::from_report(self)
    }
}
