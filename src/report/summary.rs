//! Report summary (report_summary.json)

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs;
use std::io;
use std::path::Path;

use super::{Diagnostic, MergeStatus, MergedDocumentKind, MergingReport, Severity};

/// Schema version for report_summary.json
pub const REPORT_SUMMARY_SCHEMA_VERSION: u32 = 1;

/// Schema identifier for report_summary.json
pub const REPORT_SUMMARY_SCHEMA_ID: &str = "manifest-merger/report_summary@1";

/// Machine readable outcome of a merge
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportSummary {
    /// Schema version
    pub schema_version: u32,

    /// Schema identifier
    pub schema_id: String,

    /// When the summary was created
    pub created_at: DateTime<Utc>,

    /// Derived merge status
    pub status: MergeStatus,

    pub error_count: usize,

    pub warning_count: usize,

    /// Document variants the merge produced
    pub documents: Vec<MergedDocumentKind>,

    /// Number of element keys with recorded decisions
    pub decision_keys: usize,

    pub diagnostics: Vec<Diagnostic>,

    /// One line summary
    pub human_summary: String,
}

impl ReportSummary {
    pub fn from_report(report: &MergingReport) -> Self {
        let count = |severity: Severity| {
            report
                .diagnostics()
                .iter()
                .filter(|d| d.severity == severity)
                .count()
        };
        Self {
            schema_version: REPORT_SUMMARY_SCHEMA_VERSION,
            schema_id: REPORT_SUMMARY_SCHEMA_ID.to_string(),
            created_at: Utc::now(),
            status: report.status(),
            error_count: count(Severity::Error),
            warning_count: count(Severity::Warning),
            documents: report.documents.keys().copied().collect(),
            decision_keys: report.actions().len(),
            diagnostics: report.diagnostics().to_vec(),
            human_summary: report.report_string(),
        }
    }

    /// Serialize to JSON
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    /// Write to file
    pub fn write_to_file(&self, path: &Path) -> io::Result<()> {
        let json = self.to_json().map_err(|e| {
            io::Error::new(
                io::ErrorKind::InvalidData,
                format!("JSON serialization failed: {}", e),
            )
        })?;
        fs::write(path, json)
    }
}
