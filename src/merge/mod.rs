//! Manifest merge session
//!
//! A merge folds every input document into an accumulator seeded by the
//! highest priority document. Priority, from highest to lowest, is the
//! overlays in the order given, then the main manifest, then the libraries
//! in the order given. Each lower source only contributes what the
//! accumulator does not already decide, under the instructions the
//! accumulator carries.
//!
//! After folding, an application merge adds implied permissions and removes
//! merge instructions. Placeholders left unresolved are reported, build
//! properties are injected, and the document variants are rendered.

mod element;
mod invoker;
mod library;
mod prepare;
mod trim;
mod validate;

pub use invoker::Invoker;

use indexmap::IndexMap;
use merger_actions::ActionRecorder;
use merger_xml::XmlDocument;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use crate::inject::{apply_instant_run, inject_properties, placeholder, ManifestSystemProperty};
use crate::logging::MergeLogger;
use crate::model::document_package;
use crate::report::{MergedDocumentKind, MergingReport, ReportBuilder};

use element::{record_added_subtree, Folder};

/// What the merged manifest is for
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MergeType {
    /// Final application manifest: instructions are removed, implied
    /// permissions added, and every placeholder must resolve
    #[default]
    Application,
    /// Library manifest that will itself be merged again later
    Library,
}

impl MergeType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Application => "application",
            Self::Library => "library",
        }
    }
}

impl fmt::Display for MergeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for MergeType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "application" => Ok(Self::Application),
            "library" => Ok(Self::Library),
            other => Err(format!(
                "unknown merge type '{}', expected application or library",
                other
            )),
        }
    }
}

/// Optional behaviors of a merge
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MergeFeatures {
    /// Encode unresolved placeholders instead of reporting them
    pub encode_placeholders: bool,
    /// Keep a snapshot of the accumulator after each source
    pub keep_stages: bool,
    /// Also render the incremental deployment variant
    pub instant_run: bool,
}

/// Inputs to one merge
#[derive(Debug, Clone)]
pub struct MergeRequest {
    pub main: XmlDocument,
    pub libraries: Vec<XmlDocument>,
    pub overlays: Vec<XmlDocument>,
    pub placeholders: IndexMap<String, String>,
    pub properties: IndexMap<ManifestSystemProperty, String>,
    pub merge_type: MergeType,
    pub features: MergeFeatures,
}

impl MergeRequest {
    pub fn new(main: XmlDocument) -> Self {
        Self {
            main,
            libraries: Vec::new(),
            overlays: Vec::new(),
            placeholders: IndexMap::new(),
            properties: IndexMap::new(),
            merge_type: MergeType::default(),
            features: MergeFeatures::default(),
        }
    }

    pub fn with_library(mut self, library: XmlDocument) -> Self {
        self.libraries.push(library);
        self
    }

    pub fn with_overlay(mut self, overlay: XmlDocument) -> Self {
        self.overlays.push(overlay);
        self
    }

    pub fn with_placeholder(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.placeholders.insert(name.into(), value.into());
        self
    }

    pub fn with_property(
        mut self,
        property: ManifestSystemProperty,
        value: impl Into<String>,
    ) -> Self {
        self.properties.insert(property, value.into());
        self
    }

    pub fn with_merge_type(mut self, merge_type: MergeType) -> Self {
        self.merge_type = merge_type;
        self
    }

    pub fn with_features(mut self, features: MergeFeatures) -> Self {
        self.features = features;
        self
    }
}

/// Role of an input document
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum SourceRole {
    Overlay,
    Main,
    Library,
}

impl fmt::Display for SourceRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Overlay => "overlay",
            Self::Main => "main",
            Self::Library => "library",
        };
        write!(f, "{}", s)
    }
}

/// An input document in fold order
#[derive(Debug, Clone)]
pub(crate) struct Source {
    pub doc: XmlDocument,
    pub role: SourceRole,
    pub package: Option<String>,
}

impl Source {
    fn new(doc: XmlDocument, role: SourceRole) -> Self {
        let package = document_package(&doc).map(str::to_string);
        Self { doc, role, package }
    }

    pub fn label(&self) -> String {
        format!("{} manifest {}", self.role, self.doc.source())
    }
}

/// Merge every document of the request.
///
/// Problems are reported as diagnostics in the returned report; a report
/// with an ERROR status carries no merged document.
pub fn merge(request: MergeRequest, logger: &dyn MergeLogger) -> MergingReport {
    let MergeRequest {
        main,
        libraries,
        overlays,
        placeholders,
        properties,
        merge_type,
        features,
    } = request;

    let mut report = ReportBuilder::new(logger);
    let mut recorder = ActionRecorder::new();

    let main_package = document_package(&main).map(str::to_string);
    let effective_package = properties
        .get(&ManifestSystemProperty::Package)
        .cloned()
        .or_else(|| main_package.clone());
    let values = placeholder::with_package_defaults(&placeholders, effective_package.as_deref());

    let sources: Vec<Source> = overlays
        .into_iter()
        .map(|doc| Source::new(doc, SourceRole::Overlay))
        .chain(std::iter::once(Source::new(main, SourceRole::Main)))
        .chain(libraries.into_iter().map(|doc| Source::new(doc, SourceRole::Library)))
        .collect();

    let known_packages: Vec<String> = sources
        .iter()
        .filter(|s| s.role != SourceRole::Overlay)
        .filter_map(|s| s.package.clone())
        .collect();

    let mut valid = Vec::with_capacity(sources.len());
    for mut source in sources {
        if !validate::check_root(&source, &mut report) {
            continue;
        }
        prepare::prepare(&mut source, &values, &mut recorder);
        validate::validate_source(&source, main_package.as_deref(), &known_packages, &mut report);
        valid.push(source);
    }

    let Some(main_source) = valid.iter().find(|s| s.role == SourceRole::Main) else {
        return report.build(recorder.build());
    };
    let library_sources: Vec<&Source> =
        valid.iter().filter(|s| s.role == SourceRole::Library).collect();
    library::check_min_sdk(main_source, &library_sources, &properties, &mut report);

    let mut fold_order = valid.iter();
    let Some(seed) = fold_order.next() else {
        return report.build(recorder.build());
    };
    logger.verbose(&format!("Seeding merge with {}", seed.label()));
    let mut acc = seed.doc.clone();
    record_added_subtree(&acc, acc.root(), &mut recorder);
    if features.keep_stages {
        report.add_stage(seed.label(), acc.to_xml_string());
    }

    let mut retained = BTreeSet::new();
    for source in fold_order {
        Folder::new(&mut acc, &mut recorder, &mut report, &mut retained).fold(source);
        if features.keep_stages {
            report.add_stage(source.label(), acc.to_xml_string());
        }
    }

    if merge_type == MergeType::Application {
        library::add_implied_permissions(
            &mut acc,
            main_source,
            &library_sources,
            &properties,
            &mut recorder,
            &mut report,
        );
        trim::trim_instructions(&mut acc, &retained);
    }

    validate::check_placeholders(&acc, merge_type, features.encode_placeholders, &mut report);
    inject_properties(&mut acc, &properties, &mut recorder);
    validate::post_validate(&acc, merge_type, &mut report);

    if report.has_errors() {
        logger.verbose("Merge failed, no document produced");
        return report.build(recorder.build());
    }

    let mut aapt_safe = acc.clone();
    placeholder::encode_document(&mut aapt_safe);
    report.set_document(MergedDocumentKind::AaptSafe, aapt_safe.to_xml_string());

    if features.instant_run {
        let mut instant_run = acc.clone();
        apply_instant_run(&mut instant_run);
        report.set_document(MergedDocumentKind::InstantRun, instant_run.to_xml_string());
    }

    report.set_document(MergedDocumentKind::Merged, acc.to_xml_string());
    report.build(recorder.build())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::logging::NullLogger;
    use crate::report::MergeStatus;
    use merger_xml::{parse, SourceFile};

    fn doc(name: &str, text: &str) -> XmlDocument {
        parse(text, SourceFile::named(name)).unwrap()
    }

    #[test]
    fn test_merge_type_parse() {
        assert_eq!("Library".parse::<MergeType>(), Ok(MergeType::Library));
        assert_eq!(MergeType::default().to_string(), "application");
        assert!("bundle".parse::<MergeType>().is_err());
    }

    #[test]
    fn test_single_manifest_identity() {
        let main = doc(
            "main",
            r#"<manifest xmlns:android="http://schemas.android.com/apk/res/android" package="com.foo">
    <uses-sdk android:minSdkVersion="21" />
    <application android:label="Foo" />
</manifest>"#,
        );
        let report = merge(MergeRequest::new(main), &NullLogger);
        assert_eq!(report.status(), MergeStatus::Success);
        let merged = report.merged_document(MergedDocumentKind::Merged).unwrap();
        assert!(merged.contains(r#"android:label="Foo""#));
        assert!(report.merged_document(MergedDocumentKind::AaptSafe).is_some());
        assert!(report.merged_document(MergedDocumentKind::InstantRun).is_none());
    }

    #[test]
    fn test_invalid_main_root() {
        let main = doc("main", r#"<application />"#);
        let report = merge(MergeRequest::new(main), &NullLogger);
        assert_eq!(report.status(), MergeStatus::Error);
        assert!(report.merged_document(MergedDocumentKind::Merged).is_none());
    }

    #[test]
    fn test_keep_stages() {
        let main = doc("main", r#"<manifest package="com.foo"><uses-sdk /></manifest>"#);
        let lib = doc("lib", r#"<manifest package="com.lib"><uses-sdk /></manifest>"#);
        let features = MergeFeatures {
            keep_stages: true,
            ..MergeFeatures::default()
        };
        let report = merge(
            MergeRequest::new(main).with_library(lib).with_features(features),
            &NullLogger,
        );
        let labels: Vec<&str> =
            report.intermediate_stages().iter().map(|s| s.label.as_str()).collect();
        assert_eq!(labels, vec!["main manifest main", "library manifest lib"]);
    }
}
