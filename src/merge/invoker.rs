//! File based entry point

use indexmap::IndexMap;
use merger_xml::{load, XmlError};
use std::path::PathBuf;

use super::{merge, MergeFeatures, MergeRequest, MergeType};
use crate::inject::ManifestSystemProperty;
use crate::logging::MergeLogger;
use crate::report::MergingReport;

/// Builder that loads manifests from disk and runs the merge.
///
/// ```no_run
/// use manifest_merger::{Invoker, MergeType, NullLogger};
///
/// let report = Invoker::new("app/AndroidManifest.xml")
///     .with_library("lib/AndroidManifest.xml")
///     .with_merge_type(MergeType::Application)
///     .merge(&NullLogger)?;
/// println!("{}", report.report_string());
/// # Ok::<(), manifest_merger::XmlError>(())
/// ```
#[derive(Debug, Clone)]
pub struct Invoker {
    main: PathBuf,
    libraries: Vec<PathBuf>,
    overlays: Vec<PathBuf>,
    placeholders: IndexMap<String, String>,
    properties: IndexMap<ManifestSystemProperty, String>,
    merge_type: MergeType,
    features: MergeFeatures,
}

impl Invoker {
    pub fn new(main: impl Into<PathBuf>) -> Self {
        Self {
            main: main.into(),
            libraries: Vec::new(),
            overlays: Vec::new(),
            placeholders: IndexMap::new(),
            properties: IndexMap::new(),
            merge_type: MergeType::default(),
            features: MergeFeatures::default(),
        }
    }

    pub fn with_library(mut self, path: impl Into<PathBuf>) -> Self {
        self.libraries.push(path.into());
        self
    }

    pub fn with_libraries<I, P>(mut self, paths: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: Into<PathBuf>,
    {
        self.libraries.extend(paths.into_iter().map(Into::into));
        self
    }

    pub fn with_overlay(mut self, path: impl Into<PathBuf>) -> Self {
        self.overlays.push(path.into());
        self
    }

    pub fn with_overlays<I, P>(mut self, paths: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: Into<PathBuf>,
    {
        self.overlays.extend(paths.into_iter().map(Into::into));
        self
    }

    pub fn with_placeholder(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.placeholders.insert(name.into(), value.into());
        self
    }

    pub fn with_placeholders(mut self, placeholders: IndexMap<String, String>) -> Self {
        self.placeholders.extend(placeholders);
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

    pub fn with_properties(mut self, properties: IndexMap<ManifestSystemProperty, String>) -> Self {
        self.properties.extend(properties);
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

    /// Load every manifest and merge them.
    ///
    /// Only I/O and XML syntax failures are returned as errors; merge
    /// problems are diagnostics in the report.
    pub fn merge(self, logger: &dyn MergeLogger) -> Result<MergingReport, XmlError> {
        let main = load(&self.main)?;
        let libraries = self
            .libraries
            .iter()
            .map(|path| load(path))
            .collect::<Result<Vec<_>, _>>()?;
        let overlays = self
            .overlays
            .iter()
            .map(|path| load(path))
            .collect::<Result<Vec<_>, _>>()?;
        logger.verbose(&format!(
            "Loaded main manifest {}, {} libraries, {} overlays",
            self.main.display(),
            libraries.len(),
            overlays.len()
        ));

        let request = MergeRequest {
            main,
            libraries,
            overlays,
            placeholders: self.placeholders,
            properties: self.properties,
            merge_type: self.merge_type,
            features: self.features,
        };
        Ok(merge(request, logger))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::logging::NullLogger;
    use crate::report::{MergeStatus, MergedDocumentKind};
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_merge_from_files() {
        let dir = TempDir::new().unwrap();
        let main = dir.path().join("main.xml");
        let lib = dir.path().join("lib.xml");
        fs::write(
            &main,
            r#"<manifest xmlns:android="http://schemas.android.com/apk/res/android" package="com.foo">
    <uses-sdk android:minSdkVersion="21" />
    <application android:label="Foo" />
</manifest>"#,
        )
        .unwrap();
        fs::write(
            &lib,
            r#"<manifest xmlns:android="http://schemas.android.com/apk/res/android" package="com.lib">
    <uses-sdk android:minSdkVersion="19" />
    <uses-permission android:name="android.permission.INTERNET" />
</manifest>"#,
        )
        .unwrap();

        let report = Invoker::new(&main).with_library(&lib).merge(&NullLogger).unwrap();
        assert_eq!(report.status(), MergeStatus::Success);
        let merged = report.merged_document(MergedDocumentKind::Merged).unwrap();
        assert!(merged.contains("android.permission.INTERNET"));
    }

    #[test]
    fn test_missing_file_is_error() {
        let dir = TempDir::new().unwrap();
        let result = Invoker::new(dir.path().join("absent.xml")).merge(&NullLogger);
        assert!(result.is_err());
    }
}
