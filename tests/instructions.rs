//! Merge instructions and application post-processing
//!
//! Covers `tools:node` removals with and without selectors, attribute
//! replacement, implied permissions for old libraries, and the removal of
//! every instruction from an application merge.

mod fixtures;

use manifest_merger::{
    merge, parse, ActionType, Invoker, MemoryLogger, MergeRequest, MergeStatus, MergeType,
    MergedDocumentKind, MergingReport, NodeKey, NullLogger, SourceFile, XmlDocument, XmlName,
};

const ANDROID: &str = r#"xmlns:android="http://schemas.android.com/apk/res/android""#;
const TOOLS: &str = r#"xmlns:tools="http://schemas.android.com/tools""#;

fn doc(name: &str, body: &str, package: &str) -> XmlDocument {
    let text = format!(
        r#"<manifest {} {} package="{}">
    <uses-sdk android:minSdkVersion="21" android:targetSdkVersion="33" />
{}
</manifest>"#,
        ANDROID, TOOLS, package, body
    );
    parse(&text, SourceFile::named(name)).unwrap()
}

fn merged(report: &MergingReport) -> &str {
    report
        .merged_document(MergedDocumentKind::Merged)
        .expect("merged document")
}

#[test]
fn test_remove_marker_drops_library_permission() {
    let report = Invoker::new(fixtures::main_manifest())
        .with_library(fixtures::analytics_manifest())
        .with_placeholder("apiKey", "k")
        .merge(&NullLogger)
        .unwrap();

    let text = merged(&report);
    assert!(!text.contains("android.permission.CAMERA"));
    assert!(text.contains("android.permission.ACCESS_NETWORK_STATE"));

    let camera = NodeKey::keyed("uses-permission", "android.permission.CAMERA");
    let records = report.actions().node_records(&camera);
    assert!(records.iter().any(|r| {
        r.action_type() == ActionType::Rejected && r.reason() == Some("explicit removal")
    }));
}

#[test]
fn test_application_output_has_no_instructions() {
    let report = Invoker::new(fixtures::main_manifest())
        .with_overlay(fixtures::overlay_manifest())
        .with_library(fixtures::analytics_manifest())
        .with_placeholder("apiKey", "k")
        .merge(&NullLogger)
        .unwrap();

    let text = merged(&report);
    assert!(!text.contains("tools:"));
    assert!(!text.contains("xmlns:tools"));
}

#[test]
fn test_library_output_keeps_instructions() {
    let report = Invoker::new(fixtures::main_manifest())
        .with_library(fixtures::analytics_manifest())
        .with_merge_type(MergeType::Library)
        .merge(&NullLogger)
        .unwrap();

    let text = merged(&report);
    assert!(text.contains(r#"tools:replace="android:label""#));
    assert!(text.contains(r#"tools:node="remove""#));
    assert!(text.contains("${apiKey}"));
}

fn selector_sources() -> (XmlDocument, XmlDocument, XmlDocument) {
    let main = doc(
        "main",
        r#"    <application>
        <activity android:name="com.shared.Tracker" tools:node="remove" tools:selector="com.lib.a" />
    </application>"#,
        "com.app",
    );
    let lib_a = doc(
        "lib_a",
        r#"    <application>
        <activity android:name="com.shared.Tracker" />
    </application>"#,
        "com.lib.a",
    );
    let lib_b = doc(
        "lib_b",
        r#"    <application>
        <activity android:name="com.shared.Tracker" android:exported="false" />
    </application>"#,
        "com.lib.b",
    );
    (main, lib_a, lib_b)
}

fn tracker_action(report: &MergingReport, file: &str) -> Option<ActionType> {
    let key = NodeKey::keyed("activity", "com.shared.Tracker");
    report
        .actions()
        .node_records(&key)
        .iter()
        .find(|r| r.position().file.to_string() == file)
        .map(|r| r.action_type())
}

#[test]
fn test_selector_only_removes_named_library() {
    let (main, lib_a, lib_b) = selector_sources();
    let report = merge(
        MergeRequest::new(main)
            .with_library(lib_a)
            .with_library(lib_b)
            .with_merge_type(MergeType::Library),
        &NullLogger,
    );
    assert!(report.status().is_success());
    assert_eq!(tracker_action(&report, "lib_a"), Some(ActionType::Rejected));
    assert_eq!(tracker_action(&report, "lib_b"), Some(ActionType::Merged));
}

#[test]
fn test_unselected_library_survives_application_merge() {
    let (main, lib_a, lib_b) = selector_sources();
    let report = merge(
        MergeRequest::new(main).with_library(lib_a).with_library(lib_b),
        &NullLogger,
    );
    assert!(report.status().is_success());
    assert_eq!(tracker_action(&report, "lib_a"), Some(ActionType::Rejected));
    assert_eq!(tracker_action(&report, "lib_b"), Some(ActionType::Merged));

    let text = merged(&report);
    assert!(text.contains(r#"android:name="com.shared.Tracker""#));
    assert!(text.contains(r#"android:exported="false""#));
    assert!(!text.contains("tools:"));
}

#[test]
fn test_selected_library_alone_is_removed_from_application() {
    let (main, lib_a, _) = selector_sources();
    let report = merge(MergeRequest::new(main).with_library(lib_a), &NullLogger);
    assert!(report.status().is_success());
    assert!(!merged(&report).contains("com.shared.Tracker"));
}

#[test]
fn test_unknown_selector_warns() {
    let main = doc(
        "main",
        r#"    <uses-permission android:name="android.permission.CAMERA" tools:node="remove" tools:selector="com.missing" />"#,
        "com.app",
    );
    let logger = MemoryLogger::new();
    let report = merge(MergeRequest::new(main), &logger);

    assert_eq!(report.status(), MergeStatus::Warning);
    assert!(report.diagnostics().iter().any(|d| d.message.contains("com.missing")));
    assert!(!logger.entries().is_empty());
}

#[test]
fn test_replace_without_conflict_is_silent() {
    let main = doc(
        "main",
        r#"    <application android:label="Main" tools:replace="android:label" />"#,
        "com.app",
    );
    let lib = doc("lib", r#"    <application android:label="Lib" />"#, "com.lib");

    let report = merge(MergeRequest::new(main).with_library(lib), &NullLogger);
    assert_eq!(report.status(), MergeStatus::Success);
    assert!(merged(&report).contains(r#"android:label="Main""#));

    let records = report
        .actions()
        .attribute_records(&NodeKey::single("application"), &XmlName::android("label"));
    assert_eq!(records.len(), 2);
    assert_eq!(records[1].action_type(), ActionType::Rejected);
}

#[test]
fn test_implied_permissions_for_old_library() {
    let report = Invoker::new(fixtures::main_manifest())
        .with_library(fixtures::legacy_manifest())
        .with_placeholder("apiKey", "k")
        .merge(&NullLogger)
        .unwrap();

    assert_eq!(report.status(), MergeStatus::Warning);
    let text = merged(&report);
    for permission in [
        "android.permission.WRITE_EXTERNAL_STORAGE",
        "android.permission.READ_PHONE_STATE",
        "android.permission.READ_EXTERNAL_STORAGE",
        "android.permission.READ_CALL_LOG",
    ] {
        assert!(text.contains(permission), "missing {}", permission);
        let key = NodeKey::keyed("uses-permission", permission);
        let origin = report.actions().node_origin(&key).expect("implied record");
        assert_eq!(origin.action_type(), ActionType::Implied);
        assert!(origin.reason().is_some_and(|r| r.contains("com.example.legacy")));
    }
    assert!(text.contains("com.example.legacy.LegacyActivity"));
}

#[test]
fn test_no_implied_permissions_for_library_merge() {
    let report = Invoker::new(fixtures::main_manifest())
        .with_library(fixtures::legacy_manifest())
        .with_merge_type(MergeType::Library)
        .merge(&NullLogger)
        .unwrap();

    assert!(!merged(&report).contains("READ_CALL_LOG"));
}
