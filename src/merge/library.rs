//! Library compatibility checks and implied permissions

use indexmap::IndexMap;
use merger_actions::{ActionRecorder, ActionType, NodeKey, NodeOperationType};
use merger_xml::{NodeId, XmlAttribute, XmlDocument, XmlName, ANDROID_URI};

use super::Source;
use crate::inject::ManifestSystemProperty;
use crate::model::instructions::{declared_node_operation, override_libraries};
use crate::model::{element_type, local_key, ElementType};
use crate::report::{Diagnostic, ReportBuilder, Severity};

const WRITE_EXTERNAL_STORAGE: &str = "android.permission.WRITE_EXTERNAL_STORAGE";
const READ_EXTERNAL_STORAGE: &str = "android.permission.READ_EXTERNAL_STORAGE";
const READ_PHONE_STATE: &str = "android.permission.READ_PHONE_STATE";
const READ_CONTACTS: &str = "android.permission.READ_CONTACTS";
const WRITE_CONTACTS: &str = "android.permission.WRITE_CONTACTS";
const READ_CALL_LOG: &str = "android.permission.READ_CALL_LOG";
const WRITE_CALL_LOG: &str = "android.permission.WRITE_CALL_LOG";

fn uses_sdk(doc: &XmlDocument) -> Option<NodeId> {
    doc.child_elements(doc.root())
        .into_iter()
        .find(|child| element_type(doc, *child) == ElementType::UsesSdk)
}

fn sdk_value<'a>(doc: &'a XmlDocument, local: &str) -> Option<&'a str> {
    uses_sdk(doc).and_then(|id| doc.attribute_value(id, &XmlName::android(local)))
}

fn library_name(source: &Source) -> String {
    source
        .package
        .clone()
        .unwrap_or_else(|| source.doc.source().to_string())
}

/// A library may not require a newer platform than the main manifest,
/// unless the main manifest lists it in `tools:overrideLibrary`
pub(crate) fn check_min_sdk(
    main: &Source,
    libraries: &[&Source],
    properties: &IndexMap<ManifestSystemProperty, String>,
    report: &mut ReportBuilder<'_>,
) {
    let main_uses_sdk = uses_sdk(&main.doc);
    let main_min = properties
        .get(&ManifestSystemProperty::MinSdkVersion)
        .map(String::as_str)
        .or_else(|| sdk_value(&main.doc, "minSdkVersion"))
        .unwrap_or("1");
    let Ok(main_level) = main_min.trim().parse::<u32>() else {
        // codenames are not compared
        return;
    };
    let overrides = main_uses_sdk
        .map(|id| override_libraries(&main.doc, id))
        .unwrap_or_default();
    let main_position = main_uses_sdk
        .map(|id| main.doc.origin(id).clone())
        .unwrap_or_else(|| main.doc.origin(main.doc.root()).clone());

    for library in libraries {
        let name = library_name(library);
        let Some(lib_uses_sdk) = uses_sdk(&library.doc) else {
            report.warning(
                library.doc.origin(library.doc.root()).clone(),
                format!("Library {} does not declare <uses-sdk>, minSdkVersion 1 assumed", name),
            );
            continue;
        };
        let lib_min = library
            .doc
            .attribute_value(lib_uses_sdk, &XmlName::android("minSdkVersion"))
            .unwrap_or("1");
        let Ok(lib_level) = lib_min.trim().parse::<u32>() else {
            continue;
        };
        if lib_level <= main_level {
            continue;
        }

        let lib_position = library.doc.origin(lib_uses_sdk).clone();
        let message = format!(
            "uses-sdk:minSdkVersion {} cannot be smaller than version {} declared in library {}",
            main_level, lib_level, name
        );
        let overridden = library.package.as_ref().is_some_and(|p| overrides.contains(p));
        let diagnostic = if overridden {
            Diagnostic::new(
                Severity::Warning,
                main_position.clone(),
                format!("{} (overridden by tools:overrideLibrary)", message),
            )
        } else {
            Diagnostic::new(
                Severity::Error,
                main_position.clone(),
                format!(
                    "{}\n\tSuggestion: use tools:overrideLibrary=\"{}\" to force usage",
                    message, name
                ),
            )
        };
        report.add(diagnostic.with_secondary(lib_position));
    }
}

/// Parse a target level; codenames are treated as the newest platform
fn main_target_level(value: &str) -> u32 {
    value.trim().parse().unwrap_or(u32::MAX)
}

/// Add the permissions older libraries implicitly rely on.
///
/// A library targeting a platform older than the one where a permission was
/// split out keeps needing it once merged into a newer application.
pub(crate) fn add_implied_permissions(
    acc: &mut XmlDocument,
    main: &Source,
    libraries: &[&Source],
    properties: &IndexMap<ManifestSystemProperty, String>,
    recorder: &mut ActionRecorder,
    report: &mut ReportBuilder<'_>,
) {
    let main_target = properties
        .get(&ManifestSystemProperty::TargetSdkVersion)
        .map(String::as_str)
        .or_else(|| sdk_value(&main.doc, "targetSdkVersion"))
        .or_else(|| {
            properties
                .get(&ManifestSystemProperty::MinSdkVersion)
                .map(String::as_str)
        })
        .or_else(|| sdk_value(&main.doc, "minSdkVersion"))
        .map(main_target_level)
        .unwrap_or(1);

    for library in libraries {
        let lib_target = sdk_value(&library.doc, "targetSdkVersion")
            .or_else(|| sdk_value(&library.doc, "minSdkVersion"))
            .unwrap_or("1");
        let Ok(lib_target) = lib_target.trim().parse::<u32>() else {
            continue;
        };
        let name = library_name(library);
        let declared = declared_permissions(&library.doc);
        let mut implied: Vec<(&str, String)> = Vec::new();

        if lib_target < 4 && main_target >= 4 {
            let reason = format!("{} has a targetSdkVersion < 4", name);
            implied.push((WRITE_EXTERNAL_STORAGE, reason.clone()));
            implied.push((READ_PHONE_STATE, reason));
        }
        if lib_target < 16 && main_target >= 16 {
            let requested = |permission: &str| {
                declared.iter().any(|p| p == permission)
                    || implied.iter().any(|(p, _)| *p == permission)
            };
            let pairs = [
                (WRITE_EXTERNAL_STORAGE, READ_EXTERNAL_STORAGE),
                (READ_CONTACTS, READ_CALL_LOG),
                (WRITE_CONTACTS, WRITE_CALL_LOG),
            ];
            let additions: Vec<(&str, String)> = pairs
                .into_iter()
                .filter(|(trigger, _)| requested(*trigger))
                .map(|(trigger, permission)| {
                    (
                        permission,
                        format!(
                            "{} has targetSdkVersion {} and requested {}",
                            name, lib_target, trigger
                        ),
                    )
                })
                .collect();
            implied.extend(additions);
        }

        for (permission, reason) in implied {
            add_implied(acc, permission, &reason, library, recorder, report);
        }
    }
}

fn declared_permissions(doc: &XmlDocument) -> Vec<String> {
    doc.child_elements(doc.root())
        .into_iter()
        .filter(|child| element_type(doc, *child) == ElementType::UsesPermission)
        .filter_map(|child| doc.attribute_value(child, &XmlName::android("name")))
        .map(str::to_string)
        .collect()
}

fn add_implied(
    acc: &mut XmlDocument,
    permission: &str,
    reason: &str,
    library: &Source,
    recorder: &mut ActionRecorder,
    report: &mut ReportBuilder<'_>,
) {
    let root = acc.root();
    let key = NodeKey::keyed(ElementType::UsesPermission.tag(), permission);
    let present = acc.child_elements(root).into_iter().any(|child| {
        element_type(acc, child) == ElementType::UsesPermission
            && (local_key(acc, child).key == key
                || declared_node_operation(acc, child) == Ok(Some(NodeOperationType::RemoveAll)))
    });
    if present {
        return;
    }

    let position = library.doc.origin(library.doc.root()).clone();
    let prefix = acc.ensure_namespace("android", ANDROID_URI);
    let name = XmlName::namespaced(ANDROID_URI, prefix, "name");
    acc.append_element(
        root,
        XmlName::simple(ElementType::UsesPermission.tag()),
        vec![XmlAttribute::new(name.clone(), permission, position.clone())],
        position.clone(),
    );
    recorder.record_node(
        &key,
        ActionType::Implied,
        position.clone(),
        NodeOperationType::Merge,
        Some(reason.to_string()),
    );
    recorder.record_attribute(
        &key,
        &name,
        ActionType::Implied,
        position.clone(),
        None,
        Some(reason.to_string()),
    );
    report.warning(
        position,
        format!("{} was tagged as an implied permission: {}", permission, reason),
    );
}
