//! Checks run on each input before folding and on the merged result

use indexmap::IndexMap;
use merger_actions::{NodeKey, NodeOperationType};
use merger_xml::{NodeId, XmlDocument, XmlName};

use super::{MergeType, Source, SourceRole};
use crate::inject::placeholder;
use crate::model::instructions::{declared_node_operation, selector};
use crate::model::{element_type, local_key, mergeable_elements, ElementType};
use crate::report::{Diagnostic, ReportBuilder, Severity};

/// A document takes part in the merge only when its root is `<manifest>`
pub(crate) fn check_root(source: &Source, report: &mut ReportBuilder<'_>) -> bool {
    let doc = &source.doc;
    let root = doc.root();
    if element_type(doc, root) == ElementType::Manifest {
        return true;
    }
    let found = doc.name(root).map(XmlName::qualified).unwrap_or_default();
    report.error(
        doc.origin(root).clone(),
        format!("Expected <manifest> as the root of {} but found <{}>", source.label(), found),
    );
    false
}

/// Report invalid instructions, missing keys, unmatched selectors and
/// duplicate declarations
pub(crate) fn validate_source(
    source: &Source,
    main_package: Option<&str>,
    known_packages: &[String],
    report: &mut ReportBuilder<'_>,
) {
    let doc = &source.doc;
    let root = doc.root();

    if source.role == SourceRole::Overlay {
        if let (Some(overlay), Some(main)) = (source.package.as_deref(), main_package) {
            if overlay != main {
                report.error(
                    doc.origin(root).clone(),
                    format!(
                        "Overlay manifest package {} does not match main manifest package {}",
                        overlay, main
                    ),
                );
            }
        }
    }

    for id in mergeable_elements(doc, root) {
        let tag = element_type(doc, id);
        let origin = doc.origin(id).clone();
        let operation = match declared_node_operation(doc, id) {
            Ok(operation) => operation,
            Err(unknown) => {
                let valid: Vec<&str> =
                    NodeOperationType::ALL.iter().map(|op| op.xml_name()).collect();
                report.error(
                    origin.clone(),
                    format!(
                        "Invalid instruction tools:node=\"{}\" on <{}>, valid values are {}",
                        unknown.0,
                        doc.name(id).map(XmlName::qualified).unwrap_or_default(),
                        valid.join(", ")
                    ),
                );
                None
            }
        };

        if id != root && tag != ElementType::Custom {
            if let Some(missing) = local_key(doc, id).missing {
                if operation != Some(NodeOperationType::RemoveAll) {
                    report.error(
                        origin.clone(),
                        format!(
                            "Missing {} key attribute on element {} at {}",
                            missing, tag, origin
                        ),
                    );
                }
            }
        }

        if let Some(selector) = selector(doc, id) {
            if !known_packages.iter().any(|p| p == selector) {
                report.warning(
                    origin.clone(),
                    format!("tools:selector=\"{}\" does not match any manifest package", selector),
                );
            }
        }

        if tag != ElementType::Custom {
            check_duplicates(doc, id, report);
        }
    }
}

fn check_duplicates(doc: &XmlDocument, parent: NodeId, report: &mut ReportBuilder<'_>) {
    let mut seen: IndexMap<NodeKey, NodeId> = IndexMap::new();
    for child in doc.child_elements(parent) {
        let tag = element_type(doc, child);
        if tag.allows_duplicates() || matches!(declared_node_operation(doc, child), Ok(Some(_))) {
            continue;
        }
        let key = local_key(doc, child);
        if key.missing.is_some() {
            continue;
        }
        match seen.get(&key.key) {
            Some(first) => report.add(
                Diagnostic::new(
                    Severity::Error,
                    doc.origin(child).clone(),
                    format!(
                        "Element {} at {} duplicated with element declared at {}",
                        key.key,
                        doc.origin(child),
                        doc.origin(*first)
                    ),
                )
                .with_secondary(doc.origin(*first).clone()),
            ),
            None => {
                seen.insert(key.key, child);
            }
        }
    }
}

/// Unresolved placeholders are an error for an application merge unless
/// they are being encoded, in which case each one is noted
pub(crate) fn check_placeholders(
    doc: &XmlDocument,
    merge_type: MergeType,
    encode: bool,
    report: &mut ReportBuilder<'_>,
) {
    if merge_type == MergeType::Library {
        return;
    }
    for (id, name, names) in placeholder::find_unresolved(doc) {
        let position = doc
            .attribute(id, &name)
            .map(|a| a.origin.clone())
            .unwrap_or_else(|| doc.origin(id).clone());
        let tag = doc.name(id).map(XmlName::qualified).unwrap_or_default();
        for placeholder in names {
            if encode {
                report.info(
                    position.clone(),
                    format!(
                        "Attribute {}@{} keeps placeholder <{}>, encoded in the aapt safe manifest",
                        tag, name, placeholder
                    ),
                );
                continue;
            }
            report.error(
                position.clone(),
                format!(
                    "Attribute {}@{} at {} requires a placeholder substitution \
                     but no value for <{}> is provided.",
                    tag, name, position, placeholder
                ),
            );
        }
    }
}

/// Checks on the merged document
pub(crate) fn post_validate(
    doc: &XmlDocument,
    merge_type: MergeType,
    report: &mut ReportBuilder<'_>,
) {
    if merge_type != MergeType::Application {
        return;
    }
    let root = doc.root();
    let origin = doc.origin(root).clone();
    if doc.attribute_value(root, &XmlName::simple("package")).is_none() {
        report.error(
            origin.clone(),
            format!("Missing 'package' declaration in manifest at {}", origin),
        );
    }
    let has_uses_sdk = doc
        .child_elements(root)
        .into_iter()
        .any(|child| element_type(doc, child) == ElementType::UsesSdk);
    if !has_uses_sdk {
        report.warning(origin, "Merged manifest declares no <uses-sdk>, minSdkVersion 1 assumed");
    }
}
