//! Merge instructions carried in the tools namespace
//!
//! `tools:node` sets the node operation of an element, `tools:selector`
//! restricts it (and the attribute operations of the same element) to lower
//! priority manifests from one package, and `tools:strict`, `tools:replace`
//! and `tools:remove` list the attributes each attribute operation applies to.

use indexmap::IndexMap;
use merger_actions::{AttributeOperationType, NodeOperationType, UnknownOperation};
use merger_xml::{NodeId, XmlDocument, XmlName, TOOLS_URI};

pub const NODE: &str = "node";
pub const SELECTOR: &str = "selector";
pub const OVERRIDE_LIBRARY: &str = "overrideLibrary";

/// True for instruction attributes and namespace declarations, which never
/// take part in attribute merging
pub fn is_ignored_attribute(name: &XmlName) -> bool {
    name.is_in(TOOLS_URI) || name.is_namespace_declaration()
}

fn tools_value<'a>(doc: &'a XmlDocument, id: NodeId, local: &str) -> Option<&'a str> {
    doc.attributes(id)
        .iter()
        .find(|a| a.name.is_in(TOOLS_URI) && a.name.local_name() == local)
        .map(|a| a.value.as_str())
}

/// The declared `tools:node` operation, if any
pub fn declared_node_operation(
    doc: &XmlDocument,
    id: NodeId,
) -> Result<Option<NodeOperationType>, UnknownOperation> {
    tools_value(doc, id, NODE).map(str::parse).transpose()
}

pub fn selector<'a>(doc: &'a XmlDocument, id: NodeId) -> Option<&'a str> {
    tools_value(doc, id, SELECTOR)
}

/// A directive with no selector applies to every lower priority source; one
/// with a selector only to sources from that package
pub fn selector_matches(selector: Option<&str>, lower_package: Option<&str>) -> bool {
    match selector {
        None => true,
        Some(selector) => lower_package == Some(selector),
    }
}

/// Node operation of `id` as it applies to a lower source from `lower_package`.
///
/// Invalid values and directives whose selector does not match behave as the
/// default MERGE.
pub fn node_operation(
    doc: &XmlDocument,
    id: NodeId,
    lower_package: Option<&str>,
) -> NodeOperationType {
    if !selector_matches(selector(doc, id), lower_package) {
        return NodeOperationType::Merge;
    }
    declared_node_operation(doc, id).ok().flatten().unwrap_or_default()
}

/// Attribute operations declared on an element, first declaration winning
pub fn declared_attribute_operations(
    doc: &XmlDocument,
    id: NodeId,
) -> IndexMap<XmlName, AttributeOperationType> {
    let mut operations = IndexMap::new();
    for attribute in doc.attributes(id) {
        if !attribute.name.is_in(TOOLS_URI) {
            continue;
        }
        let Ok(operation) = attribute.name.local_name().parse::<AttributeOperationType>() else {
            continue;
        };
        for target in attribute.value.split(',').map(str::trim).filter(|t| !t.is_empty()) {
            if let Some(name) = resolve_attribute_name(doc, id, target) {
                operations.entry(name).or_insert(operation);
            }
        }
    }
    operations
}

/// Attribute operations of `id` as they apply to a lower source
pub fn attribute_operations(
    doc: &XmlDocument,
    id: NodeId,
    lower_package: Option<&str>,
) -> IndexMap<XmlName, AttributeOperationType> {
    if !selector_matches(selector(doc, id), lower_package) {
        return IndexMap::new();
    }
    declared_attribute_operations(doc, id)
}

fn resolve_attribute_name(doc: &XmlDocument, id: NodeId, qualified: &str) -> Option<XmlName> {
    match qualified.split_once(':') {
        Some((prefix, local)) => doc
            .resolve_prefix(id, prefix)
            .map(|uri| XmlName::namespaced(uri, prefix, local)),
        None => Some(XmlName::simple(qualified)),
    }
}

/// Packages listed in `tools:overrideLibrary`
pub fn override_libraries(doc: &XmlDocument, id: NodeId) -> Vec<String> {
    tools_value(doc, id, OVERRIDE_LIBRARY)
        .map(|value| {
            value
                .split(',')
                .map(str::trim)
                .filter(|p| !p.is_empty())
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default()
}
