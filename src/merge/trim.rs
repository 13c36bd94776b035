//! Removal of merge instructions from an application manifest

use merger_xml::{NodeId, XmlDocument, XmlName, TOOLS_URI};
use std::collections::BTreeSet;

use crate::model::instructions::declared_node_operation;
use crate::model::{element_type, mergeable_elements, ElementType};

/// Drop removal markers and every `tools:` attribute.
///
/// A marker in `retained` took in a declaration from a source its selector
/// did not name; it stays as a plain element. Custom elements are left
/// untouched, so the tools namespace declaration stays when one of them
/// still uses it.
pub(crate) fn trim_instructions(doc: &mut XmlDocument, retained: &BTreeSet<NodeId>) {
    let root = doc.root();
    let markers: Vec<NodeId> = mergeable_elements(doc, root)
        .into_iter()
        .filter(|id| *id != root && !retained.contains(id))
        .filter(|id| {
            declared_node_operation(doc, *id)
                .ok()
                .flatten()
                .is_some_and(|op| op.is_removal())
        })
        .collect();
    for marker in markers {
        doc.detach(marker);
    }

    for id in mergeable_elements(doc, root) {
        if element_type(doc, id) == ElementType::Custom {
            continue;
        }
        let instructions: Vec<XmlName> = doc
            .attributes(id)
            .iter()
            .filter(|a| a.name.is_in(TOOLS_URI))
            .map(|a| a.name.clone())
            .collect();
        for name in instructions {
            doc.remove_attribute(id, &name);
        }
    }

    if !uses_tools_namespace(doc) {
        let declarations: Vec<XmlName> = doc
            .attributes(root)
            .iter()
            .filter(|a| a.name.is_namespace_declaration() && a.value == TOOLS_URI)
            .map(|a| a.name.clone())
            .collect();
        for name in declarations {
            doc.remove_attribute(root, &name);
        }
    }
}

fn uses_tools_namespace(doc: &XmlDocument) -> bool {
    doc.descendants(doc.root()).into_iter().any(|id| {
        doc.name(id).is_some_and(|n| n.is_in(TOOLS_URI))
            || doc.attributes(id).iter().any(|a| a.name.is_in(TOOLS_URI))
    })
}
