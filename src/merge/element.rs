//! Folding one source into the accumulator

use std::collections::BTreeSet;

use merger_actions::{
    ActionRecorder, ActionType, AttributeOperationType, NodeKey, NodeOperationType,
};
use merger_xml::{canonical_form, NodeId, XmlAttribute, XmlDocument, XmlName, TOOLS_URI};

use super::{Source, SourceRole};
use crate::model::instructions::{
    attribute_operations, declared_attribute_operations, declared_node_operation,
    is_ignored_attribute, node_operation, NODE, SELECTOR,
};
use crate::model::{
    attribute_policy, child_key, combine, element_type, local_key, mergeable_elements, node_key,
    AttributePolicy, ElementType, BOOLEAN_OR_REASON, EXPLICIT_REMOVAL_REASON, MAIN_WINS_REASON,
    MAX_VERSION_REASON, OVERRIDDEN_REASON, REPLACED_REASON, STRICT_REASON,
};
use crate::report::ReportBuilder;

/// Record every element and attribute below `id` (inclusive) as ADDED
pub(crate) fn record_added_subtree(doc: &XmlDocument, id: NodeId, recorder: &mut ActionRecorder) {
    for element in mergeable_elements(doc, id) {
        let key = node_key(doc, element);
        let operation = declared_node_operation(doc, element).ok().flatten().unwrap_or_default();
        recorder.record_node(&key, ActionType::Added, doc.origin(element).clone(), operation, None);

        let operations = declared_attribute_operations(doc, element);
        for attribute in doc.attributes(element) {
            if is_ignored_attribute(&attribute.name) {
                continue;
            }
            recorder.record_attribute(
                &key,
                &attribute.name,
                ActionType::Added,
                attribute.origin.clone(),
                operations.get(&attribute.name).copied(),
                None,
            );
        }
    }
}

/// Folds a lower priority source into the accumulator
pub(crate) struct Folder<'a, 'l> {
    acc: &'a mut XmlDocument,
    recorder: &'a mut ActionRecorder,
    report: &'a mut ReportBuilder<'l>,
    /// Removal markers that took in a declaration their selector did not name
    retained: &'a mut BTreeSet<NodeId>,
}

impl<'a, 'l> Folder<'a, 'l> {
    pub(crate) fn new(
        acc: &'a mut XmlDocument,
        recorder: &'a mut ActionRecorder,
        report: &'a mut ReportBuilder<'l>,
        retained: &'a mut BTreeSet<NodeId>,
    ) -> Self {
        Self {
            acc,
            recorder,
            report,
            retained,
        }
    }

    pub(crate) fn fold(&mut self, source: &Source) {
        self.report
            .logger()
            .verbose(&format!("Merging {} into the accumulated manifest", source.label()));
        let higher = self.acc.root();
        let lower = source.doc.root();
        let key = node_key(self.acc, higher);
        self.recorder.record_node(
            &key,
            ActionType::Merged,
            source.doc.origin(lower).clone(),
            NodeOperationType::Merge,
            None,
        );
        self.merge_attributes(higher, &key, ElementType::Manifest, source, lower);
        self.merge_children(higher, source, lower);
    }

    fn merge_children(&mut self, higher_parent: NodeId, source: &Source, lower_parent: NodeId) {
        for lower in source.doc.child_elements(lower_parent) {
            let local = local_key(&source.doc, lower).key;
            let key = child_key(self.acc, higher_parent, &local);
            if self.removed_by_remove_all(higher_parent, &local, source) {
                self.reject_node(
                    &key,
                    source.doc.origin(lower).clone(),
                    NodeOperationType::RemoveAll,
                    EXPLICIT_REMOVAL_REASON,
                );
                continue;
            }
            match self.find_match(higher_parent, &local) {
                Some(higher) => self.merge_element(higher, &key, source, lower),
                None => self.import(higher_parent, &key, source, lower),
            }
        }
    }

    /// A `removeAll` marker with no key removes every lower element of its
    /// type; one with a key only the matching element
    fn removed_by_remove_all(
        &self,
        higher_parent: NodeId,
        local: &NodeKey,
        source: &Source,
    ) -> bool {
        let acc: &XmlDocument = &*self.acc;
        let selector = source.package.as_deref();
        acc.child_elements(higher_parent).into_iter().any(|candidate| {
            if node_operation(acc, candidate, selector) != NodeOperationType::RemoveAll {
                return false;
            }
            let marker = local_key(acc, candidate);
            marker.key.element_type() == local.element_type()
                && (marker.missing.is_some() || marker.key == *local)
        })
    }

    fn find_match(&self, higher_parent: NodeId, local: &NodeKey) -> Option<NodeId> {
        let acc: &XmlDocument = &*self.acc;
        acc.child_elements(higher_parent)
            .into_iter()
            .find(|candidate| local_key(acc, *candidate).key == *local)
    }

    fn import(&mut self, higher_parent: NodeId, key: &NodeKey, source: &Source, lower: NodeId) {
        if source.role == SourceRole::Library
            && element_type(&source.doc, lower) == ElementType::UsesSdk
        {
            self.reject_node(
                key,
                source.doc.origin(lower).clone(),
                NodeOperationType::Merge,
                MAIN_WINS_REASON,
            );
            return;
        }
        let imported = self.acc.import_subtree(&source.doc, lower, higher_parent);
        record_added_subtree(self.acc, imported, self.recorder);
    }

    fn merge_element(&mut self, higher: NodeId, key: &NodeKey, source: &Source, lower: NodeId) {
        let tag = element_type(self.acc, higher);
        let position = source.doc.origin(lower).clone();
        let operation = node_operation(self.acc, higher, source.package.as_deref());

        // custom elements match only when identical
        if tag == ElementType::Custom {
            self.recorder
                .record_node(key, ActionType::Merged, position, operation, None);
            return;
        }

        match operation {
            NodeOperationType::Remove | NodeOperationType::RemoveAll => {
                self.reject_node(key, position, operation, EXPLICIT_REMOVAL_REASON)
            }
            NodeOperationType::Replace => {
                self.reject_node(key, position, operation, REPLACED_REASON)
            }
            NodeOperationType::Strict => self.check_strict(higher, key, source, lower),
            NodeOperationType::MergeOnlyAttributes => {
                self.recorder
                    .record_node(key, ActionType::Merged, position, operation, None);
                self.merge_attributes(higher, key, tag, source, lower);
            }
            NodeOperationType::RemoveChildren => {
                self.recorder
                    .record_node(key, ActionType::Merged, position, operation, None);
                self.merge_attributes(higher, key, tag, source, lower);
                for child in source.doc.child_elements(lower) {
                    let local = local_key(&source.doc, child).key;
                    let scoped = child_key(self.acc, higher, &local);
                    self.reject_node(
                        &scoped,
                        source.doc.origin(child).clone(),
                        operation,
                        EXPLICIT_REMOVAL_REASON,
                    );
                }
            }
            NodeOperationType::Merge => {
                let declared = declared_node_operation(self.acc, higher).ok().flatten();
                if declared.is_some_and(|op| op.is_removal()) {
                    self.retained.insert(higher);
                }
                self.recorder
                    .record_node(key, ActionType::Merged, position, operation, None);
                self.merge_attributes(higher, key, tag, source, lower);
                self.merge_children(higher, source, lower);
            }
        }
    }

    /// A strict element accepts a lower declaration only when it is identical.
    ///
    /// Every difference is reported as its own error.
    fn check_strict(&mut self, higher: NodeId, key: &NodeKey, source: &Source, lower: NodeId) {
        let tag = element_type(self.acc, higher);
        let higher_origin = self.acc.origin(higher).clone();
        let lower_origin = source.doc.origin(lower).clone();
        let higher_attributes = merge_attributes_of(self.acc, higher);
        let lower_attributes = merge_attributes_of(&source.doc, lower);
        let mut conflicts = 0;

        for attribute in &lower_attributes {
            match higher_attributes.iter().find(|h| h.name == attribute.name) {
                Some(existing) if existing.value == attribute.value => {}
                Some(existing) => {
                    conflicts += 1;
                    self.report.conflict(
                        attribute.origin.clone(),
                        existing.origin.clone(),
                        format!(
                            "Attribute {}@{} value=({}) from {} is also present at {} value=({}), the declaration is strict",
                            tag,
                            attribute.name,
                            existing.value,
                            existing.origin,
                            attribute.origin,
                            attribute.value
                        ),
                    );
                }
                None => {
                    conflicts += 1;
                    self.report.conflict(
                        attribute.origin.clone(),
                        higher_origin.clone(),
                        format!(
                            "Attribute {}@{} value=({}) at {} is not declared by the strict declaration at {}",
                            tag, attribute.name, attribute.value, attribute.origin, higher_origin
                        ),
                    );
                }
            }
        }
        for existing in &higher_attributes {
            if !lower_attributes.iter().any(|a| a.name == existing.name) {
                conflicts += 1;
                self.report.conflict(
                    lower_origin.clone(),
                    existing.origin.clone(),
                    format!(
                        "Attribute {}@{} value=({}) declared at {} is missing from {}",
                        tag, existing.name, existing.value, existing.origin, lower_origin
                    ),
                );
            }
        }
        if child_forms(self.acc, higher) != child_forms(&source.doc, lower) {
            conflicts += 1;
            self.report.conflict(
                lower_origin.clone(),
                higher_origin.clone(),
                format!(
                    "Element {} at {} has children that differ from the strict declaration at {}",
                    key, lower_origin, higher_origin
                ),
            );
        }

        if conflicts == 0 {
            self.recorder.record_node(
                key,
                ActionType::Merged,
                lower_origin,
                NodeOperationType::Strict,
                None,
            );
        } else {
            self.reject_node(key, lower_origin, NodeOperationType::Strict, STRICT_REASON);
        }
    }

    fn merge_attributes(
        &mut self,
        higher: NodeId,
        key: &NodeKey,
        tag: ElementType,
        source: &Source,
        lower: NodeId,
    ) {
        let operations = attribute_operations(self.acc, higher, source.package.as_deref());
        let is_root = lower == source.doc.root();
        self.inherit_instructions(higher, source, lower);

        for attribute in source.doc.attributes(lower) {
            if is_ignored_attribute(&attribute.name) {
                continue;
            }
            if is_root && attribute.name == XmlName::simple("package") {
                continue;
            }
            let operation = operations.get(&attribute.name).copied();
            if operation == Some(AttributeOperationType::Remove) {
                self.reject_attribute(key, attribute, operation, EXPLICIT_REMOVAL_REASON);
                continue;
            }
            let policy = match attribute_policy(tag, &attribute.name) {
                AttributePolicy::MainWins if source.role != SourceRole::Library => {
                    AttributePolicy::Override
                }
                policy => policy,
            };

            match self.acc.attribute(higher, &attribute.name).cloned() {
                None if policy == AttributePolicy::MainWins => {
                    self.reject_attribute(key, attribute, operation, MAIN_WINS_REASON)
                }
                None => {
                    let name = self.acc.bind_name(&attribute.name);
                    self.acc.set_attribute(
                        higher,
                        XmlAttribute::new(name, attribute.value.clone(), attribute.origin.clone()),
                    );
                    self.record_attribute(key, attribute, ActionType::Added, operation, None);
                }
                Some(existing) if existing.value == attribute.value => {
                    self.record_attribute(key, attribute, ActionType::Merged, operation, None)
                }
                Some(existing) => {
                    self.resolve_conflict(higher, key, tag, &existing, attribute, operation, policy)
                }
            }
        }
    }

    /// Attribute instructions of a lower declaration keep applying to the
    /// sources below it. Node operations and selectors stay with the
    /// declaration that wrote them.
    fn inherit_instructions(&mut self, higher: NodeId, source: &Source, lower: NodeId) {
        for attribute in source.doc.attributes(lower) {
            let local = attribute.name.local_name();
            if !attribute.name.is_in(TOOLS_URI) || local == NODE || local == SELECTOR {
                continue;
            }
            let declared = self
                .acc
                .attributes(higher)
                .iter()
                .any(|a| a.name.is_in(TOOLS_URI) && a.name.local_name() == local);
            if declared {
                continue;
            }
            let name = self.acc.bind_name(&attribute.name);
            self.acc.set_attribute(
                higher,
                XmlAttribute::new(name, attribute.value.clone(), attribute.origin.clone()),
            );
        }
    }

    #[allow(clippy::too_many_arguments)]
    fn resolve_conflict(
        &mut self,
        higher: NodeId,
        key: &NodeKey,
        tag: ElementType,
        existing: &XmlAttribute,
        lower: &XmlAttribute,
        operation: Option<AttributeOperationType>,
        policy: AttributePolicy,
    ) {
        match operation {
            Some(AttributeOperationType::Strict) => {
                self.report.conflict(
                    lower.origin.clone(),
                    existing.origin.clone(),
                    format!(
                        "Attribute {}@{} value=({}) from {} is also present at {} value=({}), the attribute is strict",
                        tag,
                        lower.name,
                        existing.value,
                        existing.origin,
                        lower.origin,
                        lower.value
                    ),
                );
                self.reject_attribute(key, lower, operation, STRICT_REASON);
            }
            Some(AttributeOperationType::Replace) => {
                self.reject_attribute(key, lower, operation, OVERRIDDEN_REASON)
            }
            _ => match policy {
                AttributePolicy::MainWins => {
                    self.reject_attribute(key, lower, operation, MAIN_WINS_REASON)
                }
                AttributePolicy::Override => {
                    self.reject_attribute(key, lower, operation, OVERRIDDEN_REASON)
                }
                AttributePolicy::BooleanOr | AttributePolicy::NumericMax => {
                    self.combine_values(higher, key, existing, lower, operation, policy)
                }
            },
        }
    }

    fn combine_values(
        &mut self,
        higher: NodeId,
        key: &NodeKey,
        existing: &XmlAttribute,
        lower: &XmlAttribute,
        operation: Option<AttributeOperationType>,
        policy: AttributePolicy,
    ) {
        let reason = if policy == AttributePolicy::BooleanOr {
            BOOLEAN_OR_REASON
        } else {
            MAX_VERSION_REASON
        };
        match combine(policy, &existing.value, &lower.value) {
            Some(combined) if combined != existing.value => {
                let name = existing.name.clone();
                self.acc.set_attribute(
                    higher,
                    XmlAttribute::new(name, combined, existing.origin.clone()),
                );
                self.record_attribute(key, lower, ActionType::Merged, operation, Some(reason));
            }
            Some(_) => self.reject_attribute(key, lower, operation, reason),
            None => self.reject_attribute(key, lower, operation, OVERRIDDEN_REASON),
        }
    }

    fn record_attribute(
        &mut self,
        key: &NodeKey,
        attribute: &XmlAttribute,
        action: ActionType,
        operation: Option<AttributeOperationType>,
        reason: Option<&str>,
    ) {
        self.recorder.record_attribute(
            key,
            &attribute.name,
            action,
            attribute.origin.clone(),
            operation,
            reason.map(str::to_string),
        );
    }

    fn reject_attribute(
        &mut self,
        key: &NodeKey,
        attribute: &XmlAttribute,
        operation: Option<AttributeOperationType>,
        reason: &str,
    ) {
        self.record_attribute(key, attribute, ActionType::Rejected, operation, Some(reason));
    }

    fn reject_node(
        &mut self,
        key: &NodeKey,
        position: merger_xml::SourceFilePosition,
        operation: NodeOperationType,
        reason: &str,
    ) {
        self.recorder
            .record_node(key, ActionType::Rejected, position, operation, Some(reason.to_string()));
    }
}

/// Attributes that take part in merging
fn merge_attributes_of(doc: &XmlDocument, id: NodeId) -> Vec<XmlAttribute> {
    doc.attributes(id)
        .iter()
        .filter(|a| !is_ignored_attribute(&a.name))
        .cloned()
        .collect()
}

fn child_forms(doc: &XmlDocument, id: NodeId) -> Vec<String> {
    let mut forms: Vec<String> = doc
        .child_elements(id)
        .into_iter()
        .map(|child| canonical_form(doc, child))
        .collect();
    forms.sort();
    forms
}
