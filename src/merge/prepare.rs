//! Per-document preparation ahead of folding

use indexmap::IndexMap;
use merger_actions::{ActionRecorder, ActionType};

use super::Source;
use crate::inject::placeholder;
use crate::model::{document_package, expand_class_names, node_key};

pub(crate) const PLACEHOLDER_REASON: &str = "placeholder substitution";

/// Substitute placeholders and expand relative class names.
///
/// Substitution happens before keys are computed so that a key built from a
/// placeholder value matches the key of the merged element.
pub(crate) fn prepare(
    source: &mut Source,
    values: &IndexMap<String, String>,
    recorder: &mut ActionRecorder,
) {
    let changed = placeholder::substitute_document(&mut source.doc, values);
    expand_class_names(&mut source.doc);
    source.package = document_package(&source.doc).map(str::to_string);

    let doc = &source.doc;
    for (id, name) in changed {
        let position = doc
            .attribute(id, &name)
            .map(|a| a.origin.clone())
            .unwrap_or_else(|| doc.origin(id).clone());
        recorder.record_attribute(
            &node_key(doc, id),
            &name,
            ActionType::Injected,
            position,
            None,
            Some(PLACEHOLDER_REASON.to_string()),
        );
    }
}
