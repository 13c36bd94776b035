//! `${name}` placeholder substitution

use indexmap::IndexMap;
use merger_xml::{NodeId, XmlDocument, XmlName};
use regex_lite::{Captures, Regex};
use std::sync::OnceLock;

use crate::model::{instructions::is_ignored_attribute, mergeable_elements};

/// Placeholders that default to the effective package
pub const PACKAGE_PLACEHOLDERS: [&str; 2] = ["applicationId", "packageName"];

fn pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"\$\{([^}]*)\}").expect("placeholder pattern is valid"))
}

/// Result of substituting one value
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Substitution {
    pub value: String,
    pub replaced: Vec<String>,
    pub unresolved: Vec<String>,
}

/// Replace every known `${name}` token in `value`
pub fn substitute(value: &str, values: &IndexMap<String, String>) -> Substitution {
    let mut replaced = Vec::new();
    let mut unresolved = Vec::new();
    let value = pattern()
        .replace_all(value, |caps: &Captures<'_>| {
            let name = &caps[1];
            match values.get(name) {
                Some(replacement) => {
                    replaced.push(name.to_string());
                    replacement.clone()
                }
                None => {
                    unresolved.push(name.to_string());
                    caps[0].to_string()
                }
            }
        })
        .into_owned();
    Substitution {
        value,
        replaced,
        unresolved,
    }
}

/// Names of the placeholders still present in `value`
pub fn unresolved_placeholders(value: &str) -> Vec<String> {
    pattern()
        .captures_iter(value)
        .map(|caps| caps[1].to_string())
        .collect()
}

/// Rewrite tokens to a literal aapt accepts
pub fn encode_unresolved(value: &str) -> String {
    pattern()
        .replace_all(value, |caps: &Captures<'_>| {
            format!("dollar_openBracket_{}_closeBracket", &caps[1])
        })
        .into_owned()
}

/// Caller values plus the package defaults
pub fn with_package_defaults(
    values: &IndexMap<String, String>,
    package: Option<&str>,
) -> IndexMap<String, String> {
    let mut all = values.clone();
    if let Some(package) = package {
        for name in PACKAGE_PLACEHOLDERS {
            all.entry(name.to_string()).or_insert_with(|| package.to_string());
        }
    }
    all
}

/// Substitute placeholders in every merge-relevant attribute of a document.
///
/// Returns the attributes that changed.
pub fn substitute_document(
    doc: &mut XmlDocument,
    values: &IndexMap<String, String>,
) -> Vec<(NodeId, XmlName)> {
    let mut changed = Vec::new();
    for id in mergeable_elements(doc, doc.root()) {
        let Some(element) = doc.element_mut(id) else {
            continue;
        };
        for attribute in element.attributes.iter_mut() {
            if is_ignored_attribute(&attribute.name) || !attribute.value.contains("${") {
                continue;
            }
            let substitution = substitute(&attribute.value, values);
            if !substitution.replaced.is_empty() {
                attribute.value = substitution.value;
                changed.push((id, attribute.name.clone()));
            }
        }
    }
    changed
}

/// Every attribute still holding a placeholder
pub fn find_unresolved(doc: &XmlDocument) -> Vec<(NodeId, XmlName, Vec<String>)> {
    let mut found = Vec::new();
    for id in mergeable_elements(doc, doc.root()) {
        for attribute in doc.attributes(id) {
            if is_ignored_attribute(&attribute.name) {
                continue;
            }
            let names = unresolved_placeholders(&attribute.value);
            if !names.is_empty() {
                found.push((id, attribute.name.clone(), names));
            }
        }
    }
    found
}

/// Encode every remaining placeholder in the document
pub fn encode_document(doc: &mut XmlDocument) {
    for id in mergeable_elements(doc, doc.root()) {
        let Some(element) = doc.element_mut(id) else {
            continue;
        };
        for attribute in element.attributes.iter_mut() {
            if !is_ignored_attribute(&attribute.name) && attribute.value.contains("${") {
                attribute.value = encode_unresolved(&attribute.value);
            }
        }
    }
}
