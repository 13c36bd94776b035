//! Deterministic pretty printer
//!
//! Layout rules:
//! - four spaces of indentation per level
//! - a single attribute stays on the element line, several go one per line
//! - elements containing only text are printed inline
//!
//! The layout is stable so that the same document always produces the same
//! bytes and the same line numbers.

use quick_xml::escape::{escape, partial_escape};

use crate::document::{NodeId, NodeKind, XmlDocument};

const INDENT: &str = "    ";

impl XmlDocument {
    /// Serialize with an XML declaration and a trailing newline
    pub fn to_xml_string(&self) -> String {
        let mut out = String::from("<?xml version=\"1.0\" encoding=\"utf-8\"?>\n");
        write_node(self, self.root(), 0, &mut out);
        out
    }
}

fn write_node(doc: &XmlDocument, id: NodeId, depth: usize, out: &mut String) {
    let indent = INDENT.repeat(depth);
    match &doc.node(id).kind {
        NodeKind::Comment(text) => {
            out.push_str(&indent);
            out.push_str("<!--");
            out.push_str(text);
            out.push_str("-->\n");
        }
        NodeKind::Text(text) => {
            out.push_str(&indent);
            out.push_str(&partial_escape(text.as_str()));
            out.push('\n');
        }
        NodeKind::Element(element) => {
            let tag = element.name.qualified();
            out.push_str(&indent);
            out.push('<');
            out.push_str(&tag);

            match element.attributes.as_slice() {
                [] => {}
                [single] => {
                    out.push(' ');
                    push_attribute(out, &single.name.qualified(), &single.value);
                }
                many => {
                    for attribute in many {
                        out.push('\n');
                        out.push_str(&indent);
                        out.push_str(INDENT);
                        push_attribute(out, &attribute.name.qualified(), &attribute.value);
                    }
                }
            }
            let spacer = if element.attributes.is_empty() { "" } else { " " };

            let children = doc.children(id);
            if children.is_empty() {
                out.push_str(spacer);
                out.push_str("/>\n");
                return;
            }

            let text_only = children
                .iter()
                .all(|child| matches!(doc.node(*child).kind, NodeKind::Text(_)));
            if text_only {
                out.push_str(spacer);
                out.push('>');
                for child in children {
                    if let NodeKind::Text(text) = &doc.node(*child).kind {
                        out.push_str(&partial_escape(text.as_str()));
                    }
                }
                out.push_str("</");
                out.push_str(&tag);
                out.push_str(">\n");
                return;
            }

            out.push_str(spacer);
            out.push_str(">\n");
            for child in children {
                write_node(doc, *child, depth + 1, out);
            }
            out.push_str(&indent);
            out.push_str("</");
            out.push_str(&tag);
            out.push_str(">\n");
        }
    }
}

fn push_attribute(out: &mut String, name: &str, value: &str) {
    out.push_str(name);
    out.push_str("=\"");
    out.push_str(&escape(value));
    out.push('"');
}

/// Position-free, prefix-free rendering of a subtree.
///
/// Two subtrees with the same canonical form are the same content regardless
/// of where they were declared or which prefixes they used. Comments are
/// ignored.
pub fn canonical_form(doc: &XmlDocument, id: NodeId) -> String {
    let mut out = String::new();
    canonical_node(doc, id, &mut out);
    out
}

fn canonical_node(doc: &XmlDocument, id: NodeId, out: &mut String) {
    match &doc.node(id).kind {
        NodeKind::Comment(_) => {}
        NodeKind::Text(text) => {
            out.push('"');
            out.push_str(text);
            out.push('"');
        }
        NodeKind::Element(element) => {
            out.push('<');
            if let Some(uri) = element.name.namespace_uri() {
                out.push('{');
                out.push_str(uri);
                out.push('}');
            }
            out.push_str(element.name.local_name());
            let mut attributes: Vec<String> = element
                .attributes
                .iter()
                .filter(|a| !a.name.is_namespace_declaration())
                .map(|a| {
                    let uri = a.name.namespace_uri().unwrap_or_default();
                    format!("{{{}}}{}={}", uri, a.name.local_name(), a.value)
                })
                .collect();
            attributes.sort();
            for attribute in attributes {
                out.push(' ');
                out.push_str(&attribute);
            }
            out.push('>');
            for child in doc.children(id) {
                canonical_node(doc, *child, out);
            }
            out.push_str("</>");
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::parser::parse;
    use crate::position::SourceFile;

    use super::*;

    #[test]
    fn test_layout() {
        let input = r#"<manifest xmlns:android="http://schemas.android.com/apk/res/android" package="com.example"><uses-sdk android:minSdkVersion="14"/><application android:label="A &amp; B"><activity android:name="com.example.Main"/><!-- x --></application><meta>text</meta></manifest>"#;
        let doc = parse(input, SourceFile::named("t")).unwrap();
        let expected = r#"<?xml version="1.0" encoding="utf-8"?>
<manifest
    xmlns:android="http://schemas.android.com/apk/res/android"
    package="com.example" >
    <uses-sdk android:minSdkVersion="14" />
    <application android:label="A &amp; B" >
        <activity android:name="com.example.Main" />
        <!-- x -->
    </application>
    <meta>text</meta>
</manifest>
"#;
        assert_eq!(doc.to_xml_string(), expected);
    }

    #[test]
    fn test_reparse_is_stable() {
        let input = r#"<manifest xmlns:android="http://schemas.android.com/apk/res/android" package="p"><application android:name="p.App" android:label="x"><service android:name="p.S"/></application></manifest>"#;
        let first = parse(input, SourceFile::named("t")).unwrap().to_xml_string();
        let second = parse(&first, SourceFile::named("t")).unwrap().to_xml_string();
        assert_eq!(first, second);
    }

    #[test]
    fn test_canonical_form_ignores_prefix_and_order() {
        let a = parse(
            r#"<x xmlns:a="urn:n" a:one="1" two="2"><!-- c --><y/></x>"#,
            SourceFile::named("a"),
        )
        .unwrap();
        let b = parse(
            r#"<x xmlns:b="urn:n" two="2" b:one="1"><y/></x>"#,
            SourceFile::named("b"),
        )
        .unwrap();
        assert_eq!(canonical_form(&a, a.root()), canonical_form(&b, b.root()));
    }
}
