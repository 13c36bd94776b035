//! Position-tracking loader built on quick-xml
//!
//! quick-xml reports byte offsets; they are mapped to 1-based line/column
//! pairs through a line-start table. Attribute positions are recovered by
//! scanning the raw start tag.

use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use std::fs;
use std::path::Path;

use crate::document::{NodeId, XmlAttribute, XmlDocument};
use crate::error::XmlError;
use crate::name::{XmlName, XML_URI};
use crate::position::{SourceFile, SourceFilePosition, SourcePosition};

/// Read and parse a file from disk
pub fn load(path: &Path) -> Result<XmlDocument, XmlError> {
    let text = fs::read_to_string(path).map_err(|e| XmlError::Io {
        path: path.display().to_string(),
        message: e.to_string(),
    })?;
    parse(&text, SourceFile::from_path(path))
}

/// Parse a document held in memory
pub fn parse(text: &str, source: SourceFile) -> Result<XmlDocument, XmlError> {
    let lines = LineIndex::new(text);
    let mut reader = Reader::from_str(text);
    reader.config_mut().trim_text(false);

    let mut parser = TreeBuilder {
        text,
        source: &source,
        lines: &lines,
        doc: None,
        stack: Vec::new(),
        scopes: Vec::new(),
    };

    loop {
        let start = clamp(reader.buffer_position(), text.len());
        let event = match reader.read_event() {
            Ok(event) => event,
            Err(e) => {
                let at = clamp(reader.error_position(), text.len());
                return Err(XmlError::malformed(&source, lines.position(at), e.to_string()));
            }
        };
        let end = clamp(reader.buffer_position(), text.len());

        match event {
            Event::Start(tag) => {
                let id = parser.open_element(&tag, start, end)?;
                parser.stack.push(id);
            }
            Event::Empty(tag) => {
                parser.open_element(&tag, start, end)?;
                parser.scopes.pop();
            }
            Event::End(_) => {
                parser.stack.pop();
                parser.scopes.pop();
            }
            Event::Text(content) => {
                let value = content.unescape().map_err(|e| {
                    XmlError::malformed(&source, lines.position(start), e.to_string())
                })?;
                parser.text(value.trim(), start);
            }
            Event::CData(content) => {
                let value = String::from_utf8_lossy(&content);
                parser.text(value.trim(), start);
            }
            Event::Comment(content) => {
                let value = String::from_utf8_lossy(&content).to_string();
                parser.comment(value, start);
            }
            Event::Eof => break,
            _ => {}
        }
    }

    if let Some(open) = parser.stack.last() {
        let name = parser
            .doc
            .as_ref()
            .and_then(|d| d.name(*open))
            .map(|n| n.qualified())
            .unwrap_or_default();
        return Err(XmlError::malformed(
            &source,
            lines.position(text.len()),
            format!("unexpected end of document, <{}> is not closed", name),
        ));
    }

    parser.doc.ok_or_else(|| {
        XmlError::malformed(&source, SourcePosition::unknown(), "document has no root element")
    })
}

fn clamp<T: TryInto<usize>>(position: T, len: usize) -> usize {
    position.try_into().map(|p| p.min(len)).unwrap_or(len)
}

struct TreeBuilder<'a> {
    text: &'a str,
    source: &'a SourceFile,
    lines: &'a LineIndex,
    doc: Option<XmlDocument>,
    stack: Vec<NodeId>,
    scopes: Vec<Vec<(String, String)>>,
}

impl TreeBuilder<'_> {
    fn origin(&self, offset: usize) -> SourceFilePosition {
        SourceFilePosition::new(self.source.clone(), self.lines.position(offset))
    }

    fn error(&self, offset: usize, message: impl Into<String>) -> XmlError {
        XmlError::malformed(self.source, self.lines.position(offset), message)
    }

    fn lookup(&self, prefix: &str) -> Option<&str> {
        if prefix == "xml" {
            return Some(XML_URI);
        }
        self.scopes
            .iter()
            .rev()
            .flat_map(|scope| scope.iter())
            .find(|(p, _)| p == prefix)
            .map(|(_, uri)| uri.as_str())
    }

    fn open_element(
        &mut self,
        tag: &BytesStart<'_>,
        start: usize,
        end: usize,
    ) -> Result<NodeId, XmlError> {
        let text = self.text;
        let raw_tag = &text[start..end];
        let tag_name = std::str::from_utf8(tag.name().as_ref())
            .map_err(|e| self.error(start, e.to_string()))?
            .to_string();

        let mut raw = Vec::new();
        let mut search_from = 0;
        for attr in tag.attributes() {
            let attr = attr.map_err(|e| self.error(start, e.to_string()))?;
            let key = std::str::from_utf8(attr.key.as_ref())
                .map_err(|e| self.error(start, e.to_string()))?
                .to_string();
            let value = attr
                .unescape_value()
                .map_err(|e| self.error(start, e.to_string()))?
                .to_string();
            let offset = match attribute_offset(raw_tag, &key, search_from) {
                Some(found) => {
                    search_from = found + key.len();
                    start + found
                }
                None => start,
            };
            raw.push((key, value, offset));
        }

        let scope = raw
            .iter()
            .filter_map(|(key, value, _)| {
                if key == "xmlns" {
                    Some((String::new(), value.clone()))
                } else {
                    key.strip_prefix("xmlns:").map(|p| (p.to_string(), value.clone()))
                }
            })
            .collect();
        self.scopes.push(scope);

        let name = self.element_name(&tag_name, start)?;
        let mut attributes = Vec::with_capacity(raw.len());
        for (key, value, offset) in raw {
            let name = self.attribute_name(&key, offset)?;
            attributes.push(XmlAttribute::new(name, value, self.origin(offset)));
        }

        let origin = self.origin(start);
        let parent = self.stack.last().copied();
        let Some(doc) = self.doc.as_mut() else {
            let mut doc = XmlDocument::new(self.source.clone(), name, origin);
            let root = doc.root();
            if let Some(element) = doc.element_mut(root) {
                element.attributes = attributes;
            }
            self.doc = Some(doc);
            return Ok(root);
        };
        match parent {
            Some(parent) => Ok(doc.append_element(parent, name, attributes, origin)),
            None => {
                Err(self.error(start, format!("unexpected second root element <{}>", tag_name)))
            }
        }
    }

    fn element_name(&self, qualified: &str, offset: usize) -> Result<XmlName, XmlError> {
        match qualified.split_once(':') {
            Some((prefix, local)) => match self.lookup(prefix) {
                Some(uri) => Ok(XmlName::namespaced(uri, prefix, local)),
                None => Err(self.error(offset, format!("unbound namespace prefix '{}'", prefix))),
            },
            None => match self.lookup("") {
                Some(uri) if !uri.is_empty() => Ok(XmlName::namespaced(uri, "", qualified)),
                _ => Ok(XmlName::simple(qualified)),
            },
        }
    }

    fn attribute_name(&self, qualified: &str, offset: usize) -> Result<XmlName, XmlError> {
        if qualified == "xmlns" || qualified.starts_with("xmlns:") {
            return Ok(XmlName::simple(qualified));
        }
        match qualified.split_once(':') {
            Some((prefix, local)) => match self.lookup(prefix) {
                Some(uri) => Ok(XmlName::namespaced(uri, prefix, local)),
                None => Err(self.error(offset, format!("unbound namespace prefix '{}'", prefix))),
            },
            None => Ok(XmlName::simple(qualified)),
        }
    }

    fn text(&mut self, value: &str, offset: usize) {
        if value.is_empty() {
            return;
        }
        let origin = self.origin(offset);
        if let (Some(doc), Some(parent)) = (self.doc.as_mut(), self.stack.last()) {
            doc.append_text(*parent, value, origin);
        }
    }

    fn comment(&mut self, value: String, offset: usize) {
        let origin = self.origin(offset);
        if let (Some(doc), Some(parent)) = (self.doc.as_mut(), self.stack.last()) {
            doc.append_comment(*parent, value, origin);
        }
    }
}

/// Find `key=` inside a raw start tag, starting at byte `from`
fn attribute_offset(tag: &str, key: &str, from: usize) -> Option<usize> {
    let mut search = from.min(tag.len());
    while let Some(found) = tag[search..].find(key) {
        let at = search + found;
        let preceded_by_space = tag[..at].chars().next_back().is_some_and(char::is_whitespace);
        let followed_by_eq = tag[at + key.len()..].trim_start().starts_with('=');
        if preceded_by_space && followed_by_eq {
            return Some(at);
        }
        search = at + key.len();
    }
    None
}

/// Byte offset to line/column mapping
struct LineIndex {
    starts: Vec<usize>,
}

impl LineIndex {
    fn new(text: &str) -> Self {
        let mut starts = vec![0];
        starts.extend(text.match_indices('\n').map(|(i, _)| i + 1));
        Self { starts }
    }

    fn position(&self, offset: usize) -> SourcePosition {
        let line = match self.starts.binary_search(&offset) {
            Ok(exact) => exact,
            Err(next) => next - 1,
        };
        let column = offset - self.starts[line];
        SourcePosition::new(line as u32 + 1, column as u32 + 1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::name::{ANDROID_URI, TOOLS_URI};

    const MANIFEST: &str = r#"<?xml version="1.0" encoding="utf-8"?>
<manifest xmlns:android="http://schemas.android.com/apk/res/android"
    xmlns:tools="http://schemas.android.com/tools"
    package="com.example.app">

    <!-- entry point -->
    <application android:label="Example">
        <activity
            android:name=".MainActivity"
            tools:replace="android:label"
            android:label="Main" />
    </application>
</manifest>
"#;

    fn doc() -> XmlDocument {
        parse(MANIFEST, SourceFile::named("main")).unwrap()
    }

    #[test]
    fn test_parse_structure() {
        let doc = doc();
        let root = doc.root();
        assert_eq!(doc.name(root).unwrap().qualified(), "manifest");
        assert_eq!(doc.attribute_value(root, &XmlName::simple("package")), Some("com.example.app"));

        // comment + application
        assert_eq!(doc.children(root).len(), 2);
        let app = doc.child_elements(root)[0];
        assert_eq!(doc.attribute_value(app, &XmlName::android("label")), Some("Example"));

        let activity = doc.child_elements(app)[0];
        assert_eq!(
            doc.attribute_value(activity, &XmlName::namespaced(TOOLS_URI, "tools", "replace")),
            Some("android:label")
        );
    }

    #[test]
    fn test_element_positions() {
        let doc = doc();
        let root = doc.root();
        assert_eq!(doc.origin(root).position, SourcePosition::new(2, 1));

        let app = doc.child_elements(root)[0];
        assert_eq!(doc.origin(app).position, SourcePosition::new(7, 5));

        let activity = doc.child_elements(app)[0];
        assert_eq!(doc.origin(activity).position.line, Some(8));
    }

    #[test]
    fn test_attribute_positions() {
        let doc = doc();
        let root = doc.root();
        let package = doc.attribute(root, &XmlName::simple("package")).unwrap();
        assert_eq!(package.origin.position, SourcePosition::new(4, 5));

        let app = doc.child_elements(root)[0];
        let activity = doc.child_elements(app)[0];
        let label = doc.attribute(activity, &XmlName::android("label")).unwrap();
        assert_eq!(label.origin.position.line, Some(11));
        let name = doc.attribute(activity, &XmlName::android("name")).unwrap();
        assert_eq!(name.origin.position.line, Some(9));
        assert_eq!(name.name.namespace_uri(), Some(ANDROID_URI));
    }

    #[test]
    fn test_malformed_reports_position() {
        let err = parse("<manifest>\n  <application>\n</manifest>\n", SourceFile::named("bad"))
            .unwrap_err();
        assert!(matches!(err, XmlError::Malformed { .. }));
        assert!(err.to_string().starts_with("bad:"));
    }

    #[test]
    fn test_unclosed_document() {
        let err = parse("<manifest>\n  <application>\n", SourceFile::named("bad")).unwrap_err();
        assert!(matches!(err, XmlError::Malformed { .. }));
    }

    #[test]
    fn test_unbound_prefix() {
        let err = parse(r#"<manifest foo:bar="x"/>"#, SourceFile::named("bad")).unwrap_err();
        assert!(err.to_string().contains("unbound namespace prefix 'foo'"));
    }

    #[test]
    fn test_empty_document() {
        let err = parse("<?xml version=\"1.0\"?>\n", SourceFile::named("empty")).unwrap_err();
        assert!(err.to_string().contains("no root element"));
    }

    #[test]
    fn test_attribute_offset_skips_value_matches() {
        let tag = r#"<meta-data android:value="android:name" android:name="x"/>"#;
        let value_at = attribute_offset(tag, "android:value", 0).unwrap();
        let name_at = attribute_offset(tag, "android:name", value_at).unwrap();
        assert_eq!(&tag[name_at..name_at + 12], "android:name");
        assert!(tag[name_at..].starts_with("android:name=\"x\""));
    }

    #[test]
    fn test_load_missing_file() {
        let err = load(Path::new("/definitely/not/here.xml")).unwrap_err();
        assert!(matches!(err, XmlError::Io { .. }));
    }
}
