//! Arena-backed XML document
//!
//! Nodes live in a flat vector and refer to each other by index. Detached
//! nodes stay in the arena but are no longer reachable from the root.

use crate::name::{XmlName, XML_URI};
use crate::position::{SourceFile, SourceFilePosition};

/// Index of a node inside its [`XmlDocument`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(usize);

impl NodeId {
    pub fn index(self) -> usize {
        self.0
    }
}

/// An attribute together with the place it was declared
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct XmlAttribute {
    pub name: XmlName,
    pub value: String,
    pub origin: SourceFilePosition,
}

impl XmlAttribute {
    pub fn new(name: XmlName, value: impl Into<String>, origin: SourceFilePosition) -> Self {
        Self {
            name,
            value: value.into(),
            origin,
        }
    }
}

#[derive(Debug, Clone)]
pub struct XmlElement {
    pub name: XmlName,
    pub attributes: Vec<XmlAttribute>,
}

#[derive(Debug, Clone)]
pub enum NodeKind {
    Element(XmlElement),
    Comment(String),
    Text(String),
}

#[derive(Debug, Clone)]
pub struct XmlNode {
    pub kind: NodeKind,
    pub origin: SourceFilePosition,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
}

/// A document whose root is always an element
#[derive(Debug, Clone)]
pub struct XmlDocument {
    source: SourceFile,
    nodes: Vec<XmlNode>,
    root: NodeId,
}

impl XmlDocument {
    /// Create a document containing only its root element
    pub fn new(source: SourceFile, root_name: XmlName, origin: SourceFilePosition) -> Self {
        let root = XmlNode {
            kind: NodeKind::Element(XmlElement {
                name: root_name,
                attributes: Vec::new(),
            }),
            origin,
            parent: None,
            children: Vec::new(),
        };
        Self {
            source,
            nodes: vec![root],
            root: NodeId(0),
        }
    }

    pub fn source(&self) -> &SourceFile {
        &self.source
    }

    pub fn root(&self) -> NodeId {
        self.root
    }

    pub fn node(&self, id: NodeId) -> &XmlNode {
        &self.nodes[id.0]
    }

    pub fn element(&self, id: NodeId) -> Option<&XmlElement> {
        match &self.nodes[id.0].kind {
            NodeKind::Element(element) => Some(element),
            _ => None,
        }
    }

    pub fn element_mut(&mut self, id: NodeId) -> Option<&mut XmlElement> {
        match &mut self.nodes[id.0].kind {
            NodeKind::Element(element) => Some(element),
            _ => None,
        }
    }

    pub fn is_element(&self, id: NodeId) -> bool {
        self.element(id).is_some()
    }

    /// Qualified name of an element; `None` for comments and text
    pub fn name(&self, id: NodeId) -> Option<&XmlName> {
        self.element(id).map(|e| &e.name)
    }

    pub fn origin(&self, id: NodeId) -> &SourceFilePosition {
        &self.nodes[id.0].origin
    }

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.nodes[id.0].parent
    }

    pub fn children(&self, id: NodeId) -> &[NodeId] {
        &self.nodes[id.0].children
    }

    /// Child elements in document order, skipping comments and text
    pub fn child_elements(&self, id: NodeId) -> Vec<NodeId> {
        self.nodes[id.0]
            .children
            .iter()
            .copied()
            .filter(|child| self.is_element(*child))
            .collect()
    }

    pub fn attributes(&self, id: NodeId) -> &[XmlAttribute] {
        self.element(id).map(|e| e.attributes.as_slice()).unwrap_or(&[])
    }

    pub fn attribute(&self, id: NodeId, name: &XmlName) -> Option<&XmlAttribute> {
        self.attributes(id).iter().find(|a| &a.name == name)
    }

    pub fn attribute_value(&self, id: NodeId, name: &XmlName) -> Option<&str> {
        self.attribute(id, name).map(|a| a.value.as_str())
    }

    /// Set an attribute, replacing an existing one in place or appending
    pub fn set_attribute(&mut self, id: NodeId, attribute: XmlAttribute) {
        if let Some(element) = self.element_mut(id) {
            match element.attributes.iter_mut().find(|a| a.name == attribute.name) {
                Some(existing) => *existing = attribute,
                None => element.attributes.push(attribute),
            }
        }
    }

    pub fn remove_attribute(&mut self, id: NodeId, name: &XmlName) -> Option<XmlAttribute> {
        let element = self.element_mut(id)?;
        let index = element.attributes.iter().position(|a| &a.name == name)?;
        Some(element.attributes.remove(index))
    }

    fn push_node(&mut self, kind: NodeKind, origin: SourceFilePosition, parent: NodeId) -> NodeId {
        let id = NodeId(self.nodes.len());
        self.nodes.push(XmlNode {
            kind,
            origin,
            parent: Some(parent),
            children: Vec::new(),
        });
        id
    }

    /// Append a new element as the last child of `parent`
    pub fn append_element(
        &mut self,
        parent: NodeId,
        name: XmlName,
        attributes: Vec<XmlAttribute>,
        origin: SourceFilePosition,
    ) -> NodeId {
        let id = self.push_node(NodeKind::Element(XmlElement { name, attributes }), origin, parent);
        self.nodes[parent.0].children.push(id);
        id
    }

    /// Insert a new element at `index` among the children of `parent`
    pub fn insert_element(
        &mut self,
        parent: NodeId,
        index: usize,
        name: XmlName,
        attributes: Vec<XmlAttribute>,
        origin: SourceFilePosition,
    ) -> NodeId {
        let id = self.push_node(NodeKind::Element(XmlElement { name, attributes }), origin, parent);
        let children = &mut self.nodes[parent.0].children;
        let index = index.min(children.len());
        children.insert(index, id);
        id
    }

    pub fn append_comment(
        &mut self,
        parent: NodeId,
        text: impl Into<String>,
        origin: SourceFilePosition,
    ) -> NodeId {
        let id = self.push_node(NodeKind::Comment(text.into()), origin, parent);
        self.nodes[parent.0].children.push(id);
        id
    }

    pub fn append_text(
        &mut self,
        parent: NodeId,
        text: impl Into<String>,
        origin: SourceFilePosition,
    ) -> NodeId {
        let id = self.push_node(NodeKind::Text(text.into()), origin, parent);
        self.nodes[parent.0].children.push(id);
        id
    }

    /// Unlink a node from its parent. The root cannot be detached.
    pub fn detach(&mut self, id: NodeId) {
        if let Some(parent) = self.nodes[id.0].parent.take() {
            self.nodes[parent.0].children.retain(|child| *child != id);
        }
    }

    /// The node and all of its reachable descendants, in document order
    pub fn descendants(&self, id: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut stack = vec![id];
        while let Some(next) = stack.pop() {
            out.push(next);
            stack.extend(self.nodes[next.0].children.iter().rev().copied());
        }
        out
    }

    /// Resolve a prefix against the `xmlns` declarations in scope at `id`
    pub fn resolve_prefix(&self, id: NodeId, prefix: &str) -> Option<&str> {
        if prefix == "xml" {
            return Some(XML_URI);
        }
        let declaration = if prefix.is_empty() {
            "xmlns".to_string()
        } else {
            format!("xmlns:{}", prefix)
        };
        let mut current = Some(id);
        while let Some(node) = current {
            if let Some(attr) = self
                .attributes(node)
                .iter()
                .find(|a| matches!(&a.name, XmlName::Simple { name } if *name == declaration))
            {
                return Some(attr.value.as_str());
            }
            current = self.parent(node);
        }
        None
    }

    /// Prefix bound to `uri` on the root element, if any
    pub fn namespace_prefix(&self, uri: &str) -> Option<&str> {
        self.attributes(self.root).iter().find_map(|a| match &a.name {
            XmlName::Simple { name } if a.value == uri => name.strip_prefix("xmlns:"),
            _ => None,
        })
    }

    /// Make sure `uri` is declared on the root element and return its prefix.
    ///
    /// The preferred prefix is used unless it is already bound to another
    /// namespace, in which case a numbered variant is chosen.
    pub fn ensure_namespace(&mut self, preferred_prefix: &str, uri: &str) -> String {
        if let Some(prefix) = self.namespace_prefix(uri) {
            return prefix.to_string();
        }
        let root = self.root;
        let mut prefix = preferred_prefix.to_string();
        let mut counter = 1;
        while self.resolve_prefix(root, &prefix).is_some() {
            prefix = format!("{}{}", preferred_prefix, counter);
            counter += 1;
        }
        let origin = self.origin(root).clone();
        self.set_attribute(
            root,
            XmlAttribute::new(XmlName::simple(format!("xmlns:{}", prefix)), uri, origin),
        );
        prefix
    }

    /// Deep-copy `node` from `source` and append it under `parent`.
    ///
    /// Prefixed names are rebound to the prefixes declared on this document's
    /// root; prefixed `xmlns:` declarations are dropped from the copy since the
    /// root now carries them. Origins are preserved.
    pub fn import_subtree(&mut self, source: &XmlDocument, node: NodeId, parent: NodeId) -> NodeId {
        let copied = match &source.node(node).kind {
            NodeKind::Element(element) => {
                let name = self.bind_name(&element.name);
                let attributes = element
                    .attributes
                    .iter()
                    .filter(|a| !is_prefix_declaration(&a.name))
                    .map(|a| {
                        let name = self.bind_name(&a.name);
                        XmlAttribute::new(name, a.value.clone(), a.origin.clone())
                    })
                    .collect();
                self.append_element(parent, name, attributes, source.origin(node).clone())
            }
            NodeKind::Comment(text) => {
                self.append_comment(parent, text.clone(), source.origin(node).clone())
            }
            NodeKind::Text(text) => {
                self.append_text(parent, text.clone(), source.origin(node).clone())
            }
        };
        for child in source.children(node) {
            self.import_subtree(source, *child, copied);
        }
        copied
    }

    /// Rebind a prefixed name to the prefix this document's root declares
    /// for its namespace, declaring it when missing.
    pub fn bind_name(&mut self, name: &XmlName) -> XmlName {
        match name {
            XmlName::Namespaced {
                namespace_uri,
                prefix,
                ..
            } if !prefix.is_empty() && namespace_uri != XML_URI => {
                let bound = self.ensure_namespace(prefix, namespace_uri);
                name.with_prefix(&bound)
            }
            _ => name.clone(),
        }
    }
}

fn is_prefix_declaration(name: &XmlName) -> bool {
    matches!(name, XmlName::Simple { name } if name.starts_with("xmlns:"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::name::ANDROID_URI;

    fn manifest() -> XmlDocument {
        let mut doc = XmlDocument::new(
            SourceFile::named("test"),
            XmlName::simple("manifest"),
            SourceFilePosition::unknown(),
        );
        let root = doc.root();
        doc.set_attribute(
            root,
            XmlAttribute::new(
                XmlName::simple("xmlns:android"),
                ANDROID_URI,
                SourceFilePosition::unknown(),
            ),
        );
        doc
    }

    #[test]
    fn test_append_and_detach() {
        let mut doc = manifest();
        let root = doc.root();
        let app = doc.append_element(
            root,
            XmlName::simple("application"),
            vec![],
            SourceFilePosition::unknown(),
        );
        let comment = doc.append_comment(root, " note ", SourceFilePosition::unknown());

        assert_eq!(doc.children(root), &[app, comment]);
        assert_eq!(doc.child_elements(root), vec![app]);
        assert_eq!(doc.parent(app), Some(root));

        doc.detach(app);
        assert_eq!(doc.children(root), &[comment]);
        assert_eq!(doc.parent(app), None);
    }

    #[test]
    fn test_set_attribute_replaces_in_place() {
        let mut doc = manifest();
        let root = doc.root();
        let attribute = |name: XmlName, value: &str| {
            XmlAttribute::new(name, value, SourceFilePosition::unknown())
        };
        doc.set_attribute(root, attribute(XmlName::simple("package"), "a"));
        doc.set_attribute(root, attribute(XmlName::android("versionCode"), "1"));
        doc.set_attribute(root, attribute(XmlName::simple("package"), "b"));

        let names: Vec<String> = doc.attributes(root).iter().map(|a| a.name.qualified()).collect();
        assert_eq!(names, vec!["xmlns:android", "package", "android:versionCode"]);
        assert_eq!(doc.attribute_value(root, &XmlName::simple("package")), Some("b"));
    }

    #[test]
    fn test_ensure_namespace_avoids_taken_prefix() {
        let mut doc = manifest();
        assert_eq!(doc.ensure_namespace("android", ANDROID_URI), "android");
        assert_eq!(doc.ensure_namespace("android", "urn:other"), "android1");
        assert_eq!(doc.namespace_prefix("urn:other"), Some("android1"));
    }

    #[test]
    fn test_import_subtree_rebinds_prefix() {
        let mut source = XmlDocument::new(
            SourceFile::named("lib"),
            XmlName::simple("manifest"),
            SourceFilePosition::unknown(),
        );
        let src_root = source.root();
        source.set_attribute(
            src_root,
            XmlAttribute::new(
                XmlName::simple("xmlns:a"),
                ANDROID_URI,
                SourceFilePosition::unknown(),
            ),
        );
        let activity = source.append_element(
            src_root,
            XmlName::simple("activity"),
            vec![XmlAttribute::new(
                XmlName::namespaced(ANDROID_URI, "a", "name"),
                "com.lib.Main",
                SourceFilePosition::unknown(),
            )],
            SourceFilePosition::unknown(),
        );
        source.append_element(
            activity,
            XmlName::simple("intent-filter"),
            vec![],
            SourceFilePosition::unknown(),
        );

        let mut doc = manifest();
        let root = doc.root();
        let copied = doc.import_subtree(&source, activity, root);

        let attr = &doc.attributes(copied)[0];
        assert_eq!(attr.name.qualified(), "android:name");
        assert_eq!(doc.child_elements(copied).len(), 1);
        assert_eq!(doc.descendants(root).len(), 3);
    }

    #[test]
    fn test_resolve_prefix_walks_ancestors() {
        let mut doc = manifest();
        let root = doc.root();
        let child = doc.append_element(
            root,
            XmlName::simple("application"),
            vec![],
            SourceFilePosition::unknown(),
        );
        assert_eq!(doc.resolve_prefix(child, "android"), Some(ANDROID_URI));
        assert_eq!(doc.resolve_prefix(child, "xml"), Some(XML_URI));
        assert_eq!(doc.resolve_prefix(child, "missing"), None);
    }
}
