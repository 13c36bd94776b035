//! Node key resolution
//!
//! A local key identifies an element among its siblings. The node key used
//! for recording decisions is the local key, scoped under the parent's node
//! key for elements nested below components, so that an `<action>` inside one
//! activity's intent filter never shares a key with the same action elsewhere.

use merger_actions::NodeKey;
use merger_xml::{canonical_form, NodeId, XmlDocument, XmlName, ANDROID_URI};
use sha2::{Digest, Sha256};

use super::element_type::{ElementType, KeySpec};
use super::instructions::is_ignored_attribute;

/// Key of an element among its siblings
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocalKey {
    pub key: NodeKey,

    /// Key attribute(s) the element should carry but does not. The key then
    /// falls back to a content digest.
    pub missing: Option<String>,
}

/// Resolve the key of an element among its siblings
pub fn local_key(doc: &XmlDocument, id: NodeId) -> LocalKey {
    let Some(name) = doc.name(id) else {
        return LocalKey {
            key: NodeKey::single("#text"),
            missing: None,
        };
    };
    let element_type = ElementType::from_name(name);
    let tag = element_type.tag();
    let android = |local: &str| doc.attribute_value(id, &XmlName::android(local));

    let found = |discriminator: String| LocalKey {
        key: NodeKey::keyed(tag, &discriminator),
        missing: None,
    };
    let missing = |description: String| LocalKey {
        key: NodeKey::keyed(tag, &content_digest(doc, id)),
        missing: Some(description),
    };

    match element_type.key_spec() {
        KeySpec::Single => LocalKey {
            key: NodeKey::single(tag),
            missing: None,
        },
        KeySpec::FirstOf(attributes) => match attributes.iter().find_map(|&a| android(a)) {
            Some(value) => found(value.to_string()),
            None => missing(describe(attributes, " or ")),
        },
        KeySpec::AllOf(attributes) => {
            let values: Option<Vec<&str>> = attributes.iter().map(|&a| android(a)).collect();
            match values {
                Some(values) => found(values.join("+")),
                None => missing(describe(attributes, " and ")),
            }
        }
        KeySpec::AnyOf(attributes) => {
            let values: Vec<&str> = attributes.iter().filter_map(|&a| android(a)).collect();
            if values.is_empty() {
                missing(describe(attributes, " or "))
            } else {
                found(values.join("+"))
            }
        }
        KeySpec::Feature => match (android("name"), android("glEsVersion")) {
            (Some(value), _) => found(value.to_string()),
            (None, Some(_)) => found("glEsVersion".to_string()),
            (None, None) => missing(describe(&["name", "glEsVersion"], " or ")),
        },
        KeySpec::Attributes => {
            let mut pairs: Vec<String> = doc
                .attributes(id)
                .iter()
                .filter(|a| !is_ignored_attribute(&a.name))
                .map(|a| format!("{}={}", a.name.local_name(), a.value))
                .collect();
            pairs.sort();
            found(pairs.join(";"))
        }
        KeySpec::Children => {
            let mut keys: Vec<String> = doc
                .child_elements(id)
                .into_iter()
                .map(|child| local_key(doc, child).key.to_string())
                .collect();
            keys.sort();
            found(keys.join("+"))
        }
        KeySpec::Content => LocalKey {
            key: NodeKey::keyed(name.local_name(), &content_digest(doc, id)),
            missing: None,
        },
    }
}

/// Node key of an element inside its document
pub fn node_key(doc: &XmlDocument, id: NodeId) -> NodeKey {
    let local = local_key(doc, id).key;
    match doc.parent(id) {
        Some(parent) => child_key(doc, parent, &local),
        None => local,
    }
}

/// Node key an element with the given local key has (or would have) under
/// `parent`
pub fn child_key(doc: &XmlDocument, parent: NodeId, local: &NodeKey) -> NodeKey {
    let container = doc
        .name(parent)
        .map(ElementType::from_name)
        .is_some_and(|t| t.is_top_level_container());
    if container {
        return local.clone();
    }
    let parent_key = node_key(doc, parent);
    NodeKey::keyed(
        local.element_type(),
        &format!("{}/{}", parent_key, local.discriminator().unwrap_or_default()),
    )
}

/// Elements in document order, without descending into custom elements
pub fn mergeable_elements(doc: &XmlDocument, id: NodeId) -> Vec<NodeId> {
    let mut out = Vec::new();
    let mut stack = vec![id];
    while let Some(next) = stack.pop() {
        let Some(name) = doc.name(next) else {
            continue;
        };
        out.push(next);
        if ElementType::from_name(name) != ElementType::Custom {
            stack.extend(doc.child_elements(next).into_iter().rev());
        }
    }
    out
}

/// Element type of a node; comments and text classify as custom
pub fn element_type(doc: &XmlDocument, id: NodeId) -> ElementType {
    doc.name(id).map(ElementType::from_name).unwrap_or(ElementType::Custom)
}

fn content_digest(doc: &XmlDocument, id: NodeId) -> String {
    let mut hasher = Sha256::new();
    hasher.update(canonical_form(doc, id).as_bytes());
    hex::encode(hasher.finalize())
}

fn describe(attributes: &[&str], separator: &str) -> String {
    attributes
        .iter()
        .map(|a| format!("android:{}", a))
        .collect::<Vec<_>>()
        .join(separator)
}

/// True when the attribute is an `android:` attribute with the given local name
pub fn is_android(name: &XmlName, local: &str) -> bool {
    name.is_in(ANDROID_URI) && name.local_name() == local
}

#[cfg(test)]
mod tests {
    use super::*;
    use merger_xml::{parse, SourceFile};

    const MANIFEST: &str = r#"<manifest xmlns:android="http://schemas.android.com/apk/res/android"
    xmlns:tools="http://schemas.android.com/tools" package="com.example">
    <uses-sdk android:minSdkVersion="21" />
    <uses-feature android:glEsVersion="0x00020000" />
    <application>
        <activity android:name="com.example.Main">
            <intent-filter>
                <category android:name="android.intent.category.LAUNCHER" />
                <action android:name="android.intent.action.MAIN" />
            </intent-filter>
            <meta-data android:name="color" android:value="red" />
        </activity>
        <service />
        <data android:scheme="https" android:host="example.com" tools:ignore="x" />
    </application>
</manifest>"#;

    fn doc() -> XmlDocument {
        parse(MANIFEST, SourceFile::named("main")).unwrap()
    }

    fn find(doc: &XmlDocument, tag: &str) -> NodeId {
        mergeable_elements(doc, doc.root())
            .into_iter()
            .find(|id| doc.name(*id).map(|n| n.local_name()) == Some(tag))
            .unwrap()
    }

    #[test]
    fn test_single_and_named_keys() {
        let doc = doc();
        assert_eq!(node_key(&doc, doc.root()).as_str(), "manifest");
        assert_eq!(node_key(&doc, find(&doc, "uses-sdk")).as_str(), "uses-sdk");
        assert_eq!(node_key(&doc, find(&doc, "activity")).as_str(), "activity#com.example.Main");
        assert_eq!(node_key(&doc, find(&doc, "uses-feature")).as_str(), "uses-feature#glEsVersion");
    }

    #[test]
    fn test_intent_filter_key_sorted_children() {
        let doc = doc();
        let filter = find(&doc, "intent-filter");
        assert_eq!(
            local_key(&doc, filter).key.as_str(),
            "intent-filter#action#android.intent.action.MAIN+category#android.intent.category.LAUNCHER"
        );
    }

    #[test]
    fn test_nested_keys_are_scoped() {
        let doc = doc();
        let meta = find(&doc, "meta-data");
        assert_eq!(node_key(&doc, meta).as_str(), "meta-data#activity#com.example.Main/color");
        assert_eq!(node_key(&doc, meta).element_type(), "meta-data");

        let action = find(&doc, "action");
        assert!(node_key(&doc, action)
            .as_str()
            .starts_with("action#intent-filter#activity#com.example.Main/"));
    }

    #[test]
    fn test_data_key_ignores_tools() {
        let doc = doc();
        let data = find(&doc, "data");
        assert_eq!(local_key(&doc, data).key.as_str(), "data#host=example.com;scheme=https");
    }

    #[test]
    fn test_missing_key_attribute() {
        let doc = doc();
        let service = local_key(&doc, find(&doc, "service"));
        assert_eq!(service.missing.as_deref(), Some("android:name"));
        assert_eq!(service.key.element_type(), "service");
    }

    #[test]
    fn test_custom_key_is_content_digest() {
        let a = parse(
            r#"<manifest xmlns:v="urn:vendor"><v:extra v:level="1"/></manifest>"#,
            SourceFile::named("a"),
        )
        .unwrap();
        let b = parse(
            r#"<manifest xmlns:x="urn:vendor"><x:extra x:level="1"/></manifest>"#,
            SourceFile::named("b"),
        )
        .unwrap();
        let key_a = local_key(&a, a.child_elements(a.root())[0]).key;
        let key_b = local_key(&b, b.child_elements(b.root())[0]).key;
        assert_eq!(key_a, key_b);
        assert_eq!(key_a.element_type(), "extra");
    }
}
