//! Package-relative class names

use merger_xml::{XmlDocument, XmlName};

use super::element_type::ElementType;
use super::key::{element_type, is_android, mergeable_elements};

/// Android attributes holding class names, per element type
fn class_name_attributes(element: ElementType) -> &'static [&'static str] {
    match element {
        ElementType::Application => &["name", "backupAgent", "manageSpaceActivity"],
        ElementType::Activity => &["name", "parentActivityName"],
        ElementType::ActivityAlias => &["name", "targetActivity"],
        ElementType::Service
        | ElementType::Receiver
        | ElementType::Provider
        | ElementType::Instrumentation => &["name"],
        _ => &[],
    }
}

/// The `package` attribute of the document root
pub fn document_package(doc: &XmlDocument) -> Option<&str> {
    doc.attribute_value(doc.root(), &XmlName::simple("package"))
}

/// Expand `.Name` and `Name` against `package`; qualified names and
/// placeholders are returned unchanged
pub fn expand_class_name(package: &str, value: &str) -> Option<String> {
    if value.is_empty() || value.starts_with("${") {
        return None;
    }
    if value.starts_with('.') {
        return Some(format!("{}{}", package, value));
    }
    if !value.contains('.') {
        return Some(format!("{}.{}", package, value));
    }
    None
}

/// Rewrite every relative class name in the document to its fully
/// qualified form. Returns the number of rewritten values.
pub fn expand_class_names(doc: &mut XmlDocument) -> usize {
    let Some(package) = document_package(doc).map(str::to_string) else {
        return 0;
    };
    let mut expanded = 0;
    for id in mergeable_elements(doc, doc.root()) {
        let attributes = class_name_attributes(element_type(doc, id));
        let Some(element) = doc.element_mut(id) else {
            continue;
        };
        for attribute in element.attributes.iter_mut() {
            let targeted = attributes.iter().any(|a| is_android(&attribute.name, a));
            if !targeted {
                continue;
            }
            if let Some(value) = expand_class_name(&package, &attribute.value) {
                attribute.value = value;
                expanded += 1;
            }
        }
    }
    expanded
}

#[cfg(test)]
mod tests {
    use super::*;
    use merger_xml::{parse, SourceFile};

    #[test]
    fn test_expand_class_name() {
        assert_eq!(expand_class_name("com.foo", ".Main").as_deref(), Some("com.foo.Main"));
        assert_eq!(expand_class_name("com.foo", "Main").as_deref(), Some("com.foo.Main"));
        assert_eq!(expand_class_name("com.foo", "com.bar.Main"), None);
        assert_eq!(expand_class_name("com.foo", "${applicationId}.Main"), None);
    }

    #[test]
    fn test_expand_document() {
        let mut doc = parse(
            r#"<manifest xmlns:android="http://schemas.android.com/apk/res/android" package="com.foo">
    <application android:name=".App" android:label="Main">
        <activity android:name=".ui.Main" android:parentActivityName="Home" />
        <meta-data android:name="Setting" />
    </application>
</manifest>"#,
            SourceFile::named("main"),
        )
        .unwrap();

        assert_eq!(expand_class_names(&mut doc), 3);

        let root = doc.root();
        let app = doc.child_elements(root)[0];
        let activity = doc.child_elements(app)[0];
        let meta = doc.child_elements(app)[1];
        assert_eq!(doc.attribute_value(app, &XmlName::android("name")), Some("com.foo.App"));
        assert_eq!(doc.attribute_value(app, &XmlName::android("label")), Some("Main"));
        assert_eq!(
            doc.attribute_value(activity, &XmlName::android("name")),
            Some("com.foo.ui.Main")
        );
        assert_eq!(
            doc.attribute_value(activity, &XmlName::android("parentActivityName")),
            Some("com.foo.Home")
        );
        assert_eq!(doc.attribute_value(meta, &XmlName::android("name")), Some("Setting"));
    }
}
