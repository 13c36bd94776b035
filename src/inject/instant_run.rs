//! Incremental deployment variant

use merger_xml::{XmlAttribute, XmlDocument, XmlName, ANDROID_URI};

use super::property::build_configuration_position;
use crate::model::{element_type, ElementType};

/// Application class installed by the incremental deployment runtime
pub const BOOTSTRAP_APPLICATION: &str = "com.android.tools.ir.server.BootstrapApplication";

/// Meta-data entry preserving the original application class
pub const REAL_APPLICATION_KEY: &str = "com.android.tools.ir.server.realApplication";

/// Swap the application class for the bootstrap class.
///
/// The original class, when there was one, is kept in a `meta-data` entry
/// under `<application>`.
pub fn apply_instant_run(doc: &mut XmlDocument) {
    let root = doc.root();
    let prefix = doc.ensure_namespace("android", ANDROID_URI);
    let android = |local: &str| XmlName::namespaced(ANDROID_URI, prefix.clone(), local);
    let position = build_configuration_position();

    let application = match doc
        .child_elements(root)
        .into_iter()
        .find(|child| element_type(doc, *child) == ElementType::Application)
    {
        Some(existing) => existing,
        None => doc.append_element(
            root,
            XmlName::simple("application"),
            Vec::new(),
            position.clone(),
        ),
    };

    let original = doc
        .attribute_value(application, &XmlName::android("name"))
        .map(str::to_string);
    doc.set_attribute(
        application,
        XmlAttribute::new(android("name"), BOOTSTRAP_APPLICATION, position.clone()),
    );

    if let Some(original) = original {
        doc.insert_element(
            application,
            0,
            XmlName::simple(ElementType::MetaData.tag()),
            vec![
                XmlAttribute::new(android("name"), REAL_APPLICATION_KEY, position.clone()),
                XmlAttribute::new(android("value"), original, position.clone()),
            ],
            position,
        );
    }
}
