//! Build system properties injected into the merged manifest

use indexmap::IndexMap;
use merger_actions::{ActionRecorder, ActionType, NodeOperationType};
use merger_xml::{
    NodeId, SourceFile, SourceFilePosition, SourcePosition, XmlAttribute, XmlDocument, XmlName,
    ANDROID_URI,
};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::model::{element_type, node_key, ElementType};

/// Description used as the source of every injected value
pub const BUILD_CONFIGURATION: &str = "build configuration";

/// Properties the build system may force onto the merged manifest
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ManifestSystemProperty {
    Package,
    VersionCode,
    VersionName,
    MinSdkVersion,
    TargetSdkVersion,
    MaxSdkVersion,
    Name,
    Label,
    SharedUserId,
}

/// Where a property lands
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PropertyTarget {
    pub element: ElementType,
    /// Attribute local name
    pub attribute: &'static str,
    /// `android:` namespaced, or a plain attribute
    pub android: bool,
}

impl ManifestSystemProperty {
    pub const ALL: [ManifestSystemProperty; 9] = [
        Self::Package,
        Self::VersionCode,
        Self::VersionName,
        Self::MinSdkVersion,
        Self::TargetSdkVersion,
        Self::MaxSdkVersion,
        Self::Name,
        Self::Label,
        Self::SharedUserId,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Package => "PACKAGE",
            Self::VersionCode => "VERSION_CODE",
            Self::VersionName => "VERSION_NAME",
            Self::MinSdkVersion => "MIN_SDK_VERSION",
            Self::TargetSdkVersion => "TARGET_SDK_VERSION",
            Self::MaxSdkVersion => "MAX_SDK_VERSION",
            Self::Name => "NAME",
            Self::Label => "LABEL",
            Self::SharedUserId => "SHARED_USER_ID",
        }
    }

    pub fn target(&self) -> PropertyTarget {
        let (element, attribute, android) = match self {
            Self::Package => (ElementType::Manifest, "package", false),
            Self::VersionCode => (ElementType::Manifest, "versionCode", true),
            Self::VersionName => (ElementType::Manifest, "versionName", true),
            Self::SharedUserId => (ElementType::Manifest, "sharedUserId", true),
            Self::MinSdkVersion => (ElementType::UsesSdk, "minSdkVersion", true),
            Self::TargetSdkVersion => (ElementType::UsesSdk, "targetSdkVersion", true),
            Self::MaxSdkVersion => (ElementType::UsesSdk, "maxSdkVersion", true),
            Self::Name => (ElementType::Application, "name", true),
            Self::Label => (ElementType::Application, "label", true),
        };
        PropertyTarget {
            element,
            attribute,
            android,
        }
    }
}

impl fmt::Display for ManifestSystemProperty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for ManifestSystemProperty {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|p| p.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| {
                let known: Vec<&str> = Self::ALL.iter().map(|p| p.as_str()).collect();
                format!("unknown property '{}', expected one of {}", s, known.join(", "))
            })
    }
}

pub fn build_configuration_position() -> SourceFilePosition {
    SourceFilePosition::new(SourceFile::named(BUILD_CONFIGURATION), SourcePosition::unknown())
}

/// Inject every property, creating `uses-sdk` or `application` when needed.
///
/// Injection always overrides a merged value and is recorded INJECTED.
pub fn inject_properties(
    doc: &mut XmlDocument,
    properties: &IndexMap<ManifestSystemProperty, String>,
    recorder: &mut ActionRecorder,
) {
    for (property, value) in properties {
        let target = property.target();
        let element = target_element(doc, target.element, recorder);
        let name = if target.android {
            let prefix = doc.ensure_namespace("android", ANDROID_URI);
            XmlName::namespaced(ANDROID_URI, prefix, target.attribute)
        } else {
            XmlName::simple(target.attribute)
        };
        let position = build_configuration_position();
        doc.set_attribute(
            element,
            XmlAttribute::new(name.clone(), value.clone(), position.clone()),
        );
        recorder.record_attribute(
            &node_key(doc, element),
            &name,
            ActionType::Injected,
            position,
            None,
            Some(format!("{} from build configuration", property)),
        );
    }
}

fn target_element(
    doc: &mut XmlDocument,
    element: ElementType,
    recorder: &mut ActionRecorder,
) -> NodeId {
    let root = doc.root();
    if element == ElementType::Manifest {
        return root;
    }
    if let Some(existing) = doc
        .child_elements(root)
        .into_iter()
        .find(|child| element_type(doc, *child) == element)
    {
        return existing;
    }
    let position = build_configuration_position();
    let name = XmlName::simple(element.tag());
    let created = match element {
        // uses-sdk goes first so that it precedes <application>
        ElementType::UsesSdk => doc.insert_element(root, 0, name, Vec::new(), position.clone()),
        _ => doc.append_element(root, name, Vec::new(), position.clone()),
    };
    recorder.record_node(
        &node_key(doc, created),
        ActionType::Injected,
        position,
        NodeOperationType::Merge,
        Some("created for build configuration".to_string()),
    );
    created
}
