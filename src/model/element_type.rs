//! Manifest element classification

use merger_xml::XmlName;
use std::fmt;

/// Every element kind the merger knows how to key and merge.
///
/// Anything else, including every element in a foreign namespace, is
/// [`ElementType::Custom`]: preserved verbatim and keyed by its content.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ElementType {
    Manifest,
    Application,
    Activity,
    ActivityAlias,
    Service,
    Receiver,
    Provider,
    IntentFilter,
    Action,
    Category,
    Data,
    MetaData,
    UsesPermission,
    UsesPermissionSdk23,
    Permission,
    PermissionGroup,
    PermissionTree,
    UsesSdk,
    UsesFeature,
    UsesLibrary,
    UsesConfiguration,
    SupportsScreens,
    CompatibleScreens,
    Screen,
    SupportsGlTexture,
    Instrumentation,
    GrantUriPermission,
    PathPermission,
    Queries,
    Package,
    Profileable,
    Custom,
}

/// How the discriminator part of a key is derived
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeySpec {
    /// At most one instance per parent; no discriminator
    Single,
    /// First present `android:` attribute from the list
    FirstOf(&'static [&'static str]),
    /// Every listed `android:` attribute must be present
    AllOf(&'static [&'static str]),
    /// At least one listed `android:` attribute must be present
    AnyOf(&'static [&'static str]),
    /// `android:name`; without one every OpenGL ES requirement shares a key
    Feature,
    /// Every non-tools attribute, as sorted `name=value` pairs
    Attributes,
    /// Sorted keys of the child elements
    Children,
    /// Digest of the canonical content
    Content,
}

const NAME: &[&str] = &["name"];

impl ElementType {
    const KNOWN: [ElementType; 31] = [
        Self::Manifest,
        Self::Application,
        Self::Activity,
        Self::ActivityAlias,
        Self::Service,
        Self::Receiver,
        Self::Provider,
        Self::IntentFilter,
        Self::Action,
        Self::Category,
        Self::Data,
        Self::MetaData,
        Self::UsesPermission,
        Self::UsesPermissionSdk23,
        Self::Permission,
        Self::PermissionGroup,
        Self::PermissionTree,
        Self::UsesSdk,
        Self::UsesFeature,
        Self::UsesLibrary,
        Self::UsesConfiguration,
        Self::SupportsScreens,
        Self::CompatibleScreens,
        Self::Screen,
        Self::SupportsGlTexture,
        Self::Instrumentation,
        Self::GrantUriPermission,
        Self::PathPermission,
        Self::Queries,
        Self::Package,
        Self::Profileable,
    ];

    /// Classify an element by its name
    pub fn from_name(name: &XmlName) -> Self {
        match name {
            XmlName::Simple { name } => Self::KNOWN
                .into_iter()
                .find(|t| t.tag() == name)
                .unwrap_or(Self::Custom),
            XmlName::Namespaced { .. } => Self::Custom,
        }
    }

    /// Tag name as written in a manifest
    pub fn tag(&self) -> &'static str {
        match self {
            Self::Manifest => "manifest",
            Self::Application => "application",
            Self::Activity => "activity",
            Self::ActivityAlias => "activity-alias",
            Self::Service => "service",
            Self::Receiver => "receiver",
            Self::Provider => "provider",
            Self::IntentFilter => "intent-filter",
            Self::Action => "action",
            Self::Category => "category",
            Self::Data => "data",
            Self::MetaData => "meta-data",
            Self::UsesPermission => "uses-permission",
            Self::UsesPermissionSdk23 => "uses-permission-sdk-23",
            Self::Permission => "permission",
            Self::PermissionGroup => "permission-group",
            Self::PermissionTree => "permission-tree",
            Self::UsesSdk => "uses-sdk",
            Self::UsesFeature => "uses-feature",
            Self::UsesLibrary => "uses-library",
            Self::UsesConfiguration => "uses-configuration",
            Self::SupportsScreens => "supports-screens",
            Self::CompatibleScreens => "compatible-screens",
            Self::Screen => "screen",
            Self::SupportsGlTexture => "supports-gl-texture",
            Self::Instrumentation => "instrumentation",
            Self::GrantUriPermission => "grant-uri-permission",
            Self::PathPermission => "path-permission",
            Self::Queries => "queries",
            Self::Package => "package",
            Self::Profileable => "profileable",
            Self::Custom => "custom",
        }
    }

    pub fn key_spec(&self) -> KeySpec {
        match self {
            Self::Manifest
            | Self::Application
            | Self::UsesSdk
            | Self::SupportsScreens
            | Self::CompatibleScreens
            | Self::UsesConfiguration
            | Self::Queries
            | Self::Profileable => KeySpec::Single,
            Self::Activity
            | Self::ActivityAlias
            | Self::Service
            | Self::Receiver
            | Self::Action
            | Self::Category
            | Self::MetaData
            | Self::UsesPermission
            | Self::UsesPermissionSdk23
            | Self::Permission
            | Self::PermissionGroup
            | Self::PermissionTree
            | Self::UsesLibrary
            | Self::SupportsGlTexture
            | Self::Instrumentation
            | Self::Package => KeySpec::FirstOf(NAME),
            // providers declared inside <queries> carry only authorities
            Self::Provider => KeySpec::FirstOf(&["name", "authorities"]),
            Self::UsesFeature => KeySpec::Feature,
            Self::Screen => KeySpec::AllOf(&["screenSize", "screenDensity"]),
            Self::GrantUriPermission => KeySpec::AnyOf(&["path", "pathPrefix", "pathPattern"]),
            Self::PathPermission => {
                KeySpec::AnyOf(&["path", "pathPrefix", "pathPattern", "permission"])
            }
            Self::Data => KeySpec::Attributes,
            Self::IntentFilter => KeySpec::Children,
            Self::Custom => KeySpec::Content,
        }
    }

    pub fn is_single_instance(&self) -> bool {
        self.key_spec() == KeySpec::Single
    }

    /// Types whose identical siblings are not reported as duplicates
    pub fn allows_duplicates(&self) -> bool {
        matches!(self, Self::Custom | Self::IntentFilter | Self::Data)
    }

    /// Elements whose children are addressed globally rather than under
    /// their parent's key
    pub fn is_top_level_container(&self) -> bool {
        matches!(self, Self::Manifest | Self::Application)
    }
}

impl fmt::Display for ElementType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.tag())
    }
}
