//! Qualified XML names

use serde::{Deserialize, Serialize};
use std::fmt;
use std::hash::{Hash, Hasher};

/// Android resource namespace
pub const ANDROID_URI: &str = "http://schemas.android.com/apk/res/android";

/// Merge instruction namespace
pub const TOOLS_URI: &str = "http://schemas.android.com/tools";

/// Namespace implicitly bound to the `xml` prefix
pub const XML_URI: &str = "http://www.w3.org/XML/1998/namespace";

/// A possibly namespaced element or attribute name.
///
/// The two variants have distinct wire shapes:
///
/// ```json
/// { "name": "package" }
/// { "namespace_uri": "http://schemas.android.com/apk/res/android", "prefix": "android", "local_name": "label" }
/// ```
///
/// Namespaced names compare by namespace URI and local name only; the prefix
/// is presentation.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum XmlName {
    Namespaced {
        namespace_uri: String,
        prefix: String,
        local_name: String,
    },
    Simple {
        name: String,
    },
}

impl XmlName {
    /// Create a name without namespace
    pub fn simple(name: impl Into<String>) -> Self {
        Self::Simple { name: name.into() }
    }

    /// Create a namespaced name
    pub fn namespaced(
        namespace_uri: impl Into<String>,
        prefix: impl Into<String>,
        local_name: impl Into<String>,
    ) -> Self {
        Self::Namespaced {
            namespace_uri: namespace_uri.into(),
            prefix: prefix.into(),
            local_name: local_name.into(),
        }
    }

    /// Shorthand for a name in the Android namespace
    pub fn android(local_name: impl Into<String>) -> Self {
        Self::namespaced(ANDROID_URI, "android", local_name)
    }

    /// Shorthand for a name in the tools namespace
    pub fn tools(local_name: impl Into<String>) -> Self {
        Self::namespaced(TOOLS_URI, "tools", local_name)
    }

    pub fn local_name(&self) -> &str {
        match self {
            Self::Namespaced { local_name, .. } => local_name,
            Self::Simple { name } => name,
        }
    }

    pub fn namespace_uri(&self) -> Option<&str> {
        match self {
            Self::Namespaced { namespace_uri, .. } => Some(namespace_uri),
            Self::Simple { .. } => None,
        }
    }

    pub fn prefix(&self) -> Option<&str> {
        match self {
            Self::Namespaced { prefix, .. } => Some(prefix),
            Self::Simple { .. } => None,
        }
    }

    /// True if this name lives in the given namespace
    pub fn is_in(&self, uri: &str) -> bool {
        self.namespace_uri() == Some(uri)
    }

    /// True for `xmlns` and `xmlns:prefix` declarations
    pub fn is_namespace_declaration(&self) -> bool {
        match self {
            Self::Simple { name } => name == "xmlns" || name.starts_with("xmlns:"),
            Self::Namespaced { .. } => false,
        }
    }

    /// Return a copy bound to a different prefix
    pub fn with_prefix(&self, new_prefix: &str) -> Self {
        match self {
            Self::Namespaced {
                namespace_uri,
                local_name,
                ..
            } => Self::namespaced(namespace_uri.clone(), new_prefix, local_name.clone()),
            Self::Simple { .. } => self.clone(),
        }
    }

    /// Name as written in a document (`prefix:local` or `name`)
    pub fn qualified(&self) -> String {
        match self {
            Self::Namespaced {
                prefix, local_name, ..
            } if !prefix.is_empty() => format!("{}:{}", prefix, local_name),
            Self::Namespaced { local_name, .. } => local_name.clone(),
            Self::Simple { name } => name.clone(),
        }
    }
}

impl PartialEq for XmlName {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (
                Self::Namespaced {
                    namespace_uri: a_uri,
                    local_name: a_local,
                    ..
                },
                Self::Namespaced {
                    namespace_uri: b_uri,
                    local_name: b_local,
                    ..
                },
            ) => a_uri == b_uri && a_local == b_local,
            (Self::Simple { name: a }, Self::Simple { name: b }) => a == b,
            _ => false,
        }
    }
}

impl Eq for XmlName {}

impl Hash for XmlName {
    fn hash<H: Hasher>(&self, state: &mut H) {
        match self {
            Self::Namespaced {
                namespace_uri,
                local_name,
                ..
            } => {
                0u8.hash(state);
                namespace_uri.hash(state);
                local_name.hash(state);
            }
            Self::Simple { name } => {
                1u8.hash(state);
                name.hash(state);
            }
        }
    }
}

impl fmt::Display for XmlName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.qualified())
    }
}
