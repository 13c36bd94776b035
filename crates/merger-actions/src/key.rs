//! Element identity keys

use serde::{Deserialize, Serialize};
use std::fmt;

/// Identity of a logical element across merge sources.
///
/// Formatted as `type#discriminator` (`activity#com.example.Main`), or the
/// bare type name for elements that may appear only once (`application`).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NodeKey(String);

impl NodeKey {
    /// Key for an element type that allows a single instance
    pub fn single(element_type: &str) -> Self {
        Self(element_type.to_string())
    }

    pub fn keyed(element_type: &str, discriminator: &str) -> Self {
        Self(format!("{}#{}", element_type, discriminator))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The element type part of the key
    pub fn element_type(&self) -> &str {
        self.0.split_once('#').map(|(t, _)| t).unwrap_or(&self.0)
    }

    /// The discriminator part of the key, if any
    pub fn discriminator(&self) -> Option<&str> {
        self.0.split_once('#').map(|(_, d)| d)
    }
}

impl fmt::Display for NodeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for NodeKey {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}
