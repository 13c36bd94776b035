//! Action records
//!
//! A record is either a node decision or an attribute decision. Both share a
//! [`RecordBase`] payload; the variant adds the resolved operation type.

use merger_xml::{SourceFilePosition, XmlName};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::key::NodeKey;

/// What happened to an element or attribute
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ActionType {
    /// First contribution of the element or attribute to the merged tree
    Added,
    /// Value set from build configuration or a placeholder
    Injected,
    /// A lower priority declaration folded into an existing one
    Merged,
    /// A lower priority declaration that was dropped
    Rejected,
    /// Added because of an implicit policy default
    Implied,
}

impl fmt::Display for ActionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Added => write!(f, "ADDED"),
            Self::Injected => write!(f, "INJECTED"),
            Self::Merged => write!(f, "MERGED"),
            Self::Rejected => write!(f, "REJECTED"),
            Self::Implied => write!(f, "IMPLIED"),
        }
    }
}

/// Error for an unrecognised `tools:` operation value
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown operation '{0}'")]
pub struct UnknownOperation(pub String);

/// Node level merge policy (`tools:node`)
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum NodeOperationType {
    /// Union of attributes and children
    #[default]
    Merge,
    /// Merge attributes, ignore lower priority children
    MergeOnlyAttributes,
    /// Fully displace lower priority declarations
    Replace,
    /// Drop lower priority declarations with the same key
    Remove,
    /// Drop every lower priority declaration of the same type
    RemoveAll,
    /// Merge attributes, drop every lower priority child
    RemoveChildren,
    /// Lower priority declarations must be identical
    Strict,
}

impl NodeOperationType {
    pub const ALL: [NodeOperationType; 7] = [
        Self::Merge,
        Self::MergeOnlyAttributes,
        Self::Replace,
        Self::Remove,
        Self::RemoveAll,
        Self::RemoveChildren,
        Self::Strict,
    ];

    /// Spelling used in `tools:node`
    pub fn xml_name(&self) -> &'static str {
        match self {
            Self::Merge => "merge",
            Self::MergeOnlyAttributes => "merge-only-attributes",
            Self::Replace => "replace",
            Self::Remove => "remove",
            Self::RemoveAll => "removeAll",
            Self::RemoveChildren => "removeChildren",
            Self::Strict => "strict",
        }
    }

    /// True for operations that take the element out of the merged output
    pub fn is_removal(&self) -> bool {
        matches!(self, Self::Remove | Self::RemoveAll)
    }
}

impl FromStr for NodeOperationType {
    type Err = UnknownOperation;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|op| op.xml_name() == s)
            .ok_or_else(|| UnknownOperation(s.to_string()))
    }
}

impl fmt::Display for NodeOperationType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.xml_name())
    }
}

/// Attribute level merge policy (`tools:strict`, `tools:replace`, `tools:remove`)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AttributeOperationType {
    Strict,
    Replace,
    Remove,
}

impl AttributeOperationType {
    pub const ALL: [AttributeOperationType; 3] = [Self::Strict, Self::Replace, Self::Remove];

    /// Local name of the tools attribute carrying this policy
    pub fn xml_name(&self) -> &'static str {
        match self {
            Self::Strict => "strict",
            Self::Replace => "replace",
            Self::Remove => "remove",
        }
    }
}

impl FromStr for AttributeOperationType {
    type Err = UnknownOperation;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|op| op.xml_name() == s)
            .ok_or_else(|| UnknownOperation(s.to_string()))
    }
}

impl fmt::Display for AttributeOperationType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.xml_name())
    }
}

/// Payload shared by node and attribute records
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecordBase {
    pub action_type: ActionType,
    pub position: SourceFilePosition,
    pub target: NodeKey,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeRecord {
    pub base: RecordBase,
    pub operation: NodeOperationType,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttributeRecord {
    pub base: RecordBase,
    pub name: XmlName,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub operation: Option<AttributeOperationType>,
}

/// A single merge decision
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ActionRecord {
    Node(NodeRecord),
    Attribute(AttributeRecord),
}

impl ActionRecord {
    pub fn base(&self) -> &RecordBase {
        match self {
            Self::Node(record) => &record.base,
            Self::Attribute(record) => &record.base,
        }
    }

    pub fn action_type(&self) -> ActionType {
        self.base().action_type
    }

    pub fn target(&self) -> &NodeKey {
        &self.base().target
    }
}

impl NodeRecord {
    pub fn action_type(&self) -> ActionType {
        self.base.action_type
    }

    pub fn position(&self) -> &SourceFilePosition {
        &self.base.position
    }

    pub fn reason(&self) -> Option<&str> {
        self.base.reason.as_deref()
    }
}

impl AttributeRecord {
    pub fn action_type(&self) -> ActionType {
        self.base.action_type
    }

    pub fn position(&self) -> &SourceFilePosition {
        &self.base.position
    }

    pub fn reason(&self) -> Option<&str> {
        self.base.reason.as_deref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_node_operation_names() {
        assert_eq!("removeAll".parse::<NodeOperationType>(), Ok(NodeOperationType::RemoveAll));
        assert_eq!(
            "merge-only-attributes".parse::<NodeOperationType>(),
            Ok(NodeOperationType::MergeOnlyAttributes)
        );
        assert_eq!(
            "bogus".parse::<NodeOperationType>(),
            Err(UnknownOperation("bogus".to_string()))
        );
        for op in NodeOperationType::ALL {
            assert_eq!(op.xml_name().parse::<NodeOperationType>(), Ok(op));
        }
    }

    #[test]
    fn test_attribute_operation_names() {
        assert_eq!(
            "replace".parse::<AttributeOperationType>(),
            Ok(AttributeOperationType::Replace)
        );
        assert!("node".parse::<AttributeOperationType>().is_err());
    }

    #[test]
    fn test_record_is_tagged() {
        let record = ActionRecord::Node(NodeRecord {
            base: RecordBase {
                action_type: ActionType::Added,
                position: SourceFilePosition::unknown(),
                target: NodeKey::single("application"),
                reason: None,
            },
            operation: NodeOperationType::Merge,
        });
        let json = serde_json::to_value(&record).unwrap();
        assert_eq!(json["kind"], "node");
        assert_eq!(json["base"]["action_type"], "ADDED");
        assert_eq!(json["operation"], "MERGE");
        assert!(json["base"].get("reason").is_none());
    }
}
