//! Recorder and frozen actions

use indexmap::IndexMap;
use merger_xml::{SourceFilePosition, XmlName};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

use crate::error::ActionsError;
use crate::key::NodeKey;
use crate::record::{
    ActionRecord, ActionType, AttributeOperationType, AttributeRecord, NodeOperationType,
    NodeRecord, RecordBase,
};

/// Schema version for persisted actions
pub const ACTIONS_SCHEMA_VERSION: u32 = 1;

/// Schema identifier for persisted actions
pub const ACTIONS_SCHEMA_ID: &str = "manifest-merger/actions@1";

/// All decisions recorded for one element
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DecisionTreeRecord {
    node_records: Vec<NodeRecord>,
    attribute_records: IndexMap<XmlName, Vec<AttributeRecord>>,
}

impl DecisionTreeRecord {
    pub fn node_records(&self) -> &[NodeRecord] {
        &self.node_records
    }

    pub fn attribute_records(&self, name: &XmlName) -> &[AttributeRecord] {
        self.attribute_records.get(name).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Attribute names with at least one record, in first-recorded order
    pub fn attribute_names(&self) -> impl Iterator<Item = &XmlName> {
        self.attribute_records.keys()
    }

    fn push_attribute(&mut self, record: AttributeRecord) {
        self.attribute_records
            .entry(record.name.clone())
            .or_default()
            .push(record);
    }
}

/// Append-only recorder used while a merge is in progress
#[derive(Debug, Default)]
pub struct ActionRecorder {
    records: IndexMap<NodeKey, DecisionTreeRecord>,
}

impl ActionRecorder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_node(
        &mut self,
        target: &NodeKey,
        action_type: ActionType,
        position: SourceFilePosition,
        operation: NodeOperationType,
        reason: Option<String>,
    ) {
        let record = NodeRecord {
            base: RecordBase {
                action_type,
                position,
                target: target.clone(),
                reason,
            },
            operation,
        };
        self.records.entry(target.clone()).or_default().node_records.push(record);
    }

    pub fn record_attribute(
        &mut self,
        target: &NodeKey,
        name: &XmlName,
        action_type: ActionType,
        position: SourceFilePosition,
        operation: Option<AttributeOperationType>,
        reason: Option<String>,
    ) {
        let record = AttributeRecord {
            base: RecordBase {
                action_type,
                position,
                target: target.clone(),
                reason,
            },
            name: name.clone(),
            operation,
        };
        self.records.entry(target.clone()).or_default().push_attribute(record);
    }

    /// Freeze the recorded decisions
    pub fn build(self) -> Actions {
        Actions { records: self.records }
    }
}

/// Immutable decision trail of a completed merge
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Actions {
    records: IndexMap<NodeKey, DecisionTreeRecord>,
}

#[derive(Serialize, Deserialize)]
struct PersistedActions {
    schema_version: u32,
    schema_id: String,
    entries: Vec<PersistedEntry>,
}

#[derive(Serialize, Deserialize)]
struct PersistedEntry {
    key: NodeKey,
    records: Vec<ActionRecord>,
}

impl Actions {
    /// Keys with at least one decision, in first-recorded order
    pub fn node_keys(&self) -> Vec<&NodeKey> {
        self.records.keys().collect()
    }

    /// Every decision recorded for one element
    pub fn decision_tree(&self, key: &NodeKey) -> Option<&DecisionTreeRecord> {
        self.records.get(key)
    }

    /// Node decisions for a key; empty when the key is unknown
    pub fn node_records(&self, key: &NodeKey) -> &[NodeRecord] {
        self.decision_tree(key).map(|r| r.node_records()).unwrap_or(&[])
    }

    /// Attribute decisions for a key and attribute; empty when unknown
    pub fn attribute_records(&self, key: &NodeKey, name: &XmlName) -> &[AttributeRecord] {
        self.decision_tree(key)
            .map(|r| r.attribute_records(name))
            .unwrap_or(&[])
    }

    pub fn attribute_names(&self, key: &NodeKey) -> Vec<&XmlName> {
        self.decision_tree(key)
            .map(|r| r.attribute_names().collect())
            .unwrap_or_default()
    }

    /// The record identifying where an element came from.
    ///
    /// The earliest ADDED record wins; elements that never came from a source
    /// file fall back to their earliest INJECTED or IMPLIED record.
    pub fn node_origin(&self, key: &NodeKey) -> Option<&NodeRecord> {
        let records = self.node_records(key);
        records
            .iter()
            .find(|r| r.action_type() == ActionType::Added)
            .or_else(|| records.iter().find(|r| is_synthetic(r.action_type())))
    }

    /// The record identifying where an attribute value came from
    pub fn attribute_origin(&self, key: &NodeKey, name: &XmlName) -> Option<&AttributeRecord> {
        let records = self.attribute_records(key, name);
        records
            .iter()
            .find(|r| r.action_type() == ActionType::Added)
            .or_else(|| records.iter().find(|r| is_synthetic(r.action_type())))
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Serialize to the versioned JSON schema
    pub fn persist(&self) -> Result<String, ActionsError> {
        let persisted = PersistedActions {
            schema_version: ACTIONS_SCHEMA_VERSION,
            schema_id: ACTIONS_SCHEMA_ID.to_string(),
            entries: self
                .records
                .iter()
                .map(|(key, tree)| PersistedEntry {
                    key: key.clone(),
                    records: tree
                        .node_records
                        .iter()
                        .cloned()
                        .map(ActionRecord::Node)
                        .chain(
                            tree.attribute_records
                                .values()
                                .flatten()
                                .cloned()
                                .map(ActionRecord::Attribute),
                        )
                        .collect(),
                })
                .collect(),
        };
        Ok(serde_json::to_string_pretty(&persisted)?)
    }

    /// Load from the versioned JSON schema
    pub fn load(json: &str) -> Result<Self, ActionsError> {
        let persisted: PersistedActions = serde_json::from_str(json)?;
        if persisted.schema_version != ACTIONS_SCHEMA_VERSION
            || persisted.schema_id != ACTIONS_SCHEMA_ID
        {
            return Err(ActionsError::UnsupportedSchema {
                schema_id: persisted.schema_id,
                version: persisted.schema_version,
            });
        }

        let mut records: IndexMap<NodeKey, DecisionTreeRecord> = IndexMap::new();
        for entry in persisted.entries {
            let tree = records.entry(entry.key).or_default();
            for record in entry.records {
                match record {
                    ActionRecord::Node(node) => tree.node_records.push(node),
                    ActionRecord::Attribute(attribute) => tree.push_attribute(attribute),
                }
            }
        }
        Ok(Self { records })
    }

    /// Write to file
    pub fn write_to_file(&self, path: &Path) -> Result<(), ActionsError> {
        let json = self.persist()?;
        fs::write(path, json).map_err(|e| ActionsError::Io(e.to_string()))
    }

    /// Read from file
    pub fn read_from_file(path: &Path) -> Result<Self, ActionsError> {
        let json = fs::read_to_string(path).map_err(|e| ActionsError::Io(e.to_string()))?;
        Self::load(&json)
    }
}

fn is_synthetic(action_type: ActionType) -> bool {
    matches!(action_type, ActionType::Injected | ActionType::Implied)
}

#[cfg(test)]
mod tests {
    use super::*;
    use merger_xml::{SourceFile, SourcePosition};

    fn at(file: &str, line: u32) -> SourceFilePosition {
        SourceFilePosition::new(SourceFile::named(file), SourcePosition::new(line, 5))
    }

    fn sample() -> Actions {
        let activity = NodeKey::keyed("activity", "com.example.Main");
        let label = XmlName::android("label");
        let mut recorder = ActionRecorder::new();

        let merge = NodeOperationType::Merge;

        recorder.record_node(&activity, ActionType::Added, at("main.xml", 7), merge, None);
        let main_label = at("main.xml", 8);
        recorder.record_attribute(&activity, &label, ActionType::Added, main_label, None, None);
        recorder.record_node(&activity, ActionType::Merged, at("lib.xml", 3), merge, None);
        recorder.record_attribute(
            &activity,
            &label,
            ActionType::Rejected,
            at("lib.xml", 4),
            Some(AttributeOperationType::Replace),
            Some("overridden by higher priority declaration".to_string()),
        );
        recorder.record_attribute(
            &activity,
            &XmlName::simple("package"),
            ActionType::Injected,
            SourceFilePosition::new(
                SourceFile::named("build configuration"),
                SourcePosition::unknown(),
            ),
            None,
            None,
        );
        recorder.build()
    }

    #[test]
    fn test_queries() {
        let actions = sample();
        let activity = NodeKey::keyed("activity", "com.example.Main");

        assert_eq!(actions.node_keys(), vec![&activity]);
        assert_eq!(actions.node_records(&activity).len(), 2);
        assert_eq!(actions.attribute_records(&activity, &XmlName::android("label")).len(), 2);
        assert!(actions.node_records(&NodeKey::single("application")).is_empty());
        assert!(actions
            .attribute_records(&activity, &XmlName::android("icon"))
            .is_empty());

        let tree = actions.decision_tree(&activity).unwrap();
        let names: Vec<&XmlName> = tree.attribute_names().collect();
        assert_eq!(names, vec![&XmlName::android("label"), &XmlName::simple("package")]);
        assert!(actions.decision_tree(&NodeKey::single("application")).is_none());
    }

    #[test]
    fn test_origin_prefers_added() {
        let actions = sample();
        let activity = NodeKey::keyed("activity", "com.example.Main");

        let origin = actions.node_origin(&activity).unwrap();
        assert_eq!(origin.position().line(), Some(7));

        let label = actions.attribute_origin(&activity, &XmlName::android("label")).unwrap();
        assert_eq!(label.position().file.to_string(), "main.xml");

        let package = actions.attribute_origin(&activity, &XmlName::simple("package")).unwrap();
        assert_eq!(package.action_type(), ActionType::Injected);
    }

    #[test]
    fn test_persist_round_trip() {
        let actions = sample();
        let json = actions.persist().unwrap();
        let loaded = Actions::load(&json).unwrap();

        for key in actions.node_keys() {
            assert_eq!(actions.node_records(key), loaded.node_records(key));
            for name in actions.attribute_names(key) {
                assert_eq!(
                    actions.attribute_records(key, name),
                    loaded.attribute_records(key, name)
                );
            }
        }
        assert_eq!(actions, loaded);
    }

    #[test]
    fn test_load_rejects_unknown_schema() {
        let json = r#"{"schema_version": 2, "schema_id": "manifest-merger/actions@2", "entries": []}"#;
        let err = Actions::load(json).unwrap_err();
        assert!(matches!(err, ActionsError::UnsupportedSchema { version: 2, .. }));
    }

    #[test]
    fn test_file_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("actions.json");
        let actions = sample();
        actions.write_to_file(&path).unwrap();
        assert_eq!(Actions::read_from_file(&path).unwrap(), actions);
    }
}
