//! Decision trail for manifest merging
//!
//! Every decision the merger takes (an element added, an attribute rejected,
//! a value injected from build configuration) is appended to an
//! [`ActionRecorder`]. Once the merge completes the recorder is frozen into an
//! immutable [`Actions`] value that can be queried per element and persisted.

mod actions;
mod error;
mod key;
mod record;

pub use actions::{
    ActionRecorder, Actions, DecisionTreeRecord, ACTIONS_SCHEMA_ID, ACTIONS_SCHEMA_VERSION,
};
pub use error::ActionsError;
pub use key::NodeKey;
pub use record::{
    ActionRecord, ActionType, AttributeOperationType, AttributeRecord, NodeOperationType,
    NodeRecord, RecordBase, UnknownOperation,
};
