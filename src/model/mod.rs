//! Element identity and merge instructions

mod element_type;
pub mod instructions;
mod key;
mod package;
mod policy;

pub use element_type::{ElementType, KeySpec};
pub use key::{
    child_key, element_type, is_android, local_key, mergeable_elements, node_key, LocalKey,
};
pub use package::{document_package, expand_class_name, expand_class_names};
pub use policy::{
    attribute_policy, combine, AttributePolicy, BOOLEAN_OR_REASON, EXPLICIT_REMOVAL_REASON,
    MAIN_WINS_REASON, MAX_VERSION_REASON, OVERRIDDEN_REASON, REPLACED_REASON, STRICT_REASON,
};
