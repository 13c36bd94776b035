//! Built-in merge defaults (layer 1)
//!
//! Hardcoded defaults for all configuration values.

use serde::{Deserialize, Serialize};

/// Built-in default configuration values
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BuiltinDefaults {
    /// Merge type (default: "application")
    pub merge_type: String,

    /// Minimum log level (default: "info")
    pub log: String,

    /// Encode unresolved placeholders (default: false)
    pub encode_placeholders: bool,

    /// Keep intermediate stages (default: false)
    pub keep_stages: bool,

    /// Render the incremental deployment variant (default: false)
    pub instant_run: bool,
}

impl Default for BuiltinDefaults {
    fn default() -> Self {
        Self {
            merge_type: "application".to_string(),
            log: "info".to_string(),
            encode_placeholders: false,
            keep_stages: false,
            instant_run: false,
        }
    }
}

impl BuiltinDefaults {
    /// Convert to JSON Value for merging
    pub fn to_value(&self) -> serde_json::Value {
        serde_json::json!({
            "merge_type": self.merge_type,
            "log": self.log,
            "libraries": [],
            "overlays": [],
            "features": {
                "encode_placeholders": self.encode_placeholders,
                "keep_stages": self.keep_stages,
                "instant_run": self.instant_run
            },
            "placeholders": {},
            "properties": {}
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let defaults = BuiltinDefaults::default();
        assert_eq!(defaults.merge_type, "application");
        assert_eq!(defaults.log, "info");
        assert!(!defaults.encode_placeholders);
        assert!(!defaults.instant_run);
    }

    #[test]
    fn test_to_value() {
        let value = BuiltinDefaults::default().to_value();

        assert_eq!(value["merge_type"], "application");
        assert_eq!(value["features"]["keep_stages"], false);
        assert!(value["libraries"].as_array().unwrap().is_empty());
        assert!(value["properties"].as_object().unwrap().is_empty());
    }
}
