//! Layering of merger configuration
//!
//! Builtin defaults, then the `manifest-merger.toml` file, then the command
//! line. Tables such as `placeholders`, `properties` and `features` merge key
//! by key. Lists (`libraries`, `overlays`) and scalars are replaced whole by
//! the upper layer, because list order sets merge priority.

use serde_json::map::Entry;
use serde_json::Value;

/// Merge `overlay` over `base`.
///
/// - Objects: merged key by key, recursively
/// - Arrays: the overlay list replaces the base list
/// - Scalars and null: the overlay value wins
pub fn deep_merge(base: Value, overlay: Value) -> Value {
    let (mut base_map, overlay_map) = match (base, overlay) {
        (Value::Object(base_map), Value::Object(overlay_map)) => (base_map, overlay_map),
        // a `--libs` list never concatenates onto the file's `libraries`
        (_, overlay) => return overlay,
    };
    for (key, overlay_value) in overlay_map {
        match base_map.entry(key) {
            Entry::Occupied(mut slot) => {
                let base_value = slot.get_mut().take();
                slot.insert(deep_merge(base_value, overlay_value));
            }
            Entry::Vacant(slot) => {
                slot.insert(overlay_value);
            }
        }
    }
    Value::Object(base_map)
}

/// Merge layers lowest precedence first. No layers yields an empty table.
pub fn merge_layers(layers: Vec<Value>) -> Value {
    let mut layers = layers.into_iter();
    let Some(first) = layers.next() else {
        return Value::Object(serde_json::Map::new());
    };
    layers.fold(first, deep_merge)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_scalar_override() {
        let base = json!({"merge_type": "application"});
        let overlay = json!({"merge_type": "library"});
        let result = deep_merge(base, overlay);
        assert_eq!(result["merge_type"], "library");
    }

    #[test]
    fn test_object_deep_merge() {
        let base = json!({
            "features": {
                "keep_stages": false,
                "instant_run": false
            }
        });
        let overlay = json!({
            "features": {
                "keep_stages": true
            }
        });
        let result = deep_merge(base, overlay);

        assert_eq!(result["features"]["keep_stages"], true);
        assert_eq!(result["features"]["instant_run"], false);
    }

    #[test]
    fn test_array_replace() {
        let base = json!({
            "libraries": ["a.xml", "b.xml", "c.xml"]
        });
        let overlay = json!({
            "libraries": ["x.xml", "y.xml"]
        });
        let result = deep_merge(base, overlay);

        // library order is significant, so lists never concatenate
        let libraries = result["libraries"].as_array().unwrap();
        assert_eq!(libraries.len(), 2);
        assert_eq!(libraries[0], "x.xml");
        assert_eq!(libraries[1], "y.xml");
    }

    #[test]
    fn test_add_new_key() {
        let base = json!({"a": 1});
        let overlay = json!({"b": 2});
        let result = deep_merge(base, overlay);

        assert_eq!(result["a"], 1);
        assert_eq!(result["b"], 2);
    }

    #[test]
    fn test_null_override() {
        let base = json!({"main": "AndroidManifest.xml"});
        let overlay = json!({"main": null});
        let result = deep_merge(base, overlay);

        assert!(result["main"].is_null());
    }

    #[test]
    fn test_merge_layers() {
        let builtin = json!({
            "log": "info",
            "placeholders": {}
        });
        let file = json!({
            "log": "verbose",
            "placeholders": {"applicationId": "com.foo"}
        });
        let cli = json!({
            "log": "error"
        });

        let result = merge_layers(vec![builtin, file, cli]);

        // CLI wins for log
        assert_eq!(result["log"], "error");
        // file wins for placeholders
        assert_eq!(result["placeholders"]["applicationId"], "com.foo");
    }

    #[test]
    fn test_merge_no_layers() {
        assert_eq!(merge_layers(Vec::new()), json!({}));
    }

    #[test]
    fn test_cli_libraries_replace_file_libraries() {
        let file = json!({"libraries": ["lib_a.xml", "lib_b.xml"], "log": "info"});
        let cli = json!({"libraries": ["lib_b.xml"]});
        let result = merge_layers(vec![json!({"libraries": []}), file, cli]);

        assert_eq!(result["libraries"], json!(["lib_b.xml"]));
        assert_eq!(result["log"], "info");
    }

    #[test]
    fn test_nested_deep_merge() {
        let base = json!({
            "properties": {
                "MIN_SDK_VERSION": "21",
                "VERSION_CODE": "1"
            }
        });
        let overlay = json!({
            "properties": {
                "VERSION_CODE": "7",
                "VERSION_NAME": "1.7"
            }
        });
        let result = deep_merge(base, overlay);

        assert_eq!(result["properties"]["MIN_SDK_VERSION"], "21");
        assert_eq!(result["properties"]["VERSION_CODE"], "7");
        assert_eq!(result["properties"]["VERSION_NAME"], "1.7");
    }
}
