//! Effective configuration with full provenance
//!
//! The effective_config captures the merged configuration plus
//! information about where each value came from.

use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sha2::{Digest, Sha256};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use super::defaults::BuiltinDefaults;
use super::merge::merge_layers;
use crate::inject::ManifestSystemProperty;
use crate::logging::LogLevel;
use crate::merge::{MergeFeatures, MergeType};

/// Schema version for effective_config
pub const SCHEMA_VERSION: u32 = 1;

/// Schema identifier
pub const SCHEMA_ID: &str = "manifest-merger/effective_config@1";

/// Configuration file looked up in the working directory
pub const DEFAULT_CONFIG_FILE: &str = "manifest-merger.toml";

/// Origin of a configuration source
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "lowercase")]
pub enum ConfigOrigin {
    Builtin,
    File,
    Cli,
}

/// A contributing config source with provenance
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfigSource {
    /// Origin of this source
    pub origin: ConfigOrigin,

    /// File path (None for builtin/cli)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,

    /// SHA-256 digest of raw file bytes (None for builtin/cli)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub digest: Option<String>,
}

/// Effective configuration with full provenance
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EffectiveConfig {
    /// Schema version
    pub schema_version: u32,

    /// Schema identifier
    pub schema_id: String,

    /// When this config was computed
    pub created_at: DateTime<Utc>,

    /// The merged configuration object
    pub config: Value,

    /// Contributing sources in precedence order
    pub sources: Vec<ConfigSource>,
}

impl EffectiveConfig {
    /// Build effective config from layers
    pub fn build(
        config_path: Option<&Path>,
        cli_overrides: Option<Value>,
    ) -> Result<Self, ConfigError> {
        let mut layers = Vec::new();
        let mut sources = Vec::new();

        // Layer 1: Built-in defaults
        let defaults = BuiltinDefaults::default();
        layers.push(defaults.to_value());
        sources.push(ConfigSource {
            origin: ConfigOrigin::Builtin,
            path: None,
            digest: None,
        });

        // Layer 2: Config file
        if let Some(path) = config_path {
            if path.exists() {
                let (value, digest) = Self::load_toml_file(path)?;
                layers.push(value);
                sources.push(ConfigSource {
                    origin: ConfigOrigin::File,
                    path: Some(path.to_string_lossy().to_string()),
                    digest: Some(digest),
                });
            }
        }

        // Layer 3: CLI overrides
        if let Some(cli) = cli_overrides {
            layers.push(cli);
            sources.push(ConfigSource {
                origin: ConfigOrigin::Cli,
                path: None,
                digest: None,
            });
        }

        let merged = merge_layers(layers);
        Self::validate_config(&merged)?;

        Ok(Self {
            schema_version: SCHEMA_VERSION,
            schema_id: SCHEMA_ID.to_string(),
            created_at: Utc::now(),
            config: merged,
            sources,
        })
    }

    /// Load and parse a TOML file, returning the value and digest
    fn load_toml_file(path: &Path) -> Result<(Value, String), ConfigError> {
        let bytes = fs::read(path).map_err(|e| ConfigError::IoError(e.to_string()))?;

        // Compute digest
        let mut hasher = Sha256::new();
        hasher.update(&bytes);
        let digest = hex::encode(hasher.finalize());

        let contents = String::from_utf8(bytes)
            .map_err(|e| ConfigError::ParseError(format!("Invalid UTF-8: {}", e)))?;

        let toml_value: toml::Value = toml::from_str(&contents)
            .map_err(|e| ConfigError::ParseError(format!("TOML parse error: {}", e)))?;

        Ok((Self::toml_to_json(toml_value), digest))
    }

    /// Convert TOML Value to JSON Value
    fn toml_to_json(toml: toml::Value) -> Value {
        match toml {
            toml::Value::String(s) => Value::String(s),
            toml::Value::Integer(i) => Value::Number(i.into()),
            toml::Value::Float(f) => serde_json::Number::from_f64(f)
                .map(Value::Number)
                .unwrap_or(Value::Null),
            toml::Value::Boolean(b) => Value::Bool(b),
            toml::Value::Datetime(dt) => Value::String(dt.to_string()),
            toml::Value::Array(arr) => {
                Value::Array(arr.into_iter().map(Self::toml_to_json).collect())
            }
            toml::Value::Table(table) => {
                let map: serde_json::Map<String, Value> = table
                    .into_iter()
                    .map(|(k, v)| (k, Self::toml_to_json(v)))
                    .collect();
                Value::Object(map)
            }
        }
    }

    /// Validate configuration values
    fn validate_config(config: &Value) -> Result<(), ConfigError> {
        if let Some(merge_type) = config.get("merge_type") {
            let valid = merge_type.as_str().is_some_and(|s| s.parse::<MergeType>().is_ok());
            if !valid {
                return Err(ConfigError::ValidationError(format!(
                    "merge_type must be \"application\" or \"library\", got {}",
                    merge_type
                )));
            }
        }

        if let Some(log) = config.get("log") {
            let valid = log.as_str().is_some_and(|s| s.parse::<LogLevel>().is_ok());
            if !valid {
                return Err(ConfigError::ValidationError(format!(
                    "log must be one of verbose, info, warning, error, got {}",
                    log
                )));
            }
        }

        if let Some(properties) = config.get("properties").and_then(Value::as_object) {
            for (name, value) in properties {
                name.parse::<ManifestSystemProperty>()
                    .map_err(|e| ConfigError::ValidationError(format!("properties: {}", e)))?;
                if scalar_string(value).is_none() {
                    return Err(ConfigError::ValidationError(format!(
                        "properties.{} must be a string or number",
                        name
                    )));
                }
            }
        }

        if let Some(placeholders) = config.get("placeholders").and_then(Value::as_object) {
            for (name, value) in placeholders {
                if scalar_string(value).is_none() {
                    return Err(ConfigError::ValidationError(format!(
                        "placeholders.{} must be a string, number or boolean",
                        name
                    )));
                }
            }
        }

        for list in ["libraries", "overlays"] {
            if let Some(value) = config.get(list) {
                let valid = value
                    .as_array()
                    .is_some_and(|items| items.iter().all(Value::is_string));
                if !valid {
                    return Err(ConfigError::ValidationError(format!(
                        "{} must be a list of paths",
                        list
                    )));
                }
            }
        }

        Ok(())
    }

    /// Serialize to JSON
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    /// Write to file
    pub fn write_to_file(&self, path: &Path) -> io::Result<()> {
        let json = self.to_json().map_err(|e| {
            io::Error::new(
                io::ErrorKind::InvalidData,
                format!("JSON serialization failed: {}", e),
            )
        })?;
        fs::write(path, json)
    }

    /// Get a config value by path (dot-separated)
    pub fn get(&self, path: &str) -> Option<&Value> {
        let mut current = &self.config;
        for part in path.split('.') {
            current = current.get(part)?;
        }
        Some(current)
    }

    /// Get a config value as string
    pub fn get_str(&self, path: &str) -> Option<&str> {
        self.get(path).and_then(|v| v.as_str())
    }

    /// Get a config value as bool
    pub fn get_bool(&self, path: &str) -> Option<bool> {
        self.get(path).and_then(|v| v.as_bool())
    }

    pub fn merge_type(&self) -> MergeType {
        self.get_str("merge_type")
            .and_then(|s| s.parse().ok())
            .unwrap_or_default()
    }

    pub fn log_level(&self) -> LogLevel {
        self.get_str("log")
            .and_then(|s| s.parse().ok())
            .unwrap_or(LogLevel::Info)
    }

    pub fn features(&self) -> MergeFeatures {
        MergeFeatures {
            encode_placeholders: self.get_bool("features.encode_placeholders").unwrap_or(false),
            keep_stages: self.get_bool("features.keep_stages").unwrap_or(false),
            instant_run: self.get_bool("features.instant_run").unwrap_or(false),
        }
    }

    pub fn main(&self) -> Option<PathBuf> {
        self.get_str("main").map(PathBuf::from)
    }

    pub fn libraries(&self) -> Vec<PathBuf> {
        self.paths("libraries")
    }

    pub fn overlays(&self) -> Vec<PathBuf> {
        self.paths("overlays")
    }

    fn paths(&self, key: &str) -> Vec<PathBuf> {
        self.get(key)
            .and_then(Value::as_array)
            .map(|items| items.iter().filter_map(Value::as_str).map(PathBuf::from).collect())
            .unwrap_or_default()
    }

    /// Placeholder values; numbers and booleans are taken as written
    pub fn placeholders(&self) -> IndexMap<String, String> {
        self.get("placeholders")
            .and_then(Value::as_object)
            .map(|map| {
                map.iter()
                    .filter_map(|(name, value)| scalar_string(value).map(|v| (name.clone(), v)))
                    .collect()
            })
            .unwrap_or_default()
    }

    /// System properties in the order they were configured
    pub fn properties(&self) -> IndexMap<ManifestSystemProperty, String> {
        self.get("properties")
            .and_then(Value::as_object)
            .map(|map| {
                map.iter()
                    .filter_map(|(name, value)| {
                        let property = name.parse().ok()?;
                        Some((property, scalar_string(value)?))
                    })
                    .collect()
            })
            .unwrap_or_default()
    }
}

fn scalar_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    IoError(String),

    #[error("Parse error: {0}")]
    ParseError(String),

    #[error("Validation error: {0}")]
    ValidationError(String),
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_build_with_defaults_only() {
        let config = EffectiveConfig::build(None, None).unwrap();

        assert_eq!(config.schema_version, SCHEMA_VERSION);
        assert_eq!(config.merge_type(), MergeType::Application);
        assert_eq!(config.log_level(), LogLevel::Info);
        assert_eq!(config.features(), MergeFeatures::default());
        assert!(config.main().is_none());
    }

    #[test]
    fn test_build_with_cli_override() {
        let cli = serde_json::json!({
            "merge_type": "library",
            "features": {"encode_placeholders": true}
        });

        let config = EffectiveConfig::build(None, Some(cli)).unwrap();

        assert_eq!(config.merge_type(), MergeType::Library);
        assert!(config.features().encode_placeholders);
        assert!(!config.features().keep_stages);
    }

    #[test]
    fn test_validation_merge_type() {
        let cli = serde_json::json!({"merge_type": "bundle"});

        let result = EffectiveConfig::build(None, Some(cli));
        assert!(result.is_err());
        assert!(result.unwrap_err().to_string().contains("merge_type"));
    }

    #[test]
    fn test_validation_log_level() {
        let cli = serde_json::json!({"log": "loud"});

        let result = EffectiveConfig::build(None, Some(cli));
        assert!(result.unwrap_err().to_string().contains("log"));
    }

    #[test]
    fn test_validation_property_name() {
        let cli = serde_json::json!({"properties": {"COLOR": "blue"}});

        let result = EffectiveConfig::build(None, Some(cli));
        assert!(result.unwrap_err().to_string().contains("COLOR"));
    }

    #[test]
    fn test_load_toml_file() {
        let mut temp = NamedTempFile::new().unwrap();
        writeln!(temp, "main = \"app/AndroidManifest.xml\"").unwrap();
        writeln!(temp, "libraries = [\"lib1.xml\", \"lib2.xml\"]").unwrap();
        writeln!(temp, "[properties]").unwrap();
        writeln!(temp, "MIN_SDK_VERSION = 21").unwrap();
        writeln!(temp, "[placeholders]").unwrap();
        writeln!(temp, "label = \"Foo\"").unwrap();

        let config = EffectiveConfig::build(Some(temp.path()), None).unwrap();

        assert_eq!(config.main(), Some(PathBuf::from("app/AndroidManifest.xml")));
        assert_eq!(config.libraries().len(), 2);
        assert_eq!(
            config.properties().get(&ManifestSystemProperty::MinSdkVersion).map(String::as_str),
            Some("21")
        );
        assert_eq!(config.placeholders().get("label").map(String::as_str), Some("Foo"));
        assert_eq!(config.sources[1].origin, ConfigOrigin::File);
        assert_eq!(config.sources[1].digest.as_ref().map(String::len), Some(64));
    }

    #[test]
    fn test_cli_replaces_file_lists() {
        let mut temp = NamedTempFile::new().unwrap();
        writeln!(temp, "libraries = [\"lib1.xml\", \"lib2.xml\"]").unwrap();
        let cli = serde_json::json!({"libraries": ["other.xml"]});

        let config = EffectiveConfig::build(Some(temp.path()), Some(cli)).unwrap();

        assert_eq!(config.libraries(), vec![PathBuf::from("other.xml")]);
        assert_eq!(config.sources.len(), 3);
    }

    #[test]
    fn test_sources_tracked() {
        let config = EffectiveConfig::build(None, None).unwrap();

        assert_eq!(config.sources.len(), 1);
        assert_eq!(config.sources[0].origin, ConfigOrigin::Builtin);
    }
}
