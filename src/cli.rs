//! Command line argument handling
//!
//! Flags are validated here and turned into the CLI layer of the effective
//! configuration, so the config file and the command line share one
//! validation path.

use serde_json::{Map, Value};
use std::path::PathBuf;

use crate::inject::ManifestSystemProperty;
use crate::logging::LogLevel;
use crate::merge::MergeType;

/// Problems with the command line itself
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum UsageError {
    #[error("missing required --main <path>")]
    MissingMain,

    #[error("malformed {kind} '{value}', expected NAME=VALUE")]
    MalformedPair { kind: &'static str, value: String },

    #[error("invalid --property '{value}': {reason}")]
    UnknownProperty { value: String, reason: String },

    #[error("invalid --log value '{0}', expected VERBOSE, INFO, WARNING or ERROR")]
    InvalidLogLevel(String),

    #[error("invalid --merge-type: {0}")]
    InvalidMergeType(String),
}

/// Split `NAME=VALUE`; the value may itself contain `=`
pub fn parse_key_value(kind: &'static str, value: &str) -> Result<(String, String), UsageError> {
    match value.split_once('=') {
        Some((name, v)) if !name.trim().is_empty() => Ok((name.trim().to_string(), v.to_string())),
        _ => Err(UsageError::MalformedPair {
            kind,
            value: value.to_string(),
        }),
    }
}

pub fn parse_property(value: &str) -> Result<(ManifestSystemProperty, String), UsageError> {
    let (name, v) = parse_key_value("property", value)?;
    let property = name
        .parse::<ManifestSystemProperty>()
        .map_err(|reason| UsageError::UnknownProperty {
            value: value.to_string(),
            reason,
        })?;
    Ok((property, v))
}

/// Split a list joined with the platform path separator
pub fn split_path_list(value: &str) -> Vec<PathBuf> {
    std::env::split_paths(value)
        .filter(|p| !p.as_os_str().is_empty())
        .collect()
}

/// Values given on the command line
#[derive(Debug, Clone, Default)]
pub struct CliOverrides {
    pub main: Option<PathBuf>,
    pub libraries: Option<String>,
    pub overlays: Option<String>,
    pub properties: Vec<String>,
    pub placeholders: Vec<String>,
    pub merge_type: Option<String>,
    pub log: Option<String>,
    pub encode_placeholders: bool,
    pub keep_stages: bool,
    pub instant_run: bool,
}

impl CliOverrides {
    /// The CLI configuration layer.
    ///
    /// Feature flags only appear when set, so an absent flag never turns off
    /// a feature enabled by the config file.
    pub fn to_value(&self) -> Result<Value, UsageError> {
        let mut layer = Map::new();

        if let Some(main) = &self.main {
            layer.insert("main".into(), Value::String(main.to_string_lossy().into_owned()));
        }
        if let Some(libraries) = &self.libraries {
            layer.insert("libraries".into(), path_list(libraries));
        }
        if let Some(overlays) = &self.overlays {
            layer.insert("overlays".into(), path_list(overlays));
        }

        if !self.properties.is_empty() {
            let mut properties = Map::new();
            for value in &self.properties {
                let (property, v) = parse_property(value)?;
                properties.insert(property.as_str().to_string(), Value::String(v));
            }
            layer.insert("properties".into(), Value::Object(properties));
        }
        if !self.placeholders.is_empty() {
            let mut placeholders = Map::new();
            for value in &self.placeholders {
                let (name, v) = parse_key_value("placeholder", value)?;
                placeholders.insert(name, Value::String(v));
            }
            layer.insert("placeholders".into(), Value::Object(placeholders));
        }

        if let Some(merge_type) = &self.merge_type {
            let parsed = merge_type.parse::<MergeType>().map_err(UsageError::InvalidMergeType)?;
            layer.insert("merge_type".into(), Value::String(parsed.as_str().to_string()));
        }
        if let Some(log) = &self.log {
            log.parse::<LogLevel>()
                .map_err(|_| UsageError::InvalidLogLevel(log.clone()))?;
            layer.insert("log".into(), Value::String(log.to_ascii_lowercase()));
        }

        let mut features = Map::new();
        for (name, enabled) in [
            ("encode_placeholders", self.encode_placeholders),
            ("keep_stages", self.keep_stages),
            ("instant_run", self.instant_run),
        ] {
            if enabled {
                features.insert(name.into(), Value::Bool(true));
            }
        }
        if !features.is_empty() {
            layer.insert("features".into(), Value::Object(features));
        }

        Ok(Value::Object(layer))
    }
}

fn path_list(value: &str) -> Value {
    Value::Array(
        split_path_list(value)
            .into_iter()
            .map(|p| Value::String(p.to_string_lossy().into_owned()))
            .collect(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_key_value() {
        assert_eq!(
            parse_key_value("placeholder", "label=a=b"),
            Ok(("label".to_string(), "a=b".to_string()))
        );
        assert!(parse_key_value("placeholder", "label").is_err());
        assert!(parse_key_value("placeholder", "=value").is_err());
    }

    #[test]
    fn test_parse_property() {
        assert_eq!(
            parse_property("min_sdk_version=21"),
            Ok((ManifestSystemProperty::MinSdkVersion, "21".to_string()))
        );
        assert!(matches!(
            parse_property("COLOR=blue"),
            Err(UsageError::UnknownProperty { .. })
        ));
    }

    #[test]
    fn test_split_path_list() {
        let joined = std::env::join_paths(["a.xml", "b.xml"]).unwrap();
        let paths = split_path_list(joined.to_str().unwrap());
        assert_eq!(paths, vec![PathBuf::from("a.xml"), PathBuf::from("b.xml")]);
        assert!(split_path_list("").is_empty());
    }

    #[test]
    fn test_overrides_layer() {
        let overrides = CliOverrides {
            main: Some(PathBuf::from("main.xml")),
            properties: vec!["VERSION_CODE=7".to_string()],
            placeholders: vec!["label=Foo".to_string()],
            merge_type: Some("LIBRARY".to_string()),
            log: Some("VERBOSE".to_string()),
            keep_stages: true,
            ..CliOverrides::default()
        };
        let layer = overrides.to_value().unwrap();
        assert_eq!(layer["main"], "main.xml");
        assert_eq!(layer["properties"]["VERSION_CODE"], "7");
        assert_eq!(layer["placeholders"]["label"], "Foo");
        assert_eq!(layer["merge_type"], "library");
        assert_eq!(layer["log"], "verbose");
        assert_eq!(layer["features"]["keep_stages"], true);
        assert!(layer["features"].get("instant_run").is_none());
        assert!(layer.get("libraries").is_none());
    }

    #[test]
    fn test_overrides_reject_bad_values() {
        let overrides = CliOverrides {
            log: Some("LOUD".to_string()),
            ..CliOverrides::default()
        };
        assert_eq!(overrides.to_value(), Err(UsageError::InvalidLogLevel("LOUD".to_string())));
    }
}
