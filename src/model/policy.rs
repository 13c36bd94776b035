//! Attribute merge policies

use merger_xml::{XmlName, ANDROID_URI};

use super::element_type::ElementType;

pub const EXPLICIT_REMOVAL_REASON: &str = "explicit removal";
pub const REPLACED_REASON: &str = "replaced by higher priority declaration";
pub const STRICT_REASON: &str = "conflicts with strict declaration";
pub const MAIN_WINS_REASON: &str = "main manifest value takes precedence";
pub const OVERRIDDEN_REASON: &str = "overridden by higher priority declaration";
pub const BOOLEAN_OR_REASON: &str = "boolean OR of required values";
pub const MAX_VERSION_REASON: &str = "highest OpenGL ES version kept";

/// How two differing values of the same attribute are combined when no
/// attribute operation is declared
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttributePolicy {
    /// Higher priority value is kept
    Override,
    /// Values from libraries never reach the merged document
    MainWins,
    /// `true` if either side is `true`
    BooleanOr,
    /// Numerically larger value is kept
    NumericMax,
}

pub fn attribute_policy(element: ElementType, name: &XmlName) -> AttributePolicy {
    if !name.is_in(ANDROID_URI) {
        return AttributePolicy::Override;
    }
    match (element, name.local_name()) {
        (ElementType::UsesSdk, "minSdkVersion" | "targetSdkVersion" | "maxSdkVersion") => {
            AttributePolicy::MainWins
        }
        (ElementType::UsesFeature | ElementType::UsesLibrary, "required") => {
            AttributePolicy::BooleanOr
        }
        (ElementType::UsesFeature, "glEsVersion") => AttributePolicy::NumericMax,
        _ => AttributePolicy::Override,
    }
}

/// Combine two values under a combining policy.
///
/// Returns `None` for the policies that simply keep one side, and for
/// values the policy cannot interpret.
pub fn combine(policy: AttributePolicy, higher: &str, lower: &str) -> Option<String> {
    match policy {
        AttributePolicy::BooleanOr => {
            let merged = parse_bool(higher)? || parse_bool(lower)?;
            Some(merged.to_string())
        }
        AttributePolicy::NumericMax => {
            let (h, l) = (parse_number(higher)?, parse_number(lower)?);
            Some(if l > h { lower.to_string() } else { higher.to_string() })
        }
        AttributePolicy::Override | AttributePolicy::MainWins => None,
    }
}

fn parse_bool(value: &str) -> Option<bool> {
    match value.trim() {
        "true" => Some(true),
        "false" => Some(false),
        _ => None,
    }
}

/// Decimal or `0x` prefixed hexadecimal
fn parse_number(value: &str) -> Option<u64> {
    let value = value.trim();
    match value.strip_prefix("0x").or_else(|| value.strip_prefix("0X")) {
        Some(hex) => u64::from_str_radix(hex, 16).ok(),
        None => value.parse().ok(),
    }
}
