//! Manifest fixtures shared by the integration tests
//!
//! - `main.xml`: application with a remove marker, `tools:replace` and a
//!   caller placeholder
//! - `analytics.xml`: library with components, a provider using
//!   `${applicationId}` and a permission the main manifest removes
//! - `legacy.xml`: library targeting an old platform, triggers implied
//!   permissions
//! - `debug_overlay.xml`: overlay for the main manifest
//! - `strict_main.xml` / `strict_lib.xml`: a strict declaration and a
//!   library that disagrees with it

#![allow(dead_code)]

use std::path::{Path, PathBuf};

pub fn manifests_dir() -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures/manifests")
}

pub fn manifest(name: &str) -> PathBuf {
    manifests_dir().join(name)
}

pub fn main_manifest() -> PathBuf {
    manifest("main.xml")
}

pub fn analytics_manifest() -> PathBuf {
    manifest("analytics.xml")
}

pub fn legacy_manifest() -> PathBuf {
    manifest("legacy.xml")
}

pub fn overlay_manifest() -> PathBuf {
    manifest("debug_overlay.xml")
}

pub fn strict_main_manifest() -> PathBuf {
    manifest("strict_main.xml")
}

pub fn strict_lib_manifest() -> PathBuf {
    manifest("strict_lib.xml")
}
