//! Placeholder substitution and build property injection

mod instant_run;
pub mod placeholder;
mod property;

pub use instant_run::{apply_instant_run, BOOTSTRAP_APPLICATION, REAL_APPLICATION_KEY};
pub use property::{
    build_configuration_position, inject_properties, ManifestSystemProperty, PropertyTarget,
    BUILD_CONFIGURATION,
};
