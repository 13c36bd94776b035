//! Persistence errors

/// Errors reading or writing persisted actions
#[derive(Debug, thiserror::Error)]
pub enum ActionsError {
    #[error("IO error: {0}")]
    Io(String),

    #[error("JSON error: {0}")]
    Json(String),

    #[error("unsupported actions schema {schema_id} version {version}")]
    UnsupportedSchema { schema_id: String, version: u32 },
}

impl From<serde_json::Error> for ActionsError {
    fn from(e: serde_json::Error) -> Self {
        Self::Json(e.to_string())
    }
}
