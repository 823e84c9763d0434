use std::result::Result as StdResult;

use thiserror::Error;

/// Unified error type for the form engine, master models and storage.
///
/// User input problems never surface here: those are reported as an
/// [`ErrorMap`](crate::form::ErrorMap). Variants below indicate a defect in
/// the form configuration, a misuse of the collection API, or a failure of the
/// persistence collaborator.
#[derive(Error, Debug)]
pub enum FormError {
    #[error("Invalid field path `{path}`: {reason}")]
    InvalidPath { path: String, reason: String },
    #[error("Field path not found: {0}")]
    PathNotFound(String),
    #[error("Schema error: {0}")]
    Schema(String),
    #[error("Collection error: {0}")]
    Collection(String),
    #[error("Unknown form: {0}")]
    UnknownForm(String),
    #[error("Record not found: {0}")]
    RecordNotFound(String),
    #[error("Payload error: {0}")]
    Payload(String),
    #[error("Persistence error: {0}")]
    Storage(String),
    #[error("Configuration error: {0}")]
    Config(String),
}

pub type Result<T> = StdResult<T, FormError>;

impl From<std::io::Error> for FormError {
    fn from(err: std::io::Error) -> Self {
        FormError::Storage(err.to_string())
    }
}

impl From<serde_json::Error> for FormError {
    fn from(err: serde_json::Error) -> Self {
        FormError::Storage(err.to_string())
    }
}
