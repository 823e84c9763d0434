//! Persistence collaborators for the form engine.

pub mod json_backend;
pub mod memory;

use chrono::{SecondsFormat, Utc};
use serde_json::{Map, Value};
use uuid::Uuid;

pub use json_backend::JsonRecordStore;
pub use memory::{MemoryGateway, SaveFailure};

pub const ID_FIELD: &str = "id";
pub const CREATED_AT: &str = "createdAt";
pub const UPDATED_AT: &str = "updatedAt";

/// Id an incoming payload targets; `None` means create.
pub(crate) fn target_id(payload: &Map<String, Value>) -> Option<&str> {
    payload
        .get(ID_FIELD)
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|id| !id.is_empty())
}

/// Ids become file names, so only a conservative alphabet is accepted.
pub(crate) fn is_safe_id(id: &str) -> bool {
    !id.is_empty()
        && id
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
}

fn timestamp() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true)
}

/// New record from a create payload: fresh id and creation time.
pub(crate) fn stamp_new(payload: &Map<String, Value>) -> (String, Value) {
    let id = Uuid::new_v4().to_string();
    let mut record = payload.clone();
    record.insert(ID_FIELD.into(), Value::String(id.clone()));
    record.insert(CREATED_AT.into(), Value::String(timestamp()));
    (id, Value::Object(record))
}

/// Replacement record for an update; server-owned fields are carried over.
pub(crate) fn stamp_update(existing: &Value, payload: &Map<String, Value>) -> Value {
    let mut record = payload.clone();
    if let Some(created) = existing.get(CREATED_AT) {
        record.insert(CREATED_AT.into(), created.clone());
    }
    record.insert(UPDATED_AT.into(), Value::String(timestamp()));
    Value::Object(record)
}
