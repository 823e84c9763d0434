use std::collections::{BTreeMap, VecDeque};

use serde_json::Value;

use crate::errors::{FormError, Result};
use crate::form::{RecordGateway, SaveResponse};

use super::{stamp_new, stamp_update, target_id};

/// A failure queued for the next save call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SaveFailure {
    /// The collaborator answers `success: false` with this message.
    Reported(String),
    /// The call itself fails.
    Transport(String),
}

/// In-memory gateway. Records every save attempt so callers can assert on
/// how often and with what the collaborator was invoked.
#[derive(Debug, Default)]
pub struct MemoryGateway {
    records: BTreeMap<String, BTreeMap<String, Value>>,
    saves: Vec<(String, Value)>,
    failures: VecDeque<SaveFailure>,
}

impl MemoryGateway {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, form: &str, id: &str, record: Value) {
        self.records
            .entry(form.to_string())
            .or_default()
            .insert(id.to_string(), record);
    }

    pub fn fail_next(&mut self, failure: SaveFailure) {
        self.failures.push_back(failure);
    }

    pub fn saves(&self) -> &[(String, Value)] {
        &self.saves
    }

    pub fn save_count(&self) -> usize {
        self.saves.len()
    }

    pub fn records(&self, form: &str) -> Vec<&Value> {
        self.records
            .get(form)
            .map(|records| records.values().collect())
            .unwrap_or_default()
    }
}

impl RecordGateway for MemoryGateway {
    fn fetch_record(&self, form: &str, id: &str) -> Result<Option<Value>> {
        Ok(self
            .records
            .get(form)
            .and_then(|records| records.get(id))
            .cloned())
    }

    fn save_record(&mut self, form: &str, payload: &Value) -> Result<SaveResponse> {
        self.saves.push((form.to_string(), payload.clone()));
        match self.failures.pop_front() {
            Some(SaveFailure::Reported(message)) => return Ok(SaveResponse::failed(message)),
            Some(SaveFailure::Transport(message)) => return Err(FormError::Storage(message)),
            None => {}
        }
        let Some(fields) = payload.as_object() else {
            return Ok(SaveResponse::failed("Payload must be a JSON object"));
        };
        let records = self.records.entry(form.to_string()).or_default();
        let (id, record) = match target_id(fields) {
            Some(id) => match records.get(id) {
                Some(existing) => (id.to_string(), stamp_update(existing, fields)),
                None => return Ok(SaveResponse::failed(format!("Record `{}` does not exist", id))),
            },
            None => stamp_new(fields),
        };
        records.insert(id, record.clone());
        Ok(SaveResponse::ok(record))
    }
}
