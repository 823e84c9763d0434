//! Terminal action of a stepped form: full validation, payload shaping and
//! hand-off to the host's persistence collaborator.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::errors::{FormError, Result};

use super::schema::{Schema, Scope, ValidationReport};
use super::tree::ValueTree;

pub const DEFAULT_FAILURE_MESSAGE: &str = "Failed to save record. Please try again.";

/// Host-supplied persistence boundary.
pub trait RecordGateway {
    /// Stored record for `id`, or `None` when it does not exist.
    fn fetch_record(&self, form: &str, id: &str) -> Result<Option<Value>>;

    /// Creates or updates a record from an external-shape payload. An `Err`
    /// means the call itself failed; a rejected save is `Ok` with
    /// `success == false`.
    fn save_record(&mut self, form: &str, payload: &Value) -> Result<SaveResponse>;
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SaveResponse {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
}

impl SaveResponse {
    pub fn ok(data: Value) -> Self {
        Self {
            success: true,
            data: Some(data),
            error_message: None,
        }
    }

    pub fn failed(message: impl Into<String>) -> Self {
        Self {
            success: false,
            data: None,
            error_message: Some(message.into()),
        }
    }

    /// Parses a raw response body. Anything without a boolean `success` is
    /// rejected.
    pub fn from_value(value: Value) -> Result<Self> {
        serde_json::from_value(value)
            .map_err(|err| FormError::Payload(format!("malformed save response: {}", err)))
    }
}

/// A validated payload that has been handed out for dispatch. It must be
/// returned through [`SubmissionCoordinator::finish`].
#[derive(Debug)]
pub struct PendingSubmission {
    form: String,
    payload: Value,
}

impl PendingSubmission {
    pub fn form(&self) -> &str {
        &self.form
    }

    pub fn payload(&self) -> &Value {
        &self.payload
    }
}

#[derive(Debug)]
pub enum Prepared {
    Ready(PendingSubmission),
    Rejected(ValidationReport),
    /// Another submission has not resolved yet.
    Busy,
}

#[derive(Debug, Clone, PartialEq)]
pub enum SubmissionOutcome {
    Saved { data: Option<Value> },
    Rejected(ValidationReport),
    Failed { message: String },
    Busy,
}

/// Drives one submission at a time. `prepare` and `finish` bracket the
/// asynchronous save; while a submission is pending further attempts are
/// answered with `Busy`.
#[derive(Debug, Clone)]
pub struct SubmissionCoordinator {
    in_flight: bool,
    failure_message: String,
}

impl Default for SubmissionCoordinator {
    fn default() -> Self {
        Self::new(DEFAULT_FAILURE_MESSAGE)
    }
}

impl SubmissionCoordinator {
    pub fn new(failure_message: &str) -> Self {
        Self {
            in_flight: false,
            failure_message: failure_message.to_string(),
        }
    }

    pub fn is_in_flight(&self) -> bool {
        self.in_flight
    }

    pub fn prepare<F>(
        &mut self,
        form: &str,
        schema: &Schema,
        tree: &ValueTree,
        transform: F,
    ) -> Result<Prepared>
    where
        F: FnOnce(&ValueTree) -> Result<Value>,
    {
        if self.in_flight {
            tracing::warn!(form, "submission already in flight");
            return Ok(Prepared::Busy);
        }
        let report = schema.validate(tree, Scope::All);
        if !report.is_valid() {
            tracing::warn!(form, errors = report.errors.len(), "submission rejected by validation");
            return Ok(Prepared::Rejected(report));
        }
        let payload = transform(tree)?;
        self.in_flight = true;
        tracing::info!(form, "submission dispatched");
        Ok(Prepared::Ready(PendingSubmission {
            form: form.to_string(),
            payload,
        }))
    }

    pub fn finish(
        &mut self,
        pending: PendingSubmission,
        response: Result<SaveResponse>,
    ) -> SubmissionOutcome {
        self.in_flight = false;
        match response {
            Ok(response) if response.success => {
                tracing::info!(form = %pending.form, "record saved");
                SubmissionOutcome::Saved {
                    data: response.data,
                }
            }
            Ok(response) => {
                let message = response
                    .error_message
                    .filter(|message| !message.trim().is_empty())
                    .unwrap_or_else(|| self.failure_message.clone());
                tracing::warn!(form = %pending.form, %message, "save reported failure");
                SubmissionOutcome::Failed { message }
            }
            Err(err) => {
                tracing::error!(form = %pending.form, error = %err, "save call failed");
                SubmissionOutcome::Failed {
                    message: self.failure_message.clone(),
                }
            }
        }
    }

    /// `prepare`, a blocking save through `gateway`, then `finish`.
    pub fn submit<G, F>(
        &mut self,
        gateway: &mut G,
        form: &str,
        schema: &Schema,
        tree: &ValueTree,
        transform: F,
    ) -> Result<SubmissionOutcome>
    where
        G: RecordGateway + ?Sized,
        F: FnOnce(&ValueTree) -> Result<Value>,
    {
        match self.prepare(form, schema, tree, transform)? {
            Prepared::Ready(pending) => {
                let response = gateway.save_record(&pending.form, &pending.payload);
                Ok(self.finish(pending, response))
            }
            Prepared::Rejected(report) => Ok(SubmissionOutcome::Rejected(report)),
            Prepared::Busy => Ok(SubmissionOutcome::Busy),
        }
    }
}
