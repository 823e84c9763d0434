//! A stepped form session: the store, validator, step controller, collection
//! manager and submission coordinator wired together for one form model.

use serde_json::Value;

use crate::config::EngineConfig;
use crate::errors::{FormError, Result};

use super::collection::{CollectionManager, CollectionSpec, ItemView};
use super::path::FieldPath;
use super::schema::{ErrorMap, Schema, Scope, ValidationReport};
use super::steps::{StepController, StepDefinition, StepTransition};
use super::store::{FormStore, ItemId, SubscriptionId};
use super::submit::{RecordGateway, SubmissionCoordinator, SubmissionOutcome};
use super::tree::ValueTree;

const REJECTED_BANNER: &str = "Please fix the highlighted fields before submitting.";

/// Everything a concrete form contributes: its rules, its pages, its
/// repeatable groups and the mapping between the internal value tree and the
/// external record shape.
pub trait FormModel {
    /// Stable identifier used by the persistence collaborator.
    fn name(&self) -> &'static str;

    fn title(&self) -> &'static str;

    fn schema(&self) -> Result<Schema>;

    fn steps(&self) -> Result<Vec<StepDefinition>>;

    fn collections(&self) -> Result<Vec<CollectionSpec>> {
        Ok(Vec::new())
    }

    /// Initial value tree for create mode.
    fn defaults(&self) -> Value;

    /// Internal tree to external request shape.
    fn to_payload(&self, tree: &ValueTree) -> Result<Value>;

    /// Stored record back to an internal tree for edit mode.
    fn from_record(&self, record: &Value) -> Result<Value>;
}

impl<M: FormModel + ?Sized> FormModel for Box<M> {
    fn name(&self) -> &'static str {
        (**self).name()
    }

    fn title(&self) -> &'static str {
        (**self).title()
    }

    fn schema(&self) -> Result<Schema> {
        (**self).schema()
    }

    fn steps(&self) -> Result<Vec<StepDefinition>> {
        (**self).steps()
    }

    fn collections(&self) -> Result<Vec<CollectionSpec>> {
        (**self).collections()
    }

    fn defaults(&self) -> Value {
        (**self).defaults()
    }

    fn to_payload(&self, tree: &ValueTree) -> Result<Value> {
        (**self).to_payload(tree)
    }

    fn from_record(&self, record: &Value) -> Result<Value> {
        (**self).from_record(record)
    }
}

/// Top-level message shown above the form.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Banner {
    Saved(String),
    Rejected(String),
    Failed(String),
}

impl Banner {
    pub fn message(&self) -> &str {
        match self {
            Banner::Saved(message) | Banner::Rejected(message) | Banner::Failed(message) => message,
        }
    }

    pub fn is_error(&self) -> bool {
        !matches!(self, Banner::Saved(_))
    }
}

/// Result of [`SteppedForm::next`].
#[derive(Debug, Clone, PartialEq)]
pub enum FormEvent {
    Advanced { step: usize },
    Blocked { errors: usize },
    Saved { data: Option<Value> },
    Rejected { errors: usize },
    Failed { message: String },
    Busy,
}

#[derive(Debug, Clone)]
enum ErrorSource {
    Step(Vec<FieldPath>),
    Full,
}

pub struct SteppedForm<M: FormModel> {
    model: M,
    schema: Schema,
    store: FormStore,
    steps: StepController,
    collections: CollectionManager,
    coordinator: SubmissionCoordinator,
    errors: ErrorMap,
    error_source: Option<ErrorSource>,
    banner: Option<Banner>,
    record_id: Option<String>,
    revalidate_on_change: bool,
}

impl<M: FormModel> SteppedForm<M> {
    pub fn new(model: M, config: &EngineConfig) -> Result<Self> {
        let schema = model.schema()?;
        let steps = StepController::new(model.steps()?)?;
        steps.check_scopes(&schema)?;
        let mut store = FormStore::new(ValueTree::from_value(model.defaults())?);
        let collections = CollectionManager::new(model.collections()?, config.expansion_policy());
        collections.attach(&mut store)?;
        tracing::debug!(form = model.name(), steps = steps.len(), "form session opened");
        Ok(Self {
            model,
            schema,
            store,
            steps,
            collections,
            coordinator: SubmissionCoordinator::new(&config.failure_message),
            errors: ErrorMap::new(),
            error_source: None,
            banner: None,
            record_id: None,
            revalidate_on_change: config.revalidate_on_change,
        })
    }

    /// Switches to edit mode for the stored record `id`.
    pub fn load<G: RecordGateway + ?Sized>(&mut self, gateway: &G, id: &str) -> Result<()> {
        let name = self.model.name();
        let record = gateway
            .fetch_record(name, id)?
            .ok_or_else(|| FormError::RecordNotFound(format!("{}/{}", name, id)))?;
        let tree = ValueTree::from_value(self.model.from_record(&record)?)?;
        self.reset(tree);
        self.record_id = Some(id.to_string());
        tracing::info!(form = name, id, "record loaded for editing");
        Ok(())
    }

    /// Replaces the tree and drops all derived state.
    pub fn reset(&mut self, tree: ValueTree) {
        self.store.reset(tree);
        self.collections.reset();
        self.steps.reset();
        self.clear_errors();
        self.banner = None;
        self.record_id = None;
    }

    /// Back to a blank create-mode form.
    pub fn reset_to_defaults(&mut self) -> Result<()> {
        let tree = ValueTree::from_value(self.model.defaults())?;
        self.reset(tree);
        Ok(())
    }

    pub fn model(&self) -> &M {
        &self.model
    }

    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    pub fn tree(&self) -> &ValueTree {
        self.store.tree()
    }

    pub fn value(&self, path: &str) -> Result<Option<&Value>> {
        let path = FieldPath::parse(path)?;
        Ok(self.store.get_value(&path))
    }

    pub fn set_value(&mut self, path: &str, value: Value) -> Result<()> {
        let path = FieldPath::parse(path)?;
        self.store.set_value(&path, value)?;
        self.collections.prune(&self.store);
        self.refresh_errors();
        Ok(())
    }

    pub fn subscribe<F>(&mut self, path: &str, listener: F) -> Result<SubscriptionId>
    where
        F: FnMut(&FieldPath, Option<&Value>) + 'static,
    {
        Ok(self.store.subscribe(FieldPath::parse(path)?, listener))
    }

    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        self.store.unsubscribe(id)
    }

    pub fn is_dirty(&self) -> bool {
        self.store.is_dirty()
    }

    pub fn record_id(&self) -> Option<&str> {
        self.record_id.as_deref()
    }

    pub fn active_step(&self) -> usize {
        self.steps.active()
    }

    pub fn step_count(&self) -> usize {
        self.steps.len()
    }

    pub fn current_step(&self) -> &StepDefinition {
        self.steps.current()
    }

    pub fn steps(&self) -> &[StepDefinition] {
        self.steps.steps()
    }

    pub fn is_submitted(&self) -> bool {
        self.steps.is_submitted()
    }

    pub fn errors(&self) -> &ErrorMap {
        &self.errors
    }

    pub fn banner(&self) -> Option<&Banner> {
        self.banner.as_ref()
    }

    pub fn validate_all(&self) -> ValidationReport {
        self.schema.validate(self.store.tree(), Scope::All)
    }

    pub fn payload_preview(&self) -> Result<Value> {
        self.build_payload(self.store.tree())
    }

    /// Validates the active step and either moves forward or, from the last
    /// step, submits through `gateway`.
    pub fn next<G: RecordGateway + ?Sized>(&mut self, gateway: &mut G) -> Result<FormEvent> {
        match self.steps.next(&self.schema, self.store.tree())? {
            StepTransition::Advanced { to, .. } => {
                self.clear_errors();
                self.banner = None;
                Ok(FormEvent::Advanced { step: to })
            }
            StepTransition::Blocked(report) => {
                let count = report.errors.len();
                self.show_errors(report.errors, ErrorSource::Step(self.steps.current().scope.clone()));
                Ok(FormEvent::Blocked { errors: count })
            }
            StepTransition::ReadyToSubmit => self.submit(gateway),
        }
    }

    /// Moves to the previous step. Never validates.
    pub fn back(&mut self) -> usize {
        self.clear_errors();
        if matches!(self.banner, Some(Banner::Rejected(_))) {
            self.banner = None;
        }
        let step = self.steps.back();
        tracing::debug!(step, "moved back");
        step
    }

    fn submit<G: RecordGateway + ?Sized>(&mut self, gateway: &mut G) -> Result<FormEvent> {
        let model = &self.model;
        let record_id = self.record_id.clone();
        let outcome = self.coordinator.submit(
            gateway,
            model.name(),
            &self.schema,
            self.store.tree(),
            |tree| with_record_id(model.to_payload(tree)?, record_id.as_deref()),
        )?;

        match outcome {
            SubmissionOutcome::Saved { data } => {
                self.steps.mark_submitted();
                self.clear_errors();
                if let Some(id) = data.as_ref().and_then(|data| data.get("id")).and_then(Value::as_str) {
                    self.record_id = Some(id.to_string());
                }
                self.banner = Some(Banner::Saved(format!("{} saved.", self.model.title())));
                Ok(FormEvent::Saved { data })
            }
            SubmissionOutcome::Rejected(report) => {
                let count = report.errors.len();
                self.show_errors(report.errors, ErrorSource::Full);
                self.banner = Some(Banner::Rejected(REJECTED_BANNER.into()));
                Ok(FormEvent::Rejected { errors: count })
            }
            SubmissionOutcome::Failed { message } => {
                self.banner = Some(Banner::Failed(message.clone()));
                Ok(FormEvent::Failed { message })
            }
            SubmissionOutcome::Busy => Ok(FormEvent::Busy),
        }
    }

    pub fn append(&mut self, group: &str) -> Result<ItemId> {
        let group = FieldPath::parse(group)?;
        let id = self.collections.append(&mut self.store, &group)?;
        self.refresh_errors();
        Ok(id)
    }

    pub fn remove(&mut self, group: &str, index: usize) -> Result<Value> {
        let group = FieldPath::parse(group)?;
        let removed = self.collections.remove(&mut self.store, &group, index)?;
        self.refresh_errors();
        Ok(removed)
    }

    pub fn move_item(&mut self, group: &str, from: usize, to: usize) -> Result<()> {
        let group = FieldPath::parse(group)?;
        self.collections.move_item(&mut self.store, &group, from, to)?;
        self.refresh_errors();
        Ok(())
    }

    /// Flips one element's expansion; returns whether it is now open.
    pub fn toggle(&mut self, group: &str, index: usize) -> Result<bool> {
        let group = FieldPath::parse(group)?;
        self.collections.toggle(&self.store, &group, index)
    }

    pub fn items(&self, group: &str) -> Result<Vec<ItemView>> {
        let group = FieldPath::parse(group)?;
        self.collections.spec(&group)?;
        Ok(self.collections.view(&self.store, &group))
    }

    pub fn collection_paths(&self) -> Vec<FieldPath> {
        self.collections
            .specs()
            .iter()
            .map(|spec| spec.path.clone())
            .collect()
    }

    fn build_payload(&self, tree: &ValueTree) -> Result<Value> {
        with_record_id(self.model.to_payload(tree)?, self.record_id.as_deref())
    }

    fn show_errors(&mut self, errors: ErrorMap, source: ErrorSource) {
        self.errors = errors;
        self.error_source = Some(source);
        for group in self.collection_paths() {
            self.collections
                .auto_expand_on_error(&self.store, &group, &self.errors);
        }
    }

    fn clear_errors(&mut self) {
        self.errors.clear();
        self.error_source = None;
    }

    /// Re-runs the validation that produced the visible errors.
    fn refresh_errors(&mut self) {
        if !self.revalidate_on_change {
            return;
        }
        let Some(source) = self.error_source.clone() else {
            return;
        };
        let report = match &source {
            ErrorSource::Step(scope) if scope.is_empty() => ValidationReport::default(),
            ErrorSource::Step(scope) => self.schema.validate(self.store.tree(), Scope::Paths(scope)),
            ErrorSource::Full => self.schema.validate(self.store.tree(), Scope::All),
        };
        if report.is_valid() {
            self.clear_errors();
            if matches!(self.banner, Some(Banner::Rejected(_))) {
                self.banner = None;
            }
        } else {
            self.show_errors(report.errors, source);
        }
    }
}

fn with_record_id(mut payload: Value, record_id: Option<&str>) -> Result<Value> {
    let Some(id) = record_id else {
        return Ok(payload);
    };
    let object = payload
        .as_object_mut()
        .ok_or_else(|| FormError::Payload("payload must be a JSON object".into()))?;
    object
        .entry("id")
        .or_insert_with(|| Value::String(id.to_string()));
    Ok(payload)
}
