//! Ordered steps and forward-navigation gating.

use crate::errors::{FormError, Result};

use super::path::FieldPath;
use super::schema::{Schema, Scope, ValidationReport};
use super::tree::ValueTree;

/// One page of a stepped form and the sub-trees it must clear before the
/// user may move past it. A review step owns nothing.
#[derive(Debug, Clone)]
pub struct StepDefinition {
    pub title: String,
    pub scope: Vec<FieldPath>,
}

impl StepDefinition {
    pub fn new(title: &str, scope: &[&str]) -> Result<Self> {
        let scope = scope
            .iter()
            .map(|raw| FieldPath::parse(raw))
            .collect::<Result<Vec<_>>>()?;
        Ok(Self {
            title: title.to_string(),
            scope,
        })
    }

    pub fn review(title: &str) -> Self {
        Self {
            title: title.to_string(),
            scope: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum StepTransition {
    Advanced { from: usize, to: usize },
    /// Scoped validation failed; the active step is unchanged.
    Blocked(ValidationReport),
    /// The last step validated; the caller hands off to submission.
    ReadyToSubmit,
}

/// Step index state machine: `0..N-1` plus a terminal submitted state
/// reachable only from the last step.
#[derive(Debug, Clone)]
pub struct StepController {
    steps: Vec<StepDefinition>,
    active: usize,
    submitted: bool,
}

impl StepController {
    pub fn new(steps: Vec<StepDefinition>) -> Result<Self> {
        if steps.is_empty() {
            return Err(FormError::Schema("a stepped form needs at least one step".into()));
        }
        Ok(Self {
            steps,
            active: 0,
            submitted: false,
        })
    }

    /// Rejects scope entries no rule in `schema` can check; such a step would
    /// always pass.
    pub fn check_scopes(&self, schema: &Schema) -> Result<()> {
        for step in &self.steps {
            if let Some(path) = step.scope.iter().find(|path| !schema.reaches(path)) {
                return Err(FormError::Schema(format!(
                    "step `{}` scopes `{}`, which no rule validates",
                    step.title, path
                )));
            }
        }
        Ok(())
    }

    pub fn active(&self) -> usize {
        self.active
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    pub fn current(&self) -> &StepDefinition {
        &self.steps[self.active]
    }

    pub fn steps(&self) -> &[StepDefinition] {
        &self.steps
    }

    pub fn is_last(&self) -> bool {
        self.active + 1 == self.steps.len()
    }

    pub fn is_submitted(&self) -> bool {
        self.submitted
    }

    /// Validates the active step's scope and moves forward when it is clean.
    pub fn next(&mut self, schema: &Schema, tree: &ValueTree) -> Result<StepTransition> {
        if self.submitted {
            return Err(FormError::Schema("form has already been submitted".into()));
        }
        let report = self.validate_current(schema, tree);
        if !report.is_valid() {
            tracing::debug!(
                step = self.active,
                errors = report.errors.len(),
                "step blocked by validation"
            );
            return Ok(StepTransition::Blocked(report));
        }
        if self.is_last() {
            return Ok(StepTransition::ReadyToSubmit);
        }
        let from = self.active;
        self.active += 1;
        tracing::debug!(from, to = self.active, "step advanced");
        Ok(StepTransition::Advanced {
            from,
            to: self.active,
        })
    }

    /// Moves back one step without validating. Stays put on the first step.
    pub fn back(&mut self) -> usize {
        self.active = self.active.saturating_sub(1);
        self.active
    }

    pub fn validate_current(&self, schema: &Schema, tree: &ValueTree) -> ValidationReport {
        let scope = &self.current().scope;
        if scope.is_empty() {
            return ValidationReport::default();
        }
        schema.validate(tree, Scope::Paths(scope))
    }

    pub fn mark_submitted(&mut self) {
        self.submitted = true;
    }

    pub fn reset(&mut self) {
        self.active = 0;
        self.submitted = false;
    }
}
