//! The stepped form engine.
//!
//! A [`FormStore`] owns the [`ValueTree`]; a [`Schema`] turns it into an
//! [`ErrorMap`]; a [`StepController`] gates forward navigation on the active
//! step's scope; a [`CollectionManager`] maintains repeated groups and their
//! expansion state; a [`SubmissionCoordinator`] validates, reshapes and hands
//! the tree to a [`RecordGateway`]. [`SteppedForm`] composes all five around a
//! [`FormModel`].

pub mod collection;
pub mod engine;
pub mod path;
pub mod rules;
pub mod schema;
pub mod steps;
pub mod store;
pub mod submit;
pub mod tree;

pub use collection::{
    CollectionManager, CollectionSpec, ExpansionPolicy, ItemUiState, ItemView, SequenceSpec,
};
pub use engine::{Banner, FormEvent, FormModel, SteppedForm};
pub use path::{FieldPath, Segment};
pub use rules::{Comparison, Rule, DATE_FORMAT};
pub use schema::{case, ErrorMap, Schema, SchemaBuilder, Scope, ValidationReport};
pub use steps::{StepController, StepDefinition, StepTransition};
pub use store::{FormStore, ItemId, SubscriptionId};
pub use submit::{
    PendingSubmission, Prepared, RecordGateway, SaveResponse, SubmissionCoordinator,
    SubmissionOutcome, DEFAULT_FAILURE_MESSAGE,
};
pub use tree::ValueTree;
