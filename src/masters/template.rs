//! PRC templates. Every template implicitly starts with material receipt and
//! incoming inspection; user steps are numbered after them.

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::errors::Result;
use crate::form::{CollectionSpec, FormModel, Rule, Schema, StepDefinition, ValueTree};

use super::common::{self, Reader, RecordStatus};
use super::part::part_number_rules;

/// `(stepName, stepType)` of the steps every template begins with.
pub const DEFAULT_STEPS: [(&str, &str); 2] = [
    ("Material receipt", "MATERIAL_RECEIPT"),
    ("Incoming inspection", "INCOMING_INSPECTION"),
];

/// Order of the first user-defined step.
pub const FIRST_USER_ORDER: i64 = DEFAULT_STEPS.len() as i64 + 1;

pub const STEP_TYPES: [&str; 8] = [
    "MACHINING",
    "ASSEMBLY",
    "IN_PROCESS_INSPECTION",
    "HEAT_TREATMENT",
    "SURFACE_TREATMENT",
    "FINAL_INSPECTION",
    "PACKAGING",
    "DISPATCH",
];

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PrcTemplate {
    pub template_name: String,
    pub part_number: String,
    pub status: RecordStatus,
    pub template_steps: Vec<TemplateStep>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TemplateStep {
    pub step_order: i64,
    pub step_name: String,
    pub step_type: String,
    pub mandatory: bool,
}

impl TemplateStep {
    fn implicit(order: i64, (name, step_type): (&str, &str)) -> Self {
        Self {
            step_order: order,
            step_name: name.to_string(),
            step_type: step_type.to_string(),
            mandatory: true,
        }
    }
}

#[derive(Debug, Default, Clone, Copy)]
pub struct PrcTemplateForm;

fn blank_step() -> Value {
    json!({
        "stepName": "",
        "stepType": "",
        "mandatory": false
    })
}

impl FormModel for PrcTemplateForm {
    fn name(&self) -> &'static str {
        "template"
    }

    fn title(&self) -> &'static str {
        "PRC template"
    }

    fn schema(&self) -> Result<Schema> {
        Schema::builder()
            .field("templateName", vec![Rule::required(), Rule::max_length(80)])
            .field("partNumber", part_number_rules())
            .field("templateSteps[*].stepName", vec![Rule::required()])
            .field(
                "templateSteps[*].stepType",
                vec![Rule::required(), Rule::one_of(STEP_TYPES)],
            )
            .min_items("templateSteps", 1, "Add at least one step")
            .unique_ignore_case(
                "templateSteps",
                "stepName",
                "Step names must be unique within a template",
            )
            .build()
    }

    fn steps(&self) -> Result<Vec<StepDefinition>> {
        Ok(vec![
            StepDefinition::new("Basic information", &["templateName", "partNumber"])?,
            StepDefinition::new("Template steps", &["templateSteps"])?,
            StepDefinition::review("Review"),
        ])
    }

    fn collections(&self) -> Result<Vec<CollectionSpec>> {
        Ok(vec![CollectionSpec::new("templateSteps", blank_step())?
            .with_sequence("stepOrder", FIRST_USER_ORDER)])
    }

    fn defaults(&self) -> Value {
        let mut first = blank_step();
        first["stepOrder"] = json!(FIRST_USER_ORDER);
        json!({
            "templateName": "",
            "partNumber": "",
            "active": true,
            "templateSteps": [first]
        })
    }

    fn to_payload(&self, tree: &ValueTree) -> Result<Value> {
        let root = Reader::root(tree);
        let mut steps: Vec<TemplateStep> = DEFAULT_STEPS
            .iter()
            .zip(1..)
            .map(|(step, order)| TemplateStep::implicit(order, *step))
            .collect();
        for (offset, row) in root.items("templateSteps").iter().enumerate() {
            steps.push(TemplateStep {
                step_order: row
                    .integer("stepOrder")
                    .unwrap_or(FIRST_USER_ORDER + offset as i64),
                step_name: row.text("stepName"),
                step_type: row.text("stepType").to_uppercase(),
                mandatory: row.flag("mandatory"),
            });
        }
        common::encode(&PrcTemplate {
            template_name: root.text("templateName"),
            part_number: root.text("partNumber"),
            status: RecordStatus::from_flag(root.flag("active")),
            template_steps: steps,
        })
    }

    fn from_record(&self, record: &Value) -> Result<Value> {
        let template: PrcTemplate = common::decode(self.name(), record)?;
        let mut user_steps: Vec<&TemplateStep> = template
            .template_steps
            .iter()
            .filter(|step| step.step_order >= FIRST_USER_ORDER)
            .collect();
        user_steps.sort_by_key(|step| step.step_order);
        let rows: Vec<Value> = user_steps
            .iter()
            .zip(FIRST_USER_ORDER..)
            .map(|(step, order)| {
                common::object([
                    ("stepOrder", Value::from(order)),
                    ("stepName", Value::String(step.step_name.clone())),
                    ("stepType", Value::String(step.step_type.clone())),
                    ("mandatory", Value::Bool(step.mandatory)),
                ])
            })
            .collect();
        Ok(json!({
            "templateName": template.template_name,
            "partNumber": template.part_number,
            "active": template.status.is_active(),
            "templateSteps": rows
        }))
    }
}
