//! Production execution creation. Records are listed through the storage
//! collaborator.

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::errors::Result;
use crate::form::{rules, Comparison, FormModel, Rule, Schema, StepDefinition, ValueTree};

use super::common::{self, Reader};
use super::part::part_number_rules;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ExecutionStatus {
    Planned,
    InProgress,
    Completed,
    Cancelled,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductionExecution {
    pub execution_number: String,
    pub prc_template_id: String,
    pub part_number: String,
    pub planned_quantity: Option<i64>,
    pub planned_start: Option<chrono::NaiveDate>,
    pub planned_end: Option<chrono::NaiveDate>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lot_number: Option<String>,
    pub status: ExecutionStatus,
}

#[derive(Debug, Default, Clone, Copy)]
pub struct ProductionExecutionForm;

impl FormModel for ProductionExecutionForm {
    fn name(&self) -> &'static str {
        "production"
    }

    fn title(&self) -> &'static str {
        "Production execution"
    }

    fn schema(&self) -> Result<Schema> {
        Schema::builder()
            .field("executionNumber", vec![Rule::required(), Rule::max_length(32)])
            .field("prcTemplateId", vec![Rule::required()])
            .field("partNumber", part_number_rules())
            .field(
                "plannedQuantity",
                vec![Rule::required(), Rule::integer(), Rule::min(1.0)],
            )
            .field("plannedStart", vec![Rule::required(), Rule::date()])
            .field("plannedEnd", vec![Rule::required(), Rule::date()])
            .field("lotNumber", vec![Rule::max_length(32)])
            .compare(
                "",
                "plannedStart",
                Comparison::Le,
                "plannedEnd",
                "Planned start must be on or before planned end",
            )
            .build()
    }

    fn steps(&self) -> Result<Vec<StepDefinition>> {
        Ok(vec![
            StepDefinition::new(
                "Plan",
                &["executionNumber", "prcTemplateId", "partNumber", "plannedQuantity"],
            )?,
            StepDefinition::new("Schedule", &["plannedStart", "plannedEnd", "lotNumber"])?,
            StepDefinition::review("Review"),
        ])
    }

    fn defaults(&self) -> Value {
        json!({
            "executionNumber": "",
            "prcTemplateId": "",
            "partNumber": "",
            "plannedQuantity": "",
            "plannedStart": "",
            "plannedEnd": "",
            "lotNumber": ""
        })
    }

    fn to_payload(&self, tree: &ValueTree) -> Result<Value> {
        let root = Reader::root(tree);
        let date = |name: &str| root.opt_text(name).as_deref().and_then(rules::parse_date);
        common::encode(&ProductionExecution {
            execution_number: root.text("executionNumber"),
            prc_template_id: root.text("prcTemplateId"),
            part_number: root.text("partNumber"),
            planned_quantity: root.integer("plannedQuantity"),
            planned_start: date("plannedStart"),
            planned_end: date("plannedEnd"),
            lot_number: root.opt_text("lotNumber"),
            status: ExecutionStatus::Planned,
        })
    }

    fn from_record(&self, record: &Value) -> Result<Value> {
        let execution: ProductionExecution = common::decode(self.name(), record)?;
        let date = |value: Option<chrono::NaiveDate>| {
            Value::String(
                value
                    .map(|date| date.format(rules::DATE_FORMAT).to_string())
                    .unwrap_or_default(),
            )
        };
        Ok(json!({
            "executionNumber": execution.execution_number,
            "prcTemplateId": execution.prc_template_id,
            "partNumber": execution.part_number,
            "plannedQuantity": common::integer_input(execution.planned_quantity),
            "plannedStart": date(execution.planned_start),
            "plannedEnd": date(execution.planned_end),
            "lotNumber": common::text_input(execution.lot_number.as_deref())
        }))
    }
}
