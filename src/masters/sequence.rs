//! Process sequences: the ordered operations used to make a part. Sequence
//! numbers are entered by the user and must be unique.

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::errors::Result;
use crate::form::{CollectionSpec, FormModel, Rule, Schema, StepDefinition, ValueTree};

use super::common::{self, Reader, RecordStatus};
use super::part::part_number_rules;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProcessSequence {
    pub sequence_name: String,
    pub part_number: String,
    pub status: RecordStatus,
    pub step_groups: Vec<StepGroup>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StepGroup {
    pub sequence_number: Option<i64>,
    pub operation_name: String,
    pub work_center: String,
    pub cycle_time_minutes: Option<f64>,
}

#[derive(Debug, Default, Clone, Copy)]
pub struct ProcessSequenceForm;

fn blank_group() -> Value {
    json!({
        "sequenceNumber": "",
        "operationName": "",
        "workCenter": "",
        "cycleTimeMinutes": ""
    })
}

impl FormModel for ProcessSequenceForm {
    fn name(&self) -> &'static str {
        "sequence"
    }

    fn title(&self) -> &'static str {
        "Process sequence"
    }

    fn schema(&self) -> Result<Schema> {
        Schema::builder()
            .field("sequenceName", vec![Rule::required(), Rule::max_length(80)])
            .field("partNumber", part_number_rules())
            .field(
                "stepGroups[*].sequenceNumber",
                vec![Rule::required(), Rule::integer(), Rule::min(1.0)],
            )
            .field("stepGroups[*].operationName", vec![Rule::required()])
            .field("stepGroups[*].workCenter", vec![Rule::required()])
            .field(
                "stepGroups[*].cycleTimeMinutes",
                vec![Rule::required(), Rule::positive()],
            )
            .min_items("stepGroups", 1, "Add at least one step group")
            .unique(
                "stepGroups",
                "sequenceNumber",
                "Sequence numbers must be unique",
            )
            .build()
    }

    fn steps(&self) -> Result<Vec<StepDefinition>> {
        Ok(vec![
            StepDefinition::new("Basic information", &["sequenceName", "partNumber"])?,
            StepDefinition::new("Step groups", &["stepGroups"])?,
            StepDefinition::review("Review"),
        ])
    }

    fn collections(&self) -> Result<Vec<CollectionSpec>> {
        Ok(vec![CollectionSpec::new("stepGroups", blank_group())?])
    }

    fn defaults(&self) -> Value {
        let mut first = blank_group();
        first["sequenceNumber"] = json!("1");
        json!({
            "sequenceName": "",
            "partNumber": "",
            "active": true,
            "stepGroups": [first]
        })
    }

    fn to_payload(&self, tree: &ValueTree) -> Result<Value> {
        let root = Reader::root(tree);
        common::encode(&ProcessSequence {
            sequence_name: root.text("sequenceName"),
            part_number: root.text("partNumber"),
            status: RecordStatus::from_flag(root.flag("active")),
            step_groups: root
                .items("stepGroups")
                .iter()
                .map(|row| StepGroup {
                    sequence_number: row.integer("sequenceNumber"),
                    operation_name: row.text("operationName"),
                    work_center: row.text("workCenter"),
                    cycle_time_minutes: row.number("cycleTimeMinutes"),
                })
                .collect(),
        })
    }

    fn from_record(&self, record: &Value) -> Result<Value> {
        let sequence: ProcessSequence = common::decode(self.name(), record)?;
        let rows: Vec<Value> = sequence
            .step_groups
            .iter()
            .map(|row| {
                common::object([
                    ("sequenceNumber", common::integer_input(row.sequence_number)),
                    ("operationName", Value::String(row.operation_name.clone())),
                    ("workCenter", Value::String(row.work_center.clone())),
                    ("cycleTimeMinutes", common::number_input(row.cycle_time_minutes)),
                ])
            })
            .collect();
        Ok(json!({
            "sequenceName": sequence.sequence_name,
            "partNumber": sequence.part_number,
            "active": sequence.status.is_active(),
            "stepGroups": rows
        }))
    }
}
