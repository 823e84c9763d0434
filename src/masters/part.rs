//! Part master. Flat form, no repeated groups.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::errors::Result;
use crate::form::{FormModel, Rule, Schema, StepDefinition, ValueTree};

use super::common::{self, Reader, RecordStatus};

/// Upper-case alphanumerics and dashes, not starting with a dash.
pub static PART_NUMBER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Z0-9][A-Z0-9-]*$").expect("valid part number regex"));

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Part {
    pub part_number: String,
    pub description: String,
    pub revision: String,
    pub material: String,
    pub weight_kg: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub drawing_number: Option<String>,
    pub status: RecordStatus,
}

#[derive(Debug, Default, Clone, Copy)]
pub struct PartForm;

pub(crate) fn part_number_rules() -> Vec<Rule> {
    vec![
        Rule::required(),
        Rule::pattern(PART_NUMBER.clone())
            .with_message("Use upper-case letters, digits and dashes (e.g., PN-1001)"),
        Rule::max_length(32),
    ]
}

impl FormModel for PartForm {
    fn name(&self) -> &'static str {
        "part"
    }

    fn title(&self) -> &'static str {
        "Part"
    }

    fn schema(&self) -> Result<Schema> {
        Schema::builder()
            .field("partNumber", part_number_rules())
            .field("description", vec![Rule::required(), Rule::max_length(120)])
            .field("revision", vec![Rule::required(), Rule::max_length(8)])
            .field("material", vec![Rule::required()])
            .field("weightKg", vec![Rule::required(), Rule::positive()])
            .field("drawingNumber", vec![Rule::max_length(32)])
            .build()
    }

    fn steps(&self) -> Result<Vec<StepDefinition>> {
        Ok(vec![
            StepDefinition::new("Identification", &["partNumber", "description", "revision"])?,
            StepDefinition::new("Specification", &["material", "weightKg", "drawingNumber"])?,
            StepDefinition::review("Review"),
        ])
    }

    fn defaults(&self) -> Value {
        json!({
            "partNumber": "",
            "description": "",
            "revision": "A",
            "material": "",
            "weightKg": "",
            "drawingNumber": "",
            "active": true
        })
    }

    fn to_payload(&self, tree: &ValueTree) -> Result<Value> {
        let root = Reader::root(tree);
        common::encode(&Part {
            part_number: root.text("partNumber"),
            description: root.text("description"),
            revision: root.text("revision"),
            material: root.text("material"),
            weight_kg: root.number("weightKg"),
            drawing_number: root.opt_text("drawingNumber"),
            status: RecordStatus::from_flag(root.flag("active")),
        })
    }

    fn from_record(&self, record: &Value) -> Result<Value> {
        let part: Part = common::decode(self.name(), record)?;
        Ok(json!({
            "partNumber": part.part_number,
            "description": part.description,
            "revision": part.revision,
            "material": part.material,
            "weightKg": common::number_input(part.weight_kg),
            "drawingNumber": common::text_input(part.drawing_number.as_deref()),
            "active": part.status.is_active()
        }))
    }
}
