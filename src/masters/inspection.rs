//! Inspection definitions. Each parameter's required fields depend on its
//! data type, expressed as variant rules keyed by `dataType`.

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::errors::{FormError, Result};
use crate::form::{
    case, CollectionSpec, Comparison, FormModel, Rule, Schema, StepDefinition, ValueTree,
};

use super::common::{self, Reader, RecordStatus};

pub const CATEGORIES: [&str; 4] = ["INCOMING", "IN_PROCESS", "FINAL", "AUDIT"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ParameterType {
    Numeric,
    Text,
    Boolean,
}

impl ParameterType {
    fn parse(raw: &str) -> Result<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "numeric" => Ok(ParameterType::Numeric),
            "text" => Ok(ParameterType::Text),
            "boolean" => Ok(ParameterType::Boolean),
            other => Err(FormError::Payload(format!("unknown parameter type `{}`", other))),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InspectionDefinition {
    pub inspection_name: String,
    pub category: String,
    pub status: RecordStatus,
    pub parameters: Vec<InspectionParameter>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InspectionParameter {
    pub name: String,
    pub data_type: ParameterType,
    pub is_ctq: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_value: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_value: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unit: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expected_text: Option<String>,
}

#[derive(Debug, Default, Clone, Copy)]
pub struct InspectionForm;

fn blank_parameter() -> Value {
    json!({
        "name": "",
        "dataType": "numeric",
        "isCtq": false,
        "minValue": "",
        "maxValue": "",
        "unit": "",
        "expectedText": ""
    })
}

impl FormModel for InspectionForm {
    fn name(&self) -> &'static str {
        "inspection"
    }

    fn title(&self) -> &'static str {
        "Inspection definition"
    }

    fn schema(&self) -> Result<Schema> {
        Schema::builder()
            .field("inspectionName", vec![Rule::required(), Rule::max_length(80)])
            .field("category", vec![Rule::required(), Rule::one_of(CATEGORIES)])
            .field("parameters[*].name", vec![Rule::required()])
            .field(
                "parameters[*].dataType",
                vec![Rule::required(), Rule::one_of(["numeric", "text", "boolean"])],
            )
            .variant(
                "parameters[*]",
                "dataType",
                vec![
                    case(
                        "numeric",
                        vec![
                            ("minValue", vec![Rule::required(), Rule::number()]),
                            ("maxValue", vec![Rule::required(), Rule::number()]),
                            ("unit", vec![Rule::required()]),
                        ],
                    ),
                    case("text", vec![("expectedText", vec![Rule::required()])]),
                ],
            )
            .compare(
                "parameters[*]",
                "minValue",
                Comparison::Le,
                "maxValue",
                "Min value must not exceed max value",
            )
            .min_items("parameters", 1, "Add at least one parameter")
            .unique_ignore_case("parameters", "name", "Parameter names must be unique")
            .build()
    }

    fn steps(&self) -> Result<Vec<StepDefinition>> {
        Ok(vec![
            StepDefinition::new("Basic information", &["inspectionName", "category"])?,
            StepDefinition::new("Parameters", &["parameters"])?,
            StepDefinition::review("Review"),
        ])
    }

    fn collections(&self) -> Result<Vec<CollectionSpec>> {
        Ok(vec![CollectionSpec::new("parameters", blank_parameter())?])
    }

    fn defaults(&self) -> Value {
        json!({
            "inspectionName": "",
            "category": "",
            "active": true,
            "parameters": [blank_parameter()]
        })
    }

    fn to_payload(&self, tree: &ValueTree) -> Result<Value> {
        let root = Reader::root(tree);
        let parameters = root
            .items("parameters")
            .iter()
            .map(|row| {
                let data_type = ParameterType::parse(&row.text("dataType"))?;
                let numeric = data_type == ParameterType::Numeric;
                Ok(InspectionParameter {
                    name: row.text("name"),
                    data_type,
                    is_ctq: row.flag("isCtq"),
                    min_value: row.number("minValue").filter(|_| numeric),
                    max_value: row.number("maxValue").filter(|_| numeric),
                    unit: row.opt_text("unit").filter(|_| numeric),
                    expected_text: row
                        .opt_text("expectedText")
                        .filter(|_| data_type == ParameterType::Text),
                })
            })
            .collect::<Result<Vec<_>>>()?;
        common::encode(&InspectionDefinition {
            inspection_name: root.text("inspectionName"),
            category: root.text("category").to_uppercase(),
            status: RecordStatus::from_flag(root.flag("active")),
            parameters,
        })
    }

    fn from_record(&self, record: &Value) -> Result<Value> {
        let definition: InspectionDefinition = common::decode(self.name(), record)?;
        let rows: Vec<Value> = definition
            .parameters
            .iter()
            .map(|row| {
                common::object([
                    ("name", Value::String(row.name.clone())),
                    ("dataType", serde_json::to_value(row.data_type).unwrap_or_default()),
                    ("isCtq", Value::Bool(row.is_ctq)),
                    ("minValue", common::number_input(row.min_value)),
                    ("maxValue", common::number_input(row.max_value)),
                    ("unit", common::text_input(row.unit.as_deref())),
                    ("expectedText", common::text_input(row.expected_text.as_deref())),
                ])
            })
            .collect();
        Ok(json!({
            "inspectionName": definition.inspection_name,
            "category": definition.category,
            "active": definition.status.is_active(),
            "parameters": rows
        }))
    }
}
