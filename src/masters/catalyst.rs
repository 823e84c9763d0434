//! Catalyst charts: a named catalyst with one or more temperature/quantity
//! configurations.

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::errors::Result;
use crate::form::{
    CollectionSpec, Comparison, FormModel, Rule, Schema, StepDefinition, ValueTree,
};

use super::common::{self, Reader, RecordStatus};

pub const UNITS: [&str; 3] = ["kg", "g", "l"];

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CatalystChart {
    pub chart_name: String,
    pub catalyst_type: String,
    pub status: RecordStatus,
    pub catalyst_configuration: Vec<CatalystConfiguration>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CatalystConfiguration {
    pub min_temperature: Option<f64>,
    pub max_temperature: Option<f64>,
    pub quantity: Option<f64>,
    pub unit: String,
}

#[derive(Debug, Default, Clone, Copy)]
pub struct CatalystChartForm;

fn blank_configuration() -> Value {
    json!({
        "minTemperature": "",
        "maxTemperature": "",
        "quantity": "",
        "unit": "kg"
    })
}

impl FormModel for CatalystChartForm {
    fn name(&self) -> &'static str {
        "catalyst"
    }

    fn title(&self) -> &'static str {
        "Catalyst chart"
    }

    fn schema(&self) -> Result<Schema> {
        let item = "catalystConfiguration[*]";
        Schema::builder()
            .field("chartName", vec![Rule::required(), Rule::max_length(80)])
            .field("catalystType", vec![Rule::required()])
            .field(
                &format!("{item}.minTemperature"),
                vec![Rule::required(), Rule::number()],
            )
            .field(
                &format!("{item}.maxTemperature"),
                vec![Rule::required(), Rule::number()],
            )
            .field(
                &format!("{item}.quantity"),
                vec![Rule::required(), Rule::positive()],
            )
            .field(&format!("{item}.unit"), vec![Rule::required(), Rule::one_of(UNITS)])
            .compare(
                item,
                "minTemperature",
                Comparison::Le,
                "maxTemperature",
                "Min temperature must not exceed max temperature",
            )
            .min_items("catalystConfiguration", 1, "Add at least one configuration")
            .build()
    }

    fn steps(&self) -> Result<Vec<StepDefinition>> {
        Ok(vec![
            StepDefinition::new("Basic information", &["chartName", "catalystType"])?,
            StepDefinition::new("Configurations", &["catalystConfiguration"])?,
            StepDefinition::review("Review"),
        ])
    }

    fn collections(&self) -> Result<Vec<CollectionSpec>> {
        Ok(vec![CollectionSpec::new(
            "catalystConfiguration",
            blank_configuration(),
        )?])
    }

    fn defaults(&self) -> Value {
        json!({
            "chartName": "",
            "catalystType": "",
            "active": true,
            "catalystConfiguration": [blank_configuration()]
        })
    }

    fn to_payload(&self, tree: &ValueTree) -> Result<Value> {
        let root = Reader::root(tree);
        let chart = CatalystChart {
            chart_name: root.text("chartName"),
            catalyst_type: root.text("catalystType"),
            status: RecordStatus::from_flag(root.flag("active")),
            catalyst_configuration: root
                .items("catalystConfiguration")
                .iter()
                .map(|row| CatalystConfiguration {
                    min_temperature: row.number("minTemperature"),
                    max_temperature: row.number("maxTemperature"),
                    quantity: row.number("quantity"),
                    unit: row.text("unit").to_lowercase(),
                })
                .collect(),
        };
        common::encode(&chart)
    }

    fn from_record(&self, record: &Value) -> Result<Value> {
        let chart: CatalystChart = common::decode(self.name(), record)?;
        let rows: Vec<Value> = chart
            .catalyst_configuration
            .iter()
            .map(|row| {
                common::object([
                    ("minTemperature", common::number_input(row.min_temperature)),
                    ("maxTemperature", common::number_input(row.max_temperature)),
                    ("quantity", common::number_input(row.quantity)),
                    ("unit", Value::String(row.unit.clone())),
                ])
            })
            .collect();
        Ok(json!({
            "chartName": chart.chart_name,
            "catalystType": chart.catalyst_type,
            "active": chart.status.is_active(),
            "catalystConfiguration": rows
        }))
    }
}
