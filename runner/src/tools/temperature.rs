//! `get_temperature`: fixed-answer demo tool for checking tool-call plumbing
//! against a model without involving a human.

use anyhow::Result;
use serde_json::{Value, json};
use tracing::info;

use crate::core::types::ToolSpec;

use super::{Tool, ToolContext, str_arg};

pub const GET_TEMPERATURE: &str = "get_temperature";

pub struct GetTemperature;

impl Tool for GetTemperature {
    fn spec(&self) -> ToolSpec {
        ToolSpec {
            name: GET_TEMPERATURE.to_string(),
            description: "Return the current temperature report for a place.".to_string(),
            parameters: json!({
                "type": "object",
                "properties": {
                    "place": {"type": "string", "description": "Name of the place."}
                },
                "required": ["place"],
                "additionalProperties": false
            }),
        }
    }

    fn call(&self, _ctx: &mut ToolContext<'_>, args: &Value) -> Result<Value> {
        let place = str_arg(args, "place")?;
        info!(place, "get_temperature called");
        let report = json!({
            "place": place,
            "temperature_c": 21.5,
            "temperature_f": 70.7,
            "conditions": "Sunny",
        });
        Ok(Value::String(report.to_string()))
    }
}
