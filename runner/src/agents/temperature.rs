//! Demo agent that calls `get_temperature` once and answers in plain text.

use anyhow::Result;
use minijinja::context;

use crate::tools::ToolBox;
use crate::tools::temperature::{GET_TEMPERATURE, GetTemperature};

use super::{AgentDefinition, render_instructions};

const INSTRUCTIONS: &str = include_str!("prompts/temperature_check.md");

pub const DEFAULT_INPUT: &str = "What is the temperature in Gliwice?";

pub fn definition() -> Result<AgentDefinition> {
    let instructions = render_instructions(
        "temperature_check",
        INSTRUCTIONS,
        context! { temperature_tool => GET_TEMPERATURE },
    )?;
    Ok(AgentDefinition {
        name: "Temperature-Check",
        instructions,
        tools: ToolBox::new().with(GetTemperature),
        output: None,
        default_input: DEFAULT_INPUT,
    })
}
