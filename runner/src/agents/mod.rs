//! Agent definitions: instructions, bound tools and output contract.
//!
//! An agent is pure configuration. [`crate::conversation`] executes it
//! against a chat backend; this module only decides what the model is told,
//! which tools it may call and what shape its final answer must have.

use anyhow::{Context, Result, bail};
use clap::ValueEnum;
use jsonschema::Draft;
use minijinja::{Environment, Value as TemplateValue};
use serde_json::Value;

use crate::core::types::AgentOutput;
use crate::tools::ToolBox;

pub mod ishikawa;
pub mod temperature;
pub mod why5;

/// Agents selectable on the command line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum AgentKind {
    /// "5 Whys" interview following one causal chain.
    #[value(name = "why5")]
    Why5,
    /// Ishikawa (5M+E) interview mapping causes across categories.
    #[value(name = "ishikawa")]
    Ishikawa,
    /// Demo agent exercising a single fixed-answer tool.
    #[value(name = "temperature_check")]
    TemperatureCheck,
}

impl AgentKind {
    pub fn as_str(self) -> &'static str {
        match self {
            AgentKind::Why5 => "why5",
            AgentKind::Ishikawa => "ishikawa",
            AgentKind::TemperatureCheck => "temperature_check",
        }
    }

    /// Build the agent definition, rendering its instructions template.
    pub fn definition(self) -> Result<AgentDefinition> {
        match self {
            AgentKind::Why5 => why5::definition(),
            AgentKind::Ishikawa => ishikawa::definition(),
            AgentKind::TemperatureCheck => temperature::definition(),
        }
    }

    /// Render a final answer for the terminal.
    pub fn render(self, output: &AgentOutput) -> String {
        match output {
            AgentOutput::Text(text) => text.clone(),
            AgentOutput::Structured(value) => match self {
                AgentKind::Why5 => why5::render(value),
                AgentKind::Ishikawa => ishikawa::render(value),
                AgentKind::TemperatureCheck => pretty_json(value),
            },
        }
    }
}

/// Fully configured agent ready to run.
pub struct AgentDefinition {
    pub name: &'static str,
    pub instructions: String,
    pub tools: ToolBox,
    /// Final-answer contract; `None` means free text.
    pub output: Option<OutputSchema>,
    /// Opening user message when the CLI gets no `--input`.
    pub default_input: &'static str,
}

/// JSON Schema the final answer must satisfy.
#[derive(Debug, Clone)]
pub struct OutputSchema {
    pub name: &'static str,
    pub schema: Value,
}

impl OutputSchema {
    pub fn parse(name: &'static str, raw: &str) -> Result<Self> {
        let schema: Value =
            serde_json::from_str(raw).with_context(|| format!("parse {name} schema"))?;
        Ok(Self { name, schema })
    }

    /// Validate `instance` against the schema (Draft 2020-12).
    pub fn validate(&self, instance: &Value) -> Result<()> {
        let compiled = jsonschema::options()
            .with_draft(Draft::Draft202012)
            .build(&self.schema)
            .with_context(|| format!("compile {} schema", self.name))?;
        let messages: Vec<String> = compiled
            .iter_errors(instance)
            .map(|err| err.to_string())
            .collect();
        if !messages.is_empty() {
            bail!(
                "{} output failed schema validation:\n- {}",
                self.name,
                messages.join("\n- ")
            );
        }
        Ok(())
    }
}

/// Render an instructions template with `ctx`.
pub(crate) fn render_instructions(
    name: &str,
    template: &'static str,
    ctx: TemplateValue,
) -> Result<String> {
    let mut env = Environment::new();
    env.add_template(name, template)
        .with_context(|| format!("load {name} instructions template"))?;
    let rendered = env
        .get_template(name)?
        .render(ctx)
        .with_context(|| format!("render {name} instructions"))?;
    Ok(rendered.trim().to_string())
}

pub(crate) fn pretty_json(value: &Value) -> String {
    serde_json::to_string_pretty(value).unwrap_or_else(|_| value.to_string())
}

pub(crate) const RULE: &str =
    "================================================================================";
