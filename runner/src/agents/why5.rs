//! "5 Whys" agent: follow a single causal chain at most five levels deep.

use anyhow::Result;
use minijinja::context;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::tools::ToolBox;
use crate::tools::ask_human::{ASK_HUMAN, AskHuman};

use super::{AgentDefinition, OutputSchema, RULE, pretty_json, render_instructions};

const INSTRUCTIONS: &str = include_str!("prompts/why5.md");
const OUTPUT_SCHEMA: &str = include_str!("../../schemas/why5_summary.schema.json");

/// Deepest level of the "why?" chain the agent may pursue.
pub const MAX_WHY_DEPTH: usize = 5;

pub const DEFAULT_INPUT: &str =
    "Ask me about the problem I want to analyse with the '5 Whys' technique.";

/// Final answer of a "5 Whys" interview.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Why5Summary {
    pub problem_statement: String,
    /// Consecutive answers to "why?", in order.
    pub why_chain: Vec<String>,
    pub root_causes: Vec<String>,
    pub corrective_actions: Vec<String>,
    pub key_insights: Vec<String>,
}

pub fn definition() -> Result<AgentDefinition> {
    let instructions = render_instructions(
        "why5",
        INSTRUCTIONS,
        context! {
            ask_tool => ASK_HUMAN,
            max_depth => MAX_WHY_DEPTH,
        },
    )?;
    Ok(AgentDefinition {
        name: "Why5",
        instructions,
        tools: ToolBox::new().with(AskHuman),
        output: Some(OutputSchema::parse("Why5Summary", OUTPUT_SCHEMA)?),
        default_input: DEFAULT_INPUT,
    })
}

/// Render a validated summary; unexpected shapes fall back to pretty JSON.
pub fn render(value: &Value) -> String {
    match serde_json::from_value::<Why5Summary>(value.clone()) {
        Ok(summary) => render_summary(&summary),
        Err(_) => pretty_json(value),
    }
}

pub fn render_summary(summary: &Why5Summary) -> String {
    let mut lines = vec![
        RULE.to_string(),
        "'5 WHYS' ANALYSIS SUMMARY".to_string(),
        RULE.to_string(),
        format!("\nProblem: {}", summary.problem_statement),
        "\nChain of 'Why?':".to_string(),
    ];
    lines.extend(numbered(&summary.why_chain));

    lines.push("\nMain root causes:".to_string());
    lines.extend(summary.root_causes.iter().map(|cause| format!("  • {cause}")));

    lines.push("\nProposed corrective actions:".to_string());
    lines.extend(numbered(&summary.corrective_actions));

    lines.push("\nKey insights:".to_string());
    lines.extend(numbered(&summary.key_insights));

    lines.push(format!("\n{RULE}"));
    lines.join("\n")
}

fn numbered(items: &[String]) -> impl Iterator<Item = String> + '_ {
    items
        .iter()
        .enumerate()
        .map(|(idx, item)| format!("  {}. {item}", idx + 1))
}
