//! Ishikawa (5M+E) agent: map causes across six categories, parking side
//! threads in the topic registry.

use std::fmt;

use anyhow::Result;
use minijinja::context;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::tools::ToolBox;
use crate::tools::ask_human::{ASK_HUMAN, AskHuman};
use crate::tools::topics::{
    ADD_TOPIC, AddTopic, GET_TOPICS_SUMMARY, GetTopicsSummary, MARK_TOPIC_ANSWERED,
    MarkTopicAnswered, NEXT_UNANSWERED_TOPIC, NextUnansweredTopic,
};

use super::{AgentDefinition, OutputSchema, RULE, pretty_json, render_instructions};

const INSTRUCTIONS: &str = include_str!("prompts/ishikawa.md");
const OUTPUT_SCHEMA: &str = include_str!("../../schemas/ishikawa_summary.schema.json");

pub const DEFAULT_INPUT: &str =
    "Ask me about the problem I want to analyse with an Ishikawa (5M+E) diagram.";

/// Targets shown per corrective action before collapsing into "+ N more".
const SHOWN_TARGETS: usize = 2;

/// Ishikawa categories, in the order they are walked and rendered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum IshikawaCategory {
    Man,
    Machine,
    Material,
    Method,
    Measurement,
    Environment,
}

impl IshikawaCategory {
    pub const ALL: [IshikawaCategory; 6] = [
        IshikawaCategory::Man,
        IshikawaCategory::Machine,
        IshikawaCategory::Material,
        IshikawaCategory::Method,
        IshikawaCategory::Measurement,
        IshikawaCategory::Environment,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            IshikawaCategory::Man => "Man",
            IshikawaCategory::Machine => "Machine",
            IshikawaCategory::Material => "Material",
            IshikawaCategory::Method => "Method",
            IshikawaCategory::Measurement => "Measurement",
            IshikawaCategory::Environment => "Environment",
        }
    }

    /// What belongs in the category, as explained to the model.
    pub fn scope(self) -> &'static str {
        match self {
            IshikawaCategory::Man => "skills, habits, motivation, communication, workload",
            IshikawaCategory::Machine => {
                "equipment, tools, software, IT systems, configuration"
            }
            IshikawaCategory::Material => {
                "quality and availability of materials, components, input data"
            }
            IshikawaCategory::Method => {
                "processes, procedures, standards, instructions, responsibilities"
            }
            IshikawaCategory::Measurement => {
                "metrics, how things are measured, measuring tools, reporting; this is about \
                 measuring and monitoring, not about managing people or company structure"
            }
            IshikawaCategory::Environment => {
                "working conditions, organisational culture, time pressure, market and \
                 regulatory surroundings"
            }
        }
    }
}

impl fmt::Display for IshikawaCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Priority {
    High,
    Medium,
    Low,
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Priority::High => "High",
            Priority::Medium => "Medium",
            Priority::Low => "Low",
        };
        f.write_str(label)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IshikawaRootCause {
    pub description: String,
    pub category: IshikawaCategory,
    /// How far the follow-up "why?" questions went inside the category (1-10).
    pub depth_level: u8,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IshikawaCorrectiveAction {
    pub action: String,
    /// Descriptions of the causes this action addresses.
    pub target_causes: Vec<String>,
    pub priority: Priority,
}

/// Final answer of an Ishikawa interview.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IshikawaSummary {
    pub problem_statement: String,
    pub root_causes: Vec<IshikawaRootCause>,
    pub corrective_actions: Vec<IshikawaCorrectiveAction>,
    pub key_insights: Vec<String>,
}

#[derive(Serialize)]
struct CategoryContext {
    name: &'static str,
    scope: &'static str,
}

pub fn definition() -> Result<AgentDefinition> {
    let tools = ToolBox::new()
        .with(AskHuman)
        .with(AddTopic)
        .with(MarkTopicAnswered)
        .with(NextUnansweredTopic)
        .with(GetTopicsSummary);
    let categories: Vec<CategoryContext> = IshikawaCategory::ALL
        .iter()
        .map(|category| CategoryContext {
            name: category.as_str(),
            scope: category.scope(),
        })
        .collect();
    let instructions = render_instructions(
        "ishikawa",
        INSTRUCTIONS,
        context! {
            ask_tool => ASK_HUMAN,
            categories => categories,
            add_topic => ADD_TOPIC,
            mark_answered => MARK_TOPIC_ANSWERED,
            next_topic => NEXT_UNANSWERED_TOPIC,
            topics_summary => GET_TOPICS_SUMMARY,
        },
    )?;
    Ok(AgentDefinition {
        name: "Ishikawa",
        instructions,
        tools,
        output: Some(OutputSchema::parse("IshikawaSummary", OUTPUT_SCHEMA)?),
        default_input: DEFAULT_INPUT,
    })
}

/// Render a validated summary; unexpected shapes fall back to pretty JSON.
pub fn render(value: &Value) -> String {
    match serde_json::from_value::<IshikawaSummary>(value.clone()) {
        Ok(summary) => render_summary(&summary),
        Err(_) => pretty_json(value),
    }
}

pub fn render_summary(summary: &IshikawaSummary) -> String {
    let mut lines = vec![
        RULE.to_string(),
        "ISHIKAWA ANALYSIS SUMMARY (5M+E)".to_string(),
        RULE.to_string(),
        format!("\nProblem: {}", summary.problem_statement),
        format!("\nRoot causes found ({}):", summary.root_causes.len()),
    ];

    for category in IshikawaCategory::ALL {
        let mut causes: Vec<&IshikawaRootCause> = summary
            .root_causes
            .iter()
            .filter(|cause| cause.category == category)
            .collect();
        if causes.is_empty() {
            continue;
        }
        causes.sort_by_key(|cause| cause.depth_level);
        lines.push(format!("\n  {category}:"));
        for cause in causes {
            lines.push(format!(
                "     • {} (depth: {})",
                cause.description, cause.depth_level
            ));
        }
    }

    lines.push(format!(
        "\nCorrective actions ({}):",
        summary.corrective_actions.len()
    ));
    for (idx, action) in summary.corrective_actions.iter().enumerate() {
        lines.push(format!("\n  {}. [{}] {}", idx + 1, action.priority, action.action));
        lines.push(format!("     Addresses: {}", format_targets(&action.target_causes)));
    }

    lines.push("\nKey insights:".to_string());
    for (idx, insight) in summary.key_insights.iter().enumerate() {
        lines.push(format!("  {}. {insight}", idx + 1));
    }

    lines.push(format!("\n{RULE}"));
    lines.join("\n")
}

fn format_targets(targets: &[String]) -> String {
    let shown = targets
        .iter()
        .take(SHOWN_TARGETS)
        .map(String::as_str)
        .collect::<Vec<_>>()
        .join(", ");
    match targets.len().checked_sub(SHOWN_TARGETS) {
        Some(extra) if extra > 0 => format!("{shown} + {extra} more"),
        _ => shown,
    }
}
