//! Topic registry tools: the model's handle on the investigation ledger.
//!
//! Wire contract:
//!
//! | tool                    | arguments                              | result              |
//! |-------------------------|----------------------------------------|---------------------|
//! | `add_topic`             | `description: string`                  | new index           |
//! | `mark_topic_answered`   | `index: integer`, `conclusion: string` | `true` / `false`    |
//! | `next_unanswered_topic` | none                                   | index or `-1`       |
//! | `get_topics_summary`    | none                                   | multi-line summary  |

use anyhow::Result;
use serde_json::{Value, json};

use crate::core::types::ToolSpec;

use super::{Tool, ToolContext, int_arg, str_arg};

pub const ADD_TOPIC: &str = "add_topic";
pub const MARK_TOPIC_ANSWERED: &str = "mark_topic_answered";
pub const NEXT_UNANSWERED_TOPIC: &str = "next_unanswered_topic";
pub const GET_TOPICS_SUMMARY: &str = "get_topics_summary";

fn no_parameters() -> Value {
    json!({"type": "object", "properties": {}, "additionalProperties": false})
}

pub struct AddTopic;

impl Tool for AddTopic {
    fn spec(&self) -> ToolSpec {
        ToolSpec {
            name: ADD_TOPIC.to_string(),
            description: "Register a new topic to investigate and return its zero-based index. \
                New topics start as not asked and without a conclusion. Keep the description \
                short (1-2 sentences), specific and actionable; remember the returned index \
                to mark the topic answered later."
                .to_string(),
            parameters: json!({
                "type": "object",
                "properties": {
                    "description": {
                        "type": "string",
                        "description": "Short description of the topic (1-2 sentences)."
                    }
                },
                "required": ["description"],
                "additionalProperties": false
            }),
        }
    }

    fn call(&self, ctx: &mut ToolContext<'_>, args: &Value) -> Result<Value> {
        let description = str_arg(args, "description")?;
        Ok(json!(ctx.topics.add(description)))
    }
}

pub struct MarkTopicAnswered;

impl Tool for MarkTopicAnswered {
    fn spec(&self) -> ToolSpec {
        ToolSpec {
            name: MARK_TOPIC_ANSWERED.to_string(),
            description: "Record the final conclusion for a topic once the user has provided \
                enough information. Also marks the topic as asked. Returns true on success, \
                false when the index does not exist."
                .to_string(),
            parameters: json!({
                "type": "object",
                "properties": {
                    "index": {
                        "type": "integer",
                        "description": "Zero-based index of the topic."
                    },
                    "conclusion": {
                        "type": "string",
                        "description": "Concise but explicit conclusion for the topic."
                    }
                },
                "required": ["index", "conclusion"],
                "additionalProperties": false
            }),
        }
    }

    fn call(&self, ctx: &mut ToolContext<'_>, args: &Value) -> Result<Value> {
        let index = int_arg(args, "index")?;
        let conclusion = str_arg(args, "conclusion")?;
        Ok(json!(ctx.topics.mark_answered(index, conclusion)))
    }
}

pub struct NextUnansweredTopic;

impl Tool for NextUnansweredTopic {
    fn spec(&self) -> ToolSpec {
        ToolSpec {
            name: NEXT_UNANSWERED_TOPIC.to_string(),
            description: "Return the index of the oldest topic that has no conclusion yet, or \
                -1 when every topic is answered or none exist. Ask the user about that topic, \
                then call mark_topic_answered; on -1 proceed to the final summary."
                .to_string(),
            parameters: no_parameters(),
        }
    }

    fn call(&self, ctx: &mut ToolContext<'_>, _args: &Value) -> Result<Value> {
        let index = ctx
            .topics
            .next_unanswered()
            .map_or(-1, |idx| i64::try_from(idx).unwrap_or(i64::MAX));
        Ok(json!(index))
    }
}

pub struct GetTopicsSummary;

impl Tool for GetTopicsSummary {
    fn spec(&self) -> ToolSpec {
        ToolSpec {
            name: GET_TOPICS_SUMMARY.to_string(),
            description: "Return a readable summary of all topics, one per line, formatted as \
                `[index] OPEN|ANSWERED (asked|not-asked) :: description[ | conclusion: ...]`."
                .to_string(),
            parameters: no_parameters(),
        }
    }

    fn call(&self, ctx: &mut ToolContext<'_>, _args: &Value) -> Result<Value> {
        Ok(Value::String(ctx.topics.summary()))
    }
}
