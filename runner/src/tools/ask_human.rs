//! `ask_human`: route a question from the model to the person being interviewed.

use anyhow::Result;
use serde_json::{Value, json};

use crate::core::types::ToolSpec;

use super::{HumanUnavailable, Tool, ToolContext, str_arg};

pub const ASK_HUMAN: &str = "ask_human";

pub struct AskHuman;

impl Tool for AskHuman {
    fn spec(&self) -> ToolSpec {
        ToolSpec {
            name: ASK_HUMAN.to_string(),
            description: "Ask the user a single question and return their answer as text."
                .to_string(),
            parameters: json!({
                "type": "object",
                "properties": {
                    "question": {
                        "type": "string",
                        "description": "The question to show the user."
                    }
                },
                "required": ["question"],
                "additionalProperties": false
            }),
        }
    }

    fn call(&self, ctx: &mut ToolContext<'_>, args: &Value) -> Result<Value> {
        let question = str_arg(args, "question")?;
        let answer = ctx
            .human
            .ask(question)
            .map_err(|err| anyhow::Error::new(HumanUnavailable(format!("{err:#}"))))?;
        Ok(Value::String(answer))
    }
}
