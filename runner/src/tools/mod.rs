//! Callable tools exposed to the model.
//!
//! A [`Tool`] advertises a JSON-schema signature and runs against a
//! [`ToolContext`] holding the per-conversation state it may touch. The
//! runtime invokes tools strictly one at a time, so tools borrow that state
//! mutably without any locking.

use anyhow::{Context, Result, anyhow};
use serde_json::Value;
use tracing::{debug, warn};

use crate::core::topics::TopicRegistry;
use crate::core::types::{ToolCall, ToolSpec};
use crate::io::human::Human;

pub mod ask_human;
pub mod temperature;
pub mod topics;

/// Mutable state a tool call may read or change.
pub struct ToolContext<'a> {
    pub topics: &'a mut TopicRegistry,
    pub human: &'a mut dyn Human,
}

/// A function the model can call by name.
pub trait Tool {
    /// Name, description and parameter schema sent to the model.
    fn spec(&self) -> ToolSpec;

    /// Run the tool with already-parsed JSON arguments.
    fn call(&self, ctx: &mut ToolContext<'_>, args: &Value) -> Result<Value>;
}

/// Ordered set of tools bound to one agent.
#[derive(Default)]
pub struct ToolBox {
    tools: Vec<Box<dyn Tool>>,
}

impl ToolBox {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, tool: impl Tool + 'static) -> Self {
        self.tools.push(Box::new(tool));
        self
    }

    pub fn specs(&self) -> Vec<ToolSpec> {
        self.tools.iter().map(|tool| tool.spec()).collect()
    }

    pub fn names(&self) -> Vec<String> {
        self.tools.iter().map(|tool| tool.spec().name).collect()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }

    /// Execute `call` and return the text fed back to the model.
    ///
    /// Failures (unknown tool, malformed arguments, tool errors) become an
    /// `error: ...` result so the model can correct itself; only the human
    /// input channel closing aborts, because the interview cannot continue.
    pub fn dispatch(&self, ctx: &mut ToolContext<'_>, call: &ToolCall) -> Result<String> {
        match self.try_dispatch(ctx, call) {
            Ok(value) => Ok(render_output(&value)),
            Err(err) if err.downcast_ref::<HumanUnavailable>().is_some() => Err(err),
            Err(err) => {
                warn!(tool = %call.name, error = %format!("{err:#}"), "tool call failed");
                Ok(format!("error: {err:#}"))
            }
        }
    }

    fn try_dispatch(&self, ctx: &mut ToolContext<'_>, call: &ToolCall) -> Result<Value> {
        let tool = self
            .tools
            .iter()
            .find(|tool| tool.spec().name == call.name)
            .ok_or_else(|| anyhow!("unknown tool `{}`", call.name))?;
        let args = parse_arguments(&call.arguments)
            .with_context(|| format!("invalid arguments for `{}`", call.name))?;
        debug!(tool = %call.name, "invoking tool");
        tool.call(ctx, &args)
    }
}

/// Marker error: the human side of the conversation went away.
#[derive(Debug)]
pub struct HumanUnavailable(pub String);

impl std::fmt::Display for HumanUnavailable {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "human input unavailable: {}", self.0)
    }
}

impl std::error::Error for HumanUnavailable {}

fn parse_arguments(raw: &str) -> Result<Value> {
    if raw.trim().is_empty() {
        return Ok(Value::Object(Default::default()));
    }
    let value: Value = serde_json::from_str(raw).context("arguments are not valid JSON")?;
    if !value.is_object() {
        return Err(anyhow!("arguments must be a JSON object"));
    }
    Ok(value)
}

/// Strings go back verbatim; other values as compact JSON.
fn render_output(value: &Value) -> String {
    match value {
        Value::String(text) => text.clone(),
        other => other.to_string(),
    }
}

/// Required string argument.
pub(crate) fn str_arg<'v>(args: &'v Value, name: &str) -> Result<&'v str> {
    match args.get(name) {
        Some(Value::String(text)) => Ok(text),
        Some(other) => Err(anyhow!("`{name}` must be a string, got {other}")),
        None => Err(anyhow!("missing required argument `{name}`")),
    }
}

/// Required integer argument. Integral floats and numeric strings are
/// accepted since small models often emit `"1"` or `1.0`.
pub(crate) fn int_arg(args: &Value, name: &str) -> Result<i64> {
    let value = args
        .get(name)
        .ok_or_else(|| anyhow!("missing required argument `{name}`"))?;
    let parsed = match value {
        Value::Number(num) => num
            .as_i64()
            .or_else(|| num.as_f64().filter(|f| f.fract() == 0.0).map(|f| f as i64)),
        Value::String(text) => text.trim().parse::<i64>().ok(),
        _ => None,
    };
    parsed.ok_or_else(|| anyhow!("`{name}` must be an integer, got {value}"))
}
