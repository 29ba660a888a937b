//! Agent runtime: drives one conversation between a model, its tools and the
//! human until the model produces a final answer.

use std::fmt;
use std::num::NonZeroUsize;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use serde_json::Value;
use tracing::{debug, info, instrument};

use crate::agents::AgentDefinition;
use crate::core::budget::request_timeout;
use crate::core::session::SessionHistory;
use crate::core::topics::TopicRegistry;
use crate::core::types::{AgentOutput, ChatMessage, ChatRequest, ResponseFormat};
use crate::core::window::{conversation_context, extract_json_payload};
use crate::io::config::RunnerConfig;
use crate::io::events::{ConversationEvent, EventSink};
use crate::io::human::Human;
use crate::io::llm::ChatBackend;
use crate::tools::ToolContext;

/// Session id of the single interactive conversation.
pub const SESSION_ID: &str = "dorsz_cli";

/// Per-run knobs, usually derived from [`RunnerConfig`].
#[derive(Debug, Clone)]
pub struct ConversationSettings {
    pub model: String,
    /// Upper bound on model requests.
    pub max_turns: u32,
    /// Capacity of the sliding history window.
    pub history: NonZeroUsize,
    pub temperature: Option<f32>,
    pub max_tokens: Option<u32>,
    pub conversation_timeout: Duration,
    pub request_timeout: Duration,
    /// Opening user message, pinned at the head of every request.
    pub input: String,
}

impl ConversationSettings {
    pub fn from_config(cfg: &RunnerConfig, input: impl Into<String>) -> Result<Self> {
        Ok(Self {
            model: cfg.model.clone(),
            max_turns: cfg.max_turns,
            history: cfg.history_capacity()?,
            temperature: cfg.effective_temperature(),
            max_tokens: cfg.effective_max_tokens(),
            conversation_timeout: Duration::from_secs(cfg.conversation_timeout_secs),
            request_timeout: Duration::from_secs(cfg.request_timeout_secs),
            input: input.into(),
        })
    }
}

/// Result of a finished conversation.
#[derive(Debug)]
pub struct ConversationOutcome {
    pub output: AgentOutput,
    /// Model requests made, including the final one.
    pub turns: u32,
    /// Topics the agent registered along the way.
    pub topics: TopicRegistry,
}

/// The model kept calling tools past the configured turn limit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MaxTurnsExceededError {
    pub max_turns: u32,
}

impl fmt::Display for MaxTurnsExceededError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "no final answer after {} model turns (max_turns reached)",
            self.max_turns
        )
    }
}

impl std::error::Error for MaxTurnsExceededError {}

/// Run `agent` to completion.
///
/// Tool calls are executed strictly in the order the model issued them, one
/// at a time. A reply without tool calls is the final answer; structured
/// agents must return JSON that satisfies their output schema.
#[instrument(skip_all, fields(agent = agent.name, model = %settings.model))]
pub fn run_conversation(
    agent: &AgentDefinition,
    backend: &impl ChatBackend,
    human: &mut dyn Human,
    sink: &mut dyn EventSink,
    settings: &ConversationSettings,
) -> Result<ConversationOutcome> {
    let deadline = Instant::now() + settings.conversation_timeout;
    let mut history: SessionHistory<ChatMessage> = SessionHistory::new(SESSION_ID, settings.history);
    let mut topics = TopicRegistry::new();

    let tools = agent.tools.specs();
    let response_format = agent.output.as_ref().map(|schema| ResponseFormat {
        name: schema.name.to_string(),
        schema: schema.schema.clone(),
    });

    for turn in 1..=settings.max_turns {
        let timeout = request_timeout(deadline, settings.request_timeout)?;
        let request = ChatRequest {
            model: settings.model.clone(),
            messages: conversation_context(
                &agent.instructions,
                &settings.input,
                history.read_window(None),
            ),
            tools: tools.clone(),
            temperature: settings.temperature,
            max_tokens: settings.max_tokens,
            response_format: response_format.clone(),
        };
        debug!(turn, messages = request.messages.len(), "requesting model turn");

        let reply = backend
            .complete(&request, timeout)
            .with_context(|| format!("model request failed on turn {turn}"))?;

        if reply.tool_calls.is_empty() {
            let content = reply.content.unwrap_or_default();
            let output = final_output(agent, &content)?;
            info!(turns = turn, topics = topics.len(), "conversation finished");
            return Ok(ConversationOutcome {
                output,
                turns: turn,
                topics,
            });
        }

        if let Some(text) = &reply.content {
            sink.emit(&ConversationEvent::AgentMessage(text.clone()));
        }
        history.append([ChatMessage::assistant_tool_calls(
            reply.content.clone(),
            reply.tool_calls.clone(),
        )]);

        for call in &reply.tool_calls {
            sink.emit(&ConversationEvent::ToolCall {
                name: call.name.clone(),
                arguments: call.arguments.clone(),
            });
            let mut ctx = ToolContext {
                topics: &mut topics,
                human: &mut *human,
            };
            let output = agent.tools.dispatch(&mut ctx, call)?;
            sink.emit(&ConversationEvent::ToolResult {
                name: call.name.clone(),
                output: output.clone(),
            });
            history.append([ChatMessage::tool_result(call.id.clone(), output)]);
        }
    }

    Err(MaxTurnsExceededError {
        max_turns: settings.max_turns,
    }
    .into())
}

fn final_output(agent: &AgentDefinition, content: &str) -> Result<AgentOutput> {
    let Some(schema) = &agent.output else {
        return Ok(AgentOutput::Text(content.to_string()));
    };
    let value: Value = serde_json::from_str(extract_json_payload(content))
        .with_context(|| format!("{} final answer is not valid JSON", schema.name))?;
    schema.validate(&value)?;
    Ok(AgentOutput::Structured(value))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agents::AgentKind;
    use crate::core::types::Role;
    use crate::core::window::ORPHAN_NOTE_HEADER;
    use crate::io::events::NullSink;
    use crate::test_support::{
        RecordingSink, ScriptedBackend, ScriptedHuman, text_reply, tool_replies, tool_reply,
    };
    use crate::tools::ask_human::ASK_HUMAN;
    use crate::tools::temperature::GET_TEMPERATURE;
    use crate::tools::topics::{ADD_TOPIC, MARK_TOPIC_ANSWERED, NEXT_UNANSWERED_TOPIC};
    use serde_json::json;

    fn settings(max_turns: u32, history: usize) -> ConversationSettings {
        ConversationSettings {
            max_turns,
            history: NonZeroUsize::new(history).expect("non-zero"),
            ..ConversationSettings::from_config(&RunnerConfig::default(), "start")
                .expect("settings")
        }
    }

    fn why5_json() -> Value {
        json!({
            "problem_statement": "Builds fail on Fridays.",
            "why_chain": ["Cache is cold", "Runners are recycled on Thursday night"],
            "root_causes": ["Runner recycling schedule"],
            "corrective_actions": ["Move recycling to Sunday"],
            "key_insights": ["Schedules matter", "Caches hide cost"]
        })
    }

    #[test]
    fn text_agent_returns_final_text() {
        let agent = AgentKind::TemperatureCheck.definition().expect("agent");
        let backend = ScriptedBackend::new(vec![
            tool_reply("c1", GET_TEMPERATURE, json!({"place": "Gliwice"})),
            text_reply("It is 21.5 °C and sunny in Gliwice."),
        ]);
        let mut human = ScriptedHuman::new(Vec::<String>::new());
        let mut sink = RecordingSink::default();

        let outcome = run_conversation(&agent, &backend, &mut human, &mut sink, &settings(5, 4))
            .expect("run");

        assert_eq!(
            outcome.output,
            AgentOutput::Text("It is 21.5 °C and sunny in Gliwice.".to_string())
        );
        assert_eq!(outcome.turns, 2);
        assert_eq!(sink.events.len(), 2);
        assert!(matches!(
            &sink.events[0],
            ConversationEvent::ToolCall { name, .. } if name == GET_TEMPERATURE
        ));

        let requests = backend.requests();
        assert!(requests[0].response_format.is_none());
        let second = &requests[1].messages;
        assert_eq!(second.last().map(|m| m.role), Some(Role::Tool));
        assert!(
            second
                .last()
                .and_then(|m| m.content.as_deref())
                .is_some_and(|c| c.contains("21.5"))
        );
    }

    #[test]
    fn structured_agent_validates_fenced_json() {
        let agent = AgentKind::Why5.definition().expect("agent");
        let fenced = format!("```json\n{}\n```", why5_json());
        let backend = ScriptedBackend::new(vec![
            tool_reply("q1", ASK_HUMAN, json!({"question": "What problem?"})),
            text_reply(fenced),
        ]);
        let mut human = ScriptedHuman::new(["Builds fail on Fridays"]);

        let outcome =
            run_conversation(&agent, &backend, &mut human, &mut NullSink, &settings(5, 4))
                .expect("run");

        assert_eq!(outcome.output, AgentOutput::Structured(why5_json()));
        assert_eq!(human.questions(), ["What problem?"]);
        let first = &backend.requests()[0];
        assert_eq!(
            first.response_format.as_ref().map(|f| f.name.as_str()),
            Some("Why5Summary")
        );
        assert_eq!(first.messages[0].role, Role::System);
        assert_eq!(first.messages[1], ChatMessage::user("start"));
    }

    #[test]
    fn structured_agent_rejects_schema_violation() {
        let agent = AgentKind::Why5.definition().expect("agent");
        let mut bad = why5_json();
        bad["key_insights"] = json!(["only one"]);
        let backend = ScriptedBackend::new(vec![text_reply(bad.to_string())]);
        let mut human = ScriptedHuman::new(Vec::<String>::new());

        let err = run_conversation(&agent, &backend, &mut human, &mut NullSink, &settings(5, 4))
            .unwrap_err();
        assert!(format!("{err:#}").contains("Why5Summary output failed schema validation"));
    }

    #[test]
    fn structured_agent_rejects_non_json_answer() {
        let agent = AgentKind::Why5.definition().expect("agent");
        let backend = ScriptedBackend::new(vec![text_reply("The root cause is Friday.")]);
        let mut human = ScriptedHuman::new(Vec::<String>::new());

        let err = run_conversation(&agent, &backend, &mut human, &mut NullSink, &settings(5, 4))
            .unwrap_err();
        assert!(format!("{err:#}").contains("not valid JSON"));
    }

    #[test]
    fn turn_limit_is_a_typed_error() {
        let agent = AgentKind::TemperatureCheck.definition().expect("agent");
        let backend = ScriptedBackend::new(vec![
            tool_reply("c1", GET_TEMPERATURE, json!({"place": "A"})),
            tool_reply("c2", GET_TEMPERATURE, json!({"place": "B"})),
            text_reply("unused"),
        ]);
        let mut human = ScriptedHuman::new(Vec::<String>::new());

        let err = run_conversation(&agent, &backend, &mut human, &mut NullSink, &settings(2, 4))
            .unwrap_err();
        assert_eq!(
            err.downcast_ref::<MaxTurnsExceededError>(),
            Some(&MaxTurnsExceededError { max_turns: 2 })
        );
        assert_eq!(backend.remaining(), 1);
    }

    #[test]
    fn topics_live_for_one_conversation() {
        let agent = AgentKind::Ishikawa.definition().expect("agent");
        let script = || {
            vec![
                tool_replies(&[
                    ("t1", ADD_TOPIC, json!({"description": "night shift staffing"})),
                    ("t2", NEXT_UNANSWERED_TOPIC, json!({})),
                ]),
                tool_reply(
                    "t3",
                    MARK_TOPIC_ANSWERED,
                    json!({"index": 0, "conclusion": "one person short"}),
                ),
                text_reply("not json"),
            ]
        };

        for _ in 0..2 {
            let backend = ScriptedBackend::new(script());
            let mut human = ScriptedHuman::new(Vec::<String>::new());
            let mut sink = RecordingSink::default();
            let err =
                run_conversation(&agent, &backend, &mut human, &mut sink, &settings(5, 8))
                    .unwrap_err();
            assert!(format!("{err:#}").contains("not valid JSON"));

            // A fresh registry each run: the first topic is always index 0.
            let results: Vec<&str> = sink
                .events
                .iter()
                .filter_map(|event| match event {
                    ConversationEvent::ToolResult { output, .. } => Some(output.as_str()),
                    _ => None,
                })
                .collect();
            assert_eq!(results, ["0", "0", "true"]);
        }
    }

    #[test]
    fn results_of_an_evicted_tool_turn_still_reach_the_model() {
        let agent = AgentKind::Why5.definition().expect("agent");
        let backend = ScriptedBackend::new(vec![
            tool_replies(&[
                ("q1", ASK_HUMAN, json!({"question": "What problem?"})),
                ("q2", ASK_HUMAN, json!({"question": "Where?"})),
            ]),
            text_reply(why5_json().to_string()),
        ]);
        let mut human = ScriptedHuman::new(["deploys fail", "staging"]);

        run_conversation(&agent, &backend, &mut human, &mut NullSink, &settings(5, 2))
            .expect("run");

        // Window of two keeps only the tool results; their call was evicted.
        let last = backend.requests().pop().expect("request");
        assert_eq!(last.messages.len(), 3);
        assert!(last.messages.iter().all(|m| m.role != Role::Tool));
        assert_eq!(
            last.messages[2],
            ChatMessage::user(format!("{ORPHAN_NOTE_HEADER}\n- deploys fail\n- staging"))
        );
    }

    #[test]
    fn tool_failures_are_reported_to_the_model() {
        let agent = AgentKind::TemperatureCheck.definition().expect("agent");
        let backend = ScriptedBackend::new(vec![
            tool_reply("c1", "launch_rockets", json!({})),
            text_reply("done"),
        ]);
        let mut human = ScriptedHuman::new(Vec::<String>::new());
        let mut sink = RecordingSink::default();

        run_conversation(&agent, &backend, &mut human, &mut sink, &settings(5, 4)).expect("run");

        assert!(matches!(
            &sink.events[1],
            ConversationEvent::ToolResult { output, .. } if output.starts_with("error: unknown tool")
        ));
    }

    #[test]
    fn closed_human_input_aborts() {
        let agent = AgentKind::Why5.definition().expect("agent");
        let backend = ScriptedBackend::new(vec![tool_reply(
            "q1",
            ASK_HUMAN,
            json!({"question": "What problem?"}),
        )]);
        let mut human = ScriptedHuman::new(Vec::<String>::new());

        let err = run_conversation(&agent, &backend, &mut human, &mut NullSink, &settings(5, 4))
            .unwrap_err();
        assert!(format!("{err:#}").contains("human input unavailable"));
    }
}
