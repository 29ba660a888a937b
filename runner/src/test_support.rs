//! Test-only scripted collaborators: a chat backend that replays canned
//! replies and a human that answers from a fixed list.

use std::cell::RefCell;
use std::collections::VecDeque;
use std::time::Duration;

use anyhow::{Result, anyhow};

use crate::core::types::{ChatRequest, ChatResponse, ToolCall};
use crate::io::events::{ConversationEvent, EventSink};
use crate::io::human::Human;
use crate::io::llm::ChatBackend;

/// Backend that returns queued responses in order and records every request.
pub struct ScriptedBackend {
    responses: RefCell<VecDeque<ChatResponse>>,
    requests: RefCell<Vec<ChatRequest>>,
}

impl ScriptedBackend {
    pub fn new(responses: Vec<ChatResponse>) -> Self {
        Self {
            responses: RefCell::new(responses.into()),
            requests: RefCell::new(Vec::new()),
        }
    }

    /// Requests seen so far, oldest first.
    pub fn requests(&self) -> Vec<ChatRequest> {
        self.requests.borrow().clone()
    }

    pub fn remaining(&self) -> usize {
        self.responses.borrow().len()
    }
}

impl ChatBackend for ScriptedBackend {
    fn complete(&self, request: &ChatRequest, _timeout: Duration) -> Result<ChatResponse> {
        self.requests.borrow_mut().push(request.clone());
        self.responses
            .borrow_mut()
            .pop_front()
            .ok_or_else(|| anyhow!("scripted backend exhausted"))
    }
}

/// Human that answers questions from a queue and remembers what was asked.
pub struct ScriptedHuman {
    answers: VecDeque<String>,
    questions: Vec<String>,
}

impl ScriptedHuman {
    pub fn new<S: Into<String>>(answers: impl IntoIterator<Item = S>) -> Self {
        Self {
            answers: answers.into_iter().map(Into::into).collect(),
            questions: Vec::new(),
        }
    }

    pub fn questions(&self) -> &[String] {
        &self.questions
    }
}

impl Human for ScriptedHuman {
    fn ask(&mut self, question: &str) -> Result<String> {
        self.questions.push(question.to_string());
        self.answers
            .pop_front()
            .ok_or_else(|| anyhow!("no scripted answer for {question:?}"))
    }
}

/// Reply that requests a single tool call.
pub fn tool_reply(id: &str, name: &str, arguments: serde_json::Value) -> ChatResponse {
    tool_replies(&[(id, name, arguments)])
}

/// Reply that requests several tool calls in one assistant turn.
pub fn tool_replies(calls: &[(&str, &str, serde_json::Value)]) -> ChatResponse {
    ChatResponse {
        content: None,
        tool_calls: calls
            .iter()
            .map(|(id, name, arguments)| ToolCall {
                id: id.to_string(),
                name: name.to_string(),
                arguments: arguments.to_string(),
            })
            .collect(),
    }
}

/// Final text reply without tool calls.
pub fn text_reply(text: impl Into<String>) -> ChatResponse {
    ChatResponse {
        content: Some(text.into()),
        tool_calls: Vec::new(),
    }
}

/// Sink that keeps every event for later assertions.
#[derive(Debug, Default)]
pub struct RecordingSink {
    pub events: Vec<ConversationEvent>,
}

impl EventSink for RecordingSink {
    fn emit(&mut self, event: &ConversationEvent) {
        self.events.push(event.clone());
    }
}
