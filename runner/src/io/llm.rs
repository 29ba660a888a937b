//! Chat backend abstraction for model invocation.
//!
//! The [`ChatBackend`] trait decouples the conversation loop from the actual
//! transport (an OpenAI-compatible `/chat/completions` endpoint). Tests use
//! scripted backends that replay predetermined responses without a network.

use std::time::Duration;

use anyhow::{Context, Result, anyhow};
use reqwest::blocking::Client;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use tracing::{debug, instrument, warn};

use crate::core::types::{ChatMessage, ChatRequest, ChatResponse, Role, ToolCall};
use crate::io::config::{ProviderKind, RunnerConfig};

/// Abstraction over chat-completion backends.
pub trait ChatBackend {
    /// Send one request and return the model's reply.
    fn complete(&self, request: &ChatRequest, timeout: Duration) -> Result<ChatResponse>;
}

/// Backend speaking the OpenAI chat-completions protocol.
///
/// Works with OpenAI itself and with local servers exposing the same API
/// (LM Studio, Ollama, llama.cpp).
pub struct OpenAiCompatBackend {
    client: Client,
    base_url: String,
    api_key: Option<String>,
}

impl OpenAiCompatBackend {
    pub fn new(base_url: impl Into<String>, api_key: Option<String>) -> Result<Self> {
        let client = Client::builder().build().context("build http client")?;
        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key,
        })
    }

    /// Backend for the provider selected in `cfg`.
    pub fn from_config(cfg: &RunnerConfig) -> Result<Self> {
        let provider = cfg.active_provider();
        let api_key = provider.api_key.clone().filter(|k| !k.trim().is_empty());
        if api_key.is_none() && cfg.provider == ProviderKind::Openai {
            return Err(anyhow!("OPENAI_API_KEY is not set (required for provider openai)"));
        }
        Self::new(provider.base_url.clone(), api_key)
    }

    fn endpoint(&self) -> String {
        format!("{}/chat/completions", self.base_url)
    }
}

impl ChatBackend for OpenAiCompatBackend {
    #[instrument(skip_all, fields(model = %request.model, messages = request.messages.len(), tools = request.tools.len()))]
    fn complete(&self, request: &ChatRequest, timeout: Duration) -> Result<ChatResponse> {
        let body = WireRequest::from_request(request);
        debug!(endpoint = %self.endpoint(), "sending chat completion request");

        let mut http = self
            .client
            .post(self.endpoint())
            .timeout(timeout)
            .json(&body);
        if let Some(key) = &self.api_key {
            http = http.bearer_auth(key);
        }

        let response = http
            .send()
            .with_context(|| format!("POST {}", self.endpoint()))?;
        let status = response.status();
        if !status.is_success() {
            let text = response.text().unwrap_or_default();
            warn!(status = status.as_u16(), "chat completion request failed");
            return Err(anyhow!(
                "chat completion failed with status {}: {}",
                status.as_u16(),
                text.trim()
            ));
        }

        let parsed: WireResponse = response.json().context("parse chat completion response")?;
        let reply = parsed.into_response()?;
        debug!(
            tool_calls = reply.tool_calls.len(),
            has_content = reply.content.is_some(),
            "received chat completion"
        );
        Ok(reply)
    }
}

#[derive(Serialize)]
struct WireRequest<'a> {
    model: &'a str,
    messages: Vec<WireMessage<'a>>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    tools: Vec<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    response_format: Option<Value>,
}

impl<'a> WireRequest<'a> {
    fn from_request(request: &'a ChatRequest) -> Self {
        Self {
            model: &request.model,
            messages: request.messages.iter().map(WireMessage::from_message).collect(),
            tools: request
                .tools
                .iter()
                .map(|tool| {
                    json!({
                        "type": "function",
                        "function": {
                            "name": tool.name,
                            "description": tool.description,
                            "parameters": tool.parameters,
                        }
                    })
                })
                .collect(),
            temperature: request.temperature,
            max_tokens: request.max_tokens,
            response_format: request.response_format.as_ref().map(|format| {
                json!({
                    "type": "json_schema",
                    "json_schema": {
                        "name": format.name,
                        "schema": format.schema,
                        "strict": true,
                    }
                })
            }),
        }
    }
}

#[derive(Serialize)]
struct WireMessage<'a> {
    role: Role,
    /// Assistant turns that only carry tool calls send `null` content.
    content: Option<&'a str>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    tool_calls: Vec<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tool_call_id: Option<&'a str>,
}

impl<'a> WireMessage<'a> {
    fn from_message(message: &'a ChatMessage) -> Self {
        Self {
            role: message.role,
            content: message.content.as_deref(),
            tool_calls: message
                .tool_calls
                .iter()
                .map(|call| {
                    json!({
                        "id": call.id,
                        "type": "function",
                        "function": { "name": call.name, "arguments": call.arguments },
                    })
                })
                .collect(),
            tool_call_id: message.tool_call_id.as_deref(),
        }
    }
}

#[derive(Deserialize)]
struct WireResponse {
    #[serde(default)]
    choices: Vec<WireChoice>,
}

#[derive(Deserialize)]
struct WireChoice {
    message: WireReply,
}

#[derive(Deserialize)]
struct WireReply {
    #[serde(default)]
    content: Option<String>,
    #[serde(default)]
    tool_calls: Option<Vec<WireToolCall>>,
}

#[derive(Deserialize)]
struct WireToolCall {
    #[serde(default)]
    id: Option<String>,
    function: WireFunction,
}

#[derive(Deserialize)]
struct WireFunction {
    name: String,
    #[serde(default)]
    arguments: Option<String>,
}

impl WireResponse {
    fn into_response(self) -> Result<ChatResponse> {
        let choice = self
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| anyhow!("chat completion returned no choices"))?;
        let tool_calls = choice
            .message
            .tool_calls
            .unwrap_or_default()
            .into_iter()
            .enumerate()
            .map(|(idx, call)| ToolCall {
                // Some local servers omit ids; synthesize stable ones.
                id: call.id.unwrap_or_else(|| format!("call_{idx}")),
                name: call.function.name,
                arguments: call.function.arguments.unwrap_or_else(|| "{}".to_string()),
            })
            .collect();
        Ok(ChatResponse {
            content: choice.message.content.filter(|c| !c.trim().is_empty()),
            tool_calls,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::types::{ResponseFormat, ToolSpec};

    fn sample_request() -> ChatRequest {
        ChatRequest {
            model: "local-model".to_string(),
            messages: vec![
                ChatMessage::system("sys"),
                ChatMessage::user("hi"),
                ChatMessage::assistant_tool_calls(
                    None,
                    vec![ToolCall {
                        id: "call_1".to_string(),
                        name: "add_topic".to_string(),
                        arguments: "{\"description\":\"x\"}".to_string(),
                    }],
                ),
                ChatMessage::tool_result("call_1", "0"),
            ],
            tools: vec![ToolSpec {
                name: "add_topic".to_string(),
                description: "Add a topic".to_string(),
                parameters: json!({"type": "object"}),
            }],
            temperature: Some(0.1),
            max_tokens: None,
            response_format: Some(ResponseFormat {
                name: "Summary".to_string(),
                schema: json!({"type": "object"}),
            }),
        }
    }

    #[test]
    fn wire_request_matches_chat_completions_shape() {
        let request = sample_request();
        let body = serde_json::to_value(WireRequest::from_request(&request)).expect("json");

        assert_eq!(body["model"], "local-model");
        assert_eq!(body["messages"][0]["role"], "system");
        assert_eq!(body["messages"][2]["content"], Value::Null);
        assert_eq!(
            body["messages"][2]["tool_calls"][0]["function"]["name"],
            "add_topic"
        );
        assert_eq!(body["messages"][3]["tool_call_id"], "call_1");
        assert_eq!(body["tools"][0]["type"], "function");
        assert_eq!(body["response_format"]["type"], "json_schema");
        assert_eq!(body["response_format"]["json_schema"]["name"], "Summary");
        assert!(body.get("max_tokens").is_none());
    }

    #[test]
    fn wire_response_maps_tool_calls() {
        let raw = json!({
            "choices": [{
                "message": {
                    "content": "",
                    "tool_calls": [
                        {"id": "abc", "type": "function", "function": {"name": "ask_human", "arguments": "{\"question\":\"why?\"}"}},
                        {"type": "function", "function": {"name": "get_topics_summary"}}
                    ]
                }
            }]
        });
        let parsed: WireResponse = serde_json::from_value(raw).expect("parse");
        let reply = parsed.into_response().expect("reply");

        assert_eq!(reply.content, None);
        assert_eq!(reply.tool_calls.len(), 2);
        assert_eq!(reply.tool_calls[0].id, "abc");
        assert_eq!(reply.tool_calls[1].id, "call_1");
        assert_eq!(reply.tool_calls[1].arguments, "{}");
    }

    #[test]
    fn wire_response_without_choices_is_error() {
        let parsed: WireResponse = serde_json::from_value(json!({"choices": []})).expect("parse");
        let err = parsed.into_response().unwrap_err();
        assert!(err.to_string().contains("no choices"));
    }

    #[test]
    fn openai_provider_requires_key() {
        let mut cfg = RunnerConfig {
            provider: ProviderKind::Openai,
            ..RunnerConfig::default()
        };
        cfg.providers.openai.api_key = None;
        assert!(OpenAiCompatBackend::from_config(&cfg).is_err());
    }
}
