//! Conversation progress reporting.
//!
//! Events are product output for the person running the interview (what the
//! agent said, which tools it called). Development diagnostics go through
//! `tracing` instead; see [`crate::logging`].

use std::io::Write;

/// Observable step of a conversation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConversationEvent {
    /// Free text the model produced alongside tool calls.
    AgentMessage(String),
    ToolCall { name: String, arguments: String },
    ToolResult { name: String, output: String },
}

pub trait EventSink {
    fn emit(&mut self, event: &ConversationEvent);
}

/// Prints events to a writer (stdout in the CLI).
pub struct ConsoleSink<W> {
    out: W,
}

impl ConsoleSink<std::io::Stdout> {
    pub fn stdout() -> Self {
        Self {
            out: std::io::stdout(),
        }
    }
}

impl<W: Write> ConsoleSink<W> {
    pub fn new(out: W) -> Self {
        Self { out }
    }
}

impl<W: Write> EventSink for ConsoleSink<W> {
    fn emit(&mut self, event: &ConversationEvent) {
        // Progress output is best effort; a closed stdout must not abort the interview.
        let _ = match event {
            ConversationEvent::AgentMessage(text) => writeln!(self.out, "\nAgent: {text}"),
            ConversationEvent::ToolCall { name, arguments } => {
                writeln!(self.out, "\nTool call: {name}\n   Arguments: {arguments}")
            }
            ConversationEvent::ToolResult { output, .. } => writeln!(self.out, "Result: {output}"),
        };
    }
}

/// Sink that discards everything.
pub struct NullSink;

impl EventSink for NullSink {
    fn emit(&mut self, _event: &ConversationEvent) {}
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn console_sink_formats_events() {
        let mut buf = Vec::new();
        {
            let mut sink = ConsoleSink::new(&mut buf);
            sink.emit(&ConversationEvent::AgentMessage("thinking".to_string()));
            sink.emit(&ConversationEvent::ToolCall {
                name: "add_topic".to_string(),
                arguments: "{\"description\":\"x\"}".to_string(),
            });
            sink.emit(&ConversationEvent::ToolResult {
                name: "add_topic".to_string(),
                output: "0".to_string(),
            });
        }
        let printed = String::from_utf8(buf).expect("utf8");
        assert!(printed.contains("Agent: thinking"));
        assert!(printed.contains("Tool call: add_topic"));
        assert!(printed.contains("Result: 0"));
    }
}
