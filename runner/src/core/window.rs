//! Request context assembly from the bounded history.

use std::sync::LazyLock;

use regex::Regex;

use crate::core::types::{ChatMessage, Role};

/// First line of the note carrying results whose tool call left the window.
pub const ORPHAN_NOTE_HEADER: &str = "Results of your earlier tool calls:";

/// Build the message list sent to the model for one turn.
///
/// Layout: agent instructions, the pinned opening input, then the history
/// window. Tool results at the head of the window lost their assistant call to
/// eviction; chat APIs reject such orphans, so their contents are folded into
/// one user note instead.
pub fn conversation_context(
    instructions: &str,
    pinned_input: &str,
    window: &[ChatMessage],
) -> Vec<ChatMessage> {
    let first_anchored = window
        .iter()
        .position(|msg| msg.role != Role::Tool)
        .unwrap_or(window.len());
    let (orphans, anchored) = window.split_at(first_anchored);

    let mut messages = Vec::with_capacity(anchored.len() + 3);
    messages.push(ChatMessage::system(instructions));
    messages.push(ChatMessage::user(pinned_input));
    if !orphans.is_empty() {
        messages.push(ChatMessage::user(orphan_note(orphans)));
    }
    messages.extend_from_slice(anchored);
    messages
}

fn orphan_note(orphans: &[ChatMessage]) -> String {
    let mut note = String::from(ORPHAN_NOTE_HEADER);
    for msg in orphans {
        note.push_str("\n- ");
        note.push_str(msg.content.as_deref().unwrap_or_default());
    }
    note
}

/// Strip a surrounding Markdown code fence from a final answer.
///
/// Local models often wrap JSON in ```` ```json ```` blocks even when asked
/// for raw JSON. Text without a fence is returned trimmed.
pub fn extract_json_payload(text: &str) -> &str {
    static FENCE_RE: LazyLock<Regex> = LazyLock::new(|| {
        Regex::new(r"(?s)^\s*```[A-Za-z0-9_-]*\s*\n(.*?)\n?\s*```\s*$").expect("fence regex")
    });

    match FENCE_RE.captures(text).and_then(|caps| caps.get(1)) {
        Some(body) => body.as_str().trim(),
        None => text.trim(),
    }
}
