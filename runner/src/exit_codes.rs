//! Stable exit codes for the `dorsz` CLI.

/// Conversation finished with a valid final answer.
pub const OK: i32 = 0;
/// Invalid config, backend failure, closed input, invalid final answer or any other error.
pub const INVALID: i32 = 1;
/// The model did not produce a final answer within `max_turns`.
pub const MAX_TURNS: i32 = 3;
