//! I/O edges of the agent runtime.

pub mod config;
pub mod events;
pub mod human;
pub mod llm;
