//! Deterministic, pure logic shared by the agent runtime.
//!
//! Core modules must be free of I/O side effects. They operate on in-memory
//! data structures and signal outcomes through return values.

pub mod budget;
pub mod session;
pub mod topics;
pub mod types;
pub mod window;
