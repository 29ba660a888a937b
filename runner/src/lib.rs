//! Interactive root-cause analysis agents over an OpenAI-compatible chat API.
//!
//! An agent interviews a person through tool calls (`ask_human`), optionally
//! parks side threads in a per-conversation topic registry, and finishes with
//! a schema-validated summary. The architecture keeps a strict separation:
//!
//! - **[`core`]**: Pure, deterministic data structures (topic registry,
//!   bounded session history, request assembly). No I/O.
//! - **[`io`]**: Side-effecting edges (HTTP backend, terminal input, config
//!   files, progress output). Behind traits so tests can script them.
//!
//! [`tools`] and [`agents`] are configuration; [`conversation`] drives a run.

pub mod agents;
pub mod conversation;
pub mod core;
pub mod exit_codes;
pub mod io;
pub mod logging;
#[cfg(any(test, feature = "test-support"))]
pub mod test_support;
pub mod tools;
