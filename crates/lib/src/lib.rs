//! linebridge core library: answers LINE messages with Gemini completions.
//!
//! The binary in `crates/cli` only parses arguments and calls into [`gateway::run_gateway`].

pub mod channels;
pub mod config;
pub mod gateway;
pub mod llm;
