//! Planning loop and travel toolkit
//!
//! Turns a user's request plus the session history into a final answer,
//! letting the intent oracle call the travel tools along the way.

use thiserror::Error;

pub mod context;
pub mod loop_agent;
pub mod tools;

pub use context::ContextBuilder;
pub use loop_agent::{AgentLoop, LoopSettings};
pub use tools::{ToolInvocation, ToolName, ToolOutput, ToolRegistry, ToolSpec};

/// Why a turn could not finish normally
#[derive(Error, Debug)]
pub enum AgentError {
    #[error("oracle failed: {0}")]
    Provider(#[from] concierge_provider::ProviderError),

    #[error("no answer after {0} tool iterations")]
    MaxIterations(u32),

    #[error("oracle returned an empty answer")]
    EmptyAnswer,
}

/// Rejected tool call
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ToolError {
    #[error("unknown tool '{0}'")]
    UnknownTool(String),

    #[error("invalid arguments for {tool}: {reason}")]
    InvalidArguments { tool: String, reason: String },
}

pub type Result<T> = std::result::Result<T, AgentError>;
