use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Failures of a single tool call. These are reported back to the model
/// as tool results rather than ending the reply.
#[non_exhaustive]
#[derive(Error, Debug, Clone, PartialEq, Deserialize, Serialize)]
pub enum AgentError {
    #[error("Tool not found: {0}")]
    ToolNotFound(String),

    #[error("Invalid tool name: {0}")]
    InvalidToolName(String),

    #[error("Invalid parameters: {0}")]
    InvalidParameters(String),

    #[error("Tool execution failed: {0}")]
    ExecutionError(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

pub type AgentResult<T> = Result<T, AgentError>;

/// Failures that end an agent reply.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ReplyError {
    #[error("Model request failed: {0}")]
    Provider(String),

    #[error("Stopped after {0} tool rounds without a final answer")]
    TooManyToolRounds(usize),

    #[error("Internal error: {0}")]
    Internal(String),
}
