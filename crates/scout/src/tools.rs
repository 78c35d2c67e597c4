use async_trait::async_trait;
use serde_json::Value;

use crate::errors::{AgentError, AgentResult};
use crate::models::tool::{Tool, ToolCall};

pub mod search;

/// A capability the model can invoke by name
#[async_trait]
pub trait ToolHandler: Send + Sync {
    /// The definition sent to the model
    fn definition(&self) -> &Tool;

    /// Run the tool with the model's arguments and return its textual result
    async fn call(&self, arguments: Value) -> AgentResult<String>;
}

/// Maps tool names to their handlers
#[derive(Default)]
pub struct ToolRegistry {
    handlers: Vec<Box<dyn ToolHandler>>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_handler(mut self, handler: impl ToolHandler + 'static) -> Self {
        self.register(Box::new(handler));
        self
    }

    /// Add a handler, replacing any handler registered under the same name
    pub fn register(&mut self, handler: Box<dyn ToolHandler>) {
        let name = handler.definition().name.clone();
        self.handlers.retain(|h| h.definition().name != name);
        self.handlers.push(handler);
    }

    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }

    /// Definitions of every registered tool, in registration order
    pub fn tools(&self) -> Vec<Tool> {
        self.handlers
            .iter()
            .map(|handler| handler.definition().clone())
            .collect()
    }

    pub async fn execute(&self, call: &ToolCall) -> AgentResult<String> {
        let handler = self
            .handlers
            .iter()
            .find(|handler| handler.definition().name == call.name)
            .ok_or_else(|| AgentError::ToolNotFound(call.name.clone()))?;

        handler.call(call.arguments.clone()).await
    }
}
