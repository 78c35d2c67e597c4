use futures::stream::{BoxStream, StreamExt, TryStreamExt};
use std::time::Duration;
use tracing::{debug, error, info, warn};

use crate::errors::ReplyError;
use crate::models::message::{Message, ToolRequest};
use crate::models::role::Role;
use crate::models::tool::Tool;
use crate::prompt_template;
use crate::providers::base::Provider;
use crate::providers::utils::INVALID_TOOL_NAME;
use crate::streaming::paced_chars;
use crate::tools::ToolRegistry;

pub const DEFAULT_MAX_TOOL_ROUNDS: usize = 8;
pub const DEFAULT_STREAM_DELAY: Duration = Duration::from_millis(10);

/// Returned by [`Agent::run`] when the final message carries no text
pub const EMPTY_ANSWER: &str = "Sorry, I couldn't generate an answer.";

/// Agent integrates a chat completion provider with the tools it may call
pub struct Agent {
    provider: Box<dyn Provider>,
    tools: ToolRegistry,
    system_prompt: Option<String>,
    max_tool_rounds: usize,
}

impl Agent {
    /// Create a new Agent with the specified provider and tools
    pub fn new(provider: Box<dyn Provider>, tools: ToolRegistry) -> Self {
        Self {
            provider,
            tools,
            system_prompt: None,
            max_tool_rounds: DEFAULT_MAX_TOOL_ROUNDS,
        }
    }

    /// Replace the default system instruction rendered from the bundled template
    pub fn with_system_prompt<S: Into<String>>(mut self, prompt: S) -> Self {
        self.system_prompt = Some(prompt.into());
        self
    }

    /// Limit how many tool-call rounds one reply may run before giving up
    pub fn with_max_tool_rounds(mut self, rounds: usize) -> Self {
        self.max_tool_rounds = rounds;
        self
    }

    pub fn tools(&self) -> Vec<Tool> {
        self.tools.tools()
    }

    fn system_prompt(&self) -> Result<String, ReplyError> {
        match &self.system_prompt {
            Some(prompt) => Ok(prompt.clone()),
            None => prompt_template::system_prompt(&self.tools.tools())
                .map_err(|e| ReplyError::Internal(e.to_string())),
        }
    }

    /// Copy the caller's history, with the system instruction first unless one is present
    fn build_conversation(&self, history: &[Message]) -> Result<Vec<Message>, ReplyError> {
        let mut conversation = Vec::with_capacity(history.len() + 1);
        if !history.iter().any(|message| message.role == Role::System) {
            conversation.push(Message::system().with_text(self.system_prompt()?));
        }
        conversation.extend_from_slice(history);
        Ok(conversation)
    }

    /// Run a single tool request. Failures become the content of the tool result
    async fn dispatch_tool_call(&self, request: &ToolRequest) -> Message {
        let (name, result) = match &request.tool_call {
            Ok(call) => {
                info!(id = %request.id, tool = %call.name, "Executing tool call");
                (call.name.clone(), self.tools.execute(call).await)
            }
            Err(e) => (INVALID_TOOL_NAME.to_string(), Err(e.clone())),
        };

        if let Err(e) = &result {
            warn!(id = %request.id, tool = %name, "Tool call failed: {}", e);
        }

        Message::tool().with_tool_response(request.id.clone(), name, result)
    }

    /// Create a stream that yields each message as it's generated by the agent.
    ///
    /// This includes the assistant's responses and one tool message per tool call.
    /// The last item is the assistant's final answer, or an error that ends the reply.
    pub fn reply(&self, history: &[Message]) -> BoxStream<'_, Result<Message, ReplyError>> {
        let history = history.to_vec();

        Box::pin(async_stream::try_stream! {
            let mut messages = self.build_conversation(&history)?;
            let tools = self.tools.tools();
            let mut rounds = 0;

            loop {
                let (response, usage) = self
                    .provider
                    .complete(&messages, &tools)
                    .await
                    .map_err(|e| ReplyError::Provider(e.to_string()))?;
                debug!(?usage, "Received model response");

                yield response.clone();

                let tool_requests: Vec<ToolRequest> =
                    response.tool_requests().into_iter().cloned().collect();

                if tool_requests.is_empty() {
                    // No more tool calls, end the reply loop
                    break;
                }

                if rounds >= self.max_tool_rounds {
                    error!("Giving up after {} tool rounds", rounds);
                    Err::<(), _>(ReplyError::TooManyToolRounds(self.max_tool_rounds))?;
                }
                rounds += 1;

                // Tool calls run one after another, in the order the model listed them
                let mut results = Vec::with_capacity(tool_requests.len());
                for request in &tool_requests {
                    results.push(self.dispatch_tool_call(request).await);
                }

                messages.push(response);
                for result in results {
                    yield result.clone();
                    messages.push(result);
                }
            }
        })
    }

    /// Run the loop to completion and return the final answer text
    pub async fn run(&self, history: &[Message]) -> Result<String, ReplyError> {
        let mut stream = self.reply(history);
        let mut last_response = None;

        while let Some(message) = stream.try_next().await? {
            if message.role == Role::Assistant {
                last_response = Some(message);
            }
        }

        let answer = last_response.map(|message| message.text()).unwrap_or_default();
        if answer.is_empty() {
            Ok(EMPTY_ANSWER.to_string())
        } else {
            Ok(answer)
        }
    }

    /// Run the loop to completion, then emit the outcome one character at a time.
    ///
    /// Failures are emitted the same way, as an `Execution failed: ...` message.
    /// Dropping the stream stops the emission, and drops any model or search
    /// request that is still in flight.
    pub fn run_streaming(&self, history: &[Message], delay: Duration) -> BoxStream<'_, String> {
        let history = history.to_vec();

        Box::pin(async_stream::stream! {
            let text = match self.run(&history).await {
                Ok(answer) => answer,
                Err(e) => {
                    error!("Agent run failed: {}", e);
                    format!("Execution failed: {}", e)
                }
            };

            let mut fragments = paced_chars(text, delay);
            while let Some(fragment) = fragments.next().await {
                yield fragment;
            }
        })
    }
}
