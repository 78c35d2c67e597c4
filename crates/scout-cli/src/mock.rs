use anyhow::{anyhow, Result};
use async_trait::async_trait;
use std::sync::{Arc, Mutex};

use crate::prompt::{Input, InputType, Prompt};
use scout::models::message::Message;
use scout::models::tool::Tool;
use scout::providers::base::{Provider, Usage};

/// Answers with pre-configured results, then with an empty message
pub struct ScriptedProvider {
    responses: Mutex<Vec<Result<Message, String>>>,
}

impl ScriptedProvider {
    pub fn new(responses: Vec<Result<Message, String>>) -> Self {
        Self {
            responses: Mutex::new(responses),
        }
    }
}

#[async_trait]
impl Provider for ScriptedProvider {
    async fn complete(&self, _messages: &[Message], _tools: &[Tool]) -> Result<(Message, Usage)> {
        let mut responses = self.responses.lock().unwrap();
        if responses.is_empty() {
            return Ok((Message::assistant().with_text(""), Usage::default()));
        }
        responses
            .remove(0)
            .map(|message| (message, Usage::default()))
            .map_err(|e| anyhow!(e))
    }
}

/// Replays typed lines and records what would have been printed
pub struct MockPrompt {
    inputs: Vec<String>,
    output: Arc<Mutex<Vec<String>>>,
    rendered: Arc<Mutex<Vec<String>>>,
}

impl MockPrompt {
    pub fn new(inputs: Vec<&str>) -> Self {
        Self {
            inputs: inputs.into_iter().rev().map(String::from).collect(),
            output: Arc::new(Mutex::new(Vec::new())),
            rendered: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn output(&self) -> Arc<Mutex<Vec<String>>> {
        Arc::clone(&self.output)
    }

    pub fn rendered(&self) -> Arc<Mutex<Vec<String>>> {
        Arc::clone(&self.rendered)
    }
}

impl Prompt for MockPrompt {
    fn render(&mut self, message: &Message) {
        self.rendered.lock().unwrap().push(message.text());
    }

    fn stream(&mut self, fragment: &str) {
        self.output.lock().unwrap().push(fragment.to_string());
    }

    fn get_input(&mut self) -> Result<Input> {
        let line = self.inputs.pop().unwrap_or_else(|| "exit".to_string());
        let input = match line.as_str() {
            "exit" => Input::control(InputType::Exit),
            "" => Input::control(InputType::AskAgain),
            _ => Input::message(&line),
        };
        Ok(input)
    }

    fn show_busy(&mut self) {}

    fn hide_busy(&mut self) {}

    fn close(&self) {}
}
