use anyhow::Result;
use futures::StreamExt;
use std::time::Duration;

use crate::prompt::{InputType, Prompt};
use scout::agent::Agent;
use scout::models::message::Message;
use scout::session::SessionManager;
use scout::streaming::paced_chars;

/// An interactive conversation, saved to a session after every message
pub struct Session<'a> {
    agent: Agent,
    sessions: SessionManager,
    session_id: String,
    prompt: Box<dyn Prompt + 'a>,
    stream_delay: Duration,
}

impl<'a> Session<'a> {
    pub fn new(
        agent: Agent,
        sessions: SessionManager,
        session_id: String,
        prompt: Box<dyn Prompt + 'a>,
        stream_delay: Duration,
    ) -> Self {
        Session {
            agent,
            sessions,
            session_id,
            prompt,
            stream_delay,
        }
    }

    pub async fn start(&mut self) -> Result<()> {
        for message in self.sessions.history(&self.session_id)? {
            self.prompt.render(&message);
        }

        loop {
            let input = self.prompt.get_input()?;
            match input.input_type {
                InputType::Message => {
                    let mut message = Message::user();
                    if let Some(url) = input.image_url {
                        message = message.with_image(url);
                    }
                    if let Some(content) = input.content {
                        message = message.with_text(content);
                    }
                    if message.content.is_empty() {
                        continue;
                    }
                    self.sessions.append_message(&self.session_id, message)?;
                }
                InputType::Exit => break,
                InputType::AskAgain => continue,
            }

            self.answer().await?;
        }

        self.prompt.close();
        Ok(())
    }

    async fn answer(&mut self) -> Result<()> {
        let _turn = self.sessions.begin_turn(&self.session_id)?;
        let history = self.sessions.history(&self.session_id)?;

        self.prompt.show_busy();
        let outcome = tokio::select! {
            outcome = self.agent.run(&history) => Some(outcome),
            _ = tokio::signal::ctrl_c() => None,
        };
        self.prompt.hide_busy();

        let text = match outcome {
            Some(Ok(answer)) => {
                self.sessions.append_message(
                    &self.session_id,
                    Message::assistant().with_text(answer.clone()),
                )?;
                answer
            }
            Some(Err(e)) => format!("Execution failed: {}", e),
            None => "Interrupted.".to_string(),
        };

        let mut fragments = paced_chars(text, self.stream_delay);
        while let Some(fragment) = fragments.next().await {
            self.prompt.stream(&fragment);
        }
        self.prompt.stream("\n");
        Ok(())
    }
}
