use anyhow::Result;
use cliclack::spinner;
use scout::models::message::Message;

use crate::prompt::{print_markdown, Theme};
use crate::setup::{build_agent, Settings};

pub async fn run(settings: &Settings, prompt: String) -> Result<()> {
    let agent = build_agent(settings)?;

    let busy = spinner();
    busy.start("thinking...");
    let outcome = agent.run(&[Message::user().with_text(prompt)]).await;
    busy.stop("");

    let answer = match outcome {
        Ok(answer) => answer,
        Err(e) => format!("Execution failed: {}", e),
    };
    print_markdown(&answer, &Theme::Dark)
}
