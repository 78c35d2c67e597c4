use anyhow::Result;
use console::style;
use scout::agent::DEFAULT_STREAM_DELAY;

use crate::prompt::cliclack::CliclackPrompt;
use crate::session::Session;
use crate::setup::{build_agent, open_sessions, Settings};

pub async fn run(settings: &Settings, session: Option<String>, title: Option<String>) -> Result<()> {
    let agent = build_agent(settings)?;
    let sessions = open_sessions(settings)?;

    let chat = match session {
        Some(id) => sessions.get(&id)?,
        None => sessions.create(title)?,
    };

    println!(
        "{} {}",
        style(format!("Session {}", chat.title)).bold(),
        style(format!("({}) - type \"exit\" to end the session", chat.id)).dim()
    );
    println!();

    let mut session = Session::new(
        agent,
        sessions,
        chat.id,
        Box::new(CliclackPrompt::new()),
        DEFAULT_STREAM_DELAY,
    );
    session.start().await
}
