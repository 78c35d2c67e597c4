use anyhow::Result;
use console::style;
use scout::models::role::Role;
use scout::session::ChatSession;

use crate::prompt::{message_markdown, print_markdown, Theme};
use crate::setup::{open_sessions, Settings};

fn summary_line(session: &ChatSession) -> String {
    format!(
        "{}  {}  ({} messages, updated {})",
        session.id,
        session.title,
        session.messages.len(),
        session.updated_at.format("%Y-%m-%d %H:%M")
    )
}

/// The whole conversation as one markdown document
fn transcript(session: &ChatSession) -> String {
    let mut transcript = format!("# {}\n", session.title);
    for message in &session.messages {
        let speaker = match message.role {
            Role::User => "You",
            Role::Assistant => "Scout",
            Role::System => "System",
            Role::Tool => continue,
        };
        transcript.push_str(&format!("\n**{}:**\n\n{}\n", speaker, message_markdown(message)));
    }
    transcript
}

pub fn list(settings: &Settings) -> Result<()> {
    let sessions = open_sessions(settings)?.list();
    if sessions.is_empty() {
        println!("{}", style("No saved sessions").dim());
    }
    for session in &sessions {
        println!("{}", summary_line(session));
    }
    Ok(())
}

pub fn show(settings: &Settings, id: &str) -> Result<()> {
    let session = open_sessions(settings)?.get(id)?;
    print_markdown(&transcript(&session), &Theme::Dark)
}

pub fn delete(settings: &Settings, id: &str) -> Result<()> {
    open_sessions(settings)?.delete(id)?;
    println!("Deleted session {}", style(id).bold());
    Ok(())
}
