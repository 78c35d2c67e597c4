mod commands;
mod prompt;
mod session;
mod setup;
#[cfg(test)]
mod mock;

use anyhow::Result;
use clap::{Parser, Subcommand};
use scout::providers::configs::OPENAI_BASE_URL;
use std::path::PathBuf;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// API key for the chat completion endpoint
    #[arg(long, env = "SCOUT_API_KEY", hide_env_values = true, global = true)]
    api_key: Option<String>,

    /// Base URL of an openai-compatible chat completion endpoint
    #[arg(long, env = "SCOUT_BASE_URL", default_value = OPENAI_BASE_URL, global = true)]
    base_url: String,

    /// Model to use
    #[arg(short, long, env = "SCOUT_MODEL", default_value = "gpt-4o-mini", global = true)]
    model: String,

    /// API key for web search
    #[arg(long, env = "TAVILY_API_KEY", hide_env_values = true, global = true)]
    search_api_key: Option<String>,

    /// Where chat sessions are saved (defaults to ~/.config/scout/sessions.json)
    #[arg(long, global = true)]
    sessions_file: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Chat interactively, saving the conversation as a session
    Chat {
        /// Resume an existing session
        #[arg(short, long)]
        session: Option<String>,

        /// Title for a new session
        #[arg(short, long)]
        title: Option<String>,
    },

    /// Manage saved sessions
    Sessions {
        #[command(subcommand)]
        command: SessionsCommand,
    },

    /// Ask a single question and print the answer
    Ask {
        /// The question to ask
        prompt: String,
    },

    /// Check that the model and search services are reachable
    Check,
}

#[derive(Subcommand)]
enum SessionsCommand {
    /// List saved sessions, newest first
    List,
    /// Print the messages of a session
    Show { id: String },
    /// Delete a session
    Delete { id: String },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let settings = setup::Settings {
        api_key: cli.api_key,
        base_url: cli.base_url,
        model: cli.model,
        search_api_key: cli.search_api_key,
        sessions_file: cli.sessions_file,
    };

    match cli.command {
        Command::Chat { session, title } => commands::chat::run(&settings, session, title).await,
        Command::Sessions { command } => match command {
            SessionsCommand::List => commands::sessions::list(&settings),
            SessionsCommand::Show { id } => commands::sessions::show(&settings, &id),
            SessionsCommand::Delete { id } => commands::sessions::delete(&settings, &id),
        },
        Command::Ask { prompt } => commands::ask::run(&settings, prompt).await,
        Command::Check => commands::check::run(&settings).await,
    }
}
