use std::io::{self, Write};

use anyhow::Result;
use cliclack::{input, spinner};
use console::style;
use scout::models::message::Message;
use scout::models::role::Role;

use super::{message_markdown, print_markdown, Input, InputType, Prompt, Theme};

pub struct CliclackPrompt {
    spinner: Option<cliclack::ProgressBar>,
    input_mode: InputMode,
    theme: Theme,
}

enum InputMode {
    Singleline,
    Multiline,
}

impl CliclackPrompt {
    pub fn new() -> Self {
        CliclackPrompt {
            spinner: None,
            input_mode: InputMode::Singleline,
            theme: Theme::Dark,
        }
    }
}

impl Prompt for CliclackPrompt {
    fn render(&mut self, message: &Message) {
        let speaker = match message.role {
            Role::User => style("You").cyan().bold(),
            _ => style("Scout").green().bold(),
        };
        println!("{}", speaker);
        if let Err(e) = print_markdown(&message_markdown(message), &self.theme) {
            eprintln!("Failed to render message: {}", e);
        }
    }

    fn stream(&mut self, fragment: &str) {
        print!("{}", fragment);
        let _ = io::stdout().flush();
    }

    fn show_busy(&mut self) {
        let busy = spinner();
        busy.start("thinking...");
        self.spinner = Some(busy);
    }

    fn hide_busy(&mut self) {
        if let Some(busy) = self.spinner.take() {
            busy.stop("");
        }
    }

    fn get_input(&mut self) -> Result<Input> {
        let mut input = input("Message:  [Help: /?]").placeholder("");
        match self.input_mode {
            InputMode::Multiline => input = input.multiline(),
            InputMode::Singleline => (),
        }
        let message_text: String = input.interact()?;
        let message_text = message_text.trim();

        if message_text.eq_ignore_ascii_case("exit")
            || message_text.eq_ignore_ascii_case("/exit")
            || message_text.eq_ignore_ascii_case("/quit")
        {
            Ok(Input::control(InputType::Exit))
        } else if message_text.eq_ignore_ascii_case("/m") {
            self.input_mode = InputMode::Multiline;
            self.get_input()
        } else if message_text.eq_ignore_ascii_case("/s") {
            self.input_mode = InputMode::Singleline;
            self.get_input()
        } else if message_text.eq_ignore_ascii_case("/t") {
            self.theme = match self.theme {
                Theme::Light => {
                    println!("Switching to Dark theme");
                    Theme::Dark
                }
                Theme::Dark => {
                    println!("Switching to Light theme");
                    Theme::Light
                }
            };
            self.get_input()
        } else if message_text.eq_ignore_ascii_case("/?") {
            println!("Commands:");
            println!("exit - Exit the session");
            println!("/m - Switch to multiline input mode");
            println!("/s - Switch to singleline input mode");
            println!("/t - Toggle Light/Dark theme");
            println!("/image <url> [message] - Send an image, with an optional message");
            println!("/? - Display this help message");
            println!("Ctrl+C - Interrupt the answer that is being generated");
            self.get_input()
        } else if message_text.eq_ignore_ascii_case("/image") {
            println!("Usage: /image <url> [message]");
            self.get_input()
        } else if message_text.is_empty() {
            Ok(Input::control(InputType::AskAgain))
        } else {
            Ok(Input::message(message_text))
        }
    }

    fn close(&self) {
        println!("{}", style("Session saved.").dim());
    }
}
