use anyhow::Result;
use scout::models::message::Message;

pub mod cliclack;

pub trait Prompt {
    /// Show a complete message
    fn render(&mut self, message: &Message);
    /// Show the next piece of an answer that is being streamed
    fn stream(&mut self, fragment: &str);
    fn get_input(&mut self) -> Result<Input>;
    fn show_busy(&mut self);
    fn hide_busy(&mut self);
    fn close(&self);
}

pub struct Input {
    pub input_type: InputType,
    pub content: Option<String>, // Optional content as sometimes the user may be issuing a command eg. (Exit)
    pub image_url: Option<String>,
}

impl Input {
    pub fn control(input_type: InputType) -> Self {
        Input {
            input_type,
            content: None,
            image_url: None,
        }
    }

    /// A typed message. `/image <url> [text]` attaches an image.
    pub fn message(line: &str) -> Self {
        let rest = match line.strip_prefix("/image") {
            Some(rest) if rest.is_empty() || rest.starts_with(char::is_whitespace) => rest.trim(),
            _ => {
                return Input {
                    input_type: InputType::Message,
                    content: Some(line.to_string()),
                    image_url: None,
                }
            }
        };

        let (url, text) = rest
            .split_once(char::is_whitespace)
            .map(|(url, text)| (url, text.trim()))
            .unwrap_or((rest, ""));
        if url.is_empty() {
            return Input::control(InputType::AskAgain);
        }

        Input {
            input_type: InputType::Message,
            content: Some(text.to_string()).filter(|text| !text.is_empty()),
            image_url: Some(url.to_string()),
        }
    }
}

pub enum InputType {
    AskAgain, // Ask the user for input again. Control flow command.
    Message,  // User sent a message
    Exit,     // User wants to exit the session
}

pub enum Theme {
    Light,
    Dark,
}

impl Theme {
    pub fn bat_theme(&self) -> &'static str {
        match self {
            Theme::Light => "GitHub",
            Theme::Dark => "zenburn",
        }
    }
}

/// Markdown for a message as it is shown in a transcript
pub fn message_markdown(message: &Message) -> String {
    let mut parts = Vec::new();
    for content in &message.content {
        if let Some(text) = content.as_text() {
            parts.push(text.to_string());
        } else if let Some(image) = content.as_image() {
            if image.is_inline() {
                parts.push("![image](inline image)".to_string());
            } else {
                parts.push(format!("![image]({})", image.url));
            }
        }
    }
    parts.join("\n\n")
}

/// Print markdown with syntax highlighting
pub fn print_markdown(content: &str, theme: &Theme) -> Result<()> {
    bat::PrettyPrinter::new()
        .input(bat::Input::from_bytes(content.as_bytes()))
        .theme(theme.bat_theme())
        .language("Markdown")
        .wrapping_mode(bat::WrappingMode::Character)
        .print()?;
    println!();
    Ok(())
}
