use include_dir::{include_dir, Dir};
use serde::Serialize;
use std::collections::HashMap;
use tera::{Context, Error as TeraError, Tera};

use crate::models::tool::Tool;

static PROMPTS: Dir = include_dir!("$CARGO_MANIFEST_DIR/src/prompts");

pub fn load_prompt<T: Serialize>(template: &str, context_data: &T) -> Result<String, TeraError> {
    let mut tera = Tera::default();
    tera.add_raw_template("inline_template", template)?;
    let context = Context::from_serialize(context_data)?;
    let rendered = tera.render("inline_template", &context)?;
    Ok(rendered)
}

/// Render one of the prompts bundled with the crate
pub fn load_bundled_prompt<T: Serialize>(name: &str, context_data: &T) -> Result<String, TeraError> {
    let template = PROMPTS
        .get_file(name)
        .and_then(|file| file.contents_utf8())
        .ok_or_else(|| TeraError::msg(format!("Prompt template not found: {}", name)))?;
    load_prompt(template, context_data)
}

/// The default system instruction, listing the tools the model may call
pub fn system_prompt(tools: &[Tool]) -> Result<String, TeraError> {
    let mut context = HashMap::new();
    context.insert("tools", tools);
    load_bundled_prompt("system.md", &context).map(|prompt| prompt.trim().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use serial_test::serial;
    use std::{env, fs};

    #[test]
    fn test_load_prompt() {
        let template = "Hello, {{ name }}! You are {{ age }} years old.";
        let mut context = HashMap::new();
        context.insert("name".to_string(), "Alice".to_string());
        context.insert("age".to_string(), 30.to_string());

        let result = load_prompt(template, &context).unwrap();
        assert_eq!(result, "Hello, Alice! You are 30 years old.");
    }

    #[test]
    fn test_load_prompt_missing_variable() {
        let template = "Hello, {{ name }}! You are {{ age }} years old.";
        let mut context = HashMap::new();
        context.insert("name".to_string(), "Alice".to_string());
        let result = load_prompt(template, &context);
        assert!(result.is_err());
    }

    #[test]
    fn test_load_bundled_prompt_missing() {
        let context: HashMap<String, String> = HashMap::new();
        let result = load_bundled_prompt("non_existent_template.txt", &context);
        assert!(result.is_err());
    }

    #[test]
    fn test_system_prompt_lists_tools() {
        let tools = vec![Tool::new(
            "search",
            "Search the web",
            json!({"type": "object", "properties": {"query": {"type": "string"}}}),
        )];

        let prompt = system_prompt(&tools).unwrap();
        assert!(prompt.starts_with("You are a professional AI assistant."));
        assert!(prompt.contains("- search: Search the web"));
    }

    #[test]
    fn test_system_prompt_without_tools() {
        let prompt = system_prompt(&[]).unwrap();
        assert!(prompt.starts_with("You are a professional AI assistant."));
        assert!(!prompt.contains("tools below"));
    }

    #[test]
    #[serial]
    fn test_system_prompt_ignores_working_directory() {
        let temp_dir = tempfile::tempdir().unwrap();
        fs::write(temp_dir.path().join("system.md"), "Replaced {{ tools | length }}").unwrap();

        let original_dir = env::current_dir().unwrap();
        env::set_current_dir(temp_dir.path()).unwrap();
        let prompt = system_prompt(&[]);
        env::set_current_dir(original_dir).unwrap();

        assert!(prompt
            .unwrap()
            .starts_with("You are a professional AI assistant."));
    }
}
