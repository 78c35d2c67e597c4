use anyhow::Result;
use console::style;

use crate::setup::{build_provider, build_search_client, Settings};

fn report(name: &str, ok: bool) {
    if ok {
        println!("{} {}", style("✓").green().bold(), name);
    } else {
        println!("{} {}", style("✗").red().bold(), name);
    }
}

pub async fn run(settings: &Settings) -> Result<()> {
    let provider = build_provider(settings)?;
    let search = build_search_client(settings)?;

    let (model_ok, search_ok) = tokio::join!(provider.test_connection(), search.test_connection());

    report(&format!("Model {} at {}", settings.model, settings.base_url), model_ok);
    if search.has_api_key() {
        report("Web search", search_ok);
    } else {
        report("Web search (no TAVILY_API_KEY set)", false);
    }

    if model_ok && search_ok {
        Ok(())
    } else {
        anyhow::bail!("Some services are unavailable")
    }
}
