mod terminal;

use anyhow::{Context, Result};
use talkflow::dialogue::Definition;

fn main() -> Result<()> {
    let args: Vec<String> = std::env::args().collect();

    let definition = match args.get(1) {
        Some(path) => {
            let json = std::fs::read_to_string(path)
                .with_context(|| format!("failed to read definition {path}"))?;
            Definition::from_json(&json).with_context(|| format!("failed to parse {path}"))?
        }
        None => terminal::demo_definition(),
    };

    let browser_language = args
        .get(2)
        .cloned()
        .or_else(|| std::env::var("LANG").ok())
        .unwrap_or_default();

    let settings = definition.settings().context(
        "invalid config section\n\
         \n\
         Usage: talkflow [definition.json] [language]\n\
         \n\
         Example:\n  talkflow ./site-chat.json de-DE",
    )?;

    env_logger::Builder::from_env(
        env_logger::Env::default().default_filter_or(default_log_filter(settings.debug)),
    )
    .format_timestamp_millis()
    .init();

    terminal::run(&definition, &browser_language)
}

/// Verbosity follows RUST_LOG; `config.debug` in the definition lowers the
/// default from info to debug.
fn default_log_filter(debug: bool) -> &'static str {
    if debug {
        "debug"
    } else {
        "info"
    }
}
