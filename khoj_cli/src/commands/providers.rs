use crate::cli::{Cli, OutputFormat};
use crate::commands::Result;
use khoj_core::build_registry;
use khoj_core::keys::KeyRing;
use owo_colors::OwoColorize;
use serde_json::json;

pub fn run(cli: &Cli) -> Result<()> {
    let registry = build_registry();
    let keys = KeyRing::load_default();

    if cli.output == OutputFormat::Json {
        let entries: Vec<_> = registry
            .in_canonical_order()
            .iter()
            .map(|p| {
                json!({
                    "name": p.name(),
                    "model": p.model(),
                    "key": p.key_name(),
                    "configured": keys.get(p.key_name()).is_some(),
                })
            })
            .collect();
        println!("{}", serde_json::to_string_pretty(&entries)?);
        return Ok(());
    }

    println!("{}", "Registered Providers".cyan().bold());
    println!();
    for provider in registry.in_canonical_order() {
        if keys.get(provider.key_name()).is_some() {
            println!(
                "  {} {}  {}  {}",
                "●".green(),
                provider.name().bold(),
                provider.model().dimmed(),
                format!("[{}]", provider.key_name()).dimmed()
            );
        } else {
            println!(
                "  {} {}  {}  {}",
                "○".red(),
                provider.name().bold(),
                provider.model().dimmed(),
                format!("[{} not set]", provider.key_name()).red()
            );
        }
    }
    println!();
    Ok(())
}
