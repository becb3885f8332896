use crate::cli::{Cli, ConfigAction, OutputFormat};
use crate::commands::{CommandError, Result};
use khoj_core::keys::{default_key_path, remove_key, save_key, KeyRing, KEY_NAMES};
use owo_colors::OwoColorize;
use serde_json::json;

pub fn run(cli: &Cli, action: ConfigAction) -> Result<()> {
    let path = default_key_path();

    match action {
        ConfigAction::Show => {
            let ring = KeyRing::load(&path);
            if cli.output == OutputFormat::Json {
                let entries: Vec<_> = KEY_NAMES
                    .iter()
                    .map(|name| {
                        json!({
                            "key": name,
                            "configured": ring.get(name).is_some(),
                        })
                    })
                    .collect();
                println!("{}", serde_json::to_string_pretty(&entries)?);
                return Ok(());
            }

            println!("{}", "Configuration".cyan().bold());
            println!("{} {}", "Key file:".dimmed(), path.display());
            println!();
            for name in KEY_NAMES {
                match ring.get(name) {
                    Some(value) => println!("  {}={}", name.bold(), mask(&value).green()),
                    None => println!("  {}  {}", name.bold(), "not set".dimmed()),
                }
            }
            println!();
        }
        ConfigAction::Set { name, value } => {
            validate_key_name(&name)?;
            save_key(&path, &name, &value)?;
            println!("Saved {} to {}", name.bold(), path.display());
        }
        ConfigAction::Remove { name } => {
            validate_key_name(&name)?;
            remove_key(&path, &name)?;
            println!("Removed {} from {}", name.bold(), path.display());
        }
    }

    Ok(())
}

fn validate_key_name(name: &str) -> Result<()> {
    if KEY_NAMES.contains(&name) {
        Ok(())
    } else {
        Err(CommandError::InvalidInput(format!(
            "Unknown key '{}'. Expected one of: {}",
            name,
            KEY_NAMES.join(", ")
        )))
    }
}

/// Mask a credential for display, keeping enough of the prefix to tell keys
/// apart.
fn mask(value: &str) -> String {
    let prefix: String = value.chars().take(4).collect();
    format!("{}… ({} chars)", prefix, value.chars().count())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mask_keeps_prefix_only() {
        assert_eq!(mask("sk-abcdef123456"), "sk-a… (15 chars)");
        assert_eq!(mask("ab"), "ab… (2 chars)");
    }

    #[test]
    fn test_validate_key_name() {
        assert!(validate_key_name("GEMINI_API_KEY").is_ok());
        assert!(validate_key_name("BING_API_KEY").is_err());
    }
}
