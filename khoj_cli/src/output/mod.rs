//! Rendering of invocation results: JSON for machine consumers, a compact
//! plain-text form for quick scanning, and a colored pretty form for
//! terminals. Diagnostics never go through here; this is the result stream.

use khoj_core::{InvocationResult, ProviderOutcome};
use owo_colors::OwoColorize;

pub fn render_json(result: &InvocationResult) -> Result<String, serde_json::Error> {
    serde_json::to_string_pretty(result)
}

/// Compact text: one section per provider, reports truncated, errors inline.
pub fn render_compact(result: &InvocationResult) -> String {
    let mut out = String::new();
    out.push_str(&format!("# {}\n", result.topic));

    for outcome in &result.results {
        let status = if outcome.success { "OK" } else { "FAIL" };
        out.push_str(&format!(
            "\n## {} [{}] {} ({:.1}s)\n",
            outcome.provider, status, outcome.model, outcome.elapsed_seconds
        ));
        if outcome.success {
            out.push_str(&truncate_text(&outcome.report, 400));
            out.push('\n');
            if !outcome.citations.is_empty() {
                out.push_str(&format!("citations: {}\n", outcome.citations.len()));
            }
        } else if let Some(error) = &outcome.error {
            out.push_str(&format!("error: {}\n", error));
        }
    }

    out.push_str(&format!(
        "\n{}/{} providers returned reports\n",
        result.success_count, result.provider_count
    ));
    out
}

/// Colored terminal rendering with one section per provider.
pub fn print_pretty(result: &InvocationResult) {
    println!(
        "{} {}",
        "Deep Research:".bold().cyan(),
        result.topic.yellow()
    );
    println!();

    for outcome in &result.results {
        print_outcome(outcome);
    }

    println!(
        "{}",
        format!(
            "{}/{} providers returned reports",
            result.success_count, result.provider_count
        )
        .dimmed()
    );
}

fn print_outcome(outcome: &ProviderOutcome) {
    let header = format!(
        "{} ({}, {:.1}s)",
        outcome.provider, outcome.model, outcome.elapsed_seconds
    );
    if outcome.success {
        println!("{} {} {}", "──".cyan(), header.green().bold(), "─".repeat(12).cyan());
        println!();
        println!("{}", outcome.report);
        if !outcome.citations.is_empty() {
            println!();
            println!("{}", "Citations:".dimmed());
            for (i, citation) in outcome.citations.iter().enumerate() {
                match &citation.title {
                    Some(title) => println!(
                        " {:>3}. {} {}",
                        (i + 1).to_string().cyan(),
                        title.bold(),
                        citation.url.blue()
                    ),
                    None => println!(" {:>3}. {}", (i + 1).to_string().cyan(), citation.url.blue()),
                }
            }
        }
    } else {
        println!("{} {} {}", "──".cyan(), header.red().bold(), "─".repeat(12).cyan());
        println!();
        println!(
            "   {} {}",
            "✗".red(),
            outcome.error.as_deref().unwrap_or("failed").dimmed()
        );
    }
    println!();
}

/// Truncate text to max length, adding ellipsis if needed
fn truncate_text(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else {
        let truncated: String = s.chars().take(max_len.saturating_sub(3)).collect();
        format!("{}...", truncated)
    }
}
