use crate::cli::{Cli, OutputFormat};
use crate::commands::Result;
use crate::output;
use indicatif::{ProgressBar, ProgressStyle};
use khoj_core::engine::{active_providers, EngineConfig, ResearchEngine, MAX_CONCURRENT_PROVIDERS};
use khoj_core::keys::KeyRing;
use khoj_core::{build_registry, InvocationResult};
use owo_colors::OwoColorize;
use std::path::Path;
use std::time::Duration;

pub async fn run(
    cli: &Cli,
    topic: &str,
    mock: bool,
    timeout_secs: u64,
    fixtures_dir: &Path,
    output_dir: Option<&Path>,
) -> Result<()> {
    let registry = build_registry();

    let result = if mock {
        // Mock mode covers every registered provider, no credentials needed.
        let names: Vec<&str> = registry
            .in_canonical_order()
            .iter()
            .map(|p| p.name())
            .collect();
        banner(topic, &names);
        let engine = ResearchEngine::new(&registry);
        engine.run_mock(topic, fixtures_dir)
    } else {
        let keys = KeyRing::load_default();
        let names: Vec<&str> = active_providers(&registry, &keys)
            .iter()
            .map(|(p, _)| p.name())
            .collect();
        banner(topic, &names);

        let spinner = ProgressBar::new_spinner();
        spinner.set_style(
            ProgressStyle::default_spinner()
                .template("{spinner:.green} {msg}")
                .expect("Invalid progress template"),
        );
        spinner.set_message(format!("Researching '{}'...", topic));
        spinner.enable_steady_tick(Duration::from_millis(100));

        let config = EngineConfig {
            global_timeout: Duration::from_secs(timeout_secs),
            max_concurrency: MAX_CONCURRENT_PROVIDERS,
        };
        let engine = ResearchEngine::with_config(&registry, config);
        let result = engine.run(topic, &keys).await;
        spinner.finish_and_clear();
        result?
    };

    emit(cli, &result, output_dir)?;

    eprintln!();
    eprintln!(
        "Done: {}/{} providers returned reports.",
        result.success_count, result.provider_count
    );
    Ok(())
}

fn banner(topic: &str, names: &[&str]) {
    eprintln!(
        "{} \"{}\"",
        "Deep Research:".bold().cyan(),
        topic.yellow()
    );
    eprintln!(
        "{} {} ({} active)",
        "Providers:".dimmed(),
        names.join(", "),
        names.len()
    );
}

fn emit(cli: &Cli, result: &InvocationResult, output_dir: Option<&Path>) -> Result<()> {
    if let Some(dir) = output_dir {
        std::fs::create_dir_all(dir)?;
        let path = dir.join("raw_results.json");
        std::fs::write(&path, output::render_json(result)?)?;
        tracing::debug!(target: "khoj.cli", path = %path.display(), "wrote raw results");
        println!("{}", path.display());
        return Ok(());
    }

    match cli.output {
        OutputFormat::Json => println!("{}", output::render_json(result)?),
        OutputFormat::Compact => print!("{}", output::render_compact(result)),
        OutputFormat::Pretty => output::print_pretty(result),
    }
    Ok(())
}
