use clap::Parser;
use owo_colors::OwoColorize;
use std::process;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod cli;
mod commands;
mod output;

use cli::{Cli, Commands};

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    // Diagnostics go to stderr so piped JSON output stays clean.
    let default_filter = if cli.debug { "khoj=debug" } else { "khoj=info" };
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_filter.into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let result = match &cli.command {
        Commands::Research {
            topic,
            mock,
            timeout,
            fixtures_dir,
            output_dir,
        } => {
            commands::research::run(
                &cli,
                topic,
                *mock,
                *timeout,
                fixtures_dir,
                output_dir.as_deref(),
            )
            .await
        }
        Commands::Providers => commands::providers::run(&cli),
        Commands::Config { action } => commands::config::run(&cli, action.clone()),
    };

    if let Err(e) = result {
        eprintln!("{}: {}", "Error".red().bold(), e);
        process::exit(1);
    }
}
