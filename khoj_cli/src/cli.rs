use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "khoj")]
#[command(about = "Khoj - Query multiple deep research providers in parallel")]
#[command(version)]
#[command(after_help = "\x1b[1;36mQuick Start:\x1b[0m
  khoj research \"solid state battery supply chain\"   Fan the topic out to every configured provider
  khoj research \"...\" --output json                   Machine-readable results on stdout
  khoj research \"...\" --mock                          Use fixtures instead of live API calls
  khoj providers                                      Show providers and credential status

\x1b[1;36mAuthentication:\x1b[0m
  khoj config set OPENAI_API_KEY --value sk-...       Save a key to ~/.config/khoj/keys.env
  khoj config show                                    View configured keys (masked)

Environment variables override the key file; a provider without a key is
skipped, not failed.")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Output format
    #[arg(long, global = true, value_enum, default_value_t = OutputFormat::Pretty)]
    pub output: OutputFormat,

    /// Enable verbose debug logging
    #[arg(long, global = true)]
    pub debug: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Research a topic across all providers with configured keys
    ///
    /// Dispatches the topic to every active provider concurrently, waits up
    /// to the global timeout, and prints one result set with a per-provider
    /// report, citations, and timing.
    #[command(after_help = "\x1b[1;33mExamples:\x1b[0m
  khoj research \"EU AI act enforcement timeline\"
  khoj research \"fusion startups\" --timeout 900
  khoj research \"anything\" --mock --fixtures-dir tests/fixtures
  khoj research \"...\" --output json --output-dir ./out")]
    Research {
        /// Topic to research
        topic: String,

        /// Use fixtures instead of real API calls
        #[arg(long)]
        mock: bool,

        /// Max wait for the whole collection phase, in seconds
        #[arg(long, default_value_t = 600)]
        timeout: u64,

        /// Directory holding <provider>_sample.json fixtures (with --mock)
        #[arg(long, default_value = "fixtures")]
        fixtures_dir: PathBuf,

        /// Write raw_results.json to this directory instead of stdout
        #[arg(long)]
        output_dir: Option<PathBuf>,
    },

    /// List registered providers and their credential status
    #[command(alias = "ls")]
    Providers,

    /// Manage API keys in the local key file
    #[command(after_help = "\x1b[1;33mExamples:\x1b[0m
  khoj config show
  khoj config set GEMINI_API_KEY --value g-xxx
  khoj config remove GEMINI_API_KEY")]
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand, Clone)]
pub enum ConfigAction {
    /// Show configured keys (values masked)
    Show,
    /// Save an API key to the key file
    Set {
        /// Key name (e.g. GEMINI_API_KEY)
        name: String,
        /// Credential value
        #[arg(long)]
        value: String,
    },
    /// Remove an API key from the key file
    Remove {
        /// Key name (e.g. GEMINI_API_KEY)
        name: String,
    },
}

#[derive(Copy, Clone, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Human-readable formatted output
    Pretty,
    /// JSON output
    Json,
    /// Short plain-text output
    Compact,
}
