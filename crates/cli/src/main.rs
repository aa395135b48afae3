// tvlineup - cross-provider TV channel lineup builder

mod aliases;
mod exit_codes;
mod process;
mod run;
mod settings_cmd;
mod sources;

use std::process::ExitCode;

use clap::{Parser, Subcommand};

use lineup_recon::ProviderId;

use exit_codes::{EXIT_CONFIG, EXIT_ERROR, EXIT_PERSISTENCE, EXIT_SUCCESS, EXIT_USAGE};

#[derive(Parser)]
#[command(name = "tvlineup")]
#[command(about = "Compare TV channel availability across providers and plans")]
#[command(long_version = long_version())]
#[command(version)]
struct Cli {
    /// Log level: error, warn, info, debug, trace
    #[arg(long, global = true, default_value = "info", env = "TVLINEUP_LOG")]
    log_level: String,

    /// Shorthand for --log-level debug
    #[arg(long, short = 'v', global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Collect every selected provider and write the unified lineup
    #[command(after_help = "\
Examples:
  tvlineup run --snapshots ./scrapes --aliases aliases.csv
  tvlineup run --scraper 'python3 scrape.py' --providers directv,hulutv --format csv
  tvlineup run --snapshots ./scrapes --aliases aliases.csv --per-provider --wiki-links
  tvlineup run --snapshots ./scrapes --allow-missing-aliases --report run.json")]
    Run(run::RunArgs),

    /// Inspect an alias table
    #[command(subcommand)]
    Aliases(aliases::AliasCommands),

    /// List supported providers
    Providers {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Show or edit saved settings
    #[command(subcommand)]
    Settings(settings_cmd::SettingsCommands),
}

fn long_version() -> &'static str {
    concat!(
        env!("CARGO_PKG_VERSION"),
        " (", env!("GIT_COMMIT_HASH"), ")",
        "\nengine:  lineup-recon ", env!("CARGO_PKG_VERSION"),
        "\ntarget:  ", env!("TARGET"),
    )
}

fn setup_logging(level: &str, verbose: bool) {
    let level = if verbose {
        log::LevelFilter::Debug
    } else {
        match level.to_lowercase().as_str() {
            "off" => log::LevelFilter::Off,
            "error" => log::LevelFilter::Error,
            "warn" => log::LevelFilter::Warn,
            "debug" => log::LevelFilter::Debug,
            "trace" => log::LevelFilter::Trace,
            _ => log::LevelFilter::Info,
        }
    };

    env_logger::Builder::new()
        .filter_level(level)
        .format_timestamp(None)
        .format_target(false)
        .init();
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    setup_logging(&cli.log_level, cli.verbose);

    let result = match cli.command {
        Commands::Run(args) => run::cmd_run(args),
        Commands::Aliases(cmd) => aliases::cmd_aliases(cmd),
        Commands::Providers { json } => cmd_providers(json),
        Commands::Settings(cmd) => settings_cmd::cmd_settings(cmd),
    };

    // Anything a failed scrape left behind.
    let swept = process::sweep();
    if swept > 0 {
        log::warn!("terminated {swept} orphaned scraper process(es)");
    }

    match result {
        Ok(()) => ExitCode::from(EXIT_SUCCESS),
        Err(CliError { code, message, hint }) => {
            if !message.is_empty() {
                eprintln!("error: {}", message);
            }
            if let Some(hint) = hint {
                eprintln!("hint:  {}", hint);
            }
            ExitCode::from(code)
        }
    }
}

#[derive(Debug)]
pub struct CliError {
    pub code: u8,
    pub message: String,
    pub hint: Option<String>,
}

impl CliError {
    pub fn new(code: u8, msg: impl Into<String>) -> Self {
        Self { code, message: msg.into(), hint: None }
    }

    pub fn args(msg: impl Into<String>) -> Self {
        Self::new(EXIT_USAGE, msg)
    }

    pub fn config(msg: impl Into<String>) -> Self {
        Self::new(EXIT_CONFIG, msg)
    }

    pub fn persistence(msg: impl Into<String>) -> Self {
        Self::new(EXIT_PERSISTENCE, msg)
    }

    pub fn other(msg: impl Into<String>) -> Self {
        Self::new(EXIT_ERROR, msg)
    }

    /// Add a hint to an existing error.
    pub fn with_hint(mut self, hint: impl Into<String>) -> Self {
        self.hint = Some(hint.into());
        self
    }
}

// ============================================================================
// providers
// ============================================================================

fn cmd_providers(json: bool) -> Result<(), CliError> {
    if json {
        let list: Vec<serde_json::Value> = ProviderId::ALL
            .iter()
            .map(|p| {
                serde_json::json!({
                    "slug": p.slug(),
                    "name": p.display_name(),
                    "shape": p.shape().to_string(),
                    "channel_numbers": p.has_channel_numbers(),
                })
            })
            .collect();
        let text = serde_json::to_string_pretty(&list)
            .map_err(|e| CliError::other(format!("JSON serialization error: {e}")))?;
        println!("{text}");
        return Ok(());
    }

    println!("{:<16} {:<16} {:<14} NUMBERS", "SLUG", "NAME", "SHAPE");
    for p in ProviderId::ALL {
        println!(
            "{:<16} {:<16} {:<14} {}",
            p.slug(),
            p.display_name(),
            p.shape().to_string(),
            if p.has_channel_numbers() { "yes" } else { "no" }
        );
    }
    Ok(())
}
