//! `tvlineup aliases`: inspect an alias table without running a scrape.

use std::path::{Path, PathBuf};

use clap::Subcommand;
use serde::Serialize;

use lineup_recon::AliasTable;

use crate::CliError;

#[derive(Subcommand)]
pub enum AliasCommands {
    /// Load an alias file and report counts and conflicts
    #[command(after_help = "\
Examples:
  tvlineup aliases check aliases.csv
  tvlineup aliases check aliases.csv --json")]
    Check {
        /// Alias CSV: canonical name, then aliases
        file: PathBuf,

        /// Output JSON to stdout instead of a human summary
        #[arg(long)]
        json: bool,
    },

    /// Print the canonical name for each given channel name
    #[command(after_help = "\
Examples:
  tvlineup aliases lookup aliases.csv 'USA HD' 'espn (east)'")]
    Lookup {
        file: PathBuf,

        /// Raw channel names
        #[arg(required = true)]
        names: Vec<String>,
    },
}

#[derive(Serialize)]
struct CheckReport<'a> {
    file: String,
    canonical_names: usize,
    spellings: usize,
    conflicts: &'a [lineup_recon::alias::AliasConflict],
}

pub fn cmd_aliases(cmd: AliasCommands) -> Result<(), CliError> {
    match cmd {
        AliasCommands::Check { file, json } => cmd_check(file, json),
        AliasCommands::Lookup { file, names } => cmd_lookup(file, names),
    }
}

fn load(file: &Path) -> Result<AliasTable, CliError> {
    AliasTable::load(file).map_err(|e| CliError::config(e.to_string()))
}

fn cmd_check(file: PathBuf, json: bool) -> Result<(), CliError> {
    let table = load(&file)?;
    let report = CheckReport {
        file: file.display().to_string(),
        canonical_names: table.entries().len(),
        spellings: table.len(),
        conflicts: table.conflicts(),
    };

    if json {
        let text = serde_json::to_string_pretty(&report)
            .map_err(|e| CliError::other(format!("JSON serialization error: {e}")))?;
        println!("{text}");
        return Ok(());
    }

    println!(
        "{}: {} canonical names, {} spellings, {} conflict(s)",
        report.file,
        report.canonical_names,
        report.spellings,
        report.conflicts.len()
    );
    for c in report.conflicts {
        println!("  line {}: '{}' moved from '{}' to '{}'", c.line, c.alias, c.previous, c.winner);
    }
    Ok(())
}

fn cmd_lookup(file: PathBuf, names: Vec<String>) -> Result<(), CliError> {
    let table = load(&file)?;
    for name in names {
        let canonical = table.canonicalize(&name);
        let marker = if table.contains(&name) { "" } else { "  (unknown)" };
        println!("{name}\t{canonical}{marker}");
    }
    Ok(())
}
