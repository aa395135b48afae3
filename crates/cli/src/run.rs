//! `tvlineup run`: collect, reconcile, write.

use std::path::PathBuf;
use std::time::Duration;

use clap::{Args, ValueEnum};

use lineup_config::Settings;
use lineup_io::{ExtraSheet, OutputFormat, WriteOptions};
use lineup_recon::{adapt, project, project_provider, reconcile, AdaptedBatch, AliasTable, ProviderId, ProviderOutcome, RunReport};

use crate::exit_codes::EXIT_NO_DATA;
use crate::sources::{collect_all, CommandSource, DriverMode, ProviderSource, ScrapeRequest, SnapshotSource};
use crate::CliError;

/// Base name of the unified output file.
const OUTPUT_STEM: &str = "ChannelLineup";

#[derive(Args, Debug)]
pub struct RunArgs {
    /// Providers to include, comma-separated slugs or names (default: all)
    #[arg(long, value_delimiter = ',')]
    providers: Vec<String>,

    /// Output format: xlsx, csv or tsv
    #[arg(long, value_parser = parse_format)]
    format: Option<OutputFormat>,

    /// Browser-driver mode passed to the scraper
    #[arg(long, value_enum)]
    mode: Option<DriverMode>,

    /// Read saved results from DIR/<slug>.json
    #[arg(long, value_name = "DIR", conflicts_with = "scraper")]
    snapshots: Option<PathBuf>,

    /// External scraper command; called once per provider
    #[arg(long, value_name = "CMD")]
    scraper: Option<String>,

    /// Alias CSV (canonical name, then aliases)
    #[arg(long, value_name = "FILE")]
    aliases: Option<PathBuf>,

    /// Continue with no aliases if the alias file cannot be loaded
    #[arg(long)]
    allow_missing_aliases: bool,

    /// Output file (default: <output dir>/ChannelLineup.<ext>)
    #[arg(long, short = 'o')]
    output: Option<PathBuf>,

    /// Name of the main worksheet
    #[arg(long)]
    sheet: Option<String>,

    /// ZIP code handed to the scraper
    #[arg(long)]
    zip: Option<String>,

    /// Also write each provider's own channel list
    #[arg(long)]
    per_provider: bool,

    /// Link channel names to Wikipedia (xlsx only)
    #[arg(long)]
    wiki_links: bool,

    /// Write the JSON run report to FILE
    #[arg(long, value_name = "FILE")]
    report: Option<PathBuf>,

    /// Print the JSON run report to stdout
    #[arg(long)]
    json: bool,

    /// Concurrent scrapes (1-4)
    #[arg(long)]
    jobs: Option<usize>,

    /// Per-provider scraper timeout in seconds
    #[arg(long)]
    timeout: Option<u64>,
}

fn parse_format(s: &str) -> Result<OutputFormat, String> {
    s.parse()
}

/// Flags merged over saved settings.
struct RunPlan {
    providers: Vec<ProviderId>,
    format: OutputFormat,
    request: ScrapeRequest,
    source: Box<dyn ProviderSource>,
    alias_file: Option<PathBuf>,
    output: PathBuf,
    sheet_name: String,
    jobs: usize,
}

fn resolve(args: &RunArgs, mut settings: Settings) -> Result<RunPlan, CliError> {
    let names = if args.providers.is_empty() { settings.providers.clone() } else { args.providers.clone() };
    let mut providers: Vec<ProviderId> = Vec::new();
    for name in names.iter().map(|n| n.trim()).filter(|n| !n.is_empty()) {
        let id: ProviderId = name.parse().map_err(|e: lineup_recon::provider::UnknownProvider| CliError::args(e.to_string()))?;
        if !providers.contains(&id) {
            providers.push(id);
        }
    }
    if providers.is_empty() {
        providers = ProviderId::ALL.to_vec();
    }
    providers.sort();

    let format = match args.format {
        Some(f) => f,
        None => settings.format.parse().map_err(|e: String| CliError::args(format!("settings: {e}")))?,
    };

    let mode = match args.mode {
        Some(m) => m,
        None => DriverMode::from_str(&settings.mode, true)
            .map_err(|e| CliError::args(format!("settings: invalid mode '{}': {e}", settings.mode)))?,
    };

    if let Some(zip) = &args.zip {
        settings.set_zip_code(zip).map_err(|e| CliError::args(e.to_string()))?;
    }

    let timeout = Duration::from_secs(args.timeout.unwrap_or(settings.timeout_secs).max(1));
    let source: Box<dyn ProviderSource> = match (&args.snapshots, args.scraper.as_ref().or(settings.scraper_command.as_ref())) {
        (Some(dir), _) => Box::new(SnapshotSource::new(dir)),
        (None, Some(cmd)) => Box::new(
            CommandSource::parse(cmd, timeout).ok_or_else(|| CliError::args("scraper command is empty"))?,
        ),
        (None, None) => {
            return Err(CliError::args("no provider source")
                .with_hint("pass --snapshots DIR or --scraper CMD (or set \"scrape.command\" in settings)"));
        }
    };

    let output = args
        .output
        .clone()
        .unwrap_or_else(|| settings.output_dir.join(format!("{OUTPUT_STEM}.{}", format.extension())));

    Ok(RunPlan {
        providers,
        format,
        request: ScrapeRequest { zip_code: settings.zip_code.clone(), mode },
        source,
        alias_file: args.aliases.clone().or_else(|| settings.alias_file.clone()),
        output,
        sheet_name: args.sheet.clone().unwrap_or_else(|| settings.sheet_name.clone()),
        jobs: args.jobs.unwrap_or(settings.jobs),
    })
}

fn load_aliases(file: Option<&PathBuf>, allow_missing: bool) -> Result<AliasTable, CliError> {
    let Some(file) = file else {
        log::warn!("no alias file configured; channel names are only case/whitespace-normalized");
        return Ok(AliasTable::empty());
    };
    match AliasTable::load(file) {
        Ok(table) => Ok(table),
        Err(e) if allow_missing => {
            log::warn!("{e}; continuing with an empty alias table");
            Ok(AliasTable::empty())
        }
        Err(e) => Err(CliError::config(e.to_string()).with_hint("pass --allow-missing-aliases to continue without aliases")),
    }
}

pub fn cmd_run(args: RunArgs) -> Result<(), CliError> {
    let plan = resolve(&args, Settings::load())?;
    // Alias problems abort before any scraping starts.
    let aliases = load_aliases(plan.alias_file.as_ref(), args.allow_missing_aliases)?;

    let outcomes = collect_all(plan.source.as_ref(), &plan.providers, &plan.request, plan.jobs);
    let runs: Vec<(ProviderOutcome, AdaptedBatch)> = outcomes
        .into_iter()
        .map(|(provider, outcome)| {
            let batch = adapt(provider, &outcome);
            (outcome, batch)
        })
        .collect();
    let batches: Vec<AdaptedBatch> = runs.iter().map(|(_, b)| b.clone()).collect();

    let lineup = reconcile(&batches, &aliases);
    let report = RunReport::build(&plan.request.zip_code, &runs, &aliases, &lineup);
    emit_report(&args, &report)?;
    print_summary(&report);

    if report.nothing_collected() {
        return Err(CliError::new(EXIT_NO_DATA, "no provider produced usable data; nothing written")
            .with_hint("run with -v to see each provider's failure"));
    }

    let table = project(&lineup);
    let extras: Vec<ExtraSheet> = if args.per_provider {
        runs.iter()
            .filter(|(outcome, _)| matches!(outcome, ProviderOutcome::Collected(_)))
            .map(|(_, batch)| ExtraSheet {
                name: format!("{} Channels", batch.provider.display_name()),
                table: project_provider(batch),
            })
            .collect()
    } else {
        Vec::new()
    };

    if args.wiki_links && plan.format != OutputFormat::Xlsx {
        log::warn!("--wiki-links only applies to xlsx output; ignored");
    }
    let options = WriteOptions { format: plan.format, sheet_name: plan.sheet_name, wiki_links: args.wiki_links };
    let written = lineup_io::write_lineup(&plan.output, &table, &extras, &options)
        .map_err(|e| CliError::persistence(e.to_string()))?;

    for file in &written.files {
        eprintln!("wrote {}", file.display());
    }
    Ok(())
}

fn emit_report(args: &RunArgs, report: &RunReport) -> Result<(), CliError> {
    if args.report.is_none() && !args.json {
        return Ok(());
    }
    let json = serde_json::to_string_pretty(report)
        .map_err(|e| CliError::other(format!("JSON serialization error: {e}")))?;
    if let Some(path) = &args.report {
        std::fs::write(path, format!("{json}\n"))
            .map_err(|e| CliError::persistence(format!("cannot write report {}: {e}", path.display())))?;
        eprintln!("wrote {}", path.display());
    }
    if args.json {
        println!("{json}");
    }
    Ok(())
}

fn print_summary(report: &RunReport) {
    let s = &report.summary;
    eprintln!(
        "lineup: {} channels x {} columns from {}/{} providers, {} number conflict(s)",
        s.rows, s.columns, s.providers_collected, s.providers_selected, s.number_conflicts
    );
    for p in report.providers.iter().filter(|p| !p.warnings.is_empty()) {
        eprintln!("  {}: {} warning(s)", p.name, p.warnings.len());
    }
}
