//! Where raw provider results come from.
//!
//! Scraping itself is an external collaborator: either a directory of saved
//! results (`<dir>/<slug>.json`) or an external scraper program that prints
//! one result as JSON on stdout.

use std::io::Read;
use std::panic::{self, AssertUnwindSafe};
use std::path::PathBuf;
use std::process::{Command, Stdio};
use std::thread;
use std::time::Duration;

use clap::ValueEnum;
use rayon::prelude::*;
use thiserror::Error;

use lineup_recon::{ProviderId, ProviderOutcome, ProviderResult};

use crate::process::TrackedChild;

/// Upper bound on concurrent scrapes.
pub const MAX_JOBS: usize = 4;

/// Browser-driver run mode handed to the scraper.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum DriverMode {
    Visible,
    #[default]
    Headless,
}

impl DriverMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Visible => "visible",
            Self::Headless => "headless",
        }
    }
}

#[derive(Debug, Clone)]
pub struct ScrapeRequest {
    pub zip_code: String,
    pub mode: DriverMode,
}

#[derive(Debug, Error)]
pub enum SourceError {
    #[error("no saved result at {}", .0.display())]
    Missing(PathBuf),
    #[error("cannot read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("result does not match any known shape")]
    Undecodable,
    #[error("cannot start scraper '{program}': {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },
    #[error("scraper timed out after {0:?}")]
    Timeout(Duration),
    #[error("scraper exited with {status}: {stderr}")]
    Exit { status: String, stderr: String },
    #[error("scraper panicked: {0}")]
    Panicked(String),
}

impl SourceError {
    /// Undecodable payloads are malformed data; everything else is a failed scrape.
    pub fn into_outcome(self) -> ProviderOutcome {
        let reason = self.to_string();
        match self {
            SourceError::Undecodable => ProviderOutcome::Malformed(reason),
            _ => ProviderOutcome::Failed(reason),
        }
    }
}

pub trait ProviderSource: Send + Sync {
    /// Short label for logs.
    fn describe(&self) -> String;

    fn collect(&self, provider: ProviderId, request: &ScrapeRequest) -> Result<ProviderResult, SourceError>;
}

// ============================================================================
// Saved results
// ============================================================================

pub struct SnapshotSource {
    dir: PathBuf,
}

impl SnapshotSource {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn path_for(&self, provider: ProviderId) -> PathBuf {
        self.dir.join(format!("{}.json", provider.slug()))
    }
}

impl ProviderSource for SnapshotSource {
    fn describe(&self) -> String {
        format!("snapshots in {}", self.dir.display())
    }

    fn collect(&self, provider: ProviderId, _request: &ScrapeRequest) -> Result<ProviderResult, SourceError> {
        let path = self.path_for(provider);
        if !path.exists() {
            return Err(SourceError::Missing(path));
        }
        let text = std::fs::read_to_string(&path).map_err(|source| SourceError::Io { path: path.clone(), source })?;
        ProviderResult::from_json_str(&text).ok_or(SourceError::Undecodable)
    }
}

// ============================================================================
// External scraper
// ============================================================================

/// Runs `<program> <args...> <slug> --mode <mode> --zip <zip>` per provider.
pub struct CommandSource {
    program: String,
    args: Vec<String>,
    timeout: Duration,
}

impl CommandSource {
    /// `command` is split on whitespace: program first, then fixed arguments.
    pub fn parse(command: &str, timeout: Duration) -> Option<Self> {
        let mut parts = command.split_whitespace().map(str::to_string);
        let program = parts.next()?;
        Some(Self { program, args: parts.collect(), timeout })
    }

    fn build(&self, provider: ProviderId, request: &ScrapeRequest) -> Command {
        let mut command = Command::new(&self.program);
        command
            .args(&self.args)
            .arg(provider.slug())
            .arg("--mode")
            .arg(request.mode.as_str())
            .arg("--zip")
            .arg(&request.zip_code)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());
        command
    }
}

impl ProviderSource for CommandSource {
    fn describe(&self) -> String {
        format!("scraper '{}'", self.program)
    }

    fn collect(&self, provider: ProviderId, request: &ScrapeRequest) -> Result<ProviderResult, SourceError> {
        let mut child = TrackedChild::spawn(&mut self.build(provider, request)).map_err(|source| SourceError::Spawn {
            program: self.program.clone(),
            source,
        })?;

        // Drain both pipes on their own threads so a chatty child cannot block.
        let stdout = child.child_mut().stdout.take().map(drain);
        let stderr = child.child_mut().stderr.take().map(drain);

        let status = child
            .wait_timeout(self.timeout)
            .map_err(|source| SourceError::Spawn { program: self.program.clone(), source })?;

        // After a timeout a grandchild may still hold the pipes; leave the readers detached.
        let Some(status) = status else {
            return Err(SourceError::Timeout(self.timeout));
        };
        let stdout = stdout.and_then(|h| h.join().ok()).unwrap_or_default();
        let stderr = stderr.and_then(|h| h.join().ok()).unwrap_or_default();
        if !status.success() {
            return Err(SourceError::Exit {
                status: status.to_string(),
                stderr: stderr.trim().lines().last().unwrap_or_default().to_string(),
            });
        }
        for line in stderr.lines().filter(|l| !l.trim().is_empty()) {
            log::debug!("{provider} scraper: {line}");
        }

        ProviderResult::from_json_str(&stdout).ok_or(SourceError::Undecodable)
    }
}

fn drain<R: Read + Send + 'static>(mut pipe: R) -> thread::JoinHandle<String> {
    thread::spawn(move || {
        let mut buf = Vec::new();
        if let Err(e) = pipe.read_to_end(&mut buf) {
            log::debug!("pipe read failed: {e}");
        }
        String::from_utf8_lossy(&buf).into_owned()
    })
}

// ============================================================================
// Collection
// ============================================================================

/// Collect every provider, at most `jobs` (capped at [`MAX_JOBS`]) at a time.
///
/// Never fails: errors and panics become per-provider outcomes. Results come
/// back in the order of `providers`.
pub fn collect_all(
    source: &dyn ProviderSource,
    providers: &[ProviderId],
    request: &ScrapeRequest,
    jobs: usize,
) -> Vec<(ProviderId, ProviderOutcome)> {
    let workers = jobs.clamp(1, MAX_JOBS);
    log::info!("collecting {} provider(s) from {} with {workers} worker(s)", providers.len(), source.describe());

    let run = || {
        providers
            .par_iter()
            .map(|&provider| (provider, collect_one(source, provider, request)))
            .collect::<Vec<_>>()
    };

    match rayon::ThreadPoolBuilder::new()
        .num_threads(workers)
        .thread_name(|i| format!("scrape-{i}"))
        .build()
    {
        Ok(pool) => pool.install(run),
        Err(e) => {
            log::warn!("cannot build worker pool ({e}); collecting sequentially");
            providers.iter().map(|&p| (p, collect_one(source, p, request))).collect()
        }
    }
}

fn collect_one(source: &dyn ProviderSource, provider: ProviderId, request: &ScrapeRequest) -> ProviderOutcome {
    let attempt = panic::catch_unwind(AssertUnwindSafe(|| source.collect(provider, request)));
    let outcome = match attempt {
        Ok(Ok(result)) => ProviderOutcome::Collected(result),
        Ok(Err(e)) => e.into_outcome(),
        Err(payload) => SourceError::Panicked(panic_message(payload.as_ref())).into_outcome(),
    };
    match &outcome {
        ProviderOutcome::Collected(result) => log::info!("{provider}: collected {} result", result.shape()),
        ProviderOutcome::Malformed(reason) | ProviderOutcome::Failed(reason) => log::warn!("{provider}: {reason}"),
    }
    outcome
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    payload
        .downcast_ref::<&str>()
        .map(|s| s.to_string())
        .or_else(|| payload.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "unknown panic".to_string())
}
