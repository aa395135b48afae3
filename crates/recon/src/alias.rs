//! Canonical channel names and their alias spellings.
//!
//! The source is a headerless table: column 0 is the canonical name, every
//! further non-empty column is an alias. Lookups are case- and
//! surrounding-whitespace-insensitive; everything is stored normalized.

use std::collections::{BTreeSet, HashMap};
use std::io::Read;
use std::path::Path;

use serde::Serialize;

use crate::error::ConfigError;

/// Trim and lower-case. The one normalization used for every lookup.
pub fn normalize(name: &str) -> String {
    name.trim().trim_start_matches('\u{feff}').trim().to_lowercase()
}

/// One row of the alias source.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AliasEntry {
    pub canonical: String,
    pub aliases: BTreeSet<String>,
}

/// An alias listed under two different canonical rows.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AliasConflict {
    pub alias: String,
    pub previous: String,
    pub winner: String,
    pub line: u64,
}

/// Immutable alias index, loaded once per run and passed explicitly.
#[derive(Debug, Clone, Default)]
pub struct AliasTable {
    entries: Vec<AliasEntry>,
    index: HashMap<String, String>,
    conflicts: Vec<AliasConflict>,
}

impl AliasTable {
    /// Table with no aliases: every name is its own canonical identity.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Load from a CSV file.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let file = std::fs::File::open(path).map_err(|source| ConfigError::Unreadable {
            path: path.to_path_buf(),
            source,
        })?;
        let table = Self::from_reader(file)?;
        log::info!(
            "loaded {} alias rows ({} spellings) from {}",
            table.entries.len(),
            table.index.len(),
            path.display()
        );
        Ok(table)
    }

    /// Load from any CSV byte stream.
    pub fn from_reader<R: Read>(reader: R) -> Result<Self, ConfigError> {
        let mut csv_reader = csv::ReaderBuilder::new()
            .has_headers(false)
            .flexible(true)
            .trim(csv::Trim::All)
            .from_reader(reader);

        let mut rows: Vec<(u64, Vec<String>)> = Vec::new();
        for record in csv_reader.records() {
            let record = record.map_err(|e| ConfigError::Malformed {
                line: e.position().map(|p| p.line()).unwrap_or(0),
                message: e.to_string(),
            })?;
            let line = record.position().map(|p| p.line()).unwrap_or(0);
            rows.push((line, record.iter().map(str::to_string).collect()));
        }

        Self::from_rows(rows)
    }

    /// Parse CSV text.
    pub fn from_csv_str(input: &str) -> Result<Self, ConfigError> {
        Self::from_reader(input.as_bytes())
    }

    fn from_rows(rows: Vec<(u64, Vec<String>)>) -> Result<Self, ConfigError> {
        let mut table = AliasTable::default();

        for (line, cells) in rows {
            let mut cells = cells.iter().map(|c| normalize(c));
            let canonical = cells.next().unwrap_or_default();
            let aliases: BTreeSet<String> = cells.filter(|c| !c.is_empty()).collect();

            if canonical.is_empty() {
                if aliases.is_empty() {
                    continue; // blank line
                }
                return Err(ConfigError::EmptyCanonical { line });
            }

            // The canonical name is implicitly one of its own aliases.
            table.bind(&canonical, &canonical, line);
            for alias in &aliases {
                table.bind(alias, &canonical, line);
            }
            table.entries.push(AliasEntry { canonical, aliases });
        }

        table.collapse_chains();
        Ok(table)
    }

    /// Last-loaded wins on conflict; the loser is recorded.
    fn bind(&mut self, alias: &str, canonical: &str, line: u64) {
        if let Some(previous) = self.index.insert(alias.to_string(), canonical.to_string()) {
            if previous != canonical {
                log::warn!(
                    "alias '{alias}' (line {line}) moves from '{previous}' to '{canonical}'"
                );
                self.conflicts.push(AliasConflict {
                    alias: alias.to_string(),
                    previous,
                    winner: canonical.to_string(),
                    line,
                });
            }
        }
    }

    /// A canonical name that a later row re-bound as an alias would break
    /// idempotence (`canonicalize(canonicalize(x)) != canonicalize(x)`).
    /// Point every spelling at the end of its chain; cycles stay as loaded.
    fn collapse_chains(&mut self) {
        let snapshot = self.index.clone();
        for target in self.index.values_mut() {
            let mut current = target.clone();
            let mut hops = 0;
            while let Some(next) = snapshot.get(&current) {
                if *next == current || hops > snapshot.len() {
                    break;
                }
                current = next.clone();
                hops += 1;
            }
            if hops <= snapshot.len() && current != *target {
                log::debug!("alias chain '{target}' resolved to '{current}'");
                *target = current;
            }
        }
    }

    /// Map a raw channel name to its canonical identity.
    ///
    /// Unknown names are their own canonical identity (normalized).
    pub fn canonicalize(&self, raw_name: &str) -> String {
        let key = normalize(raw_name);
        match self.index.get(&key) {
            Some(canonical) => canonical.clone(),
            None => key,
        }
    }

    /// Whether the normalized name is a known spelling.
    pub fn contains(&self, raw_name: &str) -> bool {
        self.index.contains_key(&normalize(raw_name))
    }

    pub fn entries(&self) -> &[AliasEntry] {
        &self.entries
    }

    pub fn conflicts(&self) -> &[AliasConflict] {
        &self.conflicts
    }

    /// Number of distinct known spellings, canonical names included.
    pub fn len(&self) -> usize {
        self.index.len()
    }

    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }
}
