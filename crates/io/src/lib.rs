// Lineup persistence: workbook and delimited-text writers

pub mod atomic;
pub mod csv;
pub mod error;
pub mod xlsx;

use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use lineup_recon::ProjectedTable;

pub use error::PersistenceError;

/// Default name of the main worksheet.
pub const DEFAULT_SHEET_NAME: &str = "Channels";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    #[default]
    Xlsx,
    Csv,
    Tsv,
}

impl OutputFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            Self::Xlsx => "xlsx",
            Self::Csv => "csv",
            Self::Tsv => "tsv",
        }
    }
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.extension())
    }
}

impl FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "xlsx" | "excel" | "spreadsheet" => Ok(Self::Xlsx),
            "csv" => Ok(Self::Csv),
            "tsv" | "tab" => Ok(Self::Tsv),
            other => Err(format!("unknown output format '{other}' (expected xlsx, csv or tsv)")),
        }
    }
}

/// A named table to persist next to the main lineup.
#[derive(Debug, Clone)]
pub struct ExtraSheet {
    pub name: String,
    pub table: ProjectedTable,
}

#[derive(Debug, Clone)]
pub struct WriteOptions {
    pub format: OutputFormat,
    pub sheet_name: String,
    /// Hyperlink channel names to Wikipedia (workbook only).
    pub wiki_links: bool,
}

impl Default for WriteOptions {
    fn default() -> Self {
        Self { format: OutputFormat::Xlsx, sheet_name: DEFAULT_SHEET_NAME.to_string(), wiki_links: false }
    }
}

/// What ended up on disk.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WriteSummary {
    pub files: Vec<PathBuf>,
    pub sheets: usize,
    pub rows: usize,
}

/// Persist the lineup, plus optional extra tables.
///
/// The workbook format keeps everything in one file (one sheet per table);
/// delimited formats write one sibling file per extra table. Every file is
/// written all-or-nothing.
pub fn write_lineup(
    path: &Path,
    table: &ProjectedTable,
    extras: &[ExtraSheet],
    options: &WriteOptions,
) -> Result<WriteSummary, PersistenceError> {
    let summary = match options.format {
        OutputFormat::Xlsx => xlsx::export(path, table, extras, options)?,
        OutputFormat::Csv | OutputFormat::Tsv => {
            let delimiter = if options.format == OutputFormat::Tsv { b'\t' } else { b',' };
            let mut summary = WriteSummary::default();
            csv::export(path, table, delimiter)?;
            summary.files.push(path.to_path_buf());
            summary.sheets += 1;
            summary.rows += table.rows.len();
            for extra in extras {
                let sibling = sibling_path(path, &extra.name);
                csv::export(&sibling, &extra.table, delimiter)?;
                summary.files.push(sibling);
                summary.sheets += 1;
                summary.rows += extra.table.rows.len();
            }
            summary
        }
    };
    log::info!(
        "wrote {} row(s) across {} table(s) to {}",
        summary.rows,
        summary.sheets,
        summary.files.iter().map(|p| p.display().to_string()).collect::<Vec<_>>().join(", ")
    );
    Ok(summary)
}

/// `out/lineup.csv` + `DirecTV` → `out/lineup_DirecTV.csv`.
pub fn sibling_path(path: &Path, suffix: &str) -> PathBuf {
    let stem = path.file_stem().map(|s| s.to_string_lossy().into_owned()).unwrap_or_default();
    let suffix: String = suffix
        .chars()
        .map(|c| if c.is_alphanumeric() || c == '-' { c } else { '_' })
        .collect();
    let name = match path.extension() {
        Some(ext) => format!("{stem}_{suffix}.{}", ext.to_string_lossy()),
        None => format!("{stem}_{suffix}"),
    };
    path.with_file_name(name)
}
