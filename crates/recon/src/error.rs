use std::path::PathBuf;

use thiserror::Error;

/// Run-level failure while loading the alias table.
///
/// Per-provider problems never surface as errors; they become
/// [`AdaptationWarning`](crate::model::AdaptationWarning)s instead.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Alias file does not exist or cannot be opened.
    #[error("alias source '{}' cannot be read: {source}", path.display())]
    Unreadable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    /// CSV-level parse failure (bad quoting, invalid UTF-8, ...).
    #[error("alias source line {line}: {message}")]
    Malformed { line: u64, message: String },
    /// A row whose canonical (first) column is empty.
    #[error("alias source line {line}: empty canonical name")]
    EmptyCanonical { line: u64 },
}
