use std::path::PathBuf;

use thiserror::Error;

/// A writer could not produce its output. The previous file at the target
/// path, if any, is left as it was.
#[derive(Debug, Error)]
pub enum PersistenceError {
    #[error("cannot write '{}': {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("cannot write '{}': {source}", path.display())]
    Csv {
        path: PathBuf,
        #[source]
        source: ::csv::Error,
    },
    #[error("cannot build workbook '{}': {message}", path.display())]
    Xlsx { path: PathBuf, message: String },
}

impl PersistenceError {
    pub fn path(&self) -> &std::path::Path {
        match self {
            Self::Io { path, .. } | Self::Csv { path, .. } | Self::Xlsx { path, .. } => path,
        }
    }
}
