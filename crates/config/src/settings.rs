// User settings
// Loaded from ~/.config/tvlineup/settings.json

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Overrides the settings file location.
pub const CONFIG_ENV: &str = "TVLINEUP_CONFIG";

#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("cannot read settings '{}': {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("settings '{}' is not valid: {source}", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("cannot write settings '{}': {source}", path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid ZIP code '{0}' (expected 5 digits)")]
    InvalidZip(String),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    // Scraping
    #[serde(rename = "scrape.zipCode")]
    pub zip_code: String,

    /// "visible" or "headless"
    #[serde(rename = "scrape.mode")]
    pub mode: String,

    /// Provider slugs; empty = all
    #[serde(rename = "scrape.providers")]
    pub providers: Vec<String>,

    /// External scraper program plus leading arguments
    #[serde(rename = "scrape.command", skip_serializing_if = "Option::is_none")]
    pub scraper_command: Option<String>,

    #[serde(rename = "scrape.timeoutSecs")]
    pub timeout_secs: u64,

    #[serde(rename = "scrape.jobs")]
    pub jobs: usize,

    // Output
    #[serde(rename = "output.dir")]
    pub output_dir: PathBuf,

    /// "xlsx", "csv" or "tsv"
    #[serde(rename = "output.format")]
    pub format: String,

    #[serde(rename = "output.sheetName")]
    pub sheet_name: String,

    // Aliases
    #[serde(rename = "aliases.file", skip_serializing_if = "Option::is_none")]
    pub alias_file: Option<PathBuf>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            zip_code: "79423".to_string(),
            mode: "headless".to_string(),
            providers: Vec::new(),
            scraper_command: None,
            timeout_secs: 300,
            jobs: 4,
            output_dir: PathBuf::from("./output"),
            format: "xlsx".to_string(),
            sheet_name: "Channels".to_string(),
            alias_file: None,
        }
    }
}

impl Settings {
    /// Get the settings file path
    pub fn config_path() -> PathBuf {
        if let Some(path) = std::env::var_os(CONFIG_ENV).filter(|p| !p.is_empty()) {
            return PathBuf::from(path);
        }
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("tvlineup")
            .join("settings.json")
    }

    /// Load settings from disk, falling back to defaults
    pub fn load() -> Self {
        let path = Self::config_path();
        if !path.exists() {
            log::debug!("no settings at {}, using defaults", path.display());
            return Self::default();
        }
        match Self::load_from(&path) {
            Ok(settings) => settings,
            Err(e) => {
                log::warn!("{e}; using default settings");
                Self::default()
            }
        }
    }

    /// Strict load: any read or parse problem is an error.
    pub fn load_from(path: &Path) -> Result<Self, SettingsError> {
        let contents = fs::read_to_string(path).map_err(|source| SettingsError::Read {
            path: path.to_path_buf(),
            source,
        })?;

        // Strip comments (lines starting with //)
        let cleaned: String = contents
            .lines()
            .filter(|line| !line.trim().starts_with("//"))
            .collect::<Vec<_>>()
            .join("\n");

        serde_json::from_str(&cleaned).map_err(|source| SettingsError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Save current settings to the default location
    pub fn save(&self) -> Result<PathBuf, SettingsError> {
        let path = Self::config_path();
        self.save_to(&path)?;
        Ok(path)
    }

    pub fn save_to(&self, path: &Path) -> Result<(), SettingsError> {
        let write_err = |source| SettingsError::Write { path: path.to_path_buf(), source };

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(write_err)?;
        }

        let json = serde_json::to_string_pretty(self).map_err(|e| SettingsError::Write {
            path: path.to_path_buf(),
            source: std::io::Error::other(e),
        })?;
        fs::write(path, json + "\n").map_err(write_err)
    }

    /// Validate and set the ZIP code used for provider lookups.
    pub fn set_zip_code(&mut self, zip: &str) -> Result<(), SettingsError> {
        let zip = zip.trim();
        if zip.len() != 5 || !zip.chars().all(|c| c.is_ascii_digit()) {
            return Err(SettingsError::InvalidZip(zip.to_string()));
        }
        self.zip_code = zip.to_string();
        Ok(())
    }

    /// Get the config file path for display
    pub fn config_path_display() -> String {
        Self::config_path().to_string_lossy().to_string()
    }
}
