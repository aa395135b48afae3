//! `tvlineup settings`: show or edit the saved defaults.

use std::path::PathBuf;

use clap::Subcommand;

use lineup_config::Settings;

use crate::CliError;

#[derive(Subcommand)]
pub enum SettingsCommands {
    /// Print the effective settings as JSON
    Show,

    /// Set the ZIP code used for provider lookups
    SetZip { zip: String },

    /// Set the default output directory
    SetOutput { dir: PathBuf },

    /// Set the default alias file
    SetAliases { file: PathBuf },
}

pub fn cmd_settings(cmd: SettingsCommands) -> Result<(), CliError> {
    let path = Settings::config_path();
    // Edits must not silently replace a file we could not parse.
    let mut settings = if path.exists() {
        Settings::load_from(&path).map_err(|e| {
            CliError::config(e.to_string()).with_hint("fix or delete the settings file, then retry")
        })?
    } else {
        Settings::default()
    };

    match cmd {
        SettingsCommands::Show => {
            let text = serde_json::to_string_pretty(&settings)
                .map_err(|e| CliError::other(format!("JSON serialization error: {e}")))?;
            eprintln!("# {}", Settings::config_path_display());
            println!("{text}");
            return Ok(());
        }
        SettingsCommands::SetZip { zip } => {
            settings.set_zip_code(&zip).map_err(|e| CliError::args(e.to_string()))?;
        }
        SettingsCommands::SetOutput { dir } => settings.output_dir = dir,
        SettingsCommands::SetAliases { file } => settings.alias_file = Some(file),
    }

    let saved = settings.save().map_err(|e| CliError::config(e.to_string()))?;
    eprintln!("wrote {}", saved.display());
    Ok(())
}
