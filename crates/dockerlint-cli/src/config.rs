//! Locating and loading the settings file.

use anyhow::{Context, Result};
use dockerlint_core::Settings;
use std::path::{Path, PathBuf};

pub const PROJECT_CONFIG: &str = ".dockerlint.toml";

/// Candidate settings files, most specific first.
fn candidates() -> Vec<PathBuf> {
    let mut paths = vec![PathBuf::from(PROJECT_CONFIG)];
    if let Some(dir) = dirs::config_dir() {
        paths.push(dir.join("dockerlint").join("config.toml"));
    }
    paths
}

/// Load settings from `explicit`, or from the first candidate that exists.
/// No file at all means empty settings.
pub fn load_settings(explicit: Option<&Path>) -> Result<Settings> {
    if let Some(path) = explicit {
        return read_settings(path);
    }

    match candidates().into_iter().find(|p| p.is_file()) {
        Some(path) => read_settings(&path),
        None => {
            tracing::debug!("no settings file found, using built-in defaults");
            Ok(Settings::default())
        }
    }
}

pub fn read_settings(path: &Path) -> Result<Settings> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read settings file {}", path.display()))?;
    let settings = toml::from_str(&content)
        .with_context(|| format!("failed to parse settings file {}", path.display()))?;
    tracing::debug!(path = %path.display(), "loaded settings");
    Ok(settings)
}
