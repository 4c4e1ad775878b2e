//! Editor settings and the configuration snapshot used by validation runs.

use dockerlint_core::{ConfigError, ResolvedProfile, Settings};
use serde::Deserialize;
use serde_json::Value as JsonValue;
use std::sync::Arc;

/// Payload of `workspace/didChangeConfiguration`.
///
/// Only the `dockerLinter` section is read; everything else the editor
/// sends is ignored.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SettingsPayload {
    #[serde(default, rename = "dockerLinter", alias = "docker-linter")]
    pub docker_linter: Settings,
}

impl SettingsPayload {
    /// Parse a settings payload. A `null` payload means no settings.
    pub fn from_value(value: JsonValue) -> Result<Self, serde_json::Error> {
        if value.is_null() {
            return Ok(Self::default());
        }
        serde_json::from_value(value)
    }
}

/// Immutable configuration shared by every run started under it.
///
/// A settings change builds a new snapshot with a higher version; runs
/// compare versions before publishing so results produced under replaced
/// settings are dropped.
#[derive(Debug, Clone, Default)]
pub struct ActiveConfig {
    pub version: u64,
    pub profile: Option<Arc<ResolvedProfile>>,
}

impl ActiveConfig {
    pub fn resolve(settings: &Settings) -> Result<Option<Arc<ResolvedProfile>>, ConfigError> {
        Ok(settings.resolve()?.map(Arc::new))
    }

    pub fn new(version: u64, profile: Option<Arc<ResolvedProfile>>) -> Self {
        Self { version, profile }
    }
}
