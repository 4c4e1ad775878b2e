//! Extraction configuration and its validation

use crate::extract::Extractor;
use crate::profile::ProfileName;
use regex::RegexBuilder;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Describes how to turn linter output into diagnostics: a pattern with
/// numbered capture groups and the group index for each diagnostic field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExtractionConfig {
    /// Evaluated globally and in multi-line mode.
    pub pattern: String,
    /// Group holding the 1-based line number.
    pub line_group: usize,
    /// Group holding the column. Without it diagnostics span the whole line.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub column_group: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub severity_group: Option<usize>,
    pub message_group: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code_group: Option<usize>,
}

/// Errors raised while building a usable linter configuration.
///
/// All of these are detected once, when settings are loaded, so that
/// extraction itself never has to fail.
#[derive(Debug, Clone, Error)]
pub enum ConfigError {
    #[error("invalid pattern '{pattern}': {source}")]
    InvalidPattern {
        pattern: String,
        #[source]
        source: regex::Error,
    },

    #[error("{field} is {index} but the pattern only has {available} capture group(s)")]
    GroupOutOfRange {
        field: &'static str,
        index: usize,
        available: usize,
    },

    #[error("profile '{profile}' overrides the pattern but does not set {field}")]
    MissingGroup {
        profile: ProfileName,
        field: &'static str,
    },

    #[error("profile '{profile}' has no container configured")]
    MissingContainer { profile: ProfileName },

    #[error("profile '{profile}' has an empty command")]
    EmptyCommand { profile: ProfileName },

    #[error("unknown linter profile '{name}' (expected one of: {})", ProfileName::names())]
    UnknownProfile { name: String },

    #[error("active profile '{profile}' is selected but not configured")]
    ProfileNotConfigured { profile: ProfileName },

    #[error(
        "multiple linter profiles are configured ({}); set activeProfile to choose one",
        join_names(.profiles)
    )]
    AmbiguousProfiles { profiles: Vec<ProfileName> },
}

fn join_names(profiles: &[ProfileName]) -> String {
    profiles
        .iter()
        .map(|p| p.as_str())
        .collect::<Vec<_>>()
        .join(", ")
}

impl ExtractionConfig {
    /// Compile the pattern and check every configured group index against
    /// the number of capture groups it declares.
    pub fn compile(&self) -> Result<Extractor, ConfigError> {
        let regex = RegexBuilder::new(&self.pattern)
            .multi_line(true)
            .crlf(true)
            .build()
            .map_err(|source| ConfigError::InvalidPattern {
                pattern: self.pattern.clone(),
                source,
            })?;

        // captures_len counts the implicit whole-match group 0
        let available = regex.captures_len() - 1;
        for (field, index) in self.group_indices() {
            if index > available {
                return Err(ConfigError::GroupOutOfRange {
                    field,
                    index,
                    available,
                });
            }
        }

        Ok(Extractor::new(regex, self.clone()))
    }

    fn group_indices(&self) -> impl Iterator<Item = (&'static str, usize)> {
        [
            ("lineGroup", Some(self.line_group)),
            ("columnGroup", self.column_group),
            ("severityGroup", self.severity_group),
            ("messageGroup", Some(self.message_group)),
            ("codeGroup", self.code_group),
        ]
        .into_iter()
        .filter_map(|(field, index)| index.map(|i| (field, i)))
    }
}
