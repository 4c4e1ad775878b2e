//! Linter profiles and settings selection.
//!
//! A profile bundles the command run inside the container with the
//! extraction config used to read its output. Each built-in profile ships
//! defaults; users override individual fields through [`ProfileSettings`].

use crate::config::{ConfigError, ExtractionConfig};
use crate::extract::Extractor;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// The fixed set of linters a user can configure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProfileName {
    Perl,
    Perlcritic,
    Flake8,
    Rubocop,
    Php,
}

impl ProfileName {
    /// All profiles, in settings iteration order.
    pub const ALL: [ProfileName; 5] = [
        ProfileName::Perl,
        ProfileName::Perlcritic,
        ProfileName::Flake8,
        ProfileName::Rubocop,
        ProfileName::Php,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            ProfileName::Perl => "perl",
            ProfileName::Perlcritic => "perlcritic",
            ProfileName::Flake8 => "flake8",
            ProfileName::Rubocop => "rubocop",
            ProfileName::Php => "php",
        }
    }

    pub fn names() -> String {
        Self::ALL
            .iter()
            .map(|p| p.as_str())
            .collect::<Vec<_>>()
            .join(", ")
    }

    /// Built-in command and output format for this linter.
    pub fn defaults(self) -> ProfileDefaults {
        match self {
            ProfileName::Perl => ProfileDefaults {
                command: &["perl", "-c"],
                pattern: r"^(.+) at - line (\d+)",
                line_group: 2,
                column_group: None,
                severity_group: None,
                message_group: 1,
                code_group: None,
            },
            ProfileName::Perlcritic => ProfileDefaults {
                command: &["perlcritic", "--nocolor", "--verbose", "%l:%c:%s:%p:%m\n"],
                pattern: r"^(\d+):(\d+):(\d):([\w:]+):(.+)$",
                line_group: 1,
                column_group: Some(2),
                severity_group: None,
                message_group: 5,
                code_group: Some(4),
            },
            ProfileName::Flake8 => ProfileDefaults {
                command: &["flake8", "-"],
                pattern: r"^stdin:(\d+):(\d+): (\w\d+) (.+)$",
                line_group: 1,
                column_group: Some(2),
                severity_group: None,
                message_group: 4,
                code_group: Some(3),
            },
            ProfileName::Rubocop => ProfileDefaults {
                command: &["rubocop", "--format", "emacs", "--stdin", "stdin.rb"],
                pattern: r"^.+?:(\d+):(\d+): (\w): (?:\[Correctable\] )?(.+)$",
                line_group: 1,
                column_group: Some(2),
                severity_group: None,
                message_group: 4,
                code_group: Some(3),
            },
            ProfileName::Php => ProfileDefaults {
                command: &["php", "-l"],
                pattern: r"^(?:PHP )?(?:Parse|Fatal) error:\s+(.+) in (?:-|Standard input code) on line (\d+)",
                line_group: 2,
                column_group: None,
                severity_group: None,
                message_group: 1,
                code_group: None,
            },
        }
    }
}

impl std::fmt::Display for ProfileName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ProfileName {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|p| p.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| ConfigError::UnknownProfile {
                name: s.to_string(),
            })
    }
}

/// Built-in settings for a profile.
#[derive(Debug, Clone, Copy)]
pub struct ProfileDefaults {
    pub command: &'static [&'static str],
    pub pattern: &'static str,
    pub line_group: usize,
    pub column_group: Option<usize>,
    pub severity_group: Option<usize>,
    pub message_group: usize,
    pub code_group: Option<usize>,
}

impl ProfileDefaults {
    pub fn extraction(&self) -> ExtractionConfig {
        ExtractionConfig {
            pattern: self.pattern.to_string(),
            line_group: self.line_group,
            column_group: self.column_group,
            severity_group: self.severity_group,
            message_group: self.message_group,
            code_group: self.code_group,
        }
    }

    pub fn command(&self) -> Vec<String> {
        self.command.iter().map(|s| s.to_string()).collect()
    }
}

/// Command as written in settings: either a single string split on
/// whitespace, or an explicit argument vector.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum CommandSpec {
    Line(String),
    Argv(Vec<String>),
}

impl CommandSpec {
    pub fn argv(&self) -> Vec<String> {
        match self {
            CommandSpec::Line(line) => line.split_whitespace().map(str::to_string).collect(),
            CommandSpec::Argv(argv) => argv.clone(),
        }
    }
}

/// User overrides for one profile. Every field is optional.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfileSettings {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub container: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub command: Option<CommandSpec>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pattern: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub line_group: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub column_group: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub severity_group: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message_group: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code_group: Option<usize>,
    /// Append the exit-status diagnostic after each run. Defaults to `true`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub report_exit_status: Option<bool>,
}

impl ProfileSettings {
    /// Extraction config for `name` with these overrides applied.
    ///
    /// Overriding the pattern discards the built-in group indices, since
    /// they describe a different pattern; the line and message groups must
    /// then be given explicitly.
    pub fn extraction_config(&self, name: ProfileName) -> Result<ExtractionConfig, ConfigError> {
        let defaults = name.defaults();
        match &self.pattern {
            Some(pattern) => Ok(ExtractionConfig {
                pattern: pattern.clone(),
                line_group: self.line_group.ok_or(ConfigError::MissingGroup {
                    profile: name,
                    field: "lineGroup",
                })?,
                column_group: self.column_group,
                severity_group: self.severity_group,
                message_group: self.message_group.ok_or(ConfigError::MissingGroup {
                    profile: name,
                    field: "messageGroup",
                })?,
                code_group: self.code_group,
            }),
            None => {
                let mut config = defaults.extraction();
                if let Some(index) = self.line_group {
                    config.line_group = index;
                }
                if let Some(index) = self.message_group {
                    config.message_group = index;
                }
                config.column_group = self.column_group.or(config.column_group);
                config.severity_group = self.severity_group.or(config.severity_group);
                config.code_group = self.code_group.or(config.code_group);
                Ok(config)
            }
        }
    }

    pub fn command(&self, name: ProfileName) -> Vec<String> {
        match &self.command {
            Some(spec) => spec.argv(),
            None => name.defaults().command(),
        }
    }

    /// Compile the extraction config without requiring a container.
    pub fn extractor(&self, name: ProfileName) -> Result<Extractor, ConfigError> {
        self.extraction_config(name)?.compile()
    }

    /// Validate everything needed to run this profile.
    pub fn resolve(&self, name: ProfileName) -> Result<ResolvedProfile, ConfigError> {
        let container = self
            .container
            .as_deref()
            .map(str::trim)
            .filter(|c| !c.is_empty())
            .ok_or(ConfigError::MissingContainer { profile: name })?
            .to_string();

        let command = self.command(name);
        if command.is_empty() {
            return Err(ConfigError::EmptyCommand { profile: name });
        }

        Ok(ResolvedProfile {
            name,
            container,
            command,
            extractor: self.extractor(name)?,
            report_exit_status: self.report_exit_status.unwrap_or(true),
        })
    }
}

/// A profile entry in settings: a bare boolean toggles the profile with
/// its defaults, an object overrides fields.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ProfileEntry {
    Enabled(bool),
    Custom(ProfileSettings),
}

impl ProfileEntry {
    pub fn is_configured(&self) -> bool {
        !matches!(self, ProfileEntry::Enabled(false))
    }

    pub fn settings(&self) -> ProfileSettings {
        match self {
            ProfileEntry::Enabled(_) => ProfileSettings::default(),
            ProfileEntry::Custom(settings) => settings.clone(),
        }
    }
}

/// All linter settings as delivered by the editor or a config file.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Settings {
    /// Explicit choice of profile. Required when more than one is configured.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub active_profile: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub perl: Option<ProfileEntry>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub perlcritic: Option<ProfileEntry>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub flake8: Option<ProfileEntry>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rubocop: Option<ProfileEntry>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub php: Option<ProfileEntry>,
}

impl Settings {
    pub fn entry(&self, name: ProfileName) -> Option<&ProfileEntry> {
        match name {
            ProfileName::Perl => self.perl.as_ref(),
            ProfileName::Perlcritic => self.perlcritic.as_ref(),
            ProfileName::Flake8 => self.flake8.as_ref(),
            ProfileName::Rubocop => self.rubocop.as_ref(),
            ProfileName::Php => self.php.as_ref(),
        }
    }

    fn entry_mut(&mut self, name: ProfileName) -> &mut Option<ProfileEntry> {
        match name {
            ProfileName::Perl => &mut self.perl,
            ProfileName::Perlcritic => &mut self.perlcritic,
            ProfileName::Flake8 => &mut self.flake8,
            ProfileName::Rubocop => &mut self.rubocop,
            ProfileName::Php => &mut self.php,
        }
    }

    /// Profiles that are present and not switched off, in iteration order.
    pub fn configured(&self) -> Vec<ProfileName> {
        ProfileName::ALL
            .into_iter()
            .filter(|name| self.entry(*name).is_some_and(ProfileEntry::is_configured))
            .collect()
    }

    /// Settings for `name`, falling back to the built-in defaults when the
    /// profile is not configured.
    pub fn profile_settings(&self, name: ProfileName) -> ProfileSettings {
        self.entry(name)
            .filter(|entry| entry.is_configured())
            .map(ProfileEntry::settings)
            .unwrap_or_default()
    }

    /// Override the container of `name`, configuring the profile if needed.
    pub fn set_container(&mut self, name: ProfileName, container: impl Into<String>) {
        let mut settings = self.profile_settings(name);
        settings.container = Some(container.into());
        *self.entry_mut(name) = Some(ProfileEntry::Custom(settings));
    }

    /// Pick the profile to run.
    ///
    /// With `activeProfile` set, that profile must be configured. Without
    /// it, a single configured profile is used and several are rejected
    /// instead of letting one silently win.
    pub fn select(&self) -> Result<Option<(ProfileName, ProfileSettings)>, ConfigError> {
        if let Some(active) = self.active_profile.as_deref() {
            let name: ProfileName = active.parse()?;
            return match self.entry(name).filter(|entry| entry.is_configured()) {
                Some(entry) => Ok(Some((name, entry.settings()))),
                None => Err(ConfigError::ProfileNotConfigured { profile: name }),
            };
        }

        match self.configured().as_slice() {
            [] => Ok(None),
            [name] => Ok(Some((*name, self.profile_settings(*name)))),
            many => Err(ConfigError::AmbiguousProfiles {
                profiles: many.to_vec(),
            }),
        }
    }

    /// Select and fully resolve the profile to run, if any.
    pub fn resolve(&self) -> Result<Option<ResolvedProfile>, ConfigError> {
        self.select()?
            .map(|(name, settings)| settings.resolve(name))
            .transpose()
    }
}

/// A validated profile, ready to run.
#[derive(Debug, Clone)]
pub struct ResolvedProfile {
    pub name: ProfileName,
    pub container: String,
    pub command: Vec<String>,
    pub extractor: Extractor,
    pub report_exit_status: bool,
}
