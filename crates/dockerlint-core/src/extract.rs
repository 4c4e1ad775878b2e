//! Regex-driven extraction of diagnostics from raw linter output.

use crate::config::{ConfigError, ExtractionConfig};
use crate::diagnostics::{Diagnostic, Severity, WHOLE_LINE_END};
use regex::{CaptureMatches, Captures, Regex};

/// A compiled [`ExtractionConfig`].
///
/// Group indices are already validated against the pattern, so extraction
/// never fails: groups that did not participate in a match are read as absent.
#[derive(Debug, Clone)]
pub struct Extractor {
    regex: Regex,
    config: ExtractionConfig,
}

impl Extractor {
    pub(crate) fn new(regex: Regex, config: ExtractionConfig) -> Self {
        Self { regex, config }
    }

    pub fn config(&self) -> &ExtractionConfig {
        &self.config
    }

    /// Lazily iterate the non-overlapping matches in `text`, each search
    /// resuming where the previous match ended.
    pub fn raw_matches<'r, 't>(&'r self, text: &'t str) -> CaptureMatches<'r, 't> {
        self.regex.captures_iter(text)
    }

    /// Build one diagnostic per match, in the order the matches occur.
    pub fn extract(&self, text: &str) -> Vec<Diagnostic> {
        self.raw_matches(text)
            .map(|caps| self.to_diagnostic(&caps))
            .collect()
    }

    fn to_diagnostic(&self, caps: &Captures<'_>) -> Diagnostic {
        let group = |index: usize| caps.get(index).map(|m| m.as_str());

        let line = group(self.config.line_group)
            .and_then(parse_number)
            .and_then(|line| line.checked_sub(1));

        let column = self
            .config
            .column_group
            .and_then(group)
            .and_then(parse_number);
        let (start, end) = match column {
            Some(column) => (column, column),
            None => (0, WHOLE_LINE_END),
        };

        let severity = Severity::from_token(self.config.severity_group.and_then(group));

        let message = group(self.config.message_group)
            .unwrap_or_default()
            .to_string();

        let code = self
            .config
            .code_group
            .and_then(group)
            .map(str::to_string);

        Diagnostic {
            line,
            start,
            end,
            severity,
            message,
            code,
        }
    }
}

fn parse_number(text: &str) -> Option<u32> {
    text.parse().ok()
}

/// Compile `config` and extract every diagnostic from `text`.
pub fn extract(text: &str, config: &ExtractionConfig) -> Result<Vec<Diagnostic>, ConfigError> {
    Ok(config.compile()?.extract(text))
}
