//! Diagnostic types produced from linter output

use serde::{Deserialize, Serialize};

/// End character used for diagnostics that span the whole line.
pub const WHOLE_LINE_END: u32 = u32::MAX;

/// A single problem reported by a linter, positioned in the linted document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Diagnostic {
    /// Zero-based line, or `None` when the captured line was not a valid
    /// 1-based line number.
    pub line: Option<u32>,
    pub start: u32,
    pub end: u32,
    pub severity: Severity,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Error,
    Warning,
    #[serde(rename = "info")]
    Information,
}

impl Severity {
    /// Map a captured severity token. Only the exact tokens `warning` and
    /// `info` are recognised; everything else, including no token, is an error.
    pub fn from_token(token: Option<&str>) -> Self {
        match token {
            Some("warning") => Severity::Warning,
            Some("info") => Severity::Information,
            _ => Severity::Error,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Severity::Error => "error",
            Severity::Warning => "warning",
            Severity::Information => "info",
        }
    }
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Diagnostic {
    /// Diagnostic covering all of `line`.
    pub fn whole_line(line: u32, severity: Severity, message: impl Into<String>) -> Self {
        Self {
            line: Some(line),
            start: 0,
            end: WHOLE_LINE_END,
            severity,
            message: message.into(),
            code: None,
        }
    }

    /// Check whether this diagnostic spans the full line rather than marking a column.
    pub fn is_whole_line(&self) -> bool {
        self.start == 0 && self.end == WHOLE_LINE_END
    }

    pub fn is_error(&self) -> bool {
        self.severity == Severity::Error
    }
}
