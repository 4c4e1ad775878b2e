//! Rendering diagnostics for the terminal.

use colored::Colorize;
use dockerlint_core::{Diagnostic, ProfileName, Severity};
use serde::Serialize;

#[derive(Serialize)]
struct Report<'a> {
    source: &'a str,
    profile: ProfileName,
    diagnostics: &'a [Diagnostic],
}

pub fn render_json(source: &str, profile: ProfileName, diagnostics: &[Diagnostic]) -> String {
    let report = Report {
        source,
        profile,
        diagnostics,
    };
    serde_json::to_string_pretty(&report).unwrap_or_else(|_| "{}".to_string())
}

/// One line per diagnostic, `source:line[:column]: severity[code]: message`.
/// Lines are printed 1-based; an unparseable line shows as `?`.
pub fn render_text(source: &str, diagnostics: &[Diagnostic]) -> String {
    let mut out = String::new();
    for diag in diagnostics {
        let line = diag
            .line
            .map(|l| (u64::from(l) + 1).to_string())
            .unwrap_or_else(|| "?".to_string());
        let location = if diag.is_whole_line() {
            format!("{source}:{line}")
        } else {
            format!("{source}:{line}:{}", diag.start)
        };
        let severity = match diag.severity {
            Severity::Error => "error".red().bold(),
            Severity::Warning => "warning".yellow().bold(),
            Severity::Information => "info".blue().bold(),
        };
        let code = diag
            .code
            .as_deref()
            .map(|c| format!("[{c}]"))
            .unwrap_or_default();

        out.push_str(&format!("{location}: {severity}{code}: {}\n", diag.message));
    }
    out
}

pub fn summary(diagnostics: &[Diagnostic]) -> String {
    let errors = diagnostics.iter().filter(|d| d.is_error()).count();
    let warnings = diagnostics
        .iter()
        .filter(|d| d.severity == Severity::Warning)
        .count();
    format!("{errors} error(s), {warnings} warning(s)")
}
