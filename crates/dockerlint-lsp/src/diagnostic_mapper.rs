//! Maps extracted linter diagnostics to LSP diagnostics.

use dockerlint_core::{Diagnostic, Severity};
use tower_lsp::lsp_types::{
    Diagnostic as LspDiagnostic, DiagnosticSeverity, NumberOrString, Position, Range,
};

/// Convert an extracted diagnostic to an LSP diagnostic.
///
/// Lines are already zero-based. A diagnostic whose line could not be
/// parsed is placed on the first line rather than dropped. Whole-line
/// spans end at `u32::MAX`, which clients clamp to the line length.
pub fn to_lsp_diagnostic(diag: &Diagnostic, source: &str) -> LspDiagnostic {
    let severity = match diag.severity {
        Severity::Error => DiagnosticSeverity::ERROR,
        Severity::Warning => DiagnosticSeverity::WARNING,
        Severity::Information => DiagnosticSeverity::INFORMATION,
    };

    let line = diag.line.unwrap_or(0);

    LspDiagnostic {
        range: Range {
            start: Position {
                line,
                character: diag.start,
            },
            end: Position {
                line,
                character: diag.end,
            },
        },
        severity: Some(severity),
        code: diag.code.clone().map(NumberOrString::String),
        code_description: None,
        source: Some(source.to_string()),
        message: diag.message.clone(),
        related_information: None,
        tags: None,
        data: None,
    }
}

/// Convert a slice of extracted diagnostics, keeping their order.
pub fn to_lsp_diagnostics(diagnostics: &[Diagnostic], source: &str) -> Vec<LspDiagnostic> {
    diagnostics
        .iter()
        .map(|diag| to_lsp_diagnostic(diag, source))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use dockerlint_core::WHOLE_LINE_END;

    fn make_diagnostic(
        severity: Severity,
        message: &str,
        line: Option<u32>,
        column: Option<u32>,
        code: Option<&str>,
    ) -> Diagnostic {
        let (start, end) = match column {
            Some(c) => (c, c),
            None => (0, WHOLE_LINE_END),
        };
        Diagnostic {
            line,
            start,
            end,
            severity,
            message: message.to_string(),
            code: code.map(String::from),
        }
    }

    #[test]
    fn test_error_severity_mapping() {
        let diag = make_diagnostic(Severity::Error, "Error message", Some(0), None, None);
        let lsp_diag = to_lsp_diagnostic(&diag, "flake8");
        assert_eq!(lsp_diag.severity, Some(DiagnosticSeverity::ERROR));
    }

    #[test]
    fn test_warning_severity_mapping() {
        let diag = make_diagnostic(Severity::Warning, "Warning message", Some(0), None, None);
        let lsp_diag = to_lsp_diagnostic(&diag, "flake8");
        assert_eq!(lsp_diag.severity, Some(DiagnosticSeverity::WARNING));
    }

    #[test]
    fn test_info_severity_mapping() {
        let diag = make_diagnostic(Severity::Information, "Info message", Some(0), None, None);
        let lsp_diag = to_lsp_diagnostic(&diag, "flake8");
        assert_eq!(lsp_diag.severity, Some(DiagnosticSeverity::INFORMATION));
    }

    #[test]
    fn test_column_marker_range() {
        let diag = make_diagnostic(Severity::Warning, "Test", Some(11), Some(5), None);
        let lsp_diag = to_lsp_diagnostic(&diag, "flake8");
        assert_eq!(lsp_diag.range.start, Position::new(11, 5));
        assert_eq!(lsp_diag.range.end, Position::new(11, 5));
    }

    #[test]
    fn test_whole_line_range() {
        let diag = make_diagnostic(Severity::Error, "Test", Some(2), None, None);
        let lsp_diag = to_lsp_diagnostic(&diag, "perl");
        assert_eq!(lsp_diag.range.start, Position::new(2, 0));
        assert_eq!(lsp_diag.range.end, Position::new(2, u32::MAX));
    }

    #[test]
    fn test_invalid_line_lands_on_first_line() {
        let diag = make_diagnostic(Severity::Error, "Test", None, Some(3), None);
        let lsp_diag = to_lsp_diagnostic(&diag, "perl");
        assert_eq!(lsp_diag.range.start.line, 0);
        assert_eq!(lsp_diag.message, "Test");
    }

    #[test]
    fn test_code_is_mapped() {
        let diag = make_diagnostic(Severity::Error, "Test", Some(0), Some(1), Some("F401"));
        let lsp_diag = to_lsp_diagnostic(&diag, "flake8");
        assert_eq!(
            lsp_diag.code,
            Some(NumberOrString::String("F401".to_string()))
        );
    }

    #[test]
    fn test_absent_code_is_omitted() {
        let diag = make_diagnostic(Severity::Error, "Test", Some(0), None, None);
        let lsp_diag = to_lsp_diagnostic(&diag, "perl");
        assert_eq!(lsp_diag.code, None);
    }

    #[test]
    fn test_source_is_profile_name() {
        let diag = make_diagnostic(Severity::Error, "Test", Some(0), None, None);
        let lsp_diag = to_lsp_diagnostic(&diag, "rubocop");
        assert_eq!(lsp_diag.source, Some("rubocop".to_string()));
    }

    #[test]
    fn test_to_lsp_diagnostics_empty() {
        assert!(to_lsp_diagnostics(&[], "perl").is_empty());
    }

    #[test]
    fn test_to_lsp_diagnostics_keeps_order() {
        let diagnostics = vec![
            make_diagnostic(Severity::Error, "Error 1", Some(9), None, None),
            make_diagnostic(Severity::Warning, "Warning 1", Some(2), None, None),
            make_diagnostic(Severity::Information, "Info 1", Some(5), None, None),
        ];
        let lsp_diagnostics = to_lsp_diagnostics(&diagnostics, "perl");
        assert_eq!(lsp_diagnostics.len(), 3);
        assert_eq!(lsp_diagnostics[0].range.start.line, 9);
        assert_eq!(lsp_diagnostics[1].range.start.line, 2);
        assert_eq!(lsp_diagnostics[2].range.start.line, 5);
    }
}
