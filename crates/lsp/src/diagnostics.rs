//! Parse-result-to-diagnostic conversion.
//!
//! Every `ParseError` becomes one `lsp_types::Diagnostic`. Diagnostics
//! anchored at the opening bracket of an incomplete multi-line pattern also
//! point at the whole pattern through related information, so editors can
//! show how far the unterminated pattern reaches.

use drools_core::{ErrorKind, MultiLinePatternNode, ParseError, ParseResult, Severity};
use lsp_types::{
    Diagnostic, DiagnosticRelatedInformation, DiagnosticSeverity, Location, NumberOrString, Uri,
};

use crate::lsp_range;

/// Value of `Diagnostic::source` for everything produced here.
pub const SOURCE: &str = "drools";

/// Convert the diagnostics of one parse of the document at `uri`.
pub fn to_lsp_diagnostics(result: &ParseResult, uri: &Uri) -> Vec<Diagnostic> {
    let incomplete: Vec<&MultiLinePatternNode> = result
        .ast
        .multi_line_patterns()
        .into_iter()
        .filter(|p| !p.is_complete)
        .collect();

    result
        .errors
        .iter()
        .map(|error| {
            let related: Vec<DiagnosticRelatedInformation> = incomplete
                .iter()
                .filter(|p| p.open_bracket == error.range)
                .map(|p| DiagnosticRelatedInformation {
                    location: Location::new(uri.clone(), lsp_range(p.range)),
                    message: format!(
                        "'{}' pattern opened here is never closed ({} lines scanned)",
                        p.keyword,
                        p.range.line_count()
                    ),
                })
                .collect();
            to_diagnostic(error, related)
        })
        .collect()
}

fn to_diagnostic(error: &ParseError, related: Vec<DiagnosticRelatedInformation>) -> Diagnostic {
    Diagnostic {
        range: lsp_range(error.range),
        severity: Some(severity(error.severity)),
        code: Some(NumberOrString::String(code(error.kind).to_owned())),
        source: Some(SOURCE.to_owned()),
        message: error.message.clone(),
        related_information: (!related.is_empty()).then_some(related),
        ..Default::default()
    }
}

fn severity(severity: Severity) -> DiagnosticSeverity {
    match severity {
        Severity::Error => DiagnosticSeverity::ERROR,
        Severity::Warning => DiagnosticSeverity::WARNING,
    }
}

/// Diagnostic code shown by editors, e.g. `bracket-error`.
pub fn code(kind: ErrorKind) -> &'static str {
    match kind {
        ErrorKind::Structural => "structural-error",
        ErrorKind::Bracket => "bracket-error",
        ErrorKind::Grammar => "grammar-error",
        ErrorKind::Eof => "eof-error",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use drools_core::parse;

    fn uri() -> Uri {
        "file:///rules/sample.drl".parse().unwrap()
    }

    #[test]
    fn clean_file_has_no_diagnostics() {
        let result = parse("rule r\nwhen\n  Person()\nthen\nend\n");
        assert!(to_lsp_diagnostics(&result, &uri()).is_empty());
    }

    #[test]
    fn warning_severity_is_mapped() {
        let result = parse("rule r\n  priority 1\nwhen\nthen\nend\n");
        let diags = to_lsp_diagnostics(&result, &uri());
        assert_eq!(diags.len(), 1);
        assert_eq!(diags[0].severity, Some(DiagnosticSeverity::WARNING));
        assert_eq!(diags[0].source.as_deref(), Some("drools"));
        assert_eq!(
            diags[0].code,
            Some(NumberOrString::String("grammar-error".to_owned()))
        );
        assert!(diags[0].related_information.is_none());
    }

    #[test]
    fn incomplete_pattern_links_to_whole_pattern() {
        let src = "rule r\nwhen\n  not(\n    Person()\nrule s\nwhen\nthen\nend\n";
        let result = parse(src);
        let diags = to_lsp_diagnostics(&result, &uri());
        let bracket = diags
            .iter()
            .find(|d| d.code == Some(NumberOrString::String("bracket-error".to_owned())))
            .unwrap();
        assert_eq!(bracket.range.start, lsp_types::Position::new(2, 5));
        let related = bracket.related_information.as_ref().unwrap();
        assert_eq!(related.len(), 1);
        assert_eq!(related[0].location.range.start.line, 2);
        assert!(related[0].message.starts_with("'not' pattern"));
    }
}
