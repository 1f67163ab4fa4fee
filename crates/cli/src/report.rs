//! Rendering of diagnostics for the `check` subcommand.

use std::fmt;

use drools_core::{ParseError, ParseResult, Severity};
use serde::Serialize;

/// Error and warning counts of one parse.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct Summary {
    pub errors: usize,
    pub warnings: usize,
}

impl Summary {
    pub(crate) fn of(diagnostics: &[ParseError]) -> Self {
        let errors = diagnostics
            .iter()
            .filter(|e| e.severity == Severity::Error)
            .count();
        Summary {
            errors,
            warnings: diagnostics.len() - errors,
        }
    }
}

impl fmt::Display for Summary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let plural = |n: usize| if n == 1 { "" } else { "s" };
        write!(
            f,
            "{} error{}, {} warning{}",
            self.errors,
            plural(self.errors),
            self.warnings,
            plural(self.warnings)
        )
    }
}

/// `file:line:col: severity[kind]: message`, one-based.
pub(crate) fn diagnostic_line(file: &str, error: &ParseError) -> String {
    format!("{}:{}", file, error)
}

/// JSON body of `check --output json`.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct CheckReport<'a> {
    pub file: &'a str,
    pub summary: Summary,
    pub diagnostics: &'a [ParseError],
}

impl<'a> CheckReport<'a> {
    pub(crate) fn new(file: &'a str, result: &'a ParseResult) -> Self {
        CheckReport {
            file,
            summary: Summary::of(&result.errors),
            diagnostics: &result.errors,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use drools_core::parse;

    #[test]
    fn summary_counts_and_pluralises() {
        let result = parse("rule r\n  priority 1\nwhen\n  Person(\nrule s\nwhen\nthen\nend\n");
        let summary = Summary::of(&result.errors);
        assert_eq!(summary.warnings, 1);
        assert_eq!(summary.errors, 2);
        assert_eq!(summary.to_string(), "2 errors, 1 warning");
    }

    #[test]
    fn diagnostic_line_is_one_based() {
        let result = parse("rule\nwhen\nthen\nend\n");
        assert_eq!(
            diagnostic_line("a.drl", &result.errors[0]),
            "a.drl:1:1: error[grammar]: Expected rule name"
        );
    }

    #[test]
    fn report_serialises_camel_case() {
        let result = parse("rule r\nwhen\nthen\nend\n");
        let json = serde_json::to_value(CheckReport::new("a.drl", &result)).unwrap();
        assert_eq!(json["summary"]["errors"], 0);
        assert_eq!(json["diagnostics"], serde_json::json!([]));
    }
}
