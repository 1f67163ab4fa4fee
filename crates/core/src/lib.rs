//! drools-core: fault-tolerant parser for Drools rule files.
//!
//! Parsing never fails. Every call returns a [`DroolsFile`] covering as much
//! of the input as could be understood, plus the diagnostics collected on
//! the way. Malformed or unterminated constructs are kept as partial nodes
//! and parsing resumes at the next top-level keyword.
//!
//! # Public API
//!
//! - [`parse()`] / [`parse_with_options()`] -- the entry points
//! - [`ParseResult`] -- AST plus diagnostics
//! - [`ParseError`], [`ErrorKind`], [`Severity`] -- diagnostics
//! - AST types: [`DroolsFile`], [`RuleNode`], [`ConditionNode`],
//!   [`MultiLinePatternNode`] and friends
//! - [`keywords`] -- keyword tables shared with editor tooling

pub mod ast;
pub mod error;
pub mod keywords;
pub mod lexer;
pub mod options;
mod parser;

use std::panic::{self, AssertUnwindSafe};

use serde::Serialize;

// ── Convenience re-exports ───────────────────────────────────────────

pub use ast::{
    ConditionNode, ConditionType, DeclareKind, DeclareNode, DroolsFile, FieldNode, FunctionNode,
    GlobalNode, ImportNode, MultiLinePatternNode, PackageNode, Position, QueryNode, Range,
    RuleAttribute, RuleNode, ThenNode, WhenNode,
};
pub use error::{ErrorKind, ParseError, Severity};
pub use options::{ParseOptions, DEFAULT_MAX_ERRORS, DEFAULT_MAX_NESTING_DEPTH};

/// Output of one parse: the (possibly partial) tree and its diagnostics in
/// the order they were found.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ParseResult {
    pub ast: DroolsFile,
    pub errors: Vec<ParseError>,
}

impl ParseResult {
    /// True if any diagnostic has error severity.
    pub fn has_errors(&self) -> bool {
        self.errors.iter().any(ParseError::is_error)
    }
}

/// Parse `src` with default options.
pub fn parse(src: &str) -> ParseResult {
    parse_with_options(src, &ParseOptions::default())
}

/// Parse `src`.
///
/// A defect in the parser itself does not escape: it yields an empty file
/// and a single "Internal parser error" diagnostic.
pub fn parse_with_options(src: &str, options: &ParseOptions) -> ParseResult {
    let _span = tracing::debug_span!("parse", bytes = src.len()).entered();
    match panic::catch_unwind(AssertUnwindSafe(|| parser::parse_source(src, options))) {
        Ok((ast, errors)) => {
            tracing::debug!(
                rules = ast.rules.len(),
                diagnostics = errors.len(),
                "parse finished"
            );
            ParseResult { ast, errors }
        }
        Err(_) => {
            tracing::error!("parser panicked; returning empty result");
            ParseResult {
                ast: DroolsFile::default(),
                errors: vec![ParseError::error(
                    ErrorKind::Grammar,
                    Range::default(),
                    "Internal parser error",
                )],
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_input_is_an_empty_file() {
        let result = parse("");
        assert_eq!(result.ast, DroolsFile::default());
        assert!(result.errors.is_empty());
        assert!(!result.has_errors());
    }

    #[test]
    fn warnings_alone_are_not_errors() {
        let result = parse("rule r\n  priority 1\nwhen\nthen\nend\n");
        assert_eq!(result.errors.len(), 1);
        assert!(!result.has_errors());
    }

    #[test]
    fn result_serializes_with_camel_case_fields() {
        let result = parse("rule r\nwhen\n  $p : Person()\nthen\nend\n");
        let json = serde_json::to_value(&result).unwrap();
        let cond = &json["ast"]["rules"][0]["when"]["conditions"][0];
        assert_eq!(cond["conditionType"], "pattern");
        assert_eq!(cond["binding"], "$p");
        assert_eq!(cond["isMultiLine"], false);
        assert_eq!(json["errors"], serde_json::json!([]));
    }
}
