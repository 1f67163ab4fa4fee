use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::warn;

use crate::ast::Range;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Error,
    Warning,
}

/// Failure class of a diagnostic. Every class is recoverable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ErrorKind {
    /// A top-level construct is missing its terminator.
    Structural,
    /// A mismatched or unmatched bracket.
    Bracket,
    /// A malformed literal, attribute, or name.
    Grammar,
    /// Input ended in the middle of a construct.
    Eof,
}

impl ErrorKind {
    pub fn as_str(self) -> &'static str {
        match self {
            ErrorKind::Structural => "structural",
            ErrorKind::Bracket => "bracket",
            ErrorKind::Grammar => "grammar",
            ErrorKind::Eof => "eof",
        }
    }
}

/// A diagnostic produced while parsing. Parsing never fails; these are
/// collected and returned next to the AST.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParseError {
    pub message: String,
    pub severity: Severity,
    pub kind: ErrorKind,
    pub range: Range,
}

impl ParseError {
    pub fn error(kind: ErrorKind, range: Range, message: impl Into<String>) -> Self {
        ParseError {
            message: message.into(),
            severity: Severity::Error,
            kind,
            range,
        }
    }

    pub fn warning(kind: ErrorKind, range: Range, message: impl Into<String>) -> Self {
        ParseError {
            message: message.into(),
            severity: Severity::Warning,
            kind,
            range,
        }
    }

    pub fn is_error(&self) -> bool {
        self.severity == Severity::Error
    }
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let severity = match self.severity {
            Severity::Error => "error",
            Severity::Warning => "warning",
        };
        // Positions are zero-based internally; humans read one-based.
        write!(
            f,
            "{}:{}: {}[{}]: {}",
            self.range.start.line + 1,
            self.range.start.column + 1,
            severity,
            self.kind.as_str(),
            self.message
        )
    }
}

// ──────────────────────────────────────────────
// Construct abandonment
// ──────────────────────────────────────────────

/// Top-level constructs, used to name what was left incomplete.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Construct {
    Package,
    Import,
    Global,
    Function,
    Rule,
    Query,
    Declare,
}

impl fmt::Display for Construct {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Construct::Package => "package",
            Construct::Import => "import",
            Construct::Global => "global",
            Construct::Function => "function",
            Construct::Rule => "rule",
            Construct::Query => "query",
            Construct::Declare => "declare",
        })
    }
}

/// Why a sub-parser gave up on its construct before finding the terminator.
/// The boundary wrapper turns this into a diagnostic and keeps the partial node.
#[derive(Debug, Clone, thiserror::Error)]
pub(crate) enum Abandon {
    #[error("Incomplete {construct}: expected '{expected}' before end of file")]
    UnexpectedEof {
        construct: Construct,
        expected: &'static str,
    },
    #[error("Incomplete {construct}: expected '{expected}' before next declaration")]
    Interrupted {
        construct: Construct,
        expected: &'static str,
    },
}

impl Abandon {
    pub(crate) fn kind(&self) -> ErrorKind {
        match self {
            Abandon::UnexpectedEof { .. } => ErrorKind::Eof,
            Abandon::Interrupted { .. } => ErrorKind::Structural,
        }
    }

    pub(crate) fn into_parse_error(self, at: Range) -> ParseError {
        ParseError::error(self.kind(), at, self.to_string())
    }
}

// ──────────────────────────────────────────────
// Capped collection
// ──────────────────────────────────────────────

/// Collects diagnostics up to a cap. Once the cap is reached further
/// reports are dropped silently and parsing carries on.
#[derive(Debug)]
pub(crate) struct Diagnostics {
    errors: Vec<ParseError>,
    max: usize,
    capped: bool,
}

impl Diagnostics {
    pub(crate) fn new(max: usize) -> Self {
        Diagnostics {
            errors: Vec::new(),
            max,
            capped: false,
        }
    }

    pub(crate) fn report(&mut self, error: ParseError) {
        if self.errors.len() >= self.max {
            if !self.capped {
                warn!(max = self.max, "diagnostic cap reached; further diagnostics dropped");
                self.capped = true;
            }
            return;
        }
        self.errors.push(error);
    }

    pub(crate) fn into_vec(self) -> Vec<ParseError> {
        self.errors
    }
}
