/// Fault-tolerant parser for Drools rule files.
/// Constructs carry ranges into the source; malformed input produces
/// diagnostics and partial nodes rather than failures.
use std::panic::{self, AssertUnwindSafe};

use tracing::{debug, error, trace};

use crate::ast::{DroolsFile, Range, Ranged};
use crate::error::{Abandon, Construct, Diagnostics, ErrorKind, ParseError};
use crate::keywords::is_top_level_keyword;
use crate::lexer::{self, Bracket, Token, TokenKind};
use crate::options::ParseOptions;

mod condition;
mod declarations;
mod multiline;
mod rule;

// ──────────────────────────────────────────────
// Parser
// ──────────────────────────────────────────────

pub(crate) struct Parser<'a> {
    src: &'a str,
    tokens: &'a [Token],
    pos: usize,
    options: &'a ParseOptions,
    diagnostics: Diagnostics,
}

impl<'a> Parser<'a> {
    fn new(src: &'a str, tokens: &'a [Token], options: &'a ParseOptions) -> Self {
        Parser {
            src,
            tokens,
            pos: 0,
            options,
            diagnostics: Diagnostics::new(options.max_errors),
        }
    }

    fn token(&self, i: usize) -> &'a Token {
        &self.tokens[i.min(self.tokens.len() - 1)]
    }

    fn cur(&self) -> &'a Token {
        self.token(self.pos)
    }

    fn peek(&self) -> &'a TokenKind {
        &self.cur().kind
    }

    fn peek_at(&self, i: usize) -> &'a TokenKind {
        &self.token(i).kind
    }

    fn advance(&mut self) {
        if self.pos < self.tokens.len() - 1 {
            self.pos += 1;
        }
    }

    fn at_eof(&self) -> bool {
        matches!(self.peek(), TokenKind::Eof)
    }

    fn word_at(&self, i: usize) -> Option<&'a str> {
        match self.peek_at(i) {
            TokenKind::Word(w) => Some(w.as_str()),
            _ => None,
        }
    }

    fn is_word(&self, w: &str) -> bool {
        self.word_at(self.pos) == Some(w)
    }

    fn is_punct(&self, c: char) -> bool {
        matches!(self.peek(), TokenKind::Punct(p) if *p == c)
    }

    /// True when token `i` starts a line (nothing but whitespace or
    /// comments precede it on its line).
    fn first_on_line(&self, i: usize) -> bool {
        i == 0 || self.token(i - 1).range.end.line < self.token(i).range.start.line
    }

    /// True when token `i` starts on a later line than token `i - 1` ends.
    fn starts_new_line(&self, i: usize) -> bool {
        i > 0 && self.first_on_line(i)
    }

    /// A top-level keyword at the start of a line. Scans of unterminated
    /// constructs stop here so later constructs still parse.
    ///
    /// A keyword used as an identifier in action code (`rule.fire();`,
    /// `query = x;`) is not one.
    fn is_recovery_point(&self, i: usize) -> bool {
        if !matches!(self.word_at(i), Some(w) if is_top_level_keyword(w)) || !self.first_on_line(i) {
            return false;
        }
        let next = self.token(i + 1);
        let used_as_identifier = matches!(
            next.kind,
            TokenKind::Punct('.' | '=' | ';') | TokenKind::Open(Bracket::Paren)
        ) || matches!(next.kind, TokenKind::Op(_));
        !(used_as_identifier && next.range.start.line == self.token(i).range.end.line)
    }

    fn at_recovery_point(&self) -> bool {
        self.is_recovery_point(self.pos)
    }

    /// Raw source text from the start of token `first` to the end of token `last`.
    fn slice(&self, first: usize, last: usize) -> &'a str {
        let start = self.token(first).start;
        let end = self.token(last).end.max(start);
        &self.src[start..end]
    }

    /// Raw source text strictly between two tokens.
    fn between(&self, before: usize, after: usize) -> &'a str {
        let start = self.token(before).end;
        let end = self.token(after).start.max(start);
        &self.src[start..end]
    }

    fn span(&self, first: usize, last: usize) -> Range {
        let start = self.token(first).range.start;
        let end = self.token(last.max(first)).range.end;
        Range::new(start, end)
    }

    /// Index of the last token consumed since `start`, or `start` itself.
    fn last_consumed(&self, start: usize) -> usize {
        self.pos.saturating_sub(1).max(start)
    }

    fn report(&mut self, error: ParseError) {
        self.diagnostics.report(error);
    }

    fn error_at(&mut self, kind: ErrorKind, i: usize, message: impl Into<String>) {
        let range = self.token(i).range;
        self.report(ParseError::error(kind, range, message));
    }

    fn warning_at(&mut self, kind: ErrorKind, i: usize, message: impl Into<String>) {
        let range = self.token(i).range;
        self.report(ParseError::warning(kind, range, message));
    }

    /// Reason to give up on `construct` at the current position.
    fn abandon(&self, construct: Construct, expected: &'static str) -> Abandon {
        if self.at_eof() {
            Abandon::UnexpectedEof {
                construct,
                expected,
            }
        } else {
            Abandon::Interrupted {
                construct,
                expected,
            }
        }
    }

    /// Text of the token at `i` as written, for messages.
    fn describe(&self, i: usize) -> String {
        match self.peek_at(i) {
            TokenKind::Eof => "end of file".to_owned(),
            _ => self.slice(i, i).to_owned(),
        }
    }

    // -- Top-level construct parsers ----------------------------

    fn parse_file(&mut self) -> DroolsFile {
        let mut file = DroolsFile::default();
        while !self.at_eof() {
            let keyword = self.word_at(self.pos).filter(|w| is_top_level_keyword(w));
            match keyword {
                Some("package") => {
                    let start = self.pos;
                    let package = self.guarded(Construct::Package, Self::parse_package);
                    if file.package.is_some() {
                        self.error_at(ErrorKind::Grammar, start, "Duplicate package declaration");
                    } else {
                        file.package = Some(package);
                    }
                }
                Some("import") => {
                    let node = self.guarded(Construct::Import, Self::parse_import);
                    file.imports.push(node);
                }
                Some("global") => {
                    let node = self.guarded(Construct::Global, Self::parse_global);
                    file.globals.push(node);
                }
                Some("function") => {
                    let node = self.guarded(Construct::Function, Self::parse_function);
                    file.functions.push(node);
                }
                Some("rule") => {
                    let node = self.guarded(Construct::Rule, Self::parse_rule);
                    file.rules.push(node);
                }
                Some("query") => {
                    let node = self.guarded(Construct::Query, Self::parse_query);
                    file.queries.push(node);
                }
                Some("declare") => {
                    let node = self.guarded(Construct::Declare, Self::parse_declare);
                    file.declares.push(node);
                }
                _ => {
                    let what = self.describe(self.pos);
                    self.error_at(
                        ErrorKind::Grammar,
                        self.pos,
                        format!("Unexpected '{}' at top level", what),
                    );
                    self.advance();
                    self.skip_to_recovery_point();
                }
            }
        }
        file
    }

    /// Boundary wrapper around one top-level construct.
    ///
    /// The sub-parser fills `node` as it goes. If it abandons the construct,
    /// the reason becomes a diagnostic anchored at the construct keyword, the
    /// partial node is kept, and scanning resumes at the next recovery point.
    /// A panic inside the sub-parser is reported the same way, but the node
    /// is reset since its contents can no longer be trusted.
    fn guarded<T, F>(&mut self, construct: Construct, f: F) -> T
    where
        T: Default + Ranged,
        F: FnOnce(&mut Self, &mut T) -> Result<(), Abandon>,
    {
        let start = self.pos;
        let mut node = T::default();
        match panic::catch_unwind(AssertUnwindSafe(|| f(self, &mut node))) {
            Ok(Ok(())) => {}
            Ok(Err(abandon)) => {
                debug!(%construct, reason = %abandon, "abandoning construct");
                let at = self.token(start).range;
                self.report(abandon.into_parse_error(at));
                self.skip_to_recovery_point();
            }
            Err(_) => {
                error!(%construct, line = self.token(start).range.start.line, "construct parser panicked");
                node = T::default();
                self.error_at(ErrorKind::Grammar, start, "Internal parser error");
                if self.pos <= start {
                    self.pos = start;
                    self.advance();
                }
                self.skip_to_recovery_point();
            }
        }
        let range = self.span(start, self.last_consumed(start));
        node.set_range(range);
        debug!(%construct, line = range.start.line, "parsed construct");
        node
    }

    /// Skip tokens until a recovery point or end of input.
    fn skip_to_recovery_point(&mut self) {
        let from = self.pos;
        while !self.at_eof() && !self.at_recovery_point() {
            self.advance();
        }
        if self.pos > from {
            trace!(skipped = self.pos - from, "recovered at next construct");
        }
    }
}

// ──────────────────────────────────────────────
// Entry point
// ──────────────────────────────────────────────

/// Lex and parse `src`. Diagnostics from both stages share one capped sink.
pub(crate) fn parse_source(src: &str, options: &ParseOptions) -> (DroolsFile, Vec<ParseError>) {
    let lexed = lexer::lex(src);
    let mut p = Parser::new(src, &lexed.tokens, options);
    for diagnostic in lexed.diagnostics.iter().cloned() {
        p.report(diagnostic);
    }
    let mut file = p.parse_file();
    file.comments = lexed.comments.clone();
    let eof = lexed.tokens.len() - 1;
    file.range = Range::new(Default::default(), p.token(eof).range.end);
    (file, p.diagnostics.into_vec())
}

// ──────────────────────────────────────────────
// Tests
// ──────────────────────────────────────────────
