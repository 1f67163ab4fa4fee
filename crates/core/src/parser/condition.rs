use super::Parser;
use crate::ast::{ConditionNode, ConditionType, Range, WhenNode};
use crate::error::ErrorKind;
use crate::keywords::CONNECTIVES;
use crate::lexer::{Bracket, TokenKind};

/// Words that keep a fact pattern going after its closing bracket or
/// across a line break.
const CONTINUATION_WORDS: &[&str] = &[
    "from",
    "over",
    "in",
    "instanceof",
    "matches",
    "memberOf",
    "contains",
    "soundslike",
    "window",
];

impl<'a> Parser<'a> {
    /// A pattern keyword at `i` directly followed by `(`.
    pub(super) fn keyword_pattern_at(&self, i: usize) -> Option<ConditionType> {
        let ty = ConditionType::from_keyword(self.word_at(i)?)?;
        matches!(self.peek_at(i + 1), TokenKind::Open(Bracket::Paren)).then_some(ty)
    }

    /// Tokens that separate condition units and belong to neither.
    pub(super) fn at_separator(&self) -> bool {
        match self.peek() {
            TokenKind::Punct(',' | ';') => true,
            TokenKind::Op(op) => matches!(*op, "&&" | "||"),
            TokenKind::Word(w) if w == "from" => self.keyword_pattern_at(self.pos + 1).is_some(),
            TokenKind::Word(w) => CONNECTIVES.contains(&w.as_str()),
            _ => false,
        }
    }

    fn starts_unit(&self, i: usize) -> bool {
        match self.peek_at(i) {
            TokenKind::Word(w) => !CONTINUATION_WORDS.contains(&w.as_str()),
            TokenKind::Variable(_) | TokenKind::Open(Bracket::Paren) => true,
            _ => false,
        }
    }

    /// Whether token `i` carries on the unit before it rather than
    /// starting a new one on its line.
    fn continues_unit(&self, i: usize) -> bool {
        let joins = |kind: &TokenKind| match kind {
            TokenKind::Word(w) => CONTINUATION_WORDS.contains(&w.as_str()),
            TokenKind::Op(_) | TokenKind::Punct(_) => true,
            _ => false,
        };
        joins(self.peek_at(i)) || (i > 0 && joins(self.peek_at(i - 1)))
    }

    /// Parse the conditions of a when-clause or query body, stopping before
    /// `then`, `end`, a recovery point, or end of input.
    pub(super) fn parse_conditions(&mut self, start: usize) -> WhenNode {
        let mut conditions = Vec::new();
        loop {
            if self.at_eof() || self.at_recovery_point() {
                break;
            }
            let i = self.pos;
            match self.peek() {
                TokenKind::Word(w) if w == "then" || w == "end" => break,
                TokenKind::Close(_) => {
                    self.unmatched_close(i);
                    self.advance();
                }
                _ if self.at_separator() => self.advance(),
                _ => {
                    if let Some(cond) = self.parse_condition(0) {
                        conditions.push(cond);
                    }
                    if self.pos == i {
                        self.advance();
                    }
                }
            }
        }
        WhenNode {
            conditions,
            range: self.span(start, self.last_consumed(start)),
        }
    }

    /// Parse one condition unit: an optional `$var :` binding followed by a
    /// keyword pattern, a prefixed pattern (`not Person()`), or a plain fact
    /// pattern. `depth` is the nesting depth a keyword pattern found here
    /// gets. Returns `None` when nothing was consumed.
    pub(super) fn parse_condition(&mut self, depth: usize) -> Option<ConditionNode> {
        let start = self.pos;
        let mut cond = ConditionNode::default();

        if let TokenKind::Variable(name) = self.peek() {
            if matches!(self.peek_at(start + 1), TokenKind::Punct(':') | TokenKind::Op(":=")) {
                cond.binding = Some(name.clone());
                self.advance();
                self.advance();
            }
        }

        // Prefix form: `not Person()`, `not exists( ... )`
        let mut prefix = None;
        while let Some(ty) = self.word_at(self.pos).and_then(ConditionType::from_keyword) {
            if self.keyword_pattern_at(self.pos).is_some() {
                break;
            }
            prefix.get_or_insert(ty);
            self.advance();
        }

        match self.keyword_pattern_at(self.pos) {
            Some(ty) if depth > self.options.max_nesting_depth => {
                let message = format!(
                    "Nesting deeper than {} levels; remaining content is kept as flat text",
                    self.options.max_nesting_depth
                );
                self.warning_at(ErrorKind::Bracket, self.pos, message);
                cond.condition_type = ty;
                self.scan_fact_unit(&mut cond.parenthesis_ranges);
            }
            Some(ty) => {
                let mut tracked = self.track_pattern(ty, depth);
                tracked.node.binding = cond.binding.clone();
                tracked.node.prefix = prefix;
                cond.condition_type = ty;
                cond.is_multi_line = tracked.is_multi_line;
                cond.parenthesis_ranges = tracked.parens;
                cond.multi_line_pattern = Some(tracked.node);
            }
            None => self.scan_fact_unit(&mut cond.parenthesis_ranges),
        }

        if self.pos == start {
            return None;
        }
        if let Some(ty) = prefix {
            cond.condition_type = ty;
        }
        let last = self.last_consumed(start);
        cond.content = self.slice(start, last).to_owned();
        cond.range = self.span(start, last);
        cond.parenthesis_ranges.sort_by_key(|r| r.start);
        Some(cond)
    }

    /// Consume a plain fact pattern such as `Person( age > 18 ) from $list`
    /// or a bare expression such as `$a > 5`.
    ///
    /// The unit ends at a separator, a closer belonging to the enclosing
    /// scope, `then`/`end`, a recovery point, the next keyword pattern, or
    /// a line break that does not continue the expression.
    fn scan_fact_unit(&mut self, parens: &mut Vec<Range>) {
        let first = self.pos;
        loop {
            let i = self.pos;
            if self.at_eof() || self.at_recovery_point() || self.at_separator() {
                break;
            }
            if matches!(self.word_at(i), Some("then" | "end")) {
                break;
            }
            if i > first
                && (self.keyword_pattern_at(i).is_some()
                    || (self.starts_new_line(i) && !self.continues_unit(i)))
            {
                break;
            }
            match self.peek() {
                TokenKind::Close(_) => break,
                TokenKind::Open(b) => {
                    let b = *b;
                    if self.scan_group(Some(&mut *parens)).is_none() {
                        self.error_at(ErrorKind::Bracket, i, format!("Unclosed '{}'", b.open_char()));
                        break;
                    }
                    if self.starts_unit(self.pos) && !self.starts_new_line(self.pos) {
                        break;
                    }
                }
                _ => self.advance(),
            }
        }
    }
}
