use super::multiline::BracketStack;
use super::Parser;
use crate::ast::{QueryNode, RuleAttribute, RuleNode, ThenNode};
use crate::error::{Abandon, Construct, ErrorKind, ParseError};
use crate::keywords::is_rule_attribute;
use crate::lexer::{Bracket, TokenKind};

/// An `@Name(...)` annotation: its name with the `@`, and the raw text
/// between its parentheses.
pub(super) struct Annotation {
    pub name: String,
    pub args: Option<String>,
}

impl<'a> Parser<'a> {
    pub(super) fn parse_rule(&mut self, rule: &mut RuleNode) -> Result<(), Abandon> {
        let keyword = self.pos;
        self.advance();
        rule.name = self.take_construct_name(keyword, Construct::Rule);
        if self.is_word("extends") {
            let extends = self.pos;
            self.advance();
            rule.parent = Some(self.take_construct_name(extends, Construct::Rule));
        }
        self.parse_rule_attributes(rule);

        if self.is_word("when") {
            let when = self.pos;
            self.advance();
            rule.when = Some(self.parse_conditions(when));
        }
        if self.is_word("then") {
            let (then, terminated) = self.parse_then();
            rule.then = Some(then);
            if terminated {
                return Ok(());
            }
            return Err(self.abandon(Construct::Rule, "end"));
        }
        if self.is_word("end") {
            self.advance();
            return Ok(());
        }
        Err(self.abandon(Construct::Rule, "end"))
    }

    pub(super) fn parse_query(&mut self, query: &mut QueryNode) -> Result<(), Abandon> {
        let keyword = self.pos;
        self.advance();
        query.name = self.take_construct_name(keyword, Construct::Query);

        let name_line = self.token(self.last_consumed(keyword)).range.end.line;
        if matches!(self.peek(), TokenKind::Open(Bracket::Paren))
            && self.cur().range.start.line == name_line
        {
            let open = self.pos;
            match self.scan_group(None) {
                Some(close) => query.parameters = Some(self.between(open, close).trim().to_owned()),
                None => return Err(self.abandon(Construct::Query, ")")),
            }
        }

        let body = self.pos;
        query.conditions = self.parse_conditions(body);
        while self.is_word("then") {
            self.error_at(ErrorKind::Grammar, self.pos, "Queries have no 'then' clause");
            self.advance();
            let more = self.parse_conditions(body);
            query.conditions.conditions.extend(more.conditions);
            query.conditions.range = more.range;
        }
        if self.is_word("end") {
            self.advance();
            return Ok(());
        }
        Err(self.abandon(Construct::Query, "end"))
    }

    /// A quoted or bare construct name following the token at `keyword`.
    fn take_construct_name(&mut self, keyword: usize, construct: Construct) -> String {
        match self.peek() {
            TokenKind::Str { value, .. } => {
                self.advance();
                value.clone()
            }
            TokenKind::Word(w)
                if !matches!(w.as_str(), "when" | "then" | "end" | "extends")
                    && !self.at_recovery_point() =>
            {
                self.advance();
                w.clone()
            }
            _ => {
                self.error_at(ErrorKind::Grammar, keyword, format!("Expected {} name", construct));
                String::new()
            }
        }
    }

    fn parse_rule_attributes(&mut self, rule: &mut RuleNode) {
        loop {
            if self.at_eof() || self.at_recovery_point() {
                break;
            }
            if matches!(self.word_at(self.pos), Some("when" | "then" | "end")) {
                break;
            }
            let start = self.pos;
            match self.peek() {
                TokenKind::Punct('@') => {
                    let annotation = self.take_annotation();
                    rule.attributes.push(RuleAttribute {
                        name: annotation.name,
                        value: annotation.args.unwrap_or_default(),
                        range: self.span(start, self.last_consumed(start)),
                    });
                }
                TokenKind::Punct(',') => self.advance(),
                TokenKind::Word(_) => {
                    let attribute = self.parse_rule_attribute();
                    rule.attributes.push(attribute);
                }
                _ => {
                    let what = self.describe(start);
                    self.error_at(
                        ErrorKind::Grammar,
                        start,
                        format!("Unexpected '{}' in rule header", what),
                    );
                    self.advance();
                }
            }
        }
    }

    /// `salience 10`, `no-loop`, `agenda-group "g"`, `timer (int: 5s)`.
    /// The value runs to the end of the line, a comma, or the next known
    /// attribute name. A bracket left open ends the value at its line.
    fn parse_rule_attribute(&mut self) -> RuleAttribute {
        let start = self.pos;
        let (name, name_last) = self.hyphenated_word_at(start);
        self.pos = name_last + 1;
        if !is_rule_attribute(&name) {
            self.report(ParseError::warning(
                ErrorKind::Grammar,
                self.span(start, name_last),
                format!("Unknown rule attribute '{}'", name),
            ));
        }

        let line = self.token(start).range.start.line;
        let value_start = self.pos;
        while !self.at_eof() && !self.at_recovery_point() && self.cur().range.start.line == line {
            if matches!(self.word_at(self.pos), Some("when" | "then" | "end")) || self.is_punct(',') {
                break;
            }
            if self.word_at(self.pos).is_some() && is_rule_attribute(&self.hyphenated_word_at(self.pos).0) {
                break;
            }
            if matches!(self.peek(), TokenKind::Open(_)) {
                if !self.scan_line_group() {
                    break;
                }
                continue;
            }
            self.advance();
        }

        let value = if self.pos > value_start {
            self.slice(value_start, self.pos - 1).to_owned()
        } else {
            String::new()
        };
        RuleAttribute {
            name,
            value,
            range: self.span(start, self.last_consumed(start)),
        }
    }

    /// Join `no`, `-`, `loop` into `no-loop` when the pieces touch.
    /// Returns the joined word and the index of its last token.
    fn hyphenated_word_at(&self, i: usize) -> (String, usize) {
        let mut name = self.word_at(i).unwrap_or_default().to_owned();
        let mut last = i;
        while matches!(self.peek_at(last + 1), TokenKind::Punct('-'))
            && self.token(last).end == self.token(last + 1).start
            && self.token(last + 1).end == self.token(last + 2).start
        {
            let Some(part) = self.word_at(last + 2) else {
                break;
            };
            name.push('-');
            name.push_str(part);
            last += 2;
        }
        (name, last)
    }

    /// Consume `@Name` or `@Name(args)` at the current `@`.
    pub(super) fn take_annotation(&mut self) -> Annotation {
        let at = self.pos;
        self.advance();
        let mut name = String::from("@");
        while let Some(part) = self.word_at(self.pos) {
            name.push_str(part);
            self.advance();
            if self.is_punct('.') && self.word_at(self.pos + 1).is_some() {
                name.push('.');
                self.advance();
            } else {
                break;
            }
        }
        if name.len() == 1 {
            self.error_at(ErrorKind::Grammar, at, "Expected annotation name after '@'");
        }
        let mut args = None;
        if matches!(self.peek(), TokenKind::Open(Bracket::Paren))
            && self.cur().range.start.line == self.token(at).range.start.line
        {
            let open = self.pos;
            if let Some(close) = self.scan_group(None) {
                args = Some(self.between(open, close).trim().to_owned());
            } else {
                self.error_at(ErrorKind::Bracket, open, "Unclosed '('");
            }
        }
        Annotation { name, args }
    }

    /// Consume `then` and the action code up to the matching `end`.
    ///
    /// `end` only terminates at bracket depth zero. Returns the clause and
    /// whether `end` was found; the scan otherwise stops at a recovery point
    /// or end of input.
    fn parse_then(&mut self) -> (ThenNode, bool) {
        let then = self.pos;
        self.advance();
        let mut stack = BracketStack::default();
        let terminated = loop {
            if self.at_eof() || self.at_recovery_point() {
                break false;
            }
            let i = self.pos;
            match self.peek() {
                TokenKind::Word(w) if w == "end" && stack.is_empty() => break true,
                TokenKind::Open(b) => stack.push(*b, i),
                TokenKind::Close(b) => {
                    if stack.close(*b).is_none() {
                        self.unmatched_close(i);
                    }
                }
                _ => {}
            }
            self.advance();
        };
        let clause = ThenNode {
            content: self.between(then, self.pos).trim().to_owned(),
            range: self.span(then, self.last_consumed(then)),
        };
        if terminated {
            self.advance();
        }
        (clause, terminated)
    }
}
