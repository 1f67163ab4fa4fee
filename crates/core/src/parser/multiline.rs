//! Bracket tracking for constructs whose brackets may span many lines,
//! including the recursive scan of keyword patterns such as
//! `exists( not( ... ) )`.

use tracing::debug;

use super::Parser;
use crate::ast::{ConditionType, MultiLinePatternNode, Range};
use crate::error::{ErrorKind, ParseError};
use crate::lexer::{Bracket, TokenKind};

/// Open brackets awaiting their closer, innermost last.
#[derive(Debug, Default)]
pub(super) struct BracketStack {
    open: Vec<(Bracket, usize)>,
}

impl BracketStack {
    pub(super) fn push(&mut self, bracket: Bracket, at: usize) {
        self.open.push((bracket, at));
    }

    pub(super) fn is_empty(&self) -> bool {
        self.open.is_empty()
    }

    /// Pops the innermost opener if it has the same bracket class and
    /// returns its token index. A mismatched closer leaves the stack as is.
    pub(super) fn close(&mut self, bracket: Bracket) -> Option<usize> {
        match self.open.last() {
            Some(&(top, at)) if top == bracket => {
                self.open.pop();
                Some(at)
            }
            _ => None,
        }
    }
}

/// Result of scanning one keyword pattern.
pub(super) struct TrackedPattern {
    pub node: MultiLinePatternNode,
    /// The closing `)` is on a later line than the opening one, or missing.
    pub is_multi_line: bool,
    /// Every matched parenthesis pair met while scanning.
    pub parens: Vec<Range>,
}

impl<'a> Parser<'a> {
    pub(super) fn unmatched_close(&mut self, i: usize) {
        if let TokenKind::Close(b) = self.peek_at(i) {
            let message = format!("Unmatched closing '{}'", b.close_char());
            self.error_at(ErrorKind::Bracket, i, message);
        }
    }

    /// Consume a bracketed group starting at the current `Open` token and
    /// return the index of its closer.
    ///
    /// Mismatched closers inside the group are reported and skipped. The
    /// scan stops without consuming at end of input or at a recovery point,
    /// returning `None`; the caller decides how to report that.
    pub(super) fn scan_group(&mut self, mut parens: Option<&mut Vec<Range>>) -> Option<usize> {
        let TokenKind::Open(first) = self.peek() else {
            return None;
        };
        let mut stack = BracketStack::default();
        stack.push(*first, self.pos);
        self.advance();
        loop {
            if self.at_eof() || self.at_recovery_point() {
                return None;
            }
            let i = self.pos;
            match self.peek() {
                TokenKind::Open(b) => stack.push(*b, i),
                TokenKind::Close(b) => match stack.close(*b) {
                    Some(opener) => {
                        if *b == Bracket::Paren {
                            if let Some(parens) = parens.as_deref_mut() {
                                parens.push(self.span(opener, i));
                            }
                        }
                        if stack.is_empty() {
                            self.advance();
                            return Some(i);
                        }
                    }
                    None => self.unmatched_close(i),
                },
                _ => {}
            }
            self.advance();
        }
    }

    /// Index of the closer matching the `Open` token at `open`, looked up
    /// without consuming or reporting anything. `None` when the group runs
    /// into end of input or a recovery point.
    pub(super) fn matching_close(&self, open: usize) -> Option<usize> {
        let TokenKind::Open(first) = self.peek_at(open) else {
            return None;
        };
        let mut stack = BracketStack::default();
        stack.push(*first, open);
        let mut i = open + 1;
        loop {
            if matches!(self.peek_at(i), TokenKind::Eof) || self.is_recovery_point(i) {
                return None;
            }
            match self.peek_at(i) {
                TokenKind::Open(b) => stack.push(*b, i),
                TokenKind::Close(b) => {
                    if stack.close(*b).is_some() && stack.is_empty() {
                        return Some(i);
                    }
                }
                _ => {}
            }
            i += 1;
        }
    }

    /// Consume a bracketed group that must close within a one-line header.
    ///
    /// A group that never closes is reported at its opener and only the
    /// rest of its line is consumed, so the lines below still parse.
    /// Returns whether the group closed.
    pub(super) fn scan_line_group(&mut self) -> bool {
        let open = self.pos;
        if self.matching_close(open).is_some() {
            return self.scan_group(None).is_some();
        }
        if let TokenKind::Open(b) = self.peek() {
            let message = format!("Unclosed '{}'", b.open_char());
            self.error_at(ErrorKind::Bracket, open, message);
        }
        let line = self.cur().range.start.line;
        while !self.at_eof() && self.cur().range.start.line == line {
            self.advance();
        }
        false
    }

    /// Scan a keyword pattern whose keyword is the current token and whose
    /// `(` follows it.
    ///
    /// Nested keyword patterns become `nested_patterns` one level deeper;
    /// other units become `inner_conditions`. `then` and `end` met inside
    /// the brackets are content. The scan ends when the opening `(` is
    /// matched, or at end of input or a recovery point, in which case the
    /// pattern is incomplete and a diagnostic is anchored at the `(`.
    pub(super) fn track_pattern(&mut self, pattern_type: ConditionType, depth: usize) -> TrackedPattern {
        let keyword_idx = self.pos;
        let keyword = self.word_at(keyword_idx).unwrap_or_default().to_owned();
        self.advance();
        let open = self.pos;
        self.advance();

        let mut node = MultiLinePatternNode {
            pattern_type,
            keyword,
            depth,
            open_bracket: self.token(open).range,
            ..Default::default()
        };
        let mut parens = Vec::new();
        let mut stack = BracketStack::default();
        stack.push(Bracket::Paren, open);

        let close = loop {
            if self.at_eof() || self.at_recovery_point() {
                break None;
            }
            let i = self.pos;
            match self.peek() {
                TokenKind::Open(b) => {
                    stack.push(*b, i);
                    self.advance();
                }
                TokenKind::Close(b) => {
                    match stack.close(*b) {
                        Some(opener) => {
                            if *b == Bracket::Paren {
                                parens.push(self.span(opener, i));
                            }
                        }
                        None => self.unmatched_close(i),
                    }
                    self.advance();
                    if stack.is_empty() {
                        break Some(i);
                    }
                }
                TokenKind::Word(w) if w == "then" || w == "end" => self.advance(),
                TokenKind::Word(_) | TokenKind::Variable(_) if !self.at_separator() => {
                    if let Some(mut cond) = self.parse_condition(depth + 1) {
                        match cond.multi_line_pattern.take() {
                            Some(child) => node.nested_patterns.push(child),
                            None => node.inner_conditions.push(cond),
                        }
                    }
                    if self.pos == i {
                        self.advance();
                    }
                }
                _ => self.advance(),
            }
        };

        let last = close.unwrap_or_else(|| self.last_consumed(open));
        node.is_complete = close.is_some();
        node.range = self.span(keyword_idx, last);
        node.content = self.slice(keyword_idx, last).to_owned();

        if !node.is_complete {
            let kind = if self.at_eof() {
                ErrorKind::Eof
            } else {
                ErrorKind::Bracket
            };
            self.report(ParseError::error(
                kind,
                node.open_bracket,
                "Incomplete multi-line pattern: unmatched opening parenthesis",
            ));
        }

        let is_multi_line = match close {
            Some(c) => self.token(c).range.start.line > self.token(open).range.start.line,
            None => true,
        };
        debug!(
            keyword = %node.keyword,
            depth,
            complete = node.is_complete,
            lines = node.range.line_count(),
            "tracked keyword pattern"
        );
        TrackedPattern {
            node,
            is_multi_line,
            parens,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::{DroolsFile, MultiLinePatternNode};
    use crate::options::ParseOptions;
    use crate::parser::parse_source;

    fn parse_when(body: &str) -> (DroolsFile, Vec<ParseError>) {
        let src = format!("rule \"t\"\nwhen\n{}\nthen\nend\n", body);
        parse_source(&src, &ParseOptions::default())
    }

    fn first_pattern(file: &DroolsFile) -> &MultiLinePatternNode {
        file.rules[0].when.as_ref().unwrap().conditions[0]
            .multi_line_pattern
            .as_ref()
            .expect("keyword pattern")
    }

    #[test]
    fn stack_pops_only_matching_class() {
        let mut s = BracketStack::default();
        s.push(Bracket::Paren, 0);
        s.push(Bracket::Brace, 1);
        assert_eq!(s.close(Bracket::Paren), None);
        assert_eq!(s.close(Bracket::Brace), Some(1));
        assert_eq!(s.close(Bracket::Paren), Some(0));
        assert!(s.is_empty());
    }

    #[test]
    fn nested_patterns_record_recursion_depth() {
        let (file, errors) = parse_when("  exists( not( eval( X ) ) )");
        assert!(errors.is_empty(), "{:?}", errors);
        let exists = first_pattern(&file);
        assert_eq!(exists.keyword, "exists");
        assert_eq!(exists.depth, 0);
        assert!(exists.is_complete);
        assert_eq!(exists.nested_patterns.len(), 1);
        let not = &exists.nested_patterns[0];
        assert_eq!(not.pattern_type, ConditionType::Not);
        assert_eq!(not.depth, 1);
        assert_eq!(not.nested_patterns.len(), 1);
        let eval = &not.nested_patterns[0];
        assert_eq!(eval.depth, 2);
        assert_eq!(eval.inner_conditions.len(), 1);
        assert_eq!(eval.inner_conditions[0].content, "X");
        assert_eq!(eval.inner_conditions[0].condition_type, ConditionType::Pattern);
        assert!(exists.range.contains(&not.range));
        assert!(not.range.contains(&eval.range));
        assert!(eval.range.contains(&eval.inner_conditions[0].range));
    }

    #[test]
    fn nested_pattern_keeps_binding_and_prefix() {
        let body = "  exists(\n    $x : not( Person() )\n    not exists( Pet() )\n  )";
        let (file, errors) = parse_when(body);
        assert!(errors.is_empty(), "{:?}", errors);
        let exists = first_pattern(&file);
        assert_eq!(exists.binding, None);
        assert_eq!(exists.nested_patterns.len(), 2);
        let bound = &exists.nested_patterns[0];
        assert_eq!(bound.binding.as_deref(), Some("$x"));
        assert_eq!(bound.pattern_type, ConditionType::Not);
        assert_eq!(bound.prefix, None);
        let negated = &exists.nested_patterns[1];
        assert_eq!(negated.pattern_type, ConditionType::Exists);
        assert_eq!(negated.prefix, Some(ConditionType::Not));
    }

    #[test]
    fn multi_line_pattern_collects_inner_conditions_in_order() {
        let body = "  accumulate(\n    $o : Order( total > 100 );\n    $sum : sum( $o.total )\n  )";
        let (file, errors) = parse_when(body);
        assert!(errors.is_empty(), "{:?}", errors);
        let cond = &file.rules[0].when.as_ref().unwrap().conditions[0];
        assert!(cond.is_multi_line);
        assert_eq!(cond.condition_type, ConditionType::Accumulate);
        let acc = first_pattern(&file);
        let inner: Vec<_> = acc.inner_conditions.iter().map(|c| c.content.as_str()).collect();
        assert_eq!(inner, vec!["$o : Order( total > 100 )", "$sum : sum( $o.total )"]);
        assert_eq!(acc.inner_conditions[0].binding.as_deref(), Some("$o"));
        assert_eq!(acc.range.start.line, 2);
        assert_eq!(acc.range.end.line, 5);
    }

    #[test]
    fn then_and_end_inside_open_bracket_are_content() {
        let body = "  exists(\n    Person()\n  then\n  end\n  )";
        let (file, errors) = parse_when(body);
        assert!(errors.is_empty(), "{:?}", errors);
        let pattern = first_pattern(&file);
        assert!(pattern.is_complete);
        assert!(pattern.content.contains("then"));
        assert_eq!(pattern.inner_conditions.len(), 1);
    }

    #[test]
    fn eof_before_closure_marks_incomplete_at_open_bracket() {
        let src = "rule r\nwhen\n  exists(\n    Person()\n";
        let (file, errors) = parse_source(src, &ParseOptions::default());
        let pattern = first_pattern(&file);
        assert!(!pattern.is_complete);
        let e = errors
            .iter()
            .find(|e| e.message.starts_with("Incomplete multi-line pattern"))
            .expect("pattern diagnostic");
        assert_eq!(e.kind, ErrorKind::Eof);
        assert_eq!(e.range, pattern.open_bracket);
        assert_eq!(e.range.start.line, 2);
        assert_eq!(e.range.start.column, 8);
    }

    #[test]
    fn mismatched_closer_is_reported_and_skipped() {
        let (file, errors) = parse_when("  exists(\n    Person( ] )\n  )");
        let pattern = first_pattern(&file);
        assert!(pattern.is_complete);
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].kind, ErrorKind::Bracket);
        assert_eq!(errors[0].message, "Unmatched closing ']'");
        assert_eq!(errors[0].range.start.line, 3);
    }

    #[test]
    fn stray_brace_does_not_close_paren() {
        let (file, errors) = parse_when("  not( Person() }\n  )");
        let pattern = first_pattern(&file);
        assert!(pattern.is_complete);
        assert_eq!(pattern.range.end.line, 3);
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].message, "Unmatched closing '}'");
    }

    #[test]
    fn nesting_beyond_cap_is_kept_flat_with_warning() {
        let depth = 8;
        let mut body = String::new();
        for _ in 0..depth {
            body.push_str("exists(\n");
        }
        body.push_str("Person()\n");
        for _ in 0..depth {
            body.push_str(")\n");
        }
        let src = format!("rule r\nwhen\n{}then\nend\n", body);
        let options = ParseOptions {
            max_nesting_depth: 3,
            ..ParseOptions::default()
        };
        let (file, errors) = parse_source(&src, &options);
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].severity, crate::error::Severity::Warning);

        let mut deepest = 0;
        first_pattern(&file).walk(&mut |p| deepest = deepest.max(p.depth));
        assert_eq!(deepest, 3);
        assert!(file.rules[0].then.is_some());
    }

    #[test]
    fn scan_group_stops_at_recovery_point() {
        let src = "function void f(int a {\n  x();\nrule r\nwhen\nthen\nend\n";
        let (file, errors) = parse_source(src, &ParseOptions::default());
        assert_eq!(file.rules.len(), 1);
        assert_eq!(file.functions.len(), 1);
        assert!(errors.iter().any(|e| e.message.starts_with("Incomplete function")));
    }
}
