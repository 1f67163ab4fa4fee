//! Header statements (`package`, `import`, `global`), `function` blocks and
//! `declare` type declarations.

use super::Parser;
use crate::ast::{
    DeclareKind, DeclareNode, FieldNode, FunctionNode, GlobalNode, ImportNode, PackageNode,
};
use crate::error::{Abandon, Construct, ErrorKind};
use crate::lexer::{Bracket, TokenKind};

impl<'a> Parser<'a> {
    /// Consume the rest of a one-line statement after the token at
    /// `keyword`, through an optional `;`. Returns the first and last
    /// content tokens, or `None` if the statement is empty.
    fn take_statement(&mut self, keyword: usize) -> Option<(usize, usize)> {
        let line = self.token(keyword).range.start.line;
        let first = self.pos;
        while !self.at_eof() && !self.is_punct(';') && self.cur().range.start.line == line {
            self.advance();
        }
        let content = (self.pos > first).then(|| (first, self.pos - 1));
        if self.is_punct(';') && self.cur().range.start.line == line {
            self.advance();
        }
        content
    }

    /// Source text of tokens `first..=last` with whitespace removed.
    fn compact(&self, first: usize, last: usize) -> String {
        self.slice(first, last).split_whitespace().collect()
    }

    pub(super) fn parse_package(&mut self, package: &mut PackageNode) -> Result<(), Abandon> {
        let keyword = self.pos;
        self.advance();
        match self.take_statement(keyword) {
            Some((first, last)) => package.name = self.compact(first, last),
            None => self.error_at(ErrorKind::Grammar, keyword, "Expected package name"),
        }
        Ok(())
    }

    pub(super) fn parse_import(&mut self, import: &mut ImportNode) -> Result<(), Abandon> {
        let keyword = self.pos;
        self.advance();
        let line = self.token(keyword).range.start.line;
        // `static` and `function` are modifiers only when a path follows.
        loop {
            let modifier = self.word_at(self.pos);
            let followed = matches!(self.peek_at(self.pos + 1), TokenKind::Word(_))
                && self.token(self.pos + 1).range.start.line == line;
            match modifier {
                Some("static") if followed => import.is_static = true,
                Some("function") if followed => import.is_function = true,
                _ => break,
            }
            self.advance();
        }
        match self.take_statement(keyword) {
            Some((first, last)) => import.path = self.compact(first, last),
            None => self.error_at(ErrorKind::Grammar, keyword, "Expected import path"),
        }
        Ok(())
    }

    pub(super) fn parse_global(&mut self, global: &mut GlobalNode) -> Result<(), Abandon> {
        let keyword = self.pos;
        self.advance();
        match self.take_statement(keyword) {
            Some((first, last)) if last > first && self.word_at(last).is_some() => {
                global.type_name = self.slice(first, last - 1).trim().to_owned();
                global.name = self.word_at(last).unwrap_or_default().to_owned();
            }
            _ => self.error_at(ErrorKind::Grammar, keyword, "Expected global type and name"),
        }
        Ok(())
    }

    /// `function ReturnType name(params) { body }`. The body is kept raw and
    /// ends at the `}` matching its `{`.
    pub(super) fn parse_function(&mut self, function: &mut FunctionNode) -> Result<(), Abandon> {
        let keyword = self.pos;
        self.advance();
        let header = self.pos;
        while !self.at_eof()
            && !self.at_recovery_point()
            && !matches!(self.peek(), TokenKind::Open(Bracket::Paren | Bracket::Brace))
        {
            self.advance();
        }
        if self.pos > header {
            let name = self.pos - 1;
            function.name = self.word_at(name).unwrap_or_default().to_owned();
            if name > header {
                function.return_type = self.slice(header, name - 1).trim().to_owned();
            }
        }
        if function.name.is_empty() {
            self.error_at(ErrorKind::Grammar, keyword, "Expected function name");
        }

        if !matches!(self.peek(), TokenKind::Open(Bracket::Paren)) {
            return Err(self.abandon(Construct::Function, "("));
        }
        let open = self.pos;
        let Some(close) = self.scan_group(None) else {
            return Err(self.abandon(Construct::Function, ")"));
        };
        function.parameters = self.between(open, close).trim().to_owned();

        if !matches!(self.peek(), TokenKind::Open(Bracket::Brace)) {
            return Err(self.abandon(Construct::Function, "{"));
        }
        let open = self.pos;
        let Some(close) = self.scan_group(None) else {
            return Err(self.abandon(Construct::Function, "}"));
        };
        function.body = self.between(open, close).trim().to_owned();
        Ok(())
    }

    /// `declare [enum|trait] Name [extends Super] ... end`.
    pub(super) fn parse_declare(&mut self, declare: &mut DeclareNode) -> Result<(), Abandon> {
        let keyword = self.pos;
        self.advance();
        let line = self.token(keyword).range.start.line;
        if matches!(self.peek_at(self.pos + 1), TokenKind::Word(_)) {
            match self.word_at(self.pos) {
                Some("enum") => declare.kind = DeclareKind::Enum,
                Some("trait") => declare.kind = DeclareKind::Trait,
                _ => {}
            }
            if declare.kind != DeclareKind::Type {
                self.advance();
            }
        }

        match self.take_dotted_name(line) {
            Some(name) => declare.name = name,
            None => self.error_at(ErrorKind::Grammar, keyword, "Expected declaration name"),
        }
        if self.is_word("extends") && self.cur().range.start.line == line {
            let extends = self.pos;
            self.advance();
            match self.take_statement(extends) {
                Some((first, last)) => declare.super_type = Some(self.compact(first, last)),
                None => self.error_at(ErrorKind::Grammar, extends, "Expected super type after 'extends'"),
            }
        }

        let mut pending = Vec::new();
        loop {
            if self.at_eof() || self.at_recovery_point() {
                return Err(self.abandon(Construct::Declare, "end"));
            }
            let i = self.pos;
            match self.peek() {
                TokenKind::Word(w) if w == "end" => {
                    self.advance();
                    return Ok(());
                }
                TokenKind::Punct('@') => {
                    let annotation = self.take_annotation_text();
                    match declare.fields.last_mut() {
                        Some(field) if field.range.end.line == self.token(i).range.start.line => {
                            field.annotations.push(annotation)
                        }
                        None => declare.annotations.push(annotation),
                        Some(_) => pending.push(annotation),
                    }
                }
                TokenKind::Punct(',' | ';') => self.advance(),
                TokenKind::Word(_) if matches!(self.peek_at(i + 1), TokenKind::Punct(':')) => {
                    let mut field = self.parse_field();
                    let mut annotations = std::mem::take(&mut pending);
                    annotations.append(&mut field.annotations);
                    field.annotations = annotations;
                    declare.fields.push(field);
                }
                TokenKind::Word(_) if declare.kind == DeclareKind::Enum && declare.fields.is_empty() => {
                    let constant = self.take_enum_constant();
                    declare.constants.push(constant);
                }
                TokenKind::Word(_) => {
                    self.error_at(ErrorKind::Grammar, i, "Expected ':' after field name");
                    let line = self.token(i).range.start.line;
                    while !self.at_eof()
                        && !self.at_recovery_point()
                        && self.cur().range.start.line == line
                    {
                        self.advance();
                    }
                }
                _ => {
                    let what = self.describe(i);
                    self.error_at(
                        ErrorKind::Grammar,
                        i,
                        format!("Unexpected '{}' in declaration", what),
                    );
                    self.advance();
                }
            }
        }
    }

    /// `a.b.C` on the given line, joined without whitespace.
    fn take_dotted_name(&mut self, line: u32) -> Option<String> {
        let first = self.pos;
        while self.word_at(self.pos).is_some() && self.cur().range.start.line == line {
            if self.is_word("extends") || self.at_recovery_point() {
                break;
            }
            self.advance();
            if self.is_punct('.') && self.word_at(self.pos + 1).is_some() {
                self.advance();
            } else {
                break;
            }
        }
        (self.pos > first).then(|| self.compact(first, self.pos - 1))
    }

    /// `@Name(args)` verbatim.
    fn take_annotation_text(&mut self) -> String {
        let at = self.pos;
        self.take_annotation();
        self.slice(at, self.last_consumed(at)).to_owned()
    }

    /// `RED` or `RED("r", 1)`.
    fn take_enum_constant(&mut self) -> String {
        let start = self.pos;
        self.advance();
        if matches!(self.peek(), TokenKind::Open(Bracket::Paren)) {
            let open = self.pos;
            if self.scan_group(None).is_none() {
                self.error_at(ErrorKind::Bracket, open, "Unclosed '('");
            }
        }
        self.slice(start, self.last_consumed(start)).to_owned()
    }

    /// `name : Type [= default] [@annotation ...] [;]`, all on one line.
    fn parse_field(&mut self) -> FieldNode {
        let start = self.pos;
        let line = self.token(start).range.start.line;
        let mut field = FieldNode {
            name: self.word_at(start).unwrap_or_default().to_owned(),
            ..Default::default()
        };
        self.advance();
        self.advance();

        let on_line = |p: &Self| !p.at_eof() && !p.at_recovery_point() && p.cur().range.start.line == line;
        let type_start = self.pos;
        while on_line(self) && !matches!(self.peek(), TokenKind::Punct('@' | ';' | '=')) {
            if matches!(self.peek(), TokenKind::Open(_)) {
                if !self.scan_line_group() {
                    break;
                }
            } else {
                self.advance();
            }
        }
        if self.pos > type_start {
            field.type_name = self.compact(type_start, self.pos - 1);
        } else {
            self.error_at(ErrorKind::Grammar, start, "Expected field type");
        }

        while on_line(self) {
            match self.peek() {
                TokenKind::Punct('@') => {
                    let annotation = self.take_annotation_text();
                    field.annotations.push(annotation);
                }
                TokenKind::Punct(';') => {
                    self.advance();
                    break;
                }
                TokenKind::Open(_) => {
                    if !self.scan_line_group() {
                        break;
                    }
                }
                // Default value: `= 0`, `= new ArrayList()`.
                _ => self.advance(),
            }
        }
        field.range = self.span(start, self.last_consumed(start));
        field
    }
}
