use crate::ast::{Position, Range};
use crate::error::{ErrorKind, ParseError};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Bracket {
    Paren,
    Brace,
    Square,
}

impl Bracket {
    pub fn from_open(c: char) -> Option<Self> {
        match c {
            '(' => Some(Bracket::Paren),
            '{' => Some(Bracket::Brace),
            '[' => Some(Bracket::Square),
            _ => None,
        }
    }

    pub fn from_close(c: char) -> Option<Self> {
        match c {
            ')' => Some(Bracket::Paren),
            '}' => Some(Bracket::Brace),
            ']' => Some(Bracket::Square),
            _ => None,
        }
    }

    pub fn open_char(self) -> char {
        match self {
            Bracket::Paren => '(',
            Bracket::Brace => '{',
            Bracket::Square => '[',
        }
    }

    pub fn close_char(self) -> char {
        match self {
            Bracket::Paren => ')',
            Bracket::Brace => '}',
            Bracket::Square => ']',
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum TokenKind {
    /// Identifiers and keywords; the parser tells them apart
    Word(String),
    /// `$name`, including the `$`
    Variable(String),
    /// Quoted literal (content without quotes, escapes kept verbatim)
    Str { value: String, quote: char },
    Number(String),
    Open(Bracket),
    Close(Bracket),
    /// Multi-character operator
    Op(&'static str),
    /// Any other single character
    Punct(char),
    Eof,
}

#[derive(Debug, Clone)]
pub struct Token {
    pub kind: TokenKind,
    pub range: Range,
    /// Byte offset of the first character.
    pub start: usize,
    /// Byte offset one past the last character.
    pub end: usize,
}

/// Tokenizer output. `tokens` always ends with an `Eof` token.
#[derive(Debug, Clone)]
pub struct Lexed {
    pub tokens: Vec<Token>,
    pub comments: Vec<Range>,
    pub diagnostics: Vec<ParseError>,
}

const OPERATORS: &[&str] = &[":=", "==", "!=", "<=", ">=", "&&", "||", "->"];

struct Cursor<'a> {
    src: &'a str,
    chars: Vec<(usize, char)>,
    idx: usize,
    line: u32,
    column: u32,
}

impl<'a> Cursor<'a> {
    fn new(src: &'a str) -> Self {
        Cursor {
            src,
            chars: src.char_indices().collect(),
            idx: 0,
            line: 0,
            column: 0,
        }
    }

    fn peek(&self) -> Option<char> {
        self.peek_at(0)
    }

    fn peek_at(&self, n: usize) -> Option<char> {
        self.chars.get(self.idx + n).map(|&(_, c)| c)
    }

    fn bump(&mut self) -> Option<char> {
        let (_, c) = *self.chars.get(self.idx)?;
        self.idx += 1;
        if c == '\n' {
            self.line += 1;
            self.column = 0;
        } else {
            self.column += 1;
        }
        Some(c)
    }

    fn offset(&self) -> usize {
        self.chars
            .get(self.idx)
            .map(|&(o, _)| o)
            .unwrap_or(self.src.len())
    }

    fn position(&self) -> Position {
        Position::new(self.line, self.column)
    }

    fn eat_while(&mut self, pred: impl Fn(char) -> bool) {
        while let Some(c) = self.peek() {
            if !pred(c) {
                break;
            }
            self.bump();
        }
    }
}

fn is_word_start(c: char) -> bool {
    c.is_alphabetic() || c == '_'
}

fn is_word_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_'
}

/// Tokenize Drools source text.
///
/// Never fails. Comments are dropped from the token stream but their ranges
/// are returned. An unterminated string or block comment swallows the rest
/// of the input and produces a warning.
pub fn lex(src: &str) -> Lexed {
    let mut cur = Cursor::new(src);
    let mut tokens = Vec::new();
    let mut comments = Vec::new();
    let mut diagnostics = Vec::new();

    while let Some(c) = cur.peek() {
        let start = cur.offset();
        let start_pos = cur.position();

        // Line comment
        if c == '/' && cur.peek_at(1) == Some('/') {
            cur.eat_while(|c| c != '\n');
            comments.push(Range::new(start_pos, cur.position()));
            continue;
        }

        // Block comment
        if c == '/' && cur.peek_at(1) == Some('*') {
            cur.bump();
            cur.bump();
            let mut closed = false;
            while let Some(c) = cur.bump() {
                if c == '*' && cur.peek() == Some('/') {
                    cur.bump();
                    closed = true;
                    break;
                }
            }
            let range = Range::new(start_pos, cur.position());
            if !closed {
                diagnostics.push(ParseError::warning(
                    ErrorKind::Eof,
                    Range::new(start_pos, Position::new(start_pos.line, start_pos.column + 2)),
                    "Unterminated block comment",
                ));
            }
            comments.push(range);
            continue;
        }

        if c.is_whitespace() {
            cur.bump();
            continue;
        }

        let kind = if c == '"' || c == '\'' {
            cur.bump();
            let mut value = String::new();
            let mut closed = false;
            while let Some(sc) = cur.bump() {
                if sc == c {
                    closed = true;
                    break;
                }
                value.push(sc);
                if sc == '\\' {
                    if let Some(escaped) = cur.bump() {
                        value.push(escaped);
                    }
                }
            }
            if !closed {
                diagnostics.push(ParseError::warning(
                    ErrorKind::Grammar,
                    Range::new(start_pos, Position::new(start_pos.line, start_pos.column + 1)),
                    "Unterminated string literal",
                ));
            }
            TokenKind::Str { value, quote: c }
        } else if is_word_start(c) {
            cur.eat_while(is_word_char);
            TokenKind::Word(src[start..cur.offset()].to_owned())
        } else if c == '$' && cur.peek_at(1).is_some_and(is_word_char) {
            cur.bump();
            cur.eat_while(is_word_char);
            TokenKind::Variable(src[start..cur.offset()].to_owned())
        } else if c.is_ascii_digit() {
            cur.eat_while(|c| c.is_ascii_alphanumeric() || c == '_');
            if cur.peek() == Some('.') && cur.peek_at(1).is_some_and(|d| d.is_ascii_digit()) {
                cur.bump();
                cur.eat_while(|c| c.is_ascii_alphanumeric() || c == '_');
            }
            TokenKind::Number(src[start..cur.offset()].to_owned())
        } else if let Some(b) = Bracket::from_open(c) {
            cur.bump();
            TokenKind::Open(b)
        } else if let Some(b) = Bracket::from_close(c) {
            cur.bump();
            TokenKind::Close(b)
        } else if let Some(op) = OPERATORS
            .iter()
            .find(|op| src[start..].starts_with(**op))
        {
            cur.bump();
            cur.bump();
            TokenKind::Op(*op)
        } else {
            cur.bump();
            TokenKind::Punct(c)
        };

        tokens.push(Token {
            kind,
            range: Range::new(start_pos, cur.position()),
            start,
            end: cur.offset(),
        });
    }

    let eof = cur.position();
    tokens.push(Token {
        kind: TokenKind::Eof,
        range: Range::new(eof, eof),
        start: src.len(),
        end: src.len(),
    });

    Lexed {
        tokens,
        comments,
        diagnostics,
    }
}
