//! MDX tokenizer.
//!
//! Permissive by design: tool-generated MDX arrives with erratic spacing,
//! stray characters and unterminated constructs. Lexical problems become
//! diagnostics, never panics, and scanning always makes progress.
//!
//! Comments are stripped here but block-comment bodies are kept so the
//! hint scanner can pick structured `/* KEY: value */` annotations out of
//! them (see [`crate::hints`]).

use serde::{Deserialize, Serialize};

use crate::diag::{suggestion, DiagKind, Diagnostic, DiagnosticBag};

/// Byte span plus human coordinates of a token or production.
/// `line`/`column` are 1-based and point at the start.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Span {
    pub start: usize,
    pub end: usize,
    pub line: u32,
    pub column: u32,
}

impl Default for Span {
    fn default() -> Self {
        Span {
            start: 0,
            end: 0,
            line: 1,
            column: 1,
        }
    }
}

impl Span {
    pub fn new(start: usize, end: usize, line: u32, column: u32) -> Self {
        Span {
            start,
            end,
            line,
            column,
        }
    }

    /// Smallest span covering both inputs. Keeps the left coordinates.
    pub fn merge(&self, other: &Span) -> Span {
        Span {
            start: self.start.min(other.start),
            end: self.end.max(other.end),
            line: self.line,
            column: self.column,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Token {
    /// Unbracketed identifier or keyword; keywords are resolved
    /// case-insensitively in the parser.
    Ident(String),
    /// `[…]` identifier, content verbatim including spaces and punctuation.
    Bracketed(String),
    /// Numeric literal kept as written (`12`, `3.5`, `1.5E+6`).
    Number(String),
    /// String literal in either quote form, quotes stripped.
    Str(String),
    Dot,
    Comma,
    Semi,
    Colon,
    LParen,
    RParen,
    LBrace,
    RBrace,
    Amp,
    Plus,
    Minus,
    Star,
    Slash,
    Eq,
    Neq,
    Lt,
    Gt,
    Lte,
    Gte,
    Eof,
}

impl std::fmt::Display for Token {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Token::Ident(s) => write!(f, "'{s}'"),
            Token::Bracketed(s) => write!(f, "'[{s}]'"),
            Token::Number(s) => write!(f, "number {s}"),
            Token::Str(s) => write!(f, "string \"{s}\""),
            Token::Dot => write!(f, "'.'"),
            Token::Comma => write!(f, "','"),
            Token::Semi => write!(f, "';'"),
            Token::Colon => write!(f, "':'"),
            Token::LParen => write!(f, "'('"),
            Token::RParen => write!(f, "')'"),
            Token::LBrace => write!(f, "'{{'"),
            Token::RBrace => write!(f, "'}}'"),
            Token::Amp => write!(f, "'&'"),
            Token::Plus => write!(f, "'+'"),
            Token::Minus => write!(f, "'-'"),
            Token::Star => write!(f, "'*'"),
            Token::Slash => write!(f, "'/'"),
            Token::Eq => write!(f, "'='"),
            Token::Neq => write!(f, "'<>'"),
            Token::Lt => write!(f, "'<'"),
            Token::Gt => write!(f, "'>'"),
            Token::Lte => write!(f, "'<='"),
            Token::Gte => write!(f, "'>='"),
            Token::Eof => write!(f, "end of input"),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Spanned {
    pub token: Token,
    pub span: Span,
}

/// A block comment body captured during lexing, candidate for hint
/// extraction.
#[derive(Debug, Clone)]
pub struct CommentCapture {
    pub text: String,
    pub span: Span,
}

#[derive(Debug)]
pub struct LexOutput {
    pub tokens: Vec<Spanned>,
    pub comments: Vec<CommentCapture>,
}

struct Lexer<'a> {
    src: &'a str,
    chars: Vec<(usize, char)>,
    pos: usize,
    line: u32,
    column: u32,
}

impl<'a> Lexer<'a> {
    fn new(src: &'a str) -> Self {
        Lexer {
            src,
            chars: src.char_indices().collect(),
            pos: 0,
            line: 1,
            column: 1,
        }
    }

    fn peek(&self) -> Option<char> {
        self.chars.get(self.pos).map(|&(_, c)| c)
    }

    fn peek_at(&self, ahead: usize) -> Option<char> {
        self.chars.get(self.pos + ahead).map(|&(_, c)| c)
    }

    fn byte_offset(&self) -> usize {
        self.chars
            .get(self.pos)
            .map(|&(i, _)| i)
            .unwrap_or(self.src.len())
    }

    fn bump(&mut self) -> Option<char> {
        let c = self.peek()?;
        self.pos += 1;
        if c == '\n' {
            self.line += 1;
            self.column = 1;
        } else {
            self.column += 1;
        }
        Some(c)
    }

    fn here(&self) -> (usize, u32, u32) {
        (self.byte_offset(), self.line, self.column)
    }

    fn span_from(&self, start: (usize, u32, u32)) -> Span {
        Span::new(start.0, self.byte_offset(), start.1, start.2)
    }
}

/// Tokenize MDX source. Lexical errors land in `bag`; the token stream is
/// always terminated by [`Token::Eof`] and usable for best-effort parsing.
pub fn lex(src: &str, bag: &mut DiagnosticBag) -> LexOutput {
    let mut lx = Lexer::new(src);
    let mut tokens = Vec::new();
    let mut comments = Vec::new();

    while let Some(c) = lx.peek() {
        // Whitespace
        if c.is_whitespace() {
            lx.bump();
            continue;
        }

        let start = lx.here();

        // Line comments: `--` and `//`
        if (c == '-' && lx.peek_at(1) == Some('-')) || (c == '/' && lx.peek_at(1) == Some('/')) {
            while let Some(c) = lx.peek() {
                if c == '\n' {
                    break;
                }
                lx.bump();
            }
            continue;
        }

        // Block comment, nested by depth
        if c == '/' && lx.peek_at(1) == Some('*') {
            lx.bump();
            lx.bump();
            let body_start = lx.byte_offset();
            let mut body_end = body_start;
            let mut depth = 1usize;
            loop {
                match lx.peek() {
                    None => {
                        bag.push(
                            Diagnostic::error(
                                DiagKind::ParseError,
                                "unterminated block comment",
                                lx.span_from(start),
                            )
                            .with_suggestion(suggestion::UNTERMINATED_COMMENT)
                            .with_snippet_from(src),
                        );
                        break;
                    }
                    Some('/') if lx.peek_at(1) == Some('*') => {
                        depth += 1;
                        lx.bump();
                        lx.bump();
                    }
                    Some('*') if lx.peek_at(1) == Some('/') => {
                        depth -= 1;
                        body_end = lx.byte_offset();
                        lx.bump();
                        lx.bump();
                        if depth == 0 {
                            break;
                        }
                    }
                    Some(_) => {
                        lx.bump();
                        body_end = lx.byte_offset();
                    }
                }
            }
            comments.push(CommentCapture {
                text: src[body_start..body_end].to_string(),
                span: lx.span_from(start),
            });
            continue;
        }

        // Bracketed identifier
        if c == '[' {
            lx.bump();
            let content_start = lx.byte_offset();
            let mut content_end = content_start;
            let mut closed = false;
            while let Some(c) = lx.peek() {
                if c == ']' {
                    content_end = lx.byte_offset();
                    lx.bump();
                    closed = true;
                    break;
                }
                lx.bump();
                content_end = lx.byte_offset();
            }
            if !closed {
                bag.push(
                    Diagnostic::error(
                        DiagKind::ParseError,
                        "unterminated bracketed identifier",
                        lx.span_from(start),
                    )
                    .with_suggestion(suggestion::UNBALANCED_BRACKETS)
                    .with_snippet_from(src),
                );
            }
            tokens.push(Spanned {
                token: Token::Bracketed(src[content_start..content_end].to_string()),
                span: lx.span_from(start),
            });
            continue;
        }

        // String literal, both quote forms
        if c == '"' || c == '\'' {
            let quote = c;
            lx.bump();
            let mut s = String::new();
            let mut closed = false;
            while let Some(c) = lx.peek() {
                if c == quote {
                    lx.bump();
                    // Doubled quote is an escaped quote
                    if lx.peek() == Some(quote) {
                        s.push(quote);
                        lx.bump();
                        continue;
                    }
                    closed = true;
                    break;
                }
                s.push(c);
                lx.bump();
            }
            if !closed {
                bag.push(
                    Diagnostic::error(
                        DiagKind::ParseError,
                        "unterminated string literal",
                        lx.span_from(start),
                    )
                    .with_suggestion(suggestion::UNTERMINATED_STRING)
                    .with_snippet_from(src),
                );
            }
            tokens.push(Spanned {
                token: Token::Str(s),
                span: lx.span_from(start),
            });
            continue;
        }

        // Numeric literal, including scientific notation
        if c.is_ascii_digit() {
            let num_start = lx.byte_offset();
            while matches!(lx.peek(), Some(c) if c.is_ascii_digit()) {
                lx.bump();
            }
            if lx.peek() == Some('.') && matches!(lx.peek_at(1), Some(c) if c.is_ascii_digit()) {
                lx.bump();
                while matches!(lx.peek(), Some(c) if c.is_ascii_digit()) {
                    lx.bump();
                }
            }
            if matches!(lx.peek(), Some('e') | Some('E')) {
                let mut ahead = 1;
                if matches!(lx.peek_at(1), Some('+') | Some('-')) {
                    ahead = 2;
                }
                if matches!(lx.peek_at(ahead), Some(c) if c.is_ascii_digit()) {
                    for _ in 0..ahead {
                        lx.bump();
                    }
                    while matches!(lx.peek(), Some(c) if c.is_ascii_digit()) {
                        lx.bump();
                    }
                }
            }
            tokens.push(Spanned {
                token: Token::Number(src[num_start..lx.byte_offset()].to_string()),
                span: lx.span_from(start),
            });
            continue;
        }

        // Identifier
        if c.is_alphabetic() || c == '_' {
            let id_start = lx.byte_offset();
            while matches!(lx.peek(), Some(c) if c.is_alphanumeric() || c == '_') {
                lx.bump();
            }
            tokens.push(Spanned {
                token: Token::Ident(src[id_start..lx.byte_offset()].to_string()),
                span: lx.span_from(start),
            });
            continue;
        }

        // Operators and punctuation
        let token = match c {
            '.' => Some(Token::Dot),
            ',' => Some(Token::Comma),
            ';' => Some(Token::Semi),
            ':' => Some(Token::Colon),
            '(' => Some(Token::LParen),
            ')' => Some(Token::RParen),
            '{' => Some(Token::LBrace),
            '}' => Some(Token::RBrace),
            '&' => Some(Token::Amp),
            '+' => Some(Token::Plus),
            '-' => Some(Token::Minus),
            '*' => Some(Token::Star),
            '/' => Some(Token::Slash),
            '=' => Some(Token::Eq),
            '<' => match lx.peek_at(1) {
                Some('>') => {
                    lx.bump();
                    Some(Token::Neq)
                }
                Some('=') => {
                    lx.bump();
                    Some(Token::Lte)
                }
                _ => Some(Token::Lt),
            },
            '>' => {
                if lx.peek_at(1) == Some('=') {
                    lx.bump();
                    Some(Token::Gte)
                } else {
                    Some(Token::Gt)
                }
            }
            ']' => {
                bag.push(
                    Diagnostic::error(
                        DiagKind::ParseError,
                        "']' without matching '['",
                        Span::new(start.0, start.0 + 1, start.1, start.2),
                    )
                    .with_suggestion(suggestion::UNBALANCED_BRACKETS)
                    .with_snippet_from(src),
                );
                None
            }
            other => {
                bag.push(
                    Diagnostic::error(
                        DiagKind::ParseError,
                        format!("unexpected character '{other}'"),
                        Span::new(start.0, start.0 + other.len_utf8(), start.1, start.2),
                    )
                    .with_snippet_from(src),
                );
                None
            }
        };
        lx.bump();
        if let Some(token) = token {
            tokens.push(Spanned {
                token,
                span: lx.span_from(start),
            });
        }
    }

    tokens.push(Spanned {
        token: Token::Eof,
        span: Span::new(src.len(), src.len(), lx.line, lx.column),
    });
    LexOutput { tokens, comments }
}
