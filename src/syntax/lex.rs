// Lexer
//
//  Copyright (C) 2014-2023 Ryan Specialty, LLC.
//
//  This file is part of WEAVER.
//
//  This program is free software: you can redistribute it and/or modify
//  it under the terms of the GNU General Public License as published by
//  the Free Software Foundation, either version 3 of the License, or
//  (at your option) any later version.
//
//  This program is distributed in the hope that it will be useful,
//  but WITHOUT ANY WARRANTY; without even the implied warranty of
//  MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
//  GNU General Public License for more details.
//
//  You should have received a copy of the GNU General Public License
//  along with this program.  If not, see <http://www.gnu.org/licenses/>.

//! Tokenization of source text.
//!
//! The lexer is an [`Iterator`] of [`Token`]s that stops after yielding
//!   either [`TokenKind::Eof`] or an error.
//! Keywords are not distinguished from identifiers here;
//!   whether `link` or `return` is a keyword depends on where it appears,
//!   and that is a decision for the parser.

use crate::{
    diagnose::{Annotate, AnnotatedSpan, Diagnostic},
    span::{Context, Span},
};
use std::{error::Error, fmt::Display};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    pub kind: TokenKind,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TokenKind {
    Ident(String),
    Int(i64),
    Str(String),
    Punct(Punct),
    Eof,
}

impl Display for TokenKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Ident(name) => write!(f, "`{name}`"),
            Self::Int(n) => write!(f, "integer `{n}`"),
            Self::Str(_) => write!(f, "string literal"),
            Self::Punct(p) => write!(f, "`{}`", p.as_str()),
            Self::Eof => write!(f, "end of file"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Punct {
    LBrace,
    RBrace,
    LParen,
    RParen,
    LBracket,
    RBracket,
    Semi,
    Comma,
    Dot,
    Colon,
    Assign,
    PlusAssign,
    MinusAssign,
    PlusPlus,
    MinusMinus,
    Plus,
    Minus,
    Star,
    Slash,
    Percent,
    Bang,
    EqEq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
    AndAnd,
    OrOr,
}

impl Punct {
    pub fn as_str(self) -> &'static str {
        use Punct::*;

        match self {
            LBrace => "{",
            RBrace => "}",
            LParen => "(",
            RParen => ")",
            LBracket => "[",
            RBracket => "]",
            Semi => ";",
            Comma => ",",
            Dot => ".",
            Colon => ":",
            Assign => "=",
            PlusAssign => "+=",
            MinusAssign => "-=",
            PlusPlus => "++",
            MinusMinus => "--",
            Plus => "+",
            Minus => "-",
            Star => "*",
            Slash => "/",
            Percent => "%",
            Bang => "!",
            EqEq => "==",
            Ne => "!=",
            Lt => "<",
            Le => "<=",
            Gt => ">",
            Ge => ">=",
            AndAnd => "&&",
            OrOr => "||",
        }
    }
}

/// Two-character punctuators,
///   tried before single characters.
const PUNCT2: [(&[u8; 2], Punct); 10] = [
    (b"+=", Punct::PlusAssign),
    (b"-=", Punct::MinusAssign),
    (b"++", Punct::PlusPlus),
    (b"--", Punct::MinusMinus),
    (b"==", Punct::EqEq),
    (b"!=", Punct::Ne),
    (b"<=", Punct::Le),
    (b">=", Punct::Ge),
    (b"&&", Punct::AndAnd),
    (b"||", Punct::OrOr),
];

fn punct1(c: u8) -> Option<Punct> {
    use Punct::*;

    Some(match c {
        b'{' => LBrace,
        b'}' => RBrace,
        b'(' => LParen,
        b')' => RParen,
        b'[' => LBracket,
        b']' => RBracket,
        b';' => Semi,
        b',' => Comma,
        b'.' => Dot,
        b':' => Colon,
        b'=' => Assign,
        b'+' => Plus,
        b'-' => Minus,
        b'*' => Star,
        b'/' => Slash,
        b'%' => Percent,
        b'!' => Bang,
        b'<' => Lt,
        b'>' => Gt,
        _ => return None,
    })
}

pub struct Lexer<'a> {
    ctx: Context,
    src: &'a str,
    pos: usize,
    done: bool,
}

impl<'a> Lexer<'a> {
    pub fn new(ctx: Context, src: &'a str) -> Self {
        Self {
            ctx,
            src,
            pos: 0,
            done: false,
        }
    }

    fn span(&self, start: usize) -> Span {
        self.ctx.span_or_zz(start, self.pos - start)
    }

    fn peek_byte(&self, ahead: usize) -> Option<u8> {
        self.src.as_bytes().get(self.pos + ahead).copied()
    }

    fn skip_trivia(&mut self) -> Result<(), LexError> {
        loop {
            match (self.peek_byte(0), self.peek_byte(1)) {
                (Some(c), _) if c.is_ascii_whitespace() => self.pos += 1,

                (Some(b'/'), Some(b'/')) => {
                    let rest = &self.src.as_bytes()[self.pos..];
                    self.pos += memchr::memchr(b'\n', rest)
                        .unwrap_or(rest.len());
                }

                (Some(b'/'), Some(b'*')) => {
                    let start = self.pos;
                    let rest = &self.src[self.pos + 2..];

                    match rest.find("*/") {
                        Some(end) => self.pos += end + 4,
                        None => {
                            self.pos = self.src.len();
                            return Err(LexError::UnterminatedComment(
                                self.span(start),
                            ));
                        }
                    }
                }

                _ => return Ok(()),
            }
        }
    }

    fn lex_ident(&mut self, start: usize) -> Token {
        while let Some(c) = self.peek_byte(0) {
            if c.is_ascii_alphanumeric() || c == b'_' {
                self.pos += 1;
            } else {
                break;
            }
        }

        Token {
            kind: TokenKind::Ident(self.src[start..self.pos].to_string()),
            span: self.span(start),
        }
    }

    fn lex_int(&mut self, start: usize) -> Result<Token, LexError> {
        while matches!(self.peek_byte(0), Some(c) if c.is_ascii_digit()) {
            self.pos += 1;
        }

        let span = self.span(start);

        self.src[start..self.pos]
            .parse()
            .map(|n| Token {
                kind: TokenKind::Int(n),
                span,
            })
            .map_err(|_| LexError::IntegerOverflow(span))
    }

    fn lex_str(&mut self, start: usize) -> Result<Token, LexError> {
        let mut value = String::new();

        // Opening quote.
        self.pos += 1;

        loop {
            let rest = &self.src[self.pos..];
            let Some(c) = rest.chars().next() else {
                return Err(LexError::UnterminatedString(self.span(start)));
            };

            match c {
                '"' => {
                    self.pos += 1;
                    break;
                }

                '\n' => {
                    return Err(LexError::UnterminatedString(self.span(start)))
                }

                '\\' => {
                    let esc_start = self.pos;
                    self.pos += 1;

                    let escaped = match self.peek_byte(0) {
                        Some(b'n') => '\n',
                        Some(b't') => '\t',
                        Some(b'r') => '\r',
                        Some(b'0') => '\0',
                        Some(b'\\') => '\\',
                        Some(b'"') => '"',
                        Some(b'\'') => '\'',
                        _ => {
                            self.pos += 1;
                            return Err(LexError::BadEscape(
                                self.ctx.span_or_zz(esc_start, 2),
                            ));
                        }
                    };

                    self.pos += 1;
                    value.push(escaped);
                }

                _ => {
                    self.pos += c.len_utf8();
                    value.push(c);
                }
            }
        }

        Ok(Token {
            kind: TokenKind::Str(value),
            span: self.span(start),
        })
    }

    fn lex_punct(&mut self, start: usize) -> Result<Token, LexError> {
        let bytes = &self.src.as_bytes()[self.pos..];

        let two = PUNCT2.iter().find(|(s, _)| bytes.starts_with(*s));

        let punct = match two {
            Some((_, p)) => {
                self.pos += 2;
                *p
            }
            None => match bytes.first().copied().and_then(punct1) {
                Some(p) => {
                    self.pos += 1;
                    p
                }
                None => {
                    let c = self.src[self.pos..].chars().next().unwrap_or('\0');
                    self.pos += c.len_utf8().max(1);
                    return Err(LexError::UnexpectedChar(c, self.span(start)));
                }
            },
        };

        Ok(Token {
            kind: TokenKind::Punct(punct),
            span: self.span(start),
        })
    }

    fn next_token(&mut self) -> Result<Token, LexError> {
        self.skip_trivia()?;

        let start = self.pos;

        match self.peek_byte(0) {
            None => Ok(Token {
                kind: TokenKind::Eof,
                span: self.span(start),
            }),
            Some(c) if c.is_ascii_alphabetic() || c == b'_' => {
                Ok(self.lex_ident(start))
            }
            Some(c) if c.is_ascii_digit() => self.lex_int(start),
            Some(b'"') => self.lex_str(start),
            Some(_) => self.lex_punct(start),
        }
    }
}

impl<'a> Iterator for Lexer<'a> {
    type Item = Result<Token, LexError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }

        let result = self.next_token();

        self.done = matches!(
            result,
            Err(_)
                | Ok(Token {
                    kind: TokenKind::Eof,
                    ..
                })
        );

        Some(result)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LexError {
    UnexpectedChar(char, Span),
    UnterminatedString(Span),
    UnterminatedComment(Span),
    BadEscape(Span),
    IntegerOverflow(Span),
}

impl Display for LexError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::UnexpectedChar(c, _) => {
                write!(f, "unexpected character `{}`", c.escape_default())
            }
            Self::UnterminatedString(_) => {
                write!(f, "unterminated string literal")
            }
            Self::UnterminatedComment(_) => write!(f, "unterminated comment"),
            Self::BadEscape(_) => write!(f, "unknown escape sequence"),
            Self::IntegerOverflow(_) => {
                write!(f, "integer literal is too large")
            }
        }
    }
}

impl Error for LexError {}

impl Diagnostic for LexError {
    fn describe(&self) -> Vec<AnnotatedSpan<'_>> {
        match self {
            Self::UnexpectedChar(_, span) => vec![span.mark_error()],
            Self::UnterminatedString(span) => span
                .error("string begins here")
                .with_help("strings may not span multiple lines")
                .into(),
            Self::UnterminatedComment(span) => {
                vec![span.error("comment begins here")]
            }
            Self::BadEscape(span) => span
                .error("this escape")
                .with_help(r#"valid escapes are \n \t \r \0 \\ \" \'"#)
                .into(),
            Self::IntegerOverflow(span) => span
                .error("this literal")
                .with_help("integers must fit in 64 signed bits")
                .into(),
        }
    }
}
