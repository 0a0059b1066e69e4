//! The tokenizer: byte stream in, positioned tokens out.
//!
//! Whitespace, `--` line comments and nested `{- … -}` block comments are
//! skipped between tokens. Keywords are only recognized when not followed by
//! an identifier character; punctuation is matched longest first. Once the
//! input is exhausted every further call yields the same zero-width `Eof`.

use crate::surface::{Pos, Span};
use std::fmt;
use std::iter::Peekable;
use std::str::Chars;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TokenKind {
    // Reserved words
    Def,
    Var,
    Prop,
    Type,
    Fun,
    Forall,
    Exist,
    Let,
    In,
    // Punctuation
    FatArrow,
    ThinArrow,
    Assign,
    LParen,
    RParen,
    Colon,
    Comma,
    Lt,
    Gt,
    DotOne,
    DotTwo,
    Amp,
    Semi,
    Ident(String),
    Eof,
}

impl fmt::Display for TokenKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TokenKind::Def => write!(f, "keyword `def`"),
            TokenKind::Var => write!(f, "keyword `var`"),
            TokenKind::Prop => write!(f, "`Prop`"),
            TokenKind::Type => write!(f, "`Type`"),
            TokenKind::Fun => write!(f, "keyword `fun`"),
            TokenKind::Forall => write!(f, "keyword `forall`"),
            TokenKind::Exist => write!(f, "keyword `exist`"),
            TokenKind::Let => write!(f, "keyword `let`"),
            TokenKind::In => write!(f, "keyword `in`"),
            TokenKind::FatArrow => write!(f, "`=>`"),
            TokenKind::ThinArrow => write!(f, "`->`"),
            TokenKind::Assign => write!(f, "`:=`"),
            TokenKind::LParen => write!(f, "`(`"),
            TokenKind::RParen => write!(f, "`)`"),
            TokenKind::Colon => write!(f, "`:`"),
            TokenKind::Comma => write!(f, "`,`"),
            TokenKind::Lt => write!(f, "`<`"),
            TokenKind::Gt => write!(f, "`>`"),
            TokenKind::DotOne => write!(f, "`.1`"),
            TokenKind::DotTwo => write!(f, "`.2`"),
            TokenKind::Amp => write!(f, "`&`"),
            TokenKind::Semi => write!(f, "`;`"),
            TokenKind::Ident(name) => write!(f, "identifier `{name}`"),
            TokenKind::Eof => write!(f, "end of input"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    pub kind: TokenKind,
    pub span: Span,
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.kind)
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TokenError {
    #[error("unexpected character `{0}`")]
    UnexpectedChar(char, Pos),
    #[error("unclosed block comment")]
    UnclosedComment(Pos),
}

impl TokenError {
    pub fn pos(&self) -> Pos {
        match self {
            TokenError::UnexpectedChar(_, pos) | TokenError::UnclosedComment(pos) => *pos,
        }
    }
}

pub struct Tokenizer<'a> {
    chars: Peekable<Chars<'a>>,
    pos: Pos,
}

fn is_ident_start(c: char) -> bool {
    c.is_ascii_alphabetic() || c == '_'
}

fn is_ident_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_' || c == '\''
}

impl<'a> Tokenizer<'a> {
    /// Expects line endings already normalized to `\n`.
    pub fn new(source: &'a str) -> Self {
        Tokenizer {
            chars: source.chars().peekable(),
            pos: Pos::start(),
        }
    }

    fn peek(&mut self) -> Option<char> {
        self.chars.peek().copied()
    }

    fn bump(&mut self) -> Option<char> {
        let c = self.chars.next()?;
        self.pos.offset += c.len_utf8();
        if c == '\n' {
            self.pos.line += 1;
            self.pos.col = 1;
        } else {
            self.pos.col += 1;
        }
        Some(c)
    }

    /// Skips whitespace, `--` line comments and nested block comments.
    fn skip_trivia(&mut self) -> Result<(), TokenError> {
        loop {
            match self.peek() {
                Some(c) if c.is_whitespace() => {
                    self.bump();
                }
                Some('-') if self.starts_with("--") => {
                    while let Some(c) = self.peek() {
                        if c == '\n' {
                            break;
                        }
                        self.bump();
                    }
                }
                Some('{') if self.starts_with("{-") => {
                    let open = self.pos;
                    self.bump();
                    self.bump();
                    self.skip_block_comment(open)?;
                }
                _ => return Ok(()),
            }
        }
    }

    /// Consumes a block comment body, honoring nesting. `open` is the
    /// position of the already-consumed `{-`.
    fn skip_block_comment(&mut self, open: Pos) -> Result<(), TokenError> {
        let mut depth = 1usize;
        while depth > 0 {
            match self.peek() {
                None => return Err(TokenError::UnclosedComment(open)),
                Some('{') if self.starts_with("{-") => {
                    self.bump();
                    self.bump();
                    depth += 1;
                }
                Some('-') if self.starts_with("-}") => {
                    self.bump();
                    self.bump();
                    depth -= 1;
                }
                Some(_) => {
                    self.bump();
                }
            }
        }
        Ok(())
    }

    /// Two-character lookahead without consuming.
    fn starts_with(&mut self, pat: &str) -> bool {
        let mut clone = self.chars.clone();
        pat.chars().all(|p| clone.next() == Some(p))
    }

    /// Produces the next token. After the end of input this keeps returning
    /// a zero-width `Eof`.
    pub fn next_token(&mut self) -> Result<Token, TokenError> {
        self.skip_trivia()?;
        let start = self.pos;

        let Some(c) = self.peek() else {
            return Ok(Token {
                kind: TokenKind::Eof,
                span: Span::new(start, start),
            });
        };

        let kind = if is_ident_start(c) {
            let mut name = String::new();
            while let Some(c) = self.peek() {
                if !is_ident_char(c) {
                    break;
                }
                name.push(c);
                self.bump();
            }
            match name.as_str() {
                "def" => TokenKind::Def,
                "var" => TokenKind::Var,
                "Prop" => TokenKind::Prop,
                "Type" => TokenKind::Type,
                "fun" => TokenKind::Fun,
                "forall" => TokenKind::Forall,
                "exist" => TokenKind::Exist,
                "let" => TokenKind::Let,
                "in" => TokenKind::In,
                _ => TokenKind::Ident(name),
            }
        } else {
            match c {
                '=' if self.starts_with("=>") => self.punct2(TokenKind::FatArrow),
                '-' if self.starts_with("->") => self.punct2(TokenKind::ThinArrow),
                ':' if self.starts_with(":=") => self.punct2(TokenKind::Assign),
                '.' if self.starts_with(".1") => self.punct2(TokenKind::DotOne),
                '.' if self.starts_with(".2") => self.punct2(TokenKind::DotTwo),
                '(' => self.punct1(TokenKind::LParen),
                ')' => self.punct1(TokenKind::RParen),
                ':' => self.punct1(TokenKind::Colon),
                ',' => self.punct1(TokenKind::Comma),
                '<' => self.punct1(TokenKind::Lt),
                '>' => self.punct1(TokenKind::Gt),
                '&' => self.punct1(TokenKind::Amp),
                ';' => self.punct1(TokenKind::Semi),
                other => return Err(TokenError::UnexpectedChar(other, start)),
            }
        };

        Ok(Token {
            kind,
            span: Span::new(start, self.pos),
        })
    }

    fn punct1(&mut self, kind: TokenKind) -> TokenKind {
        self.bump();
        kind
    }

    fn punct2(&mut self, kind: TokenKind) -> TokenKind {
        self.bump();
        self.bump();
        kind
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(source: &str) -> Vec<TokenKind> {
        let mut tokenizer = Tokenizer::new(source);
        let mut out = Vec::new();
        loop {
            let token = tokenizer.next_token().expect("tokenize should succeed");
            let done = token.kind == TokenKind::Eof;
            out.push(token.kind);
            if done {
                return out;
            }
        }
    }

    #[test]
    fn keywords_and_identifiers() {
        assert_eq!(
            kinds("def deffo fun funny let in"),
            vec![
                TokenKind::Def,
                TokenKind::Ident("deffo".to_string()),
                TokenKind::Fun,
                TokenKind::Ident("funny".to_string()),
                TokenKind::Let,
                TokenKind::In,
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn primed_identifiers() {
        assert_eq!(
            kinds("x' x'' _x"),
            vec![
                TokenKind::Ident("x'".to_string()),
                TokenKind::Ident("x''".to_string()),
                TokenKind::Ident("_x".to_string()),
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn punctuation_longest_match() {
        assert_eq!(
            kinds(":= : -> => < > .1 .2 & ;"),
            vec![
                TokenKind::Assign,
                TokenKind::Colon,
                TokenKind::ThinArrow,
                TokenKind::FatArrow,
                TokenKind::Lt,
                TokenKind::Gt,
                TokenKind::DotOne,
                TokenKind::DotTwo,
                TokenKind::Amp,
                TokenKind::Semi,
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn line_comments_are_skipped() {
        assert_eq!(
            kinds("a -- the rest is noise := ;\nb"),
            vec![
                TokenKind::Ident("a".to_string()),
                TokenKind::Ident("b".to_string()),
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn block_comments_nest() {
        assert_eq!(
            kinds("a {- one {- two -} still one -} b"),
            vec![
                TokenKind::Ident("a".to_string()),
                TokenKind::Ident("b".to_string()),
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn unclosed_comment_reports_the_opening() {
        let mut tokenizer = Tokenizer::new("a {- {- -} never closed");
        tokenizer.next_token().unwrap();
        let err = tokenizer.next_token().unwrap_err();
        match err {
            TokenError::UnclosedComment(pos) => {
                assert_eq!(pos.line, 1);
                assert_eq!(pos.col, 3);
            }
            other => panic!("expected UnclosedComment, got {other:?}"),
        }
    }

    #[test]
    fn unexpected_character_is_positioned() {
        let mut tokenizer = Tokenizer::new("ok\n  $");
        tokenizer.next_token().unwrap();
        let err = tokenizer.next_token().unwrap_err();
        match err {
            TokenError::UnexpectedChar(c, pos) => {
                assert_eq!(c, '$');
                assert_eq!(pos.line, 2);
                assert_eq!(pos.col, 3);
            }
            other => panic!("expected UnexpectedChar, got {other:?}"),
        }
    }

    #[test]
    fn eof_is_sticky_and_zero_width() {
        let mut tokenizer = Tokenizer::new("x");
        tokenizer.next_token().unwrap();
        let eof = tokenizer.next_token().unwrap();
        assert_eq!(eof.kind, TokenKind::Eof);
        assert_eq!(eof.span.start, eof.span.end);
        assert_eq!(tokenizer.next_token().unwrap().kind, TokenKind::Eof);
    }

    #[test]
    fn spans_track_lines_and_columns() {
        let mut tokenizer = Tokenizer::new("ab\n  cd");
        let a = tokenizer.next_token().unwrap();
        assert_eq!((a.span.start.line, a.span.start.col), (1, 1));
        assert_eq!((a.span.end.line, a.span.end.col), (1, 3));
        let c = tokenizer.next_token().unwrap();
        assert_eq!((c.span.start.line, c.span.start.col), (2, 3));
        assert_eq!(c.span.start.offset, 5);
    }

    #[test]
    fn lone_dash_and_brace_are_errors() {
        let mut tokenizer = Tokenizer::new("-");
        assert!(matches!(
            tokenizer.next_token(),
            Err(TokenError::UnexpectedChar('-', _))
        ));
        let mut tokenizer = Tokenizer::new("{x");
        assert!(matches!(
            tokenizer.next_token(),
            Err(TokenError::UnexpectedChar('{', _))
        ));
    }
}
