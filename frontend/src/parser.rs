//! Recursive-descent parser with one token of lookahead.
//!
//! Precedence, weakest first: quantifiers and `let`, then `->`
//! (right-associative), then `&` (left-associative), then application, then
//! projection, then atoms. Every node's span runs from its first to its last
//! consumed token.
//!
//! The parser keeps a debug trace of entered productions. The trace is for
//! presentation only; no parse result depends on it.

use crate::surface::{Binder, Decl, Ident, PTerm, PTermKind, Pos, Program, Span};
use crate::token::{Token, TokenError, TokenKind, Tokenizer};
use kernel::Sort;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ParseError {
    #[error(transparent)]
    Token(#[from] TokenError),
    #[error("expected {expected}, found {found}")]
    UnexpectedToken { expected: &'static str, found: Token },
}

impl ParseError {
    pub fn span(&self) -> Span {
        match self {
            ParseError::Token(err) => Span::new(err.pos(), err.pos()),
            ParseError::UnexpectedToken { found, .. } => found.span,
        }
    }
}

/// One node of the parser's debug trace: a production, whether it
/// succeeded, the range it covered, and its sub-productions.
#[derive(Debug, Clone)]
pub struct TraceNode {
    pub production: &'static str,
    pub ok: bool,
    pub span: Span,
    pub children: Vec<TraceNode>,
}

impl TraceNode {
    pub fn render(&self) -> String {
        let mut out = String::new();
        self.render_into(&mut out, 0);
        out
    }

    fn render_into(&self, out: &mut String, depth: usize) {
        let status = if self.ok { "ok" } else { "error" };
        out.push_str(&format!(
            "{:indent$}{} [{} @ {}..{}]\n",
            "",
            self.production,
            status,
            self.span.start,
            self.span.end,
            indent = depth * 2
        ));
        for child in &self.children {
            child.render_into(out, depth + 1);
        }
    }
}

#[derive(Default)]
struct Trace {
    stack: Vec<(&'static str, Pos, Vec<TraceNode>)>,
    roots: Vec<TraceNode>,
}

impl Trace {
    fn enter(&mut self, production: &'static str, start: Pos) {
        self.stack.push((production, start, Vec::new()));
    }

    fn exit(&mut self, ok: bool, end: Pos) {
        if let Some((production, start, children)) = self.stack.pop() {
            let end = if end.offset < start.offset { start } else { end };
            let node = TraceNode {
                production,
                ok,
                span: Span::new(start, end),
                children,
            };
            match self.stack.last_mut() {
                Some((_, _, siblings)) => siblings.push(node),
                None => self.roots.push(node),
            }
        }
    }
}

pub struct Parser<'a> {
    tokens: Tokenizer<'a>,
    peeked: Option<Result<Token, TokenError>>,
    last_span: Span,
    trace: Trace,
}

impl<'a> Parser<'a> {
    pub fn new(source: &'a str) -> Self {
        Parser {
            tokens: Tokenizer::new(source),
            peeked: None,
            last_span: Span::new(Pos::start(), Pos::start()),
            trace: Trace::default(),
        }
    }

    /// The debug trace accumulated so far; complete once parsing returned.
    pub fn into_trace(self) -> Vec<TraceNode> {
        self.trace.roots
    }

    fn peek(&mut self) -> Result<&Token, ParseError> {
        let entry = match self.peeked.take() {
            Some(entry) => entry,
            None => self.tokens.next_token(),
        };
        match self.peeked.insert(entry) {
            Ok(token) => Ok(&*token),
            Err(err) => Err(err.clone().into()),
        }
    }

    fn bump(&mut self) -> Result<Token, ParseError> {
        let token = match self.peeked.take() {
            Some(entry) => entry?,
            None => self.tokens.next_token()?,
        };
        self.last_span = token.span;
        Ok(token)
    }

    fn expect(&mut self, kind: TokenKind, expected: &'static str) -> Result<Token, ParseError> {
        if self.peek()?.kind == kind {
            self.bump()
        } else {
            Err(ParseError::UnexpectedToken {
                expected,
                found: self.peek()?.clone(),
            })
        }
    }

    fn expect_ident(&mut self) -> Result<Ident, ParseError> {
        match &self.peek()?.kind {
            TokenKind::Ident(_) => {
                let token = self.bump()?;
                match token.kind {
                    TokenKind::Ident(name) => Ok(Ident {
                        name,
                        span: token.span,
                    }),
                    _ => Err(ParseError::UnexpectedToken {
                        expected: "an identifier",
                        found: token,
                    }),
                }
            }
            _ => Err(ParseError::UnexpectedToken {
                expected: "an identifier",
                found: self.peek()?.clone(),
            }),
        }
    }

    fn at_ident(&mut self) -> Result<bool, ParseError> {
        Ok(matches!(self.peek()?.kind, TokenKind::Ident(_)))
    }

    fn traced<T>(
        &mut self,
        production: &'static str,
        f: impl FnOnce(&mut Self) -> Result<T, ParseError>,
    ) -> Result<T, ParseError> {
        let start = match self.peek() {
            Ok(token) => token.span.start,
            Err(_) => self.last_span.end,
        };
        self.trace.enter(production, start);
        let result = f(self);
        let end = self.last_span.end;
        self.trace.exit(result.is_ok(), end);
        result
    }

    /// Program ::= Decl* EOF
    pub fn parse_program(&mut self) -> Result<Program, ParseError> {
        let mut decls = Vec::new();
        while self.peek()?.kind != TokenKind::Eof {
            decls.push(self.parse_decl()?);
        }
        Ok(Program { decls })
    }

    /// Decl ::= ("def" | "var")? IDENT ClosedBinder* ":" Term (":=" Term)? ";"
    ///
    /// `def` (and the bare form) requires the `:=` clause; `var` forbids it.
    fn parse_decl(&mut self) -> Result<Decl, ParseError> {
        self.traced("decl", |p| {
            let start = p.peek()?.span;
            let is_var = match p.peek()?.kind {
                TokenKind::Def => {
                    p.bump()?;
                    false
                }
                TokenKind::Var => {
                    p.bump()?;
                    true
                }
                _ => false,
            };
            let name = p.expect_ident()?;
            let mut params = Vec::new();
            while p.peek()?.kind == TokenKind::LParen {
                params.push(p.parse_closed_binder()?);
            }
            p.expect(TokenKind::Colon, "`:`")?;
            let ty = p.parse_term()?;
            let val = if is_var {
                None
            } else {
                p.expect(TokenKind::Assign, "`:=`")?;
                Some(p.parse_term()?)
            };
            let semi = p.expect(TokenKind::Semi, "`;`")?;
            Ok(Decl {
                name,
                params,
                ty,
                val,
                span: start.join(semi.span),
            })
        })
    }

    /// Term ::= "fun" Binder+ "=>" Term | "forall" Binder+ "," Term
    ///        | "exist" Binder+ "," Term
    ///        | "let" IDENT ClosedBinder* (":" Term)? ":=" Term "in" Term
    ///        | Arrow
    pub fn parse_term(&mut self) -> Result<PTerm, ParseError> {
        self.traced("term", |p| {
            let start = p.peek()?.span;
            match p.peek()?.kind {
                TokenKind::Fun => {
                    p.bump()?;
                    let binders = p.parse_binders()?;
                    p.expect(TokenKind::FatArrow, "`=>`")?;
                    let body = p.parse_term()?;
                    let span = start.join(p.last_span);
                    Ok(PTerm {
                        kind: PTermKind::Lam(binders, Box::new(body)),
                        span,
                    })
                }
                TokenKind::Forall => {
                    p.bump()?;
                    let binders = p.parse_binders()?;
                    p.expect(TokenKind::Comma, "`,`")?;
                    let body = p.parse_term()?;
                    let span = start.join(p.last_span);
                    Ok(PTerm {
                        kind: PTermKind::Pi(binders, Box::new(body)),
                        span,
                    })
                }
                TokenKind::Exist => {
                    p.bump()?;
                    let binders = p.parse_binders()?;
                    p.expect(TokenKind::Comma, "`,`")?;
                    let body = p.parse_term()?;
                    let span = start.join(p.last_span);
                    Ok(PTerm {
                        kind: PTermKind::Sig(binders, Box::new(body)),
                        span,
                    })
                }
                TokenKind::Let => {
                    p.bump()?;
                    let name = p.expect_ident()?;
                    let mut binder_params = Vec::new();
                    while p.peek()?.kind == TokenKind::LParen {
                        binder_params.push(p.parse_closed_binder()?);
                    }
                    let ty = if p.peek()?.kind == TokenKind::Colon {
                        p.bump()?;
                        Some(Box::new(p.parse_term()?))
                    } else {
                        None
                    };
                    p.expect(TokenKind::Assign, "`:=`")?;
                    let val = p.parse_term()?;
                    p.expect(TokenKind::In, "keyword `in`")?;
                    let body = p.parse_term()?;
                    let span = start.join(p.last_span);
                    Ok(PTerm {
                        kind: PTermKind::Let {
                            name,
                            params: binder_params,
                            ty,
                            val: Box::new(val),
                            body: Box::new(body),
                        },
                        span,
                    })
                }
                _ => p.parse_arrow(),
            }
        })
    }

    /// Binder+ — an open binder may only come first; every further binder
    /// is parenthesized.
    fn parse_binders(&mut self) -> Result<Vec<Binder>, ParseError> {
        let mut binders = Vec::new();
        if self.at_ident()? {
            let mut names = vec![self.expect_ident()?];
            while self.at_ident()? {
                names.push(self.expect_ident()?);
            }
            self.expect(TokenKind::Colon, "`:`")?;
            let ty = self.parse_term()?;
            binders.push(Binder::Vars(names, ty));
        }
        while self.peek()?.kind == TokenKind::LParen {
            binders.push(self.parse_closed_binder()?);
        }
        if binders.is_empty() {
            return Err(ParseError::UnexpectedToken {
                expected: "a binder",
                found: self.peek()?.clone(),
            });
        }
        Ok(binders)
    }

    /// ClosedBinder ::= "(" IDENT+ ":" Term ")"
    ///                | "(" IDENT ":" Term ":=" Term ")"
    ///                | "(" IDENT ":=" Term ")"
    fn parse_closed_binder(&mut self) -> Result<Binder, ParseError> {
        self.traced("binder", |p| {
            p.expect(TokenKind::LParen, "`(`")?;
            let mut names = vec![p.expect_ident()?];
            while p.at_ident()? {
                names.push(p.expect_ident()?);
            }
            let binder = if p.peek()?.kind == TokenKind::Assign && names.len() == 1 {
                p.bump()?;
                let val = p.parse_term()?;
                Binder::Def(names.remove(0), None, val)
            } else {
                p.expect(TokenKind::Colon, "`:`")?;
                let ty = p.parse_term()?;
                if p.peek()?.kind == TokenKind::Assign {
                    if names.len() != 1 {
                        // A definition binder binds exactly one name.
                        return Err(ParseError::UnexpectedToken {
                            expected: "`)`",
                            found: p.peek()?.clone(),
                        });
                    }
                    p.bump()?;
                    let val = p.parse_term()?;
                    Binder::Def(names.remove(0), Some(ty), val)
                } else {
                    Binder::Vars(names, ty)
                }
            };
            p.expect(TokenKind::RParen, "`)`")?;
            Ok(binder)
        })
    }

    /// Arrow ::= Prod ("->" Term)? — right-associative.
    fn parse_arrow(&mut self) -> Result<PTerm, ParseError> {
        self.traced("arrow", |p| {
            let lhs = p.parse_prod()?;
            if p.peek()?.kind == TokenKind::ThinArrow {
                p.bump()?;
                let rhs = p.parse_term()?;
                let span = lhs.span.join(rhs.span);
                Ok(PTerm {
                    kind: PTermKind::Arrow(Box::new(lhs), Box::new(rhs)),
                    span,
                })
            } else {
                Ok(lhs)
            }
        })
    }

    /// Prod ::= App ("&" App)* — left-associative.
    fn parse_prod(&mut self) -> Result<PTerm, ParseError> {
        self.traced("prod", |p| {
            let mut lhs = p.parse_app()?;
            while p.peek()?.kind == TokenKind::Amp {
                p.bump()?;
                let rhs = p.parse_app()?;
                let span = lhs.span.join(rhs.span);
                lhs = PTerm {
                    kind: PTermKind::Prod(Box::new(lhs), Box::new(rhs)),
                    span,
                };
            }
            Ok(lhs)
        })
    }

    /// App ::= Proj Proj* — left-associative juxtaposition.
    fn parse_app(&mut self) -> Result<PTerm, ParseError> {
        self.traced("app", |p| {
            let head = p.parse_proj()?;
            let mut args = Vec::new();
            while p.starts_atom()? {
                args.push(p.parse_proj()?);
            }
            if args.is_empty() {
                return Ok(head);
            }
            let mut parts = Vec::with_capacity(args.len() + 1);
            parts.push(head);
            parts.extend(args);
            let span = parts
                .iter()
                .skip(1)
                .fold(parts[0].span, |acc, part| acc.join(part.span));
            Ok(PTerm {
                kind: PTermKind::Apply(parts),
                span,
            })
        })
    }

    fn starts_atom(&mut self) -> Result<bool, ParseError> {
        Ok(matches!(
            self.peek()?.kind,
            TokenKind::Prop
                | TokenKind::Type
                | TokenKind::Ident(_)
                | TokenKind::LParen
                | TokenKind::Lt
        ))
    }

    /// Proj ::= Atom (".1" | ".2")*
    fn parse_proj(&mut self) -> Result<PTerm, ParseError> {
        let mut term = self.parse_atom()?;
        loop {
            match self.peek()?.kind {
                TokenKind::DotOne => {
                    self.bump()?;
                    let span = term.span.join(self.last_span);
                    term = PTerm {
                        kind: PTermKind::Fst(Box::new(term)),
                        span,
                    };
                }
                TokenKind::DotTwo => {
                    self.bump()?;
                    let span = term.span.join(self.last_span);
                    term = PTerm {
                        kind: PTermKind::Snd(Box::new(term)),
                        span,
                    };
                }
                _ => return Ok(term),
            }
        }
    }

    /// Atom ::= "Prop" | "Type" | IDENT | "(" Term ")"
    ///        | "<" Term "," Term ">" (":" Term)?
    fn parse_atom(&mut self) -> Result<PTerm, ParseError> {
        self.traced("atom", |p| {
            let token = p.peek()?.clone();
            match token.kind {
                TokenKind::Prop => {
                    p.bump()?;
                    Ok(PTerm {
                        kind: PTermKind::Sort(Sort::Prop),
                        span: token.span,
                    })
                }
                TokenKind::Type => {
                    p.bump()?;
                    Ok(PTerm {
                        kind: PTermKind::Sort(Sort::Type),
                        span: token.span,
                    })
                }
                TokenKind::Ident(name) => {
                    p.bump()?;
                    Ok(PTerm {
                        kind: PTermKind::Var(name),
                        span: token.span,
                    })
                }
                TokenKind::LParen => {
                    p.bump()?;
                    let inner = p.parse_term()?;
                    let close = p.expect(TokenKind::RParen, "`)`")?;
                    Ok(PTerm {
                        kind: inner.kind,
                        span: token.span.join(close.span),
                    })
                }
                TokenKind::Lt => {
                    p.bump()?;
                    let fst = p.parse_term()?;
                    p.expect(TokenKind::Comma, "`,`")?;
                    let snd = p.parse_term()?;
                    p.expect(TokenKind::Gt, "`>`")?;
                    let ascription = if p.peek()?.kind == TokenKind::Colon {
                        p.bump()?;
                        Some(Box::new(p.parse_term()?))
                    } else {
                        None
                    };
                    let span = token.span.join(p.last_span);
                    Ok(PTerm {
                        kind: PTermKind::Pair(Box::new(fst), Box::new(snd), ascription),
                        span,
                    })
                }
                _ => Err(ParseError::UnexpectedToken {
                    expected: "a term",
                    found: token,
                }),
            }
        })
    }
}
