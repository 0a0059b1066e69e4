use kernel::Sort;
use std::fmt;

/// Source position: byte offset plus 1-based line and column.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pos {
    pub offset: usize,
    pub line: u32,
    pub col: u32,
}

impl Pos {
    pub fn start() -> Self {
        Pos {
            offset: 0,
            line: 1,
            col: 1,
        }
    }
}

impl fmt::Display for Pos {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.line, self.col)
    }
}

/// Half-open source range, attached to every surface node for diagnostics.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Span {
    pub start: Pos,
    pub end: Pos,
}

impl Span {
    pub fn new(start: Pos, end: Pos) -> Self {
        Span { start, end }
    }

    /// The smallest span covering both `self` and `other`.
    pub fn join(self, other: Span) -> Span {
        Span {
            start: if self.start.offset <= other.start.offset {
                self.start
            } else {
                other.start
            },
            end: if self.end.offset >= other.end.offset {
                self.end
            } else {
                other.end
            },
        }
    }
}

impl fmt::Display for Span {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.start)
    }
}

/// A name together with the range it was written at.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Ident {
    pub name: String,
    pub span: Span,
}

/// Surface terms as written, before elaboration: grouped binders, n-ary
/// application, the arrow and product shorthands.
#[derive(Debug, Clone, PartialEq)]
pub struct PTerm {
    pub kind: PTermKind,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub enum PTermKind {
    /// `Prop` or `Type`
    Sort(Sort),
    /// A free reference
    Var(String),
    /// `fun B₁ B₂ … => body`
    Lam(Vec<Binder>, Box<PTerm>),
    /// `forall B₁ B₂ …, body`
    Pi(Vec<Binder>, Box<PTerm>),
    /// Non-dependent `a -> b`
    Arrow(Box<PTerm>, Box<PTerm>),
    /// `<a, b>`, optionally `<a, b> : T`
    Pair(Box<PTerm>, Box<PTerm>, Option<Box<PTerm>>),
    /// `p.1`
    Fst(Box<PTerm>),
    /// `p.2`
    Snd(Box<PTerm>),
    /// `exist B₁ B₂ …, body`
    Sig(Vec<Binder>, Box<PTerm>),
    /// Non-dependent `a & b`
    Prod(Box<PTerm>, Box<PTerm>),
    /// `let f B₁ … : T := d in body`
    Let {
        name: Ident,
        params: Vec<Binder>,
        ty: Option<Box<PTerm>>,
        val: Box<PTerm>,
        body: Box<PTerm>,
    },
    /// Juxtaposition of two or more terms
    Apply(Vec<PTerm>),
}

/// One parenthesized (or leading open) binder group.
#[derive(Debug, Clone, PartialEq)]
pub enum Binder {
    /// `(x₁ x₂ … : T)` — several names sharing one type
    Vars(Vec<Ident>, PTerm),
    /// `(x : T := v)` / `(x := v)` — a local definition
    Def(Ident, Option<PTerm>, PTerm),
}

/// A global declaration. `val` is `None` for `var` declarations and present
/// for `def` declarations.
#[derive(Debug, Clone, PartialEq)]
pub struct Decl {
    pub name: Ident,
    pub params: Vec<Binder>,
    pub ty: PTerm,
    pub val: Option<PTerm>,
    pub span: Span,
}

/// One bound name of a declaration's parameter list, flattened out of its
/// binder group; the scope checker works on these.
#[derive(Debug, Clone, Copy)]
pub struct ParamElem<'a> {
    pub ident: &'a Ident,
    pub ty: Option<&'a PTerm>,
    pub val: Option<&'a PTerm>,
}

impl Decl {
    /// The parameter list with one entry per bound name, left to right.
    pub fn param_elems(&self) -> Vec<ParamElem<'_>> {
        let mut out = Vec::new();
        for binder in &self.params {
            match binder {
                Binder::Vars(names, ty) => {
                    for ident in names {
                        out.push(ParamElem {
                            ident,
                            ty: Some(ty),
                            val: None,
                        });
                    }
                }
                Binder::Def(ident, ty, val) => out.push(ParamElem {
                    ident,
                    ty: ty.as_ref(),
                    val: Some(val),
                }),
            }
        }
        out
    }
}

/// A parsed source file: the ordered list of global declarations.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Program {
    pub decls: Vec<Decl>,
}
