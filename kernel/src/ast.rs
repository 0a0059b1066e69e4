use std::collections::BTreeSet;
use std::fmt;
use std::rc::Rc;

/// The two universes. `Prop` is the sort of propositions and itself has type
/// `Type`; `Type` is the top of the hierarchy and has no type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Sort {
    Prop,
    Type,
}

impl fmt::Display for Sort {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Sort::Prop => write!(f, "Prop"),
            Sort::Type => write!(f, "Type"),
        }
    }
}

/// The core terms of the calculus: single-variable binders, binary
/// application. Grouped binders and n-ary application exist only in the
/// surface language; the elaborator flattens them before anything here runs.
///
/// Binders carry source names (`_` for unused positions) so that errors can
/// speak the user's vocabulary; α-equivalence never distinguishes names.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Term {
    /// Universe
    Sort(Sort),
    /// Named reference, free until some binder or context entry claims it
    Var(String),
    /// λ x:A. b
    Lam(String, Rc<Term>, Rc<Term>),
    /// Π x:A. B
    Pi(String, Rc<Term>, Rc<Term>),
    /// Pair constructor for Σ, with an optional type ascription
    Pair(Rc<Term>, Rc<Term>, Option<Rc<Term>>),
    /// First projection
    Fst(Rc<Term>),
    /// Second projection
    Snd(Rc<Term>),
    /// Σ x:A. B
    Sig(String, Rc<Term>, Rc<Term>),
    /// Non-recursive let; the type annotation is optional
    Let(String, Option<Rc<Term>>, Rc<Term>, Rc<Term>),
    /// Application: f a
    App(Rc<Term>, Rc<Term>),
}

// Helper constructors for convenience
impl Term {
    pub fn sort(s: Sort) -> Rc<Self> {
        Rc::new(Term::Sort(s))
    }

    pub fn var(name: impl Into<String>) -> Rc<Self> {
        Rc::new(Term::Var(name.into()))
    }

    pub fn lam(name: impl Into<String>, ty: Rc<Term>, body: Rc<Term>) -> Rc<Self> {
        Rc::new(Term::Lam(name.into(), ty, body))
    }

    pub fn pi(name: impl Into<String>, ty: Rc<Term>, body: Rc<Term>) -> Rc<Self> {
        Rc::new(Term::Pi(name.into(), ty, body))
    }

    pub fn arrow(ty: Rc<Term>, body: Rc<Term>) -> Rc<Self> {
        Rc::new(Term::Pi("_".to_string(), ty, body))
    }

    pub fn pair(fst: Rc<Term>, snd: Rc<Term>) -> Rc<Self> {
        Rc::new(Term::Pair(fst, snd, None))
    }

    pub fn fst(pair: Rc<Term>) -> Rc<Self> {
        Rc::new(Term::Fst(pair))
    }

    pub fn snd(pair: Rc<Term>) -> Rc<Self> {
        Rc::new(Term::Snd(pair))
    }

    pub fn sig(name: impl Into<String>, ty: Rc<Term>, body: Rc<Term>) -> Rc<Self> {
        Rc::new(Term::Sig(name.into(), ty, body))
    }

    pub fn let_in(
        name: impl Into<String>,
        ty: Option<Rc<Term>>,
        val: Rc<Term>,
        body: Rc<Term>,
    ) -> Rc<Self> {
        Rc::new(Term::Let(name.into(), ty, val, body))
    }

    pub fn app(f: Rc<Term>, a: Rc<Term>) -> Rc<Self> {
        Rc::new(Term::App(f, a))
    }

    /// Does `name` occur free in this term?
    pub fn occurs_free(&self, name: &str) -> bool {
        match self {
            Term::Sort(_) => false,
            Term::Var(x) => x == name,
            Term::Lam(x, ty, body) | Term::Pi(x, ty, body) | Term::Sig(x, ty, body) => {
                ty.occurs_free(name) || (x != name && body.occurs_free(name))
            }
            Term::Pair(fst, snd, ascription) => {
                fst.occurs_free(name)
                    || snd.occurs_free(name)
                    || ascription.as_ref().is_some_and(|t| t.occurs_free(name))
            }
            Term::Fst(pair) | Term::Snd(pair) => pair.occurs_free(name),
            Term::Let(x, ty, val, body) => {
                ty.as_ref().is_some_and(|t| t.occurs_free(name))
                    || val.occurs_free(name)
                    || (x != name && body.occurs_free(name))
            }
            Term::App(f, a) => f.occurs_free(name) || a.occurs_free(name),
        }
    }

    /// The set of names occurring free in this term.
    pub fn free_vars(&self) -> BTreeSet<String> {
        let mut out = BTreeSet::new();
        self.collect_free(&mut Vec::new(), &mut out);
        out
    }

    fn collect_free(&self, bound: &mut Vec<String>, out: &mut BTreeSet<String>) {
        match self {
            Term::Sort(_) => {}
            Term::Var(x) => {
                if !bound.iter().any(|b| b == x) {
                    out.insert(x.clone());
                }
            }
            Term::Lam(x, ty, body) | Term::Pi(x, ty, body) | Term::Sig(x, ty, body) => {
                ty.collect_free(bound, out);
                bound.push(x.clone());
                body.collect_free(bound, out);
                bound.pop();
            }
            Term::Pair(fst, snd, ascription) => {
                fst.collect_free(bound, out);
                snd.collect_free(bound, out);
                if let Some(ty) = ascription {
                    ty.collect_free(bound, out);
                }
            }
            Term::Fst(pair) | Term::Snd(pair) => pair.collect_free(bound, out),
            Term::Let(x, ty, val, body) => {
                if let Some(ty) = ty {
                    ty.collect_free(bound, out);
                }
                val.collect_free(bound, out);
                bound.push(x.clone());
                body.collect_free(bound, out);
                bound.pop();
            }
            Term::App(f, a) => {
                f.collect_free(bound, out);
                a.collect_free(bound, out);
            }
        }
    }
}

// Printing precedence, weakest binding first. Binders and ascribed pairs
// print at `BINDER`; the printer inserts parentheses whenever the context
// requires something tighter, so output re-parses to the same term.
const BINDER: u8 = 0;
const ARROW: u8 = 1;
const PROD: u8 = 2;
const APP: u8 = 3;
const PROJ: u8 = 4;

impl Term {
    fn fmt_prec(&self, f: &mut fmt::Formatter<'_>, prec: u8) -> fmt::Result {
        match self {
            Term::Sort(s) => write!(f, "{s}"),
            Term::Var(x) => write!(f, "{x}"),
            Term::Lam(x, ty, body) => parens_if(f, prec > BINDER, |f| {
                write!(f, "fun {x} : ")?;
                ty.fmt_prec(f, ARROW)?;
                write!(f, " => ")?;
                body.fmt_prec(f, BINDER)
            }),
            Term::Pi(x, ty, body) => {
                if x == "_" || !body.occurs_free(x) {
                    parens_if(f, prec > ARROW, |f| {
                        ty.fmt_prec(f, PROD)?;
                        write!(f, " -> ")?;
                        body.fmt_prec(f, ARROW)
                    })
                } else {
                    parens_if(f, prec > BINDER, |f| {
                        write!(f, "forall {x} : ")?;
                        ty.fmt_prec(f, ARROW)?;
                        write!(f, ", ")?;
                        body.fmt_prec(f, BINDER)
                    })
                }
            }
            Term::Sig(x, ty, body) => {
                if x == "_" || !body.occurs_free(x) {
                    parens_if(f, prec > PROD, |f| {
                        ty.fmt_prec(f, PROD)?;
                        write!(f, " & ")?;
                        body.fmt_prec(f, APP)
                    })
                } else {
                    parens_if(f, prec > BINDER, |f| {
                        write!(f, "exist {x} : ")?;
                        ty.fmt_prec(f, ARROW)?;
                        write!(f, ", ")?;
                        body.fmt_prec(f, BINDER)
                    })
                }
            }
            Term::Pair(fst, snd, ascription) => match ascription {
                Some(ty) => parens_if(f, prec > BINDER, |f| {
                    write!(f, "<")?;
                    fst.fmt_prec(f, BINDER)?;
                    write!(f, ", ")?;
                    snd.fmt_prec(f, BINDER)?;
                    write!(f, "> : ")?;
                    ty.fmt_prec(f, ARROW)
                }),
                None => {
                    write!(f, "<")?;
                    fst.fmt_prec(f, BINDER)?;
                    write!(f, ", ")?;
                    snd.fmt_prec(f, BINDER)?;
                    write!(f, ">")
                }
            },
            Term::Fst(pair) => {
                pair.fmt_prec(f, PROJ)?;
                write!(f, ".1")
            }
            Term::Snd(pair) => {
                pair.fmt_prec(f, PROJ)?;
                write!(f, ".2")
            }
            Term::Let(x, ty, val, body) => parens_if(f, prec > BINDER, |f| {
                write!(f, "let {x}")?;
                if let Some(ty) = ty {
                    write!(f, " : ")?;
                    ty.fmt_prec(f, ARROW)?;
                }
                write!(f, " := ")?;
                val.fmt_prec(f, BINDER)?;
                write!(f, " in ")?;
                body.fmt_prec(f, BINDER)
            }),
            Term::App(func, arg) => parens_if(f, prec > APP, |f| {
                func.fmt_prec(f, APP)?;
                write!(f, " ")?;
                arg.fmt_prec(f, PROJ)
            }),
        }
    }
}

fn parens_if(
    f: &mut fmt::Formatter<'_>,
    wrap: bool,
    inner: impl FnOnce(&mut fmt::Formatter<'_>) -> fmt::Result,
) -> fmt::Result {
    if wrap {
        write!(f, "(")?;
        inner(f)?;
        write!(f, ")")
    } else {
        inner(f)
    }
}

impl fmt::Display for Term {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.fmt_prec(f, BINDER)
    }
}
