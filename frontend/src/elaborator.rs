//! Elaboration: surface terms to core terms.
//!
//! A pure fold. Grouped binders become nested single-name binders,
//! definition binders become `let`s, n-ary application becomes a left-nested
//! chain of binary applications, and the arrow/product shorthands become
//! anonymous Π and Σ. A declaration's parameters wrap its type in Π and its
//! body in λ.

use crate::surface::{Binder, Decl, PTerm, PTermKind};
use kernel::{ContextElem, Term};
use std::rc::Rc;

/// Elaborates one surface term.
pub fn elaborate(term: &PTerm) -> Rc<Term> {
    match &term.kind {
        PTermKind::Sort(s) => Term::sort(*s),
        PTermKind::Var(name) => Term::var(name.clone()),
        PTermKind::Lam(binders, body) => bind_all(binders, elaborate(body), Term::lam),
        PTermKind::Pi(binders, body) => bind_all(binders, elaborate(body), Term::pi),
        PTermKind::Sig(binders, body) => bind_all(binders, elaborate(body), Term::sig),
        PTermKind::Arrow(a, b) => Term::arrow(elaborate(a), elaborate(b)),
        PTermKind::Prod(a, b) => Term::sig("_", elaborate(a), elaborate(b)),
        PTermKind::Pair(a, b, ascription) => Rc::new(Term::Pair(
            elaborate(a),
            elaborate(b),
            ascription.as_ref().map(|ty| elaborate(ty)),
        )),
        PTermKind::Fst(t) => Term::fst(elaborate(t)),
        PTermKind::Snd(t) => Term::snd(elaborate(t)),
        PTermKind::Let {
            name,
            params,
            ty,
            val,
            body,
        } => {
            // let f (x:A) : B := d  ≡  let f : Π x:A. B := λ x:A. d
            let ty = ty
                .as_ref()
                .map(|ty| bind_all(params, elaborate(ty), Term::pi));
            let val = bind_all(params, elaborate(val), Term::lam);
            Term::let_in(name.name.clone(), ty, val, elaborate(body))
        }
        PTermKind::Apply(parts) => {
            let mut iter = parts.iter();
            let head = match iter.next() {
                Some(first) => elaborate(first),
                None => Term::var("_"),
            };
            iter.fold(head, |f, arg| Term::app(f, elaborate(arg)))
        }
    }
}

/// Right-folds a binder group over `body`. Variable binders expand one
/// nested binder per name via `make`; definition binders become `let`s on
/// every path.
fn bind_all(
    binders: &[Binder],
    body: Rc<Term>,
    make: fn(String, Rc<Term>, Rc<Term>) -> Rc<Term>,
) -> Rc<Term> {
    let mut body = body;
    for binder in binders.iter().rev() {
        match binder {
            Binder::Vars(names, ty) => {
                let ty = elaborate(ty);
                for ident in names.iter().rev() {
                    body = make(ident.name.clone(), ty.clone(), body);
                }
            }
            Binder::Def(ident, ty, val) => {
                body = Term::let_in(
                    ident.name.clone(),
                    ty.as_ref().map(elaborate),
                    elaborate(val),
                    body,
                );
            }
        }
    }
    body
}

/// Elaborates a declaration to its context element: the type is the Π over
/// all parameters, the definition (if any) the λ over the same parameters.
pub fn elaborate_decl(decl: &Decl) -> ContextElem {
    let ty = bind_all(&decl.params, elaborate(&decl.ty), Term::pi);
    match &decl.val {
        Some(val) => ContextElem::Def(
            decl.name.name.clone(),
            ty,
            bind_all(&decl.params, elaborate(val), Term::lam),
        ),
        None => ContextElem::Var(decl.name.name.clone(), ty),
    }
}
