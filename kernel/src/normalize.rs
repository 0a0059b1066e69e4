//! Reduction and definitional equality.
//!
//! Two strategies compose: [`whnf`] reduces only at the head (β, ζ and
//! Σ-projection), while [`unfold_nf`] additionally expands definitions by
//! name (δ) and drives let-reduction under binders. Conversion normalizes
//! with `whnf ∘ unfold_nf` on both sides and falls back to α-equivalence,
//! with one-sided η-expansion at function types.
//!
//! Termination is only guaranteed on terms the checker accepts; there is no
//! fuel counter. Callers must not normalize arbitrary ill-typed input.

use crate::ast::Term;
use crate::checker::{ContextElem, JudgContext};
use crate::subst::{alpha_eq, fresh_name, subst};
use std::rc::Rc;

/// Weak-head normal form: β-reduces applications, projects pairs and
/// ζ-reduces lets, at the head position only.
pub fn whnf(term: &Rc<Term>) -> Rc<Term> {
    match &**term {
        Term::App(f, a) => {
            let f = whnf(f);
            match &*f {
                Term::Lam(x, _, body) => whnf(&subst(body, x, a)),
                _ => Term::app(f, a.clone()),
            }
        }
        Term::Fst(pair) => {
            let pair = whnf(pair);
            match &*pair {
                Term::Pair(fst, _, _) => whnf(fst),
                _ => Term::fst(pair),
            }
        }
        Term::Snd(pair) => {
            let pair = whnf(pair);
            match &*pair {
                Term::Pair(_, snd, _) => whnf(snd),
                _ => Term::snd(pair),
            }
        }
        Term::Let(x, _, val, body) => whnf(&subst(body, x, val)),
        _ => term.clone(),
    }
}

/// δ+ζ normal form: inlines every definition reachable by name, reduces
/// every `let`, and descends under binders. Opaque variables stay put.
pub fn unfold_nf(ctx: &JudgContext, term: &Rc<Term>) -> Rc<Term> {
    match &**term {
        Term::Sort(_) => term.clone(),
        Term::Var(x) => match ctx.lookup(x) {
            Some(ContextElem::Def(_, _, val)) => unfold_nf(ctx, val),
            _ => term.clone(),
        },
        Term::Lam(x, ty, body) => {
            let (x, ty, body) = unfold_binder(ctx, x, ty, body);
            Term::lam(x, ty, body)
        }
        Term::Pi(x, ty, body) => {
            let (x, ty, body) = unfold_binder(ctx, x, ty, body);
            Term::pi(x, ty, body)
        }
        Term::Sig(x, ty, body) => {
            let (x, ty, body) = unfold_binder(ctx, x, ty, body);
            Term::sig(x, ty, body)
        }
        Term::Let(x, _, val, body) => unfold_nf(ctx, &subst(body, x, val)),
        Term::Pair(fst, snd, ascription) => Rc::new(Term::Pair(
            unfold_nf(ctx, fst),
            unfold_nf(ctx, snd),
            ascription.as_ref().map(|t| unfold_nf(ctx, t)),
        )),
        Term::Fst(pair) => Term::fst(unfold_nf(ctx, pair)),
        Term::Snd(pair) => Term::snd(unfold_nf(ctx, pair)),
        Term::App(f, a) => Term::app(unfold_nf(ctx, f), unfold_nf(ctx, a)),
    }
}

/// Descends under one binder. The bound name shadows any context entry of
/// the same name; renaming it apart keeps a colliding definition from being
/// unfolded into the body and then captured.
fn unfold_binder(
    ctx: &JudgContext,
    x: &str,
    ty: &Rc<Term>,
    body: &Rc<Term>,
) -> (String, Rc<Term>, Rc<Term>) {
    let ty = unfold_nf(ctx, ty);
    let (x, body) = if ctx.contains(x) {
        let mut avoid = ctx.names();
        avoid.extend(body.free_vars());
        let fresh = fresh_name(x, &avoid);
        let body = subst(body, x, &Term::var(fresh.clone()));
        (fresh, body)
    } else {
        (x.to_string(), body.clone())
    };
    let inner = ctx.with_local(ContextElem::Var(x.clone(), ty.clone()));
    let body = unfold_nf(&inner, &body);
    (x, ty, body)
}

/// `whnf ∘ unfold_nf`: the normal form conversion and the checker compare
/// shapes against.
pub fn normalize(ctx: &JudgContext, term: &Rc<Term>) -> Rc<Term> {
    whnf(&unfold_nf(ctx, term))
}

/// Definitional equality: normalize both sides, η-expand when exactly one
/// side is a λ, otherwise compare up to α.
pub fn is_def_eq(ctx: &JudgContext, a: &Rc<Term>, b: &Rc<Term>) -> bool {
    let a = normalize(ctx, a);
    let b = normalize(ctx, b);
    match (&*a, &*b) {
        (Term::Lam(..), Term::Lam(..)) => alpha_eq(&a, &b),
        (Term::Lam(x, ty, body), _) => eta_expand_eq(ctx, x, ty, body, &b),
        (_, Term::Lam(x, ty, body)) => eta_expand_eq(ctx, x, ty, body, &a),
        _ => alpha_eq(&a, &b),
    }
}

/// Compares `λ x:ty. body` against a non-λ `other` by checking
/// `body = other x` under the context extended with `x : ty`.
fn eta_expand_eq(
    ctx: &JudgContext,
    x: &str,
    ty: &Rc<Term>,
    body: &Rc<Term>,
    other: &Rc<Term>,
) -> bool {
    let mut avoid = ctx.names();
    avoid.extend(body.free_vars());
    avoid.extend(other.free_vars());
    let fresh = fresh_name(x, &avoid);
    let var = Term::var(fresh.clone());
    let body = subst(body, x, &var);
    let inner = ctx.with_local(ContextElem::Var(fresh, ty.clone()));
    is_def_eq(&inner, &body, &Term::app(other.clone(), var))
}
