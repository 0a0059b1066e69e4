//! Capture-avoiding substitution and α-equivalence over core terms.
//!
//! Substitution renames bound variables on the fly instead of copying terms
//! up front: a binder is only freshened when it would actually capture a free
//! variable of the substituted value.

use crate::ast::Term;
use std::collections::BTreeSet;
use std::rc::Rc;

/// Replaces free occurrences of `var` in `term` with `value`.
pub fn subst(term: &Rc<Term>, var: &str, value: &Rc<Term>) -> Rc<Term> {
    if !term.occurs_free(var) {
        return term.clone();
    }
    match &**term {
        Term::Sort(_) => term.clone(),
        Term::Var(x) => {
            if x == var {
                value.clone()
            } else {
                term.clone()
            }
        }
        Term::Lam(x, ty, body) => {
            let ty = subst(ty, var, value);
            let (x, body) = subst_under(x, body, var, value);
            Term::lam(x, ty, body)
        }
        Term::Pi(x, ty, body) => {
            let ty = subst(ty, var, value);
            let (x, body) = subst_under(x, body, var, value);
            Term::pi(x, ty, body)
        }
        Term::Sig(x, ty, body) => {
            let ty = subst(ty, var, value);
            let (x, body) = subst_under(x, body, var, value);
            Term::sig(x, ty, body)
        }
        Term::Let(x, ty, val, body) => {
            let ty = ty.as_ref().map(|t| subst(t, var, value));
            let val = subst(val, var, value);
            let (x, body) = subst_under(x, body, var, value);
            Term::let_in(x, ty, val, body)
        }
        Term::Pair(fst, snd, ascription) => Rc::new(Term::Pair(
            subst(fst, var, value),
            subst(snd, var, value),
            ascription.as_ref().map(|t| subst(t, var, value)),
        )),
        Term::Fst(pair) => Term::fst(subst(pair, var, value)),
        Term::Snd(pair) => Term::snd(subst(pair, var, value)),
        Term::App(f, a) => Term::app(subst(f, var, value), subst(a, var, value)),
    }
}

/// Substitution under a binder named `x`: stop if shadowed, freshen if the
/// binder would capture a free variable of `value`.
fn subst_under(x: &str, body: &Rc<Term>, var: &str, value: &Rc<Term>) -> (String, Rc<Term>) {
    if x == var {
        return (x.to_string(), body.clone());
    }
    if !value.occurs_free(x) {
        return (x.to_string(), subst(body, var, value));
    }
    let mut avoid = value.free_vars();
    avoid.extend(body.free_vars());
    avoid.insert(var.to_string());
    let fresh = fresh_name(x, &avoid);
    let body = subst(body, x, &Term::var(fresh.clone()));
    (fresh, subst(&body, var, value))
}

/// Derives a name not contained in `avoid` by counting up from `base`;
/// a trailing `_<digits>` suffix on the base is treated as the counter.
pub fn fresh_name(base: &str, avoid: &BTreeSet<String>) -> String {
    let (stem, start) = match base.rsplit_once('_') {
        Some((stem, digits)) if !stem.is_empty() && digits.chars().all(|c| c.is_ascii_digit()) => {
            (stem, digits.parse::<u64>().map(|n| n + 1).unwrap_or(1))
        }
        _ => (base, 1),
    };
    let mut n = start;
    loop {
        let candidate = format!("{stem}_{n}");
        if !avoid.contains(&candidate) {
            return candidate;
        }
        n += 1;
    }
}

/// Equality up to renaming of bound variables. Bound names (including `_`)
/// never matter; everything else is structural.
pub fn alpha_eq(a: &Rc<Term>, b: &Rc<Term>) -> bool {
    match (&**a, &**b) {
        (Term::Sort(s), Term::Sort(t)) => s == t,
        (Term::Var(x), Term::Var(y)) => x == y,
        (Term::App(f1, a1), Term::App(f2, a2)) => alpha_eq(f1, f2) && alpha_eq(a1, a2),
        (Term::Fst(p), Term::Fst(q)) | (Term::Snd(p), Term::Snd(q)) => alpha_eq(p, q),
        (Term::Pair(f1, s1, t1), Term::Pair(f2, s2, t2)) => {
            alpha_eq(f1, f2) && alpha_eq(s1, s2) && opt_alpha_eq(t1, t2)
        }
        (Term::Lam(x1, t1, b1), Term::Lam(x2, t2, b2))
        | (Term::Pi(x1, t1, b1), Term::Pi(x2, t2, b2))
        | (Term::Sig(x1, t1, b1), Term::Sig(x2, t2, b2)) => {
            alpha_eq(t1, t2) && bodies_alpha_eq(x1, b1, x2, b2)
        }
        (Term::Let(x1, t1, v1, b1), Term::Let(x2, t2, v2, b2)) => {
            opt_alpha_eq(t1, t2) && alpha_eq(v1, v2) && bodies_alpha_eq(x1, b1, x2, b2)
        }
        _ => false,
    }
}

fn opt_alpha_eq(a: &Option<Rc<Term>>, b: &Option<Rc<Term>>) -> bool {
    match (a, b) {
        (None, None) => true,
        (Some(a), Some(b)) => alpha_eq(a, b),
        _ => false,
    }
}

fn bodies_alpha_eq(x1: &str, b1: &Rc<Term>, x2: &str, b2: &Rc<Term>) -> bool {
    if x1 == x2 {
        return alpha_eq(b1, b2);
    }
    let mut avoid = b1.free_vars();
    avoid.extend(b2.free_vars());
    avoid.insert(x1.to_string());
    avoid.insert(x2.to_string());
    let fresh = Term::var(fresh_name(x1, &avoid));
    alpha_eq(&subst(b1, x1, &fresh), &subst(b2, x2, &fresh))
}
