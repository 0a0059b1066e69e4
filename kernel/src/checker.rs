//! Bidirectional type checker over a judgment context.
//!
//! `infer` synthesizes a type, `check` verifies against an expected one;
//! `check_context` validates a whole global context front to back. All
//! failures are structured [`TypeError`] values; the first error aborts.

use crate::ast::{Sort, Term};
use crate::normalize::{is_def_eq, normalize};
use crate::subst::subst;
use std::collections::BTreeSet;
use std::fmt;
use std::rc::Rc;
use thiserror::Error;

/// One entry of a judgment context: an opaque variable or a transparent
/// definition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ContextElem {
    Var(String, Rc<Term>),
    Def(String, Rc<Term>, Rc<Term>),
}

impl ContextElem {
    pub fn name(&self) -> &str {
        match self {
            ContextElem::Var(name, _) | ContextElem::Def(name, _, _) => name,
        }
    }

    pub fn ty(&self) -> &Rc<Term> {
        match self {
            ContextElem::Var(_, ty) | ContextElem::Def(_, ty, _) => ty,
        }
    }
}

impl fmt::Display for ContextElem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ContextElem::Var(name, ty) => write!(f, "{name} : {ty}"),
            ContextElem::Def(name, ty, val) => write!(f, "{name} : {ty} := {val}"),
        }
    }
}

/// Ordered globals plus ordered locals; lookups prefer locals and, within a
/// list, the rightmost entry. Extension clones, so callers can treat every
/// context as immutable.
#[derive(Debug, Clone, Default)]
pub struct JudgContext {
    globals: Vec<ContextElem>,
    locals: Vec<ContextElem>,
}

impl JudgContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn lookup(&self, name: &str) -> Option<&ContextElem> {
        self.locals
            .iter()
            .rev()
            .chain(self.globals.iter().rev())
            .find(|elem| elem.name() == name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.lookup(name).is_some()
    }

    pub fn with_local(&self, elem: ContextElem) -> Self {
        let mut extended = self.clone();
        extended.locals.push(elem);
        extended
    }

    pub fn push_global(&mut self, elem: ContextElem) {
        self.globals.push(elem);
    }

    pub fn globals(&self) -> &[ContextElem] {
        &self.globals
    }

    pub fn locals(&self) -> &[ContextElem] {
        &self.locals
    }

    /// Every name bound by the context, used to steer fresh-name choices.
    pub fn names(&self) -> BTreeSet<String> {
        self.globals
            .iter()
            .chain(self.locals.iter())
            .map(|elem| elem.name().to_string())
            .collect()
    }
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum TypeError {
    #[error("`Type` has no type")]
    TypeHasNoType,
    #[error("unbound variable `{0}`")]
    UnboundVariable(String),
    #[error("expected a sort, got `{0}`")]
    ExpectedSort(Rc<Term>),
    #[error("`{fun}` is applied to an argument, but its type `{actual}` is not a function type")]
    ExpectedPi { fun: Rc<Term>, actual: Rc<Term> },
    #[error("`{pair}` is projected, but its type `{actual}` is not a pair type")]
    ExpectedSigma { pair: Rc<Term>, actual: Rc<Term> },
    #[error("a pair type cannot combine the sorts ({0}, {1})")]
    ImpossibleCombination(Sort, Sort),
    #[error("type mismatch:\n expected: {expected}\n      got: {actual}")]
    TypeMismatch { expected: Rc<Term>, actual: Rc<Term> },
}

/// A [`TypeError`] with the context element it occurred in.
#[derive(Error, Debug, Clone, PartialEq)]
#[error("{error}, while checking `{}`", .at.name())]
pub struct WFError {
    pub error: TypeError,
    pub at: ContextElem,
}

/// Synthesizes the type of `term`.
pub fn infer(ctx: &JudgContext, term: &Rc<Term>) -> Result<Rc<Term>, TypeError> {
    match &**term {
        Term::Sort(Sort::Prop) => Ok(Term::sort(Sort::Type)),
        Term::Sort(Sort::Type) => Err(TypeError::TypeHasNoType),
        Term::Var(x) => match ctx.lookup(x) {
            Some(elem) => Ok(elem.ty().clone()),
            None => Err(TypeError::UnboundVariable(x.clone())),
        },
        Term::Lam(x, ty, body) => {
            let inner = ctx.with_local(ContextElem::Var(x.clone(), ty.clone()));
            let body_ty = infer(&inner, body)?;
            let pi = Term::pi(x.clone(), ty.clone(), body_ty);
            infer_sort(ctx, &pi)?;
            Ok(pi)
        }
        Term::Pi(x, ty, body) => {
            infer_sort(ctx, ty)?;
            let inner = ctx.with_local(ContextElem::Var(x.clone(), ty.clone()));
            let codomain = infer_sort(&inner, body)?;
            Ok(Term::sort(codomain))
        }
        Term::Sig(x, ty, body) => {
            let first = infer_sort(ctx, ty)?;
            let inner = ctx.with_local(ContextElem::Var(x.clone(), ty.clone()));
            let second = infer_sort(&inner, body)?;
            match (first, second) {
                (Sort::Prop, Sort::Prop) | (_, Sort::Type) => Ok(Term::sort(second)),
                _ => Err(TypeError::ImpossibleCombination(first, second)),
            }
        }
        Term::Pair(_, _, Some(ascription)) => {
            check(ctx, term, ascription)?;
            Ok(ascription.clone())
        }
        Term::Pair(fst, snd, None) => {
            let fst_ty = infer(ctx, fst)?;
            let snd_ty = infer(ctx, snd)?;
            Ok(Term::sig("_", fst_ty, snd_ty))
        }
        Term::Fst(pair) => {
            let pair_ty = infer(ctx, pair)?;
            match &*normalize(ctx, &pair_ty) {
                Term::Sig(_, ty, _) => Ok(ty.clone()),
                _ => Err(TypeError::ExpectedSigma {
                    pair: pair.clone(),
                    actual: pair_ty,
                }),
            }
        }
        Term::Snd(pair) => {
            let pair_ty = infer(ctx, pair)?;
            match &*normalize(ctx, &pair_ty) {
                Term::Sig(x, _, body) => Ok(subst(body, x, &Term::fst(pair.clone()))),
                _ => Err(TypeError::ExpectedSigma {
                    pair: pair.clone(),
                    actual: pair_ty,
                }),
            }
        }
        Term::Let(x, ty, val, body) => {
            let ty = match ty {
                Some(ty) => {
                    check(ctx, val, ty)?;
                    ty.clone()
                }
                None => infer(ctx, val)?,
            };
            let inner = ctx.with_local(ContextElem::Def(x.clone(), ty, val.clone()));
            let body_ty = infer(&inner, body)?;
            Ok(subst(&body_ty, x, val))
        }
        Term::App(f, a) => {
            let f_ty = infer(ctx, f)?;
            let (x, param_ty, ret_ty) = match &*normalize(ctx, &f_ty) {
                Term::Pi(x, ty, body) => (x.clone(), ty.clone(), body.clone()),
                _ => {
                    return Err(TypeError::ExpectedPi {
                        fun: f.clone(),
                        actual: f_ty,
                    })
                }
            };
            let arg_ty = infer(ctx, a)?;
            if !is_def_eq(ctx, &arg_ty, &param_ty) {
                return Err(TypeError::TypeMismatch {
                    expected: param_ty,
                    actual: arg_ty,
                });
            }
            Ok(subst(&ret_ty, &x, a))
        }
    }
}

/// Verifies that `term` has type `expected`.
///
/// Pairs get a checking rule of their own so that the second component may
/// depend on the first; everything else goes through inference plus
/// conversion.
pub fn check(ctx: &JudgContext, term: &Rc<Term>, expected: &Rc<Term>) -> Result<(), TypeError> {
    if let Term::Pair(fst, snd, _) = &**term {
        if let Term::Sig(x, ty, body) = &*normalize(ctx, expected) {
            check(ctx, fst, ty)?;
            let snd_ty = subst(body, x, fst);
            check(ctx, snd, &snd_ty)?;
            infer_sort(ctx, &snd_ty)?;
            return Ok(());
        }
        // Not a Σ: report the mismatch with the pair's structural type.
        let fst_ty = infer(ctx, fst)?;
        let snd_ty = infer(ctx, snd)?;
        return Err(TypeError::TypeMismatch {
            expected: expected.clone(),
            actual: Term::sig("_", fst_ty, snd_ty),
        });
    }
    let actual = infer(ctx, term)?;
    if is_def_eq(ctx, &actual, expected) {
        Ok(())
    } else {
        Err(TypeError::TypeMismatch {
            expected: expected.clone(),
            actual,
        })
    }
}

/// Infers the type of `term` and requires it to normalize to a sort.
pub fn infer_sort(ctx: &JudgContext, term: &Rc<Term>) -> Result<Sort, TypeError> {
    let ty = infer(ctx, term)?;
    match &*normalize(ctx, &ty) {
        Term::Sort(s) => Ok(*s),
        _ => Err(TypeError::ExpectedSort(ty)),
    }
}

/// Checks a global context front to back: a variable's type must be a type,
/// a definition's body must check against its declared type. Each validated
/// element joins the context seen by the ones after it.
pub fn check_context(
    elems: impl IntoIterator<Item = ContextElem>,
) -> Result<JudgContext, WFError> {
    let mut ctx = JudgContext::new();
    for elem in elems {
        let result = match &elem {
            ContextElem::Var(_, ty) => infer_sort(&ctx, ty).map(|_| ()),
            ContextElem::Def(_, ty, val) => check(&ctx, val, ty),
        };
        if let Err(error) = result {
            return Err(WFError { error, at: elem });
        }
        ctx.push_global(elem);
    }
    Ok(ctx)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::subst::alpha_eq;

    fn prop() -> Rc<Term> {
        Term::sort(Sort::Prop)
    }

    #[test]
    fn prop_has_type_type() {
        let ctx = JudgContext::new();
        assert_eq!(*infer(&ctx, &prop()).unwrap(), Term::Sort(Sort::Type));
    }

    #[test]
    fn type_has_no_type() {
        let ctx = JudgContext::new();
        assert_eq!(
            infer(&ctx, &Term::sort(Sort::Type)),
            Err(TypeError::TypeHasNoType)
        );
    }

    #[test]
    fn unbound_variable_is_reported() {
        let ctx = JudgContext::new();
        assert_eq!(
            infer(&ctx, &Term::var("ghost")),
            Err(TypeError::UnboundVariable("ghost".to_string()))
        );
    }

    #[test]
    fn lambda_infers_a_pi() {
        // fun A : Prop => fun x : A => x   :   forall A : Prop, A -> A
        let ctx = JudgContext::new();
        let id = Term::lam(
            "A",
            prop(),
            Term::lam("x", Term::var("A"), Term::var("x")),
        );
        let ty = infer(&ctx, &id).unwrap();
        let expected = Term::pi("A", prop(), Term::arrow(Term::var("A"), Term::var("A")));
        assert!(alpha_eq(&ty, &expected));
    }

    #[test]
    fn pi_into_prop_is_impredicative() {
        // forall p : Prop, p   :   Prop
        let ctx = JudgContext::new();
        let t = Term::pi("p", prop(), Term::var("p"));
        assert_eq!(*infer(&ctx, &t).unwrap(), Term::Sort(Sort::Prop));
    }

    #[test]
    fn pi_over_prop_lands_in_type() {
        // Prop -> Prop : Type
        let ctx = JudgContext::new();
        let t = Term::arrow(prop(), prop());
        assert_eq!(*infer(&ctx, &t).unwrap(), Term::Sort(Sort::Type));
    }

    #[test]
    fn sigma_sort_rule() {
        let ctx = JudgContext::new();
        let a = ContextElem::Var("A".to_string(), prop());
        let ctx = {
            let mut c = ctx;
            c.push_global(a);
            c
        };

        // A & A : Prop      (Prop, Prop)
        let prop_pair = Term::sig("_", Term::var("A"), Term::var("A"));
        assert_eq!(*infer(&ctx, &prop_pair).unwrap(), Term::Sort(Sort::Prop));

        // A & Prop : Type   (Prop, Type)
        let mixed = Term::sig("_", Term::var("A"), prop());
        assert_eq!(*infer(&ctx, &mixed).unwrap(), Term::Sort(Sort::Type));

        // Prop & A  is rejected   (Type, Prop)
        let bad = Term::sig("_", prop(), Term::var("A"));
        assert_eq!(
            infer(&ctx, &bad),
            Err(TypeError::ImpossibleCombination(Sort::Type, Sort::Prop))
        );
    }

    #[test]
    fn application_substitutes_the_argument() {
        // (fun A : Prop => fun x : A => x) B : B -> B
        let mut ctx = JudgContext::new();
        ctx.push_global(ContextElem::Var("B".to_string(), prop()));
        let id = Term::lam(
            "A",
            prop(),
            Term::lam("x", Term::var("A"), Term::var("x")),
        );
        let ty = infer(&ctx, &Term::app(id, Term::var("B"))).unwrap();
        assert!(alpha_eq(&ty, &Term::arrow(Term::var("B"), Term::var("B"))));
    }

    #[test]
    fn application_to_non_function_fails() {
        let mut ctx = JudgContext::new();
        ctx.push_global(ContextElem::Var("A".to_string(), prop()));
        ctx.push_global(ContextElem::Var("a".to_string(), Term::var("A")));
        let err = infer(&ctx, &Term::app(Term::var("a"), Term::var("a"))).unwrap_err();
        assert!(matches!(err, TypeError::ExpectedPi { .. }));
    }

    #[test]
    fn argument_type_mismatch_fails() {
        let mut ctx = JudgContext::new();
        ctx.push_global(ContextElem::Var("A".to_string(), prop()));
        ctx.push_global(ContextElem::Var("B".to_string(), prop()));
        ctx.push_global(ContextElem::Var(
            "f".to_string(),
            Term::arrow(Term::var("A"), Term::var("A")),
        ));
        ctx.push_global(ContextElem::Var("b".to_string(), Term::var("B")));
        let err = infer(&ctx, &Term::app(Term::var("f"), Term::var("b"))).unwrap_err();
        assert!(matches!(err, TypeError::TypeMismatch { .. }));
    }

    #[test]
    fn projections_on_a_dependent_pair() {
        // p : exist x : Prop, x    ⊢   p.1 : Prop,  p.2 : p.1
        let mut ctx = JudgContext::new();
        ctx.push_global(ContextElem::Var(
            "p".to_string(),
            Term::sig("x", prop(), Term::var("x")),
        ));
        let fst_ty = infer(&ctx, &Term::fst(Term::var("p"))).unwrap();
        assert_eq!(*fst_ty, Term::Sort(Sort::Prop));
        let snd_ty = infer(&ctx, &Term::snd(Term::var("p"))).unwrap();
        assert!(alpha_eq(&snd_ty, &Term::fst(Term::var("p"))));
    }

    #[test]
    fn projection_of_non_pair_fails() {
        let mut ctx = JudgContext::new();
        ctx.push_global(ContextElem::Var("A".to_string(), prop()));
        ctx.push_global(ContextElem::Var("a".to_string(), Term::var("A")));
        let err = infer(&ctx, &Term::fst(Term::var("a"))).unwrap_err();
        assert!(matches!(err, TypeError::ExpectedSigma { .. }));
    }

    #[test]
    fn pair_checks_against_a_dependent_sigma() {
        // <A, a> : exist x : Prop, x   with  a : A
        let mut ctx = JudgContext::new();
        ctx.push_global(ContextElem::Var("A".to_string(), prop()));
        ctx.push_global(ContextElem::Var("a".to_string(), Term::var("A")));
        let pair = Term::pair(Term::var("A"), Term::var("a"));
        let sig = Term::sig("x", prop(), Term::var("x"));
        assert!(check(&ctx, &pair, &sig).is_ok());
    }

    #[test]
    fn ascribed_pair_returns_its_ascription() {
        let mut ctx = JudgContext::new();
        ctx.push_global(ContextElem::Var("A".to_string(), prop()));
        ctx.push_global(ContextElem::Var("a".to_string(), Term::var("A")));
        let sig = Term::sig("x", prop(), Term::var("x"));
        let pair = Rc::new(Term::Pair(Term::var("A"), Term::var("a"), Some(sig.clone())));
        let ty = infer(&ctx, &pair).unwrap();
        assert!(alpha_eq(&ty, &sig));
    }

    #[test]
    fn let_definition_is_transparent_in_the_body() {
        // let i : A -> A := fun x : A => x in i a   :   A
        let mut ctx = JudgContext::new();
        ctx.push_global(ContextElem::Var("A".to_string(), prop()));
        ctx.push_global(ContextElem::Var("a".to_string(), Term::var("A")));
        let t = Term::let_in(
            "i",
            Some(Term::arrow(Term::var("A"), Term::var("A"))),
            Term::lam("x", Term::var("A"), Term::var("x")),
            Term::app(Term::var("i"), Term::var("a")),
        );
        let ty = infer(&ctx, &t).unwrap();
        assert!(alpha_eq(&ty, &Term::var("A")));
    }

    #[test]
    fn let_without_annotation_infers_the_type() {
        let mut ctx = JudgContext::new();
        ctx.push_global(ContextElem::Var("A".to_string(), prop()));
        ctx.push_global(ContextElem::Var("a".to_string(), Term::var("A")));
        let t = Term::let_in("x", None, Term::var("a"), Term::var("x"));
        let ty = infer(&ctx, &t).unwrap();
        assert!(alpha_eq(&ty, &Term::var("A")));
    }

    #[test]
    fn context_checking_stops_at_the_first_error() {
        let elems = vec![
            ContextElem::Var("A".to_string(), prop()),
            ContextElem::Def("bad".to_string(), prop(), Term::sort(Sort::Type)),
            ContextElem::Var("unreached".to_string(), Term::var("nowhere")),
        ];
        let err = check_context(elems).unwrap_err();
        assert_eq!(err.at.name(), "bad");
        assert_eq!(err.error, TypeError::TypeHasNoType);
    }

    #[test]
    fn context_elements_see_earlier_elements_only() {
        let elems = vec![
            ContextElem::Var("late".to_string(), Term::var("early")),
            ContextElem::Var("early".to_string(), prop()),
        ];
        let err = check_context(elems).unwrap_err();
        assert_eq!(err.at.name(), "late");
        assert_eq!(
            err.error,
            TypeError::UnboundVariable("early".to_string())
        );
    }

    #[test]
    fn shadowing_locals_resolve_to_the_rightmost_entry() {
        // fun x : Prop => fun x : x' => …  — inner x wins
        let mut ctx = JudgContext::new();
        ctx.push_global(ContextElem::Var("A".to_string(), prop()));
        let t = Term::lam(
            "x",
            prop(),
            Term::lam("x", Term::var("A"), Term::var("x")),
        );
        let ty = infer(&ctx, &t).unwrap();
        let expected = Term::pi("x", prop(), Term::arrow(Term::var("A"), Term::var("A")));
        assert!(alpha_eq(&ty, &expected));
    }
}
