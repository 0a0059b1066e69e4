pub mod ast;
pub mod checker;
pub mod normalize;
pub mod subst;

pub use ast::{Sort, Term};
pub use checker::{ContextElem, JudgContext, TypeError, WFError};

#[cfg(test)]
mod tests {
    use super::*;
    use crate::checker::{check_context, infer};
    use crate::normalize::is_def_eq;
    use crate::subst::alpha_eq;
    use std::rc::Rc;

    fn prop() -> Rc<Term> {
        Term::sort(Sort::Prop)
    }

    /// Church naturals over an abstract `A`, the way a source program would
    /// set them up after elaboration.
    fn church_context() -> Vec<ContextElem> {
        // Nat := forall A : Prop, (A -> A) -> A -> A
        let nat_body = Term::pi(
            "A",
            prop(),
            Term::arrow(
                Term::arrow(Term::var("A"), Term::var("A")),
                Term::arrow(Term::var("A"), Term::var("A")),
            ),
        );
        // zero := fun A (f : A -> A) (x : A) => x
        let zero = Term::lam(
            "A",
            prop(),
            Term::lam(
                "f",
                Term::arrow(Term::var("A"), Term::var("A")),
                Term::lam("x", Term::var("A"), Term::var("x")),
            ),
        );
        // succ := fun n A f x => f (n A f x)
        let succ = Term::lam(
            "n",
            Term::var("Nat"),
            Term::lam(
                "A",
                prop(),
                Term::lam(
                    "f",
                    Term::arrow(Term::var("A"), Term::var("A")),
                    Term::lam(
                        "x",
                        Term::var("A"),
                        Term::app(
                            Term::var("f"),
                            Term::app(
                                Term::app(
                                    Term::app(Term::var("n"), Term::var("A")),
                                    Term::var("f"),
                                ),
                                Term::var("x"),
                            ),
                        ),
                    ),
                ),
            ),
        );
        vec![
            ContextElem::Def("Nat".to_string(), prop(), nat_body),
            ContextElem::Def("zero".to_string(), Term::var("Nat"), zero),
            ContextElem::Def(
                "succ".to_string(),
                Term::arrow(Term::var("Nat"), Term::var("Nat")),
                succ,
            ),
        ]
    }

    #[test]
    fn church_naturals_check() {
        let ctx = check_context(church_context()).expect("context should be well-formed");
        assert_eq!(ctx.globals().len(), 3);
    }

    #[test]
    fn successor_of_zero_is_a_nat() {
        let ctx = check_context(church_context()).unwrap();
        let one = Term::app(Term::var("succ"), Term::var("zero"));
        let ty = infer(&ctx, &one).unwrap();
        assert!(is_def_eq(&ctx, &ty, &Term::var("Nat")));
    }

    #[test]
    fn delta_expansion_identifies_nat_with_its_body() {
        let ctx = check_context(church_context()).unwrap();
        let body = Term::pi(
            "B",
            prop(),
            Term::arrow(
                Term::arrow(Term::var("B"), Term::var("B")),
                Term::arrow(Term::var("B"), Term::var("B")),
            ),
        );
        assert!(is_def_eq(&ctx, &Term::var("Nat"), &body));
    }

    #[test]
    fn inference_is_stable_under_repetition() {
        let ctx = check_context(church_context()).unwrap();
        let one = Term::app(Term::var("succ"), Term::var("zero"));
        let first = infer(&ctx, &one).unwrap();
        let second = infer(&ctx, &one).unwrap();
        assert!(alpha_eq(&first, &second));
        assert!(is_def_eq(&ctx, &first, &second));
    }

    #[test]
    fn sigma_types_package_a_witness() {
        // A : Prop, T : A -> Prop, a : A, t : T a
        //   ⊢  pack : exist x : A, T x  :=  <a, t>
        let elems = vec![
            ContextElem::Var("A".to_string(), prop()),
            ContextElem::Var("T".to_string(), Term::arrow(Term::var("A"), prop())),
            ContextElem::Var("a".to_string(), Term::var("A")),
            ContextElem::Var("t".to_string(), Term::app(Term::var("T"), Term::var("a"))),
            ContextElem::Def(
                "pack".to_string(),
                Term::sig(
                    "x",
                    Term::var("A"),
                    Term::app(Term::var("T"), Term::var("x")),
                ),
                Term::pair(Term::var("a"), Term::var("t")),
            ),
        ];
        check_context(elems).expect("the dependent pair should check");
    }

    #[test]
    fn ill_typed_definition_is_rejected_with_its_element() {
        let mut elems = church_context();
        elems.push(ContextElem::Def(
            "broken".to_string(),
            Term::var("Nat"),
            Term::var("Nat"),
        ));
        let err = check_context(elems).unwrap_err();
        assert_eq!(err.at.name(), "broken");
        assert!(matches!(err.error, TypeError::TypeMismatch { .. }));
    }
}
