//! Proptest strategies for well-formed expressions and systems.

use proptest::prelude::*;

use crate::expr::Expr;
use crate::hts::Hts;
use crate::transition_system::TransitionSystem;
use crate::vars::{Sort, VarDecl};

/// Integer-valued term over the given variable names.
pub fn arb_term(vars: Vec<String>) -> impl Strategy<Value = Expr> {
    let leaf = prop_oneof![
        (0i64..8).prop_map(Expr::int),
        proptest::sample::select(vars).prop_map(Expr::var),
    ];
    leaf.prop_recursive(2, 8, 2, |inner| {
        prop_oneof![
            (inner.clone(), inner.clone()).prop_map(|(a, b)| a.add(b)),
            (inner.clone(), inner).prop_map(|(a, b)| a.sub(b)),
        ]
    })
}

/// Boolean predicate over the given variable names.
pub fn arb_predicate(vars: Vec<String>) -> impl Strategy<Value = Expr> {
    let atom = (arb_term(vars.clone()), arb_term(vars), 0..3u8).prop_map(|(a, b, op)| match op {
        0 => a.eq(b),
        1 => a.le(b),
        _ => a.ne(b),
    });
    atom.prop_recursive(2, 8, 2, |inner| {
        prop_oneof![
            (inner.clone(), inner.clone()).prop_map(|(a, b)| a.and(b)),
            (inner.clone(), inner.clone()).prop_map(|(a, b)| a.or(b)),
            inner.prop_map(Expr::not),
        ]
    })
}

/// An [`Hts`] with one component whose variables carry the prefix `tag`.
///
/// Distinct tags give systems that can always be combined.
pub fn arb_hts(tag: &'static str) -> impl Strategy<Value = Hts> {
    (1..=3usize)
        .prop_flat_map(move |nvars| {
            let names: Vec<String> = (0..nvars).map(|i| format!("{tag}_v{i}")).collect();
            (
                Just(names.clone()),
                arb_predicate(names.clone()),
                arb_predicate(names.clone()),
                arb_predicate(names.clone()),
                proptest::option::of(arb_predicate(names)),
            )
        })
        .prop_map(move |(names, init, invar, step, assumption)| {
            let mut ts = TransitionSystem::new(tag);
            for name in &names {
                // Names are unique by construction.
                let _ = ts.declare(VarDecl::state(name.clone(), Sort::Int));
            }
            ts.add_init(init);
            ts.add_invar(invar);
            let next_step = step.to_next().unwrap_or_else(Expr::tt);
            ts.add_trans(step.implies(next_step));
            let mut hts = Hts::new(tag);
            let _ = hts.add_ts(ts);
            if let Some(a) = assumption {
                hts.add_assumption(a);
            }
            hts
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    proptest! {
        #[test]
        fn generated_systems_are_well_formed(hts in arb_hts("a")) {
            prop_assert_eq!(hts.components().len(), 1);
            prop_assert!(hts.state_vars().count() >= 1);
            let declared: std::collections::BTreeSet<String> =
                hts.vars().map(|v| v.name.clone()).collect();
            for e in [hts.init(), hts.invar(), hts.trans()] {
                prop_assert!(e.free_vars().is_subset(&declared));
            }
            prop_assert!(!hts.init().has_next());
        }
    }
}
