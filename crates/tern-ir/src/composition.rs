//! Combination algebra over hierarchical transition systems.
//!
//! Combining two systems unions their components, assumptions and lemmas.
//! The resulting `init`/`invar`/`trans` are the conjunctions of the
//! operands', so combination is associative and commutative up to conjunct
//! order. A variable may be declared by at most one component; a second
//! declaration is a hard error and is never resolved by renaming.

use std::collections::HashMap;
use thiserror::Error;
use tracing::debug;

use crate::hts::{Hts, HtsOrigin};
use crate::transition_system::TransitionSystem;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CompositionError {
    #[error("variable `{var}` declared by both {existing} and {incoming}")]
    NamespaceCollision {
        var: String,
        existing: String,
        incoming: String,
    },
}

impl Hts {
    /// Add one component, rejecting declarations that clash with existing ones.
    pub fn add_ts(&mut self, ts: TransitionSystem) -> Result<(), CompositionError> {
        let owners: HashMap<&str, &TransitionSystem> = self
            .components
            .iter()
            .flat_map(|c| c.vars.keys().map(move |name| (name.as_str(), c)))
            .collect();
        for decl in ts.vars.values() {
            if let Some(owner) = owners.get(decl.name.as_str()) {
                let existing = &owner.vars[decl.name.as_str()];
                return Err(CompositionError::NamespaceCollision {
                    var: decl.name.clone(),
                    existing: format!("{} ({} {})", owner.name, existing.kind, existing.sort),
                    incoming: format!("{} ({} {})", ts.name, decl.kind, decl.sort),
                });
            }
        }
        debug!(system = %self.name, component = %ts.name, vars = ts.vars.len(), "adding component");
        self.components.push(ts);
        Ok(())
    }

    /// Fold `other` into `self`.
    ///
    /// On error `self` is left unchanged.
    pub fn combine(&mut self, other: Hts) -> Result<(), CompositionError> {
        let mut staged = Hts {
            name: self.name.clone(),
            components: self.components.clone(),
            assumptions: Vec::new(),
            lemmas: Vec::new(),
            origin: HtsOrigin::Parsed,
        };
        for ts in other.components {
            staged.add_ts(ts)?;
        }
        self.components = staged.components;
        self.assumptions.extend(other.assumptions);
        self.lemmas.extend(other.lemmas);
        if let HtsOrigin::Snapshot(path) = other.origin {
            self.origin = HtsOrigin::Snapshot(path);
        }
        Ok(())
    }

    /// Combine a sequence of systems under a fresh name.
    pub fn combine_all(
        name: impl Into<String>,
        systems: impl IntoIterator<Item = Hts>,
    ) -> Result<Hts, CompositionError> {
        let mut out = Hts::new(name);
        for hts in systems {
            out.combine(hts)?;
        }
        Ok(out)
    }

    /// Copy with every variable renamed, in components, assumptions and lemmas.
    pub fn renamed(&self, rename: &dyn Fn(&str) -> String) -> Hts {
        Hts {
            name: self.name.clone(),
            components: self.components.iter().map(|ts| ts.renamed(rename)).collect(),
            assumptions: self.assumptions.iter().map(|e| e.rename(rename)).collect(),
            lemmas: self.lemmas.iter().map(|e| e.rename(rename)).collect(),
            origin: self.origin.clone(),
        }
    }
}


/// Algebraic laws of combination. Predicates are compared as sorted conjunct
/// multisets, which is stronger than logical equivalence.
#[cfg(test)]
mod laws {
    use proptest::prelude::*;

    use crate::expr::Expr;
    use crate::hts::Hts;
    use crate::proptest_generators::arb_hts;

    fn normalized(e: Expr) -> Vec<Expr> {
        let mut parts: Vec<Expr> = e.conjuncts().into_iter().cloned().collect();
        parts.sort();
        parts
    }

    fn signature(hts: &Hts) -> (Vec<Expr>, Vec<Expr>, Vec<Expr>, Vec<Expr>, Vec<String>) {
        let mut assumptions = hts.assumptions().to_vec();
        assumptions.sort();
        let mut vars: Vec<String> = hts.vars().map(|v| v.name.clone()).collect();
        vars.sort();
        (
            normalized(hts.init()),
            normalized(hts.invar()),
            normalized(hts.trans()),
            assumptions,
            vars,
        )
    }

    fn combined(parts: &[&Hts]) -> Hts {
        Hts::combine_all("top", parts.iter().map(|h| (*h).clone())).unwrap()
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(64))]

        #[test]
        fn combination_is_commutative(a in arb_hts("a"), b in arb_hts("b")) {
            prop_assert_eq!(signature(&combined(&[&a, &b])), signature(&combined(&[&b, &a])));
        }

        #[test]
        fn combination_is_associative(a in arb_hts("a"), b in arb_hts("b"), c in arb_hts("c")) {
            let mut ab = a.clone();
            ab.combine(b.clone()).unwrap();
            ab.combine(c.clone()).unwrap();

            let mut bc = b.clone();
            bc.combine(c.clone()).unwrap();
            let mut a_bc = a.clone();
            a_bc.combine(bc).unwrap();

            prop_assert_eq!(signature(&ab), signature(&a_bc));
        }

        #[test]
        fn every_order_of_three_agrees(a in arb_hts("a"), b in arb_hts("b"), c in arb_hts("c")) {
            let reference = signature(&combined(&[&a, &b, &c]));
            for order in [[&b, &c, &a], [&c, &a, &b], [&c, &b, &a], [&a, &c, &b]] {
                prop_assert_eq!(&signature(&combined(&order)), &reference);
            }
        }

        #[test]
        fn combining_a_system_with_itself_collides(a in arb_hts("a")) {
            let mut twice = a.clone();
            prop_assert!(twice.combine(a).is_err());
        }
    }
}
