//! Linear temporal logic over [`Expr`] atoms.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::expr::Expr;

/// An LTL formula whose atoms are state predicates.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum LtlFormula {
    Atom(Expr),
    Not(Box<LtlFormula>),
    And(Box<LtlFormula>, Box<LtlFormula>),
    Or(Box<LtlFormula>, Box<LtlFormula>),
    Implies(Box<LtlFormula>, Box<LtlFormula>),
    Iff(Box<LtlFormula>, Box<LtlFormula>),
    Next(Box<LtlFormula>),
    Globally(Box<LtlFormula>),
    Finally(Box<LtlFormula>),
    Until(Box<LtlFormula>, Box<LtlFormula>),
    Release(Box<LtlFormula>, Box<LtlFormula>),
}

/// Negation normal form: negation only inside atoms.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Nnf {
    Atom(Expr),
    And(Box<Nnf>, Box<Nnf>),
    Or(Box<Nnf>, Box<Nnf>),
    Next(Box<Nnf>),
    Globally(Box<Nnf>),
    Finally(Box<Nnf>),
    Until(Box<Nnf>, Box<Nnf>),
    Release(Box<Nnf>, Box<Nnf>),
}

impl LtlFormula {
    pub fn atom(e: Expr) -> Self {
        LtlFormula::Atom(e)
    }

    /// `G F p`
    pub fn liveness(p: Expr) -> Self {
        LtlFormula::Globally(Box::new(LtlFormula::Finally(Box::new(LtlFormula::Atom(p)))))
    }

    /// `F p`
    pub fn eventually(p: Expr) -> Self {
        LtlFormula::Finally(Box::new(LtlFormula::Atom(p)))
    }

    /// True if no temporal operator occurs.
    pub fn is_propositional(&self) -> bool {
        match self {
            LtlFormula::Atom(_) => true,
            LtlFormula::Not(a) => a.is_propositional(),
            LtlFormula::And(a, b)
            | LtlFormula::Or(a, b)
            | LtlFormula::Implies(a, b)
            | LtlFormula::Iff(a, b) => a.is_propositional() && b.is_propositional(),
            _ => false,
        }
    }

    /// Collapse a propositional formula into a single predicate.
    pub fn to_expr(&self) -> Option<Expr> {
        Some(match self {
            LtlFormula::Atom(e) => e.clone(),
            LtlFormula::Not(a) => a.to_expr()?.not(),
            LtlFormula::And(a, b) => a.to_expr()?.and(b.to_expr()?),
            LtlFormula::Or(a, b) => a.to_expr()?.or(b.to_expr()?),
            LtlFormula::Implies(a, b) => a.to_expr()?.implies(b.to_expr()?),
            LtlFormula::Iff(a, b) => a.to_expr()?.eq(b.to_expr()?),
            _ => return None,
        })
    }

    /// State predicates occurring in the formula, left to right.
    pub fn atoms(&self) -> Vec<&Expr> {
        match self {
            LtlFormula::Atom(e) => vec![e],
            LtlFormula::Not(a)
            | LtlFormula::Next(a)
            | LtlFormula::Globally(a)
            | LtlFormula::Finally(a) => a.atoms(),
            LtlFormula::And(a, b)
            | LtlFormula::Or(a, b)
            | LtlFormula::Implies(a, b)
            | LtlFormula::Iff(a, b)
            | LtlFormula::Until(a, b)
            | LtlFormula::Release(a, b) => {
                let mut out = a.atoms();
                out.extend(b.atoms());
                out
            }
        }
    }

    pub fn nnf(&self) -> Nnf {
        to_nnf(self, false)
    }

    /// NNF of `!self`, the formula a bounded counterexample search looks for.
    pub fn negated_nnf(&self) -> Nnf {
        to_nnf(self, true)
    }

    pub fn rename(&self, rename: &dyn Fn(&str) -> String) -> LtlFormula {
        let r = |f: &LtlFormula| Box::new(f.rename(rename));
        match self {
            LtlFormula::Atom(e) => LtlFormula::Atom(e.rename(rename)),
            LtlFormula::Not(a) => LtlFormula::Not(r(a)),
            LtlFormula::And(a, b) => LtlFormula::And(r(a), r(b)),
            LtlFormula::Or(a, b) => LtlFormula::Or(r(a), r(b)),
            LtlFormula::Implies(a, b) => LtlFormula::Implies(r(a), r(b)),
            LtlFormula::Iff(a, b) => LtlFormula::Iff(r(a), r(b)),
            LtlFormula::Next(a) => LtlFormula::Next(r(a)),
            LtlFormula::Globally(a) => LtlFormula::Globally(r(a)),
            LtlFormula::Finally(a) => LtlFormula::Finally(r(a)),
            LtlFormula::Until(a, b) => LtlFormula::Until(r(a), r(b)),
            LtlFormula::Release(a, b) => LtlFormula::Release(r(a), r(b)),
        }
    }
}

fn to_nnf(f: &LtlFormula, neg: bool) -> Nnf {
    let b = |f: &LtlFormula, neg: bool| Box::new(to_nnf(f, neg));
    match (f, neg) {
        (LtlFormula::Atom(e), false) => Nnf::Atom(e.clone()),
        (LtlFormula::Atom(e), true) => Nnf::Atom(e.clone().not()),
        (LtlFormula::Not(a), _) => to_nnf(a, !neg),
        (LtlFormula::And(l, r), false) => Nnf::And(b(l, false), b(r, false)),
        (LtlFormula::And(l, r), true) => Nnf::Or(b(l, true), b(r, true)),
        (LtlFormula::Or(l, r), false) => Nnf::Or(b(l, false), b(r, false)),
        (LtlFormula::Or(l, r), true) => Nnf::And(b(l, true), b(r, true)),
        (LtlFormula::Implies(l, r), false) => Nnf::Or(b(l, true), b(r, false)),
        (LtlFormula::Implies(l, r), true) => Nnf::And(b(l, false), b(r, true)),
        (LtlFormula::Iff(l, r), false) => Nnf::Or(
            Box::new(Nnf::And(b(l, false), b(r, false))),
            Box::new(Nnf::And(b(l, true), b(r, true))),
        ),
        (LtlFormula::Iff(l, r), true) => Nnf::Or(
            Box::new(Nnf::And(b(l, false), b(r, true))),
            Box::new(Nnf::And(b(l, true), b(r, false))),
        ),
        (LtlFormula::Next(a), _) => Nnf::Next(b(a, neg)),
        (LtlFormula::Globally(a), false) => Nnf::Globally(b(a, false)),
        (LtlFormula::Globally(a), true) => Nnf::Finally(b(a, true)),
        (LtlFormula::Finally(a), false) => Nnf::Finally(b(a, false)),
        (LtlFormula::Finally(a), true) => Nnf::Globally(b(a, true)),
        (LtlFormula::Until(l, r), false) => Nnf::Until(b(l, false), b(r, false)),
        (LtlFormula::Until(l, r), true) => Nnf::Release(b(l, true), b(r, true)),
        (LtlFormula::Release(l, r), false) => Nnf::Release(b(l, false), b(r, false)),
        (LtlFormula::Release(l, r), true) => Nnf::Until(b(l, true), b(r, true)),
    }
}

impl fmt::Display for LtlFormula {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LtlFormula::Atom(e) => write!(f, "{e}"),
            LtlFormula::Not(a) => write!(f, "(!{a})"),
            LtlFormula::And(a, b) => write!(f, "({a} & {b})"),
            LtlFormula::Or(a, b) => write!(f, "({a} | {b})"),
            LtlFormula::Implies(a, b) => write!(f, "({a} -> {b})"),
            LtlFormula::Iff(a, b) => write!(f, "({a} <-> {b})"),
            LtlFormula::Next(a) => write!(f, "(X {a})"),
            LtlFormula::Globally(a) => write!(f, "(G {a})"),
            LtlFormula::Finally(a) => write!(f, "(F {a})"),
            LtlFormula::Until(a, b) => write!(f, "({a} U {b})"),
            LtlFormula::Release(a, b) => write!(f, "({a} R {b})"),
        }
    }
}
