//! Unrolling of a hierarchical transition system into SMT terms.
//!
//! Every variable gets one copy per step (see [`variables`]). Assumptions
//! without `next()` strengthen `invar`; the others strengthen `trans`.
//! Bit-vectors become integers constrained to `[0, 2^w)`; arithmetic on them
//! is taken modulo `2^w`, so counters wrap as they do in hardware.

pub mod ltl;
pub mod variables;

use std::collections::HashMap;

use indexmap::IndexMap;
use thiserror::Error;
use tern_ir::{Expr, Hts, Sort, VarDecl, VarKind, MAX_BV_WIDTH};

use crate::solver::{Model, ModelValue};
use crate::sorts::SmtSort;
use crate::terms::SmtTerm;
use crate::witness::{Value, Witness};

pub use variables::{alt_step, bwd_step, fwd_step, timed_var};

#[derive(Debug, Error, PartialEq, Eq)]
pub enum EncodeError {
    #[error("undeclared variable '{0}'")]
    UndeclaredVariable(String),
    #[error("next({0}) is not allowed in a state predicate")]
    UnexpectedNext(String),
}

/// Step-indexed view of an [`Hts`].
#[derive(Debug, Clone)]
pub struct Unroller {
    vars: Vec<VarDecl>,
    sorts: HashMap<String, Sort>,
    init: Expr,
    invar: Expr,
    trans: Expr,
    lemmas: Vec<Expr>,
}

/// Encoded subterm with its sort.
enum Typed {
    Bool(SmtTerm),
    Int(SmtTerm),
}

impl Typed {
    fn into_bool(self) -> SmtTerm {
        match self {
            Typed::Bool(t) => t,
            Typed::Int(t) => t.eq(SmtTerm::int(0)).not(),
        }
    }

    fn into_int(self) -> SmtTerm {
        match self {
            Typed::Int(t) => t,
            Typed::Bool(t) => SmtTerm::ite(t, SmtTerm::int(1), SmtTerm::int(0)),
        }
    }
}

/// Sort of an arithmetic subterm, as far as wrapping is concerned.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Width {
    /// Literals and Booleans take the width of the other operand.
    Free,
    Unbounded,
    Bits(u32),
}

impl Width {
    fn join(self, other: Width) -> Width {
        match (self, other) {
            (Width::Unbounded, _) | (_, Width::Unbounded) => Width::Unbounded,
            (Width::Bits(a), Width::Bits(b)) => Width::Bits(a.max(b)),
            (Width::Bits(w), Width::Free) | (Width::Free, Width::Bits(w)) => Width::Bits(w),
            (Width::Free, Width::Free) => Width::Free,
        }
    }
}

impl Unroller {
    pub fn new(hts: &Hts) -> Result<Self, EncodeError> {
        let vars: Vec<VarDecl> = hts.vars().cloned().collect();
        let sorts = vars.iter().map(|v| (v.name.clone(), v.sort)).collect();
        let (with_next, without_next): (Vec<Expr>, Vec<Expr>) = hts
            .assumptions()
            .iter()
            .cloned()
            .partition(Expr::has_next);
        let unroller = Self {
            vars,
            sorts,
            init: hts.init(),
            invar: Expr::conjoin(std::iter::once(hts.invar()).chain(without_next)),
            trans: Expr::conjoin(std::iter::once(hts.trans()).chain(with_next)),
            lemmas: hts.lemmas().to_vec(),
        };
        unroller.check_declared(&unroller.init)?;
        unroller.check_declared(&unroller.invar)?;
        unroller.check_declared(&unroller.trans)?;
        for lemma in &unroller.lemmas {
            unroller.check_state_predicate(lemma)?;
        }
        Ok(unroller)
    }

    fn check_declared(&self, e: &Expr) -> Result<(), EncodeError> {
        match e.free_vars().into_iter().find(|v| !self.sorts.contains_key(v)) {
            Some(v) => Err(EncodeError::UndeclaredVariable(v)),
            None => Ok(()),
        }
    }

    /// Reject predicates that mention unknown variables or the next state.
    pub fn check_state_predicate(&self, e: &Expr) -> Result<(), EncodeError> {
        self.check_declared(e)?;
        let mut found = None;
        e.rewrite_vars(&mut |v| {
            if let tern_ir::VarRef::Next(name) = v {
                found.get_or_insert_with(|| name.to_string());
            }
            Expr::tt()
        });
        match found {
            Some(name) => Err(EncodeError::UnexpectedNext(name)),
            None => Ok(()),
        }
    }

    pub fn vars(&self) -> &[VarDecl] {
        &self.vars
    }

    pub fn lemmas(&self) -> &[Expr] {
        &self.lemmas
    }

    pub fn state_vars(&self) -> impl Iterator<Item = &VarDecl> {
        self.vars.iter().filter(|v| v.kind == VarKind::State)
    }

    /// Declarations of every variable copy at `step`.
    pub fn declarations(&self, step: &str) -> Vec<(String, SmtSort)> {
        self.vars
            .iter()
            .map(|v| (timed_var(&v.name, step), SmtSort::from(v.sort)))
            .collect()
    }

    /// Bit-vector ranges plus `invar` at `step`.
    pub fn frame(&self, step: &str) -> SmtTerm {
        let mut terms: Vec<SmtTerm> = self
            .vars
            .iter()
            .filter_map(|v| {
                let (lo, hi) = v.sort.int_range()?;
                let x = SmtTerm::var(timed_var(&v.name, step));
                Some(SmtTerm::and(vec![
                    x.clone().ge(SmtTerm::int(lo)),
                    x.le(SmtTerm::int(hi)),
                ]))
            })
            .collect();
        terms.push(self.state(&self.invar, step));
        SmtTerm::and(terms)
    }

    pub fn init(&self, step: &str) -> SmtTerm {
        self.state(&self.init, step)
    }

    /// `trans` with current variables at `from` and `next()` at `to`.
    pub fn trans(&self, from: &str, to: &str) -> SmtTerm {
        self.encode(&self.trans, from, to).into_bool()
    }

    /// A current-state predicate at `step`.
    pub fn state(&self, e: &Expr, step: &str) -> SmtTerm {
        self.encode(e, step, step).into_bool()
    }

    /// Every variable equal at steps `a` and `b`.
    pub fn steps_equal(&self, a: &str, b: &str) -> SmtTerm {
        SmtTerm::and(
            self.vars
                .iter()
                .map(|v| {
                    SmtTerm::var(timed_var(&v.name, a)).eq(SmtTerm::var(timed_var(&v.name, b)))
                })
                .collect(),
        )
    }

    /// Some state variable differs between steps `a` and `b`.
    pub fn states_differ(&self, a: &str, b: &str) -> SmtTerm {
        SmtTerm::or(
            self.state_vars()
                .map(|v| {
                    SmtTerm::var(timed_var(&v.name, a))
                        .eq(SmtTerm::var(timed_var(&v.name, b)))
                        .not()
                })
                .collect(),
        )
    }

    /// Model variables to extract for the given steps, in step order.
    pub fn model_vars(&self, steps: &[String]) -> Vec<(String, SmtSort)> {
        steps.iter().flat_map(|s| self.declarations(s)).collect()
    }

    /// Read one assignment per step out of `model`.
    pub fn witness(&self, model: &Model, steps: &[String], loop_back: Option<usize>) -> Witness {
        let steps = steps
            .iter()
            .map(|step| {
                self.vars
                    .iter()
                    .filter_map(|v| {
                        let value = match model.get(&timed_var(&v.name, step))? {
                            ModelValue::Bool(b) => Value::Bool(*b),
                            ModelValue::Int(n) => Value::Int(*n),
                        };
                        Some((v.name.clone(), value))
                    })
                    .collect::<IndexMap<_, _>>()
            })
            .collect();
        Witness { steps, loop_back }
    }

    fn sort_of(&self, name: &str) -> Sort {
        self.sorts.get(name).copied().unwrap_or(Sort::Int)
    }

    fn width(&self, e: &Expr) -> Width {
        match e {
            Expr::Var(name) | Expr::Next(name) => match self.sort_of(name) {
                Sort::BitVec(w) => Width::Bits(w),
                Sort::Bool => Width::Free,
                Sort::Int => Width::Unbounded,
            },
            Expr::IntLit(_) | Expr::BoolLit(_) => Width::Free,
            Expr::Add(l, r) | Expr::Sub(l, r) | Expr::Mul(l, r) => {
                self.width(l).join(self.width(r))
            }
            Expr::Ite(_, t, f) => self.width(t).join(self.width(f)),
            _ => Width::Free,
        }
    }

    /// Reduce an arithmetic result modulo `2^w` when `e` is a bit-vector term.
    fn wrap(&self, e: &Expr, term: SmtTerm) -> SmtTerm {
        match self.width(e) {
            Width::Bits(w) => term.modulo(SmtTerm::int(1_i64 << w.min(MAX_BV_WIDTH))),
            Width::Free | Width::Unbounded => term,
        }
    }

    fn encode(&self, e: &Expr, cur: &str, next: &str) -> Typed {
        let var = |name: &str, step: &str| {
            let t = SmtTerm::var(timed_var(name, step));
            if self.sort_of(name).is_bool() {
                Typed::Bool(t)
            } else {
                Typed::Int(t)
            }
        };
        let go = |e: &Expr| self.encode(e, cur, next);
        let int2 = |l: &Expr, r: &Expr| (go(l).into_int(), go(r).into_int());
        match e {
            Expr::Var(name) => var(name, cur),
            Expr::Next(name) => var(name, next),
            Expr::BoolLit(b) => Typed::Bool(SmtTerm::bool(*b)),
            Expr::IntLit(n) => Typed::Int(SmtTerm::int(*n)),
            Expr::Not(inner) => Typed::Bool(go(inner).into_bool().not()),
            Expr::And(items) => {
                Typed::Bool(SmtTerm::and(items.iter().map(|i| go(i).into_bool()).collect()))
            }
            Expr::Or(items) => {
                Typed::Bool(SmtTerm::or(items.iter().map(|i| go(i).into_bool()).collect()))
            }
            Expr::Implies(l, r) => Typed::Bool(go(l).into_bool().implies(go(r).into_bool())),
            Expr::Eq(l, r) => Typed::Bool(self.equality(l, r, cur, next)),
            Expr::Ne(l, r) => Typed::Bool(self.equality(l, r, cur, next).not()),
            Expr::Lt(l, r) => {
                let (l, r) = int2(l, r);
                Typed::Bool(l.lt(r))
            }
            Expr::Le(l, r) => {
                let (l, r) = int2(l, r);
                Typed::Bool(l.le(r))
            }
            Expr::Gt(l, r) => {
                let (l, r) = int2(l, r);
                Typed::Bool(l.gt(r))
            }
            Expr::Ge(l, r) => {
                let (l, r) = int2(l, r);
                Typed::Bool(l.ge(r))
            }
            Expr::Add(l, r) => {
                let (l, r) = int2(l, r);
                Typed::Int(self.wrap(e, l.add(r)))
            }
            Expr::Sub(l, r) => {
                let (l, r) = int2(l, r);
                Typed::Int(self.wrap(e, l.sub(r)))
            }
            Expr::Mul(l, r) => {
                let (l, r) = int2(l, r);
                Typed::Int(self.wrap(e, l.mul(r)))
            }
            Expr::Ite(c, t, f) => {
                let c = go(c).into_bool();
                match (go(t), go(f)) {
                    (Typed::Bool(t), Typed::Bool(f)) => Typed::Bool(SmtTerm::ite(c, t, f)),
                    (t, f) => Typed::Int(SmtTerm::ite(c, t.into_int(), f.into_int())),
                }
            }
        }
    }

    /// Equality with Bool/Int coercion: `b = 1` on a Bool `b` means `b`.
    fn equality(&self, l: &Expr, r: &Expr, cur: &str, next: &str) -> SmtTerm {
        match (self.encode(l, cur, next), self.encode(r, cur, next)) {
            (Typed::Bool(a), Typed::Bool(b)) | (Typed::Int(a), Typed::Int(b)) => a.eq(b),
            (Typed::Bool(b), Typed::Int(SmtTerm::IntLit(n)))
            | (Typed::Int(SmtTerm::IntLit(n)), Typed::Bool(b)) => {
                if n == 0 {
                    b.not()
                } else {
                    b
                }
            }
            (Typed::Bool(b), Typed::Int(i)) | (Typed::Int(i), Typed::Bool(b)) => {
                Typed::Bool(b).into_int().eq(i)
            }
        }
    }
}
