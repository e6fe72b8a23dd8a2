use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::Deref;
use std::path::PathBuf;

use crate::expr::Expr;
use crate::transition_system::TransitionSystem;
use crate::vars::{VarDecl, VarKind};

/// Where an [`Hts`] came from.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum HtsOrigin {
    /// Built from model parsers or by combination.
    #[default]
    Parsed,
    /// Restored from a snapshot file (or combined with such a system).
    Snapshot(PathBuf),
}

/// Hierarchical transition system: a named set of components plus global
/// assumptions and lemmas.
///
/// Assumptions are conjoined with every use of `invar` (or `trans`, when they
/// mention the next state). Lemmas are auxiliary invariants for proof
/// strategies and are never treated as hard constraints.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Hts {
    pub name: String,
    pub(crate) components: Vec<TransitionSystem>,
    pub(crate) assumptions: Vec<Expr>,
    pub(crate) lemmas: Vec<Expr>,
    #[serde(skip)]
    pub(crate) origin: HtsOrigin,
}

impl Hts {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            components: Vec::new(),
            assumptions: Vec::new(),
            lemmas: Vec::new(),
            origin: HtsOrigin::Parsed,
        }
    }

    pub fn components(&self) -> &[TransitionSystem] {
        &self.components
    }

    pub fn assumptions(&self) -> &[Expr] {
        &self.assumptions
    }

    pub fn lemmas(&self) -> &[Expr] {
        &self.lemmas
    }

    pub fn origin(&self) -> &HtsOrigin {
        &self.origin
    }

    pub fn set_origin(&mut self, origin: HtsOrigin) {
        self.origin = origin;
    }

    pub fn add_assumption(&mut self, e: Expr) {
        self.assumptions.push(e);
    }

    pub fn add_lemma(&mut self, e: Expr) {
        self.lemmas.push(e);
    }

    /// Reset every component's `init` to `True` (symbolic initial state).
    pub fn drop_init(&mut self) {
        for ts in &mut self.components {
            ts.init = Expr::tt();
        }
    }

    /// Conjunction of every component's `init`.
    pub fn init(&self) -> Expr {
        Expr::conjoin(self.components.iter().map(|ts| ts.init.clone()))
    }

    /// Conjunction of every component's `invar`.
    pub fn invar(&self) -> Expr {
        Expr::conjoin(self.components.iter().map(|ts| ts.invar.clone()))
    }

    /// Conjunction of every component's `trans`.
    pub fn trans(&self) -> Expr {
        Expr::conjoin(self.components.iter().map(|ts| ts.trans.clone()))
    }

    /// All declared variables, component by component in declaration order.
    pub fn vars(&self) -> impl Iterator<Item = &VarDecl> {
        self.components.iter().flat_map(|ts| ts.vars.values())
    }

    pub fn var(&self, name: &str) -> Option<&VarDecl> {
        self.components.iter().find_map(|ts| ts.vars.get(name))
    }

    pub fn vars_of_kind(&self, kind: VarKind) -> impl Iterator<Item = &VarDecl> {
        self.vars().filter(move |v| v.kind == kind)
    }

    pub fn state_vars(&self) -> impl Iterator<Item = &VarDecl> {
        self.vars_of_kind(VarKind::State)
    }

    pub fn input_vars(&self) -> impl Iterator<Item = &VarDecl> {
        self.vars_of_kind(VarKind::Input)
    }

    pub fn output_vars(&self) -> impl Iterator<Item = &VarDecl> {
        self.vars_of_kind(VarKind::Output)
    }

    /// Temporarily add assumptions and lemmas.
    ///
    /// The additions are visible through the returned guard and are removed
    /// when the guard is dropped, on every exit path.
    pub fn inject(&mut self, assumptions: Vec<Expr>, lemmas: Vec<Expr>) -> InjectionGuard<'_> {
        let assumptions_len = self.assumptions.len();
        let lemmas_len = self.lemmas.len();
        self.assumptions.extend(assumptions);
        self.lemmas.extend(lemmas);
        InjectionGuard {
            hts: self,
            assumptions_len,
            lemmas_len,
        }
    }

    pub fn statistics(&self) -> HtsStats {
        HtsStats {
            name: self.name.clone(),
            components: self.components.len(),
            state_vars: self.state_vars().count(),
            input_vars: self.input_vars().count(),
            output_vars: self.output_vars().count(),
            assumptions: self.assumptions.len(),
            lemmas: self.lemmas.len(),
        }
    }
}

/// Scoped view of an [`Hts`] with injected assumptions and lemmas.
///
/// Dropping the guard restores the assumption and lemma lists to their
/// pre-injection contents.
pub struct InjectionGuard<'a> {
    hts: &'a mut Hts,
    assumptions_len: usize,
    lemmas_len: usize,
}

impl Deref for InjectionGuard<'_> {
    type Target = Hts;

    fn deref(&self) -> &Hts {
        self.hts
    }
}

impl Drop for InjectionGuard<'_> {
    fn drop(&mut self) {
        self.hts.assumptions.truncate(self.assumptions_len);
        self.hts.lemmas.truncate(self.lemmas_len);
    }
}

/// Size summary printed after parsing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HtsStats {
    pub name: String,
    pub components: usize,
    pub state_vars: usize,
    pub input_vars: usize,
    pub output_vars: usize,
    pub assumptions: usize,
    pub lemmas: usize,
}

impl fmt::Display for HtsStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Statistics ({}):", self.name)?;
        writeln!(f, "  Components:\t{}", self.components)?;
        writeln!(f, "  State vars:\t{}", self.state_vars)?;
        writeln!(f, "  Input vars:\t{}", self.input_vars)?;
        writeln!(f, "  Output vars:\t{}", self.output_vars)?;
        writeln!(f, "  Assumptions:\t{}", self.assumptions)?;
        write!(f, "  Lemmas:\t{}", self.lemmas)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::vars::Sort;

    fn counter() -> Hts {
        let mut ts = TransitionSystem::new("counter");
        ts.declare(VarDecl::state("x", Sort::BitVec(4))).unwrap();
        ts.declare(VarDecl::output("out", Sort::BitVec(4))).unwrap();
        ts.add_init(Expr::var("x").eq(Expr::int(0)));
        ts.add_invar(Expr::var("out").eq(Expr::var("x")));
        ts.add_trans(Expr::next("x").eq(Expr::var("x").add(Expr::int(1))));
        let mut hts = Hts::new("top");
        hts.add_ts(ts).unwrap();
        hts
    }

    #[test]
    fn injection_is_rolled_back_on_drop() {
        let mut hts = counter();
        hts.add_assumption(Expr::var("x").le(Expr::int(3)));
        {
            let guard = hts.inject(
                vec![Expr::var("x").eq(Expr::int(1))],
                vec![Expr::var("x").ge(Expr::int(0))],
            );
            assert_eq!(guard.assumptions().len(), 2);
            assert_eq!(guard.lemmas().len(), 1);
        }
        assert_eq!(hts.assumptions(), &[Expr::var("x").le(Expr::int(3))]);
        assert!(hts.lemmas().is_empty());
    }

    #[test]
    fn injection_is_rolled_back_on_early_return() {
        fn failing_dispatch(hts: &mut Hts) -> Result<(), String> {
            let guard = hts.inject(vec![Expr::var("x").eq(Expr::int(1))], Vec::new());
            if !guard.assumptions().is_empty() {
                return Err("checker failed".into());
            }
            Ok(())
        }
        let mut hts = counter();
        assert!(failing_dispatch(&mut hts).is_err());
        assert!(hts.assumptions().is_empty());
    }

    #[test]
    fn drop_init_clears_every_component() {
        let mut hts = counter();
        assert!(!hts.init().is_true());
        hts.drop_init();
        assert!(hts.init().is_true());
        assert!(!hts.trans().is_true());
    }

    #[test]
    fn statistics_count_variable_kinds() {
        let stats = counter().statistics();
        assert_eq!(stats.components, 1);
        assert_eq!(stats.state_vars, 1);
        assert_eq!(stats.output_vars, 1);
        assert_eq!(stats.input_vars, 0);
        assert!(stats.to_string().contains("State vars:\t1"));
    }
}
