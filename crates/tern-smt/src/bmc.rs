//! Bounded model checking, k-induction, simulation and bounded LTL checking
//! over an [`Unroller`].

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use tern_ir::{Expr, LtlFormula};
use tracing::{debug, info, warn};

use crate::encoder::ltl::LassoEncoder;
use crate::encoder::{bwd_step, fwd_step, Unroller};
use crate::solver::{SatResult, SmtSolver};
use crate::sorts::SmtSort;
use crate::terms::SmtTerm;
use crate::witness::Witness;

/// Unrolling direction of a bounded search.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Strategy {
    /// Grow the path from the initial states.
    Fwd,
    /// Grow the path backwards from the target states.
    Bwd,
    /// Alternate between the two ends.
    Zz,
    /// Let the checker pick; currently forward.
    #[default]
    Auto,
}

impl Strategy {
    fn resolve(self) -> Strategy {
        match self {
            Strategy::Auto => Strategy::Fwd,
            other => other,
        }
    }
}

impl FromStr for Strategy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "FWD" => Ok(Strategy::Fwd),
            "BWD" => Ok(Strategy::Bwd),
            "ZZ" => Ok(Strategy::Zz),
            "AUTO" => Ok(Strategy::Auto),
            other => Err(format!(
                "unknown strategy '{other}' (expected FWD, BWD, ZZ or AUTO)"
            )),
        }
    }
}

impl fmt::Display for Strategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Strategy::Fwd => "FWD",
            Strategy::Bwd => "BWD",
            Strategy::Zz => "ZZ",
            Strategy::Auto => "AUTO",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BmcOptions {
    /// Deepest unrolling explored.
    pub bound: usize,
    /// Shallowest depth at which the target is queried.
    pub bound_min: usize,
    pub strategy: Strategy,
    /// Keep the solver state across depths instead of re-encoding.
    pub incremental: bool,
    /// Attempt an unbounded proof (k-induction) for safety properties.
    pub prove: bool,
}

impl Default for BmcOptions {
    fn default() -> Self {
        Self {
            bound: 10,
            bound_min: 0,
            strategy: Strategy::Auto,
            incremental: true,
            prove: false,
        }
    }
}

/// Outcome of one check.
#[derive(Debug, Clone, PartialEq)]
pub enum CheckResult {
    /// The property holds. For safety this is an unbounded proof; for
    /// simulation it carries the trace that reaches the target.
    Holds {
        depth: usize,
        witness: Option<Witness>,
    },
    /// A counterexample of the given depth.
    Violated { depth: usize, witness: Witness },
    /// Nothing conclusive up to `depth_reached`. `exhausted` is set when
    /// the solver refuted every depth up to the bound, as opposed to giving
    /// up or skipping the queries.
    Unknown {
        depth_reached: usize,
        reason: String,
        exhausted: bool,
    },
}

impl CheckResult {
    /// Depth at which the check stopped.
    pub fn depth(&self) -> usize {
        match self {
            CheckResult::Holds { depth, .. } | CheckResult::Violated { depth, .. } => *depth,
            CheckResult::Unknown { depth_reached, .. } => *depth_reached,
        }
    }

    pub fn witness(&self) -> Option<&Witness> {
        match self {
            CheckResult::Holds { witness, .. } => witness.as_ref(),
            CheckResult::Violated { witness, .. } => Some(witness),
            CheckResult::Unknown { .. } => None,
        }
    }
}

/// Search for a violation of the invariant `property`.
///
/// With `options.prove`, runs k-induction strengthened by the system's
/// lemmas; otherwise a plain bounded search, whose clean outcome is
/// `Unknown` at the bound.
pub fn check_safety<S: SmtSolver>(
    solver: &mut S,
    unroller: &Unroller,
    property: &Expr,
    options: &BmcOptions,
) -> Result<CheckResult, S::Error> {
    if options.prove {
        return prove(solver, unroller, property, options);
    }
    let bad = property.clone().not();
    Ok(match reach(solver, unroller, &bad, options)? {
        Reach::Found { depth, witness } => CheckResult::Violated { depth, witness },
        Reach::Exhausted { depth } => CheckResult::Unknown {
            depth_reached: depth,
            reason: format!("no counterexample up to depth {depth}"),
            exhausted: true,
        },
        Reach::Unknown { depth, reason } => CheckResult::Unknown {
            depth_reached: depth,
            reason,
            exhausted: false,
        },
    })
}

/// Find an execution that ends in a state satisfying `target`.
///
/// A trivially true target asks for a run of exactly `options.bound` steps.
pub fn simulate<S: SmtSolver>(
    solver: &mut S,
    unroller: &Unroller,
    target: &Expr,
    options: &BmcOptions,
) -> Result<CheckResult, S::Error> {
    let mut options = options.clone();
    if target.is_true() {
        options.bound_min = options.bound;
    }
    Ok(match reach(solver, unroller, target, &options)? {
        Reach::Found { depth, witness } => CheckResult::Holds {
            depth,
            witness: Some(witness),
        },
        Reach::Exhausted { depth } => CheckResult::Unknown {
            depth_reached: depth,
            reason: format!("no execution reaches the target within {depth} steps"),
            exhausted: true,
        },
        Reach::Unknown { depth, reason } => CheckResult::Unknown {
            depth_reached: depth,
            reason,
            exhausted: false,
        },
    })
}

/// Bounded search for a lasso-shaped or finite counterexample to `formula`.
///
/// Always unrolls forward; `options.strategy` and `options.prove` do not apply.
pub fn check_ltl<S: SmtSolver>(
    solver: &mut S,
    unroller: &Unroller,
    formula: &LtlFormula,
    options: &BmcOptions,
) -> Result<CheckResult, S::Error> {
    if options.strategy.resolve() != Strategy::Fwd {
        debug!(strategy = %options.strategy, "LTL checking always unrolls forward");
    }
    let negated = formula.negated_nnf();
    let shape = Shape {
        unroller,
        strategy: Strategy::Fwd,
        goal: None,
    };
    solver.reset()?;
    let mut pending_unknown = None;
    for depth in 0..=options.bound {
        if options.incremental {
            shape.grow(depth).apply(solver)?;
        }
        if depth < options.bound_min {
            continue;
        }
        info!(depth, "LTL: checking depth");
        if options.incremental {
            solver.push()?;
        } else {
            solver.reset()?;
            for d in 0..=depth {
                shape.grow(d).apply(solver)?;
            }
        }
        let encoder = LassoEncoder::new(unroller, depth);
        let lasso = encoder.encode(&negated);
        for (name, sort) in &lasso.selectors {
            solver.declare_var(name, sort)?;
        }
        solver.assert(&lasso.constraint)?;
        let steps = shape.steps(depth);
        let mut vars = unroller.model_vars(&steps);
        vars.extend(lasso.selectors.iter().cloned());
        let refs = var_refs(&vars);
        let (result, model) = solver.check_sat_with_model(&refs)?;
        if options.incremental {
            solver.pop()?;
        }
        match result {
            SatResult::Sat => {
                let Some(model) = model else {
                    warn!(depth, "LTL: solver returned SAT without a model");
                    return Ok(CheckResult::Unknown {
                        depth_reached: depth,
                        reason: "solver returned SAT without a model".into(),
                        exhausted: false,
                    });
                };
                let loop_back = encoder.selected_loop(&model);
                info!(depth, ?loop_back, "LTL: counterexample found");
                return Ok(CheckResult::Violated {
                    depth,
                    witness: unroller.witness(&model, &steps, loop_back),
                });
            }
            SatResult::Unsat => debug!(depth, "LTL: no counterexample at this depth"),
            SatResult::Unknown(reason) => {
                if solver.answers_queries() {
                    info!(depth, %reason, "LTL: unknown result");
                    return Ok(CheckResult::Unknown {
                        depth_reached: depth,
                        reason,
                        exhausted: false,
                    });
                }
                pending_unknown = Some(reason);
            }
        }
    }
    let exhausted = pending_unknown.is_none();
    Ok(CheckResult::Unknown {
        depth_reached: options.bound,
        reason: pending_unknown
            .unwrap_or_else(|| format!("no counterexample up to depth {}", options.bound)),
        exhausted,
    })
}

enum Reach {
    Found { depth: usize, witness: Witness },
    Exhausted { depth: usize },
    Unknown { depth: usize, reason: String },
}

/// Path layout of one search strategy.
///
/// Forward paths number states `0..=d` from the initial state. Backward
/// paths number them from the goal state, so step `d` is the initial one.
/// Zig-zag paths keep a forward prefix `0..=a` and a backward suffix
/// `b0..=bc` joined by a single transition.
struct Shape<'a> {
    unroller: &'a Unroller,
    strategy: Strategy,
    goal: Option<&'a Expr>,
}

impl Shape<'_> {
    fn goal_at(&self, step: &str) -> SmtTerm {
        match self.goal {
            Some(goal) => self.unroller.state(goal, step),
            None => SmtTerm::bool(true),
        }
    }

    fn zz_split(depth: usize) -> (usize, usize) {
        let a = depth / 2;
        (a, depth.saturating_sub(1).saturating_sub(a))
    }

    /// Declarations and constraints that stay valid for every deeper path.
    fn grow(&self, depth: usize) -> Grow {
        let u = self.unroller;
        match self.strategy {
            Strategy::Fwd | Strategy::Auto => {
                let s = fwd_step(depth);
                let link = if depth == 0 {
                    u.init(&s)
                } else {
                    u.trans(&fwd_step(depth - 1), &s)
                };
                Grow::new(u, vec![s.clone()], vec![u.frame(&s), link])
            }
            Strategy::Bwd => {
                let s = fwd_step(depth);
                let link = if depth == 0 {
                    self.goal_at(&s)
                } else {
                    u.trans(&s, &fwd_step(depth - 1))
                };
                Grow::new(u, vec![s.clone()], vec![u.frame(&s), link])
            }
            Strategy::Zz => {
                if depth == 0 {
                    let (f, b) = (fwd_step(0), bwd_step(0));
                    let terms = vec![u.frame(&f), u.init(&f), u.frame(&b), self.goal_at(&b)];
                    return Grow::new(u, vec![f, b], terms);
                }
                let (a, c) = Self::zz_split(depth);
                let (pa, pc) = if depth == 1 {
                    (0, 0)
                } else {
                    Self::zz_split(depth - 1)
                };
                if a > pa {
                    let s = fwd_step(a);
                    let terms = vec![u.frame(&s), u.trans(&fwd_step(a - 1), &s)];
                    Grow::new(u, vec![s], terms)
                } else if c > pc {
                    let s = bwd_step(c);
                    let terms = vec![u.frame(&s), u.trans(&s, &bwd_step(c - 1))];
                    Grow::new(u, vec![s], terms)
                } else {
                    Grow::new(u, Vec::new(), Vec::new())
                }
            }
        }
    }

    /// Constraint that closes a path of exactly `depth` transitions.
    fn query(&self, depth: usize) -> SmtTerm {
        let u = self.unroller;
        match self.strategy {
            Strategy::Fwd | Strategy::Auto => self.goal_at(&fwd_step(depth)),
            Strategy::Bwd => u.init(&fwd_step(depth)),
            Strategy::Zz if depth == 0 => u.steps_equal(&fwd_step(0), &bwd_step(0)),
            Strategy::Zz => {
                let (a, c) = Self::zz_split(depth);
                u.trans(&fwd_step(a), &bwd_step(c))
            }
        }
    }

    /// Step suffixes in execution order.
    fn steps(&self, depth: usize) -> Vec<String> {
        match self.strategy {
            Strategy::Fwd | Strategy::Auto => (0..=depth).map(fwd_step).collect(),
            Strategy::Bwd => (0..=depth).rev().map(fwd_step).collect(),
            Strategy::Zz if depth == 0 => vec![fwd_step(0)],
            Strategy::Zz => {
                let (a, c) = Self::zz_split(depth);
                (0..=a)
                    .map(fwd_step)
                    .chain((0..=c).rev().map(bwd_step))
                    .collect()
            }
        }
    }
}

/// One growth step: declarations for new states plus their constraints.
struct Grow {
    declarations: Vec<(String, SmtSort)>,
    terms: Vec<SmtTerm>,
}

impl Grow {
    fn new(u: &Unroller, steps: Vec<String>, terms: Vec<SmtTerm>) -> Self {
        Self {
            declarations: steps.iter().flat_map(|s| u.declarations(s)).collect(),
            terms,
        }
    }

    fn apply<S: SmtSolver>(&self, solver: &mut S) -> Result<(), S::Error> {
        for (name, sort) in &self.declarations {
            solver.declare_var(name, sort)?;
        }
        for term in &self.terms {
            solver.assert(term)?;
        }
        Ok(())
    }
}

fn var_refs(vars: &[(String, SmtSort)]) -> Vec<(&str, &SmtSort)> {
    vars.iter().map(|(n, s)| (n.as_str(), s)).collect()
}

fn reach<S: SmtSolver>(
    solver: &mut S,
    unroller: &Unroller,
    goal: &Expr,
    options: &BmcOptions,
) -> Result<Reach, S::Error> {
    let shape = Shape {
        unroller,
        strategy: options.strategy.resolve(),
        goal: Some(goal),
    };
    info!(
        strategy = %shape.strategy,
        bound = options.bound,
        incremental = options.incremental,
        "BMC: starting search"
    );
    solver.reset()?;
    let mut pending_unknown = None;
    for depth in 0..=options.bound {
        if options.incremental {
            shape.grow(depth).apply(solver)?;
        }
        if depth < options.bound_min {
            continue;
        }
        info!(depth, "BMC: checking depth");
        let query = shape.query(depth);
        if options.incremental {
            solver.push()?;
        } else {
            solver.reset()?;
            for d in 0..=depth {
                shape.grow(d).apply(solver)?;
            }
        }
        solver.assert(&query)?;
        let steps = shape.steps(depth);
        let vars = unroller.model_vars(&steps);
        let (result, model) = solver.check_sat_with_model(&var_refs(&vars))?;
        if options.incremental {
            solver.pop()?;
        }
        match result {
            SatResult::Sat => {
                let Some(model) = model else {
                    warn!(depth, "BMC: solver returned SAT without a model");
                    return Ok(Reach::Unknown {
                        depth,
                        reason: "solver returned SAT without a model".into(),
                    });
                };
                info!(depth, "BMC: target reached");
                return Ok(Reach::Found {
                    depth,
                    witness: unroller.witness(&model, &steps, None),
                });
            }
            SatResult::Unsat => debug!(depth, "BMC: target unreachable at this depth"),
            SatResult::Unknown(reason) => {
                if solver.answers_queries() {
                    info!(depth, %reason, "BMC: unknown result");
                    return Ok(Reach::Unknown { depth, reason });
                }
                pending_unknown = Some(reason);
            }
        }
    }
    Ok(match pending_unknown {
        Some(reason) => Reach::Unknown {
            depth: options.bound,
            reason,
        },
        None => {
            info!(bound = options.bound, "BMC: target unreachable up to bound");
            Reach::Exhausted {
                depth: options.bound,
            }
        }
    })
}

/// Run one non-incremental query over forward steps `0..=last`.
fn solve_once<S: SmtSolver>(
    solver: &mut S,
    unroller: &Unroller,
    last: usize,
    terms: &[SmtTerm],
) -> Result<(SatResult, Option<Witness>), S::Error> {
    solver.reset()?;
    let steps: Vec<String> = (0..=last).map(fwd_step).collect();
    let vars = unroller.model_vars(&steps);
    for (name, sort) in &vars {
        solver.declare_var(name, sort)?;
    }
    for step in &steps {
        solver.assert(&unroller.frame(step))?;
    }
    for term in terms {
        solver.assert(term)?;
    }
    let (result, model) = solver.check_sat_with_model(&var_refs(&vars))?;
    let witness = model.map(|m| unroller.witness(&m, &steps, None));
    Ok((result, witness))
}

fn path(unroller: &Unroller, last: usize) -> Vec<SmtTerm> {
    (0..last)
        .map(|i| unroller.trans(&fwd_step(i), &fwd_step(i + 1)))
        .collect()
}

/// Lemmas that are inductive invariants, each relative to those accepted
/// before it. Lemmas failing either check are dropped with a warning.
fn valid_lemmas<S: SmtSolver>(
    solver: &mut S,
    unroller: &Unroller,
) -> Result<Vec<Expr>, S::Error> {
    let (s0, s1) = (fwd_step(0), fwd_step(1));
    let mut accepted: Vec<Expr> = Vec::new();
    for lemma in unroller.lemmas() {
        let base = [unroller.init(&s0), unroller.state(lemma, &s0).not()];
        let (base_result, _) = solve_once(solver, unroller, 0, &base)?;
        if base_result != SatResult::Unsat {
            warn!(%lemma, ?base_result, "lemma does not hold initially; dropped");
            continue;
        }
        let mut step: Vec<SmtTerm> = accepted
            .iter()
            .map(|l| unroller.state(l, &s0))
            .collect();
        step.push(unroller.state(lemma, &s0));
        step.push(unroller.trans(&s0, &s1));
        step.push(unroller.state(lemma, &s1).not());
        let (step_result, _) = solve_once(solver, unroller, 1, &step)?;
        if step_result != SatResult::Unsat {
            warn!(%lemma, ?step_result, "lemma is not inductive; dropped");
            continue;
        }
        debug!(%lemma, "lemma accepted");
        accepted.push(lemma.clone());
    }
    Ok(accepted)
}

/// k-induction: for k = 0, 1, ..., check the base case at depth k, then
/// whether `k + 1` consecutive good states force a good successor.
fn prove<S: SmtSolver>(
    solver: &mut S,
    unroller: &Unroller,
    property: &Expr,
    options: &BmcOptions,
) -> Result<CheckResult, S::Error> {
    let lemmas = valid_lemmas(solver, unroller)?;
    for k in 0..=options.bound {
        info!(k, "k-induction: base check");
        let mut base = vec![unroller.init(&fwd_step(0))];
        base.extend(path(unroller, k));
        base.push(unroller.state(property, &fwd_step(k)).not());
        match solve_once(solver, unroller, k, &base)? {
            (SatResult::Sat, Some(witness)) => {
                info!(k, "k-induction: counterexample found");
                return Ok(CheckResult::Violated { depth: k, witness });
            }
            (SatResult::Sat, None) => {
                return Ok(CheckResult::Unknown {
                    depth_reached: k,
                    reason: "solver returned SAT without a model".into(),
                    exhausted: false,
                });
            }
            (SatResult::Unknown(reason), _) => {
                return Ok(CheckResult::Unknown {
                    depth_reached: k,
                    reason,
                    exhausted: false,
                });
            }
            (SatResult::Unsat, _) => {}
        }

        info!(k, "k-induction: step check");
        let mut step = path(unroller, k + 1);
        for i in 0..=k + 1 {
            let s = fwd_step(i);
            step.extend(lemmas.iter().map(|l| unroller.state(l, &s)));
            let p = unroller.state(property, &s);
            step.push(if i <= k { p } else { p.not() });
        }
        match solve_once(solver, unroller, k + 1, &step)?.0 {
            SatResult::Unsat => {
                info!(k, "k-induction: proved");
                return Ok(CheckResult::Holds {
                    depth: k,
                    witness: None,
                });
            }
            SatResult::Sat => debug!(k, "k-induction: not inductive at this k"),
            SatResult::Unknown(reason) => {
                return Ok(CheckResult::Unknown {
                    depth_reached: k,
                    reason,
                    exhausted: false,
                });
            }
        }
    }
    Ok(CheckResult::Unknown {
        depth_reached: options.bound,
        reason: format!("not {}-inductive", options.bound + 1),
        exhausted: true,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io;
    use tern_ir::{Hts, Sort, TransitionSystem, VarDecl};

    use crate::solver::Model;

    /// Answers every query SAT but never produces a model.
    struct ModelLess {
        checks: usize,
    }

    impl SmtSolver for ModelLess {
        type Error = io::Error;

        fn declare_var(&mut self, _name: &str, _sort: &SmtSort) -> Result<(), Self::Error> {
            Ok(())
        }

        fn assert(&mut self, _term: &SmtTerm) -> Result<(), Self::Error> {
            Ok(())
        }

        fn push(&mut self) -> Result<(), Self::Error> {
            Ok(())
        }

        fn pop(&mut self) -> Result<(), Self::Error> {
            Ok(())
        }

        fn check_sat(&mut self) -> Result<SatResult, Self::Error> {
            Ok(SatResult::Sat)
        }

        fn check_sat_with_model(
            &mut self,
            _var_names: &[(&str, &SmtSort)],
        ) -> Result<(SatResult, Option<Model>), Self::Error> {
            self.checks += 1;
            Ok((SatResult::Sat, None))
        }

        fn reset(&mut self) -> Result<(), Self::Error> {
            Ok(())
        }
    }

    fn unroller() -> Unroller {
        let mut ts = TransitionSystem::new("t");
        ts.declare(VarDecl::state("x", Sort::BitVec(2))).unwrap();
        ts.add_init(Expr::var("x").eq(Expr::int(0)));
        let mut hts = Hts::new("t");
        hts.add_ts(ts).unwrap();
        Unroller::new(&hts).unwrap()
    }

    #[test]
    fn sat_without_model_is_inconclusive() {
        let u = unroller();
        let options = BmcOptions {
            bound: 3,
            ..BmcOptions::default()
        };
        let mut solver = ModelLess { checks: 0 };
        let result = check_safety(&mut solver, &u, &Expr::var("x").lt(Expr::int(2)), &options).unwrap();
        assert_eq!(
            result,
            CheckResult::Unknown {
                depth_reached: 0,
                reason: "solver returned SAT without a model".into(),
                exhausted: false,
            }
        );
        assert_eq!(solver.checks, 1);

        let result = simulate(&mut solver, &u, &Expr::tt(), &options).unwrap();
        assert!(matches!(
            result,
            CheckResult::Unknown { depth_reached: 3, exhausted: false, .. }
        ));
    }

    #[test]
    fn strategy_names_parse_case_insensitively() {
        assert_eq!("zz".parse::<Strategy>(), Ok(Strategy::Zz));
        assert_eq!(Strategy::Bwd.to_string(), "BWD");
        assert!("sideways".parse::<Strategy>().is_err());
    }
}
