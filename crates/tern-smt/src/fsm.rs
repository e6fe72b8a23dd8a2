//! Determinism of a transition system's state machine.
//!
//! A system is deterministic when `init` fixes a single initial state and
//! every state and input valuation has at most one successor state. Inputs
//! are not compared, and the check ranges over every state allowed by
//! `invar`, reachable or not.

use std::fmt;

use tracing::{debug, info, warn};

use crate::encoder::{alt_step, fwd_step, Unroller};
use crate::solver::{SatResult, SmtSolver};
use crate::sorts::SmtSort;
use crate::terms::SmtTerm;
use crate::witness::Witness;

/// Where two executions first part ways.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Branching {
    Init,
    Trans,
}

impl fmt::Display for Branching {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Branching::Init => f.write_str("initial state"),
            Branching::Trans => f.write_str("transition"),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Determinism {
    Deterministic,
    /// Two executions that agree up to the last step and then differ in
    /// some state variable.
    Nondeterministic {
        at: Branching,
        first: Witness,
        second: Witness,
    },
    Unknown { reason: String },
}

impl Determinism {
    pub fn is_deterministic(&self) -> bool {
        matches!(self, Determinism::Deterministic)
    }
}

pub fn check_determinism<S: SmtSolver>(
    solver: &mut S,
    unroller: &Unroller,
) -> Result<Determinism, S::Error> {
    let (s0, a0) = (fwd_step(0), alt_step(0));
    info!("FSM: checking initial states");
    let init = [
        unroller.init(&s0),
        unroller.init(&a0),
        unroller.states_differ(&s0, &a0),
    ];
    let outcome = branch(solver, unroller, Branching::Init, &[s0.clone()], &[a0], &init)?;
    if !outcome.is_deterministic() {
        return Ok(outcome);
    }

    let (s1, a1) = (fwd_step(1), alt_step(1));
    info!("FSM: checking transitions");
    let trans = [
        unroller.trans(&s0, &s1),
        unroller.trans(&s0, &a1),
        unroller.states_differ(&s1, &a1),
    ];
    branch(
        solver,
        unroller,
        Branching::Trans,
        &[s0.clone(), s1],
        &[s0, a1],
        &trans,
    )
}

/// Look for two paths over `first` and `second` that satisfy `terms`.
fn branch<S: SmtSolver>(
    solver: &mut S,
    unroller: &Unroller,
    at: Branching,
    first: &[String],
    second: &[String],
    terms: &[SmtTerm],
) -> Result<Determinism, S::Error> {
    solver.reset()?;
    let mut steps: Vec<String> = first.to_vec();
    for step in second {
        if !steps.contains(step) {
            steps.push(step.clone());
        }
    }
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
    let refs: Vec<(&str, &SmtSort)> = vars.iter().map(|(n, s)| (n.as_str(), s)).collect();
    let (result, model) = solver.check_sat_with_model(&refs)?;
    Ok(match (result, model) {
        (SatResult::Unsat, _) => {
            debug!(%at, "FSM: no branching");
            Determinism::Deterministic
        }
        (SatResult::Sat, Some(model)) => {
            info!(%at, "FSM: nondeterministic");
            Determinism::Nondeterministic {
                at,
                first: unroller.witness(&model, first, None),
                second: unroller.witness(&model, second, None),
            }
        }
        (SatResult::Sat, None) => {
            warn!(%at, "FSM: solver returned SAT without a model");
            Determinism::Unknown {
                reason: "solver returned SAT without a model".into(),
            }
        }
        (SatResult::Unknown(reason), _) => Determinism::Unknown { reason },
    })
}
