// Command handler for: Verify
//
// Builds an in-memory problem set with one problem per property over the
// given model list and solves it, after the optional determinism check.

use std::path::Path;

use miette::IntoDiagnostic;
use tern_dsl::resolve_reference;
use tern_engine::{FormulaRef, Problem, ProblemSet, ProblemSolver, VerificationKind};
use tracing::info;

use super::helpers::{report_determinism, solve_and_report};
use crate::cli::VerifyArgs;

/// Handler for the `verify` subcommand.
pub(crate) fn run_verify_command(args: VerifyArgs) -> miette::Result<()> {
    let cwd = std::env::current_dir().into_diagnostic()?;
    let mut set = build_problem_set(&args, &cwd)?;
    let defaults = args.run.defaults();
    let mut solver = ProblemSolver::new();

    if let Some(path) = &args.snapshot {
        solver.save_snapshot(&set, defaults.symbolic_init, path)?;
        info!(file = %path.display(), "snapshot written");
    }

    if args.fsm_check {
        report_determinism(&mut solver, &set, &defaults)?;
        if set.problems.is_empty() {
            return Ok(());
        }
    }
    solve_and_report(&mut solver, &mut set, &defaults, args.run.format)?;
    Ok(())
}

/// One problem per property, named by position. Equivalence and simulation
/// runs without properties get a single problem; a plain `--fsm-check`
/// run gets none.
pub(crate) fn build_problem_set(args: &VerifyArgs, cwd: &Path) -> miette::Result<ProblemSet> {
    let verification = args.kind.verification();
    let mut set = ProblemSet::new(cwd, args.input.clone());
    set.boolean = args.boolean;
    set.equivalence = args.kind.equivalence.clone();

    let formulas: Vec<FormulaRef> = match (&args.properties, verification) {
        (Some(outputs), VerificationKind::Equivalence) => vec![FormulaRef::Text(outputs.clone())],
        (Some(properties), _) => resolve_reference(properties, cwd)?
            .into_iter()
            .map(|formula| FormulaRef::List(vec![formula]))
            .collect(),
        (None, _) => Vec::new(),
    };

    if formulas.is_empty() {
        if args.fsm_check && verification == VerificationKind::Safety {
            return Ok(set);
        }
        if !matches!(
            verification,
            VerificationKind::Simulation | VerificationKind::Equivalence
        ) {
            return Err(miette::miette!(
                help = "pass properties with -p, inline or as a file",
                "{verification} checking needs at least one property"
            ));
        }
        set.push(problem(verification, "1", None, args));
    }
    for (i, formula) in formulas.into_iter().enumerate() {
        set.push(problem(verification, &(i + 1).to_string(), Some(formula), args));
    }
    Ok(set)
}

fn problem(
    verification: VerificationKind,
    name: &str,
    formula: Option<FormulaRef>,
    args: &VerifyArgs,
) -> Problem {
    let mut problem = Problem::new(name, verification);
    if let Some(formula) = formula {
        problem.description = formula.to_string();
        problem.formula = Some(formula);
    }
    problem.assumptions = args.assumptions.as_deref().map(FormulaRef::from);
    problem.lemmas = args.lemmas.as_deref().map(FormulaRef::from);
    problem
}
