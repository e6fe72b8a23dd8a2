// Command handler for: Problems
//
// Loads a JSON problem set and solves it with the command-line defaults.

use tern_engine::{ErrorPolicy, ProblemSet, ProblemSolver};

use super::helpers::solve_and_report;
use crate::cli::ProblemsArgs;

/// Handler for the `problems` subcommand.
pub(crate) fn run_problems_command(args: ProblemsArgs) -> miette::Result<()> {
    let mut set = ProblemSet::load(&args.file)?;
    let policy = if args.stop_on_error {
        ErrorPolicy::Abort
    } else {
        ErrorPolicy::Continue
    };
    let mut solver = ProblemSolver::new().with_policy(policy);
    solve_and_report(&mut solver, &mut set, &args.run.defaults(), args.run.format)?;
    Ok(())
}
