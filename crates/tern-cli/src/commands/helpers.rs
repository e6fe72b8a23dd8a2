// Shared helpers for the CLI command handlers: solving a prepared problem
// set, materializing traces and printing the summary.

use miette::IntoDiagnostic;
use tern_engine::{
    write_traces, BatchDefaults, BatchReport, ModelChecker, ProblemSet, ProblemSolver,
};
use tern_smt::Determinism;
use tracing::{info, warn};

use crate::cli::OutputFormat;

/// Solve `set`, write its traces and print the summary in `format`.
pub(crate) fn solve_and_report<C: ModelChecker>(
    solver: &mut ProblemSolver<C>,
    set: &mut ProblemSet,
    defaults: &BatchDefaults,
    format: OutputFormat,
) -> miette::Result<BatchReport> {
    if defaults.vcd && defaults.prefix.is_none() {
        warn!("--vcd has no effect without --prefix");
    }
    solver.solve_problems(set, defaults)?;
    let written = write_traces(&set.problems, defaults.prefix.as_deref())?;
    if !written.is_empty() {
        info!(files = written.len(), "traces written");
    }
    let report = BatchReport::from_problems(&set.problems);
    println!("{}", render(&report, format)?);
    Ok(report)
}

/// Run the determinism check on the first system of `set` and print the
/// verdict followed by both diverging executions.
pub(crate) fn report_determinism<C: ModelChecker>(
    solver: &mut ProblemSolver<C>,
    set: &ProblemSet,
    defaults: &BatchDefaults,
) -> miette::Result<Determinism> {
    let report = solver.check_determinism(set, defaults)?;
    println!("{}", determinism_line(&report.outcome));
    for trace in &report.traces {
        println!("{}", trace.text);
    }
    Ok(report.outcome)
}

fn determinism_line(outcome: &Determinism) -> String {
    match outcome {
        Determinism::Deterministic => "FSM check: deterministic".to_string(),
        Determinism::Nondeterministic { at, .. } => format!("FSM check: nondeterministic {at}"),
        Determinism::Unknown { reason } => format!("FSM check: unknown ({reason})"),
    }
}

pub(crate) fn render(report: &BatchReport, format: OutputFormat) -> miette::Result<String> {
    match format {
        OutputFormat::Text => Ok(report.render()),
        OutputFormat::Json => report.to_json().into_diagnostic(),
    }
}
