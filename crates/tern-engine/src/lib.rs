#![doc = include_str!("../README.md")]

//! Tern problem orchestration.
//!
//! Problem sets name a model, a list of problems over it and the options
//! each check runs with. The engine parses the model once per
//! symbolic-init mode, resolves each problem's properties, dispatches the
//! bounded check, and records status, depth and traces on the problem.

pub mod checker;
pub mod config;
pub mod miter;
pub mod problem;
pub mod problem_set;
pub mod report;
pub mod solver;
pub mod trace;

pub use checker::{CheckError, ModelChecker, SmtChecker};
pub use config::{resolve_config, BatchDefaults, ProblemOverrides, VerificationConfig};
pub use miter::{build_miter, second_system_name, EquivalenceVerdict, Miter, MiterError};
pub use problem::{
    FormulaRef, Problem, ProblemState, Property, ResolutionError, ResolvedProperties, Status,
    VerificationKind,
};
pub use problem_set::{ProblemSet, ProblemSetError};
pub use report::{trace_paths, write_traces, BatchReport, ReportLine};
pub use solver::{parse_models, EngineError, ErrorPolicy, FsmReport, ProblemSolver, FSM_CHECK};
pub use trace::{render_text, render_trace, render_vcd, Trace};
