//! Concrete solver backends and the run-time backend selection.

pub mod cvc5_backend;
pub mod smtlib_printer;
pub mod smtlib_writer;
pub mod z3_backend;

use std::io;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use crate::solver::{Model, SatResult, SmtSolver};
use crate::sorts::SmtSort;
use crate::terms::SmtTerm;

pub use cvc5_backend::{Cvc5Error, Cvc5Solver};
pub use smtlib_writer::{SmtLibScript, SmtLibWriter, Tee};
pub use z3_backend::{Z3Error, Z3Solver};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SolverKind {
    #[default]
    Z3,
    Cvc5,
}

impl std::str::FromStr for SolverKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "z3" => Ok(SolverKind::Z3),
            "cvc5" => Ok(SolverKind::Cvc5),
            other => Err(format!("unknown solver '{other}' (expected z3 or cvc5)")),
        }
    }
}

#[derive(Debug, Error)]
pub enum BackendError {
    #[error(transparent)]
    Z3(#[from] Z3Error),
    #[error(transparent)]
    Cvc5(#[from] Cvc5Error),
    #[error("SMT-LIB trace I/O error: {0}")]
    Io(#[from] io::Error),
}

/// How to build a [`Backend`] for one check.
#[derive(Debug, Clone, Default)]
pub struct BackendOptions {
    pub kind: SolverKind,
    pub timeout_secs: u64,
    /// Record every query to this file.
    pub smt2_file: Option<PathBuf>,
    /// Record queries without solving them.
    pub skip_solving: bool,
}

/// Run-time selected solver.
pub enum Backend {
    Z3(Z3Solver),
    Cvc5(Cvc5Solver),
    Record(SmtLibWriter),
    Traced(Box<Tee<Backend>>),
}

impl Backend {
    pub fn open(options: &BackendOptions) -> Result<Self, BackendError> {
        if options.skip_solving {
            let script = match &options.smt2_file {
                Some(path) => SmtLibScript::create(path)?,
                None => SmtLibScript::new(Box::new(io::sink())),
            };
            debug!(file = ?options.smt2_file, "recording queries without solving");
            return Ok(Backend::Record(SmtLibWriter::new(script)));
        }
        let solver = match options.kind {
            SolverKind::Z3 => Backend::Z3(Z3Solver::with_timeout_secs(options.timeout_secs)),
            SolverKind::Cvc5 => Backend::Cvc5(Cvc5Solver::with_timeout_secs(options.timeout_secs)?),
        };
        match &options.smt2_file {
            Some(path) => {
                debug!(file = %path.display(), "tracing solver queries");
                Ok(Backend::Traced(Box::new(Tee::new(
                    solver,
                    SmtLibScript::create(path)?,
                ))))
            }
            None => Ok(solver),
        }
    }
}

macro_rules! dispatch {
    ($self:ident, $s:ident => $body:expr) => {
        match $self {
            Backend::Z3($s) => $body.map_err(BackendError::from),
            Backend::Cvc5($s) => $body.map_err(BackendError::from),
            Backend::Record($s) => $body.map_err(BackendError::from),
            Backend::Traced($s) => $body,
        }
    };
}

impl SmtSolver for Backend {
    type Error = BackendError;

    fn declare_var(&mut self, name: &str, sort: &SmtSort) -> Result<(), BackendError> {
        dispatch!(self, s => s.declare_var(name, sort))
    }

    fn assert(&mut self, term: &SmtTerm) -> Result<(), BackendError> {
        dispatch!(self, s => s.assert(term))
    }

    fn push(&mut self) -> Result<(), BackendError> {
        dispatch!(self, s => s.push())
    }

    fn pop(&mut self) -> Result<(), BackendError> {
        dispatch!(self, s => s.pop())
    }

    fn check_sat(&mut self) -> Result<SatResult, BackendError> {
        dispatch!(self, s => s.check_sat())
    }

    fn check_sat_with_model(
        &mut self,
        var_names: &[(&str, &SmtSort)],
    ) -> Result<(SatResult, Option<Model>), BackendError> {
        dispatch!(self, s => s.check_sat_with_model(var_names))
    }

    fn reset(&mut self) -> Result<(), BackendError> {
        dispatch!(self, s => s.reset())
    }

    fn answers_queries(&self) -> bool {
        match self {
            Backend::Z3(_) | Backend::Cvc5(_) => true,
            Backend::Record(_) => false,
            Backend::Traced(tee) => tee.answers_queries(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn solver_kind_parses_case_insensitively() {
        assert_eq!("Z3".parse::<SolverKind>(), Ok(SolverKind::Z3));
        assert_eq!("cvc5".parse::<SolverKind>(), Ok(SolverKind::Cvc5));
        assert!("yices".parse::<SolverKind>().is_err());
    }

    #[test]
    fn skip_solving_opens_a_recorder() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("dump.smt2");
        let mut backend = Backend::open(&BackendOptions {
            smt2_file: Some(path.clone()),
            skip_solving: true,
            ..BackendOptions::default()
        })
        .unwrap();
        assert!(!backend.answers_queries());
        backend.declare_var("x@0", &SmtSort::Int).unwrap();
        assert!(matches!(backend.check_sat().unwrap(), SatResult::Unknown(_)));
        assert!(std::fs::read_to_string(path).unwrap().contains("x@0"));
    }

    #[test]
    fn traced_z3_still_answers() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("trace.smt2");
        let mut backend = Backend::open(&BackendOptions {
            smt2_file: Some(path.clone()),
            ..BackendOptions::default()
        })
        .unwrap();
        assert!(backend.answers_queries());
        backend.declare_var("x", &SmtSort::Int).unwrap();
        backend
            .assert(&SmtTerm::var("x").eq(SmtTerm::int(3)))
            .unwrap();
        assert_eq!(backend.check_sat().unwrap(), SatResult::Sat);
        let text = std::fs::read_to_string(path).unwrap();
        assert!(text.contains("(assert (= x 3))"));
        assert!(text.contains("; result: Sat"));
    }
}
