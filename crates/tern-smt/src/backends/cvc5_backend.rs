use std::collections::HashMap;
use std::io::{BufRead, BufReader, Write};
use std::process::{Child, ChildStderr, ChildStdin, ChildStdout, Command, Stdio};

use thiserror::Error;
use tracing::debug;

use crate::backends::smtlib_printer::{sort_to_smtlib, symbol, to_smtlib};
use crate::solver::{Model, ModelValue, SatResult, SmtSolver};
use crate::sorts::SmtSort;
use crate::terms::SmtTerm;

const LOGIC: &str = "(set-logic QF_NIA)";

#[derive(Debug, Error)]
pub enum Cvc5Error {
    #[error("cvc5 I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("cvc5 not found: {0}")]
    NotFound(String),
    #[error("cvc5 error: {0}")]
    SolverError(String),
}

/// cvc5 driven as a subprocess over its SMT-LIB2 text interface.
pub struct Cvc5Solver {
    child: Child,
    stdin: ChildStdin,
    stdout: BufReader<ChildStdout>,
    stderr: BufReader<ChildStderr>,
}

impl Cvc5Solver {
    pub fn new() -> Result<Self, Cvc5Error> {
        Self::with_command_and_timeout("cvc5", None)
    }

    pub fn with_timeout_secs(timeout_secs: u64) -> Result<Self, Cvc5Error> {
        let timeout_ms = (timeout_secs > 0).then(|| timeout_secs.saturating_mul(1000));
        Self::with_command_and_timeout("cvc5", timeout_ms)
    }

    pub fn with_command_and_timeout(cmd: &str, timeout_ms: Option<u64>) -> Result<Self, Cvc5Error> {
        let mut args = vec![
            "--lang".to_string(),
            "smt2".to_string(),
            "--incremental".to_string(),
            "--produce-models".to_string(),
        ];
        if let Some(ms) = timeout_ms {
            args.push(format!("--tlimit-per={ms}"));
        }

        let mut child = Command::new(cmd)
            .args(&args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| Cvc5Error::NotFound(format!("{cmd}: {e}")))?;
        debug!(cmd, ?args, "spawned cvc5");

        let stdin = child
            .stdin
            .take()
            .ok_or_else(|| Cvc5Error::SolverError("failed to capture cvc5 stdin".into()))?;
        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| Cvc5Error::SolverError("failed to capture cvc5 stdout".into()))?;
        let stderr = child
            .stderr
            .take()
            .ok_or_else(|| Cvc5Error::SolverError("failed to capture cvc5 stderr".into()))?;

        let mut solver = Self {
            child,
            stdin,
            stdout: BufReader::new(stdout),
            stderr: BufReader::new(stderr),
        };
        solver.send_command_no_response(LOGIC)?;
        Ok(solver)
    }

    fn send_command(&mut self, cmd: &str) -> Result<String, Cvc5Error> {
        self.send_command_no_response(cmd)?;
        let mut response = String::new();
        self.stdout.read_line(&mut response)?;
        if response.is_empty() {
            let mut stderr = String::new();
            let _ = self.stderr.read_line(&mut stderr);
            return Err(Cvc5Error::SolverError(format!(
                "no response from cvc5 for `{cmd}`: {}",
                stderr.trim()
            )));
        }
        Ok(response.trim_end().to_string())
    }

    fn send_command_no_response(&mut self, cmd: &str) -> Result<(), Cvc5Error> {
        writeln!(self.stdin, "{cmd}")?;
        self.stdin.flush()?;
        Ok(())
    }
}

impl Drop for Cvc5Solver {
    fn drop(&mut self) {
        let _ = writeln!(self.stdin, "(exit)");
        let _ = self.stdin.flush();
        let _ = self.child.wait();
    }
}

impl SmtSolver for Cvc5Solver {
    type Error = Cvc5Error;

    fn declare_var(&mut self, name: &str, sort: &SmtSort) -> Result<(), Cvc5Error> {
        self.send_command_no_response(&format!(
            "(declare-const {} {})",
            symbol(name),
            sort_to_smtlib(sort)
        ))
    }

    fn assert(&mut self, term: &SmtTerm) -> Result<(), Cvc5Error> {
        self.send_command_no_response(&format!("(assert {})", to_smtlib(term)))
    }

    fn push(&mut self) -> Result<(), Cvc5Error> {
        self.send_command_no_response("(push 1)")
    }

    fn pop(&mut self) -> Result<(), Cvc5Error> {
        self.send_command_no_response("(pop 1)")
    }

    fn check_sat(&mut self) -> Result<SatResult, Cvc5Error> {
        let response = self.send_command("(check-sat)")?;
        match response.as_str() {
            "sat" => Ok(SatResult::Sat),
            "unsat" => Ok(SatResult::Unsat),
            "unknown" => Ok(SatResult::Unknown("cvc5 returned unknown".into())),
            other => Err(Cvc5Error::SolverError(other.to_string())),
        }
    }

    fn check_sat_with_model(
        &mut self,
        var_names: &[(&str, &SmtSort)],
    ) -> Result<(SatResult, Option<Model>), Cvc5Error> {
        let result = self.check_sat()?;
        if result != SatResult::Sat {
            return Ok((result, None));
        }
        let mut values = HashMap::new();
        for &(name, sort) in var_names {
            let response = self.send_command(&format!("(get-value ({}))", symbol(name)))?;
            if let Some(val) = parse_cvc5_value(&response, sort) {
                values.insert(name.to_string(), val);
            }
        }
        Ok((SatResult::Sat, Some(Model { values })))
    }

    fn reset(&mut self) -> Result<(), Cvc5Error> {
        self.send_command_no_response("(reset)")?;
        self.send_command_no_response(LOGIC)
    }
}

/// Parse a `((name value))` response; the value is the last token group.
fn parse_cvc5_value(response: &str, sort: &SmtSort) -> Option<ModelValue> {
    let inner = response.trim().strip_prefix("((")?.strip_suffix("))")?;
    let val_str = if let Some(rest) = inner.strip_prefix('|') {
        rest.split_once('|')?.1
    } else {
        inner.split_once(char::is_whitespace)?.1
    }
    .trim();

    match sort {
        SmtSort::Int => match val_str.strip_prefix("(- ") {
            Some(neg) => neg
                .trim_end_matches(')')
                .trim()
                .parse::<i64>()
                .ok()
                .map(|n| ModelValue::Int(-n)),
            None => val_str.parse::<i64>().ok().map(ModelValue::Int),
        },
        SmtSort::Bool => match val_str {
            "true" => Some(ModelValue::Bool(true)),
            "false" => Some(ModelValue::Bool(false)),
            _ => None,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_cvc5_int_value() {
        assert_eq!(
            parse_cvc5_value("((x@0 42))", &SmtSort::Int),
            Some(ModelValue::Int(42))
        );
    }

    #[test]
    fn parse_cvc5_negative_int_value() {
        assert_eq!(
            parse_cvc5_value("((x (- 7)))", &SmtSort::Int),
            Some(ModelValue::Int(-7))
        );
    }

    #[test]
    fn parse_cvc5_bool_value() {
        assert_eq!(
            parse_cvc5_value("((b true))", &SmtSort::Bool),
            Some(ModelValue::Bool(true))
        );
        assert_eq!(
            parse_cvc5_value("((b false))", &SmtSort::Bool),
            Some(ModelValue::Bool(false))
        );
    }

    #[test]
    fn parse_cvc5_quoted_symbol_value() {
        assert_eq!(
            parse_cvc5_value("((|0 odd| 5))", &SmtSort::Int),
            Some(ModelValue::Int(5))
        );
        assert_eq!(parse_cvc5_value("garbage", &SmtSort::Int), None);
    }
}
