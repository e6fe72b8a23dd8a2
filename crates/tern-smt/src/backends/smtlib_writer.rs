//! SMT-LIB2 query recording.

use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::Path;

use crate::backends::smtlib_printer::{sort_to_smtlib, symbol, to_smtlib};
use crate::solver::{Model, SatResult, SmtSolver};
use crate::sorts::SmtSort;
use crate::terms::SmtTerm;

/// Text sink receiving one SMT-LIB2 command per line.
pub struct SmtLibScript {
    out: Box<dyn Write + Send>,
}

impl SmtLibScript {
    pub fn new(out: Box<dyn Write + Send>) -> Self {
        Self { out }
    }

    pub fn create(path: &Path) -> io::Result<Self> {
        let file = File::create(path)?;
        let mut script = Self::new(Box::new(BufWriter::new(file)));
        script.command("(set-logic QF_NIA)")?;
        Ok(script)
    }

    pub fn command(&mut self, cmd: &str) -> io::Result<()> {
        writeln!(self.out, "{cmd}")
    }

    pub fn comment(&mut self, text: &str) -> io::Result<()> {
        writeln!(self.out, "; {text}")
    }

    fn declare(&mut self, name: &str, sort: &SmtSort) -> io::Result<()> {
        self.command(&format!(
            "(declare-fun {} () {})",
            symbol(name),
            sort_to_smtlib(sort)
        ))
    }

    fn assert(&mut self, term: &SmtTerm) -> io::Result<()> {
        self.command(&format!("(assert {})", to_smtlib(term)))
    }

    pub fn flush(&mut self) -> io::Result<()> {
        self.out.flush()
    }
}

/// Backend that writes every query to a script and answers nothing.
///
/// Every `check-sat` reports `Unknown`, so checking loops record the full
/// query sequence up to the bound.
pub struct SmtLibWriter {
    script: SmtLibScript,
}

impl SmtLibWriter {
    pub fn new(script: SmtLibScript) -> Self {
        Self { script }
    }
}

impl SmtSolver for SmtLibWriter {
    type Error = io::Error;

    fn declare_var(&mut self, name: &str, sort: &SmtSort) -> io::Result<()> {
        self.script.declare(name, sort)
    }

    fn assert(&mut self, term: &SmtTerm) -> io::Result<()> {
        self.script.assert(term)
    }

    fn push(&mut self) -> io::Result<()> {
        self.script.command("(push 1)")
    }

    fn pop(&mut self) -> io::Result<()> {
        self.script.command("(pop 1)")
    }

    fn check_sat(&mut self) -> io::Result<SatResult> {
        self.script.command("(check-sat)")?;
        self.script.flush()?;
        Ok(SatResult::Unknown("solving skipped".into()))
    }

    fn check_sat_with_model(
        &mut self,
        _var_names: &[(&str, &SmtSort)],
    ) -> io::Result<(SatResult, Option<Model>)> {
        Ok((self.check_sat()?, None))
    }

    fn reset(&mut self) -> io::Result<()> {
        self.script.command("(reset)")?;
        self.script.command("(set-logic QF_NIA)")
    }

    fn answers_queries(&self) -> bool {
        false
    }
}

/// Forwards every command to `inner` and also records it to a script.
pub struct Tee<S> {
    inner: S,
    script: SmtLibScript,
}

impl<S> Tee<S> {
    pub fn new(inner: S, script: SmtLibScript) -> Self {
        Self { inner, script }
    }

    pub fn into_inner(self) -> S {
        self.inner
    }
}

impl<S> SmtSolver for Tee<S>
where
    S: SmtSolver,
    S::Error: From<io::Error>,
{
    type Error = S::Error;

    fn declare_var(&mut self, name: &str, sort: &SmtSort) -> Result<(), S::Error> {
        self.script.declare(name, sort)?;
        self.inner.declare_var(name, sort)
    }

    fn assert(&mut self, term: &SmtTerm) -> Result<(), S::Error> {
        self.script.assert(term)?;
        self.inner.assert(term)
    }

    fn push(&mut self) -> Result<(), S::Error> {
        self.script.command("(push 1)")?;
        self.inner.push()
    }

    fn pop(&mut self) -> Result<(), S::Error> {
        self.script.command("(pop 1)")?;
        self.inner.pop()
    }

    fn check_sat(&mut self) -> Result<SatResult, S::Error> {
        self.script.command("(check-sat)")?;
        let result = self.inner.check_sat()?;
        self.script.comment(&format!("result: {result:?}"))?;
        self.script.flush()?;
        Ok(result)
    }

    fn check_sat_with_model(
        &mut self,
        var_names: &[(&str, &SmtSort)],
    ) -> Result<(SatResult, Option<Model>), S::Error> {
        self.script.command("(check-sat)")?;
        let (result, model) = self.inner.check_sat_with_model(var_names)?;
        self.script.comment(&format!("result: {result:?}"))?;
        self.script.flush()?;
        Ok((result, model))
    }

    fn reset(&mut self) -> Result<(), S::Error> {
        self.script.command("(reset)")?;
        self.script.command("(set-logic QF_NIA)")?;
        self.inner.reset()
    }

    fn answers_queries(&self) -> bool {
        self.inner.answers_queries()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    #[derive(Clone, Default)]
    struct SharedBuf(Arc<Mutex<Vec<u8>>>);

    impl Write for SharedBuf {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }
        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    impl SharedBuf {
        fn text(&self) -> String {
            String::from_utf8(self.0.lock().unwrap().clone()).unwrap()
        }
    }

    #[test]
    fn writer_records_commands_and_reports_unknown() {
        let buf = SharedBuf::default();
        let mut writer = SmtLibWriter::new(SmtLibScript::new(Box::new(buf.clone())));
        writer.declare_var("x@0", &SmtSort::Int).unwrap();
        writer
            .assert(&SmtTerm::var("x@0").ge(SmtTerm::int(0)))
            .unwrap();
        writer.push().unwrap();
        assert!(matches!(writer.check_sat().unwrap(), SatResult::Unknown(_)));
        writer.pop().unwrap();
        assert!(!writer.answers_queries());
        assert_eq!(
            buf.text(),
            "(declare-fun x@0 () Int)\n(assert (>= x@0 0))\n(push 1)\n(check-sat)\n(pop 1)\n"
        );
    }

    #[test]
    fn script_file_starts_with_logic() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("q.smt2");
        let mut writer = SmtLibWriter::new(SmtLibScript::create(&path).unwrap());
        writer.declare_var("b@1", &SmtSort::Bool).unwrap();
        writer.check_sat().unwrap();
        let text = std::fs::read_to_string(&path).unwrap();
        assert!(text.starts_with("(set-logic QF_NIA)\n(declare-fun b@1 () Bool)"));
    }

    #[test]
    fn tee_forwards_to_the_inner_solver() {
        let buf = SharedBuf::default();
        let inner = SmtLibWriter::new(SmtLibScript::new(Box::new(io::sink())));
        let mut tee = Tee::new(inner, SmtLibScript::new(Box::new(buf.clone())));
        tee.declare_var("y", &SmtSort::Int).unwrap();
        assert!(matches!(tee.check_sat().unwrap(), SatResult::Unknown(_)));
        assert!(!tee.answers_queries());
        assert!(buf.text().contains("(declare-fun y () Int)\n(check-sat)\n; result:"));
    }
}
