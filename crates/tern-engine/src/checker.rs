//! The bounded-checking seam between the orchestrator and the solvers.

use miette::Diagnostic;
use thiserror::Error;
use tern_ir::{Expr, Hts, LtlFormula};
use tern_smt::{
    check_determinism, check_ltl, check_safety, simulate, Backend, BackendError, CheckResult,
    Determinism, EncodeError, Unroller,
};
use tracing::debug;

use crate::config::VerificationConfig;

#[derive(Debug, Error, Diagnostic)]
pub enum CheckError {
    #[error("encoding error: {0}")]
    #[diagnostic(code(tern::check::encode))]
    Encode(#[from] EncodeError),

    #[error("solver error: {0}")]
    #[diagnostic(code(tern::check::solver))]
    Backend(#[from] BackendError),
}

/// Bounded checks over one system.
pub trait ModelChecker {
    /// Look for a violation of the invariant `property`.
    fn safety(
        &mut self,
        hts: &Hts,
        property: &Expr,
        config: &VerificationConfig,
    ) -> Result<CheckResult, CheckError>;

    /// Look for an execution ending in a state satisfying `target`.
    fn simulate(
        &mut self,
        hts: &Hts,
        target: &Expr,
        config: &VerificationConfig,
    ) -> Result<CheckResult, CheckError>;

    /// Look for a bounded counterexample to `formula`.
    fn ltl(
        &mut self,
        hts: &Hts,
        formula: &LtlFormula,
        config: &VerificationConfig,
    ) -> Result<CheckResult, CheckError>;

    /// Look for two executions that part ways at init or in one transition.
    fn determinism(&mut self, hts: &Hts, config: &VerificationConfig) -> Result<Determinism, CheckError>;
}

/// [`ModelChecker`] backed by the tern SMT layer. Opens a fresh backend per
/// check.
#[derive(Debug, Default, Clone, Copy)]
pub struct SmtChecker;

impl SmtChecker {
    fn prepare(hts: &Hts, config: &VerificationConfig) -> Result<(Unroller, Backend), CheckError> {
        let unroller = Unroller::new(hts)?;
        let backend = Backend::open(&config.backend_options())?;
        debug!(
            system = %hts.name,
            solver = ?config.solver,
            vars = unroller.vars().len(),
            "prepared check"
        );
        Ok((unroller, backend))
    }
}

impl ModelChecker for SmtChecker {
    fn safety(
        &mut self,
        hts: &Hts,
        property: &Expr,
        config: &VerificationConfig,
    ) -> Result<CheckResult, CheckError> {
        let (unroller, mut backend) = Self::prepare(hts, config)?;
        unroller.check_state_predicate(property)?;
        Ok(check_safety(&mut backend, &unroller, property, &config.bmc_options())?)
    }

    fn simulate(
        &mut self,
        hts: &Hts,
        target: &Expr,
        config: &VerificationConfig,
    ) -> Result<CheckResult, CheckError> {
        let (unroller, mut backend) = Self::prepare(hts, config)?;
        unroller.check_state_predicate(target)?;
        Ok(simulate(&mut backend, &unroller, target, &config.bmc_options())?)
    }

    fn ltl(
        &mut self,
        hts: &Hts,
        formula: &LtlFormula,
        config: &VerificationConfig,
    ) -> Result<CheckResult, CheckError> {
        let (unroller, mut backend) = Self::prepare(hts, config)?;
        for atom in formula.atoms() {
            unroller.check_state_predicate(atom)?;
        }
        Ok(check_ltl(&mut backend, &unroller, formula, &config.bmc_options())?)
    }

    fn determinism(&mut self, hts: &Hts, config: &VerificationConfig) -> Result<Determinism, CheckError> {
        let (unroller, mut backend) = Self::prepare(hts, config)?;
        Ok(check_determinism(&mut backend, &unroller)?)
    }
}

impl<C: ModelChecker + ?Sized> ModelChecker for &mut C {
    fn safety(
        &mut self,
        hts: &Hts,
        property: &Expr,
        config: &VerificationConfig,
    ) -> Result<CheckResult, CheckError> {
        (**self).safety(hts, property, config)
    }

    fn simulate(
        &mut self,
        hts: &Hts,
        target: &Expr,
        config: &VerificationConfig,
    ) -> Result<CheckResult, CheckError> {
        (**self).simulate(hts, target, config)
    }

    fn ltl(
        &mut self,
        hts: &Hts,
        formula: &LtlFormula,
        config: &VerificationConfig,
    ) -> Result<CheckResult, CheckError> {
        (**self).ltl(hts, formula, config)
    }

    fn determinism(&mut self, hts: &Hts, config: &VerificationConfig) -> Result<Determinism, CheckError> {
        (**self).determinism(hts, config)
    }
}
