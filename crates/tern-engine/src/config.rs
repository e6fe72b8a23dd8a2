//! Batch defaults, per-problem overrides and their resolution into one
//! concrete configuration.

use std::path::PathBuf;

use serde::Deserialize;
use tern_dsl::NameMap;
use tern_smt::{BackendOptions, BmcOptions, SolverKind, Strategy};

use crate::problem::Problem;

/// Settings applied to every problem of a run unless the problem says
/// otherwise.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchDefaults {
    pub bmc_length: usize,
    pub bmc_length_min: usize,
    pub strategy: Strategy,
    pub solver: SolverKind,
    pub incremental: bool,
    pub skip_solving: bool,
    pub vcd: bool,
    pub prove: bool,
    pub symbolic_init: bool,
    pub full_trace: bool,
    pub smt2_file: Option<PathBuf>,
    /// Per-query solver timeout; 0 disables it.
    pub solver_timeout_secs: u64,
    /// Trace files are written as `<prefix>-<problem>.txt`/`.vcd`.
    pub prefix: Option<PathBuf>,
}

impl Default for BatchDefaults {
    fn default() -> Self {
        Self {
            bmc_length: 10,
            bmc_length_min: 0,
            strategy: Strategy::Auto,
            solver: SolverKind::Z3,
            incremental: true,
            skip_solving: false,
            vcd: false,
            prove: false,
            symbolic_init: false,
            full_trace: false,
            smt2_file: None,
            solver_timeout_secs: 0,
            prefix: None,
        }
    }
}

/// Problem-local settings; `None` defers to the batch default.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct ProblemOverrides {
    pub bmc_length: Option<usize>,
    pub bmc_length_min: Option<usize>,
    pub strategy: Option<Strategy>,
    #[serde(alias = "solver_name")]
    pub solver: Option<SolverKind>,
    pub incremental: Option<bool>,
    pub skip_solving: Option<bool>,
    pub vcd: Option<bool>,
    pub prove: Option<bool>,
    pub symbolic_init: Option<bool>,
    pub full_trace: Option<bool>,
    #[serde(alias = "smt2_tracing")]
    pub smt2_file: Option<PathBuf>,
}

impl ProblemOverrides {
    /// Fill every unset field from `fallback`.
    pub fn or(self, fallback: &ProblemOverrides) -> ProblemOverrides {
        ProblemOverrides {
            bmc_length: self.bmc_length.or(fallback.bmc_length),
            bmc_length_min: self.bmc_length_min.or(fallback.bmc_length_min),
            strategy: self.strategy.or(fallback.strategy),
            solver: self.solver.or(fallback.solver),
            incremental: self.incremental.or(fallback.incremental),
            skip_solving: self.skip_solving.or(fallback.skip_solving),
            vcd: self.vcd.or(fallback.vcd),
            prove: self.prove.or(fallback.prove),
            symbolic_init: self.symbolic_init.or(fallback.symbolic_init),
            full_trace: self.full_trace.or(fallback.full_trace),
            smt2_file: self.smt2_file.or_else(|| fallback.smt2_file.clone()),
        }
    }

    pub fn symbolic_init_or(&self, defaults: &BatchDefaults) -> bool {
        self.symbolic_init.unwrap_or(defaults.symbolic_init)
    }
}

/// Fully resolved settings for one problem.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerificationConfig {
    pub bmc_length: usize,
    pub bmc_length_min: usize,
    pub strategy: Strategy,
    pub solver: SolverKind,
    pub incremental: bool,
    pub skip_solving: bool,
    pub vcd: bool,
    pub prove: bool,
    pub symbolic_init: bool,
    pub full_trace: bool,
    pub smt2_file: Option<PathBuf>,
    pub solver_timeout_secs: u64,
    /// Name the problem's traces are labelled with.
    pub prefix: String,
    /// Back-translation of internal variable names for traces.
    pub names: NameMap,
}

impl VerificationConfig {
    pub fn bmc_options(&self) -> BmcOptions {
        BmcOptions {
            bound: self.bmc_length,
            bound_min: self.bmc_length_min,
            strategy: self.strategy,
            incremental: self.incremental,
            prove: self.prove,
        }
    }

    pub fn backend_options(&self) -> BackendOptions {
        BackendOptions {
            kind: self.solver,
            timeout_secs: self.solver_timeout_secs,
            smt2_file: self.smt2_file.clone(),
            skip_solving: self.skip_solving,
        }
    }
}

/// Merge `problem`'s overrides with `defaults`.
///
/// Every overridable field takes the problem's value when set and the
/// default otherwise. Bounds are the exception: the effective bound is the
/// larger of the two, so a default can widen but never narrow a problem's
/// bound. The trace prefix is always the problem's name.
pub fn resolve_config(
    problem: &Problem,
    defaults: &BatchDefaults,
    names: &NameMap,
) -> VerificationConfig {
    let o = &problem.overrides;
    let bmc_length = o.bmc_length.unwrap_or(0).max(defaults.bmc_length);
    let bmc_length_min = o
        .bmc_length_min
        .unwrap_or(0)
        .max(defaults.bmc_length_min)
        .min(bmc_length);
    VerificationConfig {
        bmc_length,
        bmc_length_min,
        strategy: o.strategy.unwrap_or(defaults.strategy),
        solver: o.solver.unwrap_or(defaults.solver),
        incremental: o.incremental.unwrap_or(defaults.incremental),
        skip_solving: o.skip_solving.unwrap_or(defaults.skip_solving),
        vcd: o.vcd.unwrap_or(defaults.vcd),
        prove: o.prove.unwrap_or(defaults.prove),
        symbolic_init: o.symbolic_init_or(defaults),
        full_trace: o.full_trace.unwrap_or(defaults.full_trace),
        smt2_file: o.smt2_file.clone().or_else(|| defaults.smt2_file.clone()),
        solver_timeout_secs: defaults.solver_timeout_secs,
        prefix: problem.name.clone(),
        names: names.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::problem::VerificationKind;
    use proptest::{prop_assert, prop_assert_eq, proptest};

    fn problem_with(overrides: ProblemOverrides) -> Problem {
        let mut p = Problem::new("p1", VerificationKind::Safety);
        p.overrides = overrides;
        p
    }

    #[test]
    fn bounds_take_the_maximum() {
        let defaults = BatchDefaults::default();
        let shallow = problem_with(ProblemOverrides {
            bmc_length: Some(3),
            ..Default::default()
        });
        assert_eq!(resolve_config(&shallow, &defaults, &NameMap::new()).bmc_length, 10);

        let deep = problem_with(ProblemOverrides {
            bmc_length: Some(15),
            ..Default::default()
        });
        assert_eq!(resolve_config(&deep, &defaults, &NameMap::new()).bmc_length, 15);
    }

    #[test]
    fn minimum_bound_never_exceeds_the_bound() {
        let defaults = BatchDefaults {
            bmc_length: 4,
            bmc_length_min: 2,
            ..Default::default()
        };
        let p = problem_with(ProblemOverrides {
            bmc_length_min: Some(9),
            ..Default::default()
        });
        let config = resolve_config(&p, &defaults, &NameMap::new());
        assert_eq!((config.bmc_length, config.bmc_length_min), (4, 4));
    }

    #[test]
    fn explicit_values_win_over_defaults() {
        let defaults = BatchDefaults {
            prove: true,
            strategy: Strategy::Bwd,
            ..Default::default()
        };
        let p = problem_with(ProblemOverrides {
            prove: Some(false),
            solver: Some(SolverKind::Cvc5),
            incremental: Some(false),
            ..Default::default()
        });
        let config = resolve_config(&p, &defaults, &NameMap::new());
        assert!(!config.prove);
        assert_eq!(config.solver, SolverKind::Cvc5);
        assert!(!config.incremental);
        assert_eq!(config.strategy, Strategy::Bwd);
    }

    #[test]
    fn prefix_comes_from_the_problem_name() {
        let defaults = BatchDefaults {
            prefix: Some("out/cex".into()),
            ..Default::default()
        };
        let config = resolve_config(&problem_with(Default::default()), &defaults, &NameMap::new());
        assert_eq!(config.prefix, "p1");
    }

    #[test]
    fn resolved_config_carries_the_name_map() {
        let mut names = NameMap::new();
        names.record("top.x");
        let config = resolve_config(&problem_with(Default::default()), &BatchDefaults::default(), &names);
        assert_eq!(config.names.source_name("top$x"), "top.x");
    }

    #[test]
    fn set_level_overrides_fill_gaps_only() {
        let set_level = ProblemOverrides {
            bmc_length: Some(20),
            vcd: Some(true),
            ..Default::default()
        };
        let merged = ProblemOverrides {
            bmc_length: Some(5),
            ..Default::default()
        }
        .or(&set_level);
        assert_eq!(merged.bmc_length, Some(5));
        assert_eq!(merged.vcd, Some(true));
    }

    #[test]
    fn options_are_forwarded_to_the_checker() {
        let config = resolve_config(
            &problem_with(ProblemOverrides {
                skip_solving: Some(true),
                ..Default::default()
            }),
            &BatchDefaults {
                solver_timeout_secs: 30,
                ..Default::default()
            },
            &NameMap::new(),
        );
        let bmc = config.bmc_options();
        assert_eq!(bmc.bound, 10);
        let backend = config.backend_options();
        assert!(backend.skip_solving);
        assert_eq!(backend.timeout_secs, 30);
    }

    proptest! {
        #[test]
        fn resolved_bounds_are_ordered_and_never_narrowed(
            problem_k in proptest::option::of(0usize..64),
            problem_min in proptest::option::of(0usize..64),
            default_k in 0usize..64,
            default_min in 0usize..64,
        ) {
            let defaults = BatchDefaults {
                bmc_length: default_k,
                bmc_length_min: default_min,
                ..Default::default()
            };
            let p = problem_with(ProblemOverrides {
                bmc_length: problem_k,
                bmc_length_min: problem_min,
                ..Default::default()
            });
            let config = resolve_config(&p, &defaults, &NameMap::new());
            prop_assert!(config.bmc_length_min <= config.bmc_length);
            prop_assert!(config.bmc_length >= default_k);
            prop_assert!(config.bmc_length >= problem_k.unwrap_or(0));
            prop_assert_eq!(config.bmc_length, default_k.max(problem_k.unwrap_or(0)));
        }
    }
}
