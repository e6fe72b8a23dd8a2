//! Batch orchestration.
//!
//! [`ProblemSolver`] parses each model list at most once per symbolic-init
//! mode and hands the cached system to every problem that asks for it.
//! Problem assumptions and lemmas are injected through a scoped guard, so a
//! problem never sees another problem's additions.

use std::collections::hash_map::Entry;
use std::collections::HashMap;
use std::path::{Path, PathBuf};

use miette::Diagnostic;
use thiserror::Error;
use tern_dsl::{parse_model_list, ModelError, NameMap, ParseContext, ParserRegistry};
use tern_ir::{snapshot, Hts, SnapshotError};
use tern_smt::{CheckResult, Determinism};
use tracing::{debug, error, info, warn};

use crate::checker::{CheckError, ModelChecker, SmtChecker};
use crate::config::{resolve_config, BatchDefaults};
use crate::miter::{build_miter, EquivalenceVerdict, MiterError};
use crate::problem::{
    Problem, ProblemState, Property, ResolutionError, Status, VerificationKind,
};
use crate::problem_set::{ProblemSet, ProblemSetError};
use crate::trace::{render_trace, Trace};

/// Label of determinism-check traces and errors.
pub const FSM_CHECK: &str = "fsm";

/// What to do when a bounded check fails with an error.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ErrorPolicy {
    /// Stop the batch and return the error.
    Abort,
    /// Mark the problem as errored and go on with the next one.
    #[default]
    Continue,
}

#[derive(Debug, Error, Diagnostic)]
pub enum EngineError {
    #[error(transparent)]
    #[diagnostic(transparent)]
    Model(#[from] ModelError),

    #[error("no model files given")]
    #[diagnostic(code(tern::engine::no_models))]
    EmptyModelList,

    #[error(transparent)]
    #[diagnostic(transparent)]
    ProblemSet(#[from] ProblemSetError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Resolution(#[from] ResolutionError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Miter(#[from] MiterError),

    #[error("problem '{0}' is an equivalence check but no second system is given")]
    #[diagnostic(
        code(tern::engine::no_equivalence_target),
        help("set `equivalence` on the problem or on the problem set")
    )]
    MissingEquivalenceTarget(String),

    #[error("problem '{problem}': {source}")]
    Check {
        problem: String,
        #[source]
        source: CheckError,
    },

    #[error(transparent)]
    Snapshot(#[from] SnapshotError),

    #[error("I/O error writing {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl EngineError {
    /// Errors that abort only the problem they occurred in.
    pub fn is_problem_local(&self) -> bool {
        match self {
            EngineError::Resolution(_) | EngineError::MissingEquivalenceTarget(_) => true,
            EngineError::Miter(e) => !matches!(e, MiterError::Composition(_)),
            _ => false,
        }
    }

    /// Errors raised by the bounded checker.
    pub fn is_dispatch(&self) -> bool {
        matches!(self, EngineError::Check { .. })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct SystemKey {
    base: PathBuf,
    models: String,
    symbolic_init: bool,
    boolean: bool,
}

/// Parsed systems plus the parsers and name maps that produced them.
struct SystemCache {
    registry: ParserRegistry,
    names: NameMap,
    systems: HashMap<SystemKey, Hts>,
}

impl SystemCache {
    fn load(&mut self, key: &SystemKey, label: &str) -> Result<&mut Hts, EngineError> {
        match self.systems.entry(key.clone()) {
            Entry::Occupied(entry) => {
                debug!(system = label, models = %key.models, "reusing parsed system");
                Ok(entry.into_mut())
            }
            Entry::Vacant(entry) => {
                let (hts, names) = parse_models(
                    &self.registry,
                    &key.base,
                    &key.models,
                    key.symbolic_init,
                    key.boolean,
                    label,
                )?;
                self.names.extend(names);
                Ok(entry.insert(hts))
            }
        }
    }
}

/// Parse and combine every model of a comma-separated list.
///
/// Extensions select the parser. An unknown extension or a missing file
/// fails the whole load.
pub fn parse_models(
    registry: &ParserRegistry,
    base: &Path,
    models: &str,
    symbolic_init: bool,
    boolean: bool,
    label: &str,
) -> Result<(Hts, NameMap), EngineError> {
    let refs = parse_model_list(models, base)?;
    if refs.is_empty() {
        return Err(EngineError::EmptyModelList);
    }
    let mut hts = Hts::new(label);
    let mut names = NameMap::new();
    for model in refs {
        let parser = registry.for_path(&model.path)?;
        if !model.path.is_file() {
            return Err(ModelError::MissingFile(model.path).into());
        }
        info!(file = %model.path.display(), parser = parser.name(), "parsing model file");
        let ctx = ParseContext {
            symbolic_init,
            boolean,
            system: &hts,
        };
        let parsed = parser.parse(&model.path, &model.flags, &ctx)?;
        hts.combine(parsed.hts).map_err(ModelError::from)?;
        names.extend(parsed.names);
    }
    debug!("{}", hts.statistics());
    Ok((hts, names))
}

/// Outcome of a determinism check with the two diverging executions.
#[derive(Debug, Clone, PartialEq)]
pub struct FsmReport {
    pub outcome: Determinism,
    pub traces: Vec<Trace>,
}

/// Batch problem solver.
pub struct ProblemSolver<C = SmtChecker> {
    cache: SystemCache,
    checker: C,
    policy: ErrorPolicy,
}

impl ProblemSolver<SmtChecker> {
    pub fn new() -> Self {
        Self::with_checker(SmtChecker)
    }
}

impl Default for ProblemSolver<SmtChecker> {
    fn default() -> Self {
        Self::new()
    }
}

impl<C: ModelChecker> ProblemSolver<C> {
    pub fn with_checker(checker: C) -> Self {
        Self {
            cache: SystemCache {
                registry: ParserRegistry::with_builtin(),
                names: NameMap::new(),
                systems: HashMap::new(),
            },
            checker,
            policy: ErrorPolicy::default(),
        }
    }

    pub fn with_registry(mut self, registry: ParserRegistry) -> Self {
        self.cache.registry = registry;
        self
    }

    pub fn with_policy(mut self, policy: ErrorPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn checker(&self) -> &C {
        &self.checker
    }

    /// Name back-translation accumulated over every parse so far.
    pub fn names(&self) -> &NameMap {
        &self.cache.names
    }

    /// Number of parsed systems held in the cache.
    pub fn cached_systems(&self) -> usize {
        self.cache.systems.len()
    }

    /// The first system of `set` for one symbolic-init mode, parsed on demand.
    pub fn system(&mut self, set: &ProblemSet, symbolic_init: bool) -> Result<&Hts, EngineError> {
        let key = SystemKey {
            base: set.relative_path.clone(),
            models: set.model_file.clone(),
            symbolic_init,
            boolean: set.boolean,
        };
        Ok(self.cache.load(&key, "System 1")?)
    }

    /// Write the first system of `set` to a snapshot file.
    pub fn save_snapshot(
        &mut self,
        set: &ProblemSet,
        symbolic_init: bool,
        path: &Path,
    ) -> Result<(), EngineError> {
        let hts = self.system(set, symbolic_init)?;
        snapshot::save(hts, path)?;
        Ok(())
    }

    /// Check that the first system of `set` is deterministic, under the
    /// batch-level symbolic-init mode.
    pub fn check_determinism(
        &mut self,
        set: &ProblemSet,
        defaults: &BatchDefaults,
    ) -> Result<FsmReport, EngineError> {
        let key = SystemKey {
            base: set.relative_path.clone(),
            models: set.model_file.clone(),
            symbolic_init: defaults.symbolic_init,
            boolean: set.boolean,
        };
        self.cache.load(&key, "System 1")?;
        let config = resolve_config(
            &Problem::new(FSM_CHECK, VerificationKind::Safety),
            defaults,
            &self.cache.names,
        );
        let hts = self.cache.load(&key, "System 1")?;
        let outcome = self
            .checker
            .determinism(hts, &config)
            .map_err(|source| EngineError::Check {
                problem: FSM_CHECK.to_string(),
                source,
            })?;
        let traces = match &outcome {
            Determinism::Nondeterministic { first, second, .. } => vec![
                render_trace("Branch 1", first, hts, &config),
                render_trace("Branch 2", second, hts, &config),
            ],
            Determinism::Deterministic | Determinism::Unknown { .. } => Vec::new(),
        };
        Ok(FsmReport { outcome, traces })
    }

    /// Parse every system the problems of `set` will need.
    pub fn prepare(&mut self, set: &ProblemSet, defaults: &BatchDefaults) -> Result<(), EngineError> {
        for symbolic_init in set.symbolic_init_modes(defaults) {
            let mut key = SystemKey {
                base: set.relative_path.clone(),
                models: set.model_file.clone(),
                symbolic_init,
                boolean: set.boolean,
            };
            self.cache.load(&key, "System 1")?;
            if let Some(equivalence) = &set.equivalence {
                key.models = equivalence.clone();
                self.cache.load(&key, "System 2")?;
            }
        }
        Ok(())
    }

    /// Solve every problem of `set` in order, recording results on the problems.
    ///
    /// Resolution errors abort only their problem. Checker errors follow
    /// the error policy. Configuration errors end the batch.
    pub fn solve_problems(
        &mut self,
        set: &mut ProblemSet,
        defaults: &BatchDefaults,
    ) -> Result<(), EngineError> {
        self.prepare(set, defaults)?;
        let ProblemSet {
            relative_path,
            model_file,
            equivalence,
            boolean,
            problems,
        } = set;
        let batch = Batch {
            base: relative_path,
            model_file,
            equivalence: equivalence.as_deref(),
            boolean: *boolean,
        };
        for problem in problems.iter_mut() {
            problem.reset();
            let Err(err) = self.solve_problem(problem, &batch, defaults) else {
                continue;
            };
            problem.state = ProblemState::Errored(err.to_string());
            problem.status = Status::Unknown;
            if err.is_problem_local() {
                warn!(problem = %problem.name, error = %err, "problem aborted");
            } else if err.is_dispatch() && self.policy == ErrorPolicy::Continue {
                error!(problem = %problem.name, error = %err, "checking failed");
            } else {
                return Err(err);
            }
        }
        Ok(())
    }

    fn solve_problem(
        &mut self,
        problem: &mut Problem,
        batch: &Batch<'_>,
        defaults: &BatchDefaults,
    ) -> Result<(), EngineError> {
        info!(problem = %problem.name, verification = %problem.verification, "analyzing problem");
        problem.state = ProblemState::ResolvingProperties;
        let resolved = problem.resolve_properties(batch.base)?;

        let symbolic_init = problem.overrides.symbolic_init_or(defaults);
        let key = SystemKey {
            base: batch.base.to_path_buf(),
            models: batch.model_file.to_string(),
            symbolic_init,
            boolean: batch.boolean,
        };
        self.cache.load(&key, "System 1")?;
        let second = match problem.verification {
            VerificationKind::Equivalence => {
                let models = problem
                    .equivalence
                    .as_deref()
                    .or(batch.equivalence)
                    .ok_or_else(|| EngineError::MissingEquivalenceTarget(problem.name.clone()))?;
                let key = SystemKey {
                    models: models.to_string(),
                    ..key.clone()
                };
                Some(self.cache.load(&key, "System 2")?.clone())
            }
            _ => None,
        };

        let mut config = resolve_config(problem, defaults, &self.cache.names);
        let name = problem.name.clone();
        let check_failed = |source| EngineError::Check {
            problem: name.clone(),
            source,
        };
        problem.state = ProblemState::Dispatched;

        let hts = self.cache.load(&key, "System 1")?;
        let (result, trace) = match (resolved.property, second) {
            (Property::Outputs(outputs), Some(b)) => {
                let mut miter = build_miter(hts, &b, symbolic_init, &outputs)?;
                for (original, renamed) in &miter.renamed {
                    let source = format!("B.{}", config.names.source_name(original));
                    config.names.insert(renamed.clone(), source);
                }
                resolved
                    .assumptions
                    .into_iter()
                    .for_each(|a| miter.hts.add_assumption(a));
                resolved
                    .lemmas
                    .into_iter()
                    .for_each(|l| miter.hts.add_lemma(l));
                info!(
                    outputs = miter.outputs.len(),
                    symbolic_init,
                    k = config.bmc_length,
                    "equivalence checking"
                );
                let result = self
                    .checker
                    .safety(&miter.hts, &miter.property(), &config)
                    .map_err(check_failed)?;
                let verdict = EquivalenceVerdict::from_check(&result, symbolic_init);
                if let Some(verdict) = verdict {
                    info!(problem = %problem.name, %verdict, "equivalence result");
                }
                problem.verdict = verdict;
                let trace = result
                    .witness()
                    .map(|w| render_trace("Counterexample", w, &miter.hts, &config));
                (result, trace)
            }
            (property, _) => {
                let scoped = hts.inject(resolved.assumptions, resolved.lemmas);
                let result = match &property {
                    Property::Invariant(target)
                        if problem.verification == VerificationKind::Simulation =>
                    {
                        self.checker.simulate(&scoped, target, &config)
                    }
                    Property::Invariant(invariant) => {
                        self.checker.safety(&scoped, invariant, &config)
                    }
                    Property::Temporal(formula) => self.checker.ltl(&scoped, formula, &config),
                    Property::Outputs(_) => {
                        return Err(EngineError::MissingEquivalenceTarget(problem.name.clone()))
                    }
                }
                .map_err(check_failed)?;
                let title = match problem.verification {
                    VerificationKind::Simulation => "Execution",
                    _ => "Counterexample",
                };
                let trace = result
                    .witness()
                    .map(|w| render_trace(title, w, &scoped, &config));
                (result, trace)
            }
        };

        problem.status = match &problem.verdict {
            Some(verdict) => verdict.status(),
            None => status_of(&result),
        };
        problem.depth_reached = Some(result.depth());
        problem.trace = trace;
        problem.state = ProblemState::Solved;
        info!(problem = %problem.name, status = %problem.status, depth = result.depth(), "problem solved");
        Ok(())
    }
}

struct Batch<'a> {
    base: &'a Path,
    model_file: &'a str,
    equivalence: Option<&'a str>,
    boolean: bool,
}

fn status_of(result: &CheckResult) -> Status {
    match result {
        CheckResult::Holds { .. } => Status::True,
        CheckResult::Violated { .. } => Status::False,
        CheckResult::Unknown { .. } => Status::Unknown,
    }
}
