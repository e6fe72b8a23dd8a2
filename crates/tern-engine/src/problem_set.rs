//! Problem sets: a batch of problems over one model, loaded from JSON.
//!
//! ```json
//! {
//!   "model_file": "counter.sts, counter.init",
//!   "equivalence": "counter_opt.sts",
//!   "defaults": { "bmc_length": 20 },
//!   "problems": {
//!     "bounded": { "verification": "safety", "formula": "top.x < 8" },
//!     "live":    { "verification": "liveness", "formula": "top.x = 0", "prove": false }
//!   }
//! }
//! ```
//!
//! `problems` may also be an array whose entries carry a `name`. Model,
//! property and equivalence paths are relative to the file's directory.

use std::collections::{BTreeSet, HashSet};
use std::fs;
use std::path::{Path, PathBuf};

use indexmap::IndexMap;
use miette::Diagnostic;
use serde::Deserialize;
use thiserror::Error;
use tracing::debug;

use crate::config::{BatchDefaults, ProblemOverrides};
use crate::problem::{FormulaRef, Problem, VerificationKind};

#[derive(Debug, Error, Diagnostic)]
pub enum ProblemSetError {
    #[error("I/O error reading {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed problem set: {0}")]
    #[diagnostic(code(tern::problems::json))]
    Json(#[from] serde_json::Error),

    #[error("problem '{problem}': {message}")]
    #[diagnostic(code(tern::problems::verification))]
    UnknownVerification { problem: String, message: String },

    #[error("problem '{0}' is defined twice")]
    #[diagnostic(code(tern::problems::duplicate))]
    DuplicateProblem(String),
}

/// A batch of problems sharing one model and one path context.
#[derive(Debug, Clone)]
pub struct ProblemSet {
    /// Directory relative references are resolved against.
    pub relative_path: PathBuf,
    /// Comma-separated model references, `file.ext[flag+flag]`.
    pub model_file: String,
    /// Model list of the system every equivalence problem compares against.
    pub equivalence: Option<String>,
    /// Read `BV(1)` declarations as `Bool`.
    pub boolean: bool,
    pub problems: Vec<Problem>,
}

#[derive(Deserialize)]
struct ProblemSetFile {
    model_file: String,
    #[serde(default)]
    equivalence: Option<String>,
    #[serde(default)]
    boolean: bool,
    #[serde(default)]
    defaults: ProblemOverrides,
    problems: ProblemEntries,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum ProblemEntries {
    List(Vec<ProblemEntry>),
    Map(IndexMap<String, ProblemEntry>),
}

#[derive(Deserialize)]
struct ProblemEntry {
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    description: String,
    verification: String,
    #[serde(default)]
    formula: Option<FormulaRef>,
    #[serde(default)]
    assumptions: Option<FormulaRef>,
    #[serde(default)]
    lemmas: Option<FormulaRef>,
    #[serde(default)]
    equivalence: Option<String>,
    #[serde(flatten)]
    overrides: ProblemOverrides,
}

impl ProblemSet {
    pub fn new(relative_path: impl Into<PathBuf>, model_file: impl Into<String>) -> Self {
        Self {
            relative_path: relative_path.into(),
            model_file: model_file.into(),
            equivalence: None,
            boolean: false,
            problems: Vec::new(),
        }
    }

    pub fn push(&mut self, problem: Problem) {
        self.problems.push(problem);
    }

    /// Read a JSON problem set; relative paths resolve against its directory.
    pub fn load(path: &Path) -> Result<Self, ProblemSetError> {
        let text = fs::read_to_string(path).map_err(|source| ProblemSetError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let base = path.parent().map(Path::to_path_buf).unwrap_or_default();
        Self::from_json(&text, base)
    }

    pub fn from_json(text: &str, relative_path: impl Into<PathBuf>) -> Result<Self, ProblemSetError> {
        let file: ProblemSetFile = serde_json::from_str(text)?;
        let entries: Vec<(String, ProblemEntry)> = match file.problems {
            ProblemEntries::List(list) => list
                .into_iter()
                .enumerate()
                .map(|(i, e)| (e.name.clone().unwrap_or_else(|| (i + 1).to_string()), e))
                .collect(),
            ProblemEntries::Map(map) => map.into_iter().collect(),
        };

        let mut seen = HashSet::new();
        let mut problems = Vec::with_capacity(entries.len());
        for (name, entry) in entries {
            if !seen.insert(name.clone()) {
                return Err(ProblemSetError::DuplicateProblem(name));
            }
            let verification: VerificationKind =
                entry
                    .verification
                    .parse()
                    .map_err(|message| ProblemSetError::UnknownVerification {
                        problem: name.clone(),
                        message,
                    })?;
            let mut problem = Problem::new(name, verification);
            problem.description = entry.description;
            problem.formula = entry.formula;
            problem.assumptions = entry.assumptions;
            problem.lemmas = entry.lemmas;
            problem.equivalence = entry.equivalence;
            problem.overrides = entry.overrides.or(&file.defaults);
            problems.push(problem);
        }

        let set = ProblemSet {
            relative_path: relative_path.into(),
            model_file: file.model_file,
            equivalence: file.equivalence,
            boolean: file.boolean,
            problems,
        };
        debug!(
            problems = set.problems.len(),
            models = %set.model_file,
            "loaded problem set"
        );
        Ok(set)
    }

    /// Distinct symbolic-init modes the problems ask for.
    pub fn symbolic_init_modes(&self, defaults: &BatchDefaults) -> BTreeSet<bool> {
        self.problems
            .iter()
            .map(|p| p.overrides.symbolic_init_or(defaults))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tern_smt::Strategy;

    const MAP_FORM: &str = r#"{
        "model_file": "counter.sts",
        "defaults": { "bmc_length": 20, "vcd": true },
        "problems": {
            "bounded": {
                "description": "counter stays small",
                "verification": "safety",
                "formula": "top.x < 8",
                "strategy": "BWD"
            },
            "init": { "verification": "SIMULATION", "symbolic_init": true, "bmc_length": 4 }
        }
    }"#;

    #[test]
    fn map_form_keeps_document_order() {
        let set = ProblemSet::from_json(MAP_FORM, "/models").unwrap();
        let names: Vec<&str> = set.problems.iter().map(|p| p.name.as_str()).collect();
        assert_eq!(names, vec!["bounded", "init"]);
        assert_eq!(set.relative_path, PathBuf::from("/models"));
        let bounded = &set.problems[0];
        assert_eq!(bounded.verification, VerificationKind::Safety);
        assert_eq!(bounded.description, "counter stays small");
        assert_eq!(bounded.overrides.strategy, Some(Strategy::Bwd));
        assert_eq!(bounded.formula, Some(FormulaRef::Text("top.x < 8".into())));
    }

    #[test]
    fn set_defaults_fill_problem_overrides() {
        let set = ProblemSet::from_json(MAP_FORM, ".").unwrap();
        assert_eq!(set.problems[0].overrides.bmc_length, Some(20));
        assert_eq!(set.problems[1].overrides.bmc_length, Some(4));
        assert_eq!(set.problems[1].overrides.vcd, Some(true));
    }

    #[test]
    fn list_form_names_unnamed_problems_by_position() {
        let json = r#"{
            "model_file": "a.sts",
            "equivalence": "b.sts",
            "boolean": true,
            "problems": [
                { "verification": "equivalence" },
                { "name": "live", "verification": "liveness", "formula": ["x = 0"],
                  "smt2_tracing": "live.smt2" }
            ]
        }"#;
        let set = ProblemSet::from_json(json, ".").unwrap();
        assert!(set.boolean);
        assert_eq!(set.equivalence.as_deref(), Some("b.sts"));
        assert_eq!(set.problems[0].name, "1");
        assert_eq!(set.problems[1].name, "live");
        assert_eq!(
            set.problems[1].overrides.smt2_file,
            Some(PathBuf::from("live.smt2"))
        );
    }

    #[test]
    fn unknown_verification_is_a_configuration_error() {
        let json = r#"{ "model_file": "a.sts", "problems": { "p": { "verification": "bisim" } } }"#;
        assert!(matches!(
            ProblemSet::from_json(json, "."),
            Err(ProblemSetError::UnknownVerification { ref problem, .. }) if problem == "p"
        ));
    }

    #[test]
    fn duplicate_names_are_rejected() {
        let json = r#"{ "model_file": "a.sts", "problems": [
            { "name": "p", "verification": "safety" },
            { "name": "p", "verification": "ltl" } ] }"#;
        assert!(matches!(
            ProblemSet::from_json(json, "."),
            Err(ProblemSetError::DuplicateProblem(_))
        ));
    }

    #[test]
    fn symbolic_init_modes_are_collected_per_problem() {
        let set = ProblemSet::from_json(MAP_FORM, ".").unwrap();
        let modes = set.symbolic_init_modes(&BatchDefaults::default());
        assert_eq!(modes.into_iter().collect::<Vec<_>>(), vec![false, true]);

        let all_symbolic = BatchDefaults {
            symbolic_init: true,
            ..Default::default()
        };
        assert_eq!(set.symbolic_init_modes(&all_symbolic).len(), 1);
    }

    #[test]
    fn load_resolves_against_the_file_directory() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("problems.json");
        fs::write(&path, MAP_FORM).unwrap();
        let set = ProblemSet::load(&path).unwrap();
        assert_eq!(set.relative_path, dir.path());
    }
}
