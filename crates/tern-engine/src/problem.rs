//! Verification problems and property resolution.

use std::fmt;
use std::path::Path;
use std::str::FromStr;

use miette::Diagnostic;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tern_dsl::{canonical_name, parse_predicate, parse_temporal, resolve_reference, ModelError, ParseError};
use tern_ir::{Expr, LtlFormula};

use crate::config::ProblemOverrides;
use crate::miter::EquivalenceVerdict;
use crate::trace::Trace;

/// Kind of check a problem asks for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum VerificationKind {
    Safety,
    Liveness,
    Eventually,
    Equivalence,
    Simulation,
    Ltl,
}

impl VerificationKind {
    /// Kinds whose property is read with the temporal parser.
    pub fn is_temporal(self) -> bool {
        matches!(
            self,
            VerificationKind::Ltl | VerificationKind::Liveness | VerificationKind::Eventually
        )
    }
}

impl FromStr for VerificationKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "safety" => Ok(VerificationKind::Safety),
            "liveness" => Ok(VerificationKind::Liveness),
            "eventually" => Ok(VerificationKind::Eventually),
            "equivalence" => Ok(VerificationKind::Equivalence),
            "simulation" => Ok(VerificationKind::Simulation),
            "ltl" => Ok(VerificationKind::Ltl),
            other => Err(format!(
                "unknown verification '{other}' (expected safety, liveness, eventually, \
                 equivalence, simulation or ltl)"
            )),
        }
    }
}

impl fmt::Display for VerificationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            VerificationKind::Safety => "SAFETY",
            VerificationKind::Liveness => "LIVENESS",
            VerificationKind::Eventually => "EVENTUALLY",
            VerificationKind::Equivalence => "EQUIVALENCE",
            VerificationKind::Simulation => "SIMULATION",
            VerificationKind::Ltl => "LTL",
        };
        f.write_str(name)
    }
}

/// Tri-state verdict of a problem.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub enum Status {
    #[serde(rename = "TRUE")]
    True,
    #[serde(rename = "FALSE")]
    False,
    #[default]
    #[serde(rename = "UNK")]
    Unknown,
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Status::True => "TRUE",
            Status::False => "FALSE",
            Status::Unknown => "UNK",
        })
    }
}

/// Progress of one problem through the solver.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum ProblemState {
    #[default]
    Pending,
    ResolvingProperties,
    Dispatched,
    Solved,
    Errored(String),
}

impl ProblemState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, ProblemState::Solved | ProblemState::Errored(_))
    }
}

/// A formula reference: one string (a file path or a comma-separated list)
/// or an explicit list of formulas.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FormulaRef {
    Text(String),
    List(Vec<String>),
}

impl FormulaRef {
    pub fn expand(&self, base: &Path) -> Result<Vec<String>, ModelError> {
        match self {
            FormulaRef::Text(text) => resolve_reference(text, base),
            FormulaRef::List(items) => Ok(items
                .iter()
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .collect()),
        }
    }
}

impl fmt::Display for FormulaRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FormulaRef::Text(text) => f.write_str(text),
            FormulaRef::List(items) => f.write_str(&items.join(", ")),
        }
    }
}

impl From<&str> for FormulaRef {
    fn from(text: &str) -> Self {
        FormulaRef::Text(text.to_string())
    }
}

/// One verification request and, once solved, its outcome.
#[derive(Debug, Clone)]
pub struct Problem {
    pub name: String,
    pub description: String,
    pub verification: VerificationKind,
    pub formula: Option<FormulaRef>,
    pub assumptions: Option<FormulaRef>,
    pub lemmas: Option<FormulaRef>,
    /// Model list of the second system, for equivalence problems that do
    /// not use the problem set's target.
    pub equivalence: Option<String>,
    pub overrides: ProblemOverrides,

    pub state: ProblemState,
    pub status: Status,
    /// Depth at which checking stopped.
    pub depth_reached: Option<usize>,
    pub verdict: Option<EquivalenceVerdict>,
    pub trace: Option<Trace>,
}

impl Problem {
    pub fn new(name: impl Into<String>, verification: VerificationKind) -> Self {
        Self {
            name: name.into(),
            description: String::new(),
            verification,
            formula: None,
            assumptions: None,
            lemmas: None,
            equivalence: None,
            overrides: ProblemOverrides::default(),
            state: ProblemState::Pending,
            status: Status::Unknown,
            depth_reached: None,
            verdict: None,
            trace: None,
        }
    }

    pub fn with_formula(mut self, formula: impl Into<FormulaRef>) -> Self {
        self.formula = Some(formula.into());
        self
    }

    pub fn with_assumptions(mut self, assumptions: impl Into<FormulaRef>) -> Self {
        self.assumptions = Some(assumptions.into());
        self
    }

    pub fn with_lemmas(mut self, lemmas: impl Into<FormulaRef>) -> Self {
        self.lemmas = Some(lemmas.into());
        self
    }

    /// Back to `Pending`, clearing any previous outcome.
    pub fn reset(&mut self) {
        self.state = ProblemState::Pending;
        self.status = Status::Unknown;
        self.depth_reached = None;
        self.verdict = None;
        self.trace = None;
    }

    /// Parse the property, assumptions and lemmas.
    ///
    /// Several property formulas are conjoined. Simulation problems without
    /// a property look for any execution of full length. For equivalence
    /// problems the property is an optional list of output names.
    pub fn resolve_properties(&self, base: &Path) -> Result<ResolvedProperties, ResolutionError> {
        let assumptions = self.parse_predicates(self.assumptions.as_ref(), base)?;
        let lemmas = self.parse_predicates(self.lemmas.as_ref(), base)?;
        if let Some(lemma) = lemmas.iter().find(|l| l.has_next()) {
            return Err(ResolutionError::NextInLemma {
                problem: self.name.clone(),
                lemma: lemma.to_string(),
            });
        }

        let formulas = match &self.formula {
            Some(reference) => {
                let formulas = reference.expand(base)?;
                if formulas.is_empty() {
                    return Err(ResolutionError::EmptyProperty {
                        problem: self.name.clone(),
                        reference: reference.to_string(),
                    });
                }
                formulas
            }
            None => Vec::new(),
        };

        let property = match self.verification {
            VerificationKind::Equivalence => {
                Property::Outputs(formulas.iter().map(|o| canonical_name(o)).collect())
            }
            VerificationKind::Simulation if formulas.is_empty() => Property::Invariant(Expr::tt()),
            _ if formulas.is_empty() => {
                return Err(ResolutionError::MissingProperty {
                    problem: self.name.clone(),
                })
            }
            kind if kind.is_temporal() => {
                let mut parsed = Vec::with_capacity(formulas.len());
                for text in &formulas {
                    parsed.push(parse_temporal(text, &self.name).map_err(|source| {
                        ResolutionError::Parse {
                            problem: self.name.clone(),
                            source,
                        }
                    })?);
                }
                let formula = parsed
                    .into_iter()
                    .reduce(|a, b| LtlFormula::And(Box::new(a), Box::new(b)))
                    .unwrap_or_else(|| LtlFormula::atom(Expr::tt()));
                if let Some(atom) = formula.atoms().into_iter().find(|a| a.has_next()) {
                    return Err(ResolutionError::NextInProperty {
                        problem: self.name.clone(),
                        formula: atom.to_string(),
                    });
                }
                Property::Temporal(match self.verification {
                    VerificationKind::Liveness => {
                        LtlFormula::Globally(Box::new(LtlFormula::Finally(Box::new(formula))))
                    }
                    VerificationKind::Eventually => LtlFormula::Finally(Box::new(formula)),
                    _ => formula,
                })
            }
            _ => {
                let parsed = self.parse_all(&formulas)?;
                if let Some(p) = parsed.iter().find(|p| p.has_next()) {
                    return Err(ResolutionError::NextInProperty {
                        problem: self.name.clone(),
                        formula: p.to_string(),
                    });
                }
                Property::Invariant(Expr::conjoin(parsed))
            }
        };

        Ok(ResolvedProperties {
            property,
            assumptions,
            lemmas,
        })
    }

    fn parse_predicates(
        &self,
        reference: Option<&FormulaRef>,
        base: &Path,
    ) -> Result<Vec<Expr>, ResolutionError> {
        match reference {
            Some(reference) => self.parse_all(&reference.expand(base)?),
            None => Ok(Vec::new()),
        }
    }

    fn parse_all(&self, formulas: &[String]) -> Result<Vec<Expr>, ResolutionError> {
        formulas
            .iter()
            .map(|text| {
                parse_predicate(text, &self.name).map_err(|source| ResolutionError::Parse {
                    problem: self.name.clone(),
                    source,
                })
            })
            .collect()
    }
}

impl fmt::Display for Problem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.name, self.verification)
    }
}

/// The parsed property of a problem.
#[derive(Debug, Clone, PartialEq)]
pub enum Property {
    /// Safety invariant, or simulation target.
    Invariant(Expr),
    Temporal(LtlFormula),
    /// Outputs compared by an equivalence check; empty means all shared ones.
    Outputs(Vec<String>),
}

#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedProperties {
    pub property: Property,
    pub assumptions: Vec<Expr>,
    pub lemmas: Vec<Expr>,
}

/// Errors that abort a single problem.
#[derive(Debug, Error, Diagnostic)]
pub enum ResolutionError {
    #[error("problem '{problem}': property reference '{reference}' yields no formulas")]
    #[diagnostic(code(tern::problem::empty_property))]
    EmptyProperty { problem: String, reference: String },

    #[error("problem '{problem}' has no property")]
    #[diagnostic(code(tern::problem::missing_property))]
    MissingProperty { problem: String },

    #[error("problem '{problem}': lemma '{lemma}' refers to the next state")]
    #[diagnostic(
        code(tern::problem::next_in_lemma),
        help("lemmas are state invariants; remove next() and primed variables")
    )]
    NextInLemma { problem: String, lemma: String },

    #[error("problem '{problem}': property '{formula}' refers to the next state")]
    #[diagnostic(code(tern::problem::next_in_property))]
    NextInProperty { problem: String, formula: String },

    #[error("problem '{problem}': {source}")]
    Parse {
        problem: String,
        #[source]
        source: ParseError,
    },

    #[error(transparent)]
    Reference(#[from] ModelError),
}
