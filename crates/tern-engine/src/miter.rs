//! Equivalence checking by miter construction.
//!
//! The second system is renamed into the `B$` namespace and conjoined with
//! the first. Inputs present in both are tied together, and the miter
//! signal is the disjunction of `a != b` over the compared outputs. The
//! systems are equivalent up to `k` iff `!signal` holds for `k` steps.

use std::fmt;

use miette::Diagnostic;
use serde::Serialize;
use thiserror::Error;
use tern_ir::{CompositionError, Expr, Hts, Sort, TransitionSystem, VarKind};
use tern_smt::CheckResult;
use tracing::debug;

use crate::problem::Status;

/// Namespace the second system's variables are moved into.
pub const SECOND_SYSTEM_PREFIX: &str = "B$";

#[derive(Debug, Error, Diagnostic)]
pub enum MiterError {
    #[error("the two systems share no output variables")]
    #[diagnostic(
        code(tern::miter::no_common_outputs),
        help("outputs are matched by name; declare them in an OUTPUT section of both models")
    )]
    NoCommonOutputs,

    #[error("output '{0}' is not declared by both systems")]
    #[diagnostic(code(tern::miter::unknown_output))]
    UnknownOutput(String),

    #[error("'{name}' has sort {a} in the first system but {b} in the second")]
    #[diagnostic(code(tern::miter::sort_mismatch))]
    SortMismatch { name: String, a: Sort, b: Sort },

    #[error(transparent)]
    Composition(#[from] CompositionError),
}

/// A combined system and its divergence signal.
#[derive(Debug, Clone)]
pub struct Miter {
    pub hts: Hts,
    /// True in a state where some compared output pair differs.
    pub signal: Expr,
    /// Compared outputs, by their name in the first system.
    pub outputs: Vec<String>,
    /// Original and renamed names of the second system's variables.
    pub renamed: Vec<(String, String)>,
}

impl Miter {
    /// The invariant whose violation is a divergence.
    pub fn property(&self) -> Expr {
        self.signal.clone().not()
    }
}

pub fn second_system_name(name: &str) -> String {
    format!("{SECOND_SYSTEM_PREFIX}{name}")
}

/// Combine `a` and `b` into a miter.
///
/// `outputs` restricts the comparison to the named outputs; when empty,
/// every output declared by both systems is compared. With
/// `symbolic_init`, state variables present in both systems start equal.
pub fn build_miter(
    a: &Hts,
    b: &Hts,
    symbolic_init: bool,
    outputs: &[String],
) -> Result<Miter, MiterError> {
    let shared = |kind: VarKind| -> Result<Vec<(String, Sort)>, MiterError> {
        let mut out = Vec::new();
        for decl in a.vars().filter(|v| v.kind == kind) {
            if let Some(other) = b.var(&decl.name).filter(|v| v.kind == kind) {
                if decl.sort != other.sort {
                    return Err(MiterError::SortMismatch {
                        name: decl.name.clone(),
                        a: decl.sort,
                        b: other.sort,
                    });
                }
                out.push((decl.name.clone(), decl.sort));
            }
        }
        Ok(out)
    };

    let shared_outputs = shared(VarKind::Output)?;
    let compared: Vec<String> = if outputs.is_empty() {
        shared_outputs.iter().map(|(n, _)| n.clone()).collect()
    } else {
        for name in outputs {
            if !shared_outputs.iter().any(|(n, _)| n == name) {
                return Err(MiterError::UnknownOutput(name.clone()));
            }
        }
        outputs.to_vec()
    };
    if compared.is_empty() {
        return Err(MiterError::NoCommonOutputs);
    }

    let renamed: Vec<(String, String)> = b
        .vars()
        .map(|v| (v.name.clone(), second_system_name(&v.name)))
        .collect();
    let b_renamed = b.renamed(&second_system_name);

    let mut glue = TransitionSystem::new("miter");
    for (input, _) in shared(VarKind::Input)? {
        glue.add_invar(Expr::var(input.clone()).eq(Expr::var(second_system_name(&input))));
    }
    if symbolic_init {
        for (state, _) in shared(VarKind::State)? {
            glue.add_init(Expr::var(state.clone()).eq(Expr::var(second_system_name(&state))));
        }
    }

    let mut hts = Hts::new(format!("miter({}, {})", a.name, b.name));
    hts.combine(a.clone())?;
    hts.combine(b_renamed)?;
    hts.add_ts(glue)?;

    let signal = Expr::disjoin(
        compared
            .iter()
            .map(|o| Expr::var(o.clone()).ne(Expr::var(second_system_name(o)))),
    );
    debug!(outputs = compared.len(), symbolic_init, "built miter");
    Ok(Miter {
        hts,
        signal,
        outputs: compared,
        renamed,
    })
}

/// Outcome of an equivalence check.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum EquivalenceVerdict {
    /// The outputs diverge after `depth` steps.
    NotEquivalent { depth: usize },
    /// No divergence, and the result holds for all initial states.
    Equivalent,
    /// No divergence within `k` steps from the initial states.
    BoundedEquivalent { k: usize },
}

impl EquivalenceVerdict {
    /// Interpret a safety check of [`Miter::property`].
    ///
    /// `None` when the check gave up before the bound.
    pub fn from_check(result: &CheckResult, symbolic_init: bool) -> Option<Self> {
        match result {
            CheckResult::Violated { depth, .. } => {
                Some(EquivalenceVerdict::NotEquivalent { depth: *depth })
            }
            CheckResult::Holds { .. } => Some(EquivalenceVerdict::Equivalent),
            CheckResult::Unknown {
                depth_reached,
                exhausted: true,
                ..
            } => Some(if symbolic_init {
                EquivalenceVerdict::Equivalent
            } else {
                EquivalenceVerdict::BoundedEquivalent { k: *depth_reached }
            }),
            CheckResult::Unknown { .. } => None,
        }
    }

    pub fn status(&self) -> Status {
        match self {
            EquivalenceVerdict::NotEquivalent { .. } => Status::False,
            EquivalenceVerdict::Equivalent => Status::True,
            EquivalenceVerdict::BoundedEquivalent { .. } => Status::Unknown,
        }
    }
}

impl fmt::Display for EquivalenceVerdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EquivalenceVerdict::NotEquivalent { depth } => {
                write!(f, "systems are not equivalent (divergence at step {depth})")
            }
            EquivalenceVerdict::Equivalent => write!(f, "systems are equivalent"),
            EquivalenceVerdict::BoundedEquivalent { k } => {
                write!(f, "systems are equivalent up to k={k}")
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tern_ir::VarDecl;
    use tern_smt::Witness;

    fn system(name: &str, out_sort: Sort) -> Hts {
        let mut ts = TransitionSystem::new(name);
        ts.declare(VarDecl::input("top$in", Sort::Bool)).unwrap();
        ts.declare(VarDecl::state("top$r", Sort::BitVec(2))).unwrap();
        ts.declare(VarDecl::output("top$out", out_sort)).unwrap();
        ts.add_init(Expr::var("top$r").eq(Expr::int(0)));
        ts.add_invar(Expr::var("top$out").eq(Expr::var("top$r")));
        ts.add_trans(Expr::next("top$r").eq(Expr::var("top$r")));
        let mut hts = Hts::new(name);
        hts.add_ts(ts).unwrap();
        hts
    }

    #[test]
    fn second_system_is_renamed_and_inputs_are_tied() {
        let m = build_miter(&system("a", Sort::BitVec(2)), &system("b", Sort::BitVec(2)), false, &[])
            .unwrap();
        assert!(m.hts.var("B$top$r").is_some());
        assert!(m.hts.var("top$r").is_some());
        assert_eq!(m.outputs, vec!["top$out"]);
        assert_eq!(
            m.signal,
            Expr::var("top$out").ne(Expr::var("B$top$out"))
        );
        let invar = m.hts.invar();
        assert!(invar
            .conjuncts()
            .contains(&&Expr::var("top$in").eq(Expr::var("B$top$in"))));
        assert!(m.renamed.contains(&("top$in".into(), "B$top$in".into())));
    }

    #[test]
    fn symbolic_init_equates_shared_state() {
        let m = build_miter(&system("a", Sort::BitVec(2)), &system("b", Sort::BitVec(2)), true, &[])
            .unwrap();
        assert!(m
            .hts
            .init()
            .conjuncts()
            .contains(&&Expr::var("top$r").eq(Expr::var("B$top$r"))));
    }

    #[test]
    fn output_selection_is_checked() {
        let a = system("a", Sort::BitVec(2));
        let b = system("b", Sort::BitVec(2));
        assert!(matches!(
            build_miter(&a, &b, false, &["top$missing".into()]),
            Err(MiterError::UnknownOutput(_))
        ));
        assert!(matches!(
            build_miter(&a, &system("c", Sort::Int), false, &[]),
            Err(MiterError::SortMismatch { .. })
        ));
        assert!(matches!(
            build_miter(&a, &Hts::new("empty"), false, &[]),
            Err(MiterError::NoCommonOutputs)
        ));
    }

    #[test]
    fn verdicts_follow_the_check_result() {
        let violated = CheckResult::Violated {
            depth: 2,
            witness: Witness::default(),
        };
        let exhausted = CheckResult::Unknown {
            depth_reached: 5,
            reason: String::new(),
            exhausted: true,
        };
        let gave_up = CheckResult::Unknown {
            depth_reached: 1,
            reason: "timeout".into(),
            exhausted: false,
        };
        assert_eq!(
            EquivalenceVerdict::from_check(&violated, true),
            Some(EquivalenceVerdict::NotEquivalent { depth: 2 })
        );
        assert_eq!(
            EquivalenceVerdict::from_check(&exhausted, true),
            Some(EquivalenceVerdict::Equivalent)
        );
        assert_eq!(
            EquivalenceVerdict::from_check(&exhausted, false),
            Some(EquivalenceVerdict::BoundedEquivalent { k: 5 })
        );
        assert_eq!(EquivalenceVerdict::from_check(&gave_up, true), None);
        assert_eq!(
            EquivalenceVerdict::BoundedEquivalent { k: 5 }.status(),
            Status::Unknown
        );
        assert_eq!(
            EquivalenceVerdict::BoundedEquivalent { k: 5 }.to_string(),
            "systems are equivalent up to k=5"
        );
    }
}
