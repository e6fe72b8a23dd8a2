//! Batch summary and trace materialization.

use std::fs;
use std::path::{Path, PathBuf};

use serde::Serialize;
use tracing::info;

use crate::miter::EquivalenceVerdict;
use crate::problem::{Problem, ProblemState, Status, VerificationKind};
use crate::solver::EngineError;

/// One summary line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReportLine {
    pub name: String,
    pub description: String,
    pub verification: VerificationKind,
    pub status: Status,
    /// Depth checking stopped at, reported for undecided problems only.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub depth: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub verdict: Option<EquivalenceVerdict>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct BatchReport {
    pub lines: Vec<ReportLine>,
}

impl BatchReport {
    pub fn from_problems(problems: &[Problem]) -> Self {
        let lines = problems
            .iter()
            .map(|p| ReportLine {
                name: p.name.clone(),
                description: p.description.clone(),
                verification: p.verification,
                status: p.status,
                depth: match p.status {
                    Status::Unknown => p.depth_reached,
                    _ => None,
                },
                verdict: p.verdict,
                error: match &p.state {
                    ProblemState::Errored(message) => Some(message.clone()),
                    _ => None,
                },
            })
            .collect();
        Self { lines }
    }

    pub fn statuses(&self) -> Vec<Status> {
        self.lines.iter().map(|l| l.status).collect()
    }

    pub fn render(&self) -> String {
        let mut out = String::new();
        out.push_str("*** SUMMARY ***\n");
        for line in &self.lines {
            out.push_str(&format!("\n** Problem {} **\n", line.name));
            if !line.description.is_empty() {
                out.push_str(&format!("Description: {}\n", line.description));
            }
            out.push_str(&format!("Result: {}\n", line.status));
            if let Some(depth) = line.depth {
                out.push_str(&format!("BMC depth: {depth}\n"));
            }
            if let Some(verdict) = line.verdict {
                out.push_str(&format!("Equivalence: {verdict}\n"));
            }
            if let Some(error) = &line.error {
                out.push_str(&format!("Error: {error}\n"));
            }
        }
        out
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}

/// Paths of the text and VCD trace files for problem `id`.
pub fn trace_paths(prefix: &Path, id: &str) -> (PathBuf, PathBuf) {
    let base = prefix.as_os_str().to_string_lossy();
    (
        PathBuf::from(format!("{base}-{id}.txt")),
        PathBuf::from(format!("{base}-{id}.vcd")),
    )
}

/// Emit the traces worth keeping: counterexamples of failed checks and
/// executions of successful simulations.
///
/// With a prefix, traces go to `<prefix>-<problem>.txt` (and `.vcd` when
/// one was rendered); without one, the text trace is logged. Returns the
/// files written.
pub fn write_traces(problems: &[Problem], prefix: Option<&Path>) -> Result<Vec<PathBuf>, EngineError> {
    let mut written = Vec::new();
    for problem in problems {
        let simulation = problem.verification == VerificationKind::Simulation;
        let label = match (simulation, problem.status) {
            (false, Status::False) => "Counterexample",
            (true, Status::True) => "Execution",
            _ => continue,
        };
        let Some(trace) = &problem.trace else {
            continue;
        };
        let Some(prefix) = prefix else {
            info!("{}", trace.text);
            continue;
        };
        let (txt, vcd) = trace_paths(prefix, &problem.name);
        write_file(&txt, &trace.text)?;
        written.push(txt.clone());
        match &trace.vcd {
            Some(waveform) => {
                write_file(&vcd, waveform)?;
                info!(problem = %problem.name, "{label} stored in \"{}\" and in \"{}\"", txt.display(), vcd.display());
                written.push(vcd);
            }
            None => info!(problem = %problem.name, "{label} stored in \"{}\"", txt.display()),
        }
    }
    Ok(written)
}

fn write_file(path: &Path, contents: &str) -> Result<(), EngineError> {
    fs::write(path, contents).map_err(|source| EngineError::Io {
        path: path.to_path_buf(),
        source,
    })
}
