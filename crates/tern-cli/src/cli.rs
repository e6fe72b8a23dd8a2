//! CLI argument definitions: top-level `Cli` struct and `Commands` enum.

use std::path::PathBuf;

use clap::{ArgAction, Args, Parser, Subcommand, ValueEnum};
use tern_engine::{BatchDefaults, VerificationKind};
use tern_smt::{SolverKind, Strategy};

pub(crate) const CLI_LONG_ABOUT: &str =
    "Bounded model checking of hierarchical transition systems.\n\n\
    Single run:\n  \
    tern verify -i counter.sts --safety -p 'x < 8' -k 20\n\n\
    Batch:\n  \
    tern problems problems.json --prefix out/trace --vcd\n\n\
    Model lists are comma-separated; flags follow the path in brackets,\n\
    as in `model.sts[no_init],values.init`.";

#[derive(Parser)]
#[command(name = "tern")]
#[command(about = "Bounded model checking of hierarchical transition systems")]
#[command(long_about = CLI_LONG_ABOUT)]
#[command(version)]
pub(crate) struct Cli {
    /// Raise log verbosity (-v debug, -vv trace); RUST_LOG takes precedence
    #[arg(short, long, global = true, action = ArgAction::Count)]
    pub(crate) verbose: u8,

    #[command(subcommand)]
    pub(crate) command: Commands,
}

#[derive(Subcommand)]
pub(crate) enum Commands {
    /// Check properties of a model list
    #[command(display_order = 10)]
    Verify(VerifyArgs),

    /// Solve every problem of a JSON problem set
    #[command(display_order = 20)]
    Problems(ProblemsArgs),
}

#[derive(Args)]
pub(crate) struct VerifyArgs {
    /// Comma-separated model files, e.g. `a.sts,b.sts[no_init]`
    #[arg(short = 'i', long = "input")]
    pub(crate) input: String,

    #[command(flatten)]
    pub(crate) kind: KindArgs,

    /// Properties: a file with one formula per line, or a comma-separated list
    #[arg(short = 'p', long = "properties")]
    pub(crate) properties: Option<String>,

    /// Assumptions added to the model for this run
    #[arg(short = 'a', long = "assumptions")]
    pub(crate) assumptions: Option<String>,

    /// Lemmas used to strengthen induction under --prove
    #[arg(short = 'l', long = "lemmas")]
    pub(crate) lemmas: Option<String>,

    /// Read BV(1) declarations as Bool
    #[arg(long)]
    pub(crate) boolean: bool,

    /// Save the parsed system to this snapshot file
    #[arg(long)]
    pub(crate) snapshot: Option<PathBuf>,

    /// Check that the state machine is deterministic
    #[arg(long)]
    pub(crate) fsm_check: bool,

    #[command(flatten)]
    pub(crate) run: RunArgs,
}

/// Verification kind selection; safety when none is given.
#[derive(Args)]
#[group(multiple = false)]
pub(crate) struct KindArgs {
    /// Check invariants (default)
    #[arg(long)]
    pub(crate) safety: bool,

    /// Check that each property holds infinitely often (G F p)
    #[arg(long)]
    pub(crate) liveness: bool,

    /// Check that each property eventually holds (F p)
    #[arg(long)]
    pub(crate) eventually: bool,

    /// Check LTL formulas
    #[arg(long)]
    pub(crate) ltl: bool,

    /// Look for executions reaching the properties
    #[arg(long)]
    pub(crate) simulate: bool,

    /// Compare outputs against this second model list
    #[arg(long, value_name = "MODELS")]
    pub(crate) equivalence: Option<String>,
}

impl KindArgs {
    pub(crate) fn verification(&self) -> VerificationKind {
        if self.liveness {
            VerificationKind::Liveness
        } else if self.eventually {
            VerificationKind::Eventually
        } else if self.ltl {
            VerificationKind::Ltl
        } else if self.simulate {
            VerificationKind::Simulation
        } else if self.equivalence.is_some() {
            VerificationKind::Equivalence
        } else {
            VerificationKind::Safety
        }
    }
}

#[derive(Args)]
pub(crate) struct ProblemsArgs {
    /// JSON problem set
    pub(crate) file: PathBuf,

    /// Stop the batch at the first checker error
    #[arg(long)]
    pub(crate) stop_on_error: bool,

    #[command(flatten)]
    pub(crate) run: RunArgs,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub(crate) enum OutputFormat {
    Text,
    Json,
}

/// Defaults applied to every problem of the run.
#[derive(Args)]
pub(crate) struct RunArgs {
    /// Maximum unrolling depth
    #[arg(short = 'k', long = "bmc-length", default_value_t = 10)]
    pub(crate) bmc_length: usize,

    /// Minimum unrolling depth
    #[arg(long = "km", default_value_t = 0)]
    pub(crate) bmc_length_min: usize,

    /// Try to prove properties by k-induction
    #[arg(long)]
    pub(crate) prove: bool,

    /// Unrolling strategy: FWD, BWD, ZZ or AUTO
    #[arg(long, default_value = "AUTO")]
    pub(crate) strategy: Strategy,

    /// Solver backend: z3 or cvc5
    #[arg(long, default_value = "z3")]
    pub(crate) solver: SolverKind,

    /// Reset the solver at every depth instead of reusing it
    #[arg(long)]
    pub(crate) no_incremental: bool,

    /// Per-query solver timeout in seconds (0 disables it)
    #[arg(long, default_value_t = 0)]
    pub(crate) timeout: u64,

    /// Start from any state (drops INIT)
    #[arg(long)]
    pub(crate) symbolic_init: bool,

    /// Print every variable at every step of a trace
    #[arg(long)]
    pub(crate) full_trace: bool,

    /// Write traces to `<prefix>-<problem>.txt`
    #[arg(long)]
    pub(crate) prefix: Option<PathBuf>,

    /// Also write VCD waveforms (needs --prefix)
    #[arg(long)]
    pub(crate) vcd: bool,

    /// Record every solver query to this SMT-LIB file
    #[arg(long = "smt2")]
    pub(crate) smt2_file: Option<PathBuf>,

    /// Only record the queries; every check ends undecided
    #[arg(long)]
    pub(crate) skip_solving: bool,

    /// Summary format
    #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
    pub(crate) format: OutputFormat,
}

impl RunArgs {
    pub(crate) fn defaults(&self) -> BatchDefaults {
        BatchDefaults {
            bmc_length: self.bmc_length,
            bmc_length_min: self.bmc_length_min,
            strategy: self.strategy,
            solver: self.solver,
            incremental: !self.no_incremental,
            skip_solving: self.skip_solving,
            vcd: self.vcd,
            prove: self.prove,
            symbolic_init: self.symbolic_init,
            full_trace: self.full_trace,
            smt2_file: self.smt2_file.clone(),
            solver_timeout_secs: self.timeout,
            prefix: self.prefix.clone(),
        }
    }
}
