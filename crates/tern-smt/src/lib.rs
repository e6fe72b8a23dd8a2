#![doc = include_str!("../README.md")]

pub mod backends;
pub mod bmc;
pub mod encoder;
pub mod fsm;
pub mod solver;
pub mod sorts;
pub mod terms;
pub mod witness;

pub use backends::{Backend, BackendError, BackendOptions, SolverKind};
pub use bmc::{check_ltl, check_safety, simulate, BmcOptions, CheckResult, Strategy};
pub use encoder::{EncodeError, Unroller};
pub use fsm::{check_determinism, Branching, Determinism};
pub use witness::{Value, Witness};
