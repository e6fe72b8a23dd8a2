#![doc = include_str!("../README.md")]

//! Transition-system IR shared by the parsers, the SMT layer and the engine.

pub mod composition;
pub mod expr;
pub mod hts;
#[cfg(any(test, feature = "proptest"))]
pub mod proptest_generators;
pub mod snapshot;
pub mod temporal;
pub mod transition_system;
pub mod vars;

pub use composition::CompositionError;
pub use expr::{Expr, VarRef};
pub use hts::{Hts, HtsOrigin, HtsStats, InjectionGuard};
pub use snapshot::SnapshotError;
pub use temporal::{LtlFormula, Nnf};
pub use transition_system::TransitionSystem;
pub use vars::{Sort, VarDecl, VarKind, MAX_BV_WIDTH};
