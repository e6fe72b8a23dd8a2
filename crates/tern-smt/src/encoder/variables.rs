//! Variable naming for unrolled encodings.
//!
//! - `x@i`: variable `x` at forward step `i`
//! - `x@bj`: variable `x` at step `j` counted back from the bad state
//! - `x@aj`: second copy of step `j`, used to compare two successors
//! - `__loop@l`: lasso selector, the last state loops back to step `l`
//! - `__noloop`: the lasso-free disjunct of an LTL encoding

/// Suffix of forward step `i`.
pub fn fwd_step(i: usize) -> String {
    i.to_string()
}

/// Suffix of backward step `j` (zig-zag unrolling only).
pub fn bwd_step(j: usize) -> String {
    format!("b{j}")
}

/// Suffix of the second copy of step `j` (determinism checks only).
pub fn alt_step(j: usize) -> String {
    format!("a{j}")
}

pub fn timed_var(var: &str, step: &str) -> String {
    format!("{var}@{step}")
}

pub(crate) fn loop_var(l: usize) -> String {
    format!("__loop@{l}")
}

pub(crate) const NO_LOOP_VAR: &str = "__noloop";
