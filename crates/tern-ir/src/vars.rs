use serde::{Deserialize, Serialize};
use std::fmt;

/// Widest bit-vector representable by the integer encoding.
pub const MAX_BV_WIDTH: u32 = 62;

/// Variable sort.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Sort {
    Bool,
    Int,
    /// Unsigned bit-vector of the given width, values in `[0, 2^w)`.
    BitVec(u32),
}

impl Sort {
    pub fn is_bool(&self) -> bool {
        matches!(self, Sort::Bool)
    }

    /// Inclusive value range for finite integer sorts.
    pub fn int_range(&self) -> Option<(i64, i64)> {
        match self {
            Sort::BitVec(w) => Some((0, (1_i64 << (*w).min(MAX_BV_WIDTH)) - 1)),
            Sort::Bool | Sort::Int => None,
        }
    }
}

impl fmt::Display for Sort {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Sort::Bool => write!(f, "Bool"),
            Sort::Int => write!(f, "Int"),
            Sort::BitVec(w) => write!(f, "BV({w})"),
        }
    }
}

/// Role of a variable in its component.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum VarKind {
    State,
    Input,
    Output,
}

impl fmt::Display for VarKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            VarKind::State => write!(f, "state"),
            VarKind::Input => write!(f, "input"),
            VarKind::Output => write!(f, "output"),
        }
    }
}

/// A declared variable.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct VarDecl {
    pub name: String,
    pub sort: Sort,
    pub kind: VarKind,
}

impl VarDecl {
    pub fn new(name: impl Into<String>, sort: Sort, kind: VarKind) -> Self {
        Self {
            name: name.into(),
            sort,
            kind,
        }
    }

    pub fn state(name: impl Into<String>, sort: Sort) -> Self {
        Self::new(name, sort, VarKind::State)
    }

    pub fn input(name: impl Into<String>, sort: Sort) -> Self {
        Self::new(name, sort, VarKind::Input)
    }

    pub fn output(name: impl Into<String>, sort: Sort) -> Self {
        Self::new(name, sort, VarKind::Output)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bitvec_range_is_unsigned() {
        assert_eq!(Sort::BitVec(4).int_range(), Some((0, 15)));
        assert_eq!(Sort::BitVec(1).int_range(), Some((0, 1)));
        assert_eq!(Sort::Int.int_range(), None);
    }

    #[test]
    fn sort_display_matches_model_syntax() {
        assert_eq!(Sort::BitVec(8).to_string(), "BV(8)");
        assert_eq!(Sort::Bool.to_string(), "Bool");
    }
}
