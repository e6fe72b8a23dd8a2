use tern_ir::Sort;

/// SMT sorts. Bit-vectors are encoded as range-constrained integers.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum SmtSort {
    Bool,
    Int,
}

impl From<Sort> for SmtSort {
    fn from(sort: Sort) -> Self {
        match sort {
            Sort::Bool => SmtSort::Bool,
            Sort::Int | Sort::BitVec(_) => SmtSort::Int,
        }
    }
}

impl std::fmt::Display for SmtSort {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SmtSort::Bool => write!(f, "Bool"),
            SmtSort::Int => write!(f, "Int"),
        }
    }
}
