use tern_ir::{Expr, Sort, VarKind};

/// Source span (byte offsets).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Span {
    pub start: usize,
    pub end: usize,
}

impl Span {
    pub fn new(start: usize, end: usize) -> Self {
        Self { start, end }
    }
}

/// A spanned AST node.
#[derive(Debug, Clone, PartialEq)]
pub struct Spanned<T> {
    pub node: T,
    pub span: Span,
}

impl<T> Spanned<T> {
    pub fn new(node: T, span: Span) -> Self {
        Self { node, span }
    }
}

/// One `name: Sort;` declaration. `name` is already canonical.
#[derive(Debug, Clone, PartialEq)]
pub struct Declaration {
    pub name: String,
    pub source_name: String,
    pub sort: Sort,
    pub kind: VarKind,
}

/// Parsed `.sts` file.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct StsModel {
    pub decls: Vec<Spanned<Declaration>>,
    pub init: Vec<Expr>,
    pub invar: Vec<Expr>,
    pub trans: Vec<Expr>,
}

/// Parsed `.ets` file.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct EtsModel {
    pub decls: Vec<Spanned<Declaration>>,
    /// Labelled state predicates in declaration order.
    pub states: Vec<Spanned<(String, Expr)>>,
    pub edges: Vec<Spanned<(String, String)>>,
}
