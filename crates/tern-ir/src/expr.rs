use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

/// Quantifier-free predicate over the variables of a transition system.
///
/// `Var(x)` refers to the value of `x` in the current state, `Next(x)` to its
/// value in the successor state. Only `trans` (and assumptions conjoined into
/// it) may contain `Next`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Expr {
    Var(String),
    Next(String),
    BoolLit(bool),
    IntLit(i64),

    Not(Box<Expr>),
    And(Vec<Expr>),
    Or(Vec<Expr>),
    Implies(Box<Expr>, Box<Expr>),

    Eq(Box<Expr>, Box<Expr>),
    Ne(Box<Expr>, Box<Expr>),
    Lt(Box<Expr>, Box<Expr>),
    Le(Box<Expr>, Box<Expr>),
    Gt(Box<Expr>, Box<Expr>),
    Ge(Box<Expr>, Box<Expr>),

    Add(Box<Expr>, Box<Expr>),
    Sub(Box<Expr>, Box<Expr>),
    Mul(Box<Expr>, Box<Expr>),

    Ite(Box<Expr>, Box<Expr>, Box<Expr>),
}

/// A variable occurrence handed to [`Expr::rewrite_vars`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VarRef<'a> {
    Current(&'a str),
    Next(&'a str),
}

impl<'a> VarRef<'a> {
    pub fn name(&self) -> &'a str {
        match self {
            VarRef::Current(name) | VarRef::Next(name) => name,
        }
    }
}

#[allow(clippy::should_implement_trait)]
impl Expr {
    pub fn var(name: impl Into<String>) -> Self {
        Expr::Var(name.into())
    }

    pub fn next(name: impl Into<String>) -> Self {
        Expr::Next(name.into())
    }

    pub fn tt() -> Self {
        Expr::BoolLit(true)
    }

    pub fn ff() -> Self {
        Expr::BoolLit(false)
    }

    pub fn int(n: i64) -> Self {
        Expr::IntLit(n)
    }

    pub fn not(self) -> Self {
        match self {
            Expr::BoolLit(b) => Expr::BoolLit(!b),
            Expr::Not(inner) => *inner,
            other => Expr::Not(Box::new(other)),
        }
    }

    pub fn and(self, other: Expr) -> Self {
        Expr::conjoin([self, other])
    }

    pub fn or(self, other: Expr) -> Self {
        Expr::disjoin([self, other])
    }

    pub fn implies(self, other: Expr) -> Self {
        Expr::Implies(Box::new(self), Box::new(other))
    }

    pub fn eq(self, other: Expr) -> Self {
        Expr::Eq(Box::new(self), Box::new(other))
    }

    pub fn ne(self, other: Expr) -> Self {
        Expr::Ne(Box::new(self), Box::new(other))
    }

    pub fn lt(self, other: Expr) -> Self {
        Expr::Lt(Box::new(self), Box::new(other))
    }

    pub fn le(self, other: Expr) -> Self {
        Expr::Le(Box::new(self), Box::new(other))
    }

    pub fn gt(self, other: Expr) -> Self {
        Expr::Gt(Box::new(self), Box::new(other))
    }

    pub fn ge(self, other: Expr) -> Self {
        Expr::Ge(Box::new(self), Box::new(other))
    }

    pub fn add(self, other: Expr) -> Self {
        Expr::Add(Box::new(self), Box::new(other))
    }

    pub fn sub(self, other: Expr) -> Self {
        Expr::Sub(Box::new(self), Box::new(other))
    }

    pub fn mul(self, other: Expr) -> Self {
        Expr::Mul(Box::new(self), Box::new(other))
    }

    pub fn ite(cond: Expr, then: Expr, els: Expr) -> Self {
        Expr::Ite(Box::new(cond), Box::new(then), Box::new(els))
    }

    /// Conjunction that flattens nested `And`s and drops `True` operands.
    pub fn conjoin(exprs: impl IntoIterator<Item = Expr>) -> Self {
        let mut out = Vec::new();
        for e in exprs {
            match e {
                Expr::BoolLit(true) => {}
                Expr::BoolLit(false) => return Expr::ff(),
                Expr::And(inner) => out.extend(inner),
                other => out.push(other),
            }
        }
        match out.len() {
            0 => Expr::tt(),
            1 => out.pop().unwrap_or_else(Expr::tt),
            _ => Expr::And(out),
        }
    }

    /// Disjunction that flattens nested `Or`s and drops `False` operands.
    pub fn disjoin(exprs: impl IntoIterator<Item = Expr>) -> Self {
        let mut out = Vec::new();
        for e in exprs {
            match e {
                Expr::BoolLit(false) => {}
                Expr::BoolLit(true) => return Expr::tt(),
                Expr::Or(inner) => out.extend(inner),
                other => out.push(other),
            }
        }
        match out.len() {
            0 => Expr::ff(),
            1 => out.pop().unwrap_or_else(Expr::ff),
            _ => Expr::Or(out),
        }
    }

    pub fn is_true(&self) -> bool {
        matches!(self, Expr::BoolLit(true))
    }

    pub fn is_constant(&self) -> bool {
        matches!(self, Expr::BoolLit(_) | Expr::IntLit(_))
    }

    /// Top-level conjuncts; `True` has none.
    pub fn conjuncts(&self) -> Vec<&Expr> {
        match self {
            Expr::BoolLit(true) => Vec::new(),
            Expr::And(items) => items.iter().flat_map(|e| e.conjuncts()).collect(),
            other => vec![other],
        }
    }

    fn children(&self) -> Vec<&Expr> {
        match self {
            Expr::Var(_) | Expr::Next(_) | Expr::BoolLit(_) | Expr::IntLit(_) => Vec::new(),
            Expr::Not(inner) => vec![inner],
            Expr::And(items) | Expr::Or(items) => items.iter().collect(),
            Expr::Implies(l, r)
            | Expr::Eq(l, r)
            | Expr::Ne(l, r)
            | Expr::Lt(l, r)
            | Expr::Le(l, r)
            | Expr::Gt(l, r)
            | Expr::Ge(l, r)
            | Expr::Add(l, r)
            | Expr::Sub(l, r)
            | Expr::Mul(l, r) => vec![l, r],
            Expr::Ite(c, t, e) => vec![c, t, e],
        }
    }

    /// True if the expression mentions any next-state variable.
    pub fn has_next(&self) -> bool {
        match self {
            Expr::Next(_) => true,
            other => other.children().into_iter().any(Expr::has_next),
        }
    }

    /// Names of all variables referenced, in either the current or next state.
    pub fn free_vars(&self) -> BTreeSet<String> {
        let mut out = BTreeSet::new();
        self.collect_vars(&mut out);
        out
    }

    fn collect_vars(&self, out: &mut BTreeSet<String>) {
        match self {
            Expr::Var(name) | Expr::Next(name) => {
                out.insert(name.clone());
            }
            other => {
                for child in other.children() {
                    child.collect_vars(out);
                }
            }
        }
    }

    /// Rebuild the expression, replacing every variable occurrence by `f(occurrence)`.
    pub fn rewrite_vars<F>(&self, f: &mut F) -> Expr
    where
        F: FnMut(VarRef<'_>) -> Expr,
    {
        match self {
            Expr::Var(name) => return f(VarRef::Current(name)),
            Expr::Next(name) => return f(VarRef::Next(name)),
            _ => {}
        }
        let mut go = |e: &Expr| e.rewrite_vars(f);
        match self {
            Expr::Var(_) | Expr::Next(_) | Expr::BoolLit(_) | Expr::IntLit(_) => self.clone(),
            Expr::Not(inner) => Expr::Not(Box::new(go(inner))),
            Expr::And(items) => Expr::And(items.iter().map(&mut go).collect()),
            Expr::Or(items) => Expr::Or(items.iter().map(&mut go).collect()),
            Expr::Implies(l, r) => Expr::Implies(Box::new(go(l)), Box::new(go(r))),
            Expr::Eq(l, r) => Expr::Eq(Box::new(go(l)), Box::new(go(r))),
            Expr::Ne(l, r) => Expr::Ne(Box::new(go(l)), Box::new(go(r))),
            Expr::Lt(l, r) => Expr::Lt(Box::new(go(l)), Box::new(go(r))),
            Expr::Le(l, r) => Expr::Le(Box::new(go(l)), Box::new(go(r))),
            Expr::Gt(l, r) => Expr::Gt(Box::new(go(l)), Box::new(go(r))),
            Expr::Ge(l, r) => Expr::Ge(Box::new(go(l)), Box::new(go(r))),
            Expr::Add(l, r) => Expr::Add(Box::new(go(l)), Box::new(go(r))),
            Expr::Sub(l, r) => Expr::Sub(Box::new(go(l)), Box::new(go(r))),
            Expr::Mul(l, r) => Expr::Mul(Box::new(go(l)), Box::new(go(r))),
            Expr::Ite(c, t, e) => Expr::Ite(Box::new(go(c)), Box::new(go(t)), Box::new(go(e))),
        }
    }

    /// Rename every variable, preserving current/next placement.
    pub fn rename(&self, rename: &dyn Fn(&str) -> String) -> Expr {
        self.rewrite_vars(&mut |v| match v {
            VarRef::Current(name) => Expr::Var(rename(name)),
            VarRef::Next(name) => Expr::Next(rename(name)),
        })
    }

    /// Lift a current-state predicate to the successor state.
    ///
    /// Returns `None` if the predicate already refers to the next state.
    pub fn to_next(&self) -> Option<Expr> {
        if self.has_next() {
            return None;
        }
        Some(self.rewrite_vars(&mut |v| Expr::Next(v.name().to_string())))
    }
}

fn fmt_binary(f: &mut fmt::Formatter<'_>, l: &Expr, op: &str, r: &Expr) -> fmt::Result {
    write!(f, "({l} {op} {r})")
}

fn fmt_nary(f: &mut fmt::Formatter<'_>, items: &[Expr], op: &str, empty: &str) -> fmt::Result {
    if items.is_empty() {
        return write!(f, "{empty}");
    }
    write!(f, "(")?;
    for (i, item) in items.iter().enumerate() {
        if i > 0 {
            write!(f, " {op} ")?;
        }
        write!(f, "{item}")?;
    }
    write!(f, ")")
}

/// Prints in the textual predicate syntax accepted by `tern-dsl`.
impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Expr::Var(name) => write!(f, "{name}"),
            Expr::Next(name) => write!(f, "next({name})"),
            Expr::BoolLit(true) => write!(f, "True"),
            Expr::BoolLit(false) => write!(f, "False"),
            Expr::IntLit(n) => write!(f, "{n}"),
            Expr::Not(inner) => write!(f, "(!{inner})"),
            Expr::And(items) => fmt_nary(f, items, "&", "True"),
            Expr::Or(items) => fmt_nary(f, items, "|", "False"),
            Expr::Implies(l, r) => fmt_binary(f, l, "->", r),
            Expr::Eq(l, r) => fmt_binary(f, l, "=", r),
            Expr::Ne(l, r) => fmt_binary(f, l, "!=", r),
            Expr::Lt(l, r) => fmt_binary(f, l, "<", r),
            Expr::Le(l, r) => fmt_binary(f, l, "<=", r),
            Expr::Gt(l, r) => fmt_binary(f, l, ">", r),
            Expr::Ge(l, r) => fmt_binary(f, l, ">=", r),
            Expr::Add(l, r) => fmt_binary(f, l, "+", r),
            Expr::Sub(l, r) => fmt_binary(f, l, "-", r),
            Expr::Mul(l, r) => fmt_binary(f, l, "*", r),
            Expr::Ite(c, t, e) => write!(f, "ite({c}, {t}, {e})"),
        }
    }
}
