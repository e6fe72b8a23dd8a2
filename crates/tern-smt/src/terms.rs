/// Abstract SMT term representation, solver-agnostic.
#[derive(Debug, Clone, PartialEq)]
pub enum SmtTerm {
    /// Variable reference by name.
    Var(String),
    IntLit(i64),
    BoolLit(bool),

    Add(Box<SmtTerm>, Box<SmtTerm>),
    Sub(Box<SmtTerm>, Box<SmtTerm>),
    Mul(Box<SmtTerm>, Box<SmtTerm>),
    /// Euclidean remainder; non-negative for a positive divisor.
    Mod(Box<SmtTerm>, Box<SmtTerm>),

    Eq(Box<SmtTerm>, Box<SmtTerm>),
    Lt(Box<SmtTerm>, Box<SmtTerm>),
    Le(Box<SmtTerm>, Box<SmtTerm>),
    Gt(Box<SmtTerm>, Box<SmtTerm>),
    Ge(Box<SmtTerm>, Box<SmtTerm>),

    And(Vec<SmtTerm>),
    Or(Vec<SmtTerm>),
    Not(Box<SmtTerm>),
    Implies(Box<SmtTerm>, Box<SmtTerm>),

    Ite(Box<SmtTerm>, Box<SmtTerm>, Box<SmtTerm>),
}

#[allow(clippy::should_implement_trait)]
impl SmtTerm {
    pub fn var(name: impl Into<String>) -> Self {
        SmtTerm::Var(name.into())
    }

    pub fn int(n: i64) -> Self {
        SmtTerm::IntLit(n)
    }

    pub fn bool(b: bool) -> Self {
        SmtTerm::BoolLit(b)
    }

    pub fn add(self, other: SmtTerm) -> Self {
        SmtTerm::Add(Box::new(self), Box::new(other))
    }

    pub fn sub(self, other: SmtTerm) -> Self {
        SmtTerm::Sub(Box::new(self), Box::new(other))
    }

    pub fn mul(self, other: SmtTerm) -> Self {
        SmtTerm::Mul(Box::new(self), Box::new(other))
    }

    pub fn modulo(self, other: SmtTerm) -> Self {
        SmtTerm::Mod(Box::new(self), Box::new(other))
    }

    pub fn eq(self, other: SmtTerm) -> Self {
        SmtTerm::Eq(Box::new(self), Box::new(other))
    }

    pub fn lt(self, other: SmtTerm) -> Self {
        SmtTerm::Lt(Box::new(self), Box::new(other))
    }

    pub fn le(self, other: SmtTerm) -> Self {
        SmtTerm::Le(Box::new(self), Box::new(other))
    }

    pub fn gt(self, other: SmtTerm) -> Self {
        SmtTerm::Gt(Box::new(self), Box::new(other))
    }

    pub fn ge(self, other: SmtTerm) -> Self {
        SmtTerm::Ge(Box::new(self), Box::new(other))
    }

    /// Conjunction; drops `true` operands and collapses trivial cases.
    pub fn and(terms: Vec<SmtTerm>) -> Self {
        let mut out = Vec::with_capacity(terms.len());
        for t in terms {
            match t {
                SmtTerm::BoolLit(true) => {}
                SmtTerm::BoolLit(false) => return SmtTerm::BoolLit(false),
                SmtTerm::And(inner) => out.extend(inner),
                other => out.push(other),
            }
        }
        match out.len() {
            0 => SmtTerm::BoolLit(true),
            1 => out.pop().unwrap_or(SmtTerm::BoolLit(true)),
            _ => SmtTerm::And(out),
        }
    }

    /// Disjunction; drops `false` operands and collapses trivial cases.
    pub fn or(terms: Vec<SmtTerm>) -> Self {
        let mut out = Vec::with_capacity(terms.len());
        for t in terms {
            match t {
                SmtTerm::BoolLit(false) => {}
                SmtTerm::BoolLit(true) => return SmtTerm::BoolLit(true),
                SmtTerm::Or(inner) => out.extend(inner),
                other => out.push(other),
            }
        }
        match out.len() {
            0 => SmtTerm::BoolLit(false),
            1 => out.pop().unwrap_or(SmtTerm::BoolLit(false)),
            _ => SmtTerm::Or(out),
        }
    }

    pub fn not(self) -> Self {
        match self {
            SmtTerm::BoolLit(b) => SmtTerm::BoolLit(!b),
            SmtTerm::Not(inner) => *inner,
            other => SmtTerm::Not(Box::new(other)),
        }
    }

    pub fn implies(self, other: SmtTerm) -> Self {
        SmtTerm::Implies(Box::new(self), Box::new(other))
    }

    pub fn ite(cond: SmtTerm, then: SmtTerm, els: SmtTerm) -> Self {
        SmtTerm::Ite(Box::new(cond), Box::new(then), Box::new(els))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn and_simplifies_literals() {
        assert_eq!(SmtTerm::and(vec![]), SmtTerm::bool(true));
        assert_eq!(
            SmtTerm::and(vec![SmtTerm::bool(true), SmtTerm::var("a")]),
            SmtTerm::var("a")
        );
        assert_eq!(
            SmtTerm::and(vec![SmtTerm::var("a"), SmtTerm::bool(false)]),
            SmtTerm::bool(false)
        );
    }

    #[test]
    fn or_flattens_nested_disjunctions() {
        let t = SmtTerm::or(vec![
            SmtTerm::or(vec![SmtTerm::var("a"), SmtTerm::var("b")]),
            SmtTerm::var("c"),
        ]);
        assert_eq!(
            t,
            SmtTerm::Or(vec![SmtTerm::var("a"), SmtTerm::var("b"), SmtTerm::var("c")])
        );
    }
}
