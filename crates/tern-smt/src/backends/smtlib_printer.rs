use crate::sorts::SmtSort;
use crate::terms::SmtTerm;

/// Print an SmtTerm in SMT-LIB2 syntax.
pub fn to_smtlib(term: &SmtTerm) -> String {
    match term {
        SmtTerm::Var(name) => symbol(name),
        SmtTerm::IntLit(n) => {
            if *n < 0 {
                format!("(- {})", n.unsigned_abs())
            } else {
                n.to_string()
            }
        }
        SmtTerm::BoolLit(b) => b.to_string(),
        SmtTerm::Add(lhs, rhs) => binary("+", lhs, rhs),
        SmtTerm::Sub(lhs, rhs) => binary("-", lhs, rhs),
        SmtTerm::Mul(lhs, rhs) => binary("*", lhs, rhs),
        SmtTerm::Mod(lhs, rhs) => binary("mod", lhs, rhs),
        SmtTerm::Eq(lhs, rhs) => binary("=", lhs, rhs),
        SmtTerm::Lt(lhs, rhs) => binary("<", lhs, rhs),
        SmtTerm::Le(lhs, rhs) => binary("<=", lhs, rhs),
        SmtTerm::Gt(lhs, rhs) => binary(">", lhs, rhs),
        SmtTerm::Ge(lhs, rhs) => binary(">=", lhs, rhs),
        SmtTerm::And(terms) => nary("and", "true", terms),
        SmtTerm::Or(terms) => nary("or", "false", terms),
        SmtTerm::Not(inner) => format!("(not {})", to_smtlib(inner)),
        SmtTerm::Implies(lhs, rhs) => binary("=>", lhs, rhs),
        SmtTerm::Ite(cond, then, els) => format!(
            "(ite {} {} {})",
            to_smtlib(cond),
            to_smtlib(then),
            to_smtlib(els)
        ),
    }
}

fn binary(op: &str, lhs: &SmtTerm, rhs: &SmtTerm) -> String {
    format!("({op} {} {})", to_smtlib(lhs), to_smtlib(rhs))
}

fn nary(op: &str, empty: &str, terms: &[SmtTerm]) -> String {
    match terms {
        [] => empty.to_string(),
        [single] => to_smtlib(single),
        _ => {
            let inner: Vec<String> = terms.iter().map(to_smtlib).collect();
            format!("({op} {})", inner.join(" "))
        }
    }
}

/// Print a sort in SMT-LIB2 syntax.
pub fn sort_to_smtlib(sort: &SmtSort) -> &'static str {
    match sort {
        SmtSort::Bool => "Bool",
        SmtSort::Int => "Int",
    }
}

/// Print a variable name as an SMT-LIB2 symbol, quoting it with `|...|`
/// when it is not a legal simple symbol.
pub fn symbol(name: &str) -> String {
    const EXTRA: &str = "~!@$%^&*_-+=<>.?/";
    let simple = !name.is_empty()
        && !name.starts_with(|c: char| c.is_ascii_digit())
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || EXTRA.contains(c));
    if simple {
        name.to_string()
    } else {
        // `|` and `\` cannot appear inside a quoted symbol.
        let body: String = name
            .chars()
            .map(|c| if c == '|' || c == '\\' { '_' } else { c })
            .collect();
        format!("|{body}|")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn print_simple_term() {
        let term = SmtTerm::var("x@0").add(SmtTerm::int(1)).ge(SmtTerm::int(0));
        assert_eq!(to_smtlib(&term), "(>= (+ x@0 1) 0)");
        let wrapped = SmtTerm::var("x@0").sub(SmtTerm::int(1)).modulo(SmtTerm::int(8));
        assert_eq!(to_smtlib(&wrapped), "(mod (- x@0 1) 8)");
    }

    #[test]
    fn print_connectives_and_negative_literals() {
        let term = SmtTerm::and(vec![
            SmtTerm::var("a").gt(SmtTerm::int(-3)),
            SmtTerm::var("b").lt(SmtTerm::int(10)).not(),
        ]);
        assert_eq!(to_smtlib(&term), "(and (> a (- 3)) (not (< b 10)))");
        assert_eq!(to_smtlib(&SmtTerm::Or(vec![])), "false");
        assert_eq!(to_smtlib(&SmtTerm::int(i64::MIN)), "(- 9223372036854775808)");
    }

    #[test]
    fn symbols_are_quoted_only_when_needed() {
        assert_eq!(symbol("top$sub$x@3"), "top$sub$x@3");
        assert_eq!(symbol("0start"), "|0start|");
        assert_eq!(symbol("a b"), "|a b|");
        assert_eq!(symbol("odd|name"), "|odd_name|");
    }
}
