#![allow(clippy::result_large_err)]

use std::collections::HashSet;

use pest::Parser;
use pest_derive::Parser;
use tern_ir::{Expr, LtlFormula, Sort, VarKind, MAX_BV_WIDTH};

use crate::ast::*;
use crate::errors::ParseError;

#[derive(Parser)]
#[grammar = "grammar.pest"]
struct TernParser;

type Pair<'a> = pest::iterators::Pair<'a, Rule>;
type Pairs<'a> = pest::iterators::Pairs<'a, Rule>;

fn span_from(pair: &Pair<'_>) -> Span {
    let s = pair.as_span();
    Span::new(s.start(), s.end())
}

fn syntax_error_at(pair: &Pair<'_>, message: impl Into<String>) -> ParseError {
    ParseError::syntax(message, span_from(pair), "", "")
}

/// Next child of a node whose shape the grammar fixes.
fn child<'a>(inner: &mut Pairs<'a>, parent: Span, what: &str) -> Result<Pair<'a>, ParseError> {
    inner
        .next()
        .ok_or_else(|| ParseError::syntax(format!("expected {what}"), parent, "", ""))
}

/// Internal name for a source identifier: hierarchy separators `.` become `$`.
pub fn canonical_name(source: &str) -> String {
    source.replace('.', "$")
}

fn parse_rule<'a>(rule: Rule, source: &'a str, filename: &str) -> Result<Pair<'a>, ParseError> {
    let mut pairs = TernParser::parse(rule, source).map_err(|e| {
        let (start, end) = match &e.location {
            pest::error::InputLocation::Pos(p) => (*p, (*p + 1).min(source.len()).max(*p)),
            pest::error::InputLocation::Span((s, end)) => (*s, *end),
        };
        ParseError::syntax(format!("{e}"), Span::new(start, end), source, filename)
    })?;
    pairs
        .next()
        .ok_or_else(|| ParseError::syntax("empty input", Span::default(), source, filename))
}

/// Parse a single state or transition predicate.
pub fn parse_predicate(source: &str, filename: &str) -> Result<Expr, ParseError> {
    let top = parse_rule(Rule::predicate_input, source, filename)?;
    let span = span_from(&top);
    let mut inner = top.into_inner();
    let pred = child(&mut inner, span, "predicate")?;
    build_pred(pred).map_err(|e| e.with_source_context(source, filename))
}

/// Parse a temporal (LTL) formula.
pub fn parse_temporal(source: &str, filename: &str) -> Result<LtlFormula, ParseError> {
    let top = parse_rule(Rule::temporal_input, source, filename)?;
    let span = span_from(&top);
    let mut inner = top.into_inner();
    let ltl = child(&mut inner, span, "temporal formula")?;
    build_ltl(ltl).map_err(|e| e.with_source_context(source, filename))
}

/// Parse a symbolic transition system file.
pub fn parse_sts(source: &str, filename: &str) -> Result<StsModel, ParseError> {
    let top = parse_rule(Rule::sts_file, source, filename)?;
    build_sts(top).map_err(|e| e.with_source_context(source, filename))
}

/// Parse an explicit transition system file.
pub fn parse_ets(source: &str, filename: &str) -> Result<EtsModel, ParseError> {
    let top = parse_rule(Rule::ets_file, source, filename)?;
    build_ets(top).map_err(|e| e.with_source_context(source, filename))
}

// ---------------------------------------------------------------------------
// Predicates
// ---------------------------------------------------------------------------

fn build_pred(pair: Pair<'_>) -> Result<Expr, ParseError> {
    let span = span_from(&pair);
    match pair.as_rule() {
        Rule::pred => {
            let mut inner = pair.into_inner();
            let mut result = build_pred(child(&mut inner, span, "operand")?)?;
            while inner.next().is_some() {
                let rhs = build_pred(child(&mut inner, span, "operand")?)?;
                result = result.eq(rhs);
            }
            Ok(result)
        }
        Rule::pred_imp => {
            let mut inner = pair.into_inner();
            let lhs = build_pred(child(&mut inner, span, "operand")?)?;
            match inner.next() {
                Some(_) => Ok(lhs.implies(build_pred(child(&mut inner, span, "operand")?)?)),
                None => Ok(lhs),
            }
        }
        Rule::pred_or => {
            let operands = pair
                .into_inner()
                .filter(|p| p.as_rule() != Rule::or_op)
                .map(build_pred)
                .collect::<Result<Vec<_>, _>>()?;
            Ok(Expr::disjoin(operands))
        }
        Rule::pred_and => {
            let operands = pair
                .into_inner()
                .filter(|p| p.as_rule() != Rule::and_op)
                .map(build_pred)
                .collect::<Result<Vec<_>, _>>()?;
            Ok(Expr::conjoin(operands))
        }
        Rule::pred_unary => {
            let mut inner = pair.into_inner();
            let first = child(&mut inner, span, "operand")?;
            if first.as_rule() == Rule::not_op {
                Ok(build_pred(child(&mut inner, span, "operand")?)?.not())
            } else {
                build_pred(first)
            }
        }
        Rule::comparison => {
            let mut inner = pair.into_inner();
            let lhs = build_pred(child(&mut inner, span, "operand")?)?;
            let Some(op) = inner.next() else {
                return Ok(lhs);
            };
            let rhs = build_pred(child(&mut inner, span, "operand")?)?;
            Ok(match op.as_str() {
                "=" => lhs.eq(rhs),
                "!=" => lhs.ne(rhs),
                "<" => lhs.lt(rhs),
                "<=" => lhs.le(rhs),
                ">" => lhs.gt(rhs),
                ">=" => lhs.ge(rhs),
                other => return Err(syntax_error_at(&op, format!("unknown comparison '{other}'"))),
            })
        }
        Rule::arith | Rule::term => {
            let mut inner = pair.into_inner();
            let mut result = build_pred(child(&mut inner, span, "operand")?)?;
            while let Some(op) = inner.next() {
                let rhs = build_pred(child(&mut inner, span, "operand")?)?;
                result = match op.as_str() {
                    "+" => result.add(rhs),
                    "-" => result.sub(rhs),
                    "*" => result.mul(rhs),
                    other => {
                        return Err(syntax_error_at(&op, format!("unknown operator '{other}'")))
                    }
                };
            }
            Ok(result)
        }
        Rule::factor => {
            let mut inner = pair.into_inner();
            let first = child(&mut inner, span, "operand")?;
            if first.as_rule() != Rule::neg_op {
                return build_pred(first);
            }
            match build_pred(child(&mut inner, span, "operand")?)? {
                Expr::IntLit(n) => Ok(Expr::int(-n)),
                operand => Ok(Expr::int(0).sub(operand)),
            }
        }
        Rule::primary => {
            let mut inner = pair.into_inner();
            build_pred(child(&mut inner, span, "primary expression")?)
        }
        Rule::next_call => {
            let mut inner = pair.into_inner();
            let arg = build_pred(child(&mut inner, span, "next() argument")?)?;
            arg.to_next().ok_or_else(|| ParseError::nested_next(span))
        }
        Rule::ite_call => {
            let mut inner = pair.into_inner();
            let c = build_pred(child(&mut inner, span, "condition")?)?;
            let t = build_pred(child(&mut inner, span, "then branch")?)?;
            let e = build_pred(child(&mut inner, span, "else branch")?)?;
            Ok(Expr::ite(c, t, e))
        }
        Rule::primed => {
            let mut inner = pair.into_inner();
            let ident = child(&mut inner, span, "identifier")?;
            Ok(Expr::next(canonical_name(ident.as_str())))
        }
        Rule::ident => Ok(Expr::var(canonical_name(pair.as_str()))),
        Rule::int_lit => {
            let n: i64 = pair
                .as_str()
                .parse()
                .map_err(|e| syntax_error_at(&pair, format!("Invalid integer literal: {e}")))?;
            Ok(Expr::int(n))
        }
        Rule::bool_lit => Ok(Expr::BoolLit(pair.as_str() == "True")),
        _ => Err(syntax_error_at(
            &pair,
            format!("unexpected {:?} in predicate", pair.as_rule()),
        )),
    }
}

// ---------------------------------------------------------------------------
// Temporal formulas
// ---------------------------------------------------------------------------

fn build_ltl(pair: Pair<'_>) -> Result<LtlFormula, ParseError> {
    let span = span_from(&pair);
    let bx = Box::new;
    match pair.as_rule() {
        Rule::ltl => {
            let mut inner = pair.into_inner();
            let mut result = build_ltl(child(&mut inner, span, "operand")?)?;
            while inner.next().is_some() {
                let rhs = build_ltl(child(&mut inner, span, "operand")?)?;
                result = LtlFormula::Iff(bx(result), bx(rhs));
            }
            Ok(result)
        }
        Rule::ltl_imp => {
            let mut inner = pair.into_inner();
            let lhs = build_ltl(child(&mut inner, span, "operand")?)?;
            match inner.next() {
                Some(_) => {
                    let rhs = build_ltl(child(&mut inner, span, "operand")?)?;
                    Ok(LtlFormula::Implies(bx(lhs), bx(rhs)))
                }
                None => Ok(lhs),
            }
        }
        Rule::ltl_or | Rule::ltl_and => {
            let is_or = pair.as_rule() == Rule::ltl_or;
            let mut operands = pair
                .into_inner()
                .filter(|p| !matches!(p.as_rule(), Rule::or_op | Rule::and_op))
                .map(build_ltl);
            let mut result = match operands.next() {
                Some(first) => first?,
                None => return Err(ParseError::syntax("expected operand", span, "", "")),
            };
            for rhs in operands {
                result = if is_or {
                    LtlFormula::Or(bx(result), bx(rhs?))
                } else {
                    LtlFormula::And(bx(result), bx(rhs?))
                };
            }
            Ok(result)
        }
        Rule::ltl_until => {
            // Right-associative: a U b U c == a U (b U c).
            let mut operands = Vec::new();
            let mut ops = Vec::new();
            for p in pair.into_inner() {
                if p.as_rule() == Rule::until_op {
                    ops.push(p.as_str().to_string());
                } else {
                    operands.push(build_ltl(p)?);
                }
            }
            let mut result = operands
                .pop()
                .ok_or_else(|| ParseError::syntax("expected operand", span, "", ""))?;
            while let (Some(lhs), Some(op)) = (operands.pop(), ops.pop()) {
                result = if op == "U" {
                    LtlFormula::Until(bx(lhs), bx(result))
                } else {
                    LtlFormula::Release(bx(lhs), bx(result))
                };
            }
            Ok(result)
        }
        Rule::ltl_unary => {
            let mut inner = pair.into_inner();
            let first = child(&mut inner, span, "operand")?;
            match first.as_rule() {
                Rule::not_op => {
                    let sub = build_ltl(child(&mut inner, span, "operand")?)?;
                    Ok(LtlFormula::Not(bx(sub)))
                }
                Rule::temporal_op => {
                    let sub = bx(build_ltl(child(&mut inner, span, "operand")?)?);
                    Ok(match first.as_str() {
                        "G" => LtlFormula::Globally(sub),
                        "F" => LtlFormula::Finally(sub),
                        _ => LtlFormula::Next(sub),
                    })
                }
                _ => build_ltl(first),
            }
        }
        Rule::ltl_primary => {
            let mut inner = pair.into_inner();
            let first = child(&mut inner, span, "operand")?;
            match first.as_rule() {
                Rule::comparison => Ok(LtlFormula::Atom(build_pred(first)?)),
                _ => build_ltl(first),
            }
        }
        _ => Err(syntax_error_at(
            &pair,
            format!("unexpected {:?} in temporal formula", pair.as_rule()),
        )),
    }
}

// ---------------------------------------------------------------------------
// Model files
// ---------------------------------------------------------------------------

fn build_sort(pair: Pair<'_>) -> Result<Sort, ParseError> {
    let span = span_from(&pair);
    let mut inner = pair.into_inner();
    let sort = child(&mut inner, span, "sort")?;
    match sort.as_rule() {
        Rule::sort_bool => Ok(Sort::Bool),
        Rule::sort_int => Ok(Sort::Int),
        _ => {
            let width_pair = child(&mut sort.into_inner(), span, "bit-vector width")?;
            let width: u64 = width_pair
                .as_str()
                .parse()
                .map_err(|e| syntax_error_at(&width_pair, format!("Invalid width: {e}")))?;
            if width == 0 || width > u64::from(MAX_BV_WIDTH) {
                return Err(ParseError::bad_width(width, span_from(&width_pair)));
            }
            Ok(Sort::BitVec(width as u32))
        }
    }
}

fn build_decl_section(
    pair: Pair<'_>,
    seen: &mut HashSet<String>,
    out: &mut Vec<Spanned<Declaration>>,
) -> Result<(), ParseError> {
    let span = span_from(&pair);
    let mut inner = pair.into_inner();
    let kind = match child(&mut inner, span, "section keyword")?.as_rule() {
        Rule::input_kw => VarKind::Input,
        Rule::output_kw => VarKind::Output,
        _ => VarKind::State,
    };
    for decl in inner {
        let decl_span = span_from(&decl);
        let mut parts = decl.into_inner();
        let ident = child(&mut parts, decl_span, "identifier")?;
        let sort = build_sort(child(&mut parts, decl_span, "sort")?)?;
        let source_name = ident.as_str().to_string();
        if !seen.insert(source_name.clone()) {
            return Err(ParseError::duplicate(source_name, span_from(&ident)));
        }
        out.push(Spanned::new(
            Declaration {
                name: canonical_name(&source_name),
                source_name,
                sort,
                kind,
            },
            decl_span,
        ));
    }
    Ok(())
}

fn build_sts(top: Pair<'_>) -> Result<StsModel, ParseError> {
    let mut model = StsModel::default();
    let mut seen = HashSet::new();
    for section in top.into_inner() {
        if section.as_rule() != Rule::sts_section {
            continue;
        }
        let span = span_from(&section);
        let mut inner = section.into_inner();
        let head = child(&mut inner, span, "section")?;
        let rule = head.as_rule();
        if rule == Rule::decl_section {
            build_decl_section(head, &mut seen, &mut model.decls)?;
            continue;
        }
        for item in inner {
            let item_span = span_from(&item);
            let pred = child(&mut item.into_inner(), item_span, "formula")?;
            let expr = build_pred(pred)?;
            let target = match rule {
                Rule::init_kw => &mut model.init,
                Rule::invar_kw => &mut model.invar,
                _ => &mut model.trans,
            };
            if rule != Rule::trans_kw && expr.has_next() {
                return Err(ParseError::syntax(
                    "next-state reference outside TRANS",
                    item_span,
                    "",
                    "",
                ));
            }
            target.push(expr);
        }
    }
    Ok(model)
}

fn build_ets(top: Pair<'_>) -> Result<EtsModel, ParseError> {
    let mut model = EtsModel::default();
    let mut seen_vars = HashSet::new();
    let mut labels = HashSet::new();
    let mut has_states = false;
    for section in top.into_inner() {
        if section.as_rule() != Rule::ets_section {
            continue;
        }
        let span = span_from(&section);
        let mut inner = section.into_inner();
        let head = child(&mut inner, span, "section")?;
        match head.as_rule() {
            Rule::decl_section => build_decl_section(head, &mut seen_vars, &mut model.decls)?,
            Rule::states_kw => {
                has_states = true;
                for def in inner {
                    let def_span = span_from(&def);
                    let mut parts = def.into_inner();
                    let label = child(&mut parts, def_span, "state label")?;
                    let pred = build_pred(child(&mut parts, def_span, "state predicate")?)?;
                    if pred.has_next() {
                        return Err(ParseError::syntax(
                            "state predicates cannot refer to the next state",
                            def_span,
                            "",
                            "",
                        ));
                    }
                    let name = label.as_str().to_string();
                    if !labels.insert(name.clone()) {
                        return Err(ParseError::duplicate(name, span_from(&label)));
                    }
                    model.states.push(Spanned::new((name, pred), def_span));
                }
            }
            _ => {
                for edge in inner {
                    let edge_span = span_from(&edge);
                    let mut parts = edge.into_inner();
                    let from = child(&mut parts, edge_span, "source state")?;
                    let to = child(&mut parts, edge_span, "target state")?;
                    model.edges.push(Spanned::new(
                        (from.as_str().to_string(), to.as_str().to_string()),
                        edge_span,
                    ));
                }
            }
        }
    }
    if !has_states {
        return Err(ParseError::MissingSection {
            section: "STATES".into(),
        });
    }
    for edge in &model.edges {
        let (from, to) = &edge.node;
        for label in [from, to] {
            if !labels.contains(label) {
                return Err(ParseError::unknown_state(label.clone(), edge.span));
            }
        }
    }
    Ok(model)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pred(src: &str) -> Expr {
        parse_predicate(src, "<test>").unwrap()
    }

    #[test]
    fn precedence_of_boolean_operators() {
        assert_eq!(
            pred("a | b & c"),
            Expr::var("a").or(Expr::var("b").and(Expr::var("c")))
        );
        assert_eq!(
            pred("a -> b -> c"),
            Expr::var("a").implies(Expr::var("b").implies(Expr::var("c")))
        );
    }

    #[test]
    fn comparisons_bind_tighter_than_connectives() {
        assert_eq!(
            pred("x + 1 = y & !z"),
            Expr::var("x")
                .add(Expr::int(1))
                .eq(Expr::var("y"))
                .and(Expr::var("z").not())
        );
    }

    #[test]
    fn next_and_prime_are_equivalent() {
        assert_eq!(pred("next(x) = x + 1"), pred("x' = x + 1"));
        assert_eq!(pred("next(x + y) = 0"), pred("x' + y' = 0"));
    }

    #[test]
    fn nested_next_is_rejected() {
        let err = parse_predicate("next(next(x)) = 0", "<test>").unwrap_err();
        assert!(matches!(err, ParseError::NestedNext { .. }));
    }

    #[test]
    fn hierarchical_names_are_canonicalized() {
        assert_eq!(pred("top.sub.x = 1"), Expr::var("top$sub$x").eq(Expr::int(1)));
    }

    #[test]
    fn negative_literals_and_ite() {
        assert_eq!(
            pred("ite(c, -1, 2) < 0"),
            Expr::ite(Expr::var("c"), Expr::int(-1), Expr::int(2)).lt(Expr::int(0))
        );
    }

    #[test]
    fn syntax_errors_carry_source() {
        let err = parse_predicate("x = = 1", "props.txt").unwrap_err();
        match err {
            ParseError::Syntax { src, .. } => assert_eq!(src.name(), "props.txt"),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn temporal_operators() {
        let f = parse_temporal("G (req -> F ack)", "<test>").unwrap();
        assert_eq!(
            f,
            LtlFormula::Globally(Box::new(LtlFormula::Implies(
                Box::new(LtlFormula::Atom(Expr::var("req"))),
                Box::new(LtlFormula::Finally(Box::new(LtlFormula::Atom(Expr::var(
                    "ack"
                ))))),
            )))
        );
    }

    #[test]
    fn until_is_right_associative() {
        let f = parse_temporal("a U b U c", "<test>").unwrap();
        let atom = |n: &str| Box::new(LtlFormula::Atom(Expr::var(n)));
        assert_eq!(
            f,
            LtlFormula::Until(atom("a"), Box::new(LtlFormula::Until(atom("b"), atom("c"))))
        );
    }

    #[test]
    fn parenthesized_arithmetic_inside_temporal_formula() {
        let f = parse_temporal("F ((x + 1) > 2)", "<test>").unwrap();
        assert_eq!(
            f,
            LtlFormula::eventually(Expr::var("x").add(Expr::int(1)).gt(Expr::int(2)))
        );
    }

    #[test]
    fn sts_sections() {
        let src = "\
# counter
VAR
  c: BV(3);
INPUT
  en: Bool;
INIT
  c = 0;
TRANS
  next(c) = ite(en, c + 1, c);
INVAR
  c <= 7;
";
        let m = parse_sts(src, "c.sts").unwrap();
        assert_eq!(m.decls.len(), 2);
        assert_eq!(m.decls[0].node.sort, Sort::BitVec(3));
        assert_eq!(m.decls[1].node.kind, VarKind::Input);
        assert_eq!(m.init.len(), 1);
        assert_eq!(m.trans.len(), 1);
        assert_eq!(m.invar.len(), 1);
    }

    #[test]
    fn sts_rejects_next_in_init() {
        let err = parse_sts("VAR x: Int;\nINIT next(x) = 0;", "m.sts").unwrap_err();
        assert!(matches!(err, ParseError::Syntax { .. }));
    }

    #[test]
    fn sts_rejects_duplicate_and_oversized_declarations() {
        let dup = parse_sts("VAR x: Int; INPUT x: Bool;", "m.sts").unwrap_err();
        assert!(matches!(dup, ParseError::Duplicate { ref name, .. } if name == "x"));
        let wide = parse_sts("VAR x: BV(64);", "m.sts").unwrap_err();
        assert!(matches!(wide, ParseError::BadWidth { width: 64, .. }));
    }

    #[test]
    fn ets_states_and_edges() {
        let src = "\
VAR
  s: BV(2);
STATES
  I: s = 0;
  S1: s = 1;
TRANS
  I -> S1;
  S1 -> I;
";
        let m = parse_ets(src, "m.ets").unwrap();
        assert_eq!(m.states.len(), 2);
        assert_eq!(m.edges[0].node, ("I".to_string(), "S1".to_string()));
    }

    #[test]
    fn ets_rejects_unknown_labels() {
        let err = parse_ets("STATES I: True; TRANS I -> S9;", "m.ets").unwrap_err();
        assert!(matches!(err, ParseError::UnknownState { ref name, .. } if name == "S9"));
    }
}
