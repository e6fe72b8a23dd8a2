//! End-to-end checks of the bounded and inductive engines against Z3.

use tern_ir::{Expr, Hts, LtlFormula, Sort, TransitionSystem, VarDecl};
use tern_smt::backends::Z3Solver;
use tern_smt::{
    check_determinism, check_ltl, check_safety, simulate, BmcOptions, Branching, CheckResult,
    Determinism, Strategy, Unroller, Value,
};

type TestResult = Result<(), Box<dyn std::error::Error>>;

/// `x` counts 0, 1, ..., `wrap`, then returns to 0 (or stays at `wrap`).
fn counter(width: u32, wrap: i64, sticky: bool) -> Hts {
    let mut ts = TransitionSystem::new("counter");
    ts.declare(VarDecl::state("x", Sort::BitVec(width))).unwrap();
    ts.add_init(Expr::var("x").eq(Expr::int(0)));
    let at_top = if sticky { Expr::int(wrap) } else { Expr::int(0) };
    ts.add_trans(Expr::next("x").eq(Expr::ite(
        Expr::var("x").eq(Expr::int(wrap)),
        at_top,
        Expr::var("x").add(Expr::int(1)),
    )));
    let mut hts = Hts::new("counter");
    hts.add_ts(ts).unwrap();
    hts
}

fn options(bound: usize, strategy: Strategy, incremental: bool) -> BmcOptions {
    BmcOptions {
        bound,
        strategy,
        incremental,
        ..BmcOptions::default()
    }
}

fn xs(result: &CheckResult) -> Vec<i64> {
    let witness = match result {
        CheckResult::Violated { witness, .. } => witness,
        CheckResult::Holds {
            witness: Some(witness),
            ..
        } => witness,
        other => panic!("expected a witness, got {other:?}"),
    };
    (0..witness.len())
        .map(|i| match witness.value(i, "x") {
            Some(Value::Int(n)) => n,
            other => panic!("step {i}: unexpected value {other:?}"),
        })
        .collect()
}

#[test]
fn every_strategy_finds_the_shallowest_violation() -> TestResult {
    let hts = counter(3, 7, false);
    let unroller = Unroller::new(&hts)?;
    let property = Expr::var("x").lt(Expr::int(5));
    for strategy in [Strategy::Fwd, Strategy::Bwd, Strategy::Zz, Strategy::Auto] {
        for incremental in [true, false] {
            let mut solver = Z3Solver::new();
            let result = check_safety(
                &mut solver,
                &unroller,
                &property,
                &options(8, strategy, incremental),
            )?;
            assert!(
                matches!(result, CheckResult::Violated { depth: 5, .. }),
                "{strategy} incremental={incremental}: {result:?}"
            );
            assert_eq!(xs(&result), vec![0, 1, 2, 3, 4, 5], "{strategy}");
        }
    }
    Ok(())
}

#[test]
fn bounded_search_is_inconclusive_when_clean() -> TestResult {
    let hts = counter(3, 7, false);
    let unroller = Unroller::new(&hts)?;
    let mut solver = Z3Solver::new();
    let result = check_safety(
        &mut solver,
        &unroller,
        &Expr::var("x").le(Expr::int(7)),
        &options(4, Strategy::Fwd, true),
    )?;
    assert!(matches!(
        result,
        CheckResult::Unknown {
            depth_reached: 4,
            ..
        }
    ));
    Ok(())
}

#[test]
fn violation_below_bound_min_is_not_reported() -> TestResult {
    let hts = counter(3, 7, false);
    let unroller = Unroller::new(&hts)?;
    let mut solver = Z3Solver::new();
    // x = 2 only at depth 2 within the first eight steps.
    let result = check_safety(
        &mut solver,
        &unroller,
        &Expr::var("x").ne(Expr::int(2)),
        &BmcOptions {
            bound: 6,
            bound_min: 3,
            ..BmcOptions::default()
        },
    )?;
    assert!(matches!(result, CheckResult::Unknown { .. }), "{result:?}");
    Ok(())
}

#[test]
fn k_induction_proves_range_invariants() -> TestResult {
    let hts = counter(3, 7, false);
    let unroller = Unroller::new(&hts)?;
    let mut solver = Z3Solver::new();
    let result = check_safety(
        &mut solver,
        &unroller,
        &Expr::var("x").le(Expr::int(7)),
        &BmcOptions {
            bound: 2,
            prove: true,
            ..BmcOptions::default()
        },
    )?;
    assert!(matches!(result, CheckResult::Holds { depth: 0, witness: None }));
    Ok(())
}

/// Int counter 0 -> 1 -> 2 -> 0; `x != 4` needs depth 1, or a lemma.
fn int_cycle(lemmas: Vec<Expr>) -> Hts {
    let mut ts = TransitionSystem::new("cycle");
    ts.declare(VarDecl::state("x", Sort::Int)).unwrap();
    ts.add_init(Expr::var("x").eq(Expr::int(0)));
    ts.add_trans(Expr::next("x").eq(Expr::ite(
        Expr::var("x").eq(Expr::int(2)),
        Expr::int(0),
        Expr::var("x").add(Expr::int(1)),
    )));
    let mut hts = Hts::new("cycle");
    hts.add_ts(ts).unwrap();
    for lemma in lemmas {
        hts.add_lemma(lemma);
    }
    hts
}

#[test]
fn k_induction_needs_depth_without_lemmas() -> TestResult {
    let property = Expr::var("x").ne(Expr::int(4));
    let prove = |bound| BmcOptions {
        bound,
        prove: true,
        ..BmcOptions::default()
    };
    let unroller = Unroller::new(&int_cycle(Vec::new()))?;
    let mut solver = Z3Solver::new();
    assert!(matches!(
        check_safety(&mut solver, &unroller, &property, &prove(0))?,
        CheckResult::Unknown { .. }
    ));
    assert!(matches!(
        check_safety(&mut solver, &unroller, &property, &prove(3))?,
        CheckResult::Holds { depth: 1, .. }
    ));
    Ok(())
}

#[test]
fn inductive_lemmas_strengthen_the_step() -> TestResult {
    let property = Expr::var("x").ne(Expr::int(4));
    let options = BmcOptions {
        bound: 0,
        prove: true,
        ..BmcOptions::default()
    };
    let lemma = Expr::var("x").ge(Expr::int(0)).and(Expr::var("x").le(Expr::int(2)));
    let unroller = Unroller::new(&int_cycle(vec![lemma]))?;
    let mut solver = Z3Solver::new();
    assert!(matches!(
        check_safety(&mut solver, &unroller, &property, &options)?,
        CheckResult::Holds { depth: 0, .. }
    ));

    // `x = 0` holds initially but is not inductive, so it is dropped.
    let unroller = Unroller::new(&int_cycle(vec![Expr::var("x").eq(Expr::int(0))]))?;
    assert!(matches!(
        check_safety(&mut solver, &unroller, &property, &options)?,
        CheckResult::Unknown { .. }
    ));
    Ok(())
}

#[test]
fn lemmas_are_ignored_by_plain_bmc() -> TestResult {
    // A false lemma must not hide a real counterexample.
    let unroller = Unroller::new(&int_cycle(vec![Expr::var("x").eq(Expr::int(0))]))?;
    let mut solver = Z3Solver::new();
    let result = check_safety(
        &mut solver,
        &unroller,
        &Expr::var("x").ne(Expr::int(2)),
        &options(4, Strategy::Fwd, true),
    )?;
    assert!(matches!(result, CheckResult::Violated { depth: 2, .. }));
    Ok(())
}

#[test]
fn simulation_reaches_a_target() -> TestResult {
    let unroller = Unroller::new(&counter(3, 7, false))?;
    let mut solver = Z3Solver::new();
    let result = simulate(
        &mut solver,
        &unroller,
        &Expr::var("x").eq(Expr::int(3)),
        &options(6, Strategy::Fwd, true),
    )?;
    assert!(matches!(result, CheckResult::Holds { depth: 3, .. }));
    assert_eq!(xs(&result), vec![0, 1, 2, 3]);
    Ok(())
}

#[test]
fn simulation_without_target_runs_to_the_bound() -> TestResult {
    let unroller = Unroller::new(&counter(3, 7, false))?;
    let mut solver = Z3Solver::new();
    let result = simulate(
        &mut solver,
        &unroller,
        &Expr::tt(),
        &options(4, Strategy::Fwd, false),
    )?;
    assert_eq!(xs(&result), vec![0, 1, 2, 3, 4]);
    Ok(())
}

/// Free-running `x: BV(3)` next to an unbounded step count `y`.
fn free_running() -> Hts {
    let mut ts = TransitionSystem::new("free");
    ts.declare(VarDecl::state("x", Sort::BitVec(3))).unwrap();
    ts.declare(VarDecl::state("y", Sort::Int)).unwrap();
    ts.add_init(Expr::var("x").eq(Expr::int(0)).and(Expr::var("y").eq(Expr::int(0))));
    ts.add_trans(Expr::next("x").eq(Expr::var("x").add(Expr::int(1))));
    ts.add_trans(Expr::next("y").eq(Expr::var("y").add(Expr::int(1))));
    let mut hts = Hts::new("free");
    hts.add_ts(ts).unwrap();
    hts
}

#[test]
fn bitvector_counters_wrap_around() -> TestResult {
    let unroller = Unroller::new(&free_running())?;
    let mut solver = Z3Solver::new();
    let result = check_safety(
        &mut solver,
        &unroller,
        &Expr::var("y").lt(Expr::int(9)),
        &options(10, Strategy::Fwd, true),
    )?;
    assert!(matches!(result, CheckResult::Violated { depth: 9, .. }), "{result:?}");
    assert_eq!(xs(&result), vec![0, 1, 2, 3, 4, 5, 6, 7, 0, 1]);

    let run = simulate(&mut solver, &unroller, &Expr::tt(), &options(10, Strategy::Fwd, false))?;
    assert!(matches!(run, CheckResult::Holds { depth: 10, .. }), "{run:?}");
    assert_eq!(xs(&run)[8..], [0, 1, 2]);
    Ok(())
}

#[test]
fn unreachable_eventuality_yields_a_lasso() -> TestResult {
    let unroller = Unroller::new(&counter(2, 3, false))?;
    let mut solver = Z3Solver::new();
    let formula = LtlFormula::eventually(Expr::var("x").eq(Expr::int(5)));
    let result = check_ltl(&mut solver, &unroller, &formula, &options(6, Strategy::Fwd, true))?;
    match &result {
        CheckResult::Violated { depth, witness } => {
            assert_eq!(*depth, 3);
            assert_eq!(witness.loop_back, Some(0));
        }
        other => panic!("expected a lasso, got {other:?}"),
    }
    assert_eq!(xs(&result), vec![0, 1, 2, 3]);
    Ok(())
}

#[test]
fn liveness_failure_on_a_stuck_counter() -> TestResult {
    let unroller = Unroller::new(&counter(2, 3, true))?;
    let mut solver = Z3Solver::new();
    let formula = LtlFormula::liveness(Expr::var("x").eq(Expr::int(0)));
    let result = check_ltl(&mut solver, &unroller, &formula, &options(5, Strategy::Fwd, false))?;
    match result {
        CheckResult::Violated { depth, witness } => {
            assert_eq!(depth, 3);
            assert_eq!(witness.loop_back, Some(3));
        }
        other => panic!("expected a lasso, got {other:?}"),
    }
    Ok(())
}

#[test]
fn liveness_of_a_cycling_counter_is_not_refuted() -> TestResult {
    let unroller = Unroller::new(&counter(2, 3, false))?;
    let mut solver = Z3Solver::new();
    let formula = LtlFormula::liveness(Expr::var("x").eq(Expr::int(0)));
    let result = check_ltl(&mut solver, &unroller, &formula, &options(5, Strategy::Fwd, true))?;
    assert!(matches!(
        result,
        CheckResult::Unknown {
            depth_reached: 5,
            ..
        }
    ));
    Ok(())
}

/// `x: BV(2)` with an optional init and a caller-supplied transition.
fn machine(init: bool, trans: Expr) -> Hts {
    let mut ts = TransitionSystem::new("fsm");
    ts.declare(VarDecl::state("x", Sort::BitVec(2))).unwrap();
    ts.declare(VarDecl::input("en", Sort::Bool)).unwrap();
    if init {
        ts.add_init(Expr::var("x").eq(Expr::int(0)));
    }
    ts.add_trans(trans);
    let mut hts = Hts::new("fsm");
    hts.add_ts(ts).unwrap();
    hts
}

#[test]
fn input_driven_counter_is_deterministic() -> TestResult {
    let step = Expr::next("x").eq(Expr::ite(
        Expr::var("en"),
        Expr::var("x").add(Expr::int(1)),
        Expr::var("x"),
    ));
    let unroller = Unroller::new(&machine(true, step))?;
    let outcome = check_determinism(&mut Z3Solver::new(), &unroller)?;
    assert_eq!(outcome, Determinism::Deterministic);
    Ok(())
}

#[test]
fn free_initial_state_branches_at_init() -> TestResult {
    let unroller = Unroller::new(&machine(false, Expr::next("x").eq(Expr::var("x"))))?;
    let outcome = check_determinism(&mut Z3Solver::new(), &unroller)?;
    let Determinism::Nondeterministic { at, first, second } = outcome else {
        panic!("expected branching, got {outcome:?}");
    };
    assert_eq!(at, Branching::Init);
    assert_eq!((first.len(), second.len()), (1, 1));
    assert_ne!(first.value(0, "x"), second.value(0, "x"));
    Ok(())
}

#[test]
fn relational_transition_branches_from_a_shared_state() -> TestResult {
    let unroller = Unroller::new(&machine(true, Expr::next("x").ge(Expr::var("x"))))?;
    let outcome = check_determinism(&mut Z3Solver::new(), &unroller)?;
    let Determinism::Nondeterministic { at, first, second } = outcome else {
        panic!("expected branching, got {outcome:?}");
    };
    assert_eq!(at, Branching::Trans);
    assert_eq!(first.value(0, "x"), second.value(0, "x"));
    assert_eq!(first.value(0, "en"), second.value(0, "en"));
    assert_ne!(first.value(1, "x"), second.value(1, "x"));
    Ok(())
}
