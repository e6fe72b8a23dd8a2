//! Bounded lasso semantics for LTL formulas in negation normal form.
//!
//! A path of `k + 1` states either has no loop, in which case only finite
//! obligations can be discharged (`G` is false), or its last state loops
//! back to some step `l`, in which case the path stands for an infinite
//! run and every operator is evaluated over the lasso.

use tern_ir::Nnf;

use super::variables::{fwd_step, loop_var, NO_LOOP_VAR};
use super::Unroller;
use crate::sorts::SmtSort;
use crate::terms::SmtTerm;

pub struct LassoEncoding {
    /// Selector variables to declare before asserting `constraint`.
    pub selectors: Vec<(String, SmtSort)>,
    pub constraint: SmtTerm,
}

pub struct LassoEncoder<'a> {
    unroller: &'a Unroller,
    k: usize,
}

impl<'a> LassoEncoder<'a> {
    pub fn new(unroller: &'a Unroller, k: usize) -> Self {
        Self { unroller, k }
    }

    /// Constraint satisfiable iff some path of length `k` satisfies `f`.
    ///
    /// The path constraints themselves (init, invar, trans) are not included.
    pub fn encode(&self, f: &Nnf) -> LassoEncoding {
        let mut selectors = vec![(NO_LOOP_VAR.to_string(), SmtSort::Bool)];
        let mut parts = vec![SmtTerm::var(NO_LOOP_VAR).implies(self.no_loop(f, 0))];
        let mut choice = vec![SmtTerm::var(NO_LOOP_VAR)];
        let last = fwd_step(self.k);
        for l in 0..=self.k {
            let sel = loop_var(l);
            selectors.push((sel.clone(), SmtSort::Bool));
            parts.push(SmtTerm::var(&sel).implies(SmtTerm::and(vec![
                self.unroller.trans(&last, &fwd_step(l)),
                self.with_loop(f, 0, l),
            ])));
            choice.push(SmtTerm::var(sel));
        }
        parts.push(SmtTerm::or(choice));
        LassoEncoding {
            selectors,
            constraint: SmtTerm::and(parts),
        }
    }

    /// Index of the loop selected by a model of [`LassoEncoder::encode`].
    pub fn selected_loop(&self, model: &crate::solver::Model) -> Option<usize> {
        (0..=self.k).find(|&l| model.get_bool(&loop_var(l)) == Some(true))
    }

    fn atom(&self, e: &tern_ir::Expr, i: usize) -> SmtTerm {
        self.unroller.state(e, &fwd_step(i))
    }

    fn no_loop(&self, f: &Nnf, i: usize) -> SmtTerm {
        let k = self.k;
        match f {
            Nnf::Atom(e) => self.atom(e, i),
            Nnf::And(a, b) => SmtTerm::and(vec![self.no_loop(a, i), self.no_loop(b, i)]),
            Nnf::Or(a, b) => SmtTerm::or(vec![self.no_loop(a, i), self.no_loop(b, i)]),
            Nnf::Next(a) if i < k => self.no_loop(a, i + 1),
            Nnf::Next(_) | Nnf::Globally(_) => SmtTerm::bool(false),
            Nnf::Finally(a) => SmtTerm::or((i..=k).map(|j| self.no_loop(a, j)).collect()),
            Nnf::Until(a, b) => SmtTerm::or(
                (i..=k)
                    .map(|j| {
                        let mut conj = vec![self.no_loop(b, j)];
                        conj.extend((i..j).map(|n| self.no_loop(a, n)));
                        SmtTerm::and(conj)
                    })
                    .collect(),
            ),
            Nnf::Release(a, b) => SmtTerm::or(
                (i..=k)
                    .map(|j| {
                        let mut conj = vec![self.no_loop(a, j)];
                        conj.extend((i..=j).map(|n| self.no_loop(b, n)));
                        SmtTerm::and(conj)
                    })
                    .collect(),
            ),
        }
    }

    fn with_loop(&self, f: &Nnf, i: usize, l: usize) -> SmtTerm {
        let k = self.k;
        let go = |g: &Nnf, n: usize| self.with_loop(g, n, l);
        match f {
            Nnf::Atom(e) => self.atom(e, i),
            Nnf::And(a, b) => SmtTerm::and(vec![go(a, i), go(b, i)]),
            Nnf::Or(a, b) => SmtTerm::or(vec![go(a, i), go(b, i)]),
            Nnf::Next(a) => go(a, if i < k { i + 1 } else { l }),
            Nnf::Globally(a) => SmtTerm::and((i.min(l)..=k).map(|j| go(a, j)).collect()),
            Nnf::Finally(a) => SmtTerm::or((i.min(l)..=k).map(|j| go(a, j)).collect()),
            Nnf::Until(a, b) => {
                let ahead = (i..=k).map(|j| {
                    let mut conj = vec![go(b, j)];
                    conj.extend((i..j).map(|n| go(a, n)));
                    SmtTerm::and(conj)
                });
                let wrapped = (l..i).map(|j| {
                    let mut conj = vec![go(b, j)];
                    conj.extend((i..=k).map(|n| go(a, n)));
                    conj.extend((l..j).map(|n| go(a, n)));
                    SmtTerm::and(conj)
                });
                SmtTerm::or(ahead.chain(wrapped).collect())
            }
            Nnf::Release(a, b) => {
                let forever = SmtTerm::and((i.min(l)..=k).map(|j| go(b, j)).collect());
                let ahead = (i..=k).map(|j| {
                    let mut conj = vec![go(a, j)];
                    conj.extend((i..=j).map(|n| go(b, n)));
                    SmtTerm::and(conj)
                });
                let wrapped = (l..i).map(|j| {
                    let mut conj = vec![go(a, j)];
                    conj.extend((i..=k).map(|n| go(b, n)));
                    conj.extend((l..=j).map(|n| go(b, n)));
                    SmtTerm::and(conj)
                });
                SmtTerm::or(std::iter::once(forever).chain(ahead).chain(wrapped).collect())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tern_ir::{Expr, Hts, Sort, TransitionSystem, VarDecl};

    fn unroller() -> Unroller {
        let mut ts = TransitionSystem::new("m");
        ts.declare(VarDecl::state("p", Sort::Bool)).unwrap();
        let mut hts = Hts::new("m");
        hts.add_ts(ts).unwrap();
        Unroller::new(&hts).unwrap()
    }

    fn p() -> Nnf {
        Nnf::Atom(Expr::var("p"))
    }

    #[test]
    fn globally_is_false_without_a_loop() {
        let u = unroller();
        let enc = LassoEncoder::new(&u, 2);
        assert_eq!(
            enc.no_loop(&Nnf::Globally(Box::new(p())), 0),
            SmtTerm::bool(false)
        );
    }

    #[test]
    fn next_at_the_last_step_follows_the_loop() {
        let u = unroller();
        let enc = LassoEncoder::new(&u, 2);
        let next_p = Nnf::Next(Box::new(p()));
        assert_eq!(enc.with_loop(&next_p, 2, 1), SmtTerm::var("p@1"));
        assert_eq!(enc.no_loop(&next_p, 2), SmtTerm::bool(false));
        assert_eq!(enc.no_loop(&next_p, 1), SmtTerm::var("p@2"));
    }

    #[test]
    fn finally_on_a_loop_covers_the_whole_cycle() {
        let u = unroller();
        let enc = LassoEncoder::new(&u, 2);
        let f = Nnf::Finally(Box::new(p()));
        assert_eq!(
            enc.with_loop(&f, 2, 0),
            SmtTerm::Or(vec![
                SmtTerm::var("p@0"),
                SmtTerm::var("p@1"),
                SmtTerm::var("p@2")
            ])
        );
    }

    #[test]
    fn one_selector_per_loop_position() {
        let u = unroller();
        let enc = LassoEncoder::new(&u, 3).encode(&p());
        let names: Vec<&str> = enc.selectors.iter().map(|(n, _)| n.as_str()).collect();
        assert_eq!(
            names,
            vec!["__noloop", "__loop@0", "__loop@1", "__loop@2", "__loop@3"]
        );
    }
}
