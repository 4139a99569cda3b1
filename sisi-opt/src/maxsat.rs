//! Partial MaxSAT.
//!
//! Hard clauses must hold; soft literals should hold in as many copies as
//! possible. Solvers answer under assumptions, and soft literals persist
//! across calls.
//!
//! [`LinearMaxSat`] descends linearly over a totalizer on the soft
//! literals, starting from the best count previously achieved under the
//! same assumptions. [`Msu4MaxSat`](crate::Msu4MaxSat) is a core-guided
//! alternative behind the same trait.

use rustc_hash::FxHashMap;
use sisi_core::{Clause, Context, LBool, Lit, MaxSatAlgorithm, Result, Subsystem};
use sisi_sat::{CardinalityConstraint, SatSolver};
use std::rc::Rc;
use tracing::{debug, trace};

use crate::msu4::Msu4MaxSat;

/// Statistics for a MaxSAT solver.
#[derive(Debug, Clone, Default)]
pub struct MaxSatStats {
    /// Calls to `solve`
    pub calls: u64,
    /// Underlying SAT calls
    pub sat_calls: u64,
    /// Unsatisfiable cores processed
    pub cores: u64,
    /// Calls answered unsatisfiable
    pub unsat: u64,
}

/// A partial MaxSAT solver.
pub trait MaxSat {
    /// Add a hard clause.
    fn add_clause(&mut self, clause: &[Lit]);

    /// Register a soft literal.
    fn add_for_optimization(&mut self, lit: Lit);

    /// Find an assignment satisfying the hard clauses and `assumps` that
    /// maximizes the number of true soft literals. Returns `false` if the
    /// hard clauses and assumptions are unsatisfiable.
    fn solve(&mut self, assumps: &[Lit]) -> Result<bool>;

    /// Value of `lit` in the last optimal model, `Undef` if unknown.
    fn assignment(&self, lit: Lit) -> LBool;

    /// Registered soft literals.
    fn soft(&self) -> &[Lit];

    /// Solver statistics.
    fn stats(&self) -> &MaxSatStats;

    /// Add several hard clauses.
    fn add_clauses(&mut self, clauses: &[Clause]) {
        for clause in clauses {
            self.add_clause(clause);
        }
    }

    /// Number of soft literals true in the last model.
    fn satisfied_soft(&self) -> usize {
        self.soft()
            .iter()
            .filter(|&&l| self.assignment(l).is_true())
            .count()
    }
}

/// Build the MaxSAT solver selected by the `maxsat_solver` option.
pub fn new_maxsat(ctx: &Rc<Context>) -> Box<dyn MaxSat> {
    match ctx.options.maxsat_solver {
        MaxSatAlgorithm::Linear => Box::new(LinearMaxSat::new(Rc::clone(ctx))),
        MaxSatAlgorithm::Msu4 => Box::new(Msu4MaxSat::new(Rc::clone(ctx))),
    }
}

/// Linear-search MaxSAT over a cardinality network.
#[derive(Debug)]
pub struct LinearMaxSat {
    ctx: Rc<Context>,
    solver: SatSolver,
    soft: Vec<Lit>,
    card: CardinalityConstraint,
    memo: FxHashMap<Vec<Lit>, usize>,
    stats: MaxSatStats,
}

impl LinearMaxSat {
    /// Create an empty solver.
    pub fn new(ctx: Rc<Context>) -> Self {
        Self {
            solver: SatSolver::new(Rc::clone(&ctx)),
            card: CardinalityConstraint::new(Rc::clone(&ctx)),
            ctx,
            soft: Vec::new(),
            memo: FxHashMap::default(),
            stats: MaxSatStats::default(),
        }
    }
}

impl MaxSat for LinearMaxSat {
    fn add_clause(&mut self, clause: &[Lit]) {
        self.solver.add_clause(clause);
    }

    fn add_for_optimization(&mut self, lit: Lit) {
        self.soft.push(lit);
        self.card.add_input(lit);
        // More soft literals may raise the optimum.
        self.memo.clear();
    }

    fn solve(&mut self, assumps: &[Lit]) -> Result<bool> {
        let ctx = Rc::clone(&self.ctx);
        let _timer = ctx.stats.timer(Subsystem::MaxSat);
        self.stats.calls += 1;

        let mut key = assumps.to_vec();
        key.sort_unstable();
        let mut cardinality = self.memo.get(&key).copied().unwrap_or(self.soft.len());

        self.card.set_cardinality(cardinality + 1);
        let network = self.card.cnfize();
        self.solver.add_clauses(&network);

        loop {
            let bound = self.card.assume_geq(cardinality);
            let mut all = Vec::with_capacity(assumps.len() + bound.len());
            all.extend_from_slice(assumps);
            all.extend_from_slice(&bound);
            self.stats.sat_calls += 1;
            if self.solver.solve(&all)? {
                trace!(cardinality, soft = self.soft.len(), "maxsat optimum");
                self.memo.insert(key, cardinality);
                return Ok(true);
            }
            // A core without the bound literal means the hard part is unsatisfiable.
            let bound_in_core = bound.iter().any(|l| self.solver.core().contains(l));
            if cardinality == 0 || !bound_in_core {
                debug!(assumptions = assumps.len(), "maxsat unsatisfiable");
                self.stats.unsat += 1;
                return Ok(false);
            }
            cardinality -= 1;
        }
    }

    fn assignment(&self, lit: Lit) -> LBool {
        self.solver.safe_assignment(lit)
    }

    fn soft(&self) -> &[Lit] {
        &self.soft
    }

    fn stats(&self) -> &MaxSatStats {
        &self.stats
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sisi_core::Options;

    fn contexts() -> Vec<Rc<Context>> {
        let mut msu4 = Options::default();
        msu4.maxsat_solver = MaxSatAlgorithm::Msu4;
        let mut msu4_resets = msu4.clone();
        msu4_resets.msu4_reset_solver_period = 2;
        msu4_resets.msu4_reset_context_period = 1;
        vec![
            Context::with_defaults(),
            Context::new(msu4),
            Context::new(msu4_resets),
        ]
    }

    #[test]
    fn test_no_soft_literals() {
        for ctx in contexts() {
            let a = ctx.vars.new_lit();
            let mut ms = new_maxsat(&ctx);
            ms.add_clause(&[a]);
            assert!(ms.solve(&[]).unwrap());
            assert_eq!(ms.assignment(a), LBool::True);
            assert!(!ms.solve(&[!a]).unwrap());
        }
    }

    #[test]
    fn test_maximizes_satisfied_soft() {
        for ctx in contexts() {
            let xs: Vec<Lit> = (0..4).map(|_| ctx.vars.new_lit()).collect();
            let mut ms = new_maxsat(&ctx);
            // At most one of x0, x1, x2 may hold.
            for i in 0..3 {
                for j in i + 1..3 {
                    ms.add_clause(&[!xs[i], !xs[j]]);
                }
            }
            for &x in &xs {
                ms.add_for_optimization(x);
            }
            assert!(ms.solve(&[]).unwrap());
            assert_eq!(ms.satisfied_soft(), 2);
            assert_eq!(ms.assignment(xs[3]), LBool::True);

            // Assumptions narrow the optimum without persisting.
            assert!(ms.solve(&[!xs[3]]).unwrap());
            assert_eq!(ms.satisfied_soft(), 1);
            assert!(ms.solve(&[]).unwrap());
            assert_eq!(ms.satisfied_soft(), 2);

            // Hard clauses added later lower the optimum.
            ms.add_clause(&[!xs[0]]);
            ms.add_clause(&[!xs[1]]);
            ms.add_clause(&[!xs[2]]);
            assert!(ms.solve(&[]).unwrap());
            assert_eq!(ms.satisfied_soft(), 1);
        }
    }

    #[test]
    fn test_soft_added_between_calls() {
        for ctx in contexts() {
            let a = ctx.vars.new_lit();
            let b = ctx.vars.new_lit();
            let mut ms = new_maxsat(&ctx);
            ms.add_clause(&[!a, !b]);
            ms.add_for_optimization(a);
            assert!(ms.solve(&[]).unwrap());
            assert_eq!(ms.satisfied_soft(), 1);
            ms.add_for_optimization(!b);
            assert!(ms.solve(&[]).unwrap());
            assert_eq!(ms.satisfied_soft(), 2);
            assert_eq!(ms.assignment(a), LBool::True);
        }
    }

    #[test]
    fn test_duplicate_soft_literals_count_twice() {
        for ctx in contexts() {
            let a = ctx.vars.new_lit();
            let b = ctx.vars.new_lit();
            let mut ms = new_maxsat(&ctx);
            ms.add_clause(&[!a, !b]);
            ms.add_for_optimization(a);
            ms.add_for_optimization(b);
            ms.add_for_optimization(b);
            assert!(ms.solve(&[]).unwrap());
            assert_eq!(ms.assignment(b), LBool::True);
            assert_eq!(ms.satisfied_soft(), 2);
        }
    }

    #[test]
    fn test_repeated_calls_stay_optimal() {
        for ctx in contexts() {
            let xs: Vec<Lit> = (0..5).map(|_| ctx.vars.new_lit()).collect();
            let mut ms = new_maxsat(&ctx);
            ms.add_clause(&[!xs[0], !xs[1]]);
            ms.add_clause(&[!xs[2], !xs[3], !xs[4]]);
            for &x in &xs {
                ms.add_for_optimization(x);
            }
            for _ in 0..4 {
                assert!(ms.solve(&[]).unwrap());
                assert_eq!(ms.satisfied_soft(), 3);
                assert!(ms.solve(&[xs[0], xs[2]]).unwrap());
                assert_eq!(ms.satisfied_soft(), 3);
            }
        }
    }

    #[test]
    fn test_assumed_soft_literals_keep_their_weight() {
        for ctx in contexts() {
            let xs: Vec<Lit> = (0..4).map(|_| ctx.vars.new_lit()).collect();
            let mut ms = new_maxsat(&ctx);
            // A path x0 - x1 - x2 - x3: no two neighbours together.
            for i in 0..3 {
                ms.add_clause(&[!xs[i], !xs[i + 1]]);
            }
            for &x in &xs {
                ms.add_for_optimization(x);
            }
            for _ in 0..3 {
                assert!(ms.solve(&[xs[1]]).unwrap());
                assert_eq!(ms.satisfied_soft(), 2);
                assert_eq!(ms.assignment(xs[3]), LBool::True);
                assert!(!ms.solve(&[xs[1], xs[2]]).unwrap());
                assert!(ms.solve(&[xs[1], xs[3]]).unwrap());
                assert_eq!(ms.satisfied_soft(), 2);
                assert!(ms.solve(&[]).unwrap());
                assert_eq!(ms.satisfied_soft(), 2);
            }
        }
    }
}
