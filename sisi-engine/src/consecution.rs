//! Relative induction queries.
//!
//! Decides whether a clause `c` is inductive relative to a frame
//! `F = {c_0, ..., c_n}`, that is whether `F & c & T & !c'` is
//! unsatisfiable. Frame clauses live in an activation-keyed database; a
//! query assumes the activations of its frame and `!c'`, so one SAT
//! instance serves every frame. When the query is unsatisfiable the
//! activations in the failed-assumption core name a support set.
//!
//! The instance is built on the first query: two frames of the transition
//! relation plus every activated clause, optionally run through the
//! simplifying solver with the latch, input, property and activation
//! literals of both frames frozen.

use crate::clause_db::{ClauseDb, ClauseId};
use rustc_hash::FxHashSet;
use sisi_core::clause::canonical;
use sisi_core::{Clause, Context, Lit, Result, Subsystem, Var};
use sisi_sat::{SatSolver, SimpSolver};
use sisi_ts::TransitionRelation;
use std::rc::Rc;
use tracing::{debug, trace};

/// Incremental relative-induction checker.
#[derive(Debug)]
pub struct ConsecutionChecker {
    ctx: Rc<Context>,
    tr: Rc<TransitionRelation>,
    db: ClauseDb,
    solver: Option<SatSolver>,
    eliminated: FxHashSet<Var>,
}

fn frozen_literals(tr: &TransitionRelation, db: &ClauseDb) -> Vec<Lit> {
    let mut base: Vec<Lit> = tr.latch_ids();
    base.extend_from_slice(tr.inputs());
    base.extend_from_slice(tr.constraints());
    base.push(tr.bad());
    for (_, clause, _) in db.iter() {
        base.extend_from_slice(clause);
    }
    let mut frozen: Vec<Lit> = base.iter().flat_map(|&l| [l, l.prime()]).collect();
    frozen.extend(db.iter().map(|(_, _, a)| a));
    frozen
}

fn ensure_solver<'a>(
    slot: &'a mut Option<SatSolver>,
    ctx: &Rc<Context>,
    tr: &TransitionRelation,
    db: &ClauseDb,
    eliminated: &mut FxHashSet<Var>,
) -> &'a mut SatSolver {
    slot.get_or_insert_with(|| {
        let mut clauses = tr.unroll(2);
        clauses.extend(db.ids().iter().filter_map(|&id| db.record(id)).map(|r| r.activated()));
        if ctx.options.simplify {
            let mut simp = SimpSolver::new(Rc::clone(ctx));
            simp.add_clauses(&clauses);
            simp.freeze(frozen_literals(tr, db));
            clauses = simp.simplify();
            eliminated.clone_from(simp.eliminated());
        }
        debug!(clauses = clauses.len(), frame = db.len(), "consecution solver initialized");
        let mut solver = SatSolver::new(Rc::clone(ctx));
        solver.add_clauses(&clauses);
        solver
    })
}

impl ConsecutionChecker {
    /// Create a checker over `tr` with an empty database.
    pub fn new(tr: Rc<TransitionRelation>) -> Self {
        Self {
            ctx: Rc::clone(tr.context()),
            db: ClauseDb::new(Rc::clone(tr.context())),
            tr,
            solver: None,
            eliminated: FxHashSet::default(),
        }
    }

    /// Create a checker holding `clauses` under ids `0..n`.
    pub fn with_clauses(tr: Rc<TransitionRelation>, clauses: &[Clause]) -> Self {
        let mut checker = Self::new(tr);
        for (id, clause) in clauses.iter().enumerate() {
            checker.add_clause(id, clause);
        }
        checker
    }

    /// The transition relation.
    pub fn relation(&self) -> &Rc<TransitionRelation> {
        &self.tr
    }

    /// Stored clauses.
    pub fn db(&self) -> &ClauseDb {
        &self.db
    }

    /// Clause stored under `id`.
    pub fn clause(&self, id: ClauseId) -> &Clause {
        self.db.clause(id)
    }

    /// Store `clause` under `id`. After the first query the activated
    /// clause goes straight into the solver.
    ///
    /// # Panics
    ///
    /// Panics if `id` is in use, or if the clause mentions a variable the
    /// preprocessor eliminated.
    pub fn add_clause(&mut self, id: ClauseId, clause: &[Lit]) {
        self.db.add(id, clause);
        if let Some(solver) = &mut self.solver {
            for lit in clause {
                assert!(
                    !self.eliminated.contains(&lit.var())
                        && !self.eliminated.contains(&lit.prime().var()),
                    "clause {id} mentions eliminated literal {lit}"
                );
            }
            if let Some(record) = self.db.record(id) {
                solver.add_clause(&record.activated());
            }
        }
    }

    /// Check `clause` relative to `frame`. Returns the support set (frame
    /// ids in the unsatisfiable core, sorted) if the clause is relatively
    /// inductive, `None` otherwise; in that case the model of the failing
    /// query stays readable through [`ConsecutionChecker::falsifies_primed`].
    pub fn support_solve(
        &mut self,
        frame: &[ClauseId],
        clause: &[Lit],
    ) -> Result<Option<Vec<ClauseId>>> {
        let ctx = Rc::clone(&self.ctx);
        let _timer = ctx.stats.timer(Subsystem::Consecution);
        let solver = ensure_solver(
            &mut self.solver,
            &self.ctx,
            &self.tr,
            &self.db,
            &mut self.eliminated,
        );

        let clause = canonical(clause);
        let mut assumps: Vec<Lit> = frame.iter().map(|&id| self.db.activation(id)).collect();
        assumps.extend(clause.iter().map(|l| l.prime().negate()));

        let in_frame = frame.iter().any(|&id| self.db.clause(id) == &clause);
        let sat = if in_frame {
            solver.solve(&assumps)?
        } else {
            let group = solver.create_group();
            solver.add_group_clause(group, &clause);
            solver.group_solve(group, &assumps)?
        };
        if sat {
            trace!(frame = frame.len(), "consecution: counterexample to induction");
            return Ok(None);
        }
        let mut support: Vec<ClauseId> = solver
            .core()
            .iter()
            .filter_map(|&l| self.db.id_of_activation(l))
            .collect();
        support.sort_unstable();
        support.dedup();
        trace!(frame = frame.len(), support = support.len(), "consecution: inductive");
        Ok(Some(support))
    }

    /// Whether clause `id` is inductive relative to `frame`.
    pub fn solve(&mut self, frame: &[ClauseId], id: ClauseId) -> Result<bool> {
        let clause = self.db.clause(id).clone();
        Ok(self.support_solve(frame, &clause)?.is_some())
    }

    /// Whether every clause of `frame` is inductive relative to `frame`.
    pub fn is_inductive(&mut self, frame: &[ClauseId]) -> Result<bool> {
        for &id in frame {
            if !self.solve(frame, id)? {
                debug!(failing = id, frame = frame.len(), "frame is not inductive");
                return Ok(false);
            }
        }
        Ok(true)
    }

    /// Whether the model of the last failing query violates `clause` one
    /// frame later.
    pub fn falsifies_primed(&self, clause: &[Lit]) -> bool {
        let Some(solver) = &self.solver else {
            return false;
        };
        clause
            .iter()
            .all(|l| solver.safe_assignment(l.prime()).is_false())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sisi_core::Aig;

    const ROTATOR: &str = "aag 7 0 4 1 3\n2 8\n4 2\n6 4\n8 6\n14\n10 8 7\n12 5 2\n14 12 10\n";

    fn rotator(simplify: bool) -> Rc<TransitionRelation> {
        let mut options = sisi_core::Options::default();
        options.simplify = simplify;
        let ctx = Context::new(options);
        let aig = Aig::parse(ROTATOR.as_bytes()).unwrap();
        Rc::new(TransitionRelation::from_aig(ctx, &aig, 0).unwrap())
    }

    #[test]
    fn test_empty_frame_uses_only_the_relation() {
        for simplify in [false, true] {
            let tr = rotator(simplify);
            let l = tr.latch_ids();
            let mut checker = ConsecutionChecker::new(Rc::clone(&tr));
            // "some bit is set" survives rotation on its own.
            assert_eq!(checker.support_solve(&[], &l).unwrap(), Some(vec![]));
            // "l1 is clear" does not.
            assert_eq!(checker.support_solve(&[], &[!l[1]]).unwrap(), None);
        }
    }

    #[test]
    fn test_support_names_the_previous_bit() {
        for simplify in [false, true] {
            let tr = rotator(simplify);
            let l = tr.latch_ids();
            let clauses: Vec<Clause> = l.iter().map(|&x| vec![!x]).collect();
            let mut checker = ConsecutionChecker::with_clauses(Rc::clone(&tr), &clauses);
            let frame = [0, 1, 2, 3];
            // !l1' = !l0
            assert_eq!(checker.support_solve(&frame, &[!l[1]]).unwrap(), Some(vec![0]));
            assert!(checker.solve(&frame, 1).unwrap());
            assert!(!checker.solve(&[0, 1, 2], 0).unwrap());
            assert!(checker.falsifies_primed(&[!l[0]]));
            assert!(checker.is_inductive(&frame).unwrap());
            assert!(!checker.is_inductive(&[0, 1]).unwrap());
        }
    }

    #[test]
    fn test_clause_added_after_initialization() {
        let tr = rotator(true);
        let l = tr.latch_ids();
        let mut checker = ConsecutionChecker::new(Rc::clone(&tr));
        checker.add_clause(0, &[!l[0]]);
        assert!(!checker.solve(&[0], 0).unwrap());
        checker.add_clause(1, &[!l[3]]);
        assert_eq!(checker.support_solve(&[0, 1], &[!l[0]]).unwrap(), Some(vec![1]));
    }
}
