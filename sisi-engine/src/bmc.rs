//! Bounded model checking.
//!
//! One incremental SAT instance holds the unrolling from the initial
//! states. Asking for depth `k` extends the unrolling as needed and
//! assumes `bad@k`. Initial-state restrictions are asserted at frame 0 and
//! stay until [`BmcSolver::clear_restrictions`], which rebuilds the
//! instance from scratch.
//!
//! No structural simplification is applied to the unrolled frames.

use crate::safety::{SafetyResult, Step};
use sisi_core::{Clause, Context, Cube, Lit, Result, Subsystem};
use sisi_sat::SatSolver;
use sisi_ts::TransitionRelation;
use std::rc::Rc;
use tracing::{debug, trace};

/// Incremental BMC over a transition relation.
#[derive(Debug)]
pub struct BmcSolver {
    ctx: Rc<Context>,
    tr: Rc<TransitionRelation>,
    solver: SatSolver,
    /// Frames currently unrolled
    frames: u32,
    restrictions: Vec<Clause>,
}

impl BmcSolver {
    /// Create a solver over `tr` with only the initial states asserted.
    pub fn new(tr: Rc<TransitionRelation>) -> Self {
        let ctx = Rc::clone(tr.context());
        let mut bmc = Self {
            solver: SatSolver::new(Rc::clone(&ctx)),
            ctx,
            tr,
            frames: 0,
            restrictions: Vec::new(),
        };
        bmc.reset();
        bmc
    }

    fn reset(&mut self) {
        self.solver.reset();
        self.solver.add_clauses(self.tr.init_state());
        self.frames = 0;
    }

    /// The transition relation.
    pub fn relation(&self) -> &Rc<TransitionRelation> {
        &self.tr
    }

    /// Number of frames unrolled so far.
    pub fn depth(&self) -> u32 {
        self.frames
    }

    fn unroll_to(&mut self, k: u32) {
        while self.frames <= k {
            if self.frames > 0 {
                self.solver.add_clauses(self.tr.transition_clauses(self.frames - 1));
            }
            self.solver.add_clauses(self.tr.frame_clauses(self.frames));
            self.frames += 1;
        }
    }

    /// Look for a counterexample of exactly `k + 1` states under `assumps`
    /// (frame-indexed literals). Returns [`SafetyResult::Unsafe`] with the
    /// trace, or [`SafetyResult::Unknown`].
    pub fn solve_at_k(&mut self, k: u32, assumps: &[Lit]) -> Result<SafetyResult> {
        let ctx = Rc::clone(&self.ctx);
        let _timer = ctx.stats.timer(Subsystem::Bmc);
        self.unroll_to(k);
        let mut all = Vec::with_capacity(assumps.len() + 1);
        all.extend_from_slice(assumps);
        all.push(self.tr.bad().primed(k));
        if !self.solver.solve(&all)? {
            trace!(k, "bmc: no counterexample");
            return Ok(SafetyResult::Unknown);
        }
        let cex = self.extract_trace(k);
        debug!(k, "bmc: counterexample");
        Ok(SafetyResult::Unsafe(cex))
    }

    /// Try depths `0..=kmax` and return the first counterexample.
    pub fn solve(&mut self, kmax: u32, assumps: &[Lit]) -> Result<SafetyResult> {
        for k in 0..=kmax {
            let result = self.solve_at_k(k, assumps)?;
            if result.is_unsafe() {
                return Ok(result);
            }
        }
        Ok(SafetyResult::Unknown)
    }

    fn values_at(&self, lits: &[Lit], n: u32) -> Cube {
        lits.iter()
            .filter_map(|&l| {
                let value = self.solver.safe_assignment(l.primed(n));
                if value.is_true() {
                    Some(l)
                } else if value.is_false() {
                    Some(l.negate())
                } else {
                    None
                }
            })
            .collect()
    }

    fn extract_trace(&self, k: u32) -> Vec<Step> {
        let latches = self.tr.latch_ids();
        (0..=k)
            .map(|n| Step {
                inputs: self.values_at(self.tr.inputs(), n),
                state: self.values_at(&latches, n),
            })
            .collect()
    }

    /// Assert `clauses` (frame-0 literals) on the initial states until the
    /// next [`BmcSolver::clear_restrictions`].
    pub fn restrict_initial_states(&mut self, clauses: &[Clause]) {
        for clause in clauses {
            self.solver.add_clause(clause);
            self.restrictions.push(clause.clone());
        }
    }

    /// Restrictions currently asserted.
    pub fn restrictions(&self) -> &[Clause] {
        &self.restrictions
    }

    /// Drop every restriction and the unrolling.
    pub fn clear_restrictions(&mut self) {
        debug!(dropped = self.restrictions.len(), "bmc: clearing restrictions");
        self.restrictions.clear();
        self.reset();
    }
}
