//! Cardinality-bounded design debugging with IC3.
//!
//! The prover runs on a debug transition relation whose debug latches may
//! start at either value. Initial-state restrictions bound how many of
//! them are set, exclude sets reported earlier and pin the latches of
//! gates outside the allowed set to 0. A counterexample then names, in its
//! first state, a set of gates whose freeing breaks the property.

use super::Ic3;
use rustc_hash::FxHashSet;
use sisi_core::{Clause, Context, Lit, Result, Subsystem};
use sisi_sat::CardinalityConstraint;
use sisi_ts::{DebugTransitionRelation, TransitionRelation};
use std::rc::Rc;
use tracing::debug;

/// IC3 over a debug transition relation.
#[derive(Debug)]
pub struct Ic3Debugger {
    ctx: Rc<Context>,
    dtr: DebugTransitionRelation,
    ic3: Ic3,
    card: CardinalityConstraint,
    /// `None` while unbounded
    cardinality: Option<usize>,
    blocking: Vec<Clause>,
    /// Debug latches pinned to 0
    disallowed: FxHashSet<Lit>,
}

impl Ic3Debugger {
    /// Debug every gate of `tr`.
    pub fn new(tr: &TransitionRelation) -> Self {
        Self::from_debug_relation(DebugTransitionRelation::new(tr))
    }

    /// Debug only `gates`.
    pub fn over_gates(tr: &TransitionRelation, gates: &[Lit]) -> Self {
        Self::from_debug_relation(DebugTransitionRelation::over_gates(tr, gates))
    }

    fn from_debug_relation(mut dtr: DebugTransitionRelation) -> Self {
        dtr.open_debug_latches();
        let ctx = Rc::clone(dtr.relation().context());
        let ic3 = Ic3::new(Rc::new(dtr.relation().clone()));
        let latches = dtr.debug_latches().iter().copied();
        let card = CardinalityConstraint::with_inputs(Rc::clone(&ctx), latches);
        Self {
            ctx,
            dtr,
            ic3,
            card,
            cardinality: None,
            blocking: Vec::new(),
            disallowed: FxHashSet::default(),
        }
    }

    /// The debug transition relation.
    pub fn relation(&self) -> &DebugTransitionRelation {
        &self.dtr
    }

    /// Current bound on the number of freed gates.
    pub fn cardinality(&self) -> Option<usize> {
        self.cardinality
    }

    /// Bound the number of freed gates by `k`.
    pub fn set_cardinality(&mut self, k: usize) -> Result<()> {
        let expanded = self.cardinality.is_some_and(|old| old < k);
        self.cardinality = Some(k);
        debug!(k, expanded, "debugger cardinality");
        self.reinstall(expanded)
    }

    /// Let the search free only gates in `gates`.
    pub fn set_allowed_gates(&mut self, gates: &[Lit]) -> Result<()> {
        let allowed: FxHashSet<Lit> = self.dtr.debugs_of(gates).into_iter().collect();
        let disallowed: FxHashSet<Lit> = self
            .dtr
            .debug_latches()
            .iter()
            .copied()
            .filter(|d| !allowed.contains(d))
            .collect();
        let expanded = self.disallowed.iter().any(|d| !disallowed.contains(d));
        self.disallowed = disallowed;
        self.reinstall(expanded)
    }

    /// Allow every gate again.
    pub fn allow_all_gates(&mut self) -> Result<()> {
        let gates = self.dtr.gates_of(self.dtr.debug_latches());
        self.set_allowed_gates(&gates)
    }

    fn reinstall(&mut self, expanded: bool) -> Result<()> {
        self.ic3.clear_restrictions();
        if let Some(k) = self.cardinality {
            self.card.set_cardinality(k);
            self.card.clear_incrementality();
            for clause in self.card.cnfize() {
                self.ic3.restrict_initial_states(&clause);
            }
            for lit in self.card.assume_leq(k) {
                self.ic3.restrict_initial_states(&[lit]);
            }
        }
        for clause in &self.blocking {
            self.ic3.restrict_initial_states(clause);
        }
        let mut pinned: Vec<Lit> = self.disallowed.iter().copied().collect();
        pinned.sort_unstable();
        for d in pinned {
            self.ic3.restrict_initial_states(&[d.negate()]);
        }
        if expanded {
            self.ic3.initial_states_expanded()
        } else {
            self.ic3.initial_states_restricted();
            Ok(())
        }
    }

    /// A set of gates whose freeing breaks the property, or `None` if no
    /// admissible set does.
    pub fn debug(&mut self) -> Result<Option<Vec<Lit>>> {
        let ctx = Rc::clone(&self.ctx);
        let _timer = ctx.stats.timer(Subsystem::Debug);
        let result = self.ic3.prove()?;
        let Some(first) = result.cex().first() else {
            debug!(k = ?self.cardinality, "debugger: no solution");
            return Ok(None);
        };
        let asserted: Vec<Lit> = first
            .state
            .iter()
            .copied()
            .filter(|l| self.dtr.gate_of(*l).is_some())
            .collect();
        let gates = self.dtr.gates_of(&asserted);
        debug!(gates = ?gates, "debugger: solution");
        Ok(Some(gates))
    }

    /// Exclude `gates`, and every superset of it, from later solutions.
    pub fn block(&mut self, gates: &[Lit]) {
        let clause: Clause = self.dtr.debugs_of(gates).into_iter().map(Lit::negate).collect();
        self.ic3.restrict_initial_states(&clause);
        self.ic3.initial_states_restricted();
        self.blocking.push(clause);
    }

    /// [`Ic3Debugger::debug`], then block the solution.
    pub fn debug_and_block(&mut self) -> Result<Option<Vec<Lit>>> {
        let solution = self.debug()?;
        if let Some(gates) = &solution {
            self.block(gates);
        }
        Ok(solution)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sisi_core::Aig;

    const ROTATOR: &str = "aag 7 0 4 1 3\n2 8\n4 2\n6 4\n8 6\n14\n10 8 7\n12 5 2\n14 12 10\n";

    fn zero_init_rotator() -> TransitionRelation {
        let ctx = Context::with_defaults();
        let aig = Aig::parse(ROTATOR.as_bytes()).unwrap();
        TransitionRelation::from_aig(ctx, &aig, 0).unwrap()
    }

    fn gate(tr: &TransitionRelation, aiger: u64) -> Lit {
        tr.context().vars.to_internal(aiger).unwrap()
    }

    #[test]
    fn test_solutions_by_cardinality() {
        let tr = zero_init_rotator();
        let (g1, g2, bad) = (gate(&tr, 10), gate(&tr, 12), gate(&tr, 14));
        let mut debugger = Ic3Debugger::new(&tr);
        debugger.set_cardinality(1).unwrap();
        assert_eq!(debugger.debug_and_block().unwrap(), Some(vec![bad]));
        assert_eq!(debugger.debug().unwrap(), None);

        debugger.set_cardinality(2).unwrap();
        let mut pair = vec![g1, g2];
        pair.sort_unstable();
        assert_eq!(debugger.debug_and_block().unwrap(), Some(pair));
        assert_eq!(debugger.debug().unwrap(), None);
        assert_eq!(debugger.cardinality(), Some(2));
    }

    #[test]
    fn test_allowed_gates() {
        let tr = zero_init_rotator();
        let (g1, bad) = (gate(&tr, 10), gate(&tr, 14));
        let mut debugger = Ic3Debugger::new(&tr);
        debugger.set_cardinality(2).unwrap();
        debugger.set_allowed_gates(&[g1]).unwrap();
        assert_eq!(debugger.debug().unwrap(), None);
        debugger.allow_all_gates().unwrap();
        let solution = debugger.debug().unwrap().unwrap();
        assert!(solution.contains(&bad) || solution.len() == 2);
    }
}
