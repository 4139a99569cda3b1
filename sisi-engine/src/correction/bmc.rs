use super::CorrectionSetFinder;
use crate::bmc::BmcSolver;
use rustc_hash::FxHashSet;
use sisi_core::{Clause, Context, Lit, Result, Subsystem};
use sisi_sat::CardinalityConstraint;
use sisi_ts::{DebugTransitionRelation, TransitionRelation};
use smallvec::SmallVec;
use std::rc::Rc;
use tracing::debug;

/// Correction sets from bounded runs of the debug relation.
///
/// The debug latches start free, bounded by an optional cardinality. A
/// counterexample of at most `mcs_bmc_kmax` steps names a correction set
/// in its first state. Sets are correction sets but not necessarily
/// minimal; [`BmcCorrectionSetFinder::shrink`] minimizes one greedily
/// with bounded checks.
#[derive(Debug)]
pub struct BmcCorrectionSetFinder {
    ctx: Rc<Context>,
    dtr: DebugTransitionRelation,
    bmc: BmcSolver,
    /// Unrestricted solver for shrinking
    probe: BmcSolver,
    card: CardinalityConstraint,
    cardinality: Option<usize>,
    blocking: Vec<Clause>,
    kmax: u32,
}

impl BmcCorrectionSetFinder {
    /// Search over every gate of `tr`.
    pub fn new(tr: &TransitionRelation) -> Self {
        let mut dtr = DebugTransitionRelation::new(tr);
        dtr.open_debug_latches();
        let ctx = Rc::clone(tr.context());
        let relation = Rc::new(dtr.relation().clone());
        Self {
            kmax: u32::try_from(ctx.options.mcs_bmc_kmax).unwrap_or(u32::MAX),
            bmc: BmcSolver::new(Rc::clone(&relation)),
            probe: BmcSolver::new(relation),
            card: CardinalityConstraint::with_inputs(
                Rc::clone(&ctx),
                dtr.debug_latches().iter().copied(),
            ),
            cardinality: None,
            blocking: Vec::new(),
            dtr,
            ctx,
        }
    }

    /// The debug transition relation.
    pub fn relation(&self) -> &DebugTransitionRelation {
        &self.dtr
    }

    /// Number of gates the search ranges over.
    pub fn num_gates(&self) -> usize {
        self.dtr.debug_latches().len()
    }

    /// Current bound on the size of answers.
    pub fn cardinality(&self) -> Option<usize> {
        self.cardinality
    }

    /// Bound answers to at most `k` gates.
    pub fn set_cardinality(&mut self, k: usize) {
        self.cardinality = Some(k);
        self.bmc.clear_restrictions();
        self.card.set_cardinality(k);
        self.card.clear_incrementality();
        let mut restrictions = self.card.cnfize();
        restrictions.extend(self.card.assume_leq(k).into_iter().map(|l| vec![l]));
        restrictions.extend(self.blocking.iter().cloned());
        self.bmc.restrict_initial_states(&restrictions);
    }

    fn solve(&mut self, assumps: &[Lit]) -> Result<Option<Vec<Lit>>> {
        let ctx = Rc::clone(&self.ctx);
        let _timer = ctx.stats.timer(Subsystem::Mcs);
        let result = self.bmc.solve(self.kmax, assumps)?;
        let Some(first) = result.cex().first() else {
            return Ok(None);
        };
        let asserted: SmallVec<[Lit; 8]> = first
            .state
            .iter()
            .copied()
            .filter(|&l| self.dtr.gate_of(l).is_some())
            .collect();
        Ok(Some(self.dtr.gates_of(&asserted)))
    }

    /// A correction set inside `gates`, blocked from later answers.
    pub fn find_and_block_over_gates(&mut self, gates: &[Lit]) -> Result<Option<Vec<Lit>>> {
        let allowed: FxHashSet<Lit> = self.dtr.debugs_of(gates).into_iter().collect();
        let assumps: Vec<Lit> = self
            .dtr
            .debug_latches()
            .iter()
            .filter(|d| !allowed.contains(d))
            .map(|d| d.negate())
            .collect();
        let found = self.solve(&assumps)?;
        if let Some(set) = &found {
            debug!(within = gates.len(), set = ?set, "bmc correction set");
            CorrectionSetFinder::block(self, set);
        }
        Ok(found)
    }

    /// Whether freeing exactly `gates` yields a counterexample within the
    /// depth bound.
    pub fn is_correction_set(&mut self, gates: &[Lit]) -> Result<bool> {
        let ctx = Rc::clone(&self.ctx);
        let _timer = ctx.stats.timer(Subsystem::Mcs);
        let freed: FxHashSet<Lit> = self.dtr.debugs_of(gates).into_iter().collect();
        let assumps: Vec<Lit> = self
            .dtr
            .debug_latches()
            .iter()
            .map(|&d| if freed.contains(&d) { d } else { d.negate() })
            .collect();
        Ok(self.probe.solve(self.kmax, &assumps)?.is_unsafe())
    }

    /// Drop gates from a correction set while it stays one.
    pub fn shrink(&mut self, set: &[Lit]) -> Result<Vec<Lit>> {
        let mut current = set.to_vec();
        let mut i = 0;
        while i < current.len() {
            let mut candidate = current.clone();
            candidate.remove(i);
            if self.is_correction_set(&candidate)? {
                current = candidate;
            } else {
                i += 1;
            }
        }
        current.sort_unstable();
        debug!(from = set.len(), to = current.len(), "shrunk correction set");
        Ok(current)
    }
}

impl CorrectionSetFinder for BmcCorrectionSetFinder {
    fn find_next(&mut self) -> Result<Option<Vec<Lit>>> {
        let found = self.solve(&[])?;
        if let Some(set) = &found {
            self.block(set);
        }
        Ok(found)
    }

    fn block(&mut self, gates: &[Lit]) {
        let clause: Clause = self.dtr.debugs_of(gates).into_iter().map(Lit::negate).collect();
        self.bmc.restrict_initial_states(std::slice::from_ref(&clause));
        self.blocking.push(clause);
    }
}

/// Fast correction sets: a BMC search swept over increasing
/// cardinalities, capped at `mcs_bmc_nmax` answers (0 = no cap).
#[derive(Debug)]
pub struct ApproximateMcsFinder {
    finder: BmcCorrectionSetFinder,
    nmax: usize,
    produced: usize,
}

impl ApproximateMcsFinder {
    /// Search over every gate of `tr`.
    pub fn new(tr: &TransitionRelation) -> Self {
        let finder = BmcCorrectionSetFinder::new(tr);
        Self {
            nmax: finder.ctx.options.mcs_bmc_nmax,
            finder,
            produced: 0,
        }
    }

    /// The underlying BMC finder.
    pub fn inner(&mut self) -> &mut BmcCorrectionSetFinder {
        &mut self.finder
    }
}

impl CorrectionSetFinder for ApproximateMcsFinder {
    fn find_next(&mut self) -> Result<Option<Vec<Lit>>> {
        if self.nmax > 0 && self.produced >= self.nmax {
            return Ok(None);
        }
        if self.finder.cardinality().is_none() {
            self.finder.set_cardinality(1);
        }
        loop {
            if let Some(set) = self.finder.find_next()? {
                self.produced += 1;
                return Ok(Some(set));
            }
            let next = self.finder.cardinality().map_or(1, |k| k + 1);
            if next > self.finder.num_gates() {
                return Ok(None);
            }
            self.finder.set_cardinality(next);
        }
    }

    fn block(&mut self, gates: &[Lit]) {
        self.finder.block(gates);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sisi_core::Aig;

    const ROTATOR: &str = "aag 7 0 4 1 3\n2 8\n4 2\n6 4\n8 6\n14\n10 8 7\n12 5 2\n14 12 10\n";

    fn rotator() -> TransitionRelation {
        let aig = Aig::parse(ROTATOR.as_bytes()).unwrap();
        TransitionRelation::from_aig(Context::with_defaults(), &aig, 0).unwrap()
    }

    fn gates(tr: &TransitionRelation, aiger: &[u64]) -> Vec<Lit> {
        let vars = &tr.context().vars;
        let mut gates: Vec<Lit> = aiger.iter().map(|&a| vars.to_internal(a).unwrap()).collect();
        gates.sort_unstable();
        gates
    }

    #[test]
    fn test_shrink_to_minimal() {
        let tr = rotator();
        let mut finder = BmcCorrectionSetFinder::new(&tr);
        assert!(finder.is_correction_set(&gates(&tr, &[10, 12, 14])).unwrap());
        assert!(!finder.is_correction_set(&gates(&tr, &[10])).unwrap());
        let shrunk = finder.shrink(&gates(&tr, &[10, 12, 14])).unwrap();
        assert!(shrunk == gates(&tr, &[14]) || shrunk == gates(&tr, &[10, 12]));
    }

    #[test]
    fn test_search_over_gates() {
        let tr = rotator();
        let mut finder = BmcCorrectionSetFinder::new(&tr);
        let set = finder.find_and_block_over_gates(&gates(&tr, &[10, 12])).unwrap();
        assert_eq!(set, Some(gates(&tr, &[10, 12])));
        assert_eq!(finder.find_and_block_over_gates(&gates(&tr, &[10, 12])).unwrap(), None);
        assert_eq!(finder.find_and_block_over_gates(&gates(&tr, &[10])).unwrap(), None);
    }

    #[test]
    fn test_approximate_sweep() {
        let tr = rotator();
        let mut finder = ApproximateMcsFinder::new(&tr);
        assert_eq!(finder.find_next().unwrap(), Some(gates(&tr, &[14])));
        assert_eq!(finder.find_next().unwrap(), Some(gates(&tr, &[10, 12])));
        assert_eq!(finder.find_next().unwrap(), None);
    }
}
