use super::CorrectionSetFinder;
use crate::ic3::Ic3Debugger;
use sisi_core::{Lit, Result, Subsystem};
use sisi_ts::TransitionRelation;
use std::rc::Rc;
use tracing::{debug, info};

/// Exact MCS finder at a caller-controlled cardinality.
#[derive(Debug)]
pub struct McsFinder {
    debugger: Ic3Debugger,
    num_gates: usize,
    cardinality: usize,
}

impl McsFinder {
    /// Search over every gate of `tr`.
    pub fn new(tr: &TransitionRelation) -> Self {
        Self {
            num_gates: tr.gates().len(),
            debugger: Ic3Debugger::new(tr),
            cardinality: 0,
        }
    }

    /// Search over `gates` only.
    pub fn over_gates(tr: &TransitionRelation, gates: &[Lit]) -> Self {
        let debugger = Ic3Debugger::over_gates(tr, gates);
        Self {
            num_gates: debugger.relation().debug_latches().len(),
            debugger,
            cardinality: 0,
        }
    }

    /// Number of gates the search ranges over.
    pub fn num_gates(&self) -> usize {
        self.num_gates
    }

    /// Current cardinality.
    pub fn cardinality(&self) -> usize {
        self.cardinality
    }

    /// Look for correction sets of at most `n` gates.
    pub fn set_cardinality(&mut self, n: usize) -> Result<()> {
        self.cardinality = n;
        self.debugger.set_cardinality(n)
    }

    /// The next MCS at the current cardinality, blocked from later
    /// answers, or `None` if there is no more at this cardinality.
    pub fn find_and_block(&mut self) -> Result<Option<Vec<Lit>>> {
        let ctx = Rc::clone(self.debugger.relation().relation().context());
        let _timer = ctx.stats.timer(Subsystem::Mcs);
        self.debugger.debug_and_block()
    }

    /// Exclude `gates` and its supersets from later answers.
    pub fn block(&mut self, gates: &[Lit]) {
        self.debugger.block(gates);
    }

    /// An MCS contained in `gates`, not blocked and not a superset of a
    /// blocked set. The result is not blocked; the cardinality is
    /// restored afterwards.
    pub fn find_within(&mut self, gates: &[Lit]) -> Result<Option<Vec<Lit>>> {
        let ctx = Rc::clone(self.debugger.relation().relation().context());
        let _timer = ctx.stats.timer(Subsystem::Mcs);
        let saved = self.cardinality;
        self.debugger.set_allowed_gates(gates)?;
        let mut found = None;
        for k in 1..=gates.len() {
            self.debugger.set_cardinality(k)?;
            if let Some(mcs) = self.debugger.debug()? {
                found = Some(mcs);
                break;
            }
        }
        self.debugger.allow_all_gates()?;
        self.set_cardinality(saved)?;
        debug!(within = gates.len(), mcs = ?found, "mcs within gate set");
        Ok(found)
    }
}

/// Saturated cardinality sweep over an [`McsFinder`]: every MCS of size
/// `k` comes out before any of size `k + 1`.
#[derive(Debug)]
pub struct BasicMcsFinder {
    finder: McsFinder,
    started: bool,
    exhausted: bool,
    lookahead: Option<Vec<Lit>>,
}

impl BasicMcsFinder {
    /// Enumerate the MCSes of `tr`.
    pub fn new(tr: &TransitionRelation) -> Self {
        Self::from_finder(McsFinder::new(tr))
    }

    /// Enumerate the MCSes of `tr` among `gates`.
    pub fn over_gates(tr: &TransitionRelation, gates: &[Lit]) -> Self {
        Self::from_finder(McsFinder::over_gates(tr, gates))
    }

    fn from_finder(finder: McsFinder) -> Self {
        Self {
            finder,
            started: false,
            exhausted: false,
            lookahead: None,
        }
    }

    /// Cardinality currently being enumerated.
    pub fn cardinality(&self) -> usize {
        self.finder.cardinality()
    }

    fn advance(&mut self) -> Result<Option<Vec<Lit>>> {
        if self.exhausted {
            return Ok(None);
        }
        if !self.started {
            self.started = true;
            self.finder.set_cardinality(1)?;
        }
        loop {
            if let Some(mcs) = self.finder.find_and_block()? {
                return Ok(Some(mcs));
            }
            let next = self.finder.cardinality() + 1;
            if next > self.finder.num_gates() {
                self.exhausted = true;
                debug!("mcs enumeration exhausted");
                return Ok(None);
            }
            info!(cardinality = next, "raising mcs cardinality");
            self.finder.set_cardinality(next)?;
        }
    }

    /// Whether another correction set of at most `max_size` gates (any
    /// size if `None`) exists. The set found is kept for the next
    /// [`CorrectionSetFinder::find_next`].
    pub fn more_correction_sets(&mut self, max_size: Option<usize>) -> Result<bool> {
        if self.lookahead.is_none() {
            self.lookahead = self.advance()?;
        }
        Ok(self
            .lookahead
            .as_ref()
            .is_some_and(|mcs| max_size.is_none_or(|max| mcs.len() <= max)))
    }

    /// An MCS inside `gates` that no earlier answer is contained in.
    pub fn find_within(&mut self, gates: &[Lit]) -> Result<Option<Vec<Lit>>> {
        self.finder.find_within(gates)
    }
}

impl CorrectionSetFinder for BasicMcsFinder {
    fn find_next(&mut self) -> Result<Option<Vec<Lit>>> {
        if let Some(mcs) = self.lookahead.take() {
            return Ok(Some(mcs));
        }
        self.advance()
    }

    fn block(&mut self, gates: &[Lit]) {
        self.finder.block(gates);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sisi_core::{Aig, Context};

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
    fn test_saturated_enumeration() {
        let tr = rotator();
        let mut finder = BasicMcsFinder::new(&tr);
        assert!(finder.more_correction_sets(Some(1)).unwrap());
        assert_eq!(finder.find_next().unwrap(), Some(gates(&tr, &[14])));
        assert!(!finder.more_correction_sets(Some(1)).unwrap());
        assert_eq!(finder.find_next().unwrap(), Some(gates(&tr, &[10, 12])));
        assert_eq!(finder.cardinality(), 2);
        assert_eq!(finder.find_next().unwrap(), None);
        assert!(!finder.more_correction_sets(None).unwrap());
    }

    #[test]
    fn test_find_within_restores_cardinality() {
        let tr = rotator();
        let mut finder = McsFinder::new(&tr);
        finder.set_cardinality(1).unwrap();
        let both = gates(&tr, &[10, 12]);
        assert_eq!(finder.find_within(&both).unwrap(), Some(both.clone()));
        assert_eq!(finder.find_within(&gates(&tr, &[10])).unwrap(), None);
        assert_eq!(finder.cardinality(), 1);
        assert_eq!(finder.find_and_block().unwrap(), Some(gates(&tr, &[14])));
        assert_eq!(finder.find_and_block().unwrap(), None);
    }
}
