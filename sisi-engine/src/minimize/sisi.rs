use super::Minimizer;
use super::brute::greedy_msis;
use crate::clause_db::ClauseId;
use crate::consecution::ConsecutionChecker;
use crate::mis::MisFinder;
use crate::proof::{PROPERTY_ID, Proof};
use crate::support::MinimalSupportFinder;
use rustc_hash::FxHashSet;
use sisi_core::Result;
use sisi_ts::TransitionRelation;
use std::rc::Rc;
use tracing::{debug, info, warn};

/// Support-closure minimization.
///
/// Within the maximum inductive subset of the proof, every clause has a
/// minimal support. Closing over supports from the property clause gives
/// an inductive subset that is usually far smaller than the proof; the
/// greedy pass then only runs on that subset.
#[derive(Debug)]
pub struct SupportMinimizer {
    checker: ConsecutionChecker,
    ids: Vec<ClauseId>,
}

impl SupportMinimizer {
    /// Minimize `proof` of `tr`.
    pub fn new(tr: Rc<TransitionRelation>, proof: &Proof) -> Self {
        Self {
            checker: ConsecutionChecker::with_clauses(tr, proof.clauses()),
            ids: proof.ids(),
        }
    }

    /// The support closure of the property clause inside `frame`, sorted.
    pub fn support_closure(&mut self, frame: &[ClauseId]) -> Result<Vec<ClauseId>> {
        let mut finder = MinimalSupportFinder::new(&mut self.checker);
        let mut closure: FxHashSet<ClauseId> = FxHashSet::default();
        closure.insert(PROPERTY_ID);
        let mut worklist = vec![PROPERTY_ID];
        while let Some(id) = worklist.pop() {
            let Some(support) = finder.find_support(frame, id)? else {
                continue;
            };
            for s in support {
                if closure.insert(s) {
                    worklist.push(s);
                }
            }
        }
        let mut closure: Vec<ClauseId> = closure.into_iter().collect();
        closure.sort_unstable();
        debug!(closure = closure.len(), frame = frame.len(), "support closure");
        Ok(closure)
    }
}

impl Minimizer for SupportMinimizer {
    fn minimize(&mut self) -> Result<Vec<Vec<ClauseId>>> {
        let mut finder = MisFinder::new(&mut self.checker);
        let Some(mis) = finder.find_mis(&self.ids, &[PROPERTY_ID])? else {
            warn!("the proof has no inductive subset containing the property");
            return Ok(Vec::new());
        };
        let closure = self.support_closure(&mis)?;
        let Some(msis) = greedy_msis(&mut self.checker, &closure)? else {
            return Ok(Vec::new());
        };
        self.checker.relation().context().stats.record_msis();
        info!(size = msis.len(), closure = closure.len(), of = self.ids.len(), "sisi: MSIS");
        Ok(vec![msis])
    }
}
