use super::Minimizer;
use crate::clause_db::ClauseId;
use crate::consecution::ConsecutionChecker;
use crate::mis::MisFinder;
use crate::proof::{PROPERTY_ID, Proof};
use sisi_core::Result;
use sisi_ts::TransitionRelation;
use std::rc::Rc;
use tracing::{info, warn};

/// Shrink `start` to an MSIS: take its maximum inductive subset, then try
/// dropping each clause in turn, keeping the maximum inductive subset of
/// what remains whenever it still holds the property clause.
pub(crate) fn greedy_msis(
    checker: &mut ConsecutionChecker,
    start: &[ClauseId],
) -> Result<Option<Vec<ClauseId>>> {
    let necessary = [PROPERTY_ID];
    let mut finder = MisFinder::new(checker);
    let Some(mut current) = finder.find_mis(start, &necessary)? else {
        return Ok(None);
    };
    let mut i = 0;
    while i < current.len() {
        let id = current[i];
        if id == PROPERTY_ID {
            i += 1;
            continue;
        }
        let candidate: Vec<ClauseId> = current.iter().copied().filter(|&c| c != id).collect();
        match finder.find_mis(&candidate, &necessary)? {
            Some(smaller) => {
                i = smaller.partition_point(|&c| c < id);
                current = smaller;
            }
            None => i += 1,
        }
    }
    Ok(Some(current))
}

/// Greedy minimization of the whole proof.
#[derive(Debug)]
pub struct BruteForceMinimizer {
    checker: ConsecutionChecker,
    ids: Vec<ClauseId>,
}

impl BruteForceMinimizer {
    /// Minimize `proof` of `tr`.
    pub fn new(tr: Rc<TransitionRelation>, proof: &Proof) -> Self {
        Self {
            checker: ConsecutionChecker::with_clauses(tr, proof.clauses()),
            ids: proof.ids(),
        }
    }
}

impl Minimizer for BruteForceMinimizer {
    fn minimize(&mut self) -> Result<Vec<Vec<ClauseId>>> {
        let Some(msis) = greedy_msis(&mut self.checker, &self.ids)? else {
            warn!("the proof has no inductive subset containing the property");
            return Ok(Vec::new());
        };
        self.checker.relation().context().stats.record_msis();
        info!(size = msis.len(), of = self.ids.len(), "brute force: MSIS");
        Ok(vec![msis])
    }
}
