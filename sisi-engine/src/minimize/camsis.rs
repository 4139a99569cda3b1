use super::Minimizer;
use crate::clause_db::ClauseId;
use crate::collapse::CollapseFinder;
use crate::consecution::ConsecutionChecker;
use crate::proof::{PROPERTY_ID, Proof};
use sisi_core::{Clause, Context, Lit, Result};
use sisi_opt::{MaxSat, new_maxsat};
use sisi_ts::TransitionRelation;
use std::rc::Rc;
use tracing::{debug, info};

/// Collapse-guided MSIS enumeration.
///
/// A MaxSAT map over one selector per clause proposes the smallest
/// candidate that satisfies every constraint learned so far, with the
/// property clause always selected. An inductive candidate is an MSIS: it
/// is reported, and its supersets are blocked. Otherwise every clause the
/// candidate does not support yields a collapse set disjoint from the
/// candidate, and the map learns that selecting the clause requires
/// selecting some member of that collapse set.
pub struct CamsisMinimizer {
    ctx: Rc<Context>,
    checker: ConsecutionChecker,
    collapse: CollapseFinder,
    map: Box<dyn MaxSat>,
    selectors: Vec<Lit>,
    limit: Option<usize>,
}

impl std::fmt::Debug for CamsisMinimizer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CamsisMinimizer")
            .field("clauses", &self.selectors.len())
            .field("limit", &self.limit)
            .finish()
    }
}

impl CamsisMinimizer {
    /// Enumerate the MSISes of `proof` of `tr`.
    pub fn new(tr: Rc<TransitionRelation>, proof: &Proof) -> Self {
        let ctx = Rc::clone(tr.context());
        let mut map = new_maxsat(&ctx);
        let selectors: Vec<Lit> = proof.ids().iter().map(|_| ctx.vars.new_lit()).collect();
        for &sel in &selectors {
            map.add_for_optimization(sel.negate());
        }
        map.add_clause(&[selectors[PROPERTY_ID]]);
        Self {
            checker: ConsecutionChecker::with_clauses(Rc::clone(&tr), proof.clauses()),
            collapse: CollapseFinder::with_clauses(tr, proof.clauses()),
            ctx,
            map,
            selectors,
            limit: None,
        }
    }

    /// Stop after `limit` MSISes.
    pub fn with_limit(mut self, limit: Option<usize>) -> Self {
        self.limit = limit;
        self
    }

    fn candidate(&mut self) -> Result<Option<Vec<ClauseId>>> {
        if !self.map.solve(&[])? {
            return Ok(None);
        }
        Ok(Some(
            self.selectors
                .iter()
                .enumerate()
                .filter(|&(_, &sel)| self.map.assignment(sel).is_true())
                .map(|(id, _)| id)
                .collect(),
        ))
    }

    fn unsupported(&mut self, candidate: &[ClauseId]) -> Result<Vec<ClauseId>> {
        let mut unsupported = Vec::new();
        for &id in candidate {
            if !self.checker.solve(candidate, id)? {
                unsupported.push(id);
            }
        }
        Ok(unsupported)
    }
}

impl Minimizer for CamsisMinimizer {
    fn minimize(&mut self) -> Result<Vec<Vec<ClauseId>>> {
        let mut found = Vec::new();
        while self.limit.is_none_or(|limit| found.len() < limit) {
            let Some(candidate) = self.candidate()? else {
                break;
            };
            let unsupported = self.unsupported(&candidate)?;
            if unsupported.is_empty() {
                self.ctx.stats.record_msis();
                info!(size = candidate.len(), number = found.len() + 1, "camsis: MSIS");
                let block: Clause =
                    candidate.iter().map(|&id| self.selectors[id].negate()).collect();
                self.map.add_clause(&block);
                found.push(candidate);
                continue;
            }
            for id in unsupported {
                // The candidate stays active, and it does not support `id`.
                // An empty collapse set means no subset of the proof does.
                let Some(collapse) = self.collapse.find_collapse_keeping(id, &candidate)? else {
                    unreachable!("clause {id} is unsupported by the candidate it is kept with");
                };
                let refinement: Clause = std::iter::once(self.selectors[id].negate())
                    .chain(collapse.iter().map(|&c| self.selectors[c]))
                    .collect();
                debug!(clause = id, refinement = refinement.len() - 1, "camsis: refine");
                self.map.add_clause(&refinement);
            }
        }
        Ok(found)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sisi_core::Aig;

    const ROTATOR: &str = "aag 7 0 4 1 3\n2 8\n4 2\n6 4\n8 6\n14\n10 8 7\n12 5 2\n14 12 10\n";

    #[test]
    fn test_single_msis_of_one_hot_free_proof() {
        let aig = Aig::parse(ROTATOR.as_bytes()).unwrap();
        let tr = Rc::new(TransitionRelation::from_aig(Context::with_defaults(), &aig, 0).unwrap());
        let clauses: Vec<Clause> = tr.latch_ids().iter().map(|&x| vec![!x]).collect();
        let proof = Proof::new(&tr, clauses);
        let mut camsis = CamsisMinimizer::new(Rc::clone(&tr), &proof);
        let found = camsis.minimize().unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0][0], PROPERTY_ID);
        assert_eq!(tr.context().stats.snapshot().msis_found, 1);
    }
}
