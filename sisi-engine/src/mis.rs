//! Maximal inductive subsets.

use crate::clause_db::ClauseId;
use crate::consecution::ConsecutionChecker;
use sisi_core::{Result, Subsystem};
use std::rc::Rc;
use tracing::debug;

/// Prunes a candidate set to its largest inductive subset.
///
/// A clause that is not inductive relative to the candidate cannot belong
/// to any inductive subset of it, so it is dropped together with every
/// clause the counterexample to induction also violates. Passes repeat
/// until nothing changes. The result is the unique maximum inductive
/// subset.
#[derive(Debug)]
pub struct MisFinder<'a> {
    checker: &'a mut ConsecutionChecker,
}

impl<'a> MisFinder<'a> {
    /// Wrap a consecution checker holding the candidate clauses.
    pub fn new(checker: &'a mut ConsecutionChecker) -> Self {
        Self { checker }
    }

    /// The maximum inductive subset of `candidate`, or `None` if it does
    /// not contain every clause of `necessary`.
    pub fn find_mis(
        &mut self,
        candidate: &[ClauseId],
        necessary: &[ClauseId],
    ) -> Result<Option<Vec<ClauseId>>> {
        let ctx = Rc::clone(self.checker.relation().context());
        let _timer = ctx.stats.timer(Subsystem::Mis);
        let mut current: Vec<ClauseId> = candidate.to_vec();
        current.sort_unstable();
        current.dedup();
        if necessary.iter().any(|n| current.binary_search(n).is_err()) {
            debug!("mis: necessary clause missing from the candidate");
            return Ok(None);
        }
        if self.checker.is_inductive(&current)? {
            return Ok(Some(current));
        }

        loop {
            let mut removed_any = false;
            let mut i = 0;
            while i < current.len() {
                let id = current[i];
                if self.checker.solve(&current, id)? {
                    i += 1;
                    continue;
                }
                // The counterexample falsifies `id'`; sweep out every other
                // clause it falsifies too.
                let mut removed = Vec::new();
                current.retain(|&other| {
                    let falsified =
                        other == id || self.checker.falsifies_primed(self.checker.clause(other));
                    if falsified {
                        removed.push(other);
                    }
                    !falsified
                });
                debug!(removed = ?removed, remaining = current.len(), "mis: dropped clauses");
                if removed.iter().any(|r| necessary.contains(r)) {
                    return Ok(None);
                }
                removed_any = true;
                i = current.partition_point(|&c| c < id);
            }
            if !removed_any {
                break;
            }
        }
        Ok(Some(current))
    }
}
