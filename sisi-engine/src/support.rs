//! Minimal support sets.

use crate::clause_db::ClauseId;
use crate::consecution::ConsecutionChecker;
use sisi_core::{Result, Subsystem};
use std::rc::Rc;
use tracing::debug;

/// Shrinks the support of a clause to a minimal one.
///
/// Starts from the core-derived support of the whole frame, then walks the
/// support in id order trying to drop each clause. A successful drop
/// replaces the support with the (smaller) core of that query. Dropping a
/// clause that was needed once never succeeds later, since supports only
/// shrink, so one pass suffices.
#[derive(Debug)]
pub struct MinimalSupportFinder<'a> {
    checker: &'a mut ConsecutionChecker,
}

impl<'a> MinimalSupportFinder<'a> {
    /// Wrap a consecution checker.
    pub fn new(checker: &'a mut ConsecutionChecker) -> Self {
        Self { checker }
    }

    /// A minimal subset of `frame` relative to which clause `id` is
    /// inductive, or `None` if it is not inductive relative to `frame`.
    /// The clause itself never appears in the result.
    pub fn find_support(
        &mut self,
        frame: &[ClauseId],
        id: ClauseId,
    ) -> Result<Option<Vec<ClauseId>>> {
        let ctx = Rc::clone(self.checker.relation().context());
        let _timer = ctx.stats.timer(Subsystem::Support);
        let clause = self.checker.clause(id).clone();
        let frame: Vec<ClauseId> = frame.iter().copied().filter(|&f| f != id).collect();

        let Some(mut support) = self.checker.support_solve(&frame, &clause)? else {
            return Ok(None);
        };
        let mut cursor = 0;
        while cursor < support.len() {
            let candidate_id = support[cursor];
            let candidate: Vec<ClauseId> =
                support.iter().copied().filter(|&s| s != candidate_id).collect();
            match self.checker.support_solve(&candidate, &clause)? {
                Some(smaller) => {
                    // Skip everything up to the dropped id; `smaller` is sorted.
                    cursor = smaller.partition_point(|&s| s < candidate_id);
                    support = smaller;
                }
                None => cursor += 1,
            }
        }
        debug!(clause = id, support = ?support, "minimal support");
        Ok(Some(support))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sisi_core::{Aig, Clause, Context};
    use sisi_ts::TransitionRelation;

    const ROTATOR: &str = "aag 7 0 4 1 3\n2 8\n4 2\n6 4\n8 6\n14\n10 8 7\n12 5 2\n14 12 10\n";

    fn rotator() -> Rc<TransitionRelation> {
        let ctx = Context::with_defaults();
        let aig = Aig::parse(ROTATOR.as_bytes()).unwrap();
        Rc::new(TransitionRelation::from_aig(ctx, &aig, 0).unwrap())
    }

    #[test]
    fn test_support_drops_redundant_clauses() {
        let tr = rotator();
        let l = tr.latch_ids();
        // 0: !l0, 1: !l3, 2: !l3 | !l2 (redundant given 1)
        let clauses: Vec<Clause> = vec![vec![!l[0]], vec![!l[3]], vec![!l[3], !l[2]]];
        let mut checker = ConsecutionChecker::with_clauses(Rc::clone(&tr), &clauses);
        let mut finder = MinimalSupportFinder::new(&mut checker);
        assert_eq!(finder.find_support(&[0, 1, 2], 0).unwrap(), Some(vec![1]));
        assert_eq!(finder.find_support(&[0, 2], 0).unwrap(), None);
    }

    #[test]
    fn test_support_excludes_the_clause_itself() {
        let tr = rotator();
        let l = tr.latch_ids();
        let clauses: Vec<Clause> = vec![l.clone()];
        let mut checker = ConsecutionChecker::with_clauses(Rc::clone(&tr), &clauses);
        let mut finder = MinimalSupportFinder::new(&mut checker);
        assert_eq!(finder.find_support(&[0], 0).unwrap(), Some(vec![]));
    }
}
