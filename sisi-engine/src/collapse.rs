//! Collapse sets.
//!
//! The collapse set of a clause `c_i` in a proof `F` is a minimum subset
//! `S` of `F \ {c_i}` whose removal breaks the inductiveness of `c_i`:
//! `(F \ S) & c_i & T & !c_i'` is satisfiable. It is computed with MaxSAT
//! over the activation literals, maximizing the number of clauses kept
//! active. Each clause also carries a check literal that scopes blocking
//! clauses to queries about that clause.

use crate::clause_db::{ClauseDb, ClauseId};
use sisi_core::{Clause, Context, Lit, Result, Subsystem};
use sisi_opt::{MaxSat, new_maxsat};
use sisi_ts::TransitionRelation;
use std::rc::Rc;
use tracing::debug;

/// Per-clause minimum collapse-set enumeration.
pub struct CollapseFinder {
    ctx: Rc<Context>,
    tr: Rc<TransitionRelation>,
    db: ClauseDb,
    maxsat: Option<Box<dyn MaxSat>>,
}

impl std::fmt::Debug for CollapseFinder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CollapseFinder")
            .field("clauses", &self.db.len())
            .field("initialized", &self.maxsat.is_some())
            .finish()
    }
}

impl CollapseFinder {
    /// Create a finder over `tr` with no clauses.
    pub fn new(tr: Rc<TransitionRelation>) -> Self {
        Self {
            ctx: Rc::clone(tr.context()),
            db: ClauseDb::with_check_literals(Rc::clone(tr.context())),
            tr,
            maxsat: None,
        }
    }

    /// Create a finder holding `clauses` under ids `0..n`.
    pub fn with_clauses(tr: Rc<TransitionRelation>, clauses: &[Clause]) -> Self {
        let mut finder = Self::new(tr);
        for (id, clause) in clauses.iter().enumerate() {
            finder.add_clause(id, clause);
        }
        finder
    }

    /// Store `clause` under `id`.
    ///
    /// # Panics
    ///
    /// Panics once the first query has been made.
    pub fn add_clause(&mut self, id: ClauseId, clause: &[Lit]) {
        assert!(
            self.maxsat.is_none(),
            "clauses cannot be added to a collapse finder after its first query"
        );
        self.db.add(id, clause);
    }

    /// Stored clauses.
    pub fn db(&self) -> &ClauseDb {
        &self.db
    }

    fn maxsat(&mut self) -> &mut Box<dyn MaxSat> {
        let (ctx, tr, db) = (&self.ctx, &self.tr, &self.db);
        self.maxsat.get_or_insert_with(|| {
            let mut maxsat = new_maxsat(ctx);
            maxsat.add_clauses(&tr.unroll(2));
            for (id, _, activation) in db.iter() {
                if let Some(record) = db.record(id) {
                    maxsat.add_clause(&record.activated());
                }
                maxsat.add_for_optimization(activation);
            }
            debug!(clauses = db.len(), "collapse finder initialized");
            maxsat
        })
    }

    /// Minimum collapse set of clause `id`, or `None` if the clause is
    /// inductive relative to the whole proof (minus blocked sets).
    ///
    /// `Some` of an empty set means the clause is not inductive even
    /// relative to every other clause: nothing needs to be removed to break
    /// it, and no subset of the proof containing it is inductive.
    pub fn find_collapse(&mut self, id: ClauseId) -> Result<Option<Vec<ClauseId>>> {
        self.find_collapse_keeping(id, &[])
    }

    /// Minimum collapse set of clause `id` among the clauses outside
    /// `keep`; the clauses in `keep` stay active. An empty set means the
    /// clause breaks with all of them active.
    pub fn find_collapse_keeping(
        &mut self,
        id: ClauseId,
        keep: &[ClauseId],
    ) -> Result<Option<Vec<ClauseId>>> {
        let ctx = Rc::clone(&self.ctx);
        let _timer = ctx.stats.timer(Subsystem::Collapse);
        let mut assumps = vec![self.db.activation(id), self.db.check(id)];
        assumps.extend(self.db.clause(id).iter().map(|l| l.prime().negate()));
        assumps.extend(keep.iter().filter(|&&k| k != id).map(|&k| self.db.activation(k)));

        let maxsat = self.maxsat();
        if !maxsat.solve(&assumps)? {
            debug!(clause = id, "no collapse: clause is inductive relative to the proof");
            return Ok(None);
        }
        let inactive: Vec<Lit> = maxsat
            .soft()
            .iter()
            .copied()
            .filter(|&a| !maxsat.assignment(a).is_true())
            .collect();
        let mut collapse: Vec<ClauseId> = inactive
            .into_iter()
            .filter_map(|a| self.db.id_of_activation(a))
            .collect();
        collapse.sort_unstable();
        debug!(clause = id, collapse = ?collapse, "collapse set");
        Ok(Some(collapse))
    }

    /// Like [`CollapseFinder::find_collapse`], then exclude the returned
    /// set from future queries about the same clause. Blocking an empty
    /// set ends the enumeration for that clause.
    pub fn find_and_block(&mut self, id: ClauseId) -> Result<Option<Vec<ClauseId>>> {
        let found = self.find_collapse(id)?;
        if let Some(collapse) = &found {
            self.block(id, collapse);
        }
        Ok(found)
    }

    /// Require queries about clause `id` to keep some clause of
    /// `collapse` active.
    pub fn block(&mut self, id: ClauseId, collapse: &[ClauseId]) {
        let mut clause: Clause = collapse.iter().map(|&c| self.db.activation(c)).collect();
        clause.push(self.db.check(id).negate());
        self.maxsat().add_clause(&clause);
    }
}
