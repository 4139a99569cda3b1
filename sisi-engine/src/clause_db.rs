//! Activation-keyed clause databases.
//!
//! Every clause gets an activation literal `a`; solvers see `c | !a`, so
//! assuming `a` enables the clause. Databases built with check literals
//! also mint a second literal per clause that scopes per-clause blocking
//! clauses. Records live in insertion order and both literals map back to
//! the clause id.

use rustc_hash::FxHashMap;
use sisi_core::clause::canonical;
use sisi_core::{Clause, Context, Lit};
use std::rc::Rc;

/// Dense clause identifier.
pub type ClauseId = usize;

/// A stored clause with its literals.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClauseRecord {
    /// Canonical clause
    pub clause: Clause,
    /// Activation literal
    pub activation: Lit,
    /// Check literal, for databases that keep one
    pub check: Option<Lit>,
}

impl ClauseRecord {
    /// The activated clause `c | !a`.
    pub fn activated(&self) -> Clause {
        let mut clause = Vec::with_capacity(self.clause.len() + 1);
        clause.extend_from_slice(&self.clause);
        clause.push(self.activation.negate());
        clause
    }
}

/// Clause store with bidirectional activation lookup.
#[derive(Debug)]
pub struct ClauseDb {
    ctx: Rc<Context>,
    with_checks: bool,
    order: Vec<ClauseId>,
    records: FxHashMap<ClauseId, ClauseRecord>,
    by_activation: FxHashMap<Lit, ClauseId>,
    by_check: FxHashMap<Lit, ClauseId>,
}

impl ClauseDb {
    /// Database with activation literals only.
    pub fn new(ctx: Rc<Context>) -> Self {
        Self {
            ctx,
            with_checks: false,
            order: Vec::new(),
            records: FxHashMap::default(),
            by_activation: FxHashMap::default(),
            by_check: FxHashMap::default(),
        }
    }

    /// Database that also mints a check literal per clause.
    pub fn with_check_literals(ctx: Rc<Context>) -> Self {
        Self {
            with_checks: true,
            ..Self::new(ctx)
        }
    }

    /// Store `clause` under `id` and return its activation literal.
    ///
    /// # Panics
    ///
    /// Panics if `id` is already in use.
    pub fn add(&mut self, id: ClauseId, clause: &[Lit]) -> Lit {
        assert!(!self.records.contains_key(&id), "clause id {id} added twice");
        let activation = self.ctx.vars.new_lit();
        let check = self.with_checks.then(|| self.ctx.vars.new_lit());
        let previous = self.by_activation.insert(activation, id);
        assert!(previous.is_none(), "activation literal {activation} reused");
        if let Some(check) = check {
            self.by_check.insert(check, id);
        }
        self.records.insert(
            id,
            ClauseRecord {
                clause: canonical(clause),
                activation,
                check,
            },
        );
        self.order.push(id);
        activation
    }

    /// Whether `id` is stored.
    pub fn contains(&self, id: ClauseId) -> bool {
        self.records.contains_key(&id)
    }

    /// Number of stored clauses.
    pub fn len(&self) -> usize {
        self.order.len()
    }

    /// Whether the database is empty.
    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// Record of `id`.
    pub fn record(&self, id: ClauseId) -> Option<&ClauseRecord> {
        self.records.get(&id)
    }

    /// Clause stored under `id`.
    ///
    /// # Panics
    ///
    /// Panics if `id` is unknown.
    pub fn clause(&self, id: ClauseId) -> &Clause {
        &self.expect_record(id).clause
    }

    /// Activation literal of `id`.
    ///
    /// # Panics
    ///
    /// Panics if `id` is unknown.
    pub fn activation(&self, id: ClauseId) -> Lit {
        self.expect_record(id).activation
    }

    /// Check literal of `id`.
    ///
    /// # Panics
    ///
    /// Panics if `id` is unknown or the database keeps no check literals.
    pub fn check(&self, id: ClauseId) -> Lit {
        match self.expect_record(id).check {
            Some(check) => check,
            None => panic!("clause database keeps no check literals"),
        }
    }

    /// Clause id activated by `lit`.
    pub fn id_of_activation(&self, lit: Lit) -> Option<ClauseId> {
        self.by_activation.get(&lit).copied()
    }

    /// Clause id scoped by check literal `lit`.
    pub fn id_of_check(&self, lit: Lit) -> Option<ClauseId> {
        self.by_check.get(&lit).copied()
    }

    /// Activation literals of `ids`.
    pub fn activations(&self, ids: &[ClauseId]) -> Vec<Lit> {
        ids.iter().map(|&id| self.activation(id)).collect()
    }

    /// Ids in insertion order.
    pub fn ids(&self) -> &[ClauseId] {
        &self.order
    }

    /// `(id, clause, activation)` triples in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (ClauseId, &Clause, Lit)> {
        self.order.iter().map(|&id| {
            let record = &self.records[&id];
            (id, &record.clause, record.activation)
        })
    }

    fn expect_record(&self, id: ClauseId) -> &ClauseRecord {
        match self.records.get(&id) {
            Some(record) => record,
            None => panic!("unknown clause id {id}"),
        }
    }
}
