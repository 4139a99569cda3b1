//! Proofs: the property clause plus its inductive strengthening.

use crate::clause_db::ClauseId;
use sisi_core::clause::canonical;
use sisi_core::{Clause, Result, SisiError};
use sisi_ts::TransitionRelation;

/// Id of the property clause `!bad` in every [`Proof`].
pub const PROPERTY_ID: ClauseId = 0;

/// A proof indexed by clause id; id [`PROPERTY_ID`] is the property
/// clause. Clauses are canonical and pairwise distinct.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Proof {
    clauses: Vec<Clause>,
}

impl Proof {
    /// Build a proof of `tr` from strengthening clauses. The property
    /// clause is prepended; duplicates, including copies of the property
    /// clause, are dropped.
    pub fn new(tr: &TransitionRelation, clauses: impl IntoIterator<Item = Clause>) -> Self {
        let mut all = vec![canonical(&tr.property_clause())];
        for clause in clauses {
            let clause = canonical(&clause);
            if !all.contains(&clause) {
                all.push(clause);
            }
        }
        Self { clauses: all }
    }

    /// Build a proof from clauses over AIGER literals.
    pub fn from_external(tr: &TransitionRelation, clauses: &[Vec<u64>]) -> Result<Self> {
        let vars = &tr.context().vars;
        let mut internal = Vec::with_capacity(clauses.len());
        for (i, ext) in clauses.iter().enumerate() {
            let clause = vars.make_internal(ext).ok_or_else(|| {
                let message = format!("clause {i} mentions a literal the model does not define");
                SisiError::format(i + 1, message)
            })?;
            internal.push(clause);
        }
        Ok(Self::new(tr, internal))
    }

    /// Every clause, by id.
    pub fn clauses(&self) -> &[Clause] {
        &self.clauses
    }

    /// Clause `id`.
    pub fn clause(&self, id: ClauseId) -> &Clause {
        &self.clauses[id]
    }

    /// Number of clauses, the property included.
    pub fn len(&self) -> usize {
        self.clauses.len()
    }

    /// Always `false`: a proof holds at least the property clause.
    pub fn is_empty(&self) -> bool {
        self.clauses.is_empty()
    }

    /// All ids.
    pub fn ids(&self) -> Vec<ClauseId> {
        (0..self.clauses.len()).collect()
    }

    /// The clauses named by `ids`.
    pub fn subset(&self, ids: &[ClauseId]) -> Vec<Clause> {
        ids.iter().map(|&id| self.clauses[id].clone()).collect()
    }

    /// The clauses named by `ids` as AIGER literals; `None` if one
    /// mentions a literal without an AIGER counterpart.
    pub fn to_external(&self, tr: &TransitionRelation, ids: &[ClauseId]) -> Option<Vec<Vec<u64>>> {
        let vars = &tr.context().vars;
        ids.iter().map(|&id| vars.make_external(&self.clauses[id])).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sisi_core::{Aig, Context};

    const ROTATOR: &str = "aag 7 0 4 1 3\n2 8\n4 2\n6 4\n8 6\n14\n10 8 7\n12 5 2\n14 12 10\n";

    #[test]
    fn test_property_comes_first() {
        let aig = Aig::parse(ROTATOR.as_bytes()).unwrap();
        let tr = TransitionRelation::from_aig(Context::with_defaults(), &aig, 0).unwrap();
        let proof = Proof::from_external(&tr, &[vec![3, 5], vec![15], vec![5, 3]]).unwrap();
        assert_eq!(proof.len(), 2);
        assert_eq!(proof.clause(PROPERTY_ID), &tr.property_clause());
        assert_eq!(proof.to_external(&tr, &[1]), Some(vec![vec![3, 5]]));
        assert!(Proof::from_external(&tr, &[vec![40]]).is_err());
    }
}
