//! Proof minimizers.
//!
//! Each minimizer turns a proof into minimal safe inductive subsets
//! (MSISes): subsets that contain the property clause, are inductive, and
//! lose inductiveness when any clause is removed.

mod brute;
mod camsis;
mod sisi;

pub use brute::BruteForceMinimizer;
pub use camsis::CamsisMinimizer;
pub use sisi::SupportMinimizer;

use crate::clause_db::ClauseId;
use crate::proof::Proof;
use serde::Serialize;
use sisi_core::{Result, SisiError};
use sisi_ts::TransitionRelation;
use std::rc::Rc;

/// A proof minimizer.
pub trait Minimizer {
    /// MSISes found, as sorted clause ids of the input proof.
    fn minimize(&mut self) -> Result<Vec<Vec<ClauseId>>>;
}

/// Minimizer selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum MinimizerKind {
    /// Maximum inductive subset, then greedy removal
    Brute,
    /// Support closure from the property, then greedy removal
    Sisi,
    /// Collapse-guided MSIS enumeration
    Camsis,
}

impl std::str::FromStr for MinimizerKind {
    type Err = SisiError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "brute" => Ok(MinimizerKind::Brute),
            "sisi" => Ok(MinimizerKind::Sisi),
            "camsis" => Ok(MinimizerKind::Camsis),
            _ => Err(SisiError::config(format!("unknown minimizer '{s}'"))),
        }
    }
}

/// Build the minimizer `kind` for `proof`. `limit` caps the number of
/// MSISes enumerated by CAMSIS.
pub fn new_minimizer(
    kind: MinimizerKind,
    tr: Rc<TransitionRelation>,
    proof: &Proof,
    limit: Option<usize>,
) -> Box<dyn Minimizer> {
    match kind {
        MinimizerKind::Brute => Box::new(BruteForceMinimizer::new(tr, proof)),
        MinimizerKind::Sisi => Box::new(SupportMinimizer::new(tr, proof)),
        MinimizerKind::Camsis => Box::new(CamsisMinimizer::new(tr, proof).with_limit(limit)),
    }
}
