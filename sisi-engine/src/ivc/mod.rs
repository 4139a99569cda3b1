//! Inductive validity cores.
//!
//! An IVC is a set of gates such that the model keeping only those gates
//! (the others become free inputs) is still safe. Minimal IVCs (MIVCs)
//! are the minimal hitting sets of the minimal correction sets; the
//! extractors differ in how they discover correction sets and how they
//! pick the next candidate.

mod caivc;
mod cbvc;
mod checker;
mod marco;
mod uivc;

pub use caivc::Caivc;
pub use cbvc::Cbvc;
pub use checker::{IvcChecker, IvcVerdict};
pub use marco::MarcoIvc;
pub use uivc::Uivc;

use crate::safety::{check_safety, gates_are_safe};
use rustc_hash::FxHashSet;
use serde::Serialize;
use sisi_core::{Lit, Result, SisiError};
use sisi_ts::TransitionRelation;
use std::rc::Rc;
use tracing::{debug, warn};

/// An MIVC extractor.
pub trait IvcExtractor {
    /// MIVCs found, each a sorted list of gate outputs.
    fn extract(&mut self) -> Result<Vec<Vec<Lit>>>;
}

/// Extractor selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum IvcKind {
    /// Minimum hitting sets of exact MCSes found on demand
    Caivc,
    /// Minimum hitting sets of correction sets shrunk with safety checks
    Cbvc,
    /// MARCO-style exploration of the gate power set
    Marco,
    /// MCS enumeration up front, then hitting sets
    Uivc,
}

impl std::str::FromStr for IvcKind {
    type Err = SisiError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "caivc" => Ok(IvcKind::Caivc),
            "cbvc" => Ok(IvcKind::Cbvc),
            "marco" => Ok(IvcKind::Marco),
            "uivc" => Ok(IvcKind::Uivc),
            _ => Err(SisiError::config(format!("unknown IVC extractor '{s}'"))),
        }
    }
}

/// Build the extractor `kind` for `tr`, stopping after `limit` MIVCs.
pub fn new_extractor(
    kind: IvcKind,
    tr: Rc<TransitionRelation>,
    limit: Option<usize>,
) -> Box<dyn IvcExtractor> {
    match kind {
        IvcKind::Caivc => Box::new(Caivc::new(tr).with_limit(limit)),
        IvcKind::Cbvc => Box::new(Cbvc::new(tr).with_limit(limit)),
        IvcKind::Marco => Box::new(MarcoIvc::new(tr).with_limit(limit)),
        IvcKind::Uivc => Box::new(Uivc::new(tr).with_limit(limit)),
    }
}

/// Whether `found` MIVCs satisfy `limit`.
pub(crate) fn limit_reached(limit: Option<usize>, found: usize) -> bool {
    limit.is_some_and(|limit| found >= limit)
}

/// Whether the complete model is safe; extraction is pointless otherwise.
pub(crate) fn model_is_safe(tr: &Rc<TransitionRelation>) -> Result<bool> {
    let safe = check_safety(tr)?.is_safe();
    if !safe {
        warn!("the property fails on the complete model; no IVC exists");
    }
    Ok(safe)
}

/// Gates of `tr`, sorted.
pub(crate) fn all_gates(tr: &TransitionRelation) -> Vec<Lit> {
    let mut gates = tr.gate_ids();
    gates.sort_unstable();
    gates
}

/// `all \ set`, in the order of `all`.
pub(crate) fn complement(all: &[Lit], set: &[Lit]) -> Vec<Lit> {
    let set: FxHashSet<Lit> = set.iter().copied().collect();
    all.iter().copied().filter(|g| !set.contains(g)).collect()
}

/// Drop gates from a safe gate set while it stays safe.
pub(crate) fn shrink_ivc(tr: &TransitionRelation, ivc: &[Lit]) -> Result<Vec<Lit>> {
    let mut current = ivc.to_vec();
    let mut i = 0;
    while i < current.len() {
        let mut candidate = current.clone();
        candidate.remove(i);
        if gates_are_safe(tr, &candidate)? {
            current = candidate;
        } else {
            i += 1;
        }
    }
    current.sort_unstable();
    debug!(from = ivc.len(), to = current.len(), "shrunk ivc");
    Ok(current)
}

/// Drop gates from a correction set of `tr` while freeing the rest still
/// breaks the property.
pub(crate) fn shrink_correction_set(tr: &TransitionRelation, set: &[Lit]) -> Result<Vec<Lit>> {
    let all = all_gates(tr);
    let mut current = set.to_vec();
    let mut i = 0;
    while i < current.len() {
        let mut candidate = current.clone();
        candidate.remove(i);
        if !gates_are_safe(tr, &complement(&all, &candidate))? {
            current = candidate;
        } else {
            i += 1;
        }
    }
    current.sort_unstable();
    debug!(from = set.len(), to = current.len(), "shrunk correction set");
    Ok(current)
}
