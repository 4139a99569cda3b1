use crate::ic3::Ic3Debugger;
use crate::safety::gates_are_safe;
use rustc_hash::FxHashSet;
use serde::Serialize;
use sisi_core::{Lit, Result, Subsystem};
use sisi_ts::TransitionRelation;
use std::rc::Rc;
use tracing::debug;

/// Verdict on a candidate IVC.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct IvcVerdict {
    /// The model keeping only the candidate gates is safe
    pub safe: bool,
    /// Freeing any single candidate gate breaks the property
    pub minimal: bool,
}

impl IvcVerdict {
    /// Safe and minimal.
    pub fn is_mivc(&self) -> bool {
        self.safe && self.minimal
    }
}

/// Checks candidate IVCs of a model.
#[derive(Debug)]
pub struct IvcChecker {
    tr: Rc<TransitionRelation>,
}

impl IvcChecker {
    /// Check candidates against `tr`.
    pub fn new(tr: Rc<TransitionRelation>) -> Self {
        Self { tr }
    }

    /// Whether the model keeping only `gates` is safe.
    pub fn is_safe(&self, gates: &[Lit]) -> Result<bool> {
        gates_are_safe(&self.tr, gates)
    }

    /// Whether every gate of `gates` is needed: on the partial model, each
    /// of them alone is a correction set. Assumes the partial model is
    /// safe.
    pub fn is_minimal(&self, gates: &[Lit]) -> Result<bool> {
        let keep: FxHashSet<Lit> = gates.iter().copied().collect();
        let partial = self.tr.restrict_to_gates(&keep);
        let mut debugger = Ic3Debugger::new(&partial);
        debugger.set_cardinality(1)?;
        let mut needed: FxHashSet<Lit> = FxHashSet::default();
        while let Some(solution) = debugger.debug_and_block()? {
            if solution.is_empty() {
                break;
            }
            needed.extend(solution);
        }
        let minimal = keep.iter().all(|g| needed.contains(g));
        debug!(gates = gates.len(), needed = needed.len(), minimal, "ivc minimality");
        Ok(minimal)
    }

    /// Full verdict on `gates`.
    pub fn check(&self, gates: &[Lit]) -> Result<IvcVerdict> {
        let ctx = Rc::clone(self.tr.context());
        let _timer = ctx.stats.timer(Subsystem::Safety);
        let safe = self.is_safe(gates)?;
        let minimal = safe && self.is_minimal(gates)?;
        Ok(IvcVerdict { safe, minimal })
    }
}
