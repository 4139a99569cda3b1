use super::{
    IvcExtractor, all_gates, complement, limit_reached, model_is_safe, shrink_correction_set,
};
use crate::safety::gates_are_safe;
use sisi_core::{Context, Lit, Result};
use sisi_opt::HittingSetFinder;
use sisi_ts::TransitionRelation;
use std::rc::Rc;
use tracing::info;

/// Hitting-set MIVC enumeration driven by safety checks alone.
///
/// Like [`Caivc`](super::Caivc), but the complement of an unsafe hitting
/// set is shrunk to an MCS by repeated safety checks instead of the
/// debugger.
#[derive(Debug)]
pub struct Cbvc {
    ctx: Rc<Context>,
    tr: Rc<TransitionRelation>,
    gates: Vec<Lit>,
    hitting: HittingSetFinder,
    limit: Option<usize>,
}

impl Cbvc {
    /// Extract MIVCs of `tr`.
    pub fn new(tr: Rc<TransitionRelation>) -> Self {
        let ctx = Rc::clone(tr.context());
        Self {
            gates: all_gates(&tr),
            hitting: HittingSetFinder::new(Rc::clone(&ctx)),
            limit: None,
            ctx,
            tr,
        }
    }

    /// Stop after `limit` MIVCs.
    pub fn with_limit(mut self, limit: Option<usize>) -> Self {
        self.limit = limit;
        self
    }
}

impl IvcExtractor for Cbvc {
    fn extract(&mut self) -> Result<Vec<Vec<Lit>>> {
        let mut found = Vec::new();
        if !model_is_safe(&self.tr)? {
            return Ok(found);
        }
        while !limit_reached(self.limit, found.len()) {
            let Some(candidate) = self.hitting.solve()? else {
                break;
            };
            if gates_are_safe(&self.tr, &candidate)? {
                self.ctx.stats.record_ivc(candidate.len());
                info!(size = candidate.len(), number = found.len() + 1, "cbvc: MIVC");
                self.hitting.block(&candidate);
                found.push(candidate);
                continue;
            }
            let rest = complement(&self.gates, &candidate);
            let mcs = shrink_correction_set(&self.tr, &rest)?;
            self.hitting.add_set(&mcs);
        }
        Ok(found)
    }
}
