use super::{IvcExtractor, all_gates, complement, limit_reached, model_is_safe};
use crate::correction::{
    ApproximateMcsFinder, BasicMcsFinder, BmcCorrectionSetFinder, CorrectionSetFinder,
};
use crate::safety::gates_are_safe;
use sisi_core::{Context, Lit, Result};
use sisi_opt::HittingSetFinder;
use sisi_ts::TransitionRelation;
use std::rc::Rc;
use tracing::{debug, info, warn};

/// Correction-set guided MIVC enumeration.
///
/// Keeps the correction sets found so far in a hitting-set finder. A
/// minimum hitting set that is safe is an MIVC and is blocked; an unsafe
/// one means its complement breaks the property, so an MCS inside the
/// complement is added and the search continues. MIVCs come out in order
/// of size.
#[derive(Debug)]
pub struct Caivc {
    ctx: Rc<Context>,
    tr: Rc<TransitionRelation>,
    gates: Vec<Lit>,
    mcs: BasicMcsFinder,
    bmc: Option<BmcCorrectionSetFinder>,
    hitting: HittingSetFinder,
    limit: Option<usize>,
}

impl Caivc {
    /// Extract MIVCs of `tr`.
    pub fn new(tr: Rc<TransitionRelation>) -> Self {
        let ctx = Rc::clone(tr.context());
        Self {
            gates: all_gates(&tr),
            mcs: BasicMcsFinder::new(&tr),
            bmc: ctx.options.caivc_use_bmc.then(|| BmcCorrectionSetFinder::new(&tr)),
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

    /// Seed the hitting sets with every MCS up to the presweep bound, and
    /// with approximate correction sets when enabled.
    fn presweep(&mut self) -> Result<()> {
        let bound = self.ctx.options.caivc_presweep_cardinality;
        if bound > 0 {
            loop {
                let more = self.mcs.more_correction_sets(Some(bound))?;
                let Some(set) = self.mcs.find_next()? else {
                    break;
                };
                self.hitting.add_set(&set);
                if !more {
                    break;
                }
            }
        }
        if self.ctx.options.caivc_approx_mcs {
            let mut approx = ApproximateMcsFinder::new(&self.tr);
            while let Some(set) = approx.find_next()? {
                let shrunk = approx.inner().shrink(&set)?;
                self.hitting.add_set(&shrunk);
            }
        }
        debug!(sets = self.hitting.num_sets(), "caivc presweep");
        Ok(())
    }

    /// An MCS inside `gates`, which must be a correction set.
    fn mcs_within(&mut self, gates: &[Lit]) -> Result<Option<Vec<Lit>>> {
        if let Some(bmc) = &mut self.bmc
            && let Some(set) = bmc.find_and_block_over_gates(gates)?
        {
            return Ok(Some(bmc.shrink(&set)?));
        }
        self.mcs.find_within(gates)
    }
}

impl IvcExtractor for Caivc {
    fn extract(&mut self) -> Result<Vec<Vec<Lit>>> {
        let mut found = Vec::new();
        if !model_is_safe(&self.tr)? {
            return Ok(found);
        }
        self.presweep()?;
        while !limit_reached(self.limit, found.len()) {
            let Some(candidate) = self.hitting.solve()? else {
                break;
            };
            if gates_are_safe(&self.tr, &candidate)? {
                self.ctx.stats.record_ivc(candidate.len());
                info!(size = candidate.len(), number = found.len() + 1, "caivc: MIVC");
                self.hitting.block(&candidate);
                found.push(candidate);
                continue;
            }
            let rest = complement(&self.gates, &candidate);
            let Some(mcs) = self.mcs_within(&rest)? else {
                warn!("caivc: no correction set inside an unsafe complement");
                break;
            };
            self.mcs.block(&mcs);
            self.hitting.add_set(&mcs);
        }
        Ok(found)
    }
}
