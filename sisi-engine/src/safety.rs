//! Safety verdicts shared by BMC and IC3, and the hybrid safety check.

use crate::bmc::BmcSolver;
use crate::ic3::Ic3;
use serde::Serialize;
use sisi_core::{Clause, Cube, Lit, Result, SisiError, Subsystem};
use sisi_ts::TransitionRelation;
use std::rc::Rc;
use tracing::debug;

/// One step of a counterexample: the inputs applied in a state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Step {
    /// Input values at this step, as frame-0 literals
    pub inputs: Cube,
    /// Latch values at this step, as frame-0 literals
    pub state: Cube,
}

/// Outcome of a safety query.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SafetyResult {
    /// The property holds; carries an inductive strengthening
    Safe(Vec<Clause>),
    /// The property fails; carries a counterexample trace
    Unsafe(Vec<Step>),
    /// No verdict within the given bounds
    Unknown,
}

impl SafetyResult {
    /// Whether the verdict is [`SafetyResult::Safe`].
    pub fn is_safe(&self) -> bool {
        matches!(self, SafetyResult::Safe(_))
    }

    /// Whether the verdict is [`SafetyResult::Unsafe`].
    pub fn is_unsafe(&self) -> bool {
        matches!(self, SafetyResult::Unsafe(_))
    }

    /// The counterexample of an unsafe verdict; empty otherwise.
    pub fn cex(&self) -> &[Step] {
        match self {
            SafetyResult::Unsafe(steps) => steps,
            _ => &[],
        }
    }

    /// The proof of a safe verdict; empty otherwise.
    pub fn proof(&self) -> &[Clause] {
        match self {
            SafetyResult::Safe(proof) => proof,
            _ => &[],
        }
    }
}

/// Decide safety of `tr`: BMC up to `hybrid_ic3_bmc_kmax` first (skipped
/// when 0), then IC3.
pub fn check_safety(tr: &Rc<TransitionRelation>) -> Result<SafetyResult> {
    let ctx = Rc::clone(tr.context());
    let _timer = ctx.stats.timer(Subsystem::Safety);
    let kmax = u32::try_from(ctx.options.hybrid_ic3_bmc_kmax).map_err(|_| {
        SisiError::config(format!(
            "hybrid_ic3_bmc_kmax {} exceeds the deepest unrolling",
            ctx.options.hybrid_ic3_bmc_kmax
        ))
    })?;
    if kmax > 0 {
        let mut bmc = BmcSolver::new(Rc::clone(tr));
        let result = bmc.solve(kmax, &[])?;
        if result.is_unsafe() {
            debug!(depth = result.cex().len(), "safety check: BMC counterexample");
            return Ok(result);
        }
    }
    let mut ic3 = Ic3::new(Rc::clone(tr));
    let result = ic3.prove()?;
    debug!(safe = result.is_safe(), "safety check: IC3 verdict");
    Ok(result)
}

/// Whether the model keeping only `gates` is safe.
pub fn gates_are_safe(tr: &TransitionRelation, gates: &[Lit]) -> Result<bool> {
    let keep = gates.iter().copied().collect();
    let partial = Rc::new(tr.restrict_to_gates(&keep));
    Ok(check_safety(&partial)?.is_safe())
}

#[cfg(test)]
mod tests {
    use super::*;
    use sisi_core::{Aig, Context, LBool, Options};

    const ROTATOR: &str = "aag 7 0 4 1 3\n2 8\n4 2\n6 4\n8 6\n14\n10 8 7\n12 5 2\n14 12 10\n";

    fn rotator(options: Options, resets: [LBool; 4]) -> Rc<TransitionRelation> {
        let aig = Aig::parse(ROTATOR.as_bytes()).unwrap();
        let mut tr = TransitionRelation::from_aig(Context::new(options), &aig, 0).unwrap();
        for (id, reset) in tr.latch_ids().into_iter().zip(resets) {
            tr.set_latch_reset(id, reset);
        }
        Rc::new(tr)
    }

    #[test]
    fn test_bmc_before_ic3() {
        use LBool::{False, True};
        let options = Options {
            hybrid_ic3_bmc_kmax: 3,
            ..Options::default()
        };
        let result = check_safety(&rotator(options, [False, True, True, False])).unwrap();
        assert_eq!(result.cex().len(), 3);
        assert!(check_safety(&rotator(Options::default(), [False; 4])).unwrap().is_safe());
    }

    #[cfg(target_pointer_width = "64")]
    #[test]
    fn test_oversized_bmc_depth_is_a_config_error() {
        let options = Options {
            hybrid_ic3_bmc_kmax: u32::MAX as usize + 1,
            ..Options::default()
        };
        let result = check_safety(&rotator(options, [LBool::False; 4]));
        assert!(matches!(result, Err(SisiError::Config(_))));
    }
}
