//! Correction-set enumeration.
//!
//! A correction set is a set of gates whose freeing breaks the property:
//! the model with those gates turned into free inputs is unsafe. Every
//! inductive validity core hits every correction set, and the minimal
//! cores are exactly the minimal hitting sets of the minimal correction
//! sets (MCSes).
//!
//! Exact finders run the IC3 debugger and sweep the cardinality bound
//! upwards, returning every solution of size `k` before moving to `k + 1`;
//! with earlier solutions blocked this makes each solution minimal. The
//! BMC-based finders only look at bounded runs and may return sets that
//! are not minimal; callers shrink them.

mod bmc;
mod mcs;

pub use bmc::{ApproximateMcsFinder, BmcCorrectionSetFinder};
pub use mcs::{BasicMcsFinder, McsFinder};

use sisi_core::{Lit, Result};

/// Enumeration interface shared by the correction-set finders.
pub trait CorrectionSetFinder {
    /// The next correction set, blocked from later answers, or `None`
    /// once the finder is exhausted.
    fn find_next(&mut self) -> Result<Option<Vec<Lit>>>;

    /// Exclude `gates` and its supersets from later answers.
    fn block(&mut self, gates: &[Lit]);
}
