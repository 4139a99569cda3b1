//! # sisi-engine
//!
//! Proof minimization and inductive validity core extraction on top of
//! the transition systems of `sisi-ts`:
//!
//! - [`ConsecutionChecker`], [`MinimalSupportFinder`] and
//!   [`CollapseFinder`]: relative induction, supports and collapse sets
//! - [`BmcSolver`], [`Ic3`] and [`Ic3Debugger`]: safety checking and
//!   cardinality-bounded debugging
//! - [`correction`]: correction-set enumeration over gates
//! - [`MisFinder`] and [`minimize`]: MSIS extraction from proofs
//! - [`ivc`]: MIVC extraction and checking

pub mod bmc;
pub mod clause_db;
pub mod collapse;
pub mod consecution;
pub mod correction;
pub mod ic3;
pub mod ivc;
pub mod minimize;
pub mod mis;
pub mod proof;
pub mod safety;
pub mod support;

pub use bmc::BmcSolver;
pub use clause_db::{ClauseDb, ClauseId, ClauseRecord};
pub use collapse::CollapseFinder;
pub use consecution::ConsecutionChecker;
pub use correction::{
    ApproximateMcsFinder, BasicMcsFinder, BmcCorrectionSetFinder, CorrectionSetFinder, McsFinder,
};
pub use ic3::{Ic3, Ic3Debugger, LEVEL_INF};
pub use ivc::{IvcChecker, IvcExtractor, IvcKind, IvcVerdict, new_extractor};
pub use minimize::{Minimizer, MinimizerKind, new_minimizer};
pub use mis::MisFinder;
pub use proof::{PROPERTY_ID, Proof};
pub use safety::{SafetyResult, Step, check_safety, gates_are_safe};
pub use support::MinimalSupportFinder;
