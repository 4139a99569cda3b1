//! Optimization layer: partial MaxSAT and minimum hitting sets.
//!
//! Both MaxSAT algorithms share the [`MaxSat`] trait; [`new_maxsat`] picks
//! one from the `maxsat_solver` option.

pub mod hitting_set;
pub mod maxsat;
pub mod msu4;

pub use hitting_set::HittingSetFinder;
pub use maxsat::{LinearMaxSat, MaxSat, MaxSatStats, new_maxsat};
pub use msu4::Msu4MaxSat;
