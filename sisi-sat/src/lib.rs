//! # sisi-sat
//!
//! SAT-level building blocks of the sisi engine:
//!
//! - [`SatSolver`]: incremental solving with assumptions, failed-assumption
//!   cores and single-query clause groups, backed by `varisat`
//! - [`SimpSolver`]: unit propagation, subsumption and bounded variable
//!   elimination with frozen variables
//! - [`CardinalityConstraint`]: an incremental totalizer for `<= k` and
//!   `>= k` bounds

pub mod card;
pub mod simp;
pub mod solver;

pub use card::CardinalityConstraint;
pub use simp::{SimpConfig, SimpSolver, SimpStats};
pub use solver::SatSolver;
