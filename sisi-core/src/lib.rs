//! # sisi-core
//!
//! Shared foundations of the sisi proof minimizer and IVC extractor:
//!
//! - [`Lit`] / [`Var`]: literal identifiers with frame priming
//! - [`VarManager`]: identifier allocation and the external mapping
//! - [`Options`]: the typed option registry
//! - [`Statistics`]: per-subsystem call counts and timings
//! - [`Context`]: the handle carrying all three into every component
//! - [`aiger`] and [`proof_file`]: input readers

pub mod aiger;
pub mod clause;
pub mod context;
pub mod error;
pub mod literal;
pub mod options;
pub mod proof_file;
pub mod statistics;
pub mod vars;

pub use aiger::{Aig, AigReset};
pub use clause::{Clause, Cube};
pub use context::Context;
pub use error::{Result, SisiError};
pub use literal::{LBool, Lit, MAX_PRIMES, Var};
pub use options::{MapSolverKind, MaxSatAlgorithm, McsStrategy, Options};
pub use statistics::{Statistics, StatsSnapshot, Subsystem};
pub use vars::VarManager;
