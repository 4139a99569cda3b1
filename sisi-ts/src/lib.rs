//! # sisi-ts
//!
//! Transition systems for the sisi engine:
//!
//! - [`TransitionRelation`]: CNF encoding of an AIGER circuit with frame
//!   unrolling, initial states, the property clause and gate-restricted
//!   (partial) relations
//! - [`DebugTransitionRelation`]: the same relation with a debug latch per
//!   gate that frees the gate when asserted

pub mod debug;
pub mod transition;

pub use debug::DebugTransitionRelation;
pub use transition::{Gate, Latch, TransitionRelation};
