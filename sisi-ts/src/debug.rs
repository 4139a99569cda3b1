//! Debug transition relations.
//!
//! Every debugged gate gets a *debug latch*: a latch that resets to 0 and
//! keeps its value forever. While it is 1 the gate's Tseitin clauses are
//! satisfied trivially, so the gate output behaves like a free input in
//! every frame. With all debug latches at their reset value the relation
//! behaves exactly like the original one.

use crate::transition::TransitionRelation;
use rustc_hash::FxHashMap;
use sisi_core::{LBool, Lit};
use tracing::debug;

/// A transition relation with per-gate debug latches.
#[derive(Debug, Clone)]
pub struct DebugTransitionRelation {
    tr: TransitionRelation,
    debug_latches: Vec<Lit>,
    gate_of: FxHashMap<Lit, Lit>,
    debug_of: FxHashMap<Lit, Lit>,
}

impl DebugTransitionRelation {
    /// Debug every gate of `tr`.
    pub fn new(tr: &TransitionRelation) -> Self {
        let gates = tr.gate_ids();
        Self::over_gates(tr, &gates)
    }

    /// Debug only the gates in `gates`; the others stay fixed.
    ///
    /// # Panics
    ///
    /// Panics if some element of `gates` is not a gate of `tr`.
    pub fn over_gates(tr: &TransitionRelation, gates: &[Lit]) -> Self {
        let vars = &tr.context().vars;
        let mut guards = FxHashMap::default();
        let mut debug_latches = Vec::with_capacity(gates.len());
        let mut gate_of = FxHashMap::default();
        for &gate in gates {
            assert!(tr.gate(gate).is_some(), "{gate} is not a gate");
            if guards.contains_key(&gate) {
                continue;
            }
            let d = vars.new_named(format!("dbg_{}", vars.render(gate))).pos();
            guards.insert(gate, d);
            gate_of.insert(d, gate);
            debug_latches.push(d);
        }
        debug!(debug_latches = debug_latches.len(), "debug transition relation built");
        Self {
            tr: tr.with_guards(&guards),
            debug_latches,
            gate_of,
            debug_of: guards,
        }
    }

    /// The augmented relation.
    pub fn relation(&self) -> &TransitionRelation {
        &self.tr
    }

    /// Let the debug latches start with any value. Callers bound them
    /// through initial-state restrictions.
    pub fn open_debug_latches(&mut self) {
        for &d in &self.debug_latches {
            self.tr.set_latch_reset(d, LBool::Undef);
        }
    }

    /// Debug latches in gate order.
    pub fn debug_latches(&self) -> &[Lit] {
        &self.debug_latches
    }

    /// Gate freed by debug latch `d`.
    pub fn gate_of(&self, d: Lit) -> Option<Lit> {
        self.gate_of.get(&d).copied()
    }

    /// Debug latch of gate `gate`.
    pub fn debug_of(&self, gate: Lit) -> Option<Lit> {
        self.debug_of.get(&gate).copied()
    }

    /// Gates named by a set of debug latches, sorted.
    pub fn gates_of(&self, debug_latches: &[Lit]) -> Vec<Lit> {
        let mut gates: Vec<Lit> = debug_latches.iter().filter_map(|&d| self.gate_of(d)).collect();
        gates.sort_unstable();
        gates
    }

    /// Debug latches of a set of gates; gates without one are skipped.
    pub fn debugs_of(&self, gates: &[Lit]) -> Vec<Lit> {
        gates.iter().filter_map(|&g| self.debug_of(g)).collect()
    }
}
