//! Transition relations.
//!
//! A sequential circuit in CNF: latches with next-state functions and reset
//! values, primary inputs, two-input AND gates, constraints and a bad
//! literal. Literals at frame `n` are the frame-0 literals primed `n`
//! times. Every frame carries its own copy of the gates and constraints,
//! and consecutive frames are tied by `latch@(n+1) <-> next@n`.

use rustc_hash::{FxHashMap, FxHashSet};
use sisi_core::aiger::AigReset;
use sisi_core::clause::primed;
use sisi_core::{Aig, Clause, Context, Cube, LBool, Lit, Result, SisiError};
use std::rc::Rc;
use tracing::debug;

/// A state variable.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Latch {
    /// Positive, unprimed literal of the latch
    pub id: Lit,
    /// Next-state function at frame 0
    pub next: Lit,
    /// Reset value; `Undef` for uninitialized latches
    pub reset: LBool,
}

/// A two-input AND gate `lhs <-> rhs0 & rhs1`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Gate {
    /// Positive, unprimed output literal; also names the gate
    pub lhs: Lit,
    /// First operand
    pub rhs0: Lit,
    /// Second operand
    pub rhs1: Lit,
    /// Debug latch whose truth frees the output
    pub guard: Option<Lit>,
}

impl Gate {
    /// Tseitin clauses of the gate at frame `n`.
    pub fn clauses_at(&self, n: u32) -> [Clause; 3] {
        let (lhs, rhs0, rhs1) = (self.lhs.primed(n), self.rhs0.primed(n), self.rhs1.primed(n));
        let mut clauses = [
            vec![lhs.negate(), rhs0],
            vec![lhs.negate(), rhs1],
            vec![lhs, rhs0.negate(), rhs1.negate()],
        ];
        if let Some(guard) = self.guard {
            for clause in &mut clauses {
                clause.push(guard.primed(n));
            }
        }
        clauses
    }
}

/// CNF encoding of a sequential circuit.
#[derive(Debug, Clone)]
pub struct TransitionRelation {
    ctx: Rc<Context>,
    inputs: Vec<Lit>,
    latches: Vec<Latch>,
    latch_pos: FxHashMap<Lit, usize>,
    gates: Vec<Gate>,
    gate_pos: FxHashMap<Lit, usize>,
    constraints: Vec<Lit>,
    bad: Lit,
}

fn intern(ctx: &Context, ext_lit: u64, name: Option<&str>) -> Lit {
    let ext_var = ext_lit >> 1;
    if !ctx.vars.is_known_external(ext_var) {
        ctx.vars.new_external(ext_var, name);
    }
    ctx.vars.to_internal(ext_lit & !1).unwrap_or(Lit::FALSE)
}

fn translate(ctx: &Context, ext_lit: u64, what: &str) -> Result<Lit> {
    ctx.vars
        .to_internal(ext_lit)
        .ok_or_else(|| {
            SisiError::format(0, format!("{what} refers to undefined literal {ext_lit}"))
        })
}

impl TransitionRelation {
    /// Build a relation from its parts.
    ///
    /// # Panics
    ///
    /// Panics if a latch id or gate output is negated or primed, or if a
    /// latch or gate is defined twice.
    pub fn new(
        ctx: Rc<Context>,
        inputs: Vec<Lit>,
        latches: Vec<Latch>,
        gates: Vec<Gate>,
        constraints: Vec<Lit>,
        bad: Lit,
    ) -> Self {
        let mut latch_pos = FxHashMap::default();
        for (i, latch) in latches.iter().enumerate() {
            assert!(
                latch.id.is_positive() && latch.id.nprimes() == 0 && !latch.id.is_constant(),
                "latch id {} must be a positive unprimed variable",
                latch.id
            );
            let previous = latch_pos.insert(latch.id, i);
            assert!(previous.is_none(), "latch {} defined twice", latch.id);
        }
        let mut gate_pos = FxHashMap::default();
        for (i, gate) in gates.iter().enumerate() {
            assert!(
                gate.lhs.is_positive() && gate.lhs.nprimes() == 0 && !gate.lhs.is_constant(),
                "gate output {} must be a positive unprimed variable",
                gate.lhs
            );
            let previous = gate_pos.insert(gate.lhs, i);
            assert!(previous.is_none(), "gate {} defined twice", gate.lhs);
        }
        Self {
            ctx,
            inputs,
            latches,
            latch_pos,
            gates,
            gate_pos,
            constraints,
            bad,
        }
    }

    /// Build the relation of `aig` for the property at `property_index`.
    ///
    /// External variables are registered with the context's variable
    /// manager on first use, so several relations built from the same
    /// circuit share their literals.
    pub fn from_aig(ctx: Rc<Context>, aig: &Aig, property_index: usize) -> Result<Self> {
        let bad_ext = aig.bad_literal(property_index).ok_or_else(|| {
            SisiError::config(format!(
                "property {property_index} out of range ({} available)",
                aig.num_properties()
            ))
        })?;

        let inputs: Vec<Lit> = aig
            .inputs
            .iter()
            .enumerate()
            .map(|(k, input)| {
                let name = input.name.clone().unwrap_or_else(|| format!("i{k}"));
                intern(&ctx, input.lit, Some(&name))
            })
            .collect();
        let latch_ids: Vec<Lit> = aig
            .latches
            .iter()
            .enumerate()
            .map(|(k, latch)| {
                let name = latch.name.clone().unwrap_or_else(|| format!("l{k}"));
                intern(&ctx, latch.lit, Some(&name))
            })
            .collect();
        let gate_ids: Vec<Lit> = aig.ands.iter().map(|and| intern(&ctx, and.lhs, None)).collect();

        let mut latches = Vec::with_capacity(aig.latches.len());
        for (latch, &id) in aig.latches.iter().zip(&latch_ids) {
            latches.push(Latch {
                id,
                next: translate(&ctx, latch.next, "latch next state")?,
                reset: match latch.reset {
                    AigReset::Zero => LBool::False,
                    AigReset::One => LBool::True,
                    AigReset::Uninit => LBool::Undef,
                },
            });
        }
        let mut gates = Vec::with_capacity(aig.ands.len());
        for (and, &lhs) in aig.ands.iter().zip(&gate_ids) {
            gates.push(Gate {
                lhs,
                rhs0: translate(&ctx, and.rhs0, "AND gate")?,
                rhs1: translate(&ctx, and.rhs1, "AND gate")?,
                guard: None,
            });
        }
        let constraints = aig
            .constraints
            .iter()
            .map(|c| translate(&ctx, c.lit, "constraint"))
            .collect::<Result<Vec<_>>>()?;
        let bad = translate(&ctx, bad_ext, "property")?;

        debug!(
            inputs = inputs.len(),
            latches = latches.len(),
            gates = gates.len(),
            constraints = constraints.len(),
            property_index,
            "transition relation built"
        );
        Ok(Self::new(ctx, inputs, latches, gates, constraints, bad))
    }

    /// Shared context.
    pub fn context(&self) -> &Rc<Context> {
        &self.ctx
    }

    /// Primary inputs, freed gate outputs included.
    pub fn inputs(&self) -> &[Lit] {
        &self.inputs
    }

    /// Latches in definition order.
    pub fn latches(&self) -> &[Latch] {
        &self.latches
    }

    /// Latch ids in definition order.
    pub fn latch_ids(&self) -> Vec<Lit> {
        self.latches.iter().map(|l| l.id).collect()
    }

    /// Latch with id `id`.
    pub fn latch(&self, id: Lit) -> Option<&Latch> {
        self.latch_pos.get(&id).map(|&i| &self.latches[i])
    }

    /// Whether `lit` is a (possibly negated or primed) latch literal.
    pub fn is_latch(&self, lit: Lit) -> bool {
        self.latch_pos.contains_key(&lit.unprimed().strip())
    }

    /// AND gates in definition order.
    pub fn gates(&self) -> &[Gate] {
        &self.gates
    }

    /// Gate with output `lhs`.
    pub fn gate(&self, lhs: Lit) -> Option<&Gate> {
        self.gate_pos.get(&lhs).map(|&i| &self.gates[i])
    }

    /// Gate outputs in definition order.
    pub fn gate_ids(&self) -> Vec<Lit> {
        self.gates.iter().map(|g| g.lhs).collect()
    }

    /// Literals that must hold in every frame.
    pub fn constraints(&self) -> &[Lit] {
        &self.constraints
    }

    /// Literal whose truth is the property violation.
    pub fn bad(&self) -> Lit {
        self.bad
    }

    /// The property clause `!bad`.
    pub fn property_clause(&self) -> Clause {
        vec![self.bad.negate()]
    }

    /// Change the reset value of a latch.
    ///
    /// # Panics
    ///
    /// Panics if `id` is not a latch.
    pub fn set_latch_reset(&mut self, id: Lit, reset: LBool) {
        let Some(&i) = self.latch_pos.get(&id) else {
            panic!("{id} is not a latch");
        };
        self.latches[i].reset = reset;
    }

    /// Reset literals of the initialized latches.
    pub fn init_cube(&self) -> Cube {
        self.latches
            .iter()
            .filter_map(|l| match l.reset {
                LBool::True => Some(l.id),
                LBool::False => Some(l.id.negate()),
                LBool::Undef => None,
            })
            .collect()
    }

    /// Initial states as unit clauses at frame 0.
    pub fn init_state(&self) -> Vec<Clause> {
        self.init_cube().into_iter().map(|l| vec![l]).collect()
    }

    /// Gate and constraint clauses at frame `n`.
    pub fn frame_clauses(&self, n: u32) -> Vec<Clause> {
        let mut clauses = Vec::with_capacity(3 * self.gates.len() + self.constraints.len());
        for gate in &self.gates {
            clauses.extend(gate.clauses_at(n));
        }
        clauses.extend(self.constraints.iter().map(|c| vec![c.primed(n)]));
        clauses
    }

    /// Clauses tying frame `n + 1` to frame `n`: `latch@(n+1) <-> next@n`.
    pub fn transition_clauses(&self, n: u32) -> Vec<Clause> {
        let mut clauses = Vec::with_capacity(2 * self.latches.len());
        for latch in &self.latches {
            let current = latch.id.primed(n + 1);
            let next = latch.next.primed(n);
            clauses.push(vec![current.negate(), next]);
            clauses.push(vec![current, next.negate()]);
        }
        clauses
    }

    /// Frame `n` plus the step into frame `n + 1`.
    pub fn unroll_frame(&self, n: u32) -> Vec<Clause> {
        let mut clauses = self.frame_clauses(n);
        clauses.extend(self.transition_clauses(n));
        clauses
    }

    /// `frames` frames (at least one) and the steps between them.
    pub fn unroll(&self, frames: u32) -> Vec<Clause> {
        assert!(frames > 0, "an unrolling needs at least one frame");
        let mut clauses = Vec::new();
        for n in 0..frames - 1 {
            clauses.extend(self.unroll_frame(n));
        }
        clauses.extend(self.frame_clauses(frames - 1));
        clauses
    }

    /// The literals of a clause shifted to frame `n`.
    pub fn clause_at(clause: &[Lit], n: u32) -> Clause {
        primed(clause, n)
    }

    /// The relation keeping only the gates in `keep`. Every other gate
    /// output becomes a primary input.
    pub fn restrict_to_gates(&self, keep: &FxHashSet<Lit>) -> Self {
        let mut inputs = self.inputs.clone();
        let mut gates = Vec::with_capacity(keep.len());
        for gate in &self.gates {
            if keep.contains(&gate.lhs) {
                gates.push(*gate);
            } else {
                inputs.push(gate.lhs);
            }
        }
        debug!(
            kept = gates.len(),
            freed = self.gates.len() - gates.len(),
            "restricted transition relation"
        );
        Self::new(
            Rc::clone(&self.ctx),
            inputs,
            self.latches.clone(),
            gates,
            self.constraints.clone(),
            self.bad,
        )
    }

    /// Attach debug latches: `guards[lhs]` frees gate `lhs`, and each guard
    /// becomes a latch that resets to 0 and never changes.
    pub(crate) fn with_guards(&self, guards: &FxHashMap<Lit, Lit>) -> Self {
        let mut latches = self.latches.clone();
        let mut gates = self.gates.clone();
        for gate in &mut gates {
            if let Some(&guard) = guards.get(&gate.lhs) {
                gate.guard = Some(guard);
                latches.push(Latch {
                    id: guard,
                    next: guard,
                    reset: LBool::False,
                });
            }
        }
        Self::new(
            Rc::clone(&self.ctx),
            self.inputs.clone(),
            latches,
            gates,
            self.constraints.clone(),
            self.bad,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ROTATOR: &str = "aag 7 0 4 1 3\n2 8\n4 2\n6 4\n8 6\n14\n10 8 7\n12 5 2\n14 12 10\n";

    fn rotator() -> TransitionRelation {
        let ctx = Context::with_defaults();
        let aig = Aig::parse(ROTATOR.as_bytes()).unwrap();
        TransitionRelation::from_aig(ctx, &aig, 0).unwrap()
    }

    #[test]
    fn test_from_aig_shape() {
        let tr = rotator();
        assert!(tr.inputs().is_empty());
        assert_eq!(tr.latches().len(), 4);
        assert_eq!(tr.gates().len(), 3);
        let vars = &tr.context().vars;
        let l: Vec<Lit> = (1..=4).map(|v| vars.to_internal(2 * v).unwrap()).collect();
        assert_eq!(tr.latch_ids(), l);
        // l0' = l3, l1' = l0, ...
        assert_eq!(tr.latch(l[0]).unwrap().next, l[3]);
        assert_eq!(tr.latch(l[1]).unwrap().next, l[0]);
        assert!(tr.latches().iter().all(|x| x.reset == LBool::False));
        assert_eq!(tr.bad(), vars.to_internal(14).unwrap());
        assert_eq!(tr.property_clause(), vec![!tr.bad()]);
        assert_eq!(vars.name_of(l[2].var()).as_deref(), Some("l2"));
    }

    #[test]
    fn test_relations_share_literals() {
        let tr = rotator();
        let aig = Aig::parse(ROTATOR.as_bytes()).unwrap();
        let again = TransitionRelation::from_aig(Rc::clone(tr.context()), &aig, 0).unwrap();
        assert_eq!(tr.latch_ids(), again.latch_ids());
        assert_eq!(tr.gate_ids(), again.gate_ids());
    }

    #[test]
    fn test_property_out_of_range() {
        let ctx = Context::with_defaults();
        let aig = Aig::parse(ROTATOR.as_bytes()).unwrap();
        assert!(matches!(
            TransitionRelation::from_aig(ctx, &aig, 1),
            Err(SisiError::Config(_))
        ));
    }

    #[test]
    fn test_init_state_follows_resets() {
        let mut tr = rotator();
        let l = tr.latch_ids();
        tr.set_latch_reset(l[0], LBool::True);
        tr.set_latch_reset(l[2], LBool::Undef);
        assert_eq!(tr.init_cube(), vec![l[0], !l[1], !l[3]]);
        assert_eq!(tr.init_state().len(), 3);
    }

    #[test]
    #[should_panic(expected = "is not a latch")]
    fn test_set_reset_on_gate_panics() {
        let mut tr = rotator();
        let g = tr.gate_ids()[0];
        tr.set_latch_reset(g, LBool::True);
    }

    #[test]
    fn test_unroll_clause_counts() {
        let tr = rotator();
        assert_eq!(tr.frame_clauses(0).len(), 9);
        assert_eq!(tr.transition_clauses(0).len(), 8);
        assert_eq!(tr.unroll(1).len(), 9);
        assert_eq!(tr.unroll(3).len(), 3 * 9 + 2 * 8);
        for clause in tr.unroll(3) {
            assert!(clause.iter().all(|l| l.nprimes() <= 2));
        }
    }

    #[test]
    fn test_transition_ties_consecutive_frames() {
        let tr = rotator();
        let l = tr.latch_ids();
        let step = tr.transition_clauses(1);
        // l1@2 <-> l0@1
        assert!(step.contains(&vec![!l[1].primed(2), l[0].primed(1)]));
        assert!(step.contains(&vec![l[1].primed(2), !l[0].primed(1)]));
    }

    #[test]
    fn test_restrict_frees_gates() {
        let tr = rotator();
        let g = tr.gate_ids();
        let keep: FxHashSet<Lit> = [g[2]].into_iter().collect();
        let partial = tr.restrict_to_gates(&keep);
        assert_eq!(partial.gate_ids(), vec![g[2]]);
        assert_eq!(partial.inputs(), &[g[0], g[1]]);
        assert_eq!(partial.bad(), tr.bad());
        assert_eq!(partial.frame_clauses(0).len(), 3);
    }

    #[test]
    fn test_guarded_gate_clauses() {
        let tr = rotator();
        let gate = tr.gates()[0];
        let d = tr.context().vars.new_lit();
        let guarded = Gate { guard: Some(d), ..gate };
        for (plain, with_guard) in gate.clauses_at(1).iter().zip(guarded.clauses_at(1)) {
            assert_eq!(with_guard.len(), plain.len() + 1);
            assert_eq!(with_guard.last(), Some(&d.prime()));
        }
    }
}
