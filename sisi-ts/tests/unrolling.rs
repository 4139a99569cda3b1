//! Semantics of unrolled relations on the 4-bit rotator.

use proptest::prelude::*;
use rustc_hash::FxHashSet;
use sisi_core::{Aig, Context, LBool, Lit};
use sisi_sat::SatSolver;
use sisi_ts::{DebugTransitionRelation, TransitionRelation};

const ROTATOR: &str = "aag 7 0 4 1 3\n2 8\n4 2\n6 4\n8 6\n14\n10 8 7\n12 5 2\n14 12 10\n";

fn rotator() -> TransitionRelation {
    let ctx = Context::with_defaults();
    let aig = Aig::parse(ROTATOR.as_bytes()).unwrap();
    TransitionRelation::from_aig(ctx, &aig, 0).unwrap()
}

fn solver_for(tr: &TransitionRelation, frames: u32) -> SatSolver {
    let mut solver = SatSolver::new(tr.context().clone());
    solver.add_clauses(tr.unroll(frames));
    solver
}

#[test]
fn rotation_moves_each_bit_forward() {
    let tr = rotator();
    let l = tr.latch_ids();
    let mut solver = solver_for(&tr, 3);
    // l0 alone at frame 0 reaches l2 at frame 2.
    let assumps = vec![l[0], !l[1], !l[2], !l[3]];
    assert!(solver.solve(&assumps).unwrap());
    let frame2: Vec<LBool> = l.iter().map(|x| solver.assignment(x.primed(2))).collect();
    assert_eq!(frame2, vec![LBool::False, LBool::False, LBool::True, LBool::False]);
}

#[test]
fn bad_is_the_decoded_pattern() {
    let tr = rotator();
    let l = tr.latch_ids();
    let mut solver = solver_for(&tr, 1);
    for mask in 0u32..16 {
        let state: Vec<Lit> = (0..4)
            .map(|i| if mask >> i & 1 == 1 { l[i] } else { !l[i] })
            .collect();
        let expected = mask == 0b1001;
        let mut assumps = state.clone();
        assumps.push(tr.bad());
        assert_eq!(solver.solve(&assumps).unwrap(), expected, "state {mask:04b}");
    }
}

#[test]
fn initial_state_of_zero_reset_never_reaches_bad() {
    let tr = rotator();
    let mut solver = solver_for(&tr, 6);
    solver.add_clauses(tr.init_state());
    for k in 0..6 {
        assert!(!solver.solve(&[tr.bad().primed(k)]).unwrap());
    }
}

#[test]
fn freed_gates_become_inputs() {
    let tr = rotator();
    let g = tr.gate_ids();
    let keep: FxHashSet<Lit> = [g[2]].into_iter().collect();
    let partial = tr.restrict_to_gates(&keep);
    let mut solver = solver_for(&partial, 1);
    solver.add_clauses(partial.init_state());
    // With g1 and g2 unconstrained the all-zero state is already bad.
    assert!(solver.solve(&[partial.bad()]).unwrap());
}

#[test]
fn debug_latch_frees_its_gate() {
    let tr = rotator();
    let g = tr.gate_ids();
    let mut dtr = DebugTransitionRelation::new(&tr);
    dtr.open_debug_latches();
    let rel = dtr.relation();
    let mut solver = solver_for(rel, 1);
    solver.add_clauses(
        tr.init_cube().into_iter().map(|lit| vec![lit]).collect::<Vec<_>>(),
    );
    let d_bad = dtr.debug_of(g[2]).unwrap();
    let others: Vec<Lit> = dtr
        .debug_latches()
        .iter()
        .map(|&d| if d == d_bad { d } else { !d })
        .collect();
    let mut assumps = others.clone();
    assumps.push(rel.bad());
    assert!(solver.solve(&assumps).unwrap());
    let none: Vec<Lit> = dtr.debug_latches().iter().map(|&d| !d).collect();
    let mut assumps = none;
    assumps.push(rel.bad());
    assert!(!solver.solve(&assumps).unwrap());
}

proptest! {
    #[test]
    fn unrolling_literals_unprime_to_frame_zero(frames in 1u32..6) {
        let tr = rotator();
        let base: FxHashSet<Lit> = tr.unroll(1).into_iter().flatten().map(|l| l.strip()).collect();
        for clause in tr.unroll(frames) {
            for lit in clause {
                prop_assert!(lit.nprimes() < frames);
                prop_assert!(base.contains(&lit.unprimed().strip()) || tr.is_latch(lit));
                prop_assert_eq!(lit.unprimed().primed(lit.nprimes()), lit);
            }
        }
    }
}
