//! End-to-end scenarios on the 4-bit rotator.
//!
//! Latches `l0..l3` rotate (`l0' = l3`, `l(i)' = l(i-1)`) and the property
//! fails in the state `l0 & !l1 & !l2 & l3`.

use sisi_core::clause::canonical;
use sisi_core::{Aig, Clause, Context, Cube, LBool, Lit};
use sisi_engine::{
    BmcSolver, CollapseFinder, ConsecutionChecker, Ic3, MisFinder, PROPERTY_ID, SafetyResult,
    check_safety,
};
use sisi_ts::TransitionRelation;
use std::rc::Rc;

const ROTATOR: &str = "aag 7 0 4 1 3\n2 8\n4 2\n6 4\n8 6\n14\n10 8 7\n12 5 2\n14 12 10\n";

fn rotator(resets: [LBool; 4]) -> Rc<TransitionRelation> {
    let aig = Aig::parse(ROTATOR.as_bytes()).unwrap();
    let mut tr = TransitionRelation::from_aig(Context::with_defaults(), &aig, 0).unwrap();
    for (id, reset) in tr.latch_ids().into_iter().zip(resets) {
        tr.set_latch_reset(id, reset);
    }
    Rc::new(tr)
}

fn states(result: &SafetyResult) -> Vec<Cube> {
    result.cex().iter().map(|step| canonical(&step.state)).collect()
}

fn two_step_trace(l: &[Lit]) -> Vec<Cube> {
    vec![
        canonical(&[!l[0], l[1], l[2], !l[3]]),
        canonical(&[!l[0], !l[1], l[2], l[3]]),
        canonical(&[l[0], !l[1], !l[2], l[3]]),
    ]
}

#[test]
fn scenario_safe_from_zero() {
    let tr = rotator([LBool::False; 4]);
    let mut bmc = BmcSolver::new(Rc::clone(&tr));
    let result = bmc.solve(20, &[]).unwrap();
    assert_eq!(result, SafetyResult::Unknown);
    assert!(result.cex().is_empty());
    assert!(check_safety(&tr).unwrap().is_safe());
}

#[test]
fn scenario_trivially_unsafe() {
    use LBool::{False, True};
    let tr = rotator([True, False, False, True]);
    let l = tr.latch_ids();
    let mut bmc = BmcSolver::new(Rc::clone(&tr));
    let result = bmc.solve(1, &[]).unwrap();
    assert_eq!(states(&result), vec![canonical(&[l[0], !l[1], !l[2], l[3]])]);
    assert_eq!(states(&Ic3::new(tr).prove().unwrap()).len(), 1);
}

#[test]
fn scenario_unsafe_after_two_cycles() {
    use LBool::{False, True};
    let tr = rotator([False, True, True, False]);
    let l = tr.latch_ids();
    let mut bmc = BmcSolver::new(Rc::clone(&tr));
    assert_eq!(bmc.solve(1, &[]).unwrap(), SafetyResult::Unknown);
    let result = bmc.solve(2, &[]).unwrap();
    assert_eq!(states(&result), two_step_trace(&l));
    assert_eq!(states(&Ic3::new(Rc::clone(&tr)).prove().unwrap()), two_step_trace(&l));
}

#[test]
fn scenario_initial_state_restriction() {
    let tr = rotator([LBool::Undef; 4]);
    let l = tr.latch_ids();
    let mut bmc = BmcSolver::new(Rc::clone(&tr));
    assert!(bmc.solve(0, &[]).unwrap().is_unsafe());
    // Restrict on top of the existing unrolling.
    let restrictions: Vec<Clause> = vec![vec![!l[0]], vec![l[1]], vec![l[2]], vec![!l[3]]];
    bmc.restrict_initial_states(&restrictions);
    assert_eq!(bmc.restrictions().len(), 4);
    assert_eq!(bmc.solve(1, &[]).unwrap(), SafetyResult::Unknown);
    let result = bmc.solve(2, &[]).unwrap();
    assert_eq!(states(&result), two_step_trace(&l));
    bmc.clear_restrictions();
    assert!(bmc.restrictions().is_empty());
    assert!(bmc.solve(0, &[]).unwrap().is_unsafe());
}

#[test]
fn scenario_collapse_sets_follow_the_rotation() {
    let tr = rotator([LBool::False; 4]);
    let clauses: Vec<Clause> = tr.latch_ids().iter().map(|&x| vec![!x]).collect();
    let mut finder = CollapseFinder::with_clauses(Rc::clone(&tr), &clauses);
    for (id, expected) in [(0, 3), (1, 0), (2, 1), (3, 2)] {
        assert_eq!(finder.find_collapse(id).unwrap(), Some(vec![expected]), "clause {id}");
    }
}

/// The property clause, the six "at most one bit" clauses, then two
/// clauses that rotation breaks.
fn one_hot_proof(tr: &TransitionRelation) -> Vec<Clause> {
    let l = tr.latch_ids();
    let mut proof = vec![tr.property_clause()];
    for i in 0..4 {
        for j in i + 1..4 {
            proof.push(vec![!l[i], !l[j]]);
        }
    }
    proof.push(vec![l[0], l[1]]);
    proof.push(vec![l[1], l[2]]);
    proof
}

#[test]
fn scenario_safe_mis_drops_the_broken_clauses() {
    let tr = rotator([LBool::False; 4]);
    let proof = one_hot_proof(&tr);
    let mut checker = ConsecutionChecker::with_clauses(Rc::clone(&tr), &proof);
    let all: Vec<usize> = (0..proof.len()).collect();
    let mis = MisFinder::new(&mut checker).find_mis(&all, &[PROPERTY_ID]).unwrap();
    assert_eq!(mis, Some((0..7).collect::<Vec<_>>()));
    assert!(checker.is_inductive(&(0..7).collect::<Vec<_>>()).unwrap());
}
