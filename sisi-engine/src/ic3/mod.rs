//! IC3 / property-directed reachability.
//!
//! Frames are delta-encoded: a lemma stored at level `i` belongs to every
//! frame `F_1..F_i`, and each level has an activation literal, so a query
//! against `F_i` assumes the activations of levels `i..=k` plus the one of
//! the converged level [`LEVEL_INF`]. Level 0 is the set of initial
//! states, guarded by its own activation literal together with any
//! initial-state restrictions. Lemmas are stored as the cubes they block.
//!
//! Blocking generalizes with the unsatisfiable core of the relative
//! induction query, then tries to drop literals until `ic3_mic_attempts`
//! attempts have failed, and pushes every new lemma as far forward as it
//! stays relatively inductive.

pub mod debugger;

use crate::safety::{SafetyResult, Step};
use rustc_hash::FxHashSet;
use sisi_core::clause::{canonical, negate, primed, subsumes};
use sisi_core::{Clause, Context, Cube, Lit, Result, Subsystem};
use sisi_sat::SatSolver;
use sisi_ts::TransitionRelation;
use std::cmp::Reverse;
use std::collections::BinaryHeap;
use std::rc::Rc;
use tracing::{debug, info, trace};

pub use debugger::Ic3Debugger;

/// Level of lemmas that hold in every frame.
pub const LEVEL_INF: usize = usize::MAX;

/// A state that must be shown unreachable, linked to the state it leads to.
#[derive(Debug, Clone)]
struct Obligation {
    cube: Cube,
    inputs: Cube,
    next: Option<usize>,
}

enum Consecution {
    /// The cube is unreachable from the frame; carries a core-reduced cube.
    Blocked(Cube),
    /// A predecessor state in the frame, with the inputs that lead on.
    Predecessor { state: Cube, inputs: Cube },
}

/// Incremental IC3 prover with initial-state restrictions.
#[derive(Debug)]
pub struct Ic3 {
    ctx: Rc<Context>,
    tr: Rc<TransitionRelation>,
    solver: SatSolver,
    latches: Vec<Lit>,
    init_act: Lit,
    inf_act: Lit,
    /// Activation literal per level; index 0 is unused
    acts: Vec<Lit>,
    /// Lemmas per level; index 0 is unused
    frames: Vec<Vec<Cube>>,
    inf: Vec<Cube>,
    restrictions: Vec<Clause>,
}

impl Ic3 {
    /// Create a prover for `tr`.
    pub fn new(tr: Rc<TransitionRelation>) -> Self {
        let ctx = Rc::clone(tr.context());
        let mut ic3 = Self {
            solver: SatSolver::new(Rc::clone(&ctx)),
            latches: tr.latch_ids(),
            init_act: Lit::TRUE,
            inf_act: Lit::TRUE,
            acts: Vec::new(),
            frames: Vec::new(),
            inf: Vec::new(),
            restrictions: Vec::new(),
            ctx,
            tr,
        };
        ic3.rebuild(Vec::new());
        ic3
    }

    /// The transition relation.
    pub fn relation(&self) -> &Rc<TransitionRelation> {
        &self.tr
    }

    /// Start over with a fresh SAT instance holding only `inf` as
    /// converged lemmas.
    fn rebuild(&mut self, inf: Vec<Cube>) {
        self.solver.reset();
        self.solver.add_clauses(self.tr.unroll(2));
        self.init_act = self.ctx.vars.new_lit();
        self.add_init_clauses();
        self.inf_act = self.ctx.vars.new_lit();
        self.acts = vec![Lit::TRUE];
        self.frames = vec![Vec::new()];
        self.inf = Vec::new();
        self.new_frame();
        for cube in inf {
            self.add_lemma(&cube, LEVEL_INF);
        }
    }

    fn add_init_clauses(&mut self) {
        let guard = self.init_act.negate();
        for lit in self.tr.init_cube() {
            self.solver.add_clause(&[lit, guard]);
        }
        for clause in &self.restrictions {
            let mut guarded = clause.clone();
            guarded.push(guard);
            self.solver.add_clause(&guarded);
        }
    }

    fn new_frame(&mut self) {
        self.acts.push(self.ctx.vars.new_lit());
        self.frames.push(Vec::new());
    }

    /// Index of the top frame.
    fn top(&self) -> usize {
        self.frames.len() - 1
    }

    /// Number of frames, the initial one included.
    pub fn num_frames(&self) -> usize {
        self.frames.len()
    }

    fn level_assumps(&self, level: usize) -> Vec<Lit> {
        if level == 0 {
            return vec![self.init_act];
        }
        let mut assumps: Vec<Lit> = self.acts[level.min(self.acts.len())..].to_vec();
        assumps.push(self.inf_act);
        assumps
    }

    fn values(&self, lits: &[Lit]) -> Cube {
        let mut cube: Cube = lits
            .iter()
            .filter_map(|&l| {
                let value = self.solver.safe_assignment(l);
                if value.is_true() {
                    Some(l)
                } else if value.is_false() {
                    Some(l.negate())
                } else {
                    None
                }
            })
            .collect();
        cube.sort_unstable();
        cube
    }

    fn intersects_init(&mut self, cube: &[Lit]) -> Result<bool> {
        let mut assumps = Vec::with_capacity(cube.len() + 1);
        assumps.push(self.init_act);
        assumps.extend_from_slice(cube);
        self.solver.solve(&assumps)
    }

    fn is_blocked(&mut self, cube: &[Lit], level: usize) -> Result<bool> {
        let mut assumps = self.level_assumps(level);
        assumps.extend_from_slice(cube);
        Ok(!self.solver.solve(&assumps)?)
    }

    /// Query `F_level & !cube & T & cube'`.
    fn relative_induction(&mut self, cube: &[Lit], level: usize) -> Result<Consecution> {
        let mut assumps = self.level_assumps(level);
        assumps.extend(cube.iter().map(|l| l.prime()));
        let group = self.solver.create_group();
        self.solver.add_group_clause(group, &negate(cube));
        if self.solver.group_solve(group, &assumps)? {
            let inputs = self.values(self.tr.inputs());
            let state = self.values(&self.latches);
            return Ok(Consecution::Predecessor { state, inputs });
        }
        let core: FxHashSet<Lit> = self.solver.core().iter().copied().collect();
        let mut reduced: Cube =
            cube.iter().copied().filter(|l| core.contains(&l.prime())).collect();
        if self.intersects_init(&reduced)? {
            for &lit in cube {
                if reduced.contains(&lit) {
                    continue;
                }
                reduced.push(lit);
                if !self.intersects_init(&reduced)? {
                    break;
                }
            }
            reduced.sort_unstable();
        }
        Ok(Consecution::Blocked(reduced))
    }

    /// Drop literals from a blocked cube while it stays blocked at `level`.
    fn generalize(&mut self, mut cube: Cube, level: usize) -> Result<Cube> {
        let attempts = self.ctx.options.ic3_mic_attempts;
        let mut failures = 0;
        let mut i = 0;
        while i < cube.len() && failures < attempts {
            let mut candidate = cube.clone();
            candidate.remove(i);
            if candidate.is_empty() || self.intersects_init(&candidate)? {
                failures += 1;
                i += 1;
                continue;
            }
            match self.relative_induction(&candidate, level - 1)? {
                Consecution::Blocked(reduced) => {
                    cube = reduced;
                    i = i.min(cube.len());
                }
                Consecution::Predecessor { .. } => {
                    failures += 1;
                    i += 1;
                }
            }
        }
        Ok(cube)
    }

    /// Highest level at which a cube blocked at `level` stays blocked.
    fn push_forward(&mut self, cube: &[Lit], level: usize) -> Result<usize> {
        let mut level = level;
        while level < self.top() {
            match self.relative_induction(cube, level)? {
                Consecution::Blocked(_) => level += 1,
                Consecution::Predecessor { .. } => break,
            }
        }
        Ok(level)
    }

    /// Record a lemma blocking `cube` at `level` ([`LEVEL_INF`] for
    /// lemmas that hold in every frame).
    pub fn add_lemma(&mut self, cube: &[Lit], level: usize) {
        let cube = canonical(cube);
        let mut clause = negate(&cube);
        if level == LEVEL_INF {
            clause.push(self.inf_act.negate());
            for frame in &mut self.frames {
                frame.retain(|other| !subsumes(&cube, other));
            }
            self.inf.retain(|other| !subsumes(&cube, other));
            self.inf.push(cube);
        } else {
            while self.top() < level {
                self.new_frame();
            }
            clause.push(self.acts[level].negate());
            for frame in &mut self.frames[1..=level] {
                frame.retain(|other| !subsumes(&cube, other));
            }
            self.frames[level].push(cube);
        }
        trace!(level, size = clause.len() - 1, "ic3 lemma");
        self.solver.add_clause(&clause);
    }

    /// Cubes blocked at exactly `level`.
    pub fn frame_cubes(&self, level: usize) -> &[Cube] {
        if level == LEVEL_INF {
            &self.inf
        } else {
            self.frames.get(level).map_or(&[], Vec::as_slice)
        }
    }

    /// Move lemmas forward; returns a level whose delta became empty.
    fn propagate(&mut self) -> Result<Option<usize>> {
        for level in 1..self.top() {
            for cube in self.frames[level].clone() {
                let mut assumps = self.level_assumps(level);
                assumps.extend(primed(&cube, 1));
                if self.solver.solve(&assumps)? {
                    continue;
                }
                if let Some(pos) = self.frames[level].iter().position(|c| *c == cube) {
                    self.frames[level].remove(pos);
                    self.add_lemma(&cube, level + 1);
                }
            }
            if self.frames[level].is_empty() {
                return Ok(Some(level));
            }
        }
        Ok(None)
    }

    /// `F_(level+1)` is inductive: make its lemmas permanent.
    fn converge(&mut self, level: usize) {
        let lemmas: Vec<Cube> =
            self.frames[level + 1..].iter_mut().flat_map(std::mem::take).collect();
        for cube in lemmas {
            self.add_lemma(&cube, LEVEL_INF);
        }
        info!(level, lemmas = self.inf.len(), "ic3 converged");
    }

    fn trace_from(obligations: &[Obligation], start: usize) -> Vec<Step> {
        let mut steps = Vec::new();
        let mut cursor = Some(start);
        while let Some(idx) = cursor {
            let ob = &obligations[idx];
            steps.push(Step {
                inputs: ob.inputs.clone(),
                state: ob.cube.clone(),
            });
            cursor = ob.next;
        }
        steps
    }

    /// Block the bad state `state` at the top frame, or return a trace
    /// from an initial state into it.
    fn block(&mut self, state: Cube, inputs: Cube) -> Result<Option<Vec<Step>>> {
        let mut obligations = vec![Obligation {
            cube: state,
            inputs,
            next: None,
        }];
        let mut queue = BinaryHeap::new();
        queue.push(Reverse((self.top(), 0usize)));
        while let Some(Reverse((level, idx))) = queue.pop() {
            if level == 0 {
                return Ok(Some(Self::trace_from(&obligations, idx)));
            }
            let cube = obligations[idx].cube.clone();
            if self.is_blocked(&cube, level)? {
                if level < self.top() {
                    queue.push(Reverse((level + 1, idx)));
                }
                continue;
            }
            match self.relative_induction(&cube, level - 1)? {
                Consecution::Predecessor { state, inputs } => {
                    obligations.push(Obligation {
                        cube: state,
                        inputs,
                        next: Some(idx),
                    });
                    let pred = obligations.len() - 1;
                    if level > 1 && self.intersects_init(&obligations[pred].cube)? {
                        return Ok(Some(Self::trace_from(&obligations, pred)));
                    }
                    queue.push(Reverse((level - 1, pred)));
                    queue.push(Reverse((level, idx)));
                }
                Consecution::Blocked(reduced) => {
                    let generalized = self.generalize(reduced, level)?;
                    let pushed = self.push_forward(&generalized, level)?;
                    self.add_lemma(&generalized, pushed);
                    if pushed < self.top() {
                        queue.push(Reverse((pushed + 1, idx)));
                    }
                }
            }
        }
        Ok(None)
    }

    /// A bad state in the top frame, with the inputs that make it bad.
    fn bad_state(&mut self) -> Result<Option<(Cube, Cube)>> {
        let mut assumps = self.level_assumps(self.top());
        assumps.push(self.tr.bad());
        if !self.solver.solve(&assumps)? {
            return Ok(None);
        }
        Ok(Some((self.values(&self.latches), self.values(self.tr.inputs()))))
    }

    /// The inductive strengthening: the property clause and every
    /// converged lemma.
    pub fn proof(&self) -> Vec<Clause> {
        let mut proof = vec![self.tr.property_clause()];
        proof.extend(self.inf.iter().map(|cube| negate(cube)));
        proof
    }

    /// Decide the property.
    pub fn prove(&mut self) -> Result<SafetyResult> {
        let ctx = Rc::clone(&self.ctx);
        let _timer = ctx.stats.timer(Subsystem::Ic3);

        if self.solver.solve(&[self.init_act, self.tr.bad()])? {
            let step = Step {
                inputs: self.values(self.tr.inputs()),
                state: self.values(&self.latches),
            };
            debug!("ic3: initial state is bad");
            return Ok(SafetyResult::Unsafe(vec![step]));
        }
        loop {
            while let Some((state, inputs)) = self.bad_state()? {
                if let Some(cex) = self.block(state, inputs)? {
                    debug!(length = cex.len(), "ic3: counterexample");
                    return Ok(SafetyResult::Unsafe(cex));
                }
            }
            if let Some(level) = self.propagate()? {
                self.converge(level);
                return Ok(SafetyResult::Safe(self.proof()));
            }
            self.new_frame();
            debug!(frames = self.num_frames(), "ic3: new frame");
        }
    }

    /// Assert `clause` (frame-0 literals) on the initial states. Existing
    /// lemmas stay valid.
    pub fn restrict_initial_states(&mut self, clause: &[Lit]) {
        let mut guarded = clause.to_vec();
        guarded.push(self.init_act.negate());
        self.solver.add_clause(&guarded);
        self.restrictions.push(clause.to_vec());
    }

    /// Drop every restriction. Callers follow up with
    /// [`Ic3::initial_states_expanded`] or
    /// [`Ic3::initial_states_restricted`].
    pub fn clear_restrictions(&mut self) {
        self.restrictions.clear();
        self.solver.add_clause(&[self.init_act.negate()]);
        self.init_act = self.ctx.vars.new_lit();
        self.add_init_clauses();
    }

    /// The initial states grew: keep only converged lemmas that still
    /// exclude every initial state and are inductive among themselves.
    pub fn initial_states_expanded(&mut self) -> Result<()> {
        let mut kept = Vec::new();
        for cube in std::mem::take(&mut self.inf) {
            if !self.intersects_init(&cube)? {
                kept.push(cube);
            }
        }
        let acts: Vec<Lit> = kept.iter().map(|_| self.ctx.vars.new_lit()).collect();
        for (cube, &act) in kept.iter().zip(&acts) {
            let mut clause = negate(cube);
            clause.push(act.negate());
            self.solver.add_clause(&clause);
        }
        let mut alive = vec![true; kept.len()];
        loop {
            let assumps: Vec<Lit> = acts
                .iter()
                .zip(&alive)
                .filter(|&(_, &a)| a)
                .map(|(&l, _)| l)
                .collect();
            let mut changed = false;
            for (i, cube) in kept.iter().enumerate() {
                if !alive[i] {
                    continue;
                }
                let mut query = assumps.clone();
                query.extend(primed(cube, 1));
                if self.solver.solve(&query)? {
                    alive[i] = false;
                    changed = true;
                }
            }
            if !changed {
                break;
            }
        }
        let inf: Vec<Cube> = kept
            .into_iter()
            .zip(alive)
            .filter(|&(_, a)| a)
            .map(|(c, _)| c)
            .collect();
        debug!(kept = inf.len(), "ic3: initial states expanded");
        self.rebuild(inf);
        Ok(())
    }

    /// The initial states shrank: every lemma stays valid.
    pub fn initial_states_restricted(&mut self) {
        trace!(frames = self.num_frames(), "ic3: initial states restricted");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sisi_core::{Aig, LBool};

    const ROTATOR: &str = "aag 7 0 4 1 3\n2 8\n4 2\n6 4\n8 6\n14\n10 8 7\n12 5 2\n14 12 10\n";

    fn rotator(resets: [LBool; 4]) -> Rc<TransitionRelation> {
        let ctx = Context::with_defaults();
        let aig = Aig::parse(ROTATOR.as_bytes()).unwrap();
        let mut tr = TransitionRelation::from_aig(ctx, &aig, 0).unwrap();
        for (id, reset) in tr.latch_ids().into_iter().zip(resets) {
            tr.set_latch_reset(id, reset);
        }
        Rc::new(tr)
    }

    fn is_inductive_and_safe(tr: &TransitionRelation, proof: &[Clause]) -> bool {
        let mut solver = SatSolver::new(Rc::clone(tr.context()));
        solver.add_clauses(tr.unroll(2));
        solver.add_clauses(proof);
        for clause in proof {
            let assumps: Vec<Lit> = clause.iter().map(|l| l.prime().negate()).collect();
            if solver.solve(&assumps).unwrap() {
                return false;
            }
        }
        let mut init = SatSolver::new(Rc::clone(tr.context()));
        init.add_clauses(tr.init_state());
        init.add_clauses(tr.unroll(1));
        proof.iter().all(|clause| {
            let assumps: Vec<Lit> = clause.iter().map(|l| l.negate()).collect();
            !init.solve(&assumps).unwrap()
        }) && !solver.solve(&[tr.bad()]).unwrap()
    }

    #[test]
    fn test_safe_rotator() {
        let tr = rotator([LBool::False; 4]);
        let mut ic3 = Ic3::new(Rc::clone(&tr));
        let result = ic3.prove().unwrap();
        assert!(result.is_safe());
        assert!(is_inductive_and_safe(&tr, result.proof()));
        // A second call reuses the converged lemmas.
        assert!(ic3.prove().unwrap().is_safe());
    }

    #[test]
    fn test_unsafe_after_two_steps() {
        use LBool::{False, True};
        let tr = rotator([False, True, True, False]);
        let l = tr.latch_ids();
        let mut ic3 = Ic3::new(Rc::clone(&tr));
        let result = ic3.prove().unwrap();
        let states: Vec<Cube> = result.cex().iter().map(|s| s.state.clone()).collect();
        let expected: Vec<Cube> = vec![
            canonical(&[!l[0], l[1], l[2], !l[3]]),
            canonical(&[!l[0], !l[1], l[2], l[3]]),
            canonical(&[l[0], !l[1], !l[2], l[3]]),
        ];
        assert_eq!(states, expected);
    }

    #[test]
    fn test_restrictions_and_expansion() {
        let tr = rotator([LBool::Undef; 4]);
        let l = tr.latch_ids();
        let mut ic3 = Ic3::new(Rc::clone(&tr));
        assert_eq!(ic3.prove().unwrap().cex().len(), 1);

        // Start from the all-zero state only.
        for &x in &l {
            ic3.restrict_initial_states(&[!x]);
        }
        ic3.initial_states_restricted();
        let safe = ic3.prove().unwrap();
        assert!(safe.is_safe());
        assert_eq!(safe.proof()[0], tr.property_clause());

        ic3.clear_restrictions();
        ic3.initial_states_expanded().unwrap();
        assert!(ic3.prove().unwrap().is_unsafe());
    }

    #[test]
    fn test_external_lemmas() {
        let tr = rotator([LBool::False; 4]);
        let l = tr.latch_ids();
        let mut ic3 = Ic3::new(Rc::clone(&tr));
        ic3.add_lemma(&[l[0]], 2);
        assert_eq!(ic3.num_frames(), 3);
        assert_eq!(ic3.frame_cubes(2), &[vec![l[0]]]);
        assert!(ic3.frame_cubes(7).is_empty());
    }
}
