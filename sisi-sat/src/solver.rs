//! Incremental SAT adaptor over `varisat`.
//!
//! Translates sisi literals to solver literals on demand, solves under
//! assumptions, keeps a copy of the last model and failed-assumption core,
//! and layers *groups* (activation-guarded clause sets that live for a
//! single query) on top.
//!
//! The model stays valid until the next mutation. Querying it afterwards
//! through [`SatSolver::assignment`] is a contract violation; the `safe_*`
//! accessors return [`LBool::Undef`] instead.

use rustc_hash::{FxHashMap, FxHashSet};
use sisi_core::{Context, LBool, Lit, Result, SisiError, Subsystem, Var};
use std::rc::Rc;
use tracing::trace;
use varisat::ExtendFormula;

/// Incremental SAT solver with assumptions, cores and groups.
pub struct SatSolver {
    ctx: Rc<Context>,
    solver: varisat::Solver<'static>,
    to_solver: FxHashMap<Var, varisat::Var>,
    from_solver: Vec<Var>,
    model: Option<Vec<bool>>,
    core: Vec<Lit>,
    committed: FxHashSet<Lit>,
    num_clauses: usize,
}

impl std::fmt::Debug for SatSolver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SatSolver")
            .field("vars", &self.from_solver.len())
            .field("clauses", &self.num_clauses)
            .field("has_model", &self.model.is_some())
            .finish()
    }
}

impl SatSolver {
    /// Create an empty solver. The constant literal is fixed right away.
    pub fn new(ctx: Rc<Context>) -> Self {
        let mut solver = Self {
            ctx,
            solver: varisat::Solver::new(),
            to_solver: FxHashMap::default(),
            from_solver: Vec::new(),
            model: None,
            core: Vec::new(),
            committed: FxHashSet::default(),
            num_clauses: 0,
        };
        solver.push_clause(&[Lit::TRUE]);
        solver
    }

    /// Shared context.
    pub fn context(&self) -> &Rc<Context> {
        &self.ctx
    }

    /// Drop every clause and start from an empty instance.
    pub fn reset(&mut self) {
        self.solver = varisat::Solver::new();
        self.to_solver.clear();
        self.from_solver.clear();
        self.model = None;
        self.core.clear();
        self.committed.clear();
        self.num_clauses = 0;
        self.push_clause(&[Lit::TRUE]);
    }

    fn solver_lit(&mut self, lit: Lit) -> varisat::Lit {
        let var = lit.var();
        let svar = match self.to_solver.get(&var) {
            Some(&v) => v,
            None => {
                let v = self.solver.new_var();
                self.to_solver.insert(var, v);
                debug_assert_eq!(v.index(), self.from_solver.len());
                self.from_solver.push(var);
                v
            }
        };
        varisat::Lit::from_var(svar, lit.is_positive())
    }

    fn sisi_lit(&self, lit: varisat::Lit) -> Lit {
        self.from_solver[lit.var().index()].lit(lit.is_positive())
    }

    /// Add a clause without touching the model.
    fn push_clause(&mut self, clause: &[Lit]) {
        let lits: Vec<varisat::Lit> = clause.iter().map(|&l| self.solver_lit(l)).collect();
        self.solver.add_clause(&lits);
        self.num_clauses += 1;
    }

    /// Add a clause.
    pub fn add_clause(&mut self, clause: &[Lit]) {
        self.model = None;
        self.push_clause(clause);
    }

    /// Add several clauses.
    pub fn add_clauses<C: AsRef<[Lit]>>(&mut self, clauses: impl IntoIterator<Item = C>) {
        for clause in clauses {
            self.add_clause(clause.as_ref());
        }
    }

    /// Number of clauses added since creation or the last reset.
    pub fn num_clauses(&self) -> usize {
        self.num_clauses
    }

    /// Whether `var` has been mentioned in a clause or an assumption.
    pub fn knows(&self, var: Var) -> bool {
        self.to_solver.contains_key(&var)
    }

    /// Solve under assumptions. Returns `true` if satisfiable.
    pub fn solve(&mut self, assumps: &[Lit]) -> Result<bool> {
        let ctx = Rc::clone(&self.ctx);
        let _timer = ctx.stats.timer(Subsystem::Sat);
        self.model = None;
        self.core.clear();
        let lits: Vec<varisat::Lit> = assumps.iter().map(|&l| self.solver_lit(l)).collect();
        self.solver.assume(&lits);
        let sat = self
            .solver
            .solve()
            .map_err(|e| SisiError::Solver(format!("{e:?}")))?;
        if sat {
            let model = self
                .solver
                .model()
                .ok_or_else(|| SisiError::Solver("satisfiable without a model".into()))?;
            let mut values = vec![false; self.from_solver.len()];
            for lit in model {
                if let Some(slot) = values.get_mut(lit.var().index()) {
                    *slot = lit.is_positive();
                }
            }
            self.model = Some(values);
        } else if let Some(core) = self.solver.failed_core() {
            let core: Vec<Lit> = core.iter().map(|&l| self.sisi_lit(l)).collect();
            self.core = core;
        }
        trace!(assumptions = assumps.len(), sat, "sat query");
        Ok(sat)
    }

    /// Assumptions responsible for the last unsatisfiable answer.
    pub fn core(&self) -> &[Lit] {
        &self.core
    }

    /// Whether a model from the last satisfiable call is available.
    pub fn has_model(&self) -> bool {
        self.model.is_some()
    }

    /// Value of `lit` in the current model.
    ///
    /// # Panics
    ///
    /// Panics if there is no valid model (no satisfiable call since the
    /// last mutation).
    pub fn assignment(&self, lit: Lit) -> LBool {
        assert!(
            self.model.is_some(),
            "model queried after a mutation or an unsatisfiable call"
        );
        self.safe_assignment(lit)
    }

    /// Value of `lit`, or `Undef` if there is no model or the solver has
    /// never seen its variable.
    pub fn safe_assignment(&self, lit: Lit) -> LBool {
        let Some(model) = &self.model else {
            return LBool::Undef;
        };
        let Some(svar) = self.to_solver.get(&lit.var()) else {
            return LBool::Undef;
        };
        match model.get(svar.index()) {
            Some(&value) => LBool::from_bool(value == lit.is_positive()),
            None => LBool::Undef,
        }
    }

    /// Value of the positive literal of `var`, or `Undef`.
    pub fn safe_assignment_to_var(&self, var: Var) -> LBool {
        self.safe_assignment(var.pos())
    }

    /// Literals among `lits` that are true in the model.
    pub fn true_literals(&self, lits: &[Lit]) -> Vec<Lit> {
        lits.iter()
            .copied()
            .filter(|&l| self.safe_assignment(l).is_true())
            .collect()
    }

    /// Mint an activation literal for a new group.
    pub fn create_group(&mut self) -> Lit {
        self.ctx.vars.new_lit()
    }

    /// Add `clause` to `group`; the clause only holds while the group is
    /// active.
    pub fn add_group_clause(&mut self, group: Lit, clause: &[Lit]) {
        let mut guarded = Vec::with_capacity(clause.len() + 1);
        guarded.extend_from_slice(clause);
        guarded.push(group.negate());
        self.add_clause(&guarded);
    }

    /// Make the clauses of `group` permanent.
    pub fn commit_group(&mut self, group: Lit) {
        if self.committed.insert(group) {
            self.add_clause(&[group]);
        }
    }

    /// Solve with `group` active. Returns `true` if satisfiable; on
    /// unsatisfiable answers [`SatSolver::core`] holds the responsible
    /// assumptions (the group literal excluded). The group is deactivated
    /// for good on return unless it was committed.
    pub fn group_solve(&mut self, group: Lit, assumps: &[Lit]) -> Result<bool> {
        let mut all = Vec::with_capacity(assumps.len() + 1);
        all.extend_from_slice(assumps);
        all.push(group);
        let sat = self.solve(&all);
        if !sat.as_ref().is_ok_and(|&s| s) {
            self.core.retain(|&l| l != group);
        }
        if !self.committed.contains(&group) {
            // Retiring the group leaves the model of this call readable.
            self.push_clause(&[group.negate()]);
        }
        sat
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn setup() -> (Rc<Context>, SatSolver) {
        let ctx = Context::with_defaults();
        let solver = SatSolver::new(ctx.clone());
        (ctx, solver)
    }

    #[test]
    fn test_basic_solve_and_model() {
        let (ctx, mut solver) = setup();
        let a = ctx.vars.new_lit();
        let b = ctx.vars.new_lit();
        solver.add_clause(&[a, b]);
        solver.add_clause(&[!a]);
        assert!(solver.solve(&[]).unwrap());
        assert_eq!(solver.assignment(a), LBool::False);
        assert_eq!(solver.assignment(b), LBool::True);
        assert_eq!(solver.assignment(Lit::TRUE), LBool::True);
        assert_eq!(solver.assignment(Lit::FALSE), LBool::False);
    }

    #[test]
    fn test_assumptions_do_not_persist() {
        let (ctx, mut solver) = setup();
        let a = ctx.vars.new_lit();
        let b = ctx.vars.new_lit();
        solver.add_clause(&[!a, b]);
        assert!(!solver.solve(&[a, !b]).unwrap());
        let core = solver.core().to_vec();
        assert!(core.contains(&a) || core.contains(&!b));
        assert!(solver.solve(&[]).unwrap());
        assert!(solver.solve(&[a]).unwrap());
        assert_eq!(solver.assignment(b), LBool::True);
    }

    #[test]
    fn test_core_is_subset_of_assumptions() {
        let (ctx, mut solver) = setup();
        let a = ctx.vars.new_lit();
        let b = ctx.vars.new_lit();
        let c = ctx.vars.new_lit();
        solver.add_clause(&[!a]);
        assert!(!solver.solve(&[b, a, c]).unwrap());
        assert_eq!(solver.core(), &[a]);
    }

    #[test]
    fn test_safe_assignment_unknown_var() {
        let (ctx, mut solver) = setup();
        let a = ctx.vars.new_lit();
        let unseen = ctx.vars.new_var();
        solver.add_clause(&[a]);
        assert_eq!(solver.safe_assignment(a), LBool::Undef);
        assert!(solver.solve(&[]).unwrap());
        assert_eq!(solver.safe_assignment_to_var(unseen), LBool::Undef);
        assert_eq!(solver.safe_assignment(a), LBool::True);
    }

    #[test]
    #[should_panic(expected = "model queried after a mutation")]
    fn test_model_invalid_after_mutation() {
        let (ctx, mut solver) = setup();
        let a = ctx.vars.new_lit();
        assert!(solver.solve(&[]).unwrap());
        solver.add_clause(&[a]);
        let _ = solver.assignment(a);
    }

    #[test]
    fn test_group_deactivates() {
        let (ctx, mut solver) = setup();
        let a = ctx.vars.new_lit();
        let g = solver.create_group();
        solver.add_group_clause(g, &[a]);
        assert!(!solver.group_solve(g, &[!a]).unwrap());
        assert_eq!(solver.core(), &[!a]);
        // The group clause no longer constrains `a`.
        assert!(solver.solve(&[!a]).unwrap());
    }

    #[test]
    fn test_group_model_readable() {
        let (ctx, mut solver) = setup();
        let a = ctx.vars.new_lit();
        let g = solver.create_group();
        solver.add_group_clause(g, &[a]);
        assert!(solver.group_solve(g, &[]).unwrap());
        assert_eq!(solver.assignment(a), LBool::True);
    }

    #[test]
    fn test_committed_group_persists() {
        let (ctx, mut solver) = setup();
        let a = ctx.vars.new_lit();
        let g = solver.create_group();
        solver.add_group_clause(g, &[a]);
        solver.commit_group(g);
        assert!(solver.group_solve(g, &[]).unwrap());
        assert!(!solver.solve(&[!a]).unwrap());
    }

    #[test]
    fn test_reset() {
        let (ctx, mut solver) = setup();
        let a = ctx.vars.new_lit();
        solver.add_clause(&[a]);
        solver.add_clause(&[!a]);
        assert!(!solver.solve(&[]).unwrap());
        solver.reset();
        assert!(solver.solve(&[a]).unwrap());
        assert_eq!(ctx.stats.calls(Subsystem::Sat), 2);
    }
}
