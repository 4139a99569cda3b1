//! Core-guided MaxSAT in the MSU3/MSU4 family.
//!
//! Soft literals start out assumed true. Every unsatisfiable core either
//! relaxes the soft literals it mentions, moving them under a cardinality
//! bound, or, when it is made of the bound alone, raises that bound by one.
//! A core that does not depend on the bound also yields an at-least-one
//! clause "some soft literal of this core is false". Soft literals that the
//! caller assumes are never relaxed: they hold in every model of the call.
//!
//! Both the relaxation state and the at-least-one clauses depend on the
//! assumptions of the call, so they live in a *context* keyed by the
//! sorted assumptions and guarded by a context literal. Contexts can be
//! retired after a number of uses and the whole SAT instance can be
//! rebuilt periodically from the recorded hard clauses.

use crate::maxsat::{MaxSat, MaxSatStats};
use rustc_hash::{FxHashMap, FxHashSet};
use sisi_core::{Clause, Context, LBool, Lit, Result, Subsystem};
use sisi_sat::{CardinalityConstraint, SatSolver};
use std::rc::Rc;
use tracing::{debug, trace};

#[derive(Debug)]
struct Msu4Context {
    guard: Lit,
    relaxed: FxHashSet<usize>,
    card: CardinalityConstraint,
    lower_bound: usize,
    uses: usize,
}

/// Core-guided MaxSAT solver.
#[derive(Debug)]
pub struct Msu4MaxSat {
    ctx: Rc<Context>,
    solver: SatSolver,
    hard: Vec<Clause>,
    soft: Vec<Lit>,
    contexts: FxHashMap<Vec<Lit>, Msu4Context>,
    lower_bounds: FxHashMap<Vec<Lit>, usize>,
    retired: Vec<Lit>,
    stats: MaxSatStats,
}

impl Msu4MaxSat {
    /// Create an empty solver.
    pub fn new(ctx: Rc<Context>) -> Self {
        Self {
            solver: SatSolver::new(Rc::clone(&ctx)),
            ctx,
            hard: Vec::new(),
            soft: Vec::new(),
            contexts: FxHashMap::default(),
            lower_bounds: FxHashMap::default(),
            retired: Vec::new(),
            stats: MaxSatStats::default(),
        }
    }

    fn rebuild_solver(&mut self) {
        debug!(hard = self.hard.len(), "msu4 rebuilding SAT instance");
        self.solver.reset();
        self.solver.add_clauses(&self.hard);
        self.contexts.clear();
        self.retired.clear();
    }

    fn context_for(&mut self, key: &[Lit]) -> &mut Msu4Context {
        let ctx = &self.ctx;
        let lower_bounds = &self.lower_bounds;
        self.contexts
            .entry(key.to_vec())
            .or_insert_with(|| Msu4Context {
                guard: ctx.vars.new_lit(),
                relaxed: FxHashSet::default(),
                card: CardinalityConstraint::new(Rc::clone(ctx)),
                lower_bound: lower_bounds.get(key).copied().unwrap_or(0),
                uses: 0,
            })
    }

    /// Drop the context of `key`. Its guard is disabled before the next
    /// solve so the current model stays readable.
    fn retire_context(&mut self, key: &[Lit]) {
        if let Some(context) = self.contexts.remove(key) {
            trace!(uses = context.uses, "msu4 retiring context");
            self.retired.push(context.guard);
        }
    }
}

impl MaxSat for Msu4MaxSat {
    fn add_clause(&mut self, clause: &[Lit]) {
        self.hard.push(clause.to_vec());
        self.solver.add_clause(clause);
    }

    fn add_for_optimization(&mut self, lit: Lit) {
        self.soft.push(lit);
        // Contexts and bounds were computed for the old soft set.
        let keys: Vec<Vec<Lit>> = self.contexts.keys().cloned().collect();
        for key in keys {
            self.retire_context(&key);
        }
        self.lower_bounds.clear();
    }

    fn solve(&mut self, assumps: &[Lit]) -> Result<bool> {
        let ctx = Rc::clone(&self.ctx);
        let _timer = ctx.stats.timer(Subsystem::MaxSat);
        self.stats.calls += 1;

        let solver_period = ctx.options.msu4_reset_solver_period;
        if solver_period > 0 && self.stats.calls % solver_period as u64 == 0 {
            self.rebuild_solver();
        }

        for guard in std::mem::take(&mut self.retired) {
            self.solver.add_clause(&[guard.negate()]);
        }

        let mut key = assumps.to_vec();
        key.sort_unstable();
        let soft = self.soft.clone();
        let forced: FxHashSet<Lit> = assumps.iter().copied().collect();
        let mut soft_index: FxHashMap<Lit, Vec<usize>> = FxHashMap::default();
        for (i, &lit) in soft.iter().enumerate() {
            if !forced.contains(&lit) {
                soft_index.entry(lit).or_default().push(i);
            }
        }

        let result = loop {
            let context = self.context_for(&key);
            let guard = context.guard;
            let lower_bound = context.lower_bound;
            context.card.set_cardinality(lower_bound);
            let network = context.card.cnfize();
            let bound = context.card.assume_leq(lower_bound);
            let free: Vec<Lit> = soft
                .iter()
                .enumerate()
                .filter(|&(i, l)| !context.relaxed.contains(&i) && !forced.contains(l))
                .map(|(_, &l)| l)
                .collect();
            self.solver.add_clauses(&network);

            let mut all = Vec::with_capacity(assumps.len() + free.len() + 2);
            all.extend_from_slice(assumps);
            all.push(guard);
            all.extend_from_slice(&bound);
            all.extend_from_slice(&free);
            self.stats.sat_calls += 1;
            if self.solver.solve(&all)? {
                trace!(lower_bound, "msu4 optimum");
                break true;
            }

            self.stats.cores += 1;
            let core: Vec<Lit> = self.solver.core().to_vec();
            let bound_in_core = bound.iter().any(|l| core.contains(l));
            let mut core_soft: Vec<usize> = core
                .iter()
                .filter_map(|l| soft_index.get(l))
                .flatten()
                .copied()
                .collect();
            core_soft.sort_unstable();
            core_soft.dedup();

            let context = self.context_for(&key);
            let fresh: Vec<usize> = core_soft
                .iter()
                .copied()
                .filter(|i| !context.relaxed.contains(i))
                .collect();
            if fresh.is_empty() {
                if !bound_in_core {
                    break false;
                }
                context.lower_bound += 1;
                if context.lower_bound > soft.len() {
                    break false;
                }
                continue;
            }
            for &i in &fresh {
                context.relaxed.insert(i);
                context.card.add_input(soft[i].negate());
            }
            // A core that used the bound only holds while the bound does.
            if !bound_in_core {
                // At least one soft literal of the core is false under these assumptions.
                let mut at_least_one: Clause =
                    core_soft.iter().map(|&i| soft[i].negate()).collect();
                at_least_one.push(guard.negate());
                self.solver.add_clause(&at_least_one);
            }
        };

        let context_period = ctx.options.msu4_reset_context_period;
        if let Some(context) = self.contexts.get_mut(&key) {
            context.uses += 1;
            self.lower_bounds.insert(key.clone(), context.lower_bound);
            if context_period > 0 && context.uses >= context_period {
                self.retire_context(&key);
            }
        }
        if !result {
            self.stats.unsat += 1;
        }
        Ok(result)
    }

    fn assignment(&self, lit: Lit) -> LBool {
        self.solver.safe_assignment(lit)
    }

    fn soft(&self) -> &[Lit] {
        &self.soft
    }

    fn stats(&self) -> &MaxSatStats {
        &self.stats
    }
}
