//! Simplifying SAT preprocessor.
//!
//! Collects clauses, then runs unit propagation, subsumption with
//! self-subsuming strengthening and bounded variable elimination (BVE) on
//! every variable that was not frozen. The residual clause set is
//! equisatisfiable with the input under every assignment to the frozen
//! variables, so a caller may transfer it to an incremental solver and
//! keep querying frozen literals.
//!
//! Clauses live in slots so removal does not reindex the occurrence lists.

use rustc_hash::{FxHashMap, FxHashSet};
use sisi_core::clause::{canonicalize, is_tautology};
use sisi_core::{Clause, Context, Lit, Subsystem, Var};
use smallvec::SmallVec;
use std::collections::VecDeque;
use std::rc::Rc;
use tracing::debug;

/// Configuration for the preprocessor.
#[derive(Clone, Debug)]
pub struct SimpConfig {
    /// Largest resolvent BVE may create
    pub max_clause_size: usize,
    /// Maximum occurrences (both polarities) of an elimination candidate
    pub max_occurrences: usize,
    /// Resolvents allowed beyond the clauses they replace
    pub grow: usize,
    /// Run subsumption and strengthening
    pub subsumption: bool,
    /// Run bounded variable elimination
    pub elimination: bool,
}

impl Default for SimpConfig {
    fn default() -> Self {
        Self {
            max_clause_size: 20,
            max_occurrences: 64,
            grow: 0,
            subsumption: true,
            elimination: true,
        }
    }
}

/// Statistics about one simplification run.
#[derive(Clone, Debug, Default)]
pub struct SimpStats {
    /// Clauses before simplification
    pub clauses_before: usize,
    /// Clauses after simplification
    pub clauses_after: usize,
    /// Variables fixed by unit propagation
    pub units: usize,
    /// Clauses removed by subsumption
    pub subsumed: usize,
    /// Literals removed by self-subsuming resolution
    pub strengthened: usize,
    /// Variables eliminated by resolution
    pub vars_eliminated: usize,
}

/// Occurrence list of a literal; most literals occur a handful of times.
type Occurrences = SmallVec<[usize; 4]>;

/// Preprocessor with frozen variables.
pub struct SimpSolver {
    ctx: Rc<Context>,
    config: SimpConfig,
    stats: SimpStats,
    slots: Vec<Option<Clause>>,
    occurs: FxHashMap<Lit, Occurrences>,
    frozen: FxHashSet<Var>,
    assigned: FxHashMap<Var, bool>,
    units: Vec<Lit>,
    eliminated: FxHashSet<Var>,
    conflict: bool,
}

impl SimpSolver {
    /// Create a preprocessor with default configuration.
    pub fn new(ctx: Rc<Context>) -> Self {
        Self::with_config(ctx, SimpConfig::default())
    }

    /// Create a preprocessor with the given configuration.
    pub fn with_config(ctx: Rc<Context>, config: SimpConfig) -> Self {
        Self {
            ctx,
            config,
            stats: SimpStats::default(),
            slots: Vec::new(),
            occurs: FxHashMap::default(),
            frozen: FxHashSet::default(),
            assigned: FxHashMap::default(),
            units: Vec::new(),
            eliminated: FxHashSet::default(),
            conflict: false,
        }
    }

    /// Keep the variables of `lits` out of elimination.
    pub fn freeze(&mut self, lits: impl IntoIterator<Item = Lit>) {
        self.frozen
            .extend(lits.into_iter().filter(|l| !l.is_constant()).map(|l| l.var()));
    }

    /// Whether `var` was removed by elimination.
    pub fn is_eliminated(&self, var: Var) -> bool {
        self.eliminated.contains(&var)
    }

    /// Variables removed by elimination.
    pub fn eliminated(&self) -> &FxHashSet<Var> {
        &self.eliminated
    }

    /// Statistics of the last run.
    pub fn stats(&self) -> &SimpStats {
        &self.stats
    }

    /// Add a clause.
    pub fn add_clause(&mut self, lits: &[Lit]) {
        let mut clause: Clause = lits.iter().copied().filter(|&l| l != Lit::FALSE).collect();
        canonicalize(&mut clause);
        if is_tautology(&clause) {
            return;
        }
        self.stats.clauses_before += 1;
        self.insert(clause);
    }

    /// Add several clauses.
    pub fn add_clauses<C: AsRef<[Lit]>>(&mut self, clauses: impl IntoIterator<Item = C>) {
        for clause in clauses {
            self.add_clause(clause.as_ref());
        }
    }

    fn insert(&mut self, clause: Clause) {
        match clause.len() {
            0 => self.conflict = true,
            1 => self.enqueue(clause[0]),
            _ => {
                let idx = self.slots.len();
                for &lit in &clause {
                    self.occurs.entry(lit).or_default().push(idx);
                }
                self.slots.push(Some(clause));
            }
        }
    }

    fn enqueue(&mut self, lit: Lit) {
        match self.assigned.get(&lit.var()) {
            Some(&value) if value == lit.is_positive() => {}
            Some(_) => self.conflict = true,
            None => {
                self.assigned.insert(lit.var(), lit.is_positive());
                self.units.push(lit);
            }
        }
    }

    fn remove(&mut self, idx: usize) -> Option<Clause> {
        let clause = self.slots[idx].take()?;
        for lit in &clause {
            if let Some(list) = self.occurs.get_mut(lit) {
                list.retain(|&mut i| i != idx);
            }
        }
        Some(clause)
    }

    fn live(&self, lit: Lit) -> Vec<usize> {
        self.occurs
            .get(&lit)
            .map(|list| list.iter().copied().filter(|&i| self.slots[i].is_some()).collect())
            .unwrap_or_default()
    }

    /// Propagate every pending unit through the clause slots.
    fn propagate(&mut self, start: usize) -> usize {
        let mut head = start;
        while head < self.units.len() && !self.conflict {
            let lit = self.units[head];
            head += 1;
            for idx in self.live(lit) {
                self.remove(idx);
            }
            for idx in self.live(lit.negate()) {
                if let Some(mut clause) = self.remove(idx) {
                    clause.retain(|&l| l != lit.negate());
                    self.stats.strengthened += 1;
                    self.insert(clause);
                }
            }
        }
        head
    }

    /// Minisat-style check: `None` if `c` does not subsume `d`,
    /// `Some(None)` if it does, `Some(Some(l))` if `d` can drop `l`.
    fn subsumption_check(c: &[Lit], d: &[Lit]) -> Option<Option<Lit>> {
        if c.len() > d.len() {
            return None;
        }
        let mut flipped = None;
        for &lit in c {
            if d.binary_search(&lit).is_ok() {
                continue;
            }
            if flipped.is_none() && d.binary_search(&lit.negate()).is_ok() {
                flipped = Some(lit.negate());
                continue;
            }
            return None;
        }
        Some(flipped)
    }

    fn subsume(&mut self) {
        let mut queue: VecDeque<usize> = (0..self.slots.len()).collect();
        let mut queued: FxHashSet<usize> = queue.iter().copied().collect();
        while let Some(ci) = queue.pop_front() {
            queued.remove(&ci);
            let Some(c) = self.slots[ci].clone() else {
                continue;
            };
            // Scan the occurrence lists of the rarest variable of `c`.
            let Some(&pivot) = c.iter().min_by_key(|&&l| {
                self.occurs.get(&l).map_or(0, |v| v.len())
                    + self.occurs.get(&l.negate()).map_or(0, |v| v.len())
            }) else {
                continue;
            };
            let mut candidates = self.live(pivot);
            candidates.extend(self.live(pivot.negate()));
            for di in candidates {
                if di == ci {
                    continue;
                }
                let Some(d) = self.slots[di].as_ref() else {
                    continue;
                };
                match Self::subsumption_check(&c, d) {
                    None => {}
                    Some(None) => {
                        self.remove(di);
                        self.stats.subsumed += 1;
                    }
                    Some(Some(drop)) => {
                        if let Some(mut d) = self.remove(di) {
                            d.retain(|&l| l != drop);
                            self.stats.strengthened += 1;
                            let idx = self.slots.len();
                            self.insert(d);
                            if idx < self.slots.len() && queued.insert(idx) {
                                queue.push_back(idx);
                            }
                        }
                    }
                }
                if self.slots[ci].is_none() {
                    break;
                }
            }
            if self.conflict {
                return;
            }
        }
    }

    fn resolve(pos: &[Lit], neg: &[Lit], var: Var) -> Option<Clause> {
        let mut resolvent: Clause = pos
            .iter()
            .chain(neg.iter())
            .copied()
            .filter(|l| l.var() != var)
            .collect();
        canonicalize(&mut resolvent);
        if is_tautology(&resolvent) {
            None
        } else {
            Some(resolvent)
        }
    }

    fn try_eliminate(&mut self, var: Var) -> bool {
        if self.assigned.contains_key(&var) {
            return false;
        }
        let pos = self.live(var.pos());
        let neg = self.live(var.neg());
        if pos.len() + neg.len() > self.config.max_occurrences {
            return false;
        }
        let mut resolvents = Vec::new();
        for &p in &pos {
            for &n in &neg {
                let (Some(pc), Some(nc)) = (&self.slots[p], &self.slots[n]) else {
                    continue;
                };
                if let Some(r) = Self::resolve(pc, nc, var) {
                    if r.len() > self.config.max_clause_size
                        || resolvents.len() >= pos.len() + neg.len() + self.config.grow
                    {
                        return false;
                    }
                    resolvents.push(r);
                }
            }
        }
        for idx in pos.into_iter().chain(neg) {
            self.remove(idx);
        }
        for r in resolvents {
            self.insert(r);
        }
        self.eliminated.insert(var);
        true
    }

    fn eliminate(&mut self) {
        let mut candidates: Vec<Var> = self
            .occurs
            .keys()
            .map(|l| l.var())
            .filter(|v| !self.frozen.contains(v) && !self.assigned.contains_key(v))
            .collect::<FxHashSet<_>>()
            .into_iter()
            .collect();
        // Cheapest first: fewest pos * neg resolution pairs.
        candidates.sort_by_key(|&v| {
            let cost = self.live(v.pos()).len() * self.live(v.neg()).len();
            (cost, v)
        });
        let mut head = self.units.len();
        for var in candidates {
            if self.conflict {
                return;
            }
            if self.try_eliminate(var) {
                self.stats.vars_eliminated += 1;
                head = self.propagate(head);
            }
        }
    }

    /// Simplify and return the residual clauses (units included). A
    /// conflict yields the single empty clause.
    pub fn simplify(&mut self) -> Vec<Clause> {
        let ctx = Rc::clone(&self.ctx);
        let _timer = ctx.stats.timer(Subsystem::Simplify);
        let mut head = self.propagate(0);
        if self.config.subsumption && !self.conflict {
            self.subsume();
            head = self.propagate(head);
        }
        if self.config.elimination && !self.conflict {
            self.eliminate();
            self.propagate(head);
        }
        if self.conflict {
            debug!("preprocessing found a conflict");
            return vec![Vec::new()];
        }
        let mut out: Vec<Clause> = self.units.iter().map(|&l| vec![l]).collect();
        out.extend(self.slots.iter().flatten().cloned());
        self.stats.units = self.units.len();
        self.stats.clauses_after = out.len();
        debug!(
            before = self.stats.clauses_before,
            after = self.stats.clauses_after,
            eliminated = self.stats.vars_eliminated,
            "preprocessing done"
        );
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::SatSolver;

    fn lits(ctx: &Context, n: usize) -> Vec<Lit> {
        (0..n).map(|_| ctx.vars.new_lit()).collect()
    }

    #[test]
    fn test_unit_propagation() {
        let ctx = Context::with_defaults();
        let v = lits(&ctx, 3);
        let mut simp = SimpSolver::new(ctx.clone());
        simp.add_clause(&[v[0]]);
        simp.add_clause(&[!v[0], v[1]]);
        simp.add_clause(&[!v[1], v[2], v[0]]);
        simp.freeze(v.iter().copied());
        let out = simp.simplify();
        assert!(out.contains(&vec![v[0]]));
        assert!(out.contains(&vec![v[1]]));
        assert_eq!(out.len(), 2);
    }

    #[test]
    fn test_conflict_yields_empty_clause() {
        let ctx = Context::with_defaults();
        let v = lits(&ctx, 1);
        let mut simp = SimpSolver::new(ctx.clone());
        simp.add_clause(&[v[0]]);
        simp.add_clause(&[!v[0]]);
        assert_eq!(simp.simplify(), vec![Vec::<Lit>::new()]);
    }

    #[test]
    fn test_subsumption_and_strengthening() {
        let ctx = Context::with_defaults();
        let v = lits(&ctx, 3);
        let mut simp = SimpSolver::new(ctx.clone());
        simp.freeze(v.iter().copied());
        simp.add_clause(&[v[0], v[1]]);
        simp.add_clause(&[v[0], v[1], v[2]]);
        simp.add_clause(&[!v[0], v[1], v[2]]);
        let out = simp.simplify();
        // (a | b) subsumes (a | b | c); (a | b) strengthens (!a | b | c) to (b | c).
        let mut expected = vec![
            sisi_core::clause::canonical(&[v[0], v[1]]),
            sisi_core::clause::canonical(&[v[1], v[2]]),
        ];
        expected.sort();
        let mut out = out;
        out.sort();
        assert_eq!(out, expected);
    }

    #[test]
    fn test_frozen_vars_survive_elimination() {
        let ctx = Context::with_defaults();
        let v = lits(&ctx, 4);
        let (a, b, g, h) = (v[0], v[1], v[2], v[3]);
        let mut simp = SimpSolver::new(ctx.clone());
        // g = a & b, h = !g, with only a, b and h frozen.
        simp.add_clauses([vec![!g, a], vec![!g, b], vec![g, !a, !b]]);
        simp.add_clauses([vec![h, g], vec![!h, !g]]);
        simp.freeze([a, b, h]);
        let out = simp.simplify();
        assert!(simp.is_eliminated(g.var()));
        assert!(!simp.is_eliminated(h.var()));
        assert!(out.iter().flatten().all(|l| l.var() != g.var()));

        // The residual still encodes h = !(a & b).
        let mut solver = SatSolver::new(ctx.clone());
        solver.add_clauses(&out);
        assert!(!solver.solve(&[a, b, h]).unwrap());
        assert!(solver.solve(&[a, !b, h]).unwrap());
        assert!(!solver.solve(&[!a, !h]).unwrap());
    }

    #[test]
    fn test_tautologies_and_constants_dropped() {
        let ctx = Context::with_defaults();
        let v = lits(&ctx, 2);
        let mut simp = SimpSolver::new(ctx.clone());
        simp.freeze(v.iter().copied());
        simp.add_clause(&[v[0], !v[0], v[1]]);
        simp.add_clause(&[Lit::TRUE, v[1]]);
        simp.add_clause(&[Lit::FALSE, v[0], v[1]]);
        assert_eq!(simp.simplify(), vec![sisi_core::clause::canonical(&[v[0], v[1]])]);
    }
}
