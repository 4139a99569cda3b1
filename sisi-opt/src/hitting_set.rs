//! Minimum hitting sets.
//!
//! Keeps a subsumption-free collection of sets over a literal universe and
//! finds minimum hitting sets with MaxSAT: one selection variable per
//! element, a hard clause per set requiring one of its elements to be
//! selected, and a soft "not selected" literal per element.

use crate::maxsat::{MaxSat, new_maxsat};
use rustc_hash::FxHashMap;
use sisi_core::clause::{canonical, subsumes};
use sisi_core::{Context, Lit, Result, Subsystem};
use std::rc::Rc;
use tracing::{debug, trace};

/// Incremental minimum hitting-set finder.
pub struct HittingSetFinder {
    ctx: Rc<Context>,
    maxsat: Box<dyn MaxSat>,
    selectors: FxHashMap<Lit, Lit>,
    elements: Vec<Lit>,
    sets: Vec<Option<Vec<Lit>>>,
    blocked: Vec<Vec<Lit>>,
}

impl std::fmt::Debug for HittingSetFinder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HittingSetFinder")
            .field("elements", &self.elements.len())
            .field("sets", &self.num_sets())
            .field("blocked", &self.blocked.len())
            .finish()
    }
}

impl HittingSetFinder {
    /// Create an empty finder.
    pub fn new(ctx: Rc<Context>) -> Self {
        Self {
            maxsat: new_maxsat(&ctx),
            ctx,
            selectors: FxHashMap::default(),
            elements: Vec::new(),
            sets: Vec::new(),
            blocked: Vec::new(),
        }
    }

    fn selector(&mut self, element: Lit) -> Lit {
        if let Some(&sel) = self.selectors.get(&element) {
            return sel;
        }
        let sel = self.ctx.vars.new_lit();
        self.selectors.insert(element, sel);
        self.elements.push(element);
        self.maxsat.add_for_optimization(sel.negate());
        sel
    }

    /// Add a set. Returns `false` if a stored set is already contained in
    /// it; otherwise stored supersets of `set` are dropped.
    pub fn add_set(&mut self, set: &[Lit]) -> bool {
        let set = canonical(set);
        if self.sets.iter().flatten().any(|s| subsumes(s, &set)) {
            trace!(size = set.len(), "hitting set: subsumed set dropped");
            return false;
        }
        for slot in &mut self.sets {
            if slot.as_ref().is_some_and(|s| subsumes(&set, s)) {
                *slot = None;
            }
        }
        let clause: Vec<Lit> = set.iter().map(|&e| self.selector(e)).collect();
        self.maxsat.add_clause(&clause);
        self.sets.push(Some(set));
        true
    }

    /// Current collection, subsumption-free.
    pub fn sets(&self) -> impl Iterator<Item = &[Lit]> {
        self.sets.iter().flatten().map(Vec::as_slice)
    }

    /// Number of stored sets.
    pub fn num_sets(&self) -> usize {
        self.sets.iter().flatten().count()
    }

    /// A minimum hitting set, or `None` if every hitting set is blocked.
    pub fn solve(&mut self) -> Result<Option<Vec<Lit>>> {
        let ctx = Rc::clone(&self.ctx);
        let _timer = ctx.stats.timer(Subsystem::HittingSet);
        if !self.maxsat.solve(&[])? {
            return Ok(None);
        }
        let mut hs: Vec<Lit> = self
            .elements
            .iter()
            .copied()
            .filter(|e| self.maxsat.assignment(self.selectors[e]).is_true())
            .collect();
        hs.sort_unstable();
        debug!(size = hs.len(), sets = self.num_sets(), "minimum hitting set");
        Ok(Some(hs))
    }

    /// Exclude every future solution containing all of `set`.
    pub fn block(&mut self, set: &[Lit]) {
        let clause: Vec<Lit> = set.iter().map(|&e| self.selector(e).negate()).collect();
        self.maxsat.add_clause(&clause);
        self.blocked.push(set.to_vec());
    }

    /// Rebuild the MaxSAT instance from the stored sets and blocks.
    pub fn renew(&mut self) {
        debug!(sets = self.num_sets(), blocked = self.blocked.len(), "renewing hitting-set solver");
        self.maxsat = new_maxsat(&self.ctx);
        let elements = std::mem::take(&mut self.elements);
        for &element in &elements {
            let sel = self.selectors[&element];
            self.maxsat.add_for_optimization(sel.negate());
        }
        self.elements = elements;
        let sets: Vec<Vec<Lit>> = self.sets().map(<[Lit]>::to_vec).collect();
        for set in sets {
            let clause: Vec<Lit> = set.iter().map(|&e| self.selector(e)).collect();
            self.maxsat.add_clause(&clause);
        }
        for set in self.blocked.clone() {
            let clause: Vec<Lit> = set.iter().map(|&e| self.selector(e).negate()).collect();
            self.maxsat.add_clause(&clause);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn universe(ctx: &Context, n: usize) -> Vec<Lit> {
        (0..n).map(|_| ctx.vars.new_lit()).collect()
    }

    #[test]
    fn test_minimum_hitting_set() {
        let ctx = Context::with_defaults();
        let e = universe(&ctx, 4);
        let mut hs = HittingSetFinder::new(ctx);
        hs.add_set(&[e[0], e[1]]);
        hs.add_set(&[e[1], e[2]]);
        hs.add_set(&[e[2], e[3]]);
        let solution = hs.solve().unwrap().unwrap();
        assert_eq!(solution.len(), 2);
        for set in [[e[0], e[1]], [e[1], e[2]], [e[2], e[3]]] {
            assert!(set.iter().any(|x| solution.contains(x)));
        }
    }

    #[test]
    fn test_subsumption_both_ways() {
        let ctx = Context::with_defaults();
        let e = universe(&ctx, 3);
        let mut hs = HittingSetFinder::new(ctx);
        assert!(hs.add_set(&[e[0], e[1], e[2]]));
        assert!(hs.add_set(&[e[1], e[0]]));
        assert_eq!(hs.num_sets(), 1);
        assert!(!hs.add_set(&[e[2], e[1], e[0]]));
        assert_eq!(hs.sets().next(), Some(canonical(&[e[0], e[1]]).as_slice()));
    }

    #[test]
    fn test_block_and_renew() {
        let ctx = Context::with_defaults();
        let e = universe(&ctx, 2);
        let mut hs = HittingSetFinder::new(ctx);
        hs.add_set(&[e[0], e[1]]);
        let first = hs.solve().unwrap().unwrap();
        assert_eq!(first.len(), 1);
        hs.block(&first);
        let second = hs.solve().unwrap().unwrap();
        assert_eq!(second.len(), 1);
        assert_ne!(first, second);
        hs.block(&second);
        assert_eq!(hs.solve().unwrap(), None);
        hs.renew();
        assert_eq!(hs.solve().unwrap(), None);
    }

    #[test]
    fn test_empty_collection() {
        let ctx = Context::with_defaults();
        let mut hs = HittingSetFinder::new(ctx);
        assert_eq!(hs.solve().unwrap(), Some(Vec::new()));
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(24))]

        #[test]
        fn prop_result_hits_every_set(
            sets in proptest::collection::vec(proptest::collection::vec(0usize..6, 1..4), 1..8)
        ) {
            let ctx = Context::with_defaults();
            let e = universe(&ctx, 6);
            let mut hs = HittingSetFinder::new(ctx);
            for set in &sets {
                let lits: Vec<Lit> = set.iter().map(|&i| e[i]).collect();
                hs.add_set(&lits);
            }
            let solution = hs.solve().unwrap().unwrap();
            for set in &sets {
                prop_assert!(set.iter().any(|&i| solution.contains(&e[i])));
            }
            // Minimum: no element can be dropped.
            for skip in 0..solution.len() {
                let reduced: Vec<Lit> = solution
                    .iter()
                    .enumerate()
                    .filter(|&(i, _)| i != skip)
                    .map(|(_, &l)| l)
                    .collect();
                prop_assert!(sets.iter().any(|set| !set.iter().any(|&i| reduced.contains(&e[i]))));
            }
        }
    }
}
