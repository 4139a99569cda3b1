use super::{IvcExtractor, all_gates, complement, limit_reached, model_is_safe, shrink_ivc};
use crate::correction::McsFinder;
use crate::safety::gates_are_safe;
use rustc_hash::FxHashMap;
use sisi_core::{Clause, Context, Lit, Result};
use sisi_opt::{MaxSat, new_maxsat};
use sisi_ts::TransitionRelation;
use std::rc::Rc;
use tracing::{debug, info};

/// MARCO-style exploration of gate subsets.
///
/// A map over one selector per gate proposes unexplored seeds, biased
/// towards small seeds (`marco_direction_down`) or large ones
/// (`marco_direction_up`). A safe seed shrinks to an MIVC and its
/// supersets leave the map. An unsafe seed yields a correction set
/// inside its complement (an exact MCS from the debugger with
/// `marco_mcs`, otherwise the complement of a maximal unsafe superset),
/// and seeds missing all of it leave the map.
pub struct MarcoIvc {
    ctx: Rc<Context>,
    tr: Rc<TransitionRelation>,
    gates: Vec<Lit>,
    selectors: FxHashMap<Lit, Lit>,
    map: Box<dyn MaxSat>,
    mcs: Option<McsFinder>,
    limit: Option<usize>,
}

impl std::fmt::Debug for MarcoIvc {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MarcoIvc")
            .field("gates", &self.gates.len())
            .field("limit", &self.limit)
            .finish()
    }
}

impl MarcoIvc {
    /// Extract MIVCs of `tr`.
    pub fn new(tr: Rc<TransitionRelation>) -> Self {
        let ctx = Rc::clone(tr.context());
        let gates = all_gates(&tr);
        let mut map = new_maxsat(&ctx);
        let mut selectors = FxHashMap::default();
        for &gate in &gates {
            let sel = ctx.vars.new_lit();
            if ctx.options.marco_direction_down {
                map.add_for_optimization(sel.negate());
            } else if ctx.options.marco_direction_up {
                map.add_for_optimization(sel);
            }
            selectors.insert(gate, sel);
        }
        Self {
            mcs: ctx.options.marco_mcs.then(|| McsFinder::new(&tr)),
            ctx,
            tr,
            gates,
            selectors,
            map,
            limit: None,
        }
    }

    /// Stop after `limit` MIVCs.
    pub fn with_limit(mut self, limit: Option<usize>) -> Self {
        self.limit = limit;
        self
    }

    fn seed(&mut self) -> Result<Option<Vec<Lit>>> {
        if !self.map.solve(&[])? {
            return Ok(None);
        }
        Ok(Some(
            self.gates
                .iter()
                .copied()
                .filter(|g| self.map.assignment(self.selectors[g]).is_true())
                .collect(),
        ))
    }

    /// Grow an unsafe seed to a maximal unsafe gate set.
    fn grow(&self, seed: &[Lit]) -> Result<Vec<Lit>> {
        let mut current = seed.to_vec();
        for &gate in &self.gates {
            if current.contains(&gate) {
                continue;
            }
            current.push(gate);
            if gates_are_safe(&self.tr, &current)? {
                current.pop();
            }
        }
        Ok(current)
    }

    fn correction_set(&mut self, seed: &[Lit]) -> Result<Vec<Lit>> {
        let rest = complement(&self.gates, seed);
        if let Some(finder) = &mut self.mcs
            && let Some(mcs) = finder.find_within(&rest)?
        {
            return Ok(mcs);
        }
        let grown = self.grow(seed)?;
        Ok(complement(&self.gates, &grown))
    }
}

impl IvcExtractor for MarcoIvc {
    fn extract(&mut self) -> Result<Vec<Vec<Lit>>> {
        let mut found = Vec::new();
        if !model_is_safe(&self.tr)? {
            return Ok(found);
        }
        while !limit_reached(self.limit, found.len()) {
            let Some(seed) = self.seed()? else {
                break;
            };
            if gates_are_safe(&self.tr, &seed)? {
                let mivc = shrink_ivc(&self.tr, &seed)?;
                self.ctx.stats.record_ivc(mivc.len());
                info!(size = mivc.len(), number = found.len() + 1, "marco: MIVC");
                let block: Clause = mivc.iter().map(|g| self.selectors[g].negate()).collect();
                self.map.add_clause(&block);
                found.push(mivc);
            } else {
                let set = self.correction_set(&seed)?;
                debug!(seed = seed.len(), set = ?set, "marco: unsafe seed");
                let hit: Clause = set.iter().map(|g| self.selectors[g]).collect();
                self.map.add_clause(&hit);
            }
        }
        Ok(found)
    }
}
