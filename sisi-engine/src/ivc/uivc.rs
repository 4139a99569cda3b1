use super::{
    IvcExtractor, all_gates, complement, limit_reached, model_is_safe, shrink_correction_set,
};
use crate::correction::{ApproximateMcsFinder, BasicMcsFinder, CorrectionSetFinder};
use crate::safety::gates_are_safe;
use rustc_hash::FxHashMap;
use sisi_core::{Context, Lit, MapSolverKind, McsStrategy, Result};
use sisi_opt::HittingSetFinder;
use sisi_sat::SatSolver;
use sisi_ts::TransitionRelation;
use std::rc::Rc;
use tracing::{debug, info};

/// Plain SAT map: any hitting set of the stored correction sets outside
/// the blocked region, shrunk to a minimal one.
#[derive(Debug)]
struct SatMap {
    solver: SatSolver,
    selectors: FxHashMap<Lit, Lit>,
    gates: Vec<Lit>,
    sets: Vec<Vec<Lit>>,
}

impl SatMap {
    fn new(ctx: &Rc<Context>, gates: &[Lit]) -> Self {
        Self {
            solver: SatSolver::new(Rc::clone(ctx)),
            selectors: gates.iter().map(|&g| (g, ctx.vars.new_lit())).collect(),
            gates: gates.to_vec(),
            sets: Vec::new(),
        }
    }

    fn add_set(&mut self, set: &[Lit]) {
        let clause: Vec<Lit> = set.iter().map(|g| self.selectors[g]).collect();
        self.solver.add_clause(&clause);
        self.sets.push(set.to_vec());
    }

    fn block(&mut self, set: &[Lit]) {
        let clause: Vec<Lit> = set.iter().map(|g| self.selectors[g].negate()).collect();
        self.solver.add_clause(&clause);
    }

    fn hits_all(&self, candidate: &[Lit]) -> bool {
        self.sets.iter().all(|set| set.iter().any(|g| candidate.contains(g)))
    }

    fn solve(&mut self) -> Result<Option<Vec<Lit>>> {
        if !self.solver.solve(&[])? {
            return Ok(None);
        }
        let mut current: Vec<Lit> = self
            .gates
            .iter()
            .copied()
            .filter(|g| self.solver.assignment(self.selectors[g]).is_true())
            .collect();
        let mut i = 0;
        while i < current.len() {
            let mut candidate = current.clone();
            candidate.remove(i);
            if self.hits_all(&candidate) {
                current = candidate;
            } else {
                i += 1;
            }
        }
        Ok(Some(current))
    }
}

#[derive(Debug)]
enum Map {
    Sat(SatMap),
    MaxSat(HittingSetFinder),
}

impl Map {
    fn add_set(&mut self, set: &[Lit]) {
        match self {
            Map::Sat(map) => map.add_set(set),
            Map::MaxSat(map) => {
                map.add_set(set);
            }
        }
    }

    fn block(&mut self, set: &[Lit]) {
        match self {
            Map::Sat(map) => map.block(set),
            Map::MaxSat(map) => map.block(set),
        }
    }

    fn solve(&mut self) -> Result<Option<Vec<Lit>>> {
        match self {
            Map::Sat(map) => map.solve(),
            Map::MaxSat(map) => map.solve(),
        }
    }
}

/// MCS enumeration up front, then minimal hitting sets.
///
/// With the exact `basic` strategy every MCS is known before the first
/// hitting set, so every minimal hitting set is an MIVC. The `bmc`
/// strategy only sees bounded counterexamples: each hitting set is
/// checked for safety, and an unsafe one contributes the MCS shrunk from
/// its complement.
#[derive(Debug)]
pub struct Uivc {
    ctx: Rc<Context>,
    tr: Rc<TransitionRelation>,
    gates: Vec<Lit>,
    map: Map,
    limit: Option<usize>,
}

impl Uivc {
    /// Extract MIVCs of `tr`.
    pub fn new(tr: Rc<TransitionRelation>) -> Self {
        let ctx = Rc::clone(tr.context());
        let gates = all_gates(&tr);
        let map = match ctx.options.uivc_map_solver {
            MapSolverKind::Sat => Map::Sat(SatMap::new(&ctx, &gates)),
            MapSolverKind::MaxSat => Map::MaxSat(HittingSetFinder::new(Rc::clone(&ctx))),
        };
        Self {
            ctx,
            tr,
            gates,
            map,
            limit: None,
        }
    }

    /// Stop after `limit` MIVCs.
    pub fn with_limit(mut self, limit: Option<usize>) -> Self {
        self.limit = limit;
        self
    }

    fn enumerate_correction_sets(&mut self) -> Result<usize> {
        let mut count = 0;
        match self.ctx.options.uivc_mcs_finder {
            McsStrategy::Basic => {
                let mut finder = BasicMcsFinder::new(&self.tr);
                while let Some(mcs) = finder.find_next()? {
                    self.map.add_set(&mcs);
                    count += 1;
                }
            }
            McsStrategy::Bmc => {
                let mut finder = ApproximateMcsFinder::new(&self.tr);
                while let Some(set) = finder.find_next()? {
                    let shrunk = finder.inner().shrink(&set)?;
                    self.map.add_set(&shrunk);
                    count += 1;
                }
            }
        }
        debug!(count, "uivc: correction sets enumerated");
        Ok(count)
    }
}

impl IvcExtractor for Uivc {
    fn extract(&mut self) -> Result<Vec<Vec<Lit>>> {
        let mut found = Vec::new();
        if !model_is_safe(&self.tr)? {
            return Ok(found);
        }
        self.enumerate_correction_sets()?;
        let exact = self.ctx.options.uivc_mcs_finder == McsStrategy::Basic;
        while !limit_reached(self.limit, found.len()) {
            let Some(mut candidate) = self.map.solve()? else {
                break;
            };
            candidate.sort_unstable();
            if !exact && !gates_are_safe(&self.tr, &candidate)? {
                let rest = complement(&self.gates, &candidate);
                let mcs = shrink_correction_set(&self.tr, &rest)?;
                debug!(mcs = ?mcs, "uivc: refined with a missed correction set");
                self.map.add_set(&mcs);
                continue;
            }
            self.ctx.stats.record_ivc(candidate.len());
            info!(size = candidate.len(), number = found.len() + 1, "uivc: MIVC");
            self.map.block(&candidate);
            found.push(candidate);
        }
        Ok(found)
    }
}
