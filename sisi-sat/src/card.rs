//! Incremental cardinality constraints.
//!
//! A totalizer: a binary tree of unary counters whose leaves are the input
//! literals. Node output `r_k` means "at least `k` inputs below this node
//! are true". Each internal node relates its outputs to those of its
//! children with two clause families:
//!
//! - upward `a_i & b_j -> r_(i+j)`, used by [`CardinalityConstraint::assume_leq`]
//! - downward `r_(i+j+1) -> a_(i+1) | b_(j+1)`, used by [`CardinalityConstraint::assume_geq`]
//!
//! Only outputs up to `bound + 1` are materialized. Adding inputs grows the
//! tree at the root and raising the bound extends every node; clauses
//! already handed out stay valid, so [`CardinalityConstraint::cnfize`]
//! only returns the new ones.

use rustc_hash::FxHashSet;
use sisi_core::clause::canonicalize;
use sisi_core::{Clause, Context, Cube, Lit};
use std::rc::Rc;

#[derive(Debug, Clone)]
struct Node {
    /// Number of inputs below this node
    size: usize,
    /// Materialized outputs `r_1..r_m`
    outputs: Vec<Lit>,
    children: Option<(usize, usize)>,
}

/// Sorting-network encoder for `sum(x_i) <= k` and `sum(x_i) >= k`.
#[derive(Debug)]
pub struct CardinalityConstraint {
    ctx: Rc<Context>,
    inputs: Vec<Lit>,
    nodes: Vec<Node>,
    root: Option<usize>,
    bound: usize,
    emitted: FxHashSet<Clause>,
}

impl CardinalityConstraint {
    /// Create an empty constraint.
    pub fn new(ctx: Rc<Context>) -> Self {
        Self {
            ctx,
            inputs: Vec::new(),
            nodes: Vec::new(),
            root: None,
            bound: 0,
            emitted: FxHashSet::default(),
        }
    }

    /// Create a constraint over `inputs`.
    pub fn with_inputs(ctx: Rc<Context>, inputs: impl IntoIterator<Item = Lit>) -> Self {
        let mut card = Self::new(ctx);
        for lit in inputs {
            card.add_input(lit);
        }
        card
    }

    /// Input literals, in insertion order.
    pub fn inputs(&self) -> &[Lit] {
        &self.inputs
    }

    /// Number of inputs.
    pub fn len(&self) -> usize {
        self.inputs.len()
    }

    /// Whether there are no inputs.
    pub fn is_empty(&self) -> bool {
        self.inputs.is_empty()
    }

    /// Current bound.
    pub fn cardinality(&self) -> usize {
        self.bound
    }

    /// Add an input literal.
    pub fn add_input(&mut self, lit: Lit) {
        self.inputs.push(lit);
        let leaf = self.nodes.len();
        self.nodes.push(Node {
            size: 1,
            outputs: vec![lit],
            children: None,
        });
        self.root = Some(match self.root {
            None => leaf,
            Some(old) => {
                let idx = self.nodes.len();
                self.nodes.push(Node {
                    size: self.nodes[old].size + 1,
                    outputs: Vec::new(),
                    children: Some((old, leaf)),
                });
                idx
            }
        });
        self.prepare();
    }

    /// Prepare the network for bounds up to `k`.
    pub fn set_cardinality(&mut self, k: usize) {
        self.bound = k;
        self.prepare();
    }

    fn limit(&self) -> usize {
        self.bound.saturating_add(1)
    }

    /// Allocate missing outputs; children precede parents in the arena.
    fn prepare(&mut self) {
        let limit = self.limit();
        for idx in 0..self.nodes.len() {
            if self.nodes[idx].children.is_none() {
                continue;
            }
            let want = self.nodes[idx].size.min(limit);
            while self.nodes[idx].outputs.len() < want {
                let lit = self.ctx.vars.new_lit();
                self.nodes[idx].outputs.push(lit);
            }
        }
    }

    /// Clauses of the network that were not returned before.
    pub fn cnfize(&mut self) -> Vec<Clause> {
        let mut out = Vec::new();
        for node in &self.nodes {
            let Some((left, right)) = node.children else {
                continue;
            };
            let a = &self.nodes[left].outputs;
            let b = &self.nodes[right].outputs;
            let r = &node.outputs;
            let m = r.len();
            if m == 0 {
                continue;
            }
            // Upward: a_i & b_j -> r_min(i+j, m), with a_0 = b_0 = true.
            for i in 0..=a.len() {
                for j in 0..=b.len() {
                    if i + j == 0 {
                        continue;
                    }
                    let mut clause = Vec::with_capacity(3);
                    if i > 0 {
                        clause.push(a[i - 1].negate());
                    }
                    if j > 0 {
                        clause.push(b[j - 1].negate());
                    }
                    clause.push(r[(i + j).min(m) - 1]);
                    out.push(clause);
                }
            }
            // Downward: r_(i+j+1) -> a_(i+1) | b_(j+1); a_k is false past the
            // child's size.
            let (sa, sb) = (self.nodes[left].size, self.nodes[right].size);
            for i in 0..=sa.min(m) {
                for j in 0..=sb.min(m) {
                    let k = i + j + 1;
                    if k > m {
                        continue;
                    }
                    let mut clause = Vec::with_capacity(3);
                    if i < sa {
                        clause.push(a[i]);
                    }
                    if j < sb {
                        clause.push(b[j]);
                    }
                    clause.push(r[k - 1].negate());
                    out.push(clause);
                }
            }
        }
        let mut fresh = Vec::new();
        for mut clause in out {
            canonicalize(&mut clause);
            if self.emitted.insert(clause.clone()) {
                fresh.push(clause);
            }
        }
        fresh
    }

    /// Forget which clauses were returned, so the next
    /// [`CardinalityConstraint::cnfize`] returns the whole network again.
    pub fn clear_incrementality(&mut self) {
        self.emitted.clear();
    }

    fn root_outputs(&self) -> &[Lit] {
        match self.root {
            Some(root) => &self.nodes[root].outputs,
            None => &[],
        }
    }

    /// Assumptions enforcing `sum <= k`.
    ///
    /// # Panics
    ///
    /// Panics if `k` exceeds the prepared bound.
    pub fn assume_leq(&self, k: usize) -> Cube {
        if k >= self.inputs.len() {
            return Vec::new();
        }
        let outputs = self.root_outputs();
        assert!(
            k < outputs.len(),
            "assume_leq({k}) needs a bound of at least {k}, prepared {}",
            self.bound
        );
        vec![outputs[k].negate()]
    }

    /// Assumptions enforcing `sum >= k`.
    ///
    /// # Panics
    ///
    /// Panics if `k` exceeds the prepared bound plus one.
    pub fn assume_geq(&self, k: usize) -> Cube {
        if k == 0 {
            return Vec::new();
        }
        if k > self.inputs.len() {
            return vec![Lit::FALSE];
        }
        let outputs = self.root_outputs();
        assert!(
            k <= outputs.len(),
            "assume_geq({k}) exceeds the prepared bound {}",
            self.bound
        );
        vec![outputs[k - 1]]
    }
}
