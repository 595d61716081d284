// SPDX-License-Identifier: PMPL-1.0-or-later

//! Seeded random attack-tree construction.

use super::AttackTree;
use crate::types::{Gate, NodeAttrs};
use anyhow::{bail, Result};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};

/// Relative weights for drawing an internal node's gate
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GateWeights {
    pub and: f64,
    pub or: f64,
    pub sand: f64,
}

impl Default for GateWeights {
    fn default() -> Self {
        Self {
            and: 0.45,
            or: 0.45,
            sand: 0.1,
        }
    }
}

impl GateWeights {
    pub fn total(&self) -> f64 {
        self.and + self.or + self.sand
    }

    fn draw(&self, rng: &mut impl Rng) -> Gate {
        let pick = rng.random::<f64>() * self.total();
        if pick < self.and {
            Gate::And
        } else if pick < self.and + self.or {
            Gate::Or
        } else {
            Gate::Sand
        }
    }
}

/// Structural limits for generated trees
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TreeShape {
    /// Length of the guaranteed root-to-leaf spine
    pub min_depth: usize,
    pub max_depth: usize,
    pub max_branching: usize,
    pub gate_weights: GateWeights,
}

impl Default for TreeShape {
    fn default() -> Self {
        Self {
            min_depth: 2,
            max_depth: 8,
            max_branching: 5,
            gate_weights: GateWeights::default(),
        }
    }
}

impl TreeShape {
    /// Number of nodes in the full tree allowed by depth and branching.
    pub fn capacity(&self) -> usize {
        let mut level = 1usize;
        let mut total = 1usize;
        for _ in 0..self.max_depth {
            level = level.saturating_mul(self.max_branching);
            total = total.saturating_add(level);
        }
        total
    }
}

pub fn node_id(index: usize) -> String {
    format!("node_{:02}", index)
}

/// Build a random tree of `num_nodes` nodes.
///
/// The same `(num_nodes, shape, seed)` always yields the same tree.
pub fn generate_random_tree(num_nodes: usize, shape: &TreeShape, seed: u64) -> Result<AttackTree> {
    if num_nodes == 0 {
        bail!("a tree needs at least one node");
    }
    if shape.max_branching == 0 && num_nodes > 1 {
        bail!("max_branching must be at least 1");
    }
    if num_nodes > shape.capacity() {
        bail!(
            "{} nodes do not fit depth {} with branching {}",
            num_nodes,
            shape.max_depth,
            shape.max_branching
        );
    }

    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    let placeholder = NodeAttrs::leaf(0, 0, 0, 0);
    let mut tree = AttackTree::new(node_id(0), placeholder);
    let mut depths = vec![0usize];

    let spine = shape.min_depth.min(shape.max_depth).min(num_nodes - 1);
    for i in 1..=spine {
        tree.add_child(i - 1, node_id(i), placeholder)?;
        depths.push(i);
    }

    for i in (spine + 1)..num_nodes {
        let eligible: Vec<usize> = (0..tree.len())
            .filter(|&idx| {
                tree.node(idx).children.len() < shape.max_branching
                    && depths[idx] < shape.max_depth
            })
            .collect();
        if eligible.is_empty() {
            bail!("no parent with free capacity for node {}", i);
        }
        let parent = eligible[rng.random_range(0..eligible.len())];
        tree.add_child(parent, node_id(i), placeholder)?;
        depths.push(depths[parent] + 1);
    }

    for idx in 0..tree.len() {
        let attrs = if tree.is_leaf(idx) {
            let start = rng.random_range(0..=5);
            let end = start + rng.random_range(2..=10);
            NodeAttrs::leaf(start, end, rng.random_range(1..=4), rng.random_range(1..=15))
        } else {
            let start = rng.random_range(0..=8);
            let end = start + rng.random_range(3..=12);
            let duration = rng.random_range(1..=3);
            let cost = rng.random_range(0..=8);
            let gate = shape.gate_weights.draw(&mut rng);
            NodeAttrs::gate(gate, start, end, duration, cost)
        };
        *tree.attrs_mut(idx) = attrs;
    }

    Ok(tree)
}
