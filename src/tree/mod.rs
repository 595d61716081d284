// SPDX-License-Identifier: PMPL-1.0-or-later

//! Attack trees: arena representation, validation and statistics.
//!
//! Nodes are only ever appended under an existing parent, so a tree built
//! through [`AttackTree::add_child`] is rooted, connected and acyclic. The
//! gate/leaf consistency and time windows are checked by [`validate_tree`].

mod random;

pub use random::{generate_random_tree, GateWeights, TreeShape};

use crate::types::{Gate, NodeAttrs};
use anyhow::{bail, Result};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, VecDeque};

#[derive(Debug, Clone)]
pub struct Node {
    pub id: String,
    pub parent: Option<usize>,
    pub children: Vec<usize>,
    pub attrs: NodeAttrs,
}

#[derive(Debug, Clone)]
pub struct AttackTree {
    nodes: Vec<Node>,
    index: HashMap<String, usize>,
}

impl AttackTree {
    pub fn new(root_id: impl Into<String>, attrs: NodeAttrs) -> Self {
        let root_id = root_id.into();
        let mut index = HashMap::new();
        index.insert(root_id.clone(), 0);
        Self {
            nodes: vec![Node {
                id: root_id,
                parent: None,
                children: Vec::new(),
                attrs,
            }],
            index,
        }
    }

    /// Append a node under `parent` and return its index.
    pub fn add_child(
        &mut self,
        parent: usize,
        id: impl Into<String>,
        attrs: NodeAttrs,
    ) -> Result<usize> {
        let id = id.into();
        if parent >= self.nodes.len() {
            bail!("parent index {} out of range for node '{}'", parent, id);
        }
        if self.index.contains_key(&id) {
            bail!("duplicate node id '{}'", id);
        }
        let idx = self.nodes.len();
        self.nodes.push(Node {
            id: id.clone(),
            parent: Some(parent),
            children: Vec::new(),
            attrs,
        });
        self.nodes[parent].children.push(idx);
        self.index.insert(id, idx);
        Ok(idx)
    }

    pub fn root(&self) -> usize {
        0
    }

    pub fn root_id(&self) -> &str {
        &self.nodes[0].id
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn node(&self, idx: usize) -> &Node {
        &self.nodes[idx]
    }

    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    pub fn attrs_mut(&mut self, idx: usize) -> &mut NodeAttrs {
        &mut self.nodes[idx].attrs
    }

    pub fn find(&self, id: &str) -> Option<usize> {
        self.index.get(id).copied()
    }

    pub fn is_leaf(&self, idx: usize) -> bool {
        self.nodes[idx].children.is_empty()
    }

    pub fn leaves(&self) -> Vec<usize> {
        (0..self.nodes.len()).filter(|&i| self.is_leaf(i)).collect()
    }

    pub fn internal_nodes(&self) -> Vec<usize> {
        (0..self.nodes.len()).filter(|&i| !self.is_leaf(i)).collect()
    }

    pub fn edge_count(&self) -> usize {
        self.nodes.iter().map(|n| n.children.len()).sum()
    }

    pub fn depth(&self, idx: usize) -> usize {
        let mut depth = 0;
        let mut current = idx;
        while let Some(parent) = self.nodes[current].parent {
            depth += 1;
            current = parent;
        }
        depth
    }

    pub fn max_depth(&self) -> usize {
        self.leaves()
            .into_iter()
            .map(|leaf| self.depth(leaf))
            .max()
            .unwrap_or(0)
    }

    /// Node indices from the root down to `idx`, inclusive.
    pub fn path_from_root(&self, idx: usize) -> Vec<usize> {
        let mut path = vec![idx];
        let mut current = idx;
        while let Some(parent) = self.nodes[current].parent {
            path.push(parent);
            current = parent;
        }
        path.reverse();
        path
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GateCounts {
    pub and: usize,
    pub or: usize,
    pub sand: usize,
    pub none: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TreeStatistics {
    pub total_nodes: usize,
    pub leaf_nodes: usize,
    pub internal_nodes: usize,
    pub total_edges: usize,
    pub max_depth: usize,
    pub gate_counts: GateCounts,
    pub total_cost: u64,
    pub avg_time_span: f64,
    pub max_time_span: u32,
}

pub fn tree_statistics(tree: &AttackTree) -> TreeStatistics {
    let mut gate_counts = GateCounts::default();
    let mut total_cost = 0u64;
    let mut span_sum = 0u64;
    let mut max_time_span = 0u32;

    for node in tree.nodes() {
        match node.attrs.gate {
            Some(Gate::And) => gate_counts.and += 1,
            Some(Gate::Or) => gate_counts.or += 1,
            Some(Gate::Sand) => gate_counts.sand += 1,
            None => gate_counts.none += 1,
        }
        total_cost += u64::from(node.attrs.cost);
        let span = node.attrs.time_span();
        span_sum += u64::from(span);
        max_time_span = max_time_span.max(span);
    }

    let leaf_nodes = tree.leaves().len();
    TreeStatistics {
        total_nodes: tree.len(),
        leaf_nodes,
        internal_nodes: tree.len() - leaf_nodes,
        total_edges: tree.edge_count(),
        max_depth: tree.max_depth(),
        gate_counts,
        total_cost,
        avg_time_span: if tree.is_empty() {
            0.0
        } else {
            span_sum as f64 / tree.len() as f64
        },
        max_time_span,
    }
}

/// Structural problems with a tree; empty when the tree is valid.
pub fn validate_tree(tree: &AttackTree) -> Vec<String> {
    let mut issues = Vec::new();

    let roots = tree.nodes().iter().filter(|n| n.parent.is_none()).count();
    if roots != 1 {
        issues.push(format!("expected exactly one root, found {}", roots));
    }

    for (idx, node) in tree.nodes().iter().enumerate() {
        for &child in &node.children {
            if tree.node(child).parent != Some(idx) {
                issues.push(format!(
                    "node {} lists {} as child but parent link disagrees",
                    node.id,
                    tree.node(child).id
                ));
            }
        }
    }

    // BFS from the root must visit every node exactly once
    let mut seen = vec![false; tree.len()];
    let mut queue = VecDeque::from([tree.root()]);
    while let Some(idx) = queue.pop_front() {
        if seen[idx] {
            issues.push(format!("node {} reached twice (cycle)", tree.node(idx).id));
            continue;
        }
        seen[idx] = true;
        queue.extend(tree.node(idx).children.iter().copied());
    }
    for (idx, visited) in seen.iter().enumerate() {
        if !visited {
            issues.push(format!("node {} not reachable from root", tree.node(idx).id));
        }
    }

    for (idx, node) in tree.nodes().iter().enumerate() {
        let attrs = &node.attrs;
        if attrs.start() > attrs.end() {
            issues.push(format!("node {} has invalid time interval", node.id));
        }
        if tree.is_leaf(idx) {
            if attrs.gate.is_some() {
                issues.push(format!("leaf node {} should not have a gate", node.id));
            }
        } else if attrs.gate.is_none() {
            issues.push(format!("non-leaf node {} has no gate", node.id));
        }
    }

    issues
}
