// SPDX-License-Identifier: PMPL-1.0-or-later

//! CTL query generation

use super::net::compromised_place;
use crate::tree::AttackTree;

/// Every internal node models an observable system state.
pub fn select_observable_nodes(tree: &AttackTree) -> Vec<usize> {
    tree.internal_nodes()
}

fn marked(node_id: &str) -> String {
    format!("{} >= 1", compromised_place(node_id))
}

/// Weak-diagnosability reachability query: some run marks every observable
/// node together with the root goal.
pub fn diagnosability_query(tree: &AttackTree, observable: &[usize], tree_id: &str) -> String {
    let root = marked(tree.root_id());
    let formula = if observable.is_empty() {
        format!("EF ({})", root)
    } else {
        let mut conditions: Vec<String> = observable
            .iter()
            .filter(|&&idx| idx != tree.root())
            .map(|&idx| marked(&tree.node(idx).id))
            .collect();
        conditions.push(root);
        format!("EF ({})", conditions.join(" and "))
    };
    format!("// Diagnosability query for tree {}\n{}\n", tree_id, formula)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Gate, NodeAttrs};

    #[test]
    fn test_query_includes_observables_and_root() {
        let mut tree = AttackTree::new("r", NodeAttrs::gate(Gate::And, 0, 5, 1, 1));
        let mid = tree
            .add_child(0, "m", NodeAttrs::gate(Gate::Or, 0, 5, 1, 1))
            .unwrap();
        tree.add_child(mid, "l", NodeAttrs::leaf(0, 3, 1, 1)).unwrap();

        let observable = select_observable_nodes(&tree);
        let query = diagnosability_query(&tree, &observable, "003");
        assert_eq!(
            query,
            "// Diagnosability query for tree 003\nEF (compromised_m >= 1 and compromised_r >= 1)\n"
        );
    }

    #[test]
    fn test_query_without_observables() {
        let tree = AttackTree::new("solo", NodeAttrs::leaf(0, 3, 1, 1));
        let query = diagnosability_query(&tree, &[], "1");
        assert!(query.ends_with("EF (compromised_solo >= 1)\n"));
    }
}
