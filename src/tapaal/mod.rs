// SPDX-License-Identifier: PMPL-1.0-or-later

//! TAPAAL model and query generation for attack trees.

pub mod net;
pub mod query;
pub mod xml;

pub use net::{build_net, validate_net, PetriNet};
pub use query::{diagnosability_query, select_observable_nodes};
pub use xml::{net_to_xml, xml_escape};

use crate::tree::AttackTree;

/// Timed-arc Petri net XML for `tree`
pub fn model_xml(tree: &AttackTree, tree_id: &str) -> String {
    net_to_xml(&build_net(tree, tree_id))
}
