// SPDX-License-Identifier: PMPL-1.0-or-later

//! Timed-arc Petri net built from an attack tree.

use crate::tree::AttackTree;
use crate::types::Gate;
use std::collections::{HashMap, HashSet, VecDeque};

/// Token age interval on a timed input arc; `None` upper bound means `inf`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AgeInterval {
    pub lower: u32,
    pub upper: Option<u32>,
}

impl AgeInterval {
    pub const ANY: AgeInterval = AgeInterval {
        lower: 0,
        upper: None,
    };

    pub fn closed(lower: u32, upper: u32) -> Self {
        Self {
            lower,
            upper: Some(upper),
        }
    }

    pub fn inscription(&self) -> String {
        match self.upper {
            Some(upper) => format!("[{},{}]", self.lower, upper),
            None => format!("[{},inf)", self.lower),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ArcKind {
    /// place -> transition, consumes a token whose age lies in the interval
    Timed(AgeInterval),
    /// transition -> place
    Output,
    /// place -> transition, disables the transition while the place is marked
    Inhibitor,
}

#[derive(Debug, Clone)]
pub struct Place {
    pub id: String,
    pub initial_marking: u32,
    pub x: u32,
    pub y: u32,
}

#[derive(Debug, Clone)]
pub struct Transition {
    pub id: String,
    pub x: u32,
    pub y: u32,
}

#[derive(Debug, Clone)]
pub struct Arc {
    pub id: String,
    pub source: String,
    pub target: String,
    pub kind: ArcKind,
}

#[derive(Debug, Clone)]
pub struct PetriNet {
    pub id: String,
    pub name: String,
    pub places: Vec<Place>,
    pub transitions: Vec<Transition>,
    pub arcs: Vec<Arc>,
}

pub fn compromised_place(node_id: &str) -> String {
    format!("compromised_{}", node_id)
}

pub fn can_attack_place(node_id: &str) -> String {
    format!("can_attack_{}", node_id)
}

const GRID_STEP_X: u32 = 150;
const GRID_STEP_Y: u32 = 100;
const GRID_WIDTH: u32 = 600;

struct NetBuilder {
    net: PetriNet,
    cursor: (u32, u32),
}

impl NetBuilder {
    fn next_position(&mut self) -> (u32, u32) {
        let pos = self.cursor;
        self.cursor.0 += GRID_STEP_X;
        if self.cursor.0 > GRID_WIDTH {
            self.cursor.0 = 0;
            self.cursor.1 += GRID_STEP_Y;
        }
        pos
    }

    fn place(&mut self, id: String, initial_marking: u32) {
        let (x, y) = self.next_position();
        self.net.places.push(Place {
            id,
            initial_marking,
            x,
            y,
        });
    }

    fn transition(&mut self, id: String) {
        let (x, y) = self.next_position();
        self.net.transitions.push(Transition { id, x, y });
    }

    fn arc(&mut self, source: &str, target: &str, kind: ArcKind) {
        let suffix = match kind {
            ArcKind::Inhibitor => "_inhib",
            _ => "",
        };
        self.net.arcs.push(Arc {
            id: format!("{}_to_{}{}", source, target, suffix),
            source: source.to_string(),
            target: target.to_string(),
            kind,
        });
    }

    /// Read `place` from `transition`: consume and immediately return the token.
    fn read(&mut self, place: &str, transition: &str) {
        self.arc(place, transition, ArcKind::Timed(AgeInterval::ANY));
        self.arc(transition, place, ArcKind::Output);
    }

    /// `transition` marks `place` and is inhibited once it is marked.
    fn produce_once(&mut self, transition: &str, place: &str) {
        self.arc(transition, place, ArcKind::Output);
        self.arc(place, transition, ArcKind::Inhibitor);
    }
}

/// Encode `tree` as a net in which `compromised_<node>` becomes marked once
/// the node's gate is satisfied.
pub fn build_net(tree: &AttackTree, tree_id: &str) -> PetriNet {
    let mut b = NetBuilder {
        net: PetriNet {
            id: format!("tree_{}", tree_id),
            name: format!("Attack Tree {}", tree_id),
            places: Vec::new(),
            transitions: Vec::new(),
            arcs: Vec::new(),
        },
        cursor: (0, 0),
    };

    for node in tree.nodes() {
        b.place(compromised_place(&node.id), 0);
    }
    for idx in tree.leaves() {
        b.place(can_attack_place(&tree.node(idx).id), 1);
    }

    for (idx, node) in tree.nodes().iter().enumerate() {
        let target = compromised_place(&node.id);
        let children: Vec<&str> = node
            .children
            .iter()
            .map(|&c| tree.node(c).id.as_str())
            .collect();

        match node.attrs.gate {
            _ if tree.is_leaf(idx) => {
                let t = format!("attack_{}", node.id);
                b.transition(t.clone());
                let window = AgeInterval::closed(
                    node.attrs.start(),
                    node.attrs.start() + node.attrs.duration,
                );
                b.arc(&can_attack_place(&node.id), &t, ArcKind::Timed(window));
                b.produce_once(&t, &target);
            }
            Some(Gate::Or) => {
                for child in &children {
                    let t = format!("attack_{}__{}", node.id, child);
                    b.transition(t.clone());
                    b.read(&compromised_place(child), &t);
                    b.produce_once(&t, &target);
                }
            }
            Some(Gate::Sand) => {
                let mut previous_stage: Option<String> = None;
                for (step, child) in children.iter().enumerate() {
                    let t = format!("attack_{}__step{}", node.id, step + 1);
                    b.transition(t.clone());
                    b.read(&compromised_place(child), &t);
                    if let Some(stage) = &previous_stage {
                        b.arc(stage, &t, ArcKind::Timed(AgeInterval::ANY));
                    }
                    if step + 1 == children.len() {
                        b.produce_once(&t, &target);
                    } else {
                        let stage = format!("stage_{}_{}", node.id, step + 1);
                        b.place(stage.clone(), 0);
                        b.produce_once(&t, &stage);
                        previous_stage = Some(stage);
                    }
                }
            }
            // AND, and an internal node that lost its gate, require every child
            Some(Gate::And) | None => {
                let t = format!("attack_{}", node.id);
                b.transition(t.clone());
                for child in &children {
                    b.read(&compromised_place(child), &t);
                }
                b.produce_once(&t, &target);
            }
        }
    }

    b.net
}

impl PetriNet {
    fn is_place(&self, id: &str) -> bool {
        self.places.iter().any(|p| p.id == id)
    }

    fn is_transition(&self, id: &str) -> bool {
        self.transitions.iter().any(|t| t.id == id)
    }

    /// `compromised_*` places that no other node's transition reads.
    pub fn root_places(&self) -> Vec<&str> {
        let mut read_by_others: HashSet<&str> = HashSet::new();
        for arc in &self.arcs {
            if let ArcKind::Timed(_) = arc.kind {
                let owner = arc.source.trim_start_matches("compromised_");
                if arc.source.starts_with("compromised_")
                    && !transition_belongs_to(&arc.target, owner)
                {
                    read_by_others.insert(arc.source.as_str());
                }
            }
        }
        self.places
            .iter()
            .map(|p| p.id.as_str())
            .filter(|id| id.starts_with("compromised_") && !read_by_others.contains(id))
            .collect()
    }

    /// Places reachable from `start` by firing transitions (inhibitors ignored).
    pub fn reachable_from(&self, start: &str) -> HashSet<String> {
        let mut forward: HashMap<&str, Vec<&str>> = HashMap::new();
        for arc in &self.arcs {
            if arc.kind != ArcKind::Inhibitor {
                forward
                    .entry(arc.source.as_str())
                    .or_default()
                    .push(arc.target.as_str());
            }
        }
        let mut seen = HashSet::new();
        let mut queue = VecDeque::from([start]);
        while let Some(node) = queue.pop_front() {
            if !seen.insert(node.to_string()) {
                continue;
            }
            if let Some(next) = forward.get(node) {
                queue.extend(next.iter().copied());
            }
        }
        seen.retain(|id| self.is_place(id));
        seen
    }
}

fn transition_belongs_to(transition: &str, node_id: &str) -> bool {
    let own = format!("attack_{}", node_id);
    transition == own || transition.starts_with(&format!("{}__", own))
}

/// Well-formedness problems of `net`; empty when the verifier can load it.
pub fn validate_net(net: &PetriNet) -> Vec<String> {
    let mut issues = Vec::new();

    let mut ids = HashSet::new();
    for id in net
        .places
        .iter()
        .map(|p| &p.id)
        .chain(net.transitions.iter().map(|t| &t.id))
    {
        if !ids.insert(id.as_str()) {
            issues.push(format!("duplicate element id {}", id));
        }
    }

    let mut arc_ids = HashSet::new();
    for arc in &net.arcs {
        if !arc_ids.insert(arc.id.as_str()) {
            issues.push(format!("duplicate arc id {}", arc.id));
        }
        let (place, transition) = match arc.kind {
            ArcKind::Output => (&arc.target, &arc.source),
            _ => (&arc.source, &arc.target),
        };
        if !net.is_place(place) {
            issues.push(format!("arc {} references unknown place {}", arc.id, place));
        }
        if !net.is_transition(transition) {
            issues.push(format!(
                "arc {} references unknown transition {}",
                arc.id, transition
            ));
        }
    }

    let roots = net.root_places();
    if roots.len() != 1 {
        issues.push(format!("expected exactly one root place, found {:?}", roots));
        return issues;
    }
    let root = roots[0];
    for place in net.places.iter().filter(|p| p.id.starts_with("can_attack_")) {
        if !net.reachable_from(&place.id).contains(root) {
            issues.push(format!("root {} unreachable from {}", root, place.id));
        }
    }

    issues
}
