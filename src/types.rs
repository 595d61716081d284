// SPDX-License-Identifier: PMPL-1.0-or-later

//! Core type definitions shared by the generator, runner and aggregator.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Gate combining the children of an internal attack-tree node
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Gate {
    /// Every child must be compromised
    And,
    /// Any child suffices
    Or,
    /// Every child, in order
    Sand,
}

impl Gate {
    pub fn as_str(&self) -> &'static str {
        match self {
            Gate::And => "AND",
            Gate::Or => "OR",
            Gate::Sand => "SAND",
        }
    }
}

impl fmt::Display for Gate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Timing and cost attributes attached to every tree node
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeAttrs {
    /// `[start, end]` window in model time units (hours for the use case)
    pub time_interval: [u32; 2],
    pub duration: u32,
    pub cost: u32,
    /// `None` for leaves
    pub gate: Option<Gate>,
}

impl NodeAttrs {
    pub fn leaf(start: u32, end: u32, duration: u32, cost: u32) -> Self {
        Self {
            time_interval: [start, end],
            duration,
            cost,
            gate: None,
        }
    }

    pub fn gate(gate: Gate, start: u32, end: u32, duration: u32, cost: u32) -> Self {
        Self {
            time_interval: [start, end],
            duration,
            cost,
            gate: Some(gate),
        }
    }

    pub fn start(&self) -> u32 {
        self.time_interval[0]
    }

    pub fn end(&self) -> u32 {
        self.time_interval[1]
    }

    pub fn time_span(&self) -> u32 {
        self.end().saturating_sub(self.start())
    }
}

/// Terminal state of one tree's verification
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Outcome {
    Sat,
    Unsat,
    Timeout,
    Error,
    Missing,
}

impl Outcome {
    pub fn all() -> [Outcome; 5] {
        [
            Outcome::Sat,
            Outcome::Unsat,
            Outcome::Timeout,
            Outcome::Error,
            Outcome::Missing,
        ]
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Outcome::Sat => "SAT",
            Outcome::Unsat => "UNSAT",
            Outcome::Timeout => "TIMEOUT",
            Outcome::Error => "ERROR",
            Outcome::Missing => "MISSING",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_uppercase().as_str() {
            "SAT" => Some(Outcome::Sat),
            "UNSAT" => Some(Outcome::Unsat),
            "TIMEOUT" => Some(Outcome::Timeout),
            "ERROR" => Some(Outcome::Error),
            "MISSING" => Some(Outcome::Missing),
            _ => None,
        }
    }

    /// The verifier reached a verdict; only these rows feed timing statistics.
    pub fn is_completed(&self) -> bool {
        matches!(self, Outcome::Sat | Outcome::Unsat)
    }
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One line of the results table
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutcomeRow {
    pub model: String,
    pub outcome: Outcome,
    pub time_sec: f64,
}

impl OutcomeRow {
    pub fn missing(model: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            outcome: Outcome::Missing,
            time_sec: 0.0,
        }
    }
}

/// Zero-padded label tying a model, query, result row and log together.
pub fn tree_label(id: u32, width: usize) -> String {
    format!("tree_{:0width$}", id, width = width)
}
