// SPDX-License-Identifier: PMPL-1.0-or-later

//! Verification runner: drive the external verifier over a batch of trees.

pub mod classify;
pub mod process;
pub mod runner;

pub use classify::{OutcomeClassifier, Verdict};
pub use process::ProcessVerifier;
pub use runner::{BatchSummary, Runner};

use crate::diagnostics::Diagnostic;
use crate::types::{Outcome, OutcomeRow};
use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

/// The model/query pair for one tree identifier
#[derive(Debug, Clone)]
pub struct TreeInputs {
    pub label: String,
    pub model: PathBuf,
    pub query: PathBuf,
}

impl TreeInputs {
    pub fn is_complete(&self) -> bool {
        self.model.is_file() && self.query.is_file()
    }
}

/// How a verifier process ended
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExitKind {
    Exited(i32),
    /// Terminated by a signal we did not send
    Signaled(Option<i32>),
    /// Killed by us at the deadline
    TimedOut,
    SpawnFailed(String),
}

impl fmt::Display for ExitKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExitKind::Exited(code) => write!(f, "exit code {}", code),
            ExitKind::Signaled(Some(signal)) => write!(f, "killed by signal {}", signal),
            ExitKind::Signaled(None) => write!(f, "terminated abnormally"),
            ExitKind::TimedOut => write!(f, "timed out"),
            ExitKind::SpawnFailed(reason) => write!(f, "failed to start: {}", reason),
        }
    }
}

/// Everything observed from one verifier run
#[derive(Debug, Clone)]
pub struct Invocation {
    pub command: String,
    pub exit: ExitKind,
    pub stdout: String,
    pub stderr: String,
    pub elapsed: Duration,
}

/// Side-effecting boundary around the external verifier
pub trait Verifier {
    /// Human-readable tool name for progress output
    fn name(&self) -> String;

    fn invoke(&self, inputs: &TreeInputs, timeout: Duration) -> Invocation;

    /// Checks that must pass before the first invocation
    fn preflight(&self) -> Vec<Diagnostic> {
        Vec::new()
    }
}

/// Verify one tree. No process is launched when an input file is absent.
pub fn evaluate(
    inputs: &TreeInputs,
    verifier: &dyn Verifier,
    classifier: &OutcomeClassifier,
    timeout: Duration,
) -> (OutcomeRow, Option<Invocation>) {
    if !inputs.is_complete() {
        return (OutcomeRow::missing(&inputs.label), None);
    }

    let invocation = verifier.invoke(inputs, timeout);
    let outcome = classifier.classify(&invocation);
    let row = OutcomeRow {
        model: inputs.label.clone(),
        outcome,
        time_sec: invocation.elapsed.as_secs_f64(),
    };
    (row, Some(invocation))
}

/// Raw log text for one tree
pub fn render_log(inputs: &TreeInputs, row: &OutcomeRow, invocation: Option<&Invocation>) -> String {
    let mut log = String::new();
    log.push_str(&format!("# {}\n", inputs.label));
    log.push_str(&format!("# recorded: {}\n", chrono::Utc::now().to_rfc3339()));
    log.push_str(&format!("# model: {}\n", inputs.model.display()));
    log.push_str(&format!("# query: {}\n", inputs.query.display()));
    match invocation {
        Some(inv) => {
            log.push_str(&format!("# command: {}\n", inv.command));
            log.push_str(&format!("# status: {}\n", inv.exit));
            log.push_str(&format!("# elapsed: {:.3}s\n", inv.elapsed.as_secs_f64()));
            log.push_str(&format!("# outcome: {}\n", row.outcome));
            log.push_str("\n--- stdout ---\n");
            log.push_str(&inv.stdout);
            log.push_str("\n--- stderr ---\n");
            log.push_str(&inv.stderr);
        }
        None => {
            log.push_str(&format!("# outcome: {}\n", Outcome::Missing));
            if !inputs.model.is_file() {
                log.push_str("missing model file\n");
            }
            if !inputs.query.is_file() {
                log.push_str("missing query file\n");
            }
        }
    }
    log
}
