// SPDX-License-Identifier: PMPL-1.0-or-later

//! Sequential batch runner
//!
//! Walks the configured identifier range in increasing order. Each tree ends
//! in exactly one terminal state, recorded as one CSV row plus one log file;
//! no per-tree failure stops the batch.

use super::{evaluate, render_log, OutcomeClassifier, ProcessVerifier, TreeInputs, Verifier};
use crate::config::HarnessConfig;
use crate::diagnostics;
use crate::results::ResultsWriter;
use crate::types::{tree_label, Outcome, OutcomeRow};
use anyhow::{bail, Context, Result};
use colored::*;
use serde::{Deserialize, Serialize};
use std::fs;

/// Running tally of terminal states
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchSummary {
    pub sat: usize,
    pub unsat: usize,
    pub timeout: usize,
    pub error: usize,
    pub missing: usize,
}

impl BatchSummary {
    pub fn record(&mut self, outcome: Outcome) {
        match outcome {
            Outcome::Sat => self.sat += 1,
            Outcome::Unsat => self.unsat += 1,
            Outcome::Timeout => self.timeout += 1,
            Outcome::Error => self.error += 1,
            Outcome::Missing => self.missing += 1,
        }
    }

    pub fn total(&self) -> usize {
        self.sat + self.unsat + self.timeout + self.error + self.missing
    }

    fn progress_counts(&self) -> String {
        format!(
            "SAT {} | UNSAT {} | TIMEOUT {} | ERROR {} | MISSING {}",
            self.sat, self.unsat, self.timeout, self.error, self.missing
        )
    }
}

pub fn colored_outcome(outcome: Outcome) -> ColoredString {
    match outcome {
        Outcome::Sat => outcome.as_str().green().bold(),
        Outcome::Unsat => outcome.as_str().blue().bold(),
        Outcome::Timeout => outcome.as_str().yellow().bold(),
        Outcome::Error => outcome.as_str().red().bold(),
        Outcome::Missing => outcome.as_str().dimmed(),
    }
}

pub struct Runner {
    config: HarnessConfig,
    verifier: Box<dyn Verifier>,
    classifier: OutcomeClassifier,
}

impl Runner {
    pub fn new(config: HarnessConfig) -> Result<Self> {
        let verifier = ProcessVerifier::new(config.verifier.clone());
        Self::with_verifier(config, Box::new(verifier))
    }

    pub fn with_verifier(config: HarnessConfig, verifier: Box<dyn Verifier>) -> Result<Self> {
        Ok(Self {
            config,
            verifier,
            classifier: OutcomeClassifier::new()?,
        })
    }

    fn inputs(&self, id: u32) -> TreeInputs {
        let label = tree_label(id, self.config.generator.id_width);
        TreeInputs {
            model: self.config.paths.model_file(&label),
            query: self.config.paths.query_file(&label),
            label,
        }
    }

    fn check_prerequisites(&self) -> Result<()> {
        let mut checks = self.verifier.preflight();
        checks.extend(diagnostics::input_checks(&self.config));

        if diagnostics::has_errors(&checks) {
            println!("{}", "Prerequisite check failed:".red().bold());
            diagnostics::print_checks(&checks);
            bail!("prerequisites for the verification run are not met");
        }
        for check in &checks {
            log::debug!("{}: {}", check.label, check.detail);
        }
        Ok(())
    }

    /// Process one tree: evaluate, append the row, write the log.
    fn process(&self, inputs: &TreeInputs, results: &mut ResultsWriter) -> Result<OutcomeRow> {
        let timeout = self.config.verifier.timeout();
        let (row, invocation) =
            evaluate(inputs, self.verifier.as_ref(), &self.classifier, timeout);
        results.append(&row)?;

        let log_path = self.config.paths.log_file(&inputs.label);
        let log_text = render_log(inputs, &row, invocation.as_ref());
        if let Err(err) = fs::write(&log_path, log_text) {
            log::warn!("could not write {}: {}", log_path.display(), err);
        }
        Ok(row)
    }

    pub fn run(&self) -> Result<BatchSummary> {
        self.check_prerequisites()?;

        let paths = &self.config.paths;
        fs::create_dir_all(&paths.logs)
            .with_context(|| format!("creating logs directory {}", paths.logs.display()))?;
        let mut results = ResultsWriter::create(&paths.results)?;

        let first = self.config.runner.first_id;
        let last = self.config.runner.last_id;
        let total = (first..=last).count();
        println!(
            "{} {} trees with {} (timeout {}s)",
            "Verifying".bold().cyan(),
            total,
            self.verifier.name(),
            self.config.verifier.timeout_secs
        );

        let mut summary = BatchSummary::default();
        for (index, id) in (first..=last).enumerate() {
            let inputs = self.inputs(id);
            let row = self.process(&inputs, &mut results)?;
            summary.record(row.outcome);
            println!(
                "[{:>4}/{}] {} {:<7} {:>8.3}s  {}",
                index + 1,
                total,
                row.model,
                colored_outcome(row.outcome),
                row.time_sec,
                summary.progress_counts().dimmed()
            );
        }

        print_tally(&summary, &paths.results.display().to_string());
        Ok(summary)
    }
}

pub fn print_tally(summary: &BatchSummary, results_path: &str) {
    println!();
    println!("{}", "BATCH COMPLETE".bold().yellow());
    println!("  Trees processed: {}", summary.total());
    for outcome in Outcome::all() {
        let count = match outcome {
            Outcome::Sat => summary.sat,
            Outcome::Unsat => summary.unsat,
            Outcome::Timeout => summary.timeout,
            Outcome::Error => summary.error,
            Outcome::Missing => summary.missing,
        };
        println!("  {:<8} {}", colored_outcome(outcome), count);
    }
    println!("  Results: {}", results_path);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_summary_records_each_outcome_once() {
        let mut summary = BatchSummary::default();
        for outcome in Outcome::all() {
            summary.record(outcome);
        }
        summary.record(Outcome::Timeout);
        assert_eq!(summary.timeout, 2);
        assert_eq!(summary.total(), 6);
    }
}
