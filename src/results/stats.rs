// SPDX-License-Identifier: PMPL-1.0-or-later

//! Outcome counts and timing statistics over a results table.

use super::ResultsTable;
use crate::types::Outcome;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimingStats {
    pub count: usize,
    pub mean: f64,
    pub median: f64,
    pub p90: f64,
    pub p95: f64,
    pub min: f64,
    pub max: f64,
}

impl TimingStats {
    /// `None` for an empty sample.
    pub fn from_samples(samples: &[f64]) -> Option<Self> {
        if samples.is_empty() {
            return None;
        }
        let mut sorted = samples.to_vec();
        sorted.sort_by(|a, b| a.total_cmp(b));

        Some(Self {
            count: sorted.len(),
            mean: sorted.iter().sum::<f64>() / sorted.len() as f64,
            median: percentile(&sorted, 50.0),
            p90: percentile(&sorted, 90.0),
            p95: percentile(&sorted, 95.0),
            min: sorted[0],
            max: sorted[sorted.len() - 1],
        })
    }
}

/// Percentile of an ascending, non-empty slice with linear interpolation
/// between the closest ranks.
pub fn percentile(sorted: &[f64], pct: f64) -> f64 {
    if sorted.len() == 1 {
        return sorted[0];
    }
    let rank = (pct.clamp(0.0, 100.0) / 100.0) * (sorted.len() - 1) as f64;
    let lower = rank.floor() as usize;
    let upper = rank.ceil() as usize;
    let weight = rank - lower as f64;
    sorted[lower] + (sorted[upper] - sorted[lower]) * weight
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResultsSummary {
    pub generated_at: String,
    pub total: usize,
    pub malformed: usize,
    pub counts: BTreeMap<Outcome, usize>,
    /// Over SAT and UNSAT rows with a readable time
    pub timing: Option<TimingStats>,
    pub mean_by_outcome: BTreeMap<Outcome, f64>,
}

impl ResultsSummary {
    pub fn count(&self, outcome: Outcome) -> usize {
        self.counts.get(&outcome).copied().unwrap_or(0)
    }

    pub fn completed(&self) -> usize {
        self.count(Outcome::Sat) + self.count(Outcome::Unsat)
    }

    /// Share of rows in `outcome`, in percent.
    pub fn share(&self, outcome: Outcome) -> f64 {
        if self.total == 0 {
            0.0
        } else {
            self.count(outcome) as f64 * 100.0 / self.total as f64
        }
    }

    /// Completed-verification times, for the histogram.
    pub fn completed_times(table: &ResultsTable) -> Vec<f64> {
        table
            .rows
            .iter()
            .filter(|row| row.outcome.is_completed())
            .filter_map(|row| row.time_sec)
            .collect()
    }
}

pub fn summarize(table: &ResultsTable) -> ResultsSummary {
    let mut counts: BTreeMap<Outcome, usize> =
        Outcome::all().iter().map(|outcome| (*outcome, 0)).collect();
    for row in &table.rows {
        *counts.entry(row.outcome).or_insert(0) += 1;
    }

    let mut mean_by_outcome = BTreeMap::new();
    for outcome in [Outcome::Sat, Outcome::Unsat] {
        let times: Vec<f64> = table
            .rows
            .iter()
            .filter(|row| row.outcome == outcome)
            .filter_map(|row| row.time_sec)
            .collect();
        if !times.is_empty() {
            mean_by_outcome.insert(outcome, times.iter().sum::<f64>() / times.len() as f64);
        }
    }

    ResultsSummary {
        generated_at: chrono::Utc::now().to_rfc3339(),
        total: table.rows.len(),
        malformed: table.malformed,
        counts,
        timing: TimingStats::from_samples(&ResultsSummary::completed_times(table)),
        mean_by_outcome,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::results::parse_results;

    #[test]
    fn test_percentile_interpolates() {
        let sorted = [1.0, 2.0, 3.0, 4.0];
        assert!((percentile(&sorted, 50.0) - 2.5).abs() < 1e-9);
        assert!((percentile(&sorted, 90.0) - 3.7).abs() < 1e-9);
        assert_eq!(percentile(&sorted, 0.0), 1.0);
        assert_eq!(percentile(&sorted, 100.0), 4.0);
        assert_eq!(percentile(&[7.5], 95.0), 7.5);
    }

    #[test]
    fn test_counts_and_mean_exclude_timeouts_and_errors() {
        let table = parse_results(
            "model,result,time_sec\n\
             tree_001,SAT,1.000\n\
             tree_002,SAT,2.000\n\
             tree_003,SAT,3.000\n\
             tree_004,UNSAT,4.000\n\
             tree_005,UNSAT,5.000\n\
             tree_006,TIMEOUT,60.000\n\
             tree_007,ERROR,0.200\n",
        );
        let summary = summarize(&table);

        assert_eq!(summary.total, 7);
        assert_eq!(summary.count(Outcome::Sat), 3);
        assert_eq!(summary.count(Outcome::Unsat), 2);
        assert_eq!(summary.count(Outcome::Timeout), 1);
        assert_eq!(summary.count(Outcome::Error), 1);
        assert_eq!(summary.count(Outcome::Missing), 0);
        assert_eq!(summary.completed(), 5);

        let timing = summary.timing.unwrap();
        assert_eq!(timing.count, 5);
        assert!((timing.mean - 3.0).abs() < 1e-9);
        assert_eq!(timing.max, 5.0);
        assert!((summary.mean_by_outcome[&Outcome::Sat] - 2.0).abs() < 1e-9);
        assert!((summary.mean_by_outcome[&Outcome::Unsat] - 4.5).abs() < 1e-9);
    }

    #[test]
    fn test_no_completed_rows() {
        let table = parse_results("model,result,time_sec\ntree_001,MISSING,0.000\n");
        let summary = summarize(&table);
        assert!(summary.timing.is_none());
        assert_eq!(summary.completed(), 0);
        assert_eq!(summary.share(Outcome::Missing), 100.0);
        assert!(summary.mean_by_outcome.is_empty());
    }
}
