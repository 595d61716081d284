// SPDX-License-Identifier: PMPL-1.0-or-later

//! Terminal rendering of a results summary

use crate::results::{ResultsSummary, TimingStats};
use crate::types::Outcome;
use crate::verify::runner::colored_outcome;
use colored::*;

const BAR_WIDTH: usize = 40;
const HISTOGRAM_BINS: usize = 10;

pub struct ReportFormatter;

impl ReportFormatter {
    pub fn new() -> Self {
        Self
    }

    pub fn print(&self, summary: &ResultsSummary, completed_times: &[f64]) {
        println!("\n{}", "=== VERIFICATION RESULTS ===".bold().cyan());
        println!();

        self.print_counts(summary);
        println!();

        self.print_bar_chart(summary);
        println!();

        self.print_timing(summary);
        println!();

        if !completed_times.is_empty() {
            self.print_histogram(completed_times);
            println!();
        }
    }

    fn print_counts(&self, summary: &ResultsSummary) {
        println!("{}", "OUTCOMES".bold().yellow());
        println!("  {:<8} {:>6} {:>8}", "result", "count", "share");
        for outcome in Outcome::all() {
            println!(
                "  {:<8} {:>6} {:>7.1}%",
                colored_outcome(outcome),
                summary.count(outcome),
                summary.share(outcome)
            );
        }
        println!("  {:<8} {:>6}", "answered", summary.completed());
        println!("  {:<8} {:>6}", "total", summary.total);
        if summary.malformed > 0 {
            println!(
                "  {}",
                format!("{} malformed rows skipped", summary.malformed).red()
            );
        }
    }

    fn print_bar_chart(&self, summary: &ResultsSummary) {
        println!("{}", "DISTRIBUTION".bold().yellow());
        let widest = Outcome::all()
            .iter()
            .map(|outcome| summary.count(*outcome))
            .max()
            .unwrap_or(0);
        for outcome in Outcome::all() {
            let count = summary.count(outcome);
            let bar = "#".repeat(scaled(count, widest, BAR_WIDTH));
            println!("  {:<8} {} {}", outcome.as_str(), bar, count);
        }
    }

    fn print_timing(&self, summary: &ResultsSummary) {
        println!("{}", "VERIFICATION TIME (SAT + UNSAT)".bold().yellow());
        match &summary.timing {
            Some(timing) => print_timing_table(timing),
            None => println!("  {}", "no completed verifications".dimmed()),
        }
        for (outcome, mean) in &summary.mean_by_outcome {
            println!("  mean {:<6} {:>10.3}s", outcome.as_str(), mean);
        }
    }

    fn print_histogram(&self, times: &[f64]) {
        println!("{}", "TIME HISTOGRAM".bold().yellow());
        for bin in histogram(times, HISTOGRAM_BINS) {
            println!(
                "  {:>9.3}-{:<9.3} {} {}",
                bin.lower,
                bin.upper,
                "#".repeat(bin.count.min(BAR_WIDTH)).cyan(),
                bin.count
            );
        }
    }
}

impl Default for ReportFormatter {
    fn default() -> Self {
        Self::new()
    }
}

fn print_timing_table(timing: &TimingStats) {
    println!("  samples  {:>10}", timing.count);
    println!("  mean     {:>10.3}s", timing.mean);
    println!("  median   {:>10.3}s", timing.median);
    println!("  p90      {:>10.3}s", timing.p90);
    println!("  p95      {:>10.3}s", timing.p95);
    println!("  min      {:>10.3}s", timing.min);
    println!("  max      {:>10.3}s", timing.max);
}

fn scaled(value: usize, widest: usize, width: usize) -> usize {
    if widest == 0 {
        0
    } else {
        (value * width + widest - 1) / widest
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct HistogramBin {
    pub lower: f64,
    pub upper: f64,
    pub count: usize,
}

/// Equal-width bins spanning `[min, max]` of the samples.
pub fn histogram(samples: &[f64], bins: usize) -> Vec<HistogramBin> {
    if samples.is_empty() || bins == 0 {
        return Vec::new();
    }
    let min = samples.iter().copied().fold(f64::INFINITY, f64::min);
    let max = samples.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    if max <= min {
        return vec![HistogramBin {
            lower: min,
            upper: max,
            count: samples.len(),
        }];
    }

    let width = (max - min) / bins as f64;
    let mut counts = vec![0usize; bins];
    for value in samples {
        let index = (((value - min) / width) as usize).min(bins - 1);
        counts[index] += 1;
    }
    counts
        .into_iter()
        .enumerate()
        .map(|(i, count)| HistogramBin {
            lower: min + width * i as f64,
            upper: min + width * (i + 1) as f64,
            count,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_histogram_places_max_in_last_bin() {
        let bins = histogram(&[0.0, 1.0, 2.0, 10.0], 5);
        assert_eq!(bins.len(), 5);
        assert_eq!(bins[0].count, 2);
        assert_eq!(bins[1].count, 1);
        assert_eq!(bins[4].count, 1);
        assert_eq!(bins.iter().map(|b| b.count).sum::<usize>(), 4);
    }

    #[test]
    fn test_histogram_degenerate_inputs() {
        assert!(histogram(&[], 10).is_empty());
        let single = histogram(&[3.0, 3.0], 10);
        assert_eq!(single.len(), 1);
        assert_eq!(single[0].count, 2);
    }

    #[test]
    fn test_bar_scaling_rounds_up() {
        assert_eq!(scaled(0, 10, 40), 0);
        assert_eq!(scaled(10, 10, 40), 40);
        assert_eq!(scaled(1, 100, 40), 1);
        assert_eq!(scaled(3, 0, 40), 0);
    }
}
