// SPDX-License-Identifier: PMPL-1.0-or-later

//! SVG bar chart of outcome counts

use crate::results::ResultsSummary;
use crate::tapaal::xml_escape;
use crate::types::Outcome;
use anyhow::{Context, Result};
use std::fmt::Write as _;
use std::fs;
use std::path::Path;

const WIDTH: u32 = 640;
const HEIGHT: u32 = 400;
const MARGIN: u32 = 50;

fn fill(outcome: Outcome) -> &'static str {
    match outcome {
        Outcome::Sat => "#2e7d32",
        Outcome::Unsat => "#1565c0",
        Outcome::Timeout => "#f9a825",
        Outcome::Error => "#c62828",
        Outcome::Missing => "#9e9e9e",
    }
}

pub fn outcome_chart_svg(summary: &ResultsSummary, title: &str) -> String {
    let outcomes = Outcome::all();
    let plot_width = WIDTH - 2 * MARGIN;
    let plot_height = HEIGHT - 2 * MARGIN;
    let slot = plot_width / outcomes.len() as u32;
    let bar_width = slot * 3 / 5;
    let tallest = outcomes
        .iter()
        .map(|outcome| summary.count(*outcome))
        .max()
        .unwrap_or(0)
        .max(1);
    let baseline = HEIGHT - MARGIN;

    let mut svg = String::new();
    // fmt::Write on String is infallible
    let _ = writeln!(
        svg,
        r#"<svg xmlns="http://www.w3.org/2000/svg" width="{w}" height="{h}" viewBox="0 0 {w} {h}">"#,
        w = WIDTH,
        h = HEIGHT
    );
    let _ = writeln!(svg, r#"  <rect width="100%" height="100%" fill="white"/>"#);
    let _ = writeln!(
        svg,
        r#"  <text x="{}" y="{}" text-anchor="middle" font-family="sans-serif" font-size="16">{}</text>"#,
        WIDTH / 2,
        MARGIN / 2 + 6,
        xml_escape(title)
    );
    let _ = writeln!(
        svg,
        r#"  <line x1="{m}" y1="{b}" x2="{r}" y2="{b}" stroke="black"/>"#,
        m = MARGIN,
        b = baseline,
        r = WIDTH - MARGIN
    );

    for (i, outcome) in outcomes.iter().enumerate() {
        let count = summary.count(*outcome);
        let height = (count as u64 * u64::from(plot_height) / tallest as u64) as u32;
        let x = MARGIN + slot * i as u32 + (slot - bar_width) / 2;
        let y = baseline - height;
        let center = x + bar_width / 2;

        let _ = writeln!(
            svg,
            r#"  <rect x="{}" y="{}" width="{}" height="{}" fill="{}"/>"#,
            x,
            y,
            bar_width,
            height,
            fill(*outcome)
        );
        let _ = writeln!(
            svg,
            r#"  <text x="{}" y="{}" text-anchor="middle" font-family="sans-serif" font-size="12">{}</text>"#,
            center,
            y.saturating_sub(6),
            count
        );
        let _ = writeln!(
            svg,
            r#"  <text x="{}" y="{}" text-anchor="middle" font-family="sans-serif" font-size="12">{}</text>"#,
            center,
            baseline + 18,
            outcome.as_str()
        );
    }

    svg.push_str("</svg>\n");
    svg
}

pub fn save_chart(summary: &ResultsSummary, title: &str, path: &Path) -> Result<()> {
    fs::write(path, outcome_chart_svg(summary, title))
        .with_context(|| format!("writing chart {}", path.display()))?;
    println!("Chart saved to: {}", path.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::results::{parse_results, summarize};

    #[test]
    fn test_one_bar_per_outcome() {
        let summary = summarize(&parse_results(
            "tree_001,SAT,1.0\ntree_002,SAT,2.0\ntree_003,ERROR,0.1\n",
        ));
        let svg = outcome_chart_svg(&summary, "Results <batch>");
        assert!(svg.starts_with("<svg"));
        assert_eq!(svg.matches("<rect x=").count(), 5);
        assert!(svg.contains("Results &lt;batch&gt;"));
        assert!(svg.contains(">MISSING</text>"));
    }

    #[test]
    fn test_empty_summary_renders() {
        let summary = summarize(&parse_results(""));
        let svg = outcome_chart_svg(&summary, "empty");
        assert!(svg.trim_end().ends_with("</svg>"));
    }
}
