// SPDX-License-Identifier: PMPL-1.0-or-later

//! Summary rendering: terminal tables, SVG chart and JSON/YAML export

pub mod chart;
pub mod formatter;
pub mod output;

use crate::results::{self, ResultsSummary};
use anyhow::Result;
use std::path::Path;

pub use formatter::ReportFormatter;
pub use output::ReportOutputFormat;

/// Read a results CSV, summarize it and print the terminal report.
pub fn summarize_file(path: &Path) -> Result<ResultsSummary> {
    let table = results::read_results(path)?;
    let summary = results::summarize(&table);
    let formatter = ReportFormatter::new();
    formatter.print(&summary, &ResultsSummary::completed_times(&table));
    Ok(summary)
}
