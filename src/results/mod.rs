// SPDX-License-Identifier: PMPL-1.0-or-later

//! Results table: the `model,result,time_sec` CSV written by the runner and
//! read back by the aggregator.

pub mod stats;

pub use stats::{summarize, ResultsSummary, TimingStats};

use crate::types::{Outcome, OutcomeRow};
use anyhow::{Context, Result};
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

pub const CSV_HEADER: &str = "model,result,time_sec";

fn csv_escape(input: &str) -> String {
    if input.contains(',') || input.contains('"') || input.contains('\n') || input.contains('\r') {
        format!("\"{}\"", input.replace('"', "\"\""))
    } else {
        input.to_string()
    }
}

pub fn format_row(row: &OutcomeRow) -> String {
    format!(
        "{},{},{:.3}",
        csv_escape(&row.model),
        row.outcome,
        row.time_sec
    )
}

/// Append-only CSV sink. Every row is flushed as soon as it is written so a
/// partially completed batch leaves a readable table behind.
pub struct ResultsWriter {
    path: PathBuf,
    out: BufWriter<File>,
}

impl ResultsWriter {
    /// Truncate `path` and write the header.
    pub fn create(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)
                    .with_context(|| format!("creating directory {}", parent.display()))?;
            }
        }
        let file =
            File::create(path).with_context(|| format!("creating results {}", path.display()))?;
        let mut writer = Self {
            path: path.to_path_buf(),
            out: BufWriter::new(file),
        };
        writer.write_line(CSV_HEADER)?;
        Ok(writer)
    }

    pub fn append(&mut self, row: &OutcomeRow) -> Result<()> {
        self.write_line(&format_row(row))
    }

    fn write_line(&mut self, line: &str) -> Result<()> {
        writeln!(self.out, "{}", line)
            .and_then(|_| self.out.flush())
            .with_context(|| format!("writing results {}", self.path.display()))
    }
}

/// Rows read back from a results CSV
#[derive(Debug, Clone, Default)]
pub struct ResultsTable {
    pub rows: Vec<ParsedRow>,
    /// Lines whose outcome is not one of the known states
    pub malformed: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ParsedRow {
    pub model: String,
    pub outcome: Outcome,
    /// `None` when the time column was absent or unparseable
    pub time_sec: Option<f64>,
}

/// Split one CSV line honouring double-quoted fields.
fn split_fields(line: &str) -> Vec<String> {
    let mut fields = Vec::new();
    let mut current = String::new();
    let mut quoted = false;
    let mut chars = line.chars().peekable();

    while let Some(ch) = chars.next() {
        match ch {
            '"' if quoted && chars.peek() == Some(&'"') => {
                current.push('"');
                chars.next();
            }
            '"' => quoted = !quoted,
            ',' if !quoted => fields.push(std::mem::take(&mut current)),
            _ => current.push(ch),
        }
    }
    fields.push(current);
    fields
}

pub fn parse_results(content: &str) -> ResultsTable {
    let mut table = ResultsTable::default();

    for (index, line) in content.lines().enumerate() {
        let line = line.trim_end_matches('\r');
        if line.trim().is_empty() {
            continue;
        }
        if index == 0 && line.trim() == CSV_HEADER {
            continue;
        }

        let fields = split_fields(line);
        let outcome = fields.get(1).and_then(|value| Outcome::parse(value));
        match outcome {
            Some(outcome) => {
                let time_sec = fields
                    .get(2)
                    .and_then(|value| value.trim().parse::<f64>().ok())
                    .filter(|value| value.is_finite() && *value >= 0.0);
                table.rows.push(ParsedRow {
                    model: fields[0].trim().to_string(),
                    outcome,
                    time_sec,
                });
            }
            None => {
                log::debug!("skipping malformed results line {}: {}", index + 1, line);
                table.malformed += 1;
            }
        }
    }

    table
}

pub fn read_results(path: &Path) -> Result<ResultsTable> {
    let content =
        fs::read_to_string(path).with_context(|| format!("reading results {}", path.display()))?;
    Ok(parse_results(&content))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_writer_formats_three_decimals() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("out").join("results.csv");
        let mut writer = ResultsWriter::create(&path).unwrap();
        writer
            .append(&OutcomeRow {
                model: "tree_001".into(),
                outcome: Outcome::Sat,
                time_sec: 1.23456,
            })
            .unwrap();
        writer.append(&OutcomeRow::missing("tree_002")).unwrap();

        let content = fs::read_to_string(&path).unwrap();
        assert_eq!(
            content,
            "model,result,time_sec\ntree_001,SAT,1.235\ntree_002,MISSING,0.000\n"
        );
    }

    #[test]
    fn test_create_truncates_previous_results() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("results.csv");
        fs::write(&path, "stale,rows\n").unwrap();
        ResultsWriter::create(&path).unwrap();
        assert_eq!(fs::read_to_string(&path).unwrap(), "model,result,time_sec\n");
    }

    #[test]
    fn test_lenient_parse() {
        let table = parse_results(
            "model,result,time_sec\n\
             tree_001,SAT,0.500\n\
             tree_002,unsat,1.5\n\
             tree_003,TIMEOUT,oops\n\
             tree_004,MAYBE,1.0\n\
             truncated\n\
             \n",
        );
        assert_eq!(table.rows.len(), 3);
        assert_eq!(table.malformed, 2);
        assert_eq!(table.rows[1].outcome, Outcome::Unsat);
        assert_eq!(table.rows[2].time_sec, None);
    }

    #[test]
    fn test_quoted_fields() {
        assert_eq!(
            split_fields(r#""tree,1",SAT,"0.1""#),
            vec!["tree,1", "SAT", "0.1"]
        );
        assert_eq!(csv_escape("a\"b"), "\"a\"\"b\"");
    }
}
