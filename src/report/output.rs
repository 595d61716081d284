// SPDX-License-Identifier: PMPL-1.0-or-later

//! Serialization helpers for exported summaries

use crate::results::ResultsSummary;
use anyhow::{Context, Result};
use clap::ValueEnum;
use std::fs;
use std::path::Path;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ReportOutputFormat {
    Json,
    Yaml,
}

impl ReportOutputFormat {
    pub fn parse(value: &str) -> Option<Self> {
        match value.to_ascii_lowercase().as_str() {
            "json" => Some(ReportOutputFormat::Json),
            "yaml" | "yml" => Some(ReportOutputFormat::Yaml),
            _ => None,
        }
    }

    /// Format implied by an output file's extension.
    pub fn from_path(path: &Path) -> Option<Self> {
        path.extension()
            .and_then(|ext| ext.to_str())
            .and_then(Self::parse)
    }

    pub fn serialize(&self, summary: &ResultsSummary) -> Result<String> {
        match self {
            ReportOutputFormat::Json => Ok(serde_json::to_string_pretty(summary)?),
            ReportOutputFormat::Yaml => Ok(serde_yaml::to_string(summary)?),
        }
    }
}

pub fn save_summary(summary: &ResultsSummary, format: ReportOutputFormat, path: &Path) -> Result<()> {
    let content = format.serialize(summary)?;
    fs::write(path, content).with_context(|| format!("writing summary {}", path.display()))?;
    println!("Summary saved to: {}", path.display());
    Ok(())
}
