// SPDX-License-Identifier: PMPL-1.0-or-later

//! Batch generation of model/query file pairs
//!
//! Draws each tree's size from a batch RNG, builds the tree with its own
//! seed, and writes `models/tree_NNN.xml` plus `queries/tree_NNN.q`. A
//! metadata summary of the whole batch is written alongside.

use crate::config::{GeneratorConfig, PathsConfig};
use crate::tapaal;
use crate::tree::{self, TreeStatistics};
use crate::types::tree_label;
use anyhow::{bail, Context, Result};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TreeInfo {
    pub tree_id: u32,
    pub label: String,
    pub num_nodes: usize,
    pub observable_nodes: usize,
    pub observable_coverage: f64,
    pub xml_file: PathBuf,
    pub query_file: PathBuf,
    pub stats: TreeStatistics,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValueRange<T> {
    pub min: T,
    pub max: T,
    pub avg: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerationReport {
    pub created_at: String,
    pub seed: u64,
    pub total_trees: usize,
    pub node_count_range: Option<ValueRange<usize>>,
    pub observable_coverage: Option<ValueRange<f64>>,
    pub trees: Vec<TreeInfo>,
}

fn ensure_dir(path: &Path) -> Result<()> {
    fs::create_dir_all(path).with_context(|| format!("creating directory {}", path.display()))
}

pub fn generate_batch(config: &GeneratorConfig, paths: &PathsConfig) -> Result<GenerationReport> {
    ensure_dir(&paths.models)?;
    ensure_dir(&paths.queries)?;

    let shape = config.shape();
    let mut batch_rng = ChaCha8Rng::seed_from_u64(config.seed);
    let mut trees = Vec::with_capacity(config.count as usize);

    for offset in 0..config.count {
        let Some(tree_id) = config.first_id.checked_add(offset) else {
            bail!(
                "tree id overflows: first_id {} + {} trees",
                config.first_id,
                config.count
            );
        };
        let label = tree_label(tree_id, config.id_width);
        let num_nodes = batch_rng.random_range(config.min_nodes..=config.max_nodes);
        let seed = config
            .seed
            .wrapping_add(u64::from(tree_id))
            .wrapping_add(num_nodes as u64);

        let tree = tree::generate_random_tree(num_nodes, &shape, seed)
            .with_context(|| format!("generating {}", label))?;
        let issues = tree::validate_tree(&tree);
        if !issues.is_empty() {
            log::warn!("{} has structural issues: {:?}", label, issues);
        }

        let id_text = format!("{:0width$}", tree_id, width = config.id_width);
        let observable = tapaal::select_observable_nodes(&tree);
        let net = tapaal::build_net(&tree, &id_text);
        let net_issues = tapaal::validate_net(&net);
        if !net_issues.is_empty() {
            log::warn!("{} model is not well formed: {:?}", label, net_issues);
        }

        let xml_file = paths.model_file(&label);
        let query_file = paths.query_file(&label);
        fs::write(&xml_file, tapaal::net_to_xml(&net))
            .with_context(|| format!("writing {}", xml_file.display()))?;
        fs::write(
            &query_file,
            tapaal::diagnosability_query(&tree, &observable, &id_text),
        )
        .with_context(|| format!("writing {}", query_file.display()))?;
        log::debug!("wrote {} ({} nodes)", label, num_nodes);

        trees.push(TreeInfo {
            tree_id,
            label,
            num_nodes,
            observable_nodes: observable.len(),
            observable_coverage: observable.len() as f64 / num_nodes as f64,
            xml_file,
            query_file,
            stats: tree::tree_statistics(&tree),
        });
    }

    Ok(summarize_batch(config.seed, trees))
}

fn summarize_batch(seed: u64, trees: Vec<TreeInfo>) -> GenerationReport {
    let node_count_range = trees.first().map(|_| ValueRange {
        min: trees.iter().map(|t| t.num_nodes).min().unwrap_or(0),
        max: trees.iter().map(|t| t.num_nodes).max().unwrap_or(0),
        avg: trees.iter().map(|t| t.num_nodes as f64).sum::<f64>() / trees.len() as f64,
    });
    let observable_coverage = trees.first().map(|_| ValueRange {
        min: trees
            .iter()
            .map(|t| t.observable_coverage)
            .fold(f64::INFINITY, f64::min),
        max: trees
            .iter()
            .map(|t| t.observable_coverage)
            .fold(f64::NEG_INFINITY, f64::max),
        avg: trees.iter().map(|t| t.observable_coverage).sum::<f64>() / trees.len() as f64,
    });

    GenerationReport {
        created_at: chrono::Utc::now().to_rfc3339(),
        seed,
        total_trees: trees.len(),
        node_count_range,
        observable_coverage,
        trees,
    }
}

/// Write the batch metadata as JSON
pub fn write_metadata(report: &GenerationReport, path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            ensure_dir(parent)?;
        }
    }
    let json = serde_json::to_string_pretty(report)?;
    fs::write(path, json).with_context(|| format!("writing {}", path.display()))?;
    Ok(())
}

pub fn print_summary(report: &GenerationReport, paths: &PathsConfig) {
    println!("\nGenerated {} trees", report.total_trees);
    if let Some(range) = &report.node_count_range {
        println!(
            "  Nodes per tree: {}-{} (avg {:.1})",
            range.min, range.max, range.avg
        );
    }
    if let Some(coverage) = &report.observable_coverage {
        println!("  Average observable coverage: {:.2}%", coverage.avg * 100.0);
    }
    println!("  Models:   {}", paths.models.display());
    println!("  Queries:  {}", paths.queries.display());
    println!("  Metadata: {}", paths.metadata.display());
}
