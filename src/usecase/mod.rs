// SPDX-License-Identifier: PMPL-1.0-or-later

//! E-commerce insider-threat use case
//!
//! A fixed ten-node tree in which an insider exfiltrates the credit card
//! database. Monitoring the authentication service is the single observation
//! point; observing `auth_service_exploit` pins down one attack path.

pub mod latex;

use crate::config::HarnessConfig;
use crate::tapaal;
use crate::tree::{self, AttackTree, TreeStatistics};
use crate::types::{Gate, NodeAttrs, Outcome};
use crate::verify::runner::colored_outcome;
use crate::verify::{self, render_log, OutcomeClassifier, ProcessVerifier, TreeInputs, Verifier};
use anyhow::{bail, Context, Result};
use colored::*;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

pub const ROOT_NODE: &str = "cc_db_exfiltrated";
pub const OBSERVED_NODE: &str = "auth_service_exploit";
pub const SCENARIO: &str = "E-commerce Platform Insider Threat";
const OBSERVABLE_STRATEGY: &str = "Authentication service monitoring";
const KEY_FINDING: &str = "Auth service compromise enables unique attack path diagnosis";

pub const MODEL_FILE: &str = "use_case.xml";
pub const QUERY_FILE: &str = "use_case.q";
pub const ANALYSIS_FILE: &str = "use_case_analysis.json";

/// Build the insider-threat tree. Times are hours in a 72 hour window.
pub fn ecommerce_tree() -> Result<AttackTree> {
    let mut tree = AttackTree::new(ROOT_NODE, NodeAttrs::gate(Gate::And, 0, 72, 2, 5));
    let root = tree.root();

    let db_access = tree.add_child(
        root,
        "database_access",
        NodeAttrs::gate(Gate::And, 6, 60, 2, 3),
    )?;
    let extraction = tree.add_child(
        root,
        "data_extraction",
        NodeAttrs::gate(Gate::And, 12, 72, 4, 4),
    )?;
    let internal = tree.add_child(
        db_access,
        "internal_access",
        NodeAttrs::gate(Gate::Or, 0, 48, 1, 2),
    )?;
    tree.add_child(
        db_access,
        "steal_db_credentials",
        NodeAttrs::leaf(8, 48, 3, 7),
    )?;
    let escalation = tree.add_child(
        extraction,
        "privilege_escalation",
        NodeAttrs::gate(Gate::Or, 8, 48, 3, 6),
    )?;
    tree.add_child(
        extraction,
        "establish_exfil_channel",
        NodeAttrs::leaf(12, 60, 5, 9),
    )?;
    tree.add_child(internal, "spear_phish_dev", NodeAttrs::leaf(0, 24, 4, 8))?;
    tree.add_child(internal, OBSERVED_NODE, NodeAttrs::leaf(0, 12, 2, 12))?;
    tree.add_child(
        escalation,
        "network_lateral_movement",
        NodeAttrs::leaf(6, 36, 6, 10),
    )?;

    Ok(tree)
}

/// Human description of a use-case node, with its ATT&CK technique where
/// one applies.
pub fn describe(node_id: &str) -> &'static str {
    match node_id {
        "cc_db_exfiltrated" => "Credit card database exfiltration",
        "database_access" => "Access to the credit card database",
        "data_extraction" => "Data extraction capability",
        "internal_access" => "Initial internal system access",
        "privilege_escalation" => "Escalate system privileges",
        "spear_phish_dev" => "Spear phishing against developers (T1566)",
        "auth_service_exploit" => "Exploit authentication service vulnerability (T1190)",
        "network_lateral_movement" => "Lateral movement through the network (T1021)",
        "steal_db_credentials" => "Steal database credentials (T1552)",
        "establish_exfil_channel" => "Covert exfiltration channel (T1041)",
        _ => "Attack step",
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeSummary {
    pub id: String,
    /// `Root`, `AND`, `OR`, `SAND` or `Leaf`
    pub kind: String,
    pub time_interval: [u32; 2],
    pub duration: u32,
    pub cost: u32,
    pub description: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AttackPath {
    /// Root first, leaf last
    pub path: Vec<String>,
    pub leaf_node: String,
    pub length: usize,
    pub total_cost: u64,
    /// Latest `end + duration` of any node on the path
    pub total_time: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PathAnalysis {
    pub total_paths: usize,
    pub paths: Vec<AttackPath>,
    pub leaf_nodes: Vec<String>,
    pub unique_leaves: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Diagnosis {
    pub observable_node: String,
    pub total_attack_paths: usize,
    pub paths_with_observation: usize,
    pub paths_without_observation: usize,
    pub unique_diagnosis_possible: bool,
    pub diagnosed_path: Option<AttackPath>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VerificationRecord {
    pub outcome: Outcome,
    pub time_sec: f64,
    pub verifier: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UseCaseAnalysis {
    pub generated_at: String,
    pub scenario: String,
    pub tree_stats: TreeStatistics,
    pub nodes: Vec<NodeSummary>,
    pub path_analysis: PathAnalysis,
    pub diagnosability: Diagnosis,
    pub observable_strategy: String,
    pub key_finding: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub verification: Option<VerificationRecord>,
}

pub fn node_summaries(tree: &AttackTree) -> Vec<NodeSummary> {
    tree.nodes()
        .iter()
        .enumerate()
        .map(|(idx, node)| {
            let kind = if idx == tree.root() {
                "Root".to_string()
            } else {
                match node.attrs.gate {
                    Some(gate) if !tree.is_leaf(idx) => gate.to_string(),
                    _ => "Leaf".to_string(),
                }
            };
            NodeSummary {
                id: node.id.clone(),
                kind,
                time_interval: node.attrs.time_interval,
                duration: node.attrs.duration,
                cost: node.attrs.cost,
                description: describe(&node.id).to_string(),
            }
        })
        .collect()
}

/// Every root-to-leaf path with its accumulated cost and latest finish time.
pub fn analyze_attack_paths(tree: &AttackTree) -> PathAnalysis {
    let leaves = tree.leaves();
    let paths: Vec<AttackPath> = leaves
        .iter()
        .map(|&leaf| {
            let indices = tree.path_from_root(leaf);
            let attrs = indices.iter().map(|&i| &tree.node(i).attrs);
            AttackPath {
                path: indices.iter().map(|&i| tree.node(i).id.clone()).collect(),
                leaf_node: tree.node(leaf).id.clone(),
                length: indices.len(),
                total_cost: attrs.clone().map(|a| u64::from(a.cost)).sum(),
                total_time: attrs.map(|a| a.end() + a.duration).max().unwrap_or(0),
            }
        })
        .collect();

    let mut leaf_ids: Vec<&str> = paths.iter().map(|p| p.leaf_node.as_str()).collect();
    leaf_ids.sort_unstable();
    leaf_ids.dedup();

    PathAnalysis {
        total_paths: paths.len(),
        unique_leaves: leaf_ids.len(),
        leaf_nodes: leaves.iter().map(|&i| tree.node(i).id.clone()).collect(),
        paths,
    }
}

/// Split the attack paths by whether they pass through `observable`. The
/// diagnosis is unique when at most one path does.
pub fn diagnose(paths: &PathAnalysis, observable: &str) -> Diagnosis {
    let (with, without): (Vec<&AttackPath>, Vec<&AttackPath>) = paths
        .paths
        .iter()
        .partition(|p| p.path.iter().any(|node| node == observable));

    Diagnosis {
        observable_node: observable.to_string(),
        total_attack_paths: paths.total_paths,
        paths_with_observation: with.len(),
        paths_without_observation: without.len(),
        unique_diagnosis_possible: with.len() <= 1,
        diagnosed_path: with.first().map(|p| (*p).clone()),
    }
}

fn marked(node_id: &str) -> String {
    format!("{} >= 1", tapaal::net::compromised_place(node_id))
}

/// Three-formula diagnosability query for the observed node.
pub fn use_case_query(observable: &str) -> String {
    let obs = marked(observable);
    let root = marked(ROOT_NODE);
    [
        "// Diagnosability of the e-commerce insider threat scenario".to_string(),
        format!("// Observation: {} compromised", observable),
        String::new(),
        "// 1: the observation can still lead to the goal".to_string(),
        format!("EF ({} and EF {})", obs, root),
        String::new(),
        "// 2: whenever the goal is reached the observation remains possible".to_string(),
        format!("AG ({} -> EF {})", root, obs),
        String::new(),
        "// 3: observation and goal hold together on some run".to_string(),
        format!("EF ({} and {})", obs, root),
        String::new(),
    ]
    .join("\n")
}

pub fn build_analysis(tree: &AttackTree) -> UseCaseAnalysis {
    let path_analysis = analyze_attack_paths(tree);
    let diagnosability = diagnose(&path_analysis, OBSERVED_NODE);
    UseCaseAnalysis {
        generated_at: chrono::Utc::now().to_rfc3339(),
        scenario: SCENARIO.to_string(),
        tree_stats: tree::tree_statistics(tree),
        nodes: node_summaries(tree),
        path_analysis,
        diagnosability,
        observable_strategy: OBSERVABLE_STRATEGY.to_string(),
        key_finding: KEY_FINDING.to_string(),
        verification: None,
    }
}

pub fn load_analysis(path: &Path) -> Result<UseCaseAnalysis> {
    if !path.is_file() {
        bail!(
            "analysis file {} not found (run `attack-diag use-case` first)",
            path.display()
        );
    }
    let content =
        fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
    serde_json::from_str(&content).with_context(|| format!("parsing {}", path.display()))
}

fn print_scenario() {
    println!("{}", "SCENARIO".bold().yellow());
    println!("  A malicious insider exfiltrates customer credit card data from a");
    println!("  cloud-hosted e-commerce platform within a 72 hour window.");
    println!("  The defender monitors the authentication service and sees when it");
    println!("  is compromised.");
    println!();
    println!("  Question: does observing {} identify the", OBSERVED_NODE.bold());
    println!("  complete attack path?");
}

fn print_analysis(analysis: &UseCaseAnalysis) {
    let stats = &analysis.tree_stats;
    println!("{}", "TREE".bold().yellow());
    println!("  Total nodes: {}", stats.total_nodes);
    println!("  Leaf nodes: {}", stats.leaf_nodes);
    println!("  Internal nodes: {}", stats.internal_nodes);
    println!("  Depth: {}", stats.max_depth);
    println!(
        "  Gates: AND {} / OR {} / SAND {}",
        stats.gate_counts.and, stats.gate_counts.or, stats.gate_counts.sand
    );
    println!("  Total attack cost: {}", stats.total_cost);
    println!("  Average time span: {:.1} hours", stats.avg_time_span);
    println!();

    let diag = &analysis.diagnosability;
    println!("{}", "DIAGNOSABILITY".bold().yellow());
    println!("  Attack paths: {}", analysis.path_analysis.total_paths);
    println!(
        "  Unique leaf vectors: {}",
        analysis.path_analysis.unique_leaves
    );
    println!("  Observable node: {}", diag.observable_node);
    println!("  Paths through observation: {}", diag.paths_with_observation);
    println!(
        "  Paths avoiding observation: {}",
        diag.paths_without_observation
    );
    let verdict = if diag.unique_diagnosis_possible {
        "yes".green().bold()
    } else {
        "no".red().bold()
    };
    println!("  Unique diagnosis possible: {}", verdict);

    if let Some(path) = &diag.diagnosed_path {
        println!();
        println!("{}", "DIAGNOSED PATH".bold().yellow());
        println!("  {}", path.path.join(" -> "));
        println!("  Attack vector: {}", path.leaf_node);
        println!("  Total cost: {} units", path.total_cost);
        println!("  Latest finish: {} hours", path.total_time);
    }
}

/// Run the use-case model through the configured verifier.
fn verify_use_case(
    config: &HarnessConfig,
    model: PathBuf,
    query: PathBuf,
) -> Result<VerificationRecord> {
    let inputs = TreeInputs {
        label: "use_case".to_string(),
        model,
        query,
    };
    let verifier = ProcessVerifier::new(config.verifier.clone());
    let classifier = OutcomeClassifier::new()?;
    let (row, invocation) = verify::evaluate(
        &inputs,
        &verifier,
        &classifier,
        config.verifier.timeout(),
    );

    if let Some(parent) = inputs.model.parent() {
        let log_path = parent.join("use_case.log");
        fs::write(&log_path, render_log(&inputs, &row, invocation.as_ref()))
            .with_context(|| format!("writing {}", log_path.display()))?;
    }

    Ok(VerificationRecord {
        outcome: row.outcome,
        time_sec: row.time_sec,
        verifier: verifier.name(),
    })
}

fn narrate_verification(record: &VerificationRecord) {
    println!("{}", "VERIFICATION".bold().yellow());
    println!(
        "  {} answered {} in {:.3}s",
        record.verifier,
        colored_outcome(record.outcome),
        record.time_sec
    );
    let meaning = match record.outcome {
        Outcome::Sat => "every formula holds: the observation is consistent with the goal",
        Outcome::Unsat => "at least one formula fails: the observation does not diagnose the goal",
        Outcome::Timeout => "the verifier did not answer within the timeout",
        Outcome::Error => "the verifier output could not be interpreted (see use_case.log)",
        Outcome::Missing => "the model or query file is missing",
    };
    println!("  {}", meaning);
}

/// Write model, query and analysis for the use case into `out_dir`.
pub fn run_use_case(
    config: &HarnessConfig,
    out_dir: &Path,
    run_verifier: bool,
) -> Result<UseCaseAnalysis> {
    println!("{}", format!("=== {} ===", SCENARIO.to_uppercase()).bold().cyan());
    println!();
    print_scenario();
    println!();

    let tree = ecommerce_tree()?;
    let issues = tree::validate_tree(&tree);
    if !issues.is_empty() {
        log::warn!("use-case tree has structural issues: {:?}", issues);
    }

    let mut analysis = build_analysis(&tree);
    print_analysis(&analysis);
    println!();

    fs::create_dir_all(out_dir)
        .with_context(|| format!("creating directory {}", out_dir.display()))?;
    let model = out_dir.join(MODEL_FILE);
    let query = out_dir.join(QUERY_FILE);
    fs::write(&model, tapaal::model_xml(&tree, "ecommerce"))
        .with_context(|| format!("writing {}", model.display()))?;
    fs::write(&query, use_case_query(OBSERVED_NODE))
        .with_context(|| format!("writing {}", query.display()))?;

    if run_verifier {
        let record = verify_use_case(config, model.clone(), query.clone())?;
        narrate_verification(&record);
        println!();
        analysis.verification = Some(record);
    }

    let analysis_path = out_dir.join(ANALYSIS_FILE);
    let json = serde_json::to_string_pretty(&analysis)?;
    fs::write(&analysis_path, json)
        .with_context(|| format!("writing {}", analysis_path.display()))?;

    println!("{}", "FILES".bold().yellow());
    println!("  Model:    {}", model.display());
    println!("  Query:    {}", query.display());
    println!("  Analysis: {}", analysis_path.display());
    Ok(analysis)
}
