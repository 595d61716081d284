// SPDX-License-Identifier: PMPL-1.0-or-later

//! LaTeX tables and report for the use-case analysis

use super::{UseCaseAnalysis, OBSERVED_NODE};
use anyhow::{Context, Result};
use colored::*;
use std::fs;
use std::path::{Path, PathBuf};

pub const TABLE_FILE: &str = "use_case_table.tex";
pub const REPORT_FILE: &str = "use_case_report.tex";
pub const SUMMARY_FILE: &str = "use_case_summary.txt";

pub fn latex_escape(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for ch in value.chars() {
        match ch {
            '\\' => escaped.push_str("\\textbackslash{}"),
            '_' | '&' | '%' | '$' | '#' | '{' | '}' => {
                escaped.push('\\');
                escaped.push(ch);
            }
            '~' => escaped.push_str("\\textasciitilde{}"),
            '^' => escaped.push_str("\\textasciicircum{}"),
            _ => escaped.push(ch),
        }
    }
    escaped
}

fn table_open(lines: &mut Vec<String>, caption: &str, label: &str, columns: &str) {
    lines.push("\\begin{table}[htbp]".to_string());
    lines.push("\\centering".to_string());
    lines.push(format!("\\caption{{{}}}", caption));
    lines.push(format!("\\label{{{}}}", label));
    lines.push(format!("\\begin{{tabular}}{{{}}}", columns));
    lines.push("\\hline".to_string());
}

fn table_close(lines: &mut Vec<String>) {
    lines.push("\\end{tabular}".to_string());
    lines.push("\\end{table}".to_string());
}

fn emphasize_observed(node_id: &str, text: String) -> String {
    if node_id == OBSERVED_NODE {
        format!("\\textbf{{{}}}", text)
    } else {
        text
    }
}

pub fn tree_structure_table(analysis: &UseCaseAnalysis) -> String {
    let mut lines = vec!["% Attack tree structure".to_string()];
    table_open(
        &mut lines,
        "E-commerce Platform Attack Tree Structure",
        "tab:ecommerce-attack-tree",
        "|l|c|c|c|c|l|",
    );
    lines.push(
        "\\textbf{Node} & \\textbf{Type} & \\textbf{Time Window} & \\textbf{Duration} & \\textbf{Cost} & \\textbf{Description} \\\\"
            .to_string(),
    );
    lines.push("\\hline".to_string());

    for node in &analysis.nodes {
        lines.push(format!(
            "{} & {} & [{},{}] & {}h & {} & {} \\\\",
            latex_escape(&node.id),
            node.kind,
            node.time_interval[0],
            node.time_interval[1],
            node.duration,
            node.cost,
            emphasize_observed(&node.id, latex_escape(&node.description))
        ));
        lines.push("\\hline".to_string());
    }

    table_close(&mut lines);
    lines.join("\n")
}

pub fn diagnosability_table(analysis: &UseCaseAnalysis) -> String {
    let diag = &analysis.diagnosability;
    let coverage = if diag.total_attack_paths > 0 {
        format!(
            "{:.1}\\%",
            diag.paths_with_observation as f64 * 100.0 / diag.total_attack_paths as f64
        )
    } else {
        "0\\%".to_string()
    };
    let unique = if diag.unique_diagnosis_possible {
        "Yes"
    } else {
        "No"
    };
    let result = if diag.unique_diagnosis_possible {
        "\\textbf{Weakly Diagnosable}"
    } else {
        "Not Diagnosable"
    };
    let observed = latex_escape(&diag.observable_node);

    let mut rows = vec![
        (
            "Total attack paths".to_string(),
            diag.total_attack_paths.to_string(),
            "Complete attack space size",
        ),
        (
            format!("Paths with {}", observed),
            diag.paths_with_observation.to_string(),
            "Paths involving the observed node",
        ),
        (
            format!("Paths without {}", observed),
            diag.paths_without_observation.to_string(),
            "Paths not involving the observed node",
        ),
        (
            "Observation coverage".to_string(),
            coverage,
            "Fraction of attacks observable",
        ),
        (
            "Unique diagnosis possible".to_string(),
            unique.to_string(),
            "Attack path identified uniquely",
        ),
        (
            "Diagnosability result".to_string(),
            result.to_string(),
            "Weak diagnosability",
        ),
    ];
    if let Some(record) = &analysis.verification {
        rows.push((
            "Verifier answer".to_string(),
            record.outcome.as_str().to_string(),
            "Classified verifier output",
        ));
    }

    let mut lines = vec!["% Diagnosability analysis results".to_string()];
    table_open(
        &mut lines,
        "Diagnosability Analysis: Auth Service Observation",
        "tab:diagnosability-analysis",
        "|l|c|l|",
    );
    lines.push(
        "\\textbf{Analysis Metric} & \\textbf{Value} & \\textbf{Interpretation} \\\\".to_string(),
    );
    lines.push("\\hline".to_string());
    for (metric, value, meaning) in rows {
        lines.push(format!("{} & {} & {} \\\\", metric, value, meaning));
        lines.push("\\hline".to_string());
    }
    table_close(&mut lines);
    lines.join("\n")
}

pub fn diagnosed_path_table(analysis: &UseCaseAnalysis) -> String {
    let Some(path) = &analysis.diagnosability.diagnosed_path else {
        return "% No diagnosed path available\n".to_string();
    };

    let mut lines = vec!["% Uniquely diagnosed attack path".to_string()];
    table_open(
        &mut lines,
        "Uniquely Diagnosed Attack Path After Auth Service Observation",
        "tab:diagnosed-attack-path",
        "|c|l|l|",
    );
    lines.push("\\textbf{Step} & \\textbf{Attack Node} & \\textbf{Description} \\\\".to_string());
    lines.push("\\hline".to_string());

    for (step, node) in path.path.iter().enumerate() {
        let description = analysis
            .nodes
            .iter()
            .find(|n| &n.id == node)
            .map(|n| n.description.clone())
            .unwrap_or_else(|| format!("Execute {}", node.replace('_', " ")));
        lines.push(format!(
            "{} & {} & {} \\\\",
            step + 1,
            latex_escape(node),
            emphasize_observed(node, latex_escape(&description))
        ));
        lines.push("\\hline".to_string());
    }

    lines.push("\\hline".to_string());
    lines.push(format!(
        "\\multicolumn{{2}}{{|c|}}{{\\textbf{{Attack Summary}}}} & Cost: {} units, Time: {}h \\\\",
        path.total_cost, path.total_time
    ));
    lines.push("\\hline".to_string());
    table_close(&mut lines);
    lines.join("\n")
}

pub fn report_document(analysis: &UseCaseAnalysis) -> String {
    let scenario = latex_escape(&analysis.scenario);
    let finding = latex_escape(&analysis.key_finding);
    let stats = &analysis.tree_stats;

    format!(
        r"% {scenario} diagnosability report
% Generated {generated}

\documentclass[11pt]{{article}}
\usepackage[utf8]{{inputenc}}
\usepackage{{booktabs}}
\usepackage{{array}}
\usepackage{{geometry}}
\geometry{{margin=1in}}

\title{{Diagnosability Analysis: {scenario}}}
\date{{\today}}

\begin{{document}}

\maketitle

\section{{Summary}}

An insider targets the credit card database of a cloud-hosted e-commerce
platform. The defender observes compromise of the authentication service.

\textbf{{Key finding:}} {finding}

\section{{Attack Tree Structure}}

The tree has {nodes} nodes ({leaves} leaves) and depth {depth}.

{tree_table}

\section{{Diagnosability}}

{diag_table}

\section{{Diagnosed Attack Path}}

{path_table}

\end{{document}}
",
        scenario = scenario,
        generated = analysis.generated_at,
        finding = finding,
        nodes = stats.total_nodes,
        leaves = stats.leaf_nodes,
        depth = stats.max_depth,
        tree_table = tree_structure_table(analysis),
        diag_table = diagnosability_table(analysis),
        path_table = diagnosed_path_table(analysis),
    )
}

pub fn summary_text(analysis: &UseCaseAnalysis) -> String {
    let diag = &analysis.diagnosability;
    let mut text = format!(
        "{title}\n{rule}\n\nScenario: {scenario}\nObservable strategy: {strategy}\n\n\
         Tree statistics:\n- Total nodes: {nodes}\n- Leaf nodes: {leaves}\n- Attack paths: {paths}\n\n\
         Diagnosability:\n- Paths with observation: {with}\n- Unique diagnosis possible: {unique}\n",
        title = "E-COMMERCE DIAGNOSABILITY ANALYSIS SUMMARY",
        rule = "=".repeat(42),
        scenario = analysis.scenario,
        strategy = analysis.observable_strategy,
        nodes = analysis.tree_stats.total_nodes,
        leaves = analysis.tree_stats.leaf_nodes,
        paths = analysis.path_analysis.total_paths,
        with = diag.paths_with_observation,
        unique = diag.unique_diagnosis_possible,
    );
    if let Some(record) = &analysis.verification {
        text.push_str(&format!(
            "- Verifier answer: {} ({:.3}s)\n",
            record.outcome, record.time_sec
        ));
    }
    text.push_str(&format!("\nKey finding: {}\n", analysis.key_finding));
    text
}

/// Write the table, full report and plain-text summary into `out_dir`.
pub fn write_report(analysis: &UseCaseAnalysis, out_dir: &Path) -> Result<Vec<PathBuf>> {
    fs::create_dir_all(out_dir)
        .with_context(|| format!("creating directory {}", out_dir.display()))?;

    let outputs = [
        (TABLE_FILE, diagnosed_path_table(analysis)),
        (REPORT_FILE, report_document(analysis)),
        (SUMMARY_FILE, summary_text(analysis)),
    ];
    let mut written = Vec::with_capacity(outputs.len());
    for (name, content) in outputs {
        let path = out_dir.join(name);
        fs::write(&path, content).with_context(|| format!("writing {}", path.display()))?;
        written.push(path);
    }

    print!("{}", summary_text(analysis));
    println!();
    println!("{}", "Generated files:".bold());
    for path in &written {
        println!("  {}", path.display());
    }
    println!("Compile with: pdflatex {}", REPORT_FILE);
    Ok(written)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::usecase::{build_analysis, ecommerce_tree};

    #[test]
    fn test_latex_escape() {
        assert_eq!(latex_escape("cc_db"), "cc\\_db");
        assert_eq!(latex_escape("50% & more"), "50\\% \\& more");
    }

    #[test]
    fn test_path_table_lists_steps() {
        let analysis = build_analysis(&ecommerce_tree().unwrap());
        let table = diagnosed_path_table(&analysis);
        assert!(table.contains("1 & cc\\_db\\_exfiltrated"));
        assert!(table.contains("4 & auth\\_service\\_exploit & \\textbf{"));
        assert!(table.contains("Cost: 22 units, Time: 74h"));
        assert!(table.trim_end().ends_with("\\end{table}"));
    }

    #[test]
    fn test_missing_path_is_a_comment() {
        let mut analysis = build_analysis(&ecommerce_tree().unwrap());
        analysis.diagnosability.diagnosed_path = None;
        assert!(diagnosed_path_table(&analysis).starts_with('%'));
    }

    #[test]
    fn test_report_is_a_document() {
        let analysis = build_analysis(&ecommerce_tree().unwrap());
        let doc = report_document(&analysis);
        assert!(doc.contains("\\begin{document}"));
        assert!(doc.contains("tab:ecommerce-attack-tree"));
        assert!(doc.contains("\\textbf{Weakly Diagnosable}"));
        assert!(doc.trim_end().ends_with("\\end{document}"));
    }
}
