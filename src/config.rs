// SPDX-License-Identifier: PMPL-1.0-or-later

//! Harness configuration loading (JSON or YAML).

use crate::tree::{GateWeights, TreeShape};
use anyhow::{anyhow, bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct HarnessConfig {
    pub generator: GeneratorConfig,
    pub paths: PathsConfig,
    pub verifier: VerifierConfig,
    pub runner: RunnerConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneratorConfig {
    pub count: u32,
    pub first_id: u32,
    pub min_nodes: usize,
    pub max_nodes: usize,
    pub min_depth: usize,
    pub max_depth: usize,
    pub max_branching: usize,
    pub gate_weights: GateWeights,
    pub seed: u64,
    /// Digits in the zero-padded tree identifier
    pub id_width: usize,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        let shape = TreeShape::default();
        Self {
            count: 100,
            first_id: 1,
            min_nodes: 10,
            max_nodes: 25,
            min_depth: shape.min_depth,
            max_depth: shape.max_depth,
            max_branching: shape.max_branching,
            gate_weights: shape.gate_weights,
            seed: 42,
            id_width: 3,
        }
    }
}

impl GeneratorConfig {
    pub fn shape(&self) -> TreeShape {
        TreeShape {
            min_depth: self.min_depth,
            max_depth: self.max_depth,
            max_branching: self.max_branching,
            gate_weights: self.gate_weights,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PathsConfig {
    pub models: PathBuf,
    pub queries: PathBuf,
    pub logs: PathBuf,
    pub results: PathBuf,
    pub metadata: PathBuf,
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            models: PathBuf::from("models"),
            queries: PathBuf::from("queries"),
            logs: PathBuf::from("logs"),
            results: PathBuf::from("results.csv"),
            metadata: PathBuf::from("tree_metadata.json"),
        }
    }
}

impl PathsConfig {
    pub fn model_file(&self, label: &str) -> PathBuf {
        self.models.join(format!("{}.xml", label))
    }

    pub fn query_file(&self, label: &str) -> PathBuf {
        self.queries.join(format!("{}.q", label))
    }

    pub fn log_file(&self, label: &str) -> PathBuf {
        self.logs.join(format!("{}.log", label))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VerifierMode {
    /// Run the verifier inside a throwaway container
    Container,
    /// Run the verifier binary directly on the host
    Direct,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct VerifierConfig {
    pub mode: VerifierMode,
    /// Container runtime binary (docker, podman)
    pub runtime: String,
    pub image: String,
    pub program: String,
    /// Argument template; `{query}` and `{model}` are substituted per tree
    pub args: Vec<String>,
    pub timeout_secs: u64,
}

impl Default for VerifierConfig {
    fn default() -> Self {
        Self {
            mode: VerifierMode::Container,
            runtime: "docker".to_string(),
            image: "tapaal/tapaal:3.9.2".to_string(),
            program: "verifyta".to_string(),
            args: vec!["-q".into(), "{query}".into(), "{model}".into()],
            timeout_secs: 60,
        }
    }
}

impl VerifierConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// Binary that must be on PATH before a run can start.
    pub fn required_binary(&self) -> &str {
        match self.mode {
            VerifierMode::Container => &self.runtime,
            VerifierMode::Direct => &self.program,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RunnerConfig {
    pub first_id: u32,
    pub last_id: u32,
}

impl Default for RunnerConfig {
    fn default() -> Self {
        Self {
            first_id: 1,
            last_id: 100,
        }
    }
}

impl HarnessConfig {
    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("reading harness config {}", path.display()))?;
        let config: HarnessConfig = match path.extension().and_then(|ext| ext.to_str()) {
            Some("json") => serde_json::from_str(&content)
                .with_context(|| format!("parsing json harness config {}", path.display()))?,
            Some("yaml") | Some("yml") => serde_yaml::from_str(&content)
                .with_context(|| format!("parsing yaml harness config {}", path.display()))?,
            _ => {
                return Err(anyhow!(
                    "unsupported harness config extension for {}",
                    path.display()
                ))
            }
        };
        config.validate()?;
        Ok(config)
    }

    pub fn load_or_default(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) => Self::load(path),
            None => Ok(Self::default()),
        }
    }

    pub fn validate(&self) -> Result<()> {
        let g = &self.generator;
        if g.min_nodes == 0 || g.min_nodes > g.max_nodes {
            bail!(
                "generator node range {}..={} is empty",
                g.min_nodes,
                g.max_nodes
            );
        }
        if g.min_depth > g.max_depth {
            bail!(
                "generator min_depth {} exceeds max_depth {}",
                g.min_depth,
                g.max_depth
            );
        }
        if g.max_branching == 0 {
            bail!("generator max_branching must be at least 1");
        }
        if g.min_nodes <= g.min_depth {
            bail!(
                "min_nodes {} cannot hold a spine of depth {}",
                g.min_nodes,
                g.min_depth
            );
        }
        let capacity = g.shape().capacity();
        if capacity < g.max_nodes {
            bail!(
                "max_nodes {} exceeds the {} nodes allowed by depth {} and branching {}",
                g.max_nodes,
                capacity,
                g.max_depth,
                g.max_branching
            );
        }
        let w = &g.gate_weights;
        if w.and < 0.0 || w.or < 0.0 || w.sand < 0.0 || w.total() <= 0.0 {
            bail!("gate weights must be non-negative with a positive sum");
        }
        if g.id_width == 0 {
            bail!("id_width must be at least 1");
        }
        if self.runner.first_id > self.runner.last_id {
            bail!(
                "runner range {}..={} is empty",
                self.runner.first_id,
                self.runner.last_id
            );
        }
        if self.verifier.timeout_secs == 0 {
            bail!("verifier timeout must be positive");
        }
        Ok(())
    }
}
