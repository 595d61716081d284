// SPDX-License-Identifier: PMPL-1.0-or-later

//! Prerequisite checks for a verification run
//!
//! Used by `attack-diag doctor` and before every batch run; any `ERR` entry
//! stops the batch before a single verifier process is launched.

use crate::config::{HarnessConfig, VerifierConfig, VerifierMode};
use crate::types::tree_label;
use anyhow::{anyhow, Result};
use colored::*;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Level {
    Ok,
    Warn,
    Error,
}

impl Level {
    fn tag(&self) -> ColoredString {
        match self {
            Level::Ok => "OK".green(),
            Level::Warn => "WARN".yellow(),
            Level::Error => "ERR".red().bold(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Diagnostic {
    pub label: &'static str,
    pub level: Level,
    pub detail: String,
}

impl Diagnostic {
    fn new(label: &'static str, level: Level, detail: String) -> Self {
        Self {
            label,
            level,
            detail,
        }
    }

    pub fn ok(label: &'static str, detail: String) -> Self {
        Self::new(label, Level::Ok, detail)
    }

    pub fn warning(label: &'static str, detail: String) -> Self {
        Self::new(label, Level::Warn, detail)
    }

    pub fn error(label: &'static str, detail: String) -> Self {
        Self::new(label, Level::Error, detail)
    }

    pub fn print(&self) {
        println!("  [{}] {:20} {}", self.level.tag(), self.label, self.detail);
    }
}

/// Locate `program` the way a shell would: paths are taken as-is, bare
/// names are searched along `PATH`.
pub fn find_in_path(program: &str) -> Option<PathBuf> {
    let candidate = Path::new(program);
    if candidate.components().count() > 1 {
        return candidate.is_file().then(|| candidate.to_path_buf());
    }
    let path_var = env::var_os("PATH")?;
    env::split_paths(&path_var)
        .map(|dir| dir.join(program))
        .find(|full| full.is_file())
}

/// PATH check for the binary the verifier configuration launches.
pub fn tool_check(verifier: &VerifierConfig) -> Diagnostic {
    let binary = verifier.required_binary();
    let label = match verifier.mode {
        VerifierMode::Container => "container runtime",
        VerifierMode::Direct => "verifier binary",
    };
    match find_in_path(binary) {
        Some(found) => Diagnostic::ok(label, found.display().to_string()),
        None => Diagnostic::error(label, format!("{} not found on PATH", binary)),
    }
}

fn check_input_dir(label: &'static str, path: &Path) -> Diagnostic {
    if path.is_dir() {
        let files = fs::read_dir(path)
            .map(|iter| iter.filter_map(|entry| entry.ok()).count())
            .unwrap_or(0);
        Diagnostic::ok(label, format!("{} ({} entries)", path.display(), files))
    } else if path.exists() {
        Diagnostic::error(label, format!("{} is not a directory", path.display()))
    } else {
        Diagnostic::error(
            label,
            format!("{} missing (run `attack-diag generate` first)", path.display()),
        )
    }
}

fn check_logs_dir(path: &Path) -> Diagnostic {
    if path.is_dir() {
        Diagnostic::ok("logs directory", format!("{} exists", path.display()))
    } else if path.exists() {
        Diagnostic::error(
            "logs directory",
            format!("{} exists but is not a directory", path.display()),
        )
    } else {
        Diagnostic::warning(
            "logs directory",
            format!("{} missing (created on run)", path.display()),
        )
    }
}

fn check_input_pairs(config: &HarnessConfig) -> Diagnostic {
    let range = config.runner.first_id..=config.runner.last_id;
    let total = range.clone().count();
    let complete = range
        .filter(|id| {
            let label = tree_label(*id, config.generator.id_width);
            config.paths.model_file(&label).is_file() && config.paths.query_file(&label).is_file()
        })
        .count();

    let detail = format!(
        "{}/{} pairs present for ids {}..={}",
        complete, total, config.runner.first_id, config.runner.last_id
    );
    if complete == 0 {
        Diagnostic::error("model/query pairs", detail)
    } else if complete < total {
        Diagnostic::warning("model/query pairs", detail)
    } else {
        Diagnostic::ok("model/query pairs", detail)
    }
}

/// Checks on the files a run reads and writes.
pub fn input_checks(config: &HarnessConfig) -> Vec<Diagnostic> {
    vec![
        check_input_dir("models directory", &config.paths.models),
        check_input_dir("queries directory", &config.paths.queries),
        check_logs_dir(&config.paths.logs),
        check_input_pairs(config),
    ]
}

/// Run every check against `config`.
pub fn collect(config: &HarnessConfig) -> Vec<Diagnostic> {
    let verifier = &config.verifier;
    let target = match verifier.mode {
        VerifierMode::Container => format!(
            "{} in {} via {}",
            verifier.program, verifier.image, verifier.runtime
        ),
        VerifierMode::Direct => format!("{} on host", verifier.program),
    };

    let mut checks = vec![
        Diagnostic::ok(
            "version",
            format!("attack-diag {}", env!("CARGO_PKG_VERSION")),
        ),
        Diagnostic::ok(
            "verifier",
            format!("{} (timeout {}s)", target, verifier.timeout_secs),
        ),
        tool_check(&config.verifier),
    ];
    checks.extend(input_checks(config));
    checks
}

pub fn has_errors(checks: &[Diagnostic]) -> bool {
    checks.iter().any(|entry| entry.level == Level::Error)
}

pub fn print_checks(checks: &[Diagnostic]) {
    for entry in checks {
        entry.print();
    }
}

/// Print the checklist and fail if anything is fatal.
pub fn run_doctor(config: &HarnessConfig) -> Result<()> {
    println!("attack-diag prerequisite check");
    println!();
    let checks = collect(config);
    print_checks(&checks);

    if has_errors(&checks) {
        Err(anyhow!("prerequisite check reported issues"))
    } else {
        Ok(())
    }
}
