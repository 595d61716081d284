// SPDX-License-Identifier: PMPL-1.0-or-later

//! End-to-end tests: generation, batch verification and summarizing

use attack_diag::config::{HarnessConfig, VerifierMode};
use attack_diag::generate;
use attack_diag::results::{read_results, summarize};
use attack_diag::tapaal;
use attack_diag::types::Outcome;
use attack_diag::verify::{ExitKind, Invocation, Runner, TreeInputs, Verifier};
use std::cell::RefCell;
use std::collections::HashMap;
use std::fs;
use std::path::Path;
use std::rc::Rc;
use std::time::Duration;
use tempfile::TempDir;

fn config_in(dir: &Path) -> HarnessConfig {
    let mut config = HarnessConfig::default();
    config.paths.models = dir.join("models");
    config.paths.queries = dir.join("queries");
    config.paths.logs = dir.join("logs");
    config.paths.results = dir.join("results.csv");
    config.paths.metadata = dir.join("tree_metadata.json");
    config
}

/// Answers from a fixed script keyed by tree label and records every call.
struct ScriptedVerifier {
    script: HashMap<String, (ExitKind, &'static str)>,
    calls: Rc<RefCell<Vec<String>>>,
}

impl Verifier for ScriptedVerifier {
    fn name(&self) -> String {
        "scripted".to_string()
    }

    fn invoke(&self, inputs: &TreeInputs, timeout: Duration) -> Invocation {
        self.calls.borrow_mut().push(inputs.label.clone());
        let (exit, stdout) = self
            .script
            .get(&inputs.label)
            .cloned()
            .unwrap_or((ExitKind::Exited(0), "Query is satisfied\n"));
        let elapsed = if exit == ExitKind::TimedOut {
            timeout
        } else {
            Duration::from_millis(15)
        };
        Invocation {
            command: format!("scripted {}", inputs.query.display()),
            exit,
            stdout: stdout.to_string(),
            stderr: String::new(),
            elapsed,
        }
    }
}

fn scripted(
    entries: &[(&str, ExitKind, &'static str)],
) -> (Box<ScriptedVerifier>, Rc<RefCell<Vec<String>>>) {
    let calls = Rc::new(RefCell::new(Vec::new()));
    let script = entries
        .iter()
        .map(|(label, exit, out)| (label.to_string(), (exit.clone(), *out)))
        .collect();
    (
        Box::new(ScriptedVerifier {
            script,
            calls: Rc::clone(&calls),
        }),
        calls,
    )
}

fn generate_into(config: &mut HarnessConfig, count: u32) {
    config.generator.count = count;
    config.runner.first_id = 1;
    config.runner.last_id = count;
    let report = generate::generate_batch(&config.generator, &config.paths).unwrap();
    generate::write_metadata(&report, &config.paths.metadata).unwrap();
}

#[test]
fn test_generation_writes_contiguous_pairs() {
    let dir = TempDir::new().unwrap();
    let mut config = config_in(dir.path());
    config.generator.first_id = 1;
    generate_into(&mut config, 12);

    let mut models: Vec<String> = fs::read_dir(&config.paths.models)
        .unwrap()
        .map(|e| e.unwrap().file_name().to_string_lossy().to_string())
        .collect();
    models.sort();
    let expected: Vec<String> = (1..=12).map(|i| format!("tree_{:03}.xml", i)).collect();
    assert_eq!(models, expected);

    for i in 1..=12 {
        let query = config.paths.queries.join(format!("tree_{:03}.q", i));
        let text = fs::read_to_string(&query).unwrap();
        assert!(text.starts_with(&format!("// Diagnosability query for tree {:03}", i)));
        assert!(text.contains("EF ("));
    }

    let metadata: serde_json::Value =
        serde_json::from_str(&fs::read_to_string(&config.paths.metadata).unwrap()).unwrap();
    assert_eq!(metadata["total_trees"], 12);
    assert_eq!(metadata["trees"].as_array().unwrap().len(), 12);
}

#[test]
fn test_generation_is_reproducible() {
    let a = TempDir::new().unwrap();
    let b = TempDir::new().unwrap();
    let mut first = config_in(a.path());
    let mut second = config_in(b.path());
    generate_into(&mut first, 4);
    generate_into(&mut second, 4);

    for label in ["tree_001", "tree_004"] {
        assert_eq!(
            fs::read_to_string(first.paths.model_file(label)).unwrap(),
            fs::read_to_string(second.paths.model_file(label)).unwrap()
        );
    }
}

#[test]
fn test_generated_trees_are_well_formed() {
    let config = HarnessConfig::default();
    let shape = config.generator.shape();
    for seed in 0..25u64 {
        let tree = attack_diag::tree::generate_random_tree(10 + seed as usize % 16, &shape, seed)
            .unwrap();
        assert!(attack_diag::tree::validate_tree(&tree).is_empty());
        for idx in tree.internal_nodes() {
            assert!(!tree.node(idx).children.is_empty());
        }
        let net = tapaal::build_net(&tree, "x");
        assert!(tapaal::validate_net(&net).is_empty(), "seed {}", seed);
        assert_eq!(net.root_places().len(), 1);
    }
}

#[test]
fn test_batch_records_every_terminal_state() {
    let dir = TempDir::new().unwrap();
    let mut config = config_in(dir.path());
    generate_into(&mut config, 5);
    fs::remove_file(config.paths.query_file("tree_003")).unwrap();

    let (verifier, calls) = scripted(&[
        ("tree_002", ExitKind::Exited(1), "Query is NOT satisfied\n"),
        ("tree_004", ExitKind::TimedOut, ""),
        ("tree_005", ExitKind::Exited(2), "syntax error in query\n"),
    ]);
    let runner = Runner::with_verifier(config.clone(), verifier).unwrap();
    let summary = runner.run().unwrap();

    assert_eq!(summary.sat, 1);
    assert_eq!(summary.unsat, 1);
    assert_eq!(summary.missing, 1);
    assert_eq!(summary.timeout, 1);
    assert_eq!(summary.error, 1);
    // no process for the tree with a missing input
    assert_eq!(
        *calls.borrow(),
        vec!["tree_001", "tree_002", "tree_004", "tree_005"]
    );

    let table = read_results(&config.paths.results).unwrap();
    assert_eq!(table.malformed, 0);
    let outcomes: Vec<Outcome> = table.rows.iter().map(|r| r.outcome).collect();
    assert_eq!(
        outcomes,
        vec![
            Outcome::Sat,
            Outcome::Unsat,
            Outcome::Missing,
            Outcome::Timeout,
            Outcome::Error
        ]
    );
    assert!(table.rows[0].time_sec.unwrap() >= 0.0);
    assert_eq!(table.rows[2].time_sec, Some(0.0));

    let csv = fs::read_to_string(&config.paths.results).unwrap();
    assert!(csv.starts_with("model,result,time_sec\n"));
    assert!(csv.contains("tree_003,MISSING,0.000\n"));

    for i in 1..=5 {
        assert!(config.paths.log_file(&format!("tree_{:03}", i)).is_file());
    }
    let log = fs::read_to_string(config.paths.log_file("tree_002")).unwrap();
    assert!(log.contains("Query is NOT satisfied"));
    assert!(log.contains("exit code 1"));
}

#[test]
fn test_rerun_truncates_results() {
    let dir = TempDir::new().unwrap();
    let mut config = config_in(dir.path());
    generate_into(&mut config, 2);

    for _ in 0..2 {
        let (verifier, _) = scripted(&[]);
        Runner::with_verifier(config.clone(), verifier)
            .unwrap()
            .run()
            .unwrap();
    }
    let table = read_results(&config.paths.results).unwrap();
    assert_eq!(table.rows.len(), 2);
}

#[test]
fn test_missing_inputs_are_fatal_before_processing() {
    let dir = TempDir::new().unwrap();
    let config = config_in(dir.path());
    let (verifier, calls) = scripted(&[]);
    let runner = Runner::with_verifier(config.clone(), verifier).unwrap();

    assert!(runner.run().is_err());
    assert!(calls.borrow().is_empty());
    assert!(!config.paths.results.exists());
}

#[test]
fn test_summary_of_a_finished_batch() {
    let dir = TempDir::new().unwrap();
    let mut config = config_in(dir.path());
    generate_into(&mut config, 7);

    let (verifier, _) = scripted(&[
        ("tree_004", ExitKind::Exited(1), "Query is NOT satisfied\n"),
        ("tree_005", ExitKind::Exited(1), "Query is NOT satisfied\n"),
        ("tree_006", ExitKind::TimedOut, ""),
        ("tree_007", ExitKind::SpawnFailed("no such file".into()), ""),
    ]);
    Runner::with_verifier(config.clone(), verifier)
        .unwrap()
        .run()
        .unwrap();

    let summary = summarize(&read_results(&config.paths.results).unwrap());
    assert_eq!(summary.count(Outcome::Sat), 3);
    assert_eq!(summary.count(Outcome::Unsat), 2);
    assert_eq!(summary.count(Outcome::Timeout), 1);
    assert_eq!(summary.count(Outcome::Error), 1);
    let timing = summary.timing.unwrap();
    assert_eq!(timing.count, 5);
    // the timed out row took the full 60s timeout and must not count
    assert!(timing.max < 1.0);
}

#[cfg(unix)]
mod process {
    use super::*;
    use attack_diag::verify::ProcessVerifier;
    use std::os::unix::fs::PermissionsExt;
    use std::time::Instant;

    fn stub_verifier(dir: &Path) -> String {
        let script = dir.join("fake-verifyta");
        fs::write(
            &script,
            "#!/bin/sh\n\
             case \"$2\" in\n\
               *tree_002*) sleep 30; echo 'Query is satisfied' ;;\n\
               *) echo 'Query is satisfied' ;;\n\
             esac\n",
        )
        .unwrap();
        fs::set_permissions(&script, fs::Permissions::from_mode(0o755)).unwrap();
        script.to_string_lossy().to_string()
    }

    #[test]
    fn test_direct_mode_with_stub_verifier() {
        let dir = TempDir::new().unwrap();
        let mut config = config_in(dir.path());
        generate_into(&mut config, 3);
        config.verifier.mode = VerifierMode::Direct;
        config.verifier.program = stub_verifier(dir.path());
        config.verifier.args = vec!["{query}".into(), "{model}".into()];
        config.verifier.timeout_secs = 1;

        let verifier = ProcessVerifier::new(config.verifier.clone());
        let started = Instant::now();
        let summary = Runner::with_verifier(config.clone(), Box::new(verifier))
            .unwrap()
            .run()
            .unwrap();
        // the stub's sleep is a child of the shell and must die with it
        assert!(started.elapsed() < Duration::from_secs(10));

        assert_eq!(summary.sat, 2);
        assert_eq!(summary.timeout, 1);
        let table = read_results(&config.paths.results).unwrap();
        assert_eq!(table.rows[1].outcome, Outcome::Timeout);
        assert!(table.rows[0].time_sec.unwrap() >= 0.0);
    }

    #[test]
    fn test_unknown_binary_is_fatal() {
        let dir = TempDir::new().unwrap();
        let mut config = config_in(dir.path());
        generate_into(&mut config, 1);
        config.verifier.mode = VerifierMode::Direct;
        config.verifier.program = "attack-diag-missing-verifier".into();

        assert!(Runner::new(config.clone()).unwrap().run().is_err());
        assert!(!config.paths.results.exists());
    }
}
