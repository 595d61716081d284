// SPDX-License-Identifier: PMPL-1.0-or-later

//! Use-case model, analysis and LaTeX report round trip through the filesystem

use attack_diag::config::HarnessConfig;
use attack_diag::usecase::{self, latex};
use std::fs;
use tempfile::TempDir;

#[test]
fn test_use_case_outputs() {
    let dir = TempDir::new().unwrap();
    let analysis = usecase::run_use_case(&HarnessConfig::default(), dir.path(), false).unwrap();
    assert!(analysis.verification.is_none());

    let model = fs::read_to_string(dir.path().join(usecase::MODEL_FILE)).unwrap();
    assert!(model.contains("compromised_cc_db_exfiltrated"));
    assert!(model.contains("can_attack_auth_service_exploit"));

    let query = fs::read_to_string(dir.path().join(usecase::QUERY_FILE)).unwrap();
    assert!(query.contains("AG (compromised_cc_db_exfiltrated >= 1"));

    let loaded = usecase::load_analysis(&dir.path().join(usecase::ANALYSIS_FILE)).unwrap();
    assert_eq!(loaded.path_analysis.total_paths, 5);
    assert!(loaded.diagnosability.unique_diagnosis_possible);
    assert_eq!(loaded.nodes.len(), 10);
}

#[test]
fn test_report_from_saved_analysis() {
    let dir = TempDir::new().unwrap();
    usecase::run_use_case(&HarnessConfig::default(), dir.path(), false).unwrap();
    let analysis = usecase::load_analysis(&dir.path().join(usecase::ANALYSIS_FILE)).unwrap();

    let out = dir.path().join("tex");
    let written = latex::write_report(&analysis, &out).unwrap();
    assert_eq!(written.len(), 3);

    let table = fs::read_to_string(out.join(latex::TABLE_FILE)).unwrap();
    assert!(table.contains("tab:diagnosed-attack-path"));
    let report = fs::read_to_string(out.join(latex::REPORT_FILE)).unwrap();
    assert!(report.contains("network\\_lateral\\_movement"));
    let summary = fs::read_to_string(out.join(latex::SUMMARY_FILE)).unwrap();
    assert!(summary.contains("Unique diagnosis possible: true"));
}

#[test]
fn test_missing_analysis_is_reported() {
    let dir = TempDir::new().unwrap();
    let err = usecase::load_analysis(&dir.path().join("absent.json")).unwrap_err();
    assert!(err.to_string().contains("attack-diag use-case"));
}
