//! `ocn reconcile --paper` end to end
//!
//! # Invariants under test
//!
//! 1. A funded paper node converges every tuple and exits 0.
//! 2. `--json` prints one document with pass_id, config_hash and the report.
//! 3. An underfunded node reports insufficient_funds and exits non-zero.
//! 4. `submit_tx: false` never writes, so an unregistered tuple fails.
//! 5. One failing tuple does not stop the others from converging.
//! 6. Live mode starts without any mnemonic in the environment; an
//!    unreachable gateway surfaces as a read failure.

use std::fs;
use std::process::Command;

use assert_cmd::prelude::*;
use predicates::prelude::*;
use serde_json::Value;

fn ocn() -> Command {
    let mut cmd = Command::cargo_bin("ocn").expect("binary builds");
    cmd.env_remove("OCN_CONFIG_JSON")
        .env_remove("OCN_CONFIG_FILE_PATH")
        .env("RUST_LOG", "warn");
    cmd
}

fn write_config(dir: &tempfile::TempDir, yaml: &str) -> String {
    let path = dir.path().join("node.yaml");
    fs::write(&path, yaml).unwrap();
    path.to_string_lossy().to_string()
}

const NODE: &str = r#"
wallet:
  address: "allo1papernode"
worker:
  - topic_id: 1
reputer:
  - topic_id: 2
    min_stake: 300
"#;

#[test]
fn funded_paper_node_converges() {
    let dir = tempfile::tempdir().unwrap();
    let cfg = write_config(&dir, NODE);

    // 2 registrations (100 each) + 1 stake top-up of 300.
    ocn()
        .args([
            "reconcile",
            "--config",
            &cfg,
            "--paper",
            "--paper-balance",
            "1000",
            "--paper-fee",
            "100",
        ])
        .assert()
        .success()
        .stdout(predicate::str::contains("mode=paper"))
        .stdout(predicate::str::contains(
            "tuple role=worker topic_id=1 converged=true wrote=true",
        ))
        .stdout(predicate::str::contains(
            "tuple role=reputer topic_id=2 converged=true wrote=true",
        ))
        .stdout(predicate::str::contains("paper_tx_count=3"))
        .stdout(predicate::str::contains("converged=2/2"));
}

#[test]
fn json_report_is_a_single_document() {
    let dir = tempfile::tempdir().unwrap();
    let cfg = write_config(&dir, NODE);

    let out = ocn()
        .args([
            "reconcile",
            "--config",
            &cfg,
            "--paper",
            "--paper-balance",
            "1000",
            "--paper-fee",
            "100",
            "--json",
        ])
        .output()
        .unwrap();
    assert!(out.status.success());

    let doc: Value = serde_json::from_slice(&out.stdout).expect("stdout is json");
    assert_eq!(doc["mode"], "paper");
    assert_eq!(doc["address"], "allo1papernode");
    assert_eq!(doc["all_converged"], true);
    assert_eq!(doc["config_hash"].as_str().unwrap().len(), 64);
    assert!(doc["pass_id"].as_str().is_some());
    assert!(doc["started_at_utc"].as_str().is_some());

    let outcomes = doc["report"]["outcomes"].as_array().unwrap();
    assert_eq!(outcomes.len(), 2);
    assert_eq!(outcomes[0]["role"], "worker");
    assert_eq!(outcomes[0]["topic_id"], 1);
    assert_eq!(outcomes[1]["role"], "reputer");
    assert_eq!(outcomes[1]["topic_id"], 2);
    assert!(outcomes[1].get("failure").is_none());
}

#[test]
fn underfunded_node_reports_insufficient_funds() {
    let dir = tempfile::tempdir().unwrap();
    let cfg = write_config(
        &dir,
        "wallet:\n  address: allo1poor\nworker:\n  - topic_id: 1\n",
    );

    ocn()
        .args([
            "reconcile",
            "--config",
            &cfg,
            "--paper",
            "--paper-balance",
            "99",
            "--paper-fee",
            "100",
        ])
        .assert()
        .failure()
        .stdout(predicate::str::contains(
            "tuple role=worker topic_id=1 converged=false failure=insufficient_funds",
        ))
        .stdout(predicate::str::contains("paper_tx_count=0"))
        .stderr(predicate::str::contains("NOT_CONVERGED"))
        .stderr(predicate::str::contains("worker/1"));
}

#[test]
fn dry_run_wallet_never_writes() {
    let dir = tempfile::tempdir().unwrap();
    let cfg = write_config(
        &dir,
        "wallet:\n  address: allo1dry\n  submit_tx: false\nworker:\n  - topic_id: 3\n",
    );

    ocn()
        .args([
            "reconcile",
            "--config",
            &cfg,
            "--paper",
            "--paper-balance",
            "1000",
            "--paper-fee",
            "1",
        ])
        .assert()
        .failure()
        .stdout(predicate::str::contains("failure=submission_failure"))
        .stdout(predicate::str::contains("paper_tx_count=0"));
}

#[test]
fn failing_tuple_does_not_block_others() {
    let dir = tempfile::tempdir().unwrap();
    // Reputer needs 100 fee + 10_000 stake; worker needs only the fee.
    let cfg = write_config(
        &dir,
        r#"
wallet:
  address: "allo1mixed"
worker:
  - topic_id: 5
reputer:
  - topic_id: 6
    min_stake: "10000"
"#,
    );

    let out = ocn()
        .args([
            "reconcile",
            "--config",
            &cfg,
            "--paper",
            "--paper-balance",
            "500",
            "--paper-fee",
            "100",
            "--json",
        ])
        .output()
        .unwrap();
    assert!(!out.status.success());

    let doc: Value = serde_json::from_slice(&out.stdout).unwrap();
    assert_eq!(doc["all_converged"], false);
    let outcomes = doc["report"]["outcomes"].as_array().unwrap();
    assert_eq!(outcomes[0]["role"], "worker");
    assert_eq!(outcomes[0]["converged"], true);
    assert_eq!(outcomes[1]["role"], "reputer");
    assert_eq!(outcomes[1]["converged"], false);
    assert!(outcomes[1]["detail"].as_str().unwrap().contains("topic=6"));
}

#[test]
fn live_mode_needs_no_local_key_material() {
    let dir = tempfile::tempdir().unwrap();
    // Nothing listens on port 9: the pass must reach the ledger reads.
    let cfg = write_config(
        &dir,
        r#"
wallet:
  address: "allo1live"
ledger:
  rest_url: "http://127.0.0.1:9"
  relay_url: "http://127.0.0.1:9"
  request_timeout_ms: 500
worker:
  - topic_id: 1
"#,
    );

    ocn()
        .args(["reconcile", "--config", &cfg])
        .assert()
        .failure()
        .stdout(predicate::str::contains("mode=live"))
        .stdout(predicate::str::contains(
            "tuple role=worker topic_id=1 converged=false failure=read_failure",
        ))
        .stderr(predicate::str::contains("NOT_CONVERGED"))
        .stderr(predicate::str::contains("SECRETS_MISSING").not());
}
