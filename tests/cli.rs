// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 artiflow contributors

//! End-to-end tests for the artiflow binary

use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;
use std::path::Path;
use tempfile::TempDir;

const PNR: &str = r#"
pnr_innovus:
  dependency:
    FP_MODE:
      - place:
          in: [netlist.v]
          out: [place.pass]
          cmd: touch place.pass
      - route:
          in: [place.pass]
          out: [route.pass]
          cmd: touch route.pass
"#;

const PV: &str = r#"
pv_calibre:
  dependency:
    FP_MODE:
      - drc:
          in: [route.pass]
          out: [drc.pass]
          cmd: touch drc.pass
"#;

const CONFIG: &str = "sources:\n  - common/*/dependency.yaml\n";

fn project() -> TempDir {
    let dir = TempDir::new().unwrap();
    write(dir.path(), "common/pnr_innovus/dependency.yaml", PNR);
    write(dir.path(), "common/pv_calibre/dependency.yaml", PV);
    write(dir.path(), ".artiflow.yaml", CONFIG);
    dir
}

fn write(root: &Path, rel: &str, content: &str) {
    let path = root.join(rel);
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(path, content).unwrap();
}

fn artiflow(dir: &TempDir) -> Command {
    let mut cmd = Command::cargo_bin("artiflow").unwrap();
    cmd.current_dir(dir.path())
        .env("NO_COLOR", "1")
        .env_remove("RUST_LOG")
        .env_remove("ARTIFLOW_CONFIG")
        .env_remove("ARTIFLOW_POLICY");
    cmd
}

#[test]
fn test_list_steps_across_flows() {
    let dir = project();
    artiflow(&dir)
        .arg("list")
        .assert()
        .success()
        .stdout(predicate::str::contains("pnr_innovus.place"))
        .stdout(predicate::str::contains("pnr_innovus.route"))
        .stdout(predicate::str::contains("pv_calibre.drc"));
}

#[test]
fn test_run_downstream_executes_in_order() {
    let dir = project();
    artiflow(&dir)
        .args(["run", "--from", "pnr_innovus.place"])
        .assert()
        .success()
        .stdout(predicate::str::contains("3 finished, 0 failed"));

    for file in ["place.pass", "route.pass", "drc.pass"] {
        assert!(dir.path().join(file).exists(), "{} missing", file);
    }
}

#[test]
fn test_run_single_step() {
    let dir = project();
    artiflow(&dir)
        .args(["run", "--step", "pv_calibre.drc"])
        .assert()
        .success();

    assert!(dir.path().join("drc.pass").exists());
    assert!(!dir.path().join("place.pass").exists());
}

#[test]
fn test_dry_run_touches_nothing() {
    let dir = project();
    artiflow(&dir)
        .args(["run", "--to", "pv_calibre.drc", "--dry-run"])
        .assert()
        .success()
        .stdout(predicate::str::contains("3 finished"));

    assert!(!dir.path().join("drc.pass").exists());
}

#[test]
fn test_failure_blocks_downstream_under_strict() {
    let dir = project();
    write(
        dir.path(),
        "project/pnr_innovus/dependency.yaml",
        "pnr_innovus:\n  route:\n    in: [place.pass]\n    out: [route.pass]\n    cmd: exit 1\n",
    );
    write(
        dir.path(),
        ".artiflow.yaml",
        "sources:\n  - common/*/dependency.yaml\n  - project/*/dependency.yaml\n",
    );

    artiflow(&dir)
        .args(["run", "--from", "pnr_innovus.place"])
        .assert()
        .failure()
        .stdout(predicate::str::contains("Not executed"))
        .stdout(predicate::str::contains(
            "pv_calibre.drc (failed predecessor: pnr_innovus.route)",
        ));

    assert!(dir.path().join("place.pass").exists());
    assert!(!dir.path().join("drc.pass").exists());
}

#[test]
fn test_continue_policy_runs_past_failures() {
    let dir = project();
    write(
        dir.path(),
        "common/pnr_innovus/dependency.yaml",
        &PNR.replace("touch route.pass", "exit 1"),
    );

    artiflow(&dir)
        .args(["run", "--from", "pnr_innovus.place", "--policy", "continue"])
        .assert()
        .failure()
        .stdout(predicate::str::contains("2 finished, 1 failed"));

    assert!(dir.path().join("drc.pass").exists());
}

#[test]
fn test_json_report() {
    let dir = project();
    let output = artiflow(&dir)
        .args(["run", "--from", "pnr_innovus.route", "--format", "json", "--dry-run"])
        .output()
        .unwrap();

    assert!(output.status.success());
    let report: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(report["success"], true);
    assert_eq!(report["statuses"]["pv_calibre.drc"], "FINISHED");
    assert!(report["statuses"].get("pnr_innovus.place").is_none());
}

#[test]
fn test_unknown_step_suggests_alternatives() {
    let dir = project();
    artiflow(&dir)
        .args(["run", "--step", "pv.drc"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("pv_calibre.drc"));
}

#[test]
fn test_run_requires_a_target() {
    let dir = project();
    artiflow(&dir)
        .arg("run")
        .assert()
        .failure()
        .stderr(predicate::str::contains("Nothing to run"));
}

#[test]
fn test_range_without_path_fails() {
    let dir = project();
    artiflow(&dir)
        .args(["run", "--from", "pv_calibre.drc", "--to", "pnr_innovus.place"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("No dependency path"));
}

#[test]
fn test_validate() {
    let dir = project();
    artiflow(&dir)
        .arg("validate")
        .assert()
        .success()
        .stdout(predicate::str::contains("3 steps from 2 sources"));
}

#[test]
fn test_validate_reports_cycle() {
    let dir = project();
    write(
        dir.path(),
        "common/loop/dependency.yaml",
        concat!(
            "loop:\n",
            "  a:\n    in: [y]\n    out: [x]\n    cmd: a\n",
            "  b:\n    in: [x]\n    out: [y]\n    cmd: b\n",
        ),
    );

    artiflow(&dir)
        .arg("validate")
        .assert()
        .failure()
        .stdout(predicate::str::contains("loop.a, loop.b"));
}

#[test]
fn test_graph_dot() {
    let dir = project();
    artiflow(&dir)
        .args(["graph", "--format", "dot"])
        .assert()
        .success()
        .stdout(predicate::str::contains(
            "\"pnr_innovus.route\" -> \"pv_calibre.drc\" [label=\"route.pass\"];",
        ));
}

#[test]
fn test_explicit_sources_replace_config() {
    let dir = project();
    artiflow(&dir)
        .args(["--source", "common/pv_calibre/dependency.yaml", "list"])
        .assert()
        .success()
        .stdout(predicate::str::contains("pv_calibre.drc"))
        .stdout(predicate::str::contains("pnr_innovus").not());
}

#[test]
fn test_no_sources() {
    let dir = TempDir::new().unwrap();
    artiflow(&dir)
        .arg("list")
        .assert()
        .failure()
        .stderr(predicate::str::contains("No descriptor sources matched"));
}
