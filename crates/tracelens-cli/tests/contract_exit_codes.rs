#![allow(deprecated)]
use assert_cmd::Command;
use predicates::prelude::*;
use serde_json::{json, Value};
use std::fs;
use std::path::Path;
use tempfile::{tempdir, TempDir};

fn tracelens(home: &Path) -> Command {
    let mut cmd = Command::cargo_bin("tracelens").unwrap();
    cmd.arg("--home").arg(home).env_remove("TRACELENS_HOME");
    cmd
}

fn initialized() -> TempDir {
    let dir = tempdir().unwrap();
    tracelens(dir.path()).arg("init").assert().success();
    dir
}

fn draft(exec: &str, node: &str, parent: Option<&str>, text: &str) -> Value {
    let mut d = json!({
        "execution_id": exec,
        "node_id": node,
        "request": {
            "provider": "openai",
            "model": "gpt-4",
            "messages": [{"role": "user", "content": format!("step {node}")}]
        },
        "response": {"text": text, "latency_ms": 100},
        "expectations": {"must_not_include": ["error"]}
    });
    if let Some(p) = parent {
        d["parent_node_id"] = json!(p);
    }
    d
}

/// Ingest drafts as JSONL and return the ingest report.
fn ingest(home: &Path, drafts: &[Value]) -> Vec<Value> {
    let file = home.join("drafts.jsonl");
    let body: Vec<String> = drafts.iter().map(Value::to_string).collect();
    fs::write(&file, body.join("\n")).unwrap();
    let out = tracelens(home)
        .args(["--format", "json", "ingest"])
        .arg(&file)
        .output()
        .unwrap();
    assert!(out.status.success(), "ingest failed: {}", String::from_utf8_lossy(&out.stderr));
    serde_json::from_slice(&out.stdout).unwrap()
}

fn chain(home: &Path, exec: &str, middle: &str) {
    ingest(
        home,
        &[
            draft(exec, "a", None, "ok"),
            draft(exec, "b", Some("a"), middle),
            draft(exec, "c", Some("b"), "ok"),
        ],
    );
}

#[test]
fn contract_uninitialized_home_is_operational_error() {
    let dir = tempdir().unwrap();
    tracelens(dir.path())
        .args(["verdict", "e1"])
        .assert()
        .code(2)
        .stderr(predicate::str::contains("tracelens init"));
}

#[test]
fn contract_verdict_pass_fail_and_not_found() {
    let home = initialized();
    chain(home.path(), "good", "ok");
    chain(home.path(), "bad", "an error occurred");

    tracelens(home.path())
        .args(["verdict", "good"])
        .assert()
        .code(0)
        .stdout(predicate::str::contains("All nodes passed"));

    tracelens(home.path())
        .args(["verdict", "bad"])
        .assert()
        .code(1)
        .stdout(predicate::str::contains("Root cause: step b"));

    tracelens(home.path())
        .args(["verdict", "missing"])
        .assert()
        .code(2);
}

#[test]
fn contract_verdict_json_shape() {
    let home = initialized();
    chain(home.path(), "bad", "an error occurred");

    let out = tracelens(home.path())
        .args(["--format", "json", "verdict", "bad"])
        .output()
        .unwrap();
    assert_eq!(out.status.code(), Some(1));
    let v: Value = serde_json::from_slice(&out.stdout).unwrap();
    assert_eq!(v["status"], "fail");
    assert_eq!(v["root_cause_node"], "b");
    assert_eq!(v["failed_count"], 1);
    assert_eq!(v["tainted_count"], 1);
}

#[test]
fn contract_investigate_and_analyze_are_informational() {
    let home = initialized();
    chain(home.path(), "bad", "an error occurred");

    tracelens(home.path())
        .args(["investigate", "bad"])
        .assert()
        .code(0)
        .stdout(predicate::str::contains("Examine root cause node b"))
        .stdout(predicate::str::contains("Blast radius: 1 downstream node affected"));

    tracelens(home.path())
        .args(["analyze", "bad"])
        .assert()
        .code(0)
        .stdout(predicate::str::contains("a -> b -> c"));
}

#[test]
fn contract_snapshot_verify_and_tamper() {
    let home = initialized();
    chain(home.path(), "e1", "ok");

    let out = tracelens(home.path())
        .args(["--format", "json", "snapshot", "e1"])
        .output()
        .unwrap();
    assert!(out.status.success());
    let saved: Value = serde_json::from_slice(&out.stdout).unwrap();
    let path = saved["path"].as_str().unwrap().to_string();
    assert_eq!(saved["hash"].as_str().unwrap().len(), 64);

    tracelens(home.path())
        .args(["verify", &path])
        .assert()
        .code(0)
        .stdout(predicate::str::contains("intact"));

    let mut snapshot: Value = serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
    snapshot["nodes"][1]["response_text"] = json!("edited");
    fs::write(&path, snapshot.to_string()).unwrap();

    tracelens(home.path())
        .args(["verify", &path])
        .assert()
        .code(1)
        .stdout(predicate::str::contains("TAMPERED"));
}

#[test]
fn contract_repeated_snapshot_of_unchanged_graph() {
    let home = initialized();
    chain(home.path(), "e1", "ok");

    let mut paths = Vec::new();
    for _ in 0..2 {
        let out = tracelens(home.path())
            .args(["--format", "json", "snapshot", "e1"])
            .output()
            .unwrap();
        assert_eq!(out.status.code(), Some(0));
        let saved: Value = serde_json::from_slice(&out.stdout).unwrap();
        paths.push(saved["path"].as_str().unwrap().to_string());
    }
    assert_ne!(paths[0], paths[1]);
}

#[test]
fn contract_snapshot_of_traversal_execution_id_stays_home() {
    let root = tempdir().unwrap();
    let home = root.path().join("home");
    tracelens(&home).arg("init").assert().success();
    let exec = "../../escaped/x";
    ingest(&home, &[draft(exec, "a", None, "ok")]);

    let out = tracelens(&home)
        .args(["--format", "json", "snapshot", exec])
        .output()
        .unwrap();
    assert_eq!(out.status.code(), Some(0));
    let saved: Value = serde_json::from_slice(&out.stdout).unwrap();
    let path = Path::new(saved["path"].as_str().unwrap());
    assert_eq!(path.parent(), Some(home.join("snapshots").as_path()));
    assert!(!root.path().join("escaped").exists());
    tracelens(&home)
        .arg("verify")
        .arg(path)
        .assert()
        .code(0);
}

#[test]
fn contract_golden_check() {
    let home = initialized();

    // no goldens is a warning, not a failure
    tracelens(home.path()).arg("check").assert().code(0);

    let golden = &ingest(home.path(), &[draft("g", "a", None, "Paris")])[0];
    let golden_id = golden["trace_id"].as_str().unwrap();
    tracelens(home.path()).args(["bless", golden_id]).assert().code(0);

    // blessed but never replayed: skipped
    tracelens(home.path())
        .arg("check")
        .assert()
        .code(0)
        .stdout(predicate::str::contains("SKIP"));

    let mut replay = draft("r1", "a", None, "Paris");
    replay["replay_of"] = json!(golden_id);
    ingest(home.path(), &[replay]);
    tracelens(home.path()).arg("check").assert().code(0);

    let mut drifted = draft("r2", "a", None, "London");
    drifted["replay_of"] = json!(golden_id);
    ingest(home.path(), &[drifted]);
    tracelens(home.path())
        .arg("check")
        .assert()
        .code(1)
        .stdout(predicate::str::contains("FAIL"));
}

#[test]
fn contract_bless_conflict_needs_force() {
    let home = initialized();
    let first = ingest(home.path(), &[draft("x", "a", None, "one")]);
    let second = ingest(home.path(), &[draft("y", "a", None, "two")]);
    let first_id = first[0]["trace_id"].as_str().unwrap();
    let second_id = second[0]["trace_id"].as_str().unwrap();

    tracelens(home.path()).args(["bless", first_id]).assert().code(0);
    tracelens(home.path())
        .args(["bless", second_id])
        .assert()
        .code(2)
        .stderr(predicate::str::contains("--force"));
    tracelens(home.path())
        .args(["bless", second_id, "--force"])
        .assert()
        .code(0);
}

#[test]
fn contract_eval_text_and_malformed_expectations() {
    let home = initialized();
    let rules = home.path().join("rules.yaml");
    fs::write(&rules, "must_include: [refund]\nmax_latency_ms: 500\n").unwrap();

    tracelens(home.path())
        .args(["eval", "--text", "refund approved", "--expectations"])
        .arg(&rules)
        .assert()
        .code(0);

    tracelens(home.path())
        .args(["eval", "--text", "no", "--latency-ms", "900", "--expectations"])
        .arg(&rules)
        .assert()
        .code(1)
        .stdout(predicate::str::contains("must_include: missing 'refund'"))
        .stdout(predicate::str::contains("max_latency_ms"));

    let bad = home.path().join("bad.yaml");
    fs::write(&bad, "max_latency_ms: -1\n").unwrap();
    tracelens(home.path())
        .args(["eval", "--text", "x", "--expectations"])
        .arg(&bad)
        .assert()
        .code(2);
}

#[test]
fn contract_ingest_rejects_malformed_rules_and_stores_nothing() {
    let home = initialized();
    let mut bad = draft("e1", "a", None, "ok");
    bad["expectations"] = json!({"min_tokens": -5});
    let file = home.path().join("bad.json");
    fs::write(&file, bad.to_string()).unwrap();

    tracelens(home.path()).arg("ingest").arg(&file).assert().code(2);
    tracelens(home.path()).args(["verdict", "e1"]).assert().code(2);
}

#[test]
fn contract_ingest_duplicate_node_rejects_whole_batch() {
    let home = initialized();
    let file = home.path().join("dup.jsonl");
    let batch = [
        draft("e1", "a", None, "ok"),
        draft("e1", "b", Some("a"), "ok"),
        draft("e1", "a", None, "again"),
    ];
    let body: Vec<String> = batch.iter().map(Value::to_string).collect();
    fs::write(&file, body.join("\n")).unwrap();

    tracelens(home.path())
        .arg("ingest")
        .arg(&file)
        .assert()
        .code(2)
        .stderr(predicate::str::contains("already recorded"));
    tracelens(home.path()).args(["verdict", "e1"]).assert().code(2);

    // a later batch that reuses a stored node id is rejected too
    chain(home.path(), "e1", "ok");
    let file = home.path().join("late.json");
    fs::write(&file, draft("e1", "b", Some("a"), "late").to_string()).unwrap();
    tracelens(home.path()).arg("ingest").arg(&file).assert().code(2);
    tracelens(home.path()).args(["verdict", "e1"]).assert().code(0);
}

#[test]
fn contract_graph_check_aggregates() {
    let home = initialized();
    chain(home.path(), "good", "ok");
    tracelens(home.path()).arg("graph-check").assert().code(0);

    chain(home.path(), "bad", "an error occurred");
    tracelens(home.path())
        .arg("graph-check")
        .assert()
        .code(1)
        .stdout(predicate::str::contains("2 execution(s), 1 failed"));

    tracelens(home.path())
        .args(["graph-check", "good", "nope"])
        .assert()
        .code(2);
}

#[test]
fn contract_reindex_keeps_executions_queryable() {
    let home = initialized();
    chain(home.path(), "e1", "ok");
    fs::remove_file(home.path().join("index.db")).unwrap();

    tracelens(home.path())
        .arg("reindex")
        .assert()
        .code(0)
        .stdout(predicate::str::contains("Reindexed 3 trace(s)"));
    tracelens(home.path()).args(["verdict", "e1"]).assert().code(0);
}
