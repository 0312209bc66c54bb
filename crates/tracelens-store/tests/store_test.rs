use chrono::{Duration, TimeZone, Utc};
use tracelens_core::{
    compute_hash, compute_verdict, load_graph, seal, to_snapshot_at, verify_integrity,
    ExpectationSpec, TraceDraft, TraceMessage, TraceRequest, TraceResponse, VerdictStatus,
};
use tracelens_store::{StoreError, TraceQuery, TraceStore};

fn draft(exec: &str, node: &str, parent: Option<&str>, text: &str) -> TraceDraft {
    let mut d = TraceDraft::new(
        TraceRequest::llm("openai", "gpt-4", vec![TraceMessage::new("user", "hello")]),
        TraceResponse::new(text, 120),
    )
    .in_execution(exec, node);
    d.parent_node_id = parent.map(str::to_string);
    d
}

fn at(secs: i64) -> chrono::DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 1, 17, 2, 0, 0).unwrap() + Duration::seconds(secs)
}

#[test]
fn open_requires_init() {
    let dir = tempfile::tempdir().unwrap();
    let err = TraceStore::open(dir.path()).err().unwrap();
    assert!(matches!(err, StoreError::NotInitialized { .. }));
    TraceStore::init(dir.path()).unwrap();
    TraceStore::open(dir.path()).unwrap();
}

#[test]
fn execution_round_trip_through_store() {
    let dir = tempfile::tempdir().unwrap();
    let store = TraceStore::init(dir.path()).unwrap();

    let failing = draft("exec-1", "B", Some("A"), "I'm sorry").with_expectations(ExpectationSpec {
        must_not_include: vec!["sorry".into()],
        ..Default::default()
    });
    // saved out of causal order; canonical order comes from timestamps
    store.save(&seal(draft("exec-1", "C", Some("B"), "done"), at(2)).unwrap()).unwrap();
    store.save(&seal(draft("exec-1", "A", None, "start"), at(0)).unwrap()).unwrap();
    store.save(&seal(failing, at(1)).unwrap()).unwrap();

    let graph = load_graph(&store, "exec-1").unwrap();
    assert_eq!(graph.topological_order(), vec!["A", "B", "C"]);
    let verdict = compute_verdict(&graph);
    assert_eq!(verdict.status, VerdictStatus::Fail);
    assert_eq!(verdict.root_cause_node.as_deref(), Some("B"));

    let execs = store.executions().unwrap();
    assert_eq!(execs.len(), 1);
    assert_eq!(execs[0].failed_count, 1);

    let missing = load_graph(&store, "exec-404").unwrap_err();
    assert!(missing.is_not_found());
}

#[test]
fn traces_are_write_once() {
    let dir = tempfile::tempdir().unwrap();
    let store = TraceStore::init(dir.path()).unwrap();
    let trace = seal(draft("e", "n", None, "x"), at(0)).unwrap();
    store.save(&trace).unwrap();
    let err = store.save(&trace).unwrap_err();
    assert!(err.is_already_exists());
    assert_eq!(store.count(&TraceQuery::latest(10)).unwrap(), 1);
}

#[test]
fn duplicate_node_keeps_execution_loadable() {
    let dir = tempfile::tempdir().unwrap();
    let store = TraceStore::init(dir.path()).unwrap();
    store.save(&seal(draft("e", "a", None, "x"), at(0)).unwrap()).unwrap();

    let again = seal(draft("e", "a", None, "y"), at(1)).unwrap();
    let err = store.save(&again).unwrap_err();
    assert!(matches!(err, StoreError::DuplicateNode { ref node_id, .. } if node_id == "a"));
    // the same node id in another execution is fine
    store.save(&seal(draft("other", "a", None, "z"), at(2)).unwrap()).unwrap();

    let graph = load_graph(&store, "e").unwrap();
    assert_eq!(graph.len(), 1);
    assert_eq!(store.count(&TraceQuery::latest(10)).unwrap(), 2);
}

#[test]
fn save_all_stores_nothing_on_rejection() {
    let dir = tempfile::tempdir().unwrap();
    let store = TraceStore::init(dir.path()).unwrap();
    store.save(&seal(draft("e", "a", None, "x"), at(0)).unwrap()).unwrap();

    let clashing_in_batch = [
        seal(draft("f", "a", None, "1"), at(1)).unwrap(),
        seal(draft("f", "a", None, "2"), at(2)).unwrap(),
    ];
    let err = store.save_all(&clashing_in_batch).unwrap_err();
    assert!(matches!(err, StoreError::DuplicateNode { .. }));

    let clashing_with_store = [
        seal(draft("e", "b", Some("a"), "1"), at(3)).unwrap(),
        seal(draft("e", "a", None, "2"), at(4)).unwrap(),
    ];
    let err = store.save_all(&clashing_with_store).unwrap_err();
    assert!(matches!(err, StoreError::DuplicateNode { .. }));

    assert_eq!(store.count(&TraceQuery::latest(10)).unwrap(), 1);
    assert!(load_graph(&store, "f").unwrap_err().is_not_found());

    let ok = [
        seal(draft("e", "b", Some("a"), "1"), at(3)).unwrap(),
        seal(draft("e", "c", Some("b"), "2"), at(4)).unwrap(),
    ];
    assert_eq!(store.save_all(&ok).unwrap().len(), 2);
    assert_eq!(load_graph(&store, "e").unwrap().len(), 3);
}

#[test]
fn bless_refuses_silent_replacement() {
    let dir = tempfile::tempdir().unwrap();
    let store = TraceStore::init(dir.path()).unwrap();
    let first = seal(draft("e", "a", None, "Paris"), at(0)).unwrap();
    let second = seal(draft("e", "b", None, "Lyon"), at(1)).unwrap();
    store.save(&first).unwrap();
    store.save(&second).unwrap();

    store.bless(&first.trace_id, false, at(5)).unwrap();
    // blessing the same trace again is a no-op
    store.bless(&first.trace_id, false, at(6)).unwrap();
    let err = store.bless(&second.trace_id, false, at(7)).unwrap_err();
    assert!(matches!(err, StoreError::GoldenConflict { .. }));

    let replaced = store.bless(&second.trace_id, true, at(8)).unwrap();
    assert_eq!(store.goldens().unwrap()["gpt-4:openai"], replaced);

    store.unbless(&second.trace_id).unwrap();
    assert!(store.goldens().unwrap().is_empty());
    assert!(store.unbless(&second.trace_id).unwrap_err().is_not_found());

    // the trace file itself was never touched
    assert_eq!(store.get(&first.trace_id).unwrap(), first);
}

#[test]
fn lineage_and_latest_replay() {
    let dir = tempfile::tempdir().unwrap();
    let store = TraceStore::init(dir.path()).unwrap();
    let original = seal(draft("e", "a", None, "v1"), at(0)).unwrap();
    store.save(&original).unwrap();

    let mut r1 = draft("replay-1", "a", None, "v2");
    r1.replay_of = Some(original.trace_id.clone());
    let r1 = seal(r1, at(10)).unwrap();
    let mut r2 = draft("replay-2", "a", None, "v3");
    r2.replay_of = Some(original.trace_id.clone());
    let r2 = seal(r2, at(20)).unwrap();
    store.save(&r1).unwrap();
    store.save(&r2).unwrap();

    let lineage: Vec<_> = store
        .lineage(&r2.trace_id)
        .unwrap()
        .into_iter()
        .map(|t| t.trace_id)
        .collect();
    assert_eq!(lineage, vec![original.trace_id.clone(), r1.trace_id, r2.trace_id.clone()]);
    assert_eq!(
        store.latest_replay_of(&original.trace_id).unwrap().map(|t| t.trace_id),
        Some(r2.trace_id)
    );
    assert!(store.lineage("nope").unwrap_err().is_not_found());
}

#[test]
fn snapshots_persist_as_is() {
    let dir = tempfile::tempdir().unwrap();
    let store = TraceStore::init(dir.path()).unwrap();
    store.save(&seal(draft("e", "a", None, "x"), at(0)).unwrap()).unwrap();
    let graph = load_graph(&store, "e").unwrap();
    let snapshot = to_snapshot_at(&graph, at(10)).unwrap();

    let path = store.save_snapshot(&snapshot).unwrap();
    assert!(path
        .file_name()
        .unwrap()
        .to_string_lossy()
        .starts_with(&format!("e-20260117T020010000000Z-{}", &snapshot.hash[..12])));
    assert!(store.save_snapshot(&snapshot).unwrap_err().is_already_exists());

    // the graph did not change; a later snapshot still gets its own file
    let again = to_snapshot_at(&graph, at(11)).unwrap();
    assert_eq!(again.hash, snapshot.hash);
    let again_path = store.save_snapshot(&again).unwrap();
    assert_ne!(again_path, path);

    let loaded = store.load_snapshot(&path).unwrap();
    assert_eq!(loaded, snapshot);
    assert!(verify_integrity(&loaded).unwrap().is_intact());
    assert_eq!(loaded.hash, compute_hash(&graph).unwrap());
}

#[test]
fn reindex_recovers_from_files() {
    let dir = tempfile::tempdir().unwrap();
    let store = TraceStore::init(dir.path()).unwrap();
    for (i, node) in ["a", "b", "c"].iter().enumerate() {
        store
            .save(&seal(draft("e", node, None, "x"), at(i as i64)).unwrap())
            .unwrap();
    }
    std::fs::remove_file(dir.path().join("index.db")).unwrap();
    let reopened = TraceStore::open(dir.path()).unwrap();
    assert_eq!(reopened.count(&TraceQuery::latest(10)).unwrap(), 0);
    assert_eq!(reopened.reindex().unwrap(), 3);
    assert_eq!(load_graph(&reopened, "e").unwrap().topological_order(), vec!["a", "b", "c"]);
}
