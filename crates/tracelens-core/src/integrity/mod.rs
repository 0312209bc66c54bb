//! Content hashing and tamper-evident snapshots.
//!
//! # Hash input
//!
//! The hash covers exactly the semantic content of a graph:
//! - node ids, in canonical order
//! - declared parent links
//! - verdict statuses (`null` for neutral nodes)
//! - response text
//! - resolved edges
//!
//! It excludes the execution id, labels, latencies and the capture time, so
//! re-exporting the same content always yields the same hash. Bytes are RFC
//! 8785 canonical JSON, digested with SHA-256 and rendered as 64 lowercase
//! hex characters.

pub mod jcs;

use crate::errors::EngineError;
use crate::graph::{ExecutionGraph, GraphEdge, GraphNode};
use crate::model::VerdictStatus;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tracing::debug;

/// Binds every hash to this input layout.
const HASH_INPUT_VERSION: &str = "tracelens.graph.v1";

#[derive(Serialize)]
struct GraphHashInput<'a> {
    version: &'a str,
    nodes: Vec<NodeHashInput<'a>>,
    edges: &'a [GraphEdge],
}

#[derive(Serialize)]
struct NodeHashInput<'a> {
    node_id: &'a str,
    parent_node_id: Option<&'a str>,
    verdict_status: Option<VerdictStatus>,
    response_text: &'a str,
}

fn hash_parts(nodes: &[GraphNode], edges: &[GraphEdge]) -> Result<String, EngineError> {
    let input = GraphHashInput {
        version: HASH_INPUT_VERSION,
        nodes: nodes
            .iter()
            .map(|n| NodeHashInput {
                node_id: &n.node_id,
                parent_node_id: n.parent_node_id.as_deref(),
                verdict_status: n.verdict_status,
                response_text: &n.response_text,
            })
            .collect(),
        edges,
    };
    let bytes = jcs::to_vec(&input)?;
    Ok(hex::encode(Sha256::digest(&bytes)))
}

pub fn compute_hash(graph: &ExecutionGraph) -> Result<String, EngineError> {
    hash_parts(graph.nodes(), graph.edges())
}

/// Immutable export of a graph. Once written it is never regenerated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Snapshot {
    pub hash: String,
    pub execution_id: String,
    pub nodes: Vec<GraphNode>,
    pub edges: Vec<GraphEdge>,
    pub captured_at: DateTime<Utc>,
}

pub fn to_snapshot(graph: &ExecutionGraph) -> Result<Snapshot, EngineError> {
    to_snapshot_at(graph, Utc::now())
}

pub fn to_snapshot_at(
    graph: &ExecutionGraph,
    captured_at: DateTime<Utc>,
) -> Result<Snapshot, EngineError> {
    let hash = compute_hash(graph)?;
    debug!(execution_id = %graph.execution_id, hash = %hash, "snapshot taken");
    Ok(Snapshot {
        hash,
        execution_id: graph.execution_id.clone(),
        nodes: graph.nodes().to_vec(),
        edges: graph.edges().to_vec(),
        captured_at,
    })
}

/// Outcome of re-hashing a snapshot's embedded content.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IntegrityReport {
    pub expected: String,
    pub actual: String,
}

impl IntegrityReport {
    pub fn is_intact(&self) -> bool {
        self.expected == self.actual
    }
}

pub fn verify_integrity(snapshot: &Snapshot) -> Result<IntegrityReport, EngineError> {
    Ok(IntegrityReport {
        expected: snapshot.hash.clone(),
        actual: hash_parts(&snapshot.nodes, &snapshot.edges)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::build_graph;
    use crate::graph::fixtures::trace;
    use chrono::TimeZone;

    fn sample() -> ExecutionGraph {
        build_graph(
            "e1",
            &[
                trace("a", None, None),
                trace("b", Some("a"), Some(VerdictStatus::Pass)),
            ],
        )
        .unwrap()
    }

    #[test]
    fn test_hash_shape_and_stability() {
        let g = sample();
        let h = compute_hash(&g).unwrap();
        assert_eq!(h.len(), 64);
        assert!(h.chars().all(|c| c.is_ascii_hexdigit() && !c.is_ascii_uppercase()));
        assert_eq!(h, compute_hash(&g).unwrap());
    }

    #[test]
    fn test_capture_time_not_hashed() {
        let g = sample();
        let early = to_snapshot_at(&g, Utc.with_ymd_and_hms(2020, 1, 1, 0, 0, 0).unwrap()).unwrap();
        let late = to_snapshot_at(&g, Utc.with_ymd_and_hms(2030, 1, 1, 0, 0, 0).unwrap()).unwrap();
        assert_eq!(early.hash, late.hash);
    }

    #[test]
    fn test_execution_id_not_hashed() {
        let a = sample();
        let mut traces = vec![trace("a", None, None), trace("b", Some("a"), Some(VerdictStatus::Pass))];
        for t in &mut traces {
            t.execution_id = Some("other".into());
            t.trace_id = format!("{}-copy", t.trace_id);
        }
        let b = build_graph("other", &traces).unwrap();
        assert_eq!(compute_hash(&a).unwrap(), compute_hash(&b).unwrap());
    }

    #[test]
    fn test_semantic_changes_move_the_hash() {
        let base = compute_hash(&sample()).unwrap();

        let text = build_graph(
            "e1",
            &[trace("a", None, None), {
                let mut t = trace("b", Some("a"), Some(VerdictStatus::Pass));
                t.response.text = "different".into();
                t
            }],
        )
        .unwrap();
        assert_ne!(base, compute_hash(&text).unwrap());

        let status = build_graph(
            "e1",
            &[trace("a", None, None), trace("b", Some("a"), Some(VerdictStatus::Fail))],
        )
        .unwrap();
        assert_ne!(base, compute_hash(&status).unwrap());

        let unlinked =
            build_graph("e1", &[trace("a", None, None), trace("b", None, Some(VerdictStatus::Pass))]).unwrap();
        assert_ne!(base, compute_hash(&unlinked).unwrap());
    }

    #[test]
    fn test_verify_detects_tampering() {
        let snap = to_snapshot(&sample()).unwrap();
        assert!(verify_integrity(&snap).unwrap().is_intact());

        let mut text = snap.clone();
        text.nodes[1].response_text.push('!');
        assert!(!verify_integrity(&text).unwrap().is_intact());

        let mut status = snap.clone();
        status.nodes[1].verdict_status = Some(VerdictStatus::Fail);
        assert!(!verify_integrity(&status).unwrap().is_intact());

        // labels are presentation only
        let mut label = snap;
        label.nodes[0].label = "renamed".into();
        assert!(verify_integrity(&label).unwrap().is_intact());
    }

    #[test]
    fn test_snapshot_json_shape() {
        let snap = to_snapshot(&sample()).unwrap();
        let value = serde_json::to_value(&snap).unwrap();
        for key in ["hash", "nodes", "edges", "captured_at"] {
            assert!(value.get(key).is_some(), "missing {key}");
        }
        let back: Snapshot = serde_json::from_value(value).unwrap();
        assert!(verify_integrity(&back).unwrap().is_intact());
    }
}
