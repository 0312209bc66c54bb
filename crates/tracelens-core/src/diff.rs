//! Node-by-node comparison of two execution graphs.

use crate::graph::{ExecutionGraph, GraphEdge};
use crate::model::VerdictStatus;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// What differs on a node present in both graphs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChangeKind {
    VerdictStatus,
    ResponseText,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeChange {
    pub node_id: String,
    pub kinds: Vec<ChangeKind>,
    pub old_status: Option<VerdictStatus>,
    pub new_status: Option<VerdictStatus>,
    pub old_response: String,
    pub new_response: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GraphDiff {
    pub old_execution: String,
    pub new_execution: String,
    pub added: Vec<String>,
    pub removed: Vec<String>,
    pub changed: Vec<NodeChange>,
    pub unchanged: Vec<String>,
    pub edges_added: Vec<GraphEdge>,
    pub edges_removed: Vec<GraphEdge>,
}

impl GraphDiff {
    /// Node-level changes; edge churn is reported but not counted.
    pub fn total_changes(&self) -> usize {
        self.added.len() + self.removed.len() + self.changed.len()
    }

    pub fn is_empty(&self) -> bool {
        self.total_changes() == 0 && self.edges_added.is_empty() && self.edges_removed.is_empty()
    }
}

/// Compare `old` against `new`, matching nodes by node id.
///
/// Removed, changed and unchanged follow `old`'s canonical order; added
/// follows `new`'s.
pub fn diff_graphs(old: &ExecutionGraph, new: &ExecutionGraph) -> GraphDiff {
    let mut removed = Vec::new();
    let mut changed = Vec::new();
    let mut unchanged = Vec::new();

    for before in old.nodes() {
        let Some(after) = new.node(&before.node_id) else {
            removed.push(before.node_id.clone());
            continue;
        };
        let mut kinds = Vec::new();
        if before.verdict_status != after.verdict_status {
            kinds.push(ChangeKind::VerdictStatus);
        }
        if before.response_text != after.response_text {
            kinds.push(ChangeKind::ResponseText);
        }
        if kinds.is_empty() {
            unchanged.push(before.node_id.clone());
        } else {
            changed.push(NodeChange {
                node_id: before.node_id.clone(),
                kinds,
                old_status: before.verdict_status,
                new_status: after.verdict_status,
                old_response: before.response_text.clone(),
                new_response: after.response_text.clone(),
            });
        }
    }

    let added = new
        .nodes()
        .iter()
        .filter(|n| old.node(&n.node_id).is_none())
        .map(|n| n.node_id.clone())
        .collect();

    let old_edges: BTreeSet<&GraphEdge> = old.edges().iter().collect();
    let new_edges: BTreeSet<&GraphEdge> = new.edges().iter().collect();

    GraphDiff {
        old_execution: old.execution_id.clone(),
        new_execution: new.execution_id.clone(),
        added,
        removed,
        changed,
        unchanged,
        edges_added: new_edges.difference(&old_edges).map(|e| (*e).clone()).collect(),
        edges_removed: old_edges.difference(&new_edges).map(|e| (*e).clone()).collect(),
    }
}
