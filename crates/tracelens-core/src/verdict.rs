//! Execution-level verdicts: failure propagation and root-cause attribution.

use crate::graph::ExecutionGraph;
use crate::model::VerdictStatus;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GraphVerdict {
    pub status: VerdictStatus,
    pub root_cause_node: Option<String>,
    pub failed_count: usize,
    pub tainted_count: usize,
}

impl GraphVerdict {
    pub fn is_fail(&self) -> bool {
        self.status.is_fail()
    }

    /// One-line summary, naming the root cause by label.
    pub fn message(&self, graph: &ExecutionGraph) -> String {
        match &self.root_cause_node {
            None => "All nodes passed".to_string(),
            Some(id) => {
                let label = graph.node(id).map_or(id.as_str(), |n| n.label.as_str());
                format!("Root cause: {label}")
            }
        }
    }
}

/// Failed nodes and everything downstream of them, in canonical order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaintAnalysis {
    pub failed: Vec<String>,
    pub tainted: Vec<String>,
}

pub fn analyze_taint(graph: &ExecutionGraph) -> TaintAnalysis {
    let nodes = graph.nodes();
    let n = nodes.len();
    let failed: Vec<usize> = (0..n).filter(|&i| nodes[i].is_failed()).collect();

    let mut reached = vec![false; n];
    let mut queue: VecDeque<usize> = failed.iter().copied().collect();
    for &i in &failed {
        reached[i] = true;
    }
    while let Some(i) = queue.pop_front() {
        for &child in &graph.children_of[i] {
            if !reached[child] {
                reached[child] = true;
                queue.push_back(child);
            }
        }
    }

    TaintAnalysis {
        tainted: (0..n)
            .filter(|&i| reached[i] && !nodes[i].is_failed())
            .map(|i| nodes[i].node_id.clone())
            .collect(),
        failed: failed.into_iter().map(|i| nodes[i].node_id.clone()).collect(),
    }
}

pub fn compute_verdict(graph: &ExecutionGraph) -> GraphVerdict {
    let taint = analyze_taint(graph);
    let status = if taint.failed.is_empty() {
        VerdictStatus::Pass
    } else {
        VerdictStatus::Fail
    };
    GraphVerdict {
        status,
        root_cause_node: taint.failed.first().cloned(),
        failed_count: taint.failed.len(),
        tainted_count: taint.tainted.len(),
    }
}
