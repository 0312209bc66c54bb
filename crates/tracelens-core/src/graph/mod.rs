//! Execution graph construction.
//!
//! An [`ExecutionGraph`] is a pure function of the trace set it was built
//! from. Nodes keep the canonical (input) order, which every downstream
//! analysis uses for tie-breaks. Parent references that never resolve, or
//! that would close a cycle, are dropped and the node becomes a root.

mod role;

pub use role::{infer_role, NodeRole};

use crate::errors::GraphError;
use crate::model::{Trace, VerdictStatus};
use role::NodeShape;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, VecDeque};
use tracing::{debug, warn};

const LABEL_MAX_CHARS: usize = 30;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GraphNode {
    pub node_id: String,
    pub trace_id: String,
    /// As declared by the trace, resolved or not.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_node_id: Option<String>,
    pub label: String,
    pub role: NodeRole,
    /// `None` for neutral nodes (no expectations configured).
    #[serde(default)]
    pub verdict_status: Option<VerdictStatus>,
    pub latency_ms: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    pub provider: String,
    pub response_text: String,
}

impl GraphNode {
    pub fn is_failed(&self) -> bool {
        self.verdict_status.is_some_and(|s| s.is_fail())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct GraphEdge {
    pub from_node: String,
    pub to_node: String,
}

/// Nodes sharing a role, in order of first appearance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Stage {
    pub role: NodeRole,
    pub nodes: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExecutionGraph {
    pub execution_id: String,
    nodes: Vec<GraphNode>,
    edges: Vec<GraphEdge>,
    #[serde(skip)]
    index: HashMap<String, usize>,
    #[serde(skip)]
    pub(crate) parent_of: Vec<Option<usize>>,
    #[serde(skip)]
    pub(crate) children_of: Vec<Vec<usize>>,
    #[serde(skip)]
    pub(crate) shapes: Vec<NodeShape>,
    #[serde(skip)]
    pub(crate) first_root: Option<usize>,
    #[serde(skip)]
    pub(crate) first_model: Option<usize>,
}

/// Build the graph of `execution_id` from its traces in canonical order.
///
/// Fails on an empty trace set (the execution does not exist), on a
/// duplicate node id, or on a trace from another execution.
pub fn build_graph(execution_id: &str, traces: &[Trace]) -> Result<ExecutionGraph, GraphError> {
    if traces.is_empty() {
        return Err(GraphError::ExecutionNotFound {
            execution_id: execution_id.to_string(),
        });
    }

    let mut nodes = Vec::with_capacity(traces.len());
    let mut shapes = Vec::with_capacity(traces.len());
    let mut index = HashMap::with_capacity(traces.len());

    for (i, trace) in traces.iter().enumerate() {
        if trace.execution_id.as_deref() != Some(execution_id) {
            return Err(GraphError::MixedExecution {
                trace_id: trace.trace_id.clone(),
                expected: execution_id.to_string(),
                found: trace.execution_id.clone(),
            });
        }
        if index.insert(trace.node_id.clone(), i).is_some() {
            return Err(GraphError::DuplicateNodeId {
                execution_id: execution_id.to_string(),
                node_id: trace.node_id.clone(),
            });
        }
        nodes.push(GraphNode {
            node_id: trace.node_id.clone(),
            trace_id: trace.trace_id.clone(),
            parent_node_id: trace.parent_node_id.clone(),
            label: label_for(trace),
            role: NodeRole::Transform,
            verdict_status: trace.verdict_status(),
            latency_ms: trace.response.latency_ms,
            model: trace.request.model.clone(),
            provider: trace.request.provider.clone(),
            response_text: trace.response.text.clone(),
        });
        shapes.push(NodeShape {
            has_model: trace.request.model.is_some(),
            has_tool: trace.request.tool.is_some(),
            has_input: !trace.request.messages.is_empty(),
            has_verdict: trace.verdict.is_some(),
        });
    }

    let n = nodes.len();
    let mut parent_of = vec![None; n];
    let mut children_of = vec![Vec::new(); n];
    let mut components = DisjointSet::new(n);

    for (child, node) in nodes.iter().enumerate() {
        let Some(parent_id) = node.parent_node_id.as_deref() else {
            continue;
        };
        let Some(&parent) = index.get(parent_id) else {
            warn!(
                execution_id,
                node_id = %node.node_id,
                parent_node_id = parent_id,
                "orphan parent reference; keeping node as root"
            );
            continue;
        };
        if !components.union(parent, child) {
            warn!(
                execution_id,
                node_id = %node.node_id,
                parent_node_id = parent_id,
                "parent reference would close a cycle; keeping node as root"
            );
            continue;
        }
        parent_of[child] = Some(parent);
        children_of[parent].push(child);
    }

    let edges = (0..n)
        .filter_map(|child| {
            parent_of[child].map(|parent| GraphEdge {
                from_node: nodes[parent].node_id.clone(),
                to_node: nodes[child].node_id.clone(),
            })
        })
        .collect::<Vec<_>>();

    let first_root = parent_of.iter().position(Option::is_none);
    let first_model = shapes.iter().position(|s| s.has_model);
    let mut graph = ExecutionGraph {
        execution_id: execution_id.to_string(),
        nodes,
        edges,
        index,
        parent_of,
        children_of,
        shapes,
        first_root,
        first_model,
    };

    let roles: Vec<NodeRole> = (0..n).map(|i| infer_role(&graph, i)).collect();
    for (node, role) in graph.nodes.iter_mut().zip(roles) {
        node.role = role;
    }

    debug!(
        execution_id,
        nodes = graph.nodes.len(),
        edges = graph.edges.len(),
        "built execution graph"
    );
    Ok(graph)
}

impl ExecutionGraph {
    /// Nodes in canonical order.
    pub fn nodes(&self) -> &[GraphNode] {
        &self.nodes
    }

    /// Resolved edges, ordered by child position.
    pub fn edges(&self) -> &[GraphEdge] {
        &self.edges
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn position(&self, node_id: &str) -> Option<usize> {
        self.index.get(node_id).copied()
    }

    pub fn node(&self, node_id: &str) -> Option<&GraphNode> {
        self.position(node_id).map(|i| &self.nodes[i])
    }

    /// Resolved parent; `None` for roots, including orphans.
    pub fn parent(&self, node_id: &str) -> Option<&GraphNode> {
        let i = self.position(node_id)?;
        self.parent_of[i].map(|p| &self.nodes[p])
    }

    pub fn children(&self, node_id: &str) -> Vec<&GraphNode> {
        self.position(node_id)
            .map(|i| self.children_of[i].iter().map(|&c| &self.nodes[c]).collect())
            .unwrap_or_default()
    }

    pub fn roots(&self) -> Vec<&GraphNode> {
        self.parent_of
            .iter()
            .enumerate()
            .filter(|(_, p)| p.is_none())
            .map(|(i, _)| &self.nodes[i])
            .collect()
    }

    pub fn total_latency_ms(&self) -> u64 {
        self.nodes
            .iter()
            .fold(0u64, |acc, n| acc.saturating_add(n.latency_ms))
    }

    /// Kahn's algorithm seeded with the roots in canonical order.
    pub(crate) fn topological_indices(&self) -> Vec<usize> {
        let mut queue: VecDeque<usize> = (0..self.nodes.len())
            .filter(|&i| self.parent_of[i].is_none())
            .collect();
        let mut order = Vec::with_capacity(self.nodes.len());
        while let Some(i) = queue.pop_front() {
            order.push(i);
            queue.extend(self.children_of[i].iter().copied());
        }
        order
    }

    /// Node ids with every parent before its children.
    pub fn topological_order(&self) -> Vec<&str> {
        self.topological_indices()
            .into_iter()
            .map(|i| self.nodes[i].node_id.as_str())
            .collect()
    }

    pub fn stages(&self) -> Vec<Stage> {
        let mut stages: Vec<Stage> = Vec::new();
        for node in &self.nodes {
            match stages.iter_mut().find(|s| s.role == node.role) {
                Some(stage) => stage.nodes.push(node.node_id.clone()),
                None => stages.push(Stage {
                    role: node.role,
                    nodes: vec![node.node_id.clone()],
                }),
            }
        }
        stages
    }
}

fn label_for(trace: &Trace) -> String {
    if let Some(first) = trace.request.messages.first() {
        let content = &first.content;
        if content.chars().count() > LABEL_MAX_CHARS {
            let head: String = content.chars().take(LABEL_MAX_CHARS).collect();
            return format!("{head}...");
        }
        return content.clone();
    }
    if let Some(model) = &trace.request.model {
        return model.clone();
    }
    if let Some(tool) = &trace.request.tool {
        return tool.name.clone();
    }
    "unknown".to_string()
}

/// Union-find over node indices; `union` reports whether the two were
/// previously disconnected.
struct DisjointSet {
    parent: Vec<usize>,
}

impl DisjointSet {
    fn new(n: usize) -> Self {
        Self {
            parent: (0..n).collect(),
        }
    }

    fn find(&mut self, mut x: usize) -> usize {
        while self.parent[x] != x {
            self.parent[x] = self.parent[self.parent[x]];
            x = self.parent[x];
        }
        x
    }

    fn union(&mut self, a: usize, b: usize) -> bool {
        let (ra, rb) = (self.find(a), self.find(b));
        if ra == rb {
            return false;
        }
        self.parent[rb] = ra;
        true
    }
}
