//! Ordered debugging steps derived from a failed verdict.

use crate::graph::ExecutionGraph;
use crate::verdict::{analyze_taint, GraphVerdict};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InvestigationAction {
    ExamineRootCause,
    ExamineInput,
    BlastRadius,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InvestigationStep {
    /// 1-based.
    pub step: usize,
    pub action: InvestigationAction,
    pub description: String,
    /// Nodes the step points at.
    pub nodes: Vec<String>,
}

/// Steps for `verdict` over `graph`: empty on pass, otherwise the root
/// cause, its resolved parent (if any), then the tainted set.
pub fn investigation_path(verdict: &GraphVerdict, graph: &ExecutionGraph) -> Vec<InvestigationStep> {
    let Some(root_cause) = verdict.root_cause_node.as_deref() else {
        return Vec::new();
    };

    let label = |id: &str| graph.node(id).map_or_else(|| id.to_string(), |n| n.label.clone());
    let mut steps = Vec::with_capacity(3);

    steps.push((
        InvestigationAction::ExamineRootCause,
        format!("Examine root cause node {root_cause} ({})", label(root_cause)),
        vec![root_cause.to_string()],
    ));

    if let Some(parent) = graph.parent(root_cause) {
        steps.push((
            InvestigationAction::ExamineInput,
            format!("Examine input from parent node {} ({})", parent.node_id, parent.label),
            vec![parent.node_id.clone()],
        ));
    }

    let tainted = analyze_taint(graph).tainted;
    let description = match tainted.len() {
        0 => "Blast radius: no downstream nodes affected".to_string(),
        1 => "Blast radius: 1 downstream node affected".to_string(),
        n => format!("Blast radius: {n} downstream nodes affected"),
    };
    steps.push((InvestigationAction::BlastRadius, description, tainted));

    steps
        .into_iter()
        .enumerate()
        .map(|(i, (action, description, nodes))| InvestigationStep {
            step: i + 1,
            action,
            description,
            nodes,
        })
        .collect()
}
