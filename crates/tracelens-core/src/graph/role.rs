use super::ExecutionGraph;
use serde::{Deserialize, Serialize};

/// Semantic role of a node, inferred from its request shape and position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum NodeRole {
    Input,
    Transform,
    Llm,
    Tool,
    Validation,
    Output,
}

impl NodeRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            NodeRole::Input => "INPUT",
            NodeRole::Transform => "TRANSFORM",
            NodeRole::Llm => "LLM",
            NodeRole::Tool => "TOOL",
            NodeRole::Validation => "VALIDATION",
            NodeRole::Output => "OUTPUT",
        }
    }
}

impl std::fmt::Display for NodeRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Request-shape facts the role decision needs, captured at build time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct NodeShape {
    pub has_model: bool,
    pub has_tool: bool,
    pub has_input: bool,
    pub has_verdict: bool,
}

/// Classify the node at canonical index `index`.
///
/// Decision order, first match wins:
/// 1. INPUT: the first root, with no model call at a smaller index
/// 2. LLM: the request targets a model
/// 3. TOOL: no model, but an external call signature
/// 4. OUTPUT: terminal node
/// 5. VALIDATION: no model, no tool, no input messages, carries a verdict
/// 6. TRANSFORM
///
/// Runs in constant time; the graph carries its first root and first
/// model call from construction.
///
/// # Panics
///
/// Panics if `index` is out of bounds for `graph`.
pub fn infer_role(graph: &ExecutionGraph, index: usize) -> NodeRole {
    let shape = graph.shapes[index];

    let model_before = graph.first_model.is_some_and(|m| m < index);
    if graph.first_root == Some(index) && !model_before {
        return NodeRole::Input;
    }
    if shape.has_model {
        return NodeRole::Llm;
    }
    if shape.has_tool {
        return NodeRole::Tool;
    }
    if graph.children_of[index].is_empty() {
        return NodeRole::Output;
    }
    if !shape.has_input && shape.has_verdict {
        return NodeRole::Validation;
    }
    NodeRole::Transform
}
