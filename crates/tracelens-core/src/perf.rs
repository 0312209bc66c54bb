//! Latency analysis: critical path and bottlenecks.

use crate::graph::ExecutionGraph;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CriticalPath {
    /// Node ids from root to leaf.
    pub path: Vec<String>,
    pub total_latency_ms: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Bottleneck {
    pub node_id: String,
    pub label: String,
    pub latency_ms: u64,
    pub percent_of_total: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PerformanceReport {
    pub critical_path: CriticalPath,
    /// Slowest node; `None` only for an empty graph.
    pub bottleneck: Option<Bottleneck>,
    pub total_latency_ms: u64,
}

pub fn analyze_performance(graph: &ExecutionGraph) -> PerformanceReport {
    PerformanceReport {
        critical_path: critical_path(graph),
        bottleneck: top_bottlenecks(graph, 1).into_iter().next(),
        total_latency_ms: graph.total_latency_ms(),
    }
}

/// Longest root-to-leaf path by cumulative latency.
fn critical_path(graph: &ExecutionGraph) -> CriticalPath {
    let nodes = graph.nodes();
    let n = nodes.len();
    let mut best: Vec<u64> = nodes.iter().map(|node| node.latency_ms).collect();
    let mut via: Vec<Option<usize>> = vec![None; n];

    for i in graph.topological_indices() {
        for &child in &graph.children_of[i] {
            let candidate = best[i].saturating_add(nodes[child].latency_ms);
            if candidate > best[child] || (candidate == best[child] && via[child].is_none()) {
                best[child] = candidate;
                via[child] = Some(i);
            }
        }
    }

    // strict `>` keeps the smallest index on ties
    let mut end: Option<usize> = None;
    for i in (0..n).filter(|&i| graph.children_of[i].is_empty()) {
        if end.map_or(true, |e| best[i] > best[e]) {
            end = Some(i);
        }
    }
    let Some(end) = end else {
        return CriticalPath::default();
    };

    let mut path = vec![end];
    let mut cursor = end;
    while let Some(prev) = via[cursor] {
        path.push(prev);
        cursor = prev;
    }
    path.reverse();

    CriticalPath {
        path: path.into_iter().map(|i| nodes[i].node_id.clone()).collect(),
        total_latency_ms: best[end],
    }
}

/// The `top_n` slowest nodes, slowest first; ties keep canonical order.
/// With zero total latency every share is 0.0.
pub fn top_bottlenecks(graph: &ExecutionGraph, top_n: usize) -> Vec<Bottleneck> {
    let total = graph.total_latency_ms();
    let mut ranked: Vec<_> = graph.nodes().iter().collect();
    ranked.sort_by(|a, b| b.latency_ms.cmp(&a.latency_ms));
    ranked
        .into_iter()
        .take(top_n)
        .map(|node| Bottleneck {
            node_id: node.node_id.clone(),
            label: node.label.clone(),
            latency_ms: node.latency_ms,
            percent_of_total: percent(node.latency_ms, total),
        })
        .collect()
}

fn percent(part: u64, total: u64) -> f64 {
    if total == 0 {
        return 0.0;
    }
    (part as f64 * 1000.0 / total as f64).round() / 10.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::build_graph;
    use crate::graph::fixtures::traced;

    fn node(id: &str, parent: Option<&str>, latency: u64) -> crate::model::Trace {
        traced("e1", id, parent, None, latency, "out")
    }

    #[test]
    fn test_critical_path_picks_slow_branch() {
        let g = build_graph(
            "e1",
            &[
                node("root", None, 100),
                node("fast", Some("root"), 50),
                node("slow", Some("root"), 700),
                node("tail", Some("slow"), 10),
            ],
        )
        .unwrap();
        let report = analyze_performance(&g);
        assert_eq!(report.critical_path.path, vec!["root", "slow", "tail"]);
        assert_eq!(report.critical_path.total_latency_ms, 810);
        assert_eq!(report.total_latency_ms, 860);

        let bottleneck = report.bottleneck.unwrap();
        assert_eq!(bottleneck.node_id, "slow");
        assert_eq!(bottleneck.percent_of_total, 81.4);
    }

    #[test]
    fn test_tie_prefers_smaller_index() {
        let g = build_graph(
            "e1",
            &[node("a", None, 100), node("b", Some("a"), 50), node("c", Some("a"), 50)],
        )
        .unwrap();
        let report = analyze_performance(&g);
        assert_eq!(report.critical_path.path, vec!["a", "b"]);
    }

    #[test]
    fn test_disconnected_roots() {
        let g = build_graph("e1", &[node("a", None, 10), node("b", Some("ghost"), 30)]).unwrap();
        let report = analyze_performance(&g);
        assert_eq!(report.critical_path.path, vec!["b"]);
        assert_eq!(report.critical_path.total_latency_ms, 30);
    }

    #[test]
    fn test_top_bottlenecks_ordering() {
        let g = build_graph(
            "e1",
            &[
                node("a", None, 100),
                node("b", Some("a"), 300),
                node("c", Some("a"), 300),
                node("d", Some("b"), 300),
            ],
        )
        .unwrap();
        let top = top_bottlenecks(&g, 3);
        let ids: Vec<_> = top.iter().map(|b| b.node_id.as_str()).collect();
        assert_eq!(ids, vec!["b", "c", "d"]);
        assert_eq!(top[0].percent_of_total, 30.0);
    }

    #[test]
    fn test_zero_latency_bottleneck_is_first_node() {
        let g = build_graph("e1", &[node("a", None, 0), node("b", Some("a"), 0)]).unwrap();
        let report = analyze_performance(&g);
        let bottleneck = report.bottleneck.unwrap();
        assert_eq!(bottleneck.node_id, "a");
        assert_eq!(bottleneck.latency_ms, 0);
        assert_eq!(bottleneck.percent_of_total, 0.0);
        assert_eq!(report.critical_path.path, vec!["a", "b"]);
        assert_eq!(top_bottlenecks(&g, 5).len(), 2);
    }
}
