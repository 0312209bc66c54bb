use super::{status_str, Ctx};
use crate::cli::args::{AnalyzeArgs, DiffArgs, ExecutionArgs, GraphArgs};
use crate::exit_codes;
use serde::Serialize;
use tracelens_core::{
    analyze_performance, compute_verdict, diff_graphs, investigation_path, top_bottlenecks,
    Bottleneck, ExecutionGraph, GraphNode, GraphVerdict, PerformanceReport, Stage,
};

pub fn show(ctx: &Ctx, args: GraphArgs) -> anyhow::Result<i32> {
    let store = ctx.store()?;
    let graph = ctx.graph(&store, &args.execution_id)?;

    if args.stages {
        let stages = graph.stages();
        ctx.emit(&stages, |stages| render_stages(&graph, stages))?;
    } else {
        ctx.emit(&graph, render_tree)?;
    }
    Ok(exit_codes::PASS)
}

fn node_line(node: &GraphNode) -> String {
    format!(
        "[{}] {} ({})  {}  {}ms",
        node.role,
        node.label,
        node.node_id,
        status_str(node.verdict_status),
        node.latency_ms
    )
}

fn render_tree(graph: &ExecutionGraph) -> String {
    let mut text = format!("Execution {} ({} nodes)\n", graph.execution_id, graph.len());
    // explicit stack keeps deep chains off the call stack
    let mut stack: Vec<(&GraphNode, usize)> = graph.roots().into_iter().rev().map(|n| (n, 0)).collect();
    while let Some((node, depth)) = stack.pop() {
        text.push_str(&format!("{}{}\n", "  ".repeat(depth), node_line(node)));
        for child in graph.children(&node.node_id).into_iter().rev() {
            stack.push((child, depth + 1));
        }
    }
    text
}

fn render_stages(graph: &ExecutionGraph, stages: &[Stage]) -> String {
    let mut text = String::new();
    for stage in stages {
        text.push_str(&format!("{}\n", stage.role));
        for node in stage.nodes.iter().filter_map(|id| graph.node(id)) {
            text.push_str(&format!("  {}\n", node_line(node)));
        }
    }
    text
}

#[derive(Serialize)]
struct VerdictView<'a> {
    execution_id: &'a str,
    #[serde(flatten)]
    verdict: &'a GraphVerdict,
    message: String,
}

pub fn verdict(ctx: &Ctx, args: ExecutionArgs) -> anyhow::Result<i32> {
    let store = ctx.store()?;
    let graph = ctx.graph(&store, &args.execution_id)?;
    let verdict = compute_verdict(&graph);
    let view = VerdictView {
        execution_id: &graph.execution_id,
        verdict: &verdict,
        message: verdict.message(&graph),
    };
    ctx.emit(&view, |v| {
        format!(
            "{}: {}\n{}\nfailed: {}  tainted: {}",
            v.execution_id,
            v.verdict.status.as_str().to_uppercase(),
            v.message,
            v.verdict.failed_count,
            v.verdict.tainted_count
        )
    })?;
    Ok(exit_codes::from_outcome(!verdict.is_fail()))
}

#[derive(Serialize)]
struct AnalyzeView {
    #[serde(flatten)]
    report: PerformanceReport,
    top: Vec<Bottleneck>,
}

pub fn analyze(ctx: &Ctx, args: AnalyzeArgs) -> anyhow::Result<i32> {
    let store = ctx.store()?;
    let graph = ctx.graph(&store, &args.execution_id)?;
    let view = AnalyzeView {
        report: analyze_performance(&graph),
        top: top_bottlenecks(&graph, args.top),
    };
    ctx.emit(&view, |v| {
        let path = &v.report.critical_path;
        let mut text = format!(
            "total latency: {}ms\ncritical path ({}ms): {}\n",
            v.report.total_latency_ms,
            path.total_latency_ms,
            path.path.join(" -> ")
        );
        for b in &v.top {
            text.push_str(&format!(
                "  {} ({})  {}ms  {:.1}%\n",
                b.label, b.node_id, b.latency_ms, b.percent_of_total
            ));
        }
        text
    })?;
    Ok(exit_codes::PASS)
}

pub fn diff(ctx: &Ctx, args: DiffArgs) -> anyhow::Result<i32> {
    let store = ctx.store()?;
    let old = ctx.graph(&store, &args.old_execution)?;
    let new = ctx.graph(&store, &args.new_execution)?;
    let diff = diff_graphs(&old, &new);
    ctx.emit(&diff, |d| {
        if d.is_empty() {
            return format!("{} and {} are identical", d.old_execution, d.new_execution);
        }
        let mut text = format!("{} -> {}: {} change(s)\n", d.old_execution, d.new_execution, d.total_changes());
        for id in &d.added {
            text.push_str(&format!("  + {id}\n"));
        }
        for id in &d.removed {
            text.push_str(&format!("  - {id}\n"));
        }
        for c in &d.changed {
            text.push_str(&format!(
                "  ~ {}  {} -> {}\n",
                c.node_id,
                status_str(c.old_status),
                status_str(c.new_status)
            ));
        }
        for e in &d.edges_added {
            text.push_str(&format!("  + edge {} -> {}\n", e.from_node, e.to_node));
        }
        for e in &d.edges_removed {
            text.push_str(&format!("  - edge {} -> {}\n", e.from_node, e.to_node));
        }
        text
    })?;
    Ok(exit_codes::PASS)
}

pub fn investigate(ctx: &Ctx, args: ExecutionArgs) -> anyhow::Result<i32> {
    let store = ctx.store()?;
    let graph = ctx.graph(&store, &args.execution_id)?;
    let verdict = compute_verdict(&graph);
    let steps = investigation_path(&verdict, &graph);
    ctx.emit(&steps, |steps| {
        if steps.is_empty() {
            return "All nodes passed; nothing to investigate".to_string();
        }
        steps
            .iter()
            .map(|s| format!("{}. {}\n", s.step, s.description))
            .collect()
    })?;
    Ok(exit_codes::PASS)
}
