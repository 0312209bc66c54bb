use super::Ctx;
use crate::cli::args::GraphCheckArgs;
use crate::exit_codes;
use anyhow::Context;
use serde::Serialize;
use tokio::task::JoinSet;
use tracelens_core::{compute_verdict, load_graph, GraphVerdict};
use tracelens_store::TraceStore;
use tracing::{info, warn};

#[derive(Serialize)]
struct Checked {
    execution_id: String,
    #[serde(flatten)]
    verdict: GraphVerdict,
    message: String,
}

fn check_one(store: &TraceStore, execution_id: &str) -> anyhow::Result<Checked> {
    let graph = load_graph(store, execution_id)?;
    let verdict = compute_verdict(&graph);
    Ok(Checked {
        execution_id: execution_id.to_string(),
        message: verdict.message(&graph),
        verdict,
    })
}

/// Verdicts for many executions, evaluated on the blocking pool.
pub async fn run(ctx: &Ctx, args: GraphCheckArgs) -> anyhow::Result<i32> {
    let store = ctx.store()?;
    let ids: Vec<String> = if args.executions.is_empty() {
        store
            .executions()?
            .into_iter()
            .map(|s| s.execution_id)
            .collect()
    } else {
        args.executions
    };
    if ids.is_empty() {
        warn!("no executions to check");
        return Ok(exit_codes::PASS);
    }

    let mut tasks = JoinSet::new();
    for (i, id) in ids.into_iter().enumerate() {
        let store = store.clone();
        tasks.spawn_blocking(move || (i, check_one(&store, &id)));
    }

    let mut results = Vec::new();
    while let Some(joined) = tasks.join_next().await {
        let (i, checked) = joined.context("graph check task failed")?;
        results.push((i, checked?));
    }
    results.sort_by_key(|(i, _)| *i);
    let results: Vec<Checked> = results.into_iter().map(|(_, c)| c).collect();

    let failed = results.iter().filter(|c| c.verdict.is_fail()).count();
    info!(checked = results.len(), failed, "graph check complete");

    ctx.emit(&results, |rows| {
        let mut text: String = rows
            .iter()
            .map(|c| {
                format!(
                    "{}  {}  {}\n",
                    c.verdict.status.as_str().to_uppercase(),
                    c.execution_id,
                    c.message
                )
            })
            .collect();
        text.push_str(&format!("{} execution(s), {} failed", rows.len(), failed));
        text
    })?;
    Ok(exit_codes::from_outcome(failed == 0))
}
