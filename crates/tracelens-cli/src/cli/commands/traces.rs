use super::{status_str, Ctx};
use crate::cli::args::{ListArgs, TraceIdArgs};
use crate::exit_codes;
use serde::Serialize;
use tracelens_core::Trace;
use tracelens_store::{TraceQuery, TraceRow};

#[derive(Serialize)]
struct Listing {
    total: u64,
    traces: Vec<TraceRow>,
}

pub fn list(ctx: &Ctx, args: ListArgs) -> anyhow::Result<i32> {
    let store = ctx.store()?;
    let query = TraceQuery {
        model: args.model,
        provider: args.provider,
        date: args.date,
        execution_id: args.execution,
        failed_only: args.failed,
        limit: args.limit,
        offset: args.offset,
    };
    let listing = Listing {
        total: store.count(&query)?,
        traces: store.search(&query)?,
    };

    ctx.emit(&listing, |l| {
        let mut text = String::new();
        for row in &l.traces {
            text.push_str(&format!(
                "{}  {}  {}/{}  {}ms  {}\n",
                row.trace_id,
                row.timestamp,
                row.provider,
                row.model.as_deref().unwrap_or("-"),
                row.latency_ms,
                row.status.as_deref().unwrap_or("-"),
            ));
        }
        text.push_str(&format!("{} of {} trace(s)", l.traces.len(), l.total));
        text
    })?;
    Ok(exit_codes::PASS)
}

pub fn show(ctx: &Ctx, args: TraceIdArgs) -> anyhow::Result<i32> {
    let trace = ctx.store()?.get(&args.trace_id)?;
    ctx.emit(&trace, render_trace)?;
    Ok(exit_codes::PASS)
}

fn render_trace(t: &Trace) -> String {
    let mut text = format!(
        "trace      {}\nnode       {}\nexecution  {}\ntimestamp  {}\nmodel      {}/{}\nlatency    {}ms\nverdict    {}\n",
        t.trace_id,
        t.node_id,
        t.execution_id.as_deref().unwrap_or("-"),
        t.timestamp.to_rfc3339(),
        t.request.provider,
        t.request.model.as_deref().unwrap_or("-"),
        t.response.latency_ms,
        status_str(t.verdict_status()),
    );
    if let Some(parent) = &t.parent_node_id {
        text.push_str(&format!("parent     {parent}\n"));
    }
    if let Some(original) = &t.replay_of {
        text.push_str(&format!("replay of  {original}\n"));
    }
    if let Some(verdict) = &t.verdict {
        for v in &verdict.violations {
            text.push_str(&format!("  - {v}\n"));
        }
    }
    text.push_str(&format!("\n{}", t.response.text));
    text
}

pub fn lineage(ctx: &Ctx, args: TraceIdArgs) -> anyhow::Result<i32> {
    let family = ctx.store()?.lineage(&args.trace_id)?;
    ctx.emit(&family, |traces| {
        let mut text = String::new();
        for t in traces {
            let marker = if t.trace_id == args.trace_id { "*" } else { " " };
            match &t.replay_of {
                None => text.push_str(&format!("{marker} {}  (original)\n", t.trace_id)),
                Some(of) => text.push_str(&format!("{marker} {}  replay of {of}\n", t.trace_id)),
            }
        }
        text
    })?;
    Ok(exit_codes::PASS)
}

pub fn executions(ctx: &Ctx) -> anyhow::Result<i32> {
    let summaries = ctx.store()?.executions()?;
    ctx.emit(&summaries, |rows| {
        if rows.is_empty() {
            return "No executions recorded".to_string();
        }
        rows.iter()
            .map(|s| {
                format!(
                    "{}  {} trace(s)  {} failed  {} .. {}\n",
                    s.execution_id, s.trace_count, s.failed_count, s.first_seen, s.last_seen
                )
            })
            .collect()
    })?;
    Ok(exit_codes::PASS)
}

pub fn reindex(ctx: &Ctx) -> anyhow::Result<i32> {
    let count = ctx.store()?.reindex()?;
    println!("Reindexed {count} trace(s)");
    Ok(exit_codes::PASS)
}
