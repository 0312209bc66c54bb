use super::Ctx;
use crate::cli::args::IngestArgs;
use crate::exit_codes;
use anyhow::Context;
use serde::Serialize;
use std::io::Read;
use std::path::Path;
use tracelens_core::{seal_now, ExpectationSpec, Expectations, Trace, TraceDraft};

#[derive(Serialize)]
struct Ingested {
    trace_id: String,
    execution_id: Option<String>,
    node_id: String,
    status: Option<String>,
}

pub fn run(ctx: &Ctx, args: IngestArgs) -> anyhow::Result<i32> {
    let raw = read_input(&args.file)?;
    let mut drafts = parse_drafts(&raw).with_context(|| format!("parsing {}", args.file.display()))?;

    if let Some(path) = &args.expectations {
        let spec = load_spec(path)?;
        Expectations::from_spec(&spec)
            .with_context(|| format!("invalid expectations in {}", path.display()))?;
        for draft in drafts.iter_mut().filter(|d| d.expectations.is_none()) {
            draft.expectations = Some(spec.clone());
        }
    }

    // seal everything first so a malformed draft stores nothing
    let traces = drafts
        .into_iter()
        .enumerate()
        .map(|(i, draft)| seal_now(draft).with_context(|| format!("draft #{}", i + 1)))
        .collect::<anyhow::Result<Vec<Trace>>>()?;

    // a duplicate node id anywhere in the batch rejects the whole batch
    ctx.store()?.save_all(&traces)?;
    let out: Vec<Ingested> = traces
        .iter()
        .map(|trace| Ingested {
            trace_id: trace.trace_id.clone(),
            execution_id: trace.execution_id.clone(),
            node_id: trace.node_id.clone(),
            status: trace.verdict_status().map(|s| s.as_str().to_string()),
        })
        .collect();

    ctx.emit(&out, |rows| {
        let mut text = format!("Ingested {} trace(s)\n", rows.len());
        for row in rows {
            text.push_str(&format!(
                "  {}  node={}  {}\n",
                row.trace_id,
                row.node_id,
                row.status.as_deref().unwrap_or("-")
            ));
        }
        text
    })?;
    Ok(exit_codes::PASS)
}

fn read_input(path: &Path) -> anyhow::Result<String> {
    if path == Path::new("-") {
        let mut buf = String::new();
        std::io::stdin()
            .read_to_string(&mut buf)
            .context("reading stdin")?;
        return Ok(buf);
    }
    std::fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))
}

/// One draft, a JSON array of drafts, or one draft per line.
fn parse_drafts(raw: &str) -> anyhow::Result<Vec<TraceDraft>> {
    let trimmed = raw.trim_start();
    if trimmed.starts_with('[') {
        return Ok(serde_json::from_str(trimmed)?);
    }
    if let Ok(one) = serde_json::from_str::<TraceDraft>(trimmed) {
        return Ok(vec![one]);
    }
    raw.lines()
        .enumerate()
        .filter(|(_, line)| !line.trim().is_empty())
        .map(|(n, line)| {
            serde_json::from_str(line).with_context(|| format!("line {}", n + 1))
        })
        .collect()
}

pub(crate) fn load_spec(path: &Path) -> anyhow::Result<ExpectationSpec> {
    let raw = std::fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
    serde_yaml::from_str(&raw).with_context(|| format!("parsing expectations {}", path.display()))
}
