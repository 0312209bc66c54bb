use super::Ctx;
use crate::cli::args::{BlessArgs, TraceIdArgs};
use crate::exit_codes;
use chrono::Utc;
use serde::Serialize;
use tracelens_core::{compare_to_golden, GoldenOutcome};
use tracing::warn;

pub fn bless(ctx: &Ctx, args: BlessArgs) -> anyhow::Result<i32> {
    let record = ctx.store()?.bless(&args.trace_id, args.force, Utc::now())?;
    ctx.emit(&record, |r| format!("Blessed {} as golden for {}", r.trace_id, r.key()))?;
    Ok(exit_codes::PASS)
}

pub fn unbless(ctx: &Ctx, args: TraceIdArgs) -> anyhow::Result<i32> {
    let record = ctx.store()?.unbless(&args.trace_id)?;
    ctx.emit(&record, |r| format!("Removed golden for {} ({})", r.key(), r.trace_id))?;
    Ok(exit_codes::PASS)
}

#[derive(Serialize)]
struct CheckResult {
    key: String,
    golden_trace: String,
    /// Replay compared against the golden; absent when skipped.
    replay_trace: Option<String>,
    outcome: Option<GoldenOutcome>,
}

/// Compare the most recent replay of every golden against it.
pub fn check(ctx: &Ctx) -> anyhow::Result<i32> {
    let store = ctx.store()?;
    let goldens = store.goldens()?;
    if goldens.is_empty() {
        warn!("no goldens recorded; nothing to check");
        ctx.emit(&Vec::<CheckResult>::new(), |_| "No goldens to check".to_string())?;
        return Ok(exit_codes::PASS);
    }

    let mut results = Vec::with_capacity(goldens.len());
    for (key, golden) in goldens {
        let result = match store.latest_replay_of(&golden.trace_id)? {
            None => {
                warn!(key = %key, trace_id = %golden.trace_id, "no replay of golden yet; skipping");
                CheckResult {
                    key,
                    golden_trace: golden.trace_id,
                    replay_trace: None,
                    outcome: None,
                }
            }
            Some(replay) => CheckResult {
                outcome: Some(compare_to_golden(&golden, &replay)),
                key,
                golden_trace: golden.trace_id,
                replay_trace: Some(replay.trace_id),
            },
        };
        results.push(result);
    }

    let regressed = results
        .iter()
        .any(|r| r.outcome.as_ref().is_some_and(|o| !o.is_match()));

    ctx.emit(&results, |rows| {
        rows.iter()
            .map(|r| match (&r.outcome, &r.replay_trace) {
                (Some(GoldenOutcome::Match), Some(replay)) => format!("PASS  {}  {replay}\n", r.key),
                (Some(GoldenOutcome::Mismatch { expected, actual }), Some(replay)) => format!(
                    "FAIL  {}  {replay}\n      expected {expected}\n      actual   {actual}\n",
                    r.key
                ),
                _ => format!("SKIP  {}  no replay of {}\n", r.key, r.golden_trace),
            })
            .collect()
    })?;
    Ok(exit_codes::from_outcome(!regressed))
}
