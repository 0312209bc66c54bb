use super::ingest::load_spec;
use super::Ctx;
use crate::cli::args::EvalArgs;
use crate::exit_codes;
use anyhow::Context;
use tracelens_core::{Expectations, TraceResponse};

/// Evaluate expectations ad hoc. Stored verdicts are never rewritten.
pub fn run(ctx: &Ctx, args: EvalArgs) -> anyhow::Result<i32> {
    let spec = load_spec(&args.expectations)?;
    let expectations = Expectations::from_spec(&spec)
        .with_context(|| format!("invalid expectations in {}", args.expectations.display()))?;

    let response = match (&args.trace, &args.text) {
        (Some(trace_id), _) => ctx.store()?.get(trace_id)?.response,
        (None, Some(text)) => TraceResponse::new(text.clone(), args.latency_ms),
        (None, None) => anyhow::bail!("pass --trace or --text"),
    };

    let verdict = expectations.evaluate_response(&response);
    ctx.emit(&verdict, |v| {
        let mut text = v.status.as_str().to_uppercase();
        if let Some(severity) = v.severity {
            text.push_str(&format!(" ({severity})"));
        }
        for violation in &v.violations {
            text.push_str(&format!("\n  - {violation}"));
        }
        text
    })?;
    Ok(exit_codes::from_outcome(!verdict.is_fail()))
}
