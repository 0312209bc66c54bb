use super::Ctx;
use crate::cli::args::{ExecutionArgs, VerifyArgs};
use crate::exit_codes;
use serde::Serialize;
use std::path::PathBuf;
use tracelens_core::{to_snapshot, verify_integrity, IntegrityReport};

#[derive(Serialize)]
struct Saved {
    execution_id: String,
    hash: String,
    path: PathBuf,
}

pub fn snapshot(ctx: &Ctx, args: ExecutionArgs) -> anyhow::Result<i32> {
    let store = ctx.store()?;
    let graph = ctx.graph(&store, &args.execution_id)?;
    let snapshot = to_snapshot(&graph)?;
    let path = store.save_snapshot(&snapshot)?;
    let saved = Saved {
        execution_id: snapshot.execution_id,
        hash: snapshot.hash,
        path,
    };
    ctx.emit(&saved, |s| format!("{}  {}\n{}", s.execution_id, s.hash, s.path.display()))?;
    Ok(exit_codes::PASS)
}

#[derive(Serialize)]
struct Verified {
    execution_id: String,
    intact: bool,
    #[serde(flatten)]
    report: IntegrityReport,
}

pub fn verify(ctx: &Ctx, args: VerifyArgs) -> anyhow::Result<i32> {
    let store = ctx.store()?;
    let snapshot = store.load_snapshot(&args.snapshot)?;
    let report = verify_integrity(&snapshot)?;
    let verified = Verified {
        execution_id: snapshot.execution_id,
        intact: report.is_intact(),
        report,
    };
    ctx.emit(&verified, |v| {
        if v.intact {
            format!("{}: intact ({})", v.execution_id, v.report.actual)
        } else {
            format!(
                "{}: TAMPERED\nexpected {}\nactual   {}",
                v.execution_id, v.report.expected, v.report.actual
            )
        }
    })?;
    Ok(exit_codes::from_outcome(verified.intact))
}
