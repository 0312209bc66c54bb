use super::args::*;
use anyhow::Context;
use serde::Serialize;
use std::path::PathBuf;
use tracelens_core::{load_graph, ExecutionGraph};
use tracelens_store::TraceStore;

pub mod eval;
pub mod golden;
pub mod graph;
pub mod graph_check;
pub mod ingest;
pub mod init;
pub mod integrity;
pub mod traces;

const DEFAULT_HOME_DIR: &str = ".tracelens";

pub async fn dispatch(cli: Cli) -> anyhow::Result<i32> {
    let ctx = Ctx::new(cli.global)?;
    match cli.cmd {
        Command::Init => init::run(&ctx),
        Command::Ingest(args) => ingest::run(&ctx, args),
        Command::List(args) => traces::list(&ctx, args),
        Command::Show(args) => traces::show(&ctx, args),
        Command::Lineage(args) => traces::lineage(&ctx, args),
        Command::Executions => traces::executions(&ctx),
        Command::Reindex => traces::reindex(&ctx),
        Command::Graph(args) => graph::show(&ctx, args),
        Command::Verdict(args) => graph::verdict(&ctx, args),
        Command::Analyze(args) => graph::analyze(&ctx, args),
        Command::Diff(args) => graph::diff(&ctx, args),
        Command::Investigate(args) => graph::investigate(&ctx, args),
        Command::Snapshot(args) => integrity::snapshot(&ctx, args),
        Command::Verify(args) => integrity::verify(&ctx, args),
        Command::Eval(args) => eval::run(&ctx, args),
        Command::Bless(args) => golden::bless(&ctx, args),
        Command::Unbless(args) => golden::unbless(&ctx, args),
        Command::Check => golden::check(&ctx),
        Command::GraphCheck(args) => graph_check::run(&ctx, args).await,
    }
}

/// Resolved global options shared by every command.
pub struct Ctx {
    pub home: PathBuf,
    pub format: Format,
}

impl Ctx {
    fn new(global: GlobalArgs) -> anyhow::Result<Self> {
        let home = match global.home {
            Some(home) => home,
            None => dirs::home_dir()
                .context("cannot resolve home directory; pass --home or set TRACELENS_HOME")?
                .join(DEFAULT_HOME_DIR),
        };
        Ok(Self {
            home,
            format: global.format,
        })
    }

    pub fn store(&self) -> anyhow::Result<TraceStore> {
        Ok(TraceStore::open(&self.home)?)
    }

    pub fn graph(&self, store: &TraceStore, execution_id: &str) -> anyhow::Result<ExecutionGraph> {
        Ok(load_graph(store, execution_id)?)
    }

    /// Pretty JSON with `--format json`, otherwise the rendered text.
    pub fn emit<T: Serialize>(&self, value: &T, text: impl FnOnce(&T) -> String) -> anyhow::Result<()> {
        match self.format {
            Format::Json => println!("{}", serde_json::to_string_pretty(value)?),
            Format::Text => println!("{}", text(value).trim_end()),
        }
        Ok(())
    }
}

pub(crate) fn status_str(status: Option<tracelens_core::VerdictStatus>) -> &'static str {
    status.map_or("-", |s| s.as_str())
}
