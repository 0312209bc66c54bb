use clap::{Args, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

#[derive(Parser)]
#[command(
    name = "tracelens",
    version,
    about = "Execution-graph verdicts, causality and integrity checks for recorded LLM traces"
)]
pub struct Cli {
    #[command(flatten)]
    pub global: GlobalArgs,

    #[command(subcommand)]
    pub cmd: Command,
}

#[derive(Args, Debug, Clone)]
pub struct GlobalArgs {
    /// Store home (default: ~/.tracelens)
    #[arg(long, global = true, env = "TRACELENS_HOME")]
    pub home: Option<PathBuf>,

    /// Output format
    #[arg(long, global = true, value_enum, default_value_t = Format::Text)]
    pub format: Format,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum)]
pub enum Format {
    Text,
    Json,
}

#[derive(Subcommand)]
pub enum Command {
    /// Create the store layout and a default config.yaml
    Init,
    /// Seal and store trace drafts from a JSON or JSONL file
    Ingest(IngestArgs),
    /// List stored traces, newest first
    List(ListArgs),
    /// Print one stored trace
    Show(TraceIdArgs),
    /// Replay family of a trace, original first
    Lineage(TraceIdArgs),
    /// List executions with trace and failure counts
    Executions,
    /// Print the execution graph of an execution
    Graph(GraphArgs),
    /// Graph verdict and root cause (exit 1 on fail)
    Verdict(ExecutionArgs),
    /// Critical path and bottlenecks
    Analyze(AnalyzeArgs),
    /// Node and edge differences between two executions
    Diff(DiffArgs),
    /// Ordered debugging steps for a failed execution
    Investigate(ExecutionArgs),
    /// Hash an execution and persist a snapshot
    Snapshot(ExecutionArgs),
    /// Recompute a snapshot's hash (exit 1 on mismatch)
    Verify(VerifyArgs),
    /// Evaluate expectations against a trace or a literal response
    Eval(EvalArgs),
    /// Record a trace as the golden of its model and provider
    Bless(BlessArgs),
    /// Remove the golden pointing at a trace
    Unbless(TraceIdArgs),
    /// Compare the latest replay of every golden (exit 1 on drift)
    Check,
    /// Verdict for many executions at once (exit 1 if any fails)
    GraphCheck(GraphCheckArgs),
    /// Rebuild the SQLite index from the trace files
    Reindex,
}

#[derive(Args, Debug)]
pub struct IngestArgs {
    /// JSON (one draft or an array) or JSONL file; `-` reads stdin
    pub file: PathBuf,

    /// Expectations YAML applied to drafts that carry none
    #[arg(long)]
    pub expectations: Option<PathBuf>,
}

#[derive(Args, Debug)]
pub struct ListArgs {
    #[arg(long)]
    pub model: Option<String>,

    #[arg(long)]
    pub provider: Option<String>,

    /// Capture date, YYYY-MM-DD
    #[arg(long)]
    pub date: Option<String>,

    #[arg(long)]
    pub execution: Option<String>,

    /// Only traces whose verdict failed
    #[arg(long)]
    pub failed: bool,

    #[arg(long, default_value_t = 50)]
    pub limit: u32,

    #[arg(long, default_value_t = 0)]
    pub offset: u32,
}

#[derive(Args, Debug)]
pub struct TraceIdArgs {
    pub trace_id: String,
}

#[derive(Args, Debug)]
pub struct ExecutionArgs {
    pub execution_id: String,
}

#[derive(Args, Debug)]
pub struct GraphArgs {
    pub execution_id: String,

    /// Group nodes by inferred role instead of drawing the tree
    #[arg(long)]
    pub stages: bool,
}

#[derive(Args, Debug)]
pub struct AnalyzeArgs {
    pub execution_id: String,

    /// Number of bottlenecks to list
    #[arg(long, default_value_t = 3)]
    pub top: usize,
}

#[derive(Args, Debug)]
pub struct DiffArgs {
    pub old_execution: String,
    pub new_execution: String,
}

#[derive(Args, Debug)]
pub struct VerifyArgs {
    /// Snapshot file written by `tracelens snapshot`
    pub snapshot: PathBuf,
}

#[derive(Args, Debug)]
pub struct EvalArgs {
    /// Expectations YAML
    #[arg(long)]
    pub expectations: PathBuf,

    /// Stored trace to evaluate
    #[arg(long, conflicts_with = "text", required_unless_present = "text")]
    pub trace: Option<String>,

    /// Literal response text to evaluate
    #[arg(long)]
    pub text: Option<String>,

    /// Latency for --text
    #[arg(long, default_value_t = 0, requires = "text")]
    pub latency_ms: u64,
}

#[derive(Args, Debug)]
pub struct BlessArgs {
    pub trace_id: String,

    /// Replace a golden that points at another trace
    #[arg(long)]
    pub force: bool,
}

#[derive(Args, Debug)]
pub struct GraphCheckArgs {
    /// Executions to check (default: all)
    pub executions: Vec<String>,
}
