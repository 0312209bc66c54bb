//! Deterministic verdict, causality and integrity analysis over execution graphs
//! built from recorded LLM traces.
//!
//! Every entry point is a pure function of its explicit inputs: nothing here
//! performs I/O, reads the clock (except [`integrity::to_snapshot`] and
//! [`capture::seal_now`]) or keeps process-wide state.

pub mod capture;
pub mod diff;
pub mod errors;
pub mod expectations;
pub mod golden;
pub mod graph;
pub mod integrity;
pub mod investigate;
pub mod model;
pub mod perf;
pub mod source;
pub mod verdict;

pub use capture::{seal, seal_now, TraceDraft};
pub use diff::{diff_graphs, ChangeKind, GraphDiff, NodeChange};
pub use errors::{ConfigError, EngineError, ErrorKind, GraphError, SourceError};
pub use expectations::{ExpectationSpec, Expectations, Observation, Rule};
pub use golden::{compare_to_golden, output_hash, GoldenOutcome, GoldenRecord};
pub use graph::{build_graph, infer_role, ExecutionGraph, GraphEdge, GraphNode, NodeRole, Stage};
pub use integrity::{
    compute_hash, to_snapshot, to_snapshot_at, verify_integrity, IntegrityReport, Snapshot,
};
pub use investigate::{investigation_path, InvestigationAction, InvestigationStep};
pub use model::{
    Severity, TokenUsage, ToolInvocation, Trace, TraceMessage, TraceParameters, TraceRequest,
    TraceResponse, TraceRuntime, Verdict, VerdictStatus,
};
pub use perf::{analyze_performance, top_bottlenecks, Bottleneck, CriticalPath, PerformanceReport};
pub use source::{load_graph, TraceSource};
pub use verdict::{analyze_taint, compute_verdict, GraphVerdict, TaintAnalysis};
