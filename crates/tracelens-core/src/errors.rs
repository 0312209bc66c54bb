//! Error taxonomy for the engine.
//!
//! Contract violations and not-found conditions are returned to the caller
//! as typed values; nothing in the core logs and swallows them. Structural
//! anomalies (orphan parent references) are not errors at all, and integrity
//! mismatches are reported through [`crate::integrity::IntegrityReport`].

use thiserror::Error;

/// Coarse classification used by serving layers to pick a status or exit code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Requested execution or trace does not exist.
    NotFound,
    /// Caller handed in malformed configuration or an invalid trace set.
    ContractViolation,
    /// The trace source (storage collaborator) failed.
    Source,
    /// Unexpected internal failure.
    Internal,
}

/// Malformed expectation configuration. Raised when rules are configured,
/// never during evaluation.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("max_latency_ms must be non-negative, got {0}")]
    NegativeLatencyBound(i64),

    #[error("min_tokens must be non-negative, got {0}")]
    NegativeTokenBound(i64),

    #[error("{rule}: entry {index} is an empty substring")]
    EmptySubstring { rule: &'static str, index: usize },

    #[error("failed to parse expectations: {0}")]
    Parse(String),
}

/// Invalid or missing input to the graph builder.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GraphError {
    #[error("execution not found: {execution_id}")]
    ExecutionNotFound { execution_id: String },

    #[error("duplicate node id '{node_id}' in execution {execution_id}")]
    DuplicateNodeId {
        execution_id: String,
        node_id: String,
    },

    #[error("trace {trace_id} belongs to execution {found:?}, expected {expected}")]
    MixedExecution {
        trace_id: String,
        expected: String,
        found: Option<String>,
    },
}

/// Failure reported by a [`crate::source::TraceSource`] implementation.
#[derive(Debug, Error)]
#[error("trace source failed: {message}")]
pub struct SourceError {
    pub message: String,
    #[source]
    pub source: Option<Box<dyn std::error::Error + Send + Sync>>,
}

impl SourceError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            source: None,
        }
    }

    pub fn with_source(
        message: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self {
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }
}

/// Umbrella error for engine entry points.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Graph(#[from] GraphError),

    #[error(transparent)]
    Source(#[from] SourceError),

    #[error("failed to canonicalize hash input: {0}")]
    Canonicalize(String),
}

impl EngineError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Config(_) => ErrorKind::ContractViolation,
            Self::Graph(GraphError::ExecutionNotFound { .. }) => ErrorKind::NotFound,
            Self::Graph(_) => ErrorKind::ContractViolation,
            Self::Source(_) => ErrorKind::Source,
            Self::Canonicalize(_) => ErrorKind::Internal,
        }
    }

    /// Returns true if the requested execution does not exist.
    pub fn is_not_found(&self) -> bool {
        self.kind() == ErrorKind::NotFound
    }

    /// Suggested exit code for CLI. Engine errors are never regressions.
    pub fn exit_code(&self) -> i32 {
        2
    }
}
