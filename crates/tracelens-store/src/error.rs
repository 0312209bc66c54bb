//! Error types for trace store operations.

use std::path::PathBuf;
use thiserror::Error;

/// Result type for store operations.
pub type StoreResult<T> = Result<T, StoreError>;

#[derive(Debug, Error)]
pub enum StoreError {
    /// The home directory has no `config.yaml`.
    #[error("store not initialized at {}; run `tracelens init`", home.display())]
    NotInitialized { home: PathBuf },

    #[error("{what} not found: {id}")]
    NotFound { what: &'static str, id: String },

    /// Persisted records are written once.
    #[error("{what} already exists: {id}")]
    AlreadyExists { what: &'static str, id: String },

    /// An execution holds each node id once.
    #[error("node {node_id} already recorded in execution {execution_id}")]
    DuplicateNode {
        execution_id: String,
        node_id: String,
    },

    /// A different trace is already the golden for this key.
    #[error("golden for {key} is already trace {existing}; pass --force to replace it")]
    GoldenConflict { key: String, existing: String },

    #[error("invalid store config: {0}")]
    Config(String),

    #[error("I/O error at {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed JSON in {}: {source}", path.display())]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("index error: {0}")]
    Index(#[from] rusqlite::Error),

    #[error("index lock poisoned")]
    Poisoned,
}

impl StoreError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    pub(crate) fn json(path: impl Into<PathBuf>, source: serde_json::Error) -> Self {
        Self::Json {
            path: path.into(),
            source,
        }
    }

    /// Returns true if the requested record does not exist.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }

    pub fn is_already_exists(&self) -> bool {
        matches!(self, Self::AlreadyExists { .. })
    }

    /// Suggested exit code for CLI. Store failures are operational, never
    /// regressions.
    pub fn exit_code(&self) -> i32 {
        2
    }
}

impl From<StoreError> for tracelens_core::SourceError {
    fn from(err: StoreError) -> Self {
        tracelens_core::SourceError::with_source("trace store", err)
    }
}
