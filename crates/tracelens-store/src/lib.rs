//! Storage collaborator for the tracelens engine: write-once JSON trace
//! files, a rebuildable SQLite index, golden baselines and snapshots.

pub mod config;
pub mod error;
pub mod files;
pub mod index;
pub mod schema;
pub mod store;

pub use config::{load_config, StoreConfig, SUPPORTED_CONFIG_VERSION};
pub use error::{StoreError, StoreResult};
pub use index::{ExecutionSummary, TraceQuery, TraceRow};
pub use store::TraceStore;
