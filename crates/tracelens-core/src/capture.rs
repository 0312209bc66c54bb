//! Sealing of capture drafts into immutable [`Trace`] records.
//!
//! This is the single point where a verdict is attached to a trace: the
//! draft's expectations are validated and evaluated once, before the trace
//! exists. Nothing downstream re-evaluates or rewrites a sealed verdict.

use crate::errors::ConfigError;
use crate::expectations::{ExpectationSpec, Expectations};
use crate::model::{Trace, TraceRequest, TraceResponse, TraceRuntime};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::debug;

/// What a capture layer submits for persistence.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TraceDraft {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub execution_id: Option<String>,
    /// Generated when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub node_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_node_id: Option<String>,
    /// Capture time; the sealing clock is used when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<DateTime<Utc>>,
    pub request: TraceRequest,
    pub response: TraceResponse,
    /// No expectations means a neutral trace.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expectations: Option<ExpectationSpec>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub replay_of: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub runtime: Option<TraceRuntime>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub metadata: BTreeMap<String, serde_json::Value>,
}

impl TraceDraft {
    pub fn new(request: TraceRequest, response: TraceResponse) -> Self {
        Self {
            execution_id: None,
            node_id: None,
            parent_node_id: None,
            timestamp: None,
            request,
            response,
            expectations: None,
            replay_of: None,
            runtime: None,
            metadata: BTreeMap::new(),
        }
    }

    pub fn in_execution(mut self, execution_id: impl Into<String>, node_id: impl Into<String>) -> Self {
        self.execution_id = Some(execution_id.into());
        self.node_id = Some(node_id.into());
        self
    }

    pub fn with_parent(mut self, parent_node_id: impl Into<String>) -> Self {
        self.parent_node_id = Some(parent_node_id.into());
        self
    }

    pub fn with_expectations(mut self, spec: ExpectationSpec) -> Self {
        self.expectations = Some(spec);
        self
    }
}

/// Seal a draft into a trace, evaluating its expectations exactly once.
///
/// Malformed expectations are rejected here and no trace is produced.
pub fn seal(draft: TraceDraft, now: DateTime<Utc>) -> Result<Trace, ConfigError> {
    let verdict = match &draft.expectations {
        Some(spec) => {
            let expectations = Expectations::from_spec(spec)?;
            Some(expectations.evaluate_response(&draft.response))
        }
        None => None,
    };

    let trace_id = uuid::Uuid::new_v4().to_string();
    let node_id = draft
        .node_id
        .unwrap_or_else(|| uuid::Uuid::new_v4().to_string());

    debug!(
        trace_id = %trace_id,
        node_id = %node_id,
        verdict = ?verdict.as_ref().map(|v| v.status),
        "sealed trace"
    );

    Ok(Trace {
        trace_id,
        execution_id: draft.execution_id,
        node_id,
        parent_node_id: draft.parent_node_id,
        timestamp: draft.timestamp.unwrap_or(now),
        request: draft.request,
        response: draft.response,
        verdict,
        blessed: false,
        replay_of: draft.replay_of,
        runtime: draft.runtime,
        metadata: draft.metadata,
    })
}

/// [`seal`] against the wall clock.
pub fn seal_now(draft: TraceDraft) -> Result<Trace, ConfigError> {
    seal(draft, Utc::now())
}
