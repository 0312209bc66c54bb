//! The storage seam: where the engine gets the traces of an execution.

use crate::errors::{EngineError, SourceError};
use crate::graph::{build_graph, ExecutionGraph};
use crate::model::Trace;

/// Supplies the traces of one execution in canonical order
/// (creation time ascending).
pub trait TraceSource {
    fn traces_for_execution(&self, execution_id: &str) -> Result<Vec<Trace>, SourceError>;
}

impl TraceSource for [Trace] {
    fn traces_for_execution(&self, execution_id: &str) -> Result<Vec<Trace>, SourceError> {
        let mut traces: Vec<Trace> = self
            .iter()
            .filter(|t| t.execution_id.as_deref() == Some(execution_id))
            .cloned()
            .collect();
        traces.sort_by_key(|t| t.timestamp);
        Ok(traces)
    }
}

impl TraceSource for Vec<Trace> {
    fn traces_for_execution(&self, execution_id: &str) -> Result<Vec<Trace>, SourceError> {
        self.as_slice().traces_for_execution(execution_id)
    }
}

impl<S: TraceSource + ?Sized> TraceSource for &S {
    fn traces_for_execution(&self, execution_id: &str) -> Result<Vec<Trace>, SourceError> {
        (**self).traces_for_execution(execution_id)
    }
}

/// Fetch an execution's traces and build its graph.
pub fn load_graph<S: TraceSource + ?Sized>(
    source: &S,
    execution_id: &str,
) -> Result<ExecutionGraph, EngineError> {
    let traces = source.traces_for_execution(execution_id)?;
    Ok(build_graph(execution_id, &traces)?)
}
