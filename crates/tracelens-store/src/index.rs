//! SQLite index over the trace files.
//!
//! The index is derived state: every row mirrors searchable columns of a
//! trace file and can be rebuilt from the files alone.

use crate::error::{StoreError, StoreResult};
use chrono::{DateTime, SecondsFormat, Utc};
use rusqlite::types::Value;
use rusqlite::{params, params_from_iter, Connection, OptionalExtension};
use serde::Serialize;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard};
use tracelens_core::Trace;

#[derive(Clone)]
pub struct TraceIndex {
    conn: Arc<Mutex<Connection>>,
}

/// Filters for [`TraceIndex::search`] and [`TraceIndex::count`].
#[derive(Debug, Clone, Default)]
pub struct TraceQuery {
    pub model: Option<String>,
    pub provider: Option<String>,
    /// `YYYY-MM-DD` prefix of the capture timestamp.
    pub date: Option<String>,
    pub execution_id: Option<String>,
    pub failed_only: bool,
    pub limit: u32,
    pub offset: u32,
}

impl TraceQuery {
    pub fn latest(limit: u32) -> Self {
        Self {
            limit,
            ..Default::default()
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TraceRow {
    pub trace_id: String,
    pub execution_id: Option<String>,
    pub node_id: String,
    pub timestamp: String,
    pub provider: String,
    pub model: Option<String>,
    pub latency_ms: u64,
    pub status: Option<String>,
    pub replay_of: Option<String>,
    pub file_path: PathBuf,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExecutionSummary {
    pub execution_id: String,
    pub trace_count: u64,
    pub failed_count: u64,
    pub first_seen: String,
    pub last_seen: String,
}

const ROW_COLUMNS: &str =
    "trace_id, execution_id, node_id, timestamp, provider, model, latency_ms, status, replay_of, file_path";

/// Fixed-width UTC so lexical order is chronological order.
pub(crate) fn index_timestamp(ts: &DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Micros, true)
}

impl TraceIndex {
    pub fn open(path: &Path) -> StoreResult<Self> {
        let conn = Connection::open(path)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    #[cfg(test)]
    pub(crate) fn memory() -> StoreResult<Self> {
        let conn = Connection::open_in_memory()?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    fn conn(&self) -> StoreResult<MutexGuard<'_, Connection>> {
        self.conn.lock().map_err(|_| StoreError::Poisoned)
    }

    pub fn init_schema(&self) -> StoreResult<()> {
        let conn = self.conn()?;
        conn.execute_batch(crate::schema::DDL)?;
        Ok(())
    }

    pub fn insert(&self, trace: &Trace, file_path: &Path) -> StoreResult<()> {
        let conn = self.conn()?;
        conn.execute(
            "INSERT INTO traces
             (trace_id, execution_id, node_id, timestamp, provider, model, latency_ms, status, replay_of, file_path)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
            params![
                trace.trace_id,
                trace.execution_id,
                trace.node_id,
                index_timestamp(&trace.timestamp),
                trace.request.provider,
                trace.request.model,
                i64::try_from(trace.response.latency_ms).unwrap_or(i64::MAX),
                trace.verdict_status().map(|s| s.as_str()),
                trace.replay_of,
                file_path.to_string_lossy(),
            ],
        )?;
        Ok(())
    }

    pub fn contains(&self, trace_id: &str) -> StoreResult<bool> {
        Ok(self.get(trace_id)?.is_some())
    }

    /// Whether `node_id` is already recorded for `execution_id`.
    pub fn contains_node(&self, execution_id: &str, node_id: &str) -> StoreResult<bool> {
        let conn = self.conn()?;
        let found = conn
            .query_row(
                "SELECT 1 FROM traces WHERE execution_id = ?1 AND node_id = ?2 LIMIT 1",
                params![execution_id, node_id],
                |_| Ok(()),
            )
            .optional()?;
        Ok(found.is_some())
    }

    pub fn get(&self, trace_id: &str) -> StoreResult<Option<TraceRow>> {
        let conn = self.conn()?;
        let row = conn
            .query_row(
                &format!("SELECT {ROW_COLUMNS} FROM traces WHERE trace_id = ?1"),
                params![trace_id],
                read_row,
            )
            .optional()?;
        Ok(row)
    }

    /// Newest first.
    pub fn search(&self, query: &TraceQuery) -> StoreResult<Vec<TraceRow>> {
        let (filter, mut args) = where_clause(query);
        args.push(Value::Integer(i64::from(query.limit)));
        args.push(Value::Integer(i64::from(query.offset)));
        let sql = format!(
            "SELECT {ROW_COLUMNS} FROM traces {filter}
             ORDER BY timestamp DESC, seq DESC
             LIMIT ?{} OFFSET ?{}",
            args.len() - 1,
            args.len()
        );
        let conn = self.conn()?;
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt.query_map(params_from_iter(args.iter()), read_row)?;
        let mut out = Vec::new();
        for r in rows {
            out.push(r?);
        }
        Ok(out)
    }

    pub fn count(&self, query: &TraceQuery) -> StoreResult<u64> {
        let (filter, args) = where_clause(query);
        let conn = self.conn()?;
        let n: i64 = conn.query_row(
            &format!("SELECT COUNT(*) FROM traces {filter}"),
            params_from_iter(args.iter()),
            |row| row.get(0),
        )?;
        Ok(u64::try_from(n).unwrap_or(0))
    }

    /// Files of one execution in canonical order: timestamp, then save order.
    pub fn execution_files(&self, execution_id: &str) -> StoreResult<Vec<PathBuf>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(
            "SELECT file_path FROM traces WHERE execution_id = ?1 ORDER BY timestamp ASC, seq ASC",
        )?;
        let rows = stmt.query_map(params![execution_id], |row| {
            row.get::<_, String>(0).map(PathBuf::from)
        })?;
        let mut out = Vec::new();
        for r in rows {
            out.push(r?);
        }
        Ok(out)
    }

    /// Most recently active first.
    pub fn executions(&self) -> StoreResult<Vec<ExecutionSummary>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(
            "SELECT execution_id, COUNT(*), SUM(CASE WHEN status = 'fail' THEN 1 ELSE 0 END),
                    MIN(timestamp), MAX(timestamp)
             FROM traces
             WHERE execution_id IS NOT NULL
             GROUP BY execution_id
             ORDER BY MAX(timestamp) DESC, execution_id ASC",
        )?;
        let rows = stmt.query_map([], |row| {
            Ok(ExecutionSummary {
                execution_id: row.get(0)?,
                trace_count: row.get::<_, i64>(1)?.max(0) as u64,
                failed_count: row.get::<_, i64>(2)?.max(0) as u64,
                first_seen: row.get(3)?,
                last_seen: row.get(4)?,
            })
        })?;
        let mut out = Vec::new();
        for r in rows {
            out.push(r?);
        }
        Ok(out)
    }

    /// Replays of `trace_id`, oldest first.
    pub fn replays_of(&self, trace_id: &str) -> StoreResult<Vec<TraceRow>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {ROW_COLUMNS} FROM traces WHERE replay_of = ?1 ORDER BY timestamp ASC, seq ASC"
        ))?;
        let rows = stmt.query_map(params![trace_id], read_row)?;
        let mut out = Vec::new();
        for r in rows {
            out.push(r?);
        }
        Ok(out)
    }

    /// Every trace connected to `trace_id` through replay links: walk up to
    /// the original, then breadth-first through its replays.
    pub fn lineage_ids(&self, trace_id: &str) -> StoreResult<Vec<String>> {
        let mut visited = HashSet::new();
        let mut root = trace_id.to_string();
        while visited.insert(root.clone()) {
            match self.get(&root)?.and_then(|row| row.replay_of) {
                Some(up) if self.contains(&up)? => root = up,
                _ => break,
            }
        }

        let mut lineage = Vec::new();
        let mut seen = HashSet::new();
        let mut queue = std::collections::VecDeque::from([root]);
        while let Some(id) = queue.pop_front() {
            if !seen.insert(id.clone()) {
                continue;
            }
            for child in self.replays_of(&id)? {
                queue.push_back(child.trace_id);
            }
            lineage.push(id);
        }
        Ok(lineage)
    }

    pub fn clear(&self) -> StoreResult<()> {
        let conn = self.conn()?;
        conn.execute("DELETE FROM traces", [])?;
        Ok(())
    }
}

fn where_clause(query: &TraceQuery) -> (String, Vec<Value>) {
    let mut clauses = Vec::new();
    let mut args = Vec::new();
    if let Some(model) = &query.model {
        args.push(Value::Text(model.clone()));
        clauses.push(format!("model = ?{}", args.len()));
    }
    if let Some(provider) = &query.provider {
        args.push(Value::Text(provider.clone()));
        clauses.push(format!("provider = ?{}", args.len()));
    }
    if let Some(date) = &query.date {
        args.push(Value::Text(format!("{date}%")));
        clauses.push(format!("timestamp LIKE ?{}", args.len()));
    }
    if let Some(exec) = &query.execution_id {
        args.push(Value::Text(exec.clone()));
        clauses.push(format!("execution_id = ?{}", args.len()));
    }
    if query.failed_only {
        clauses.push("status = 'fail'".to_string());
    }
    if clauses.is_empty() {
        (String::new(), args)
    } else {
        (format!("WHERE {}", clauses.join(" AND ")), args)
    }
}

fn read_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<TraceRow> {
    Ok(TraceRow {
        trace_id: row.get(0)?,
        execution_id: row.get(1)?,
        node_id: row.get(2)?,
        timestamp: row.get(3)?,
        provider: row.get(4)?,
        model: row.get(5)?,
        latency_ms: row.get::<_, i64>(6)?.max(0) as u64,
        status: row.get(7)?,
        replay_of: row.get(8)?,
        file_path: PathBuf::from(row.get::<_, String>(9)?),
    })
}
