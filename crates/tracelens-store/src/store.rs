use crate::config::{load_config, write_default_config, StoreConfig, CONFIG_FILE};
use crate::error::{StoreError, StoreResult};
use crate::files::FileStore;
use crate::index::{ExecutionSummary, TraceIndex, TraceQuery, TraceRow};
use chrono::{DateTime, Utc};
use std::collections::{BTreeMap, HashSet};
use std::path::{Path, PathBuf};
use tracelens_core::{GoldenRecord, Snapshot, SourceError, Trace, TraceSource};
use tracing::{debug, info, warn};

/// Trace files plus their SQLite index, rooted at a store home.
#[derive(Clone)]
pub struct TraceStore {
    home: PathBuf,
    config: StoreConfig,
    files: FileStore,
    index: TraceIndex,
}

impl TraceStore {
    /// Create the home layout and a default `config.yaml` if missing.
    pub fn init(home: &Path) -> StoreResult<Self> {
        std::fs::create_dir_all(home).map_err(|e| StoreError::io(home, e))?;
        let config_path = home.join(CONFIG_FILE);
        if !config_path.exists() {
            write_default_config(&config_path)?;
            info!(home = %home.display(), "initialized trace store");
        }
        Self::open(home)
    }

    pub fn open(home: &Path) -> StoreResult<Self> {
        let config_path = home.join(CONFIG_FILE);
        if !config_path.exists() {
            return Err(StoreError::NotInitialized {
                home: home.to_path_buf(),
            });
        }
        let config = load_config(&config_path)?;
        let files = FileStore::new(home, &config.storage);
        files.ensure_dirs()?;
        let index = TraceIndex::open(&home.join(&config.storage.sqlite_index))?;
        index.init_schema()?;
        Ok(Self {
            home: home.to_path_buf(),
            config,
            files,
            index,
        })
    }

    pub fn home(&self) -> &Path {
        &self.home
    }

    pub fn config(&self) -> &StoreConfig {
        &self.config
    }

    /// Persist a sealed trace. Trace ids are write-once and a node id is
    /// recorded at most once per execution.
    pub fn save(&self, trace: &Trace) -> StoreResult<PathBuf> {
        self.check_new(trace)?;
        self.write(trace)
    }

    /// Persist a batch, or nothing if any trace in it would be rejected.
    pub fn save_all(&self, traces: &[Trace]) -> StoreResult<Vec<PathBuf>> {
        let mut trace_ids = HashSet::new();
        let mut nodes = HashSet::new();
        for trace in traces {
            if !trace_ids.insert(trace.trace_id.as_str()) {
                return Err(StoreError::AlreadyExists {
                    what: "trace",
                    id: trace.trace_id.clone(),
                });
            }
            if let Some(execution_id) = &trace.execution_id {
                if !nodes.insert((execution_id.as_str(), trace.node_id.as_str())) {
                    return Err(StoreError::DuplicateNode {
                        execution_id: execution_id.clone(),
                        node_id: trace.node_id.clone(),
                    });
                }
            }
            self.check_new(trace)?;
        }
        traces.iter().map(|trace| self.write(trace)).collect()
    }

    fn check_new(&self, trace: &Trace) -> StoreResult<()> {
        if self.index.contains(&trace.trace_id)? {
            return Err(StoreError::AlreadyExists {
                what: "trace",
                id: trace.trace_id.clone(),
            });
        }
        if let Some(execution_id) = &trace.execution_id {
            if self.index.contains_node(execution_id, &trace.node_id)? {
                return Err(StoreError::DuplicateNode {
                    execution_id: execution_id.clone(),
                    node_id: trace.node_id.clone(),
                });
            }
        }
        Ok(())
    }

    fn write(&self, trace: &Trace) -> StoreResult<PathBuf> {
        let path = self.files.write_trace(trace)?;
        self.index.insert(trace, &path)?;
        info!(
            trace_id = %trace.trace_id,
            execution_id = ?trace.execution_id,
            path = %path.display(),
            "saved trace"
        );
        Ok(path)
    }

    pub fn get(&self, trace_id: &str) -> StoreResult<Trace> {
        let row = self.index.get(trace_id)?.ok_or_else(|| StoreError::NotFound {
            what: "trace",
            id: trace_id.to_string(),
        })?;
        self.files.read_trace(&row.file_path)
    }

    pub fn search(&self, query: &TraceQuery) -> StoreResult<Vec<TraceRow>> {
        self.index.search(query)
    }

    pub fn count(&self, query: &TraceQuery) -> StoreResult<u64> {
        self.index.count(query)
    }

    pub fn executions(&self) -> StoreResult<Vec<ExecutionSummary>> {
        self.index.executions()
    }

    /// Traces of one execution in canonical order. Empty if unknown.
    pub fn execution_traces(&self, execution_id: &str) -> StoreResult<Vec<Trace>> {
        self.index
            .execution_files(execution_id)?
            .iter()
            .map(|path| self.files.read_trace(path))
            .collect()
    }

    /// The replay family of `trace_id`, original first.
    pub fn lineage(&self, trace_id: &str) -> StoreResult<Vec<Trace>> {
        if !self.index.contains(trace_id)? {
            return Err(StoreError::NotFound {
                what: "trace",
                id: trace_id.to_string(),
            });
        }
        self.index
            .lineage_ids(trace_id)?
            .iter()
            .map(|id| self.get(id))
            .collect()
    }

    /// Most recent replay of `trace_id`, if any.
    pub fn latest_replay_of(&self, trace_id: &str) -> StoreResult<Option<Trace>> {
        match self.index.replays_of(trace_id)?.last() {
            Some(row) => Ok(Some(self.files.read_trace(&row.file_path)?)),
            None => Ok(None),
        }
    }

    /// Drop the index and rebuild it from the trace files.
    pub fn reindex(&self) -> StoreResult<usize> {
        self.index.clear()?;
        let mut traces = Vec::new();
        for path in self.files.scan_traces()? {
            match self.files.read_trace(&path) {
                Ok(trace) => traces.push((trace, path)),
                Err(err) => warn!(error = %err, "skipping unreadable trace file"),
            }
        }
        // save order is lost; timestamp order is the best reconstruction
        traces.sort_by_key(|(t, _)| t.timestamp);
        for (trace, path) in &traces {
            self.index.insert(trace, path)?;
        }
        info!(count = traces.len(), "rebuilt trace index");
        Ok(traces.len())
    }

    pub fn goldens(&self) -> StoreResult<BTreeMap<String, GoldenRecord>> {
        self.files.read_goldens()
    }

    /// Record `trace_id` as the golden of its (model, provider). A golden of
    /// another trace is only replaced when `force` is set.
    pub fn bless(
        &self,
        trace_id: &str,
        force: bool,
        now: DateTime<Utc>,
    ) -> StoreResult<GoldenRecord> {
        let trace = self.get(trace_id)?;
        let record = GoldenRecord::bless(&trace, now);
        let mut goldens = self.files.read_goldens()?;
        if let Some(existing) = goldens.get(&record.key()) {
            if existing.trace_id == trace_id {
                return Ok(existing.clone());
            }
            if !force {
                return Err(StoreError::GoldenConflict {
                    key: record.key(),
                    existing: existing.trace_id.clone(),
                });
            }
            warn!(key = %record.key(), replaced = %existing.trace_id, "replacing golden");
        }
        goldens.insert(record.key(), record.clone());
        self.files.write_goldens(&goldens)?;
        info!(trace_id, key = %record.key(), "blessed trace");
        Ok(record)
    }

    /// Remove the golden that points at `trace_id`.
    pub fn unbless(&self, trace_id: &str) -> StoreResult<GoldenRecord> {
        let mut goldens = self.files.read_goldens()?;
        let Some((key, removed)) = goldens
            .iter()
            .find(|(_, g)| g.trace_id == trace_id)
            .map(|(k, g)| (k.clone(), g.clone()))
        else {
            return Err(StoreError::NotFound {
                what: "golden",
                id: trace_id.to_string(),
            });
        };
        goldens.remove(&key);
        self.files.write_goldens(&goldens)?;
        info!(trace_id, key = %key, "unblessed trace");
        Ok(removed)
    }

    pub fn save_snapshot(&self, snapshot: &Snapshot) -> StoreResult<PathBuf> {
        let path = self.files.write_snapshot(snapshot)?;
        info!(execution_id = %snapshot.execution_id, path = %path.display(), "saved snapshot");
        Ok(path)
    }

    pub fn load_snapshot(&self, path: &Path) -> StoreResult<Snapshot> {
        self.files.read_snapshot(path)
    }
}

impl TraceSource for TraceStore {
    fn traces_for_execution(&self, execution_id: &str) -> Result<Vec<Trace>, SourceError> {
        let traces = self.execution_traces(execution_id)?;
        debug!(execution_id, count = traces.len(), "loaded execution traces");
        Ok(traces)
    }
}
