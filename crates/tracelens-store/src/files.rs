//! JSON files: the ground truth of the store.
//!
//! Layout under the store home:
//! - `traces/<YYYY-MM-DD>/<trace_id>.json`
//! - `snapshots/<execution_id>-<captured_at>-<hash12>.json`
//! - `goldens.json`
//!
//! Trace and snapshot files are created once and never rewritten. Ids are
//! reduced to a single file name component before they reach a path.

use crate::config::StorageConfig;
use crate::error::{StoreError, StoreResult};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::collections::BTreeMap;
use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};
use tracelens_core::{GoldenRecord, Snapshot, Trace};

const SNAPSHOT_HASH_PREFIX: usize = 12;
const SNAPSHOT_TIME_FORMAT: &str = "%Y%m%dT%H%M%S%6fZ";

/// Map an id onto `[A-Za-z0-9._-]` so it cannot name another directory.
fn file_component(id: &str) -> String {
    id.chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '-' || c == '_' || c == '.' {
                c
            } else {
                '_'
            }
        })
        .collect()
}

#[derive(Debug, Clone)]
pub struct FileStore {
    traces_dir: PathBuf,
    snapshots_dir: PathBuf,
    goldens_file: PathBuf,
}

impl FileStore {
    pub fn new(home: &Path, storage: &StorageConfig) -> Self {
        Self {
            traces_dir: home.join(&storage.traces_dir),
            snapshots_dir: home.join(&storage.snapshots_dir),
            goldens_file: home.join(&storage.goldens_file),
        }
    }

    pub fn ensure_dirs(&self) -> StoreResult<()> {
        for dir in [&self.traces_dir, &self.snapshots_dir] {
            std::fs::create_dir_all(dir).map_err(|e| StoreError::io(dir, e))?;
        }
        Ok(())
    }

    pub fn trace_path(&self, trace: &Trace) -> PathBuf {
        self.traces_dir
            .join(trace.timestamp.format("%Y-%m-%d").to_string())
            .join(format!("{}.json", file_component(&trace.trace_id)))
    }

    pub fn write_trace(&self, trace: &Trace) -> StoreResult<PathBuf> {
        let path = self.trace_path(trace);
        if let Some(day) = path.parent() {
            std::fs::create_dir_all(day).map_err(|e| StoreError::io(day, e))?;
        }
        write_new(&path, trace).map_err(|err| match err {
            StoreError::Io { source, .. } if source.kind() == std::io::ErrorKind::AlreadyExists => {
                StoreError::AlreadyExists {
                    what: "trace",
                    id: trace.trace_id.clone(),
                }
            }
            other => other,
        })?;
        Ok(path)
    }

    pub fn read_trace(&self, path: &Path) -> StoreResult<Trace> {
        read_json(path)
    }

    /// Every trace file on disk, in directory order (dates ascending).
    pub fn scan_traces(&self) -> StoreResult<Vec<PathBuf>> {
        let mut out = Vec::new();
        if !self.traces_dir.exists() {
            return Ok(out);
        }
        for day in sorted_entries(&self.traces_dir)? {
            if !day.is_dir() {
                continue;
            }
            for file in sorted_entries(&day)? {
                if file.extension().is_some_and(|ext| ext == "json") {
                    out.push(file);
                }
            }
        }
        Ok(out)
    }

    pub fn snapshot_path(&self, snapshot: &Snapshot) -> PathBuf {
        let prefix: String = snapshot.hash.chars().take(SNAPSHOT_HASH_PREFIX).collect();
        self.snapshots_dir.join(format!(
            "{}-{}-{}.json",
            file_component(&snapshot.execution_id),
            snapshot.captured_at.format(SNAPSHOT_TIME_FORMAT),
            prefix
        ))
    }

    /// Persist a snapshot as-is. Repeated snapshots of an unchanged graph get
    /// their own file; an existing file is never overwritten.
    pub fn write_snapshot(&self, snapshot: &Snapshot) -> StoreResult<PathBuf> {
        let path = self.snapshot_path(snapshot);
        write_new(&path, snapshot).map_err(|err| match err {
            StoreError::Io { source, .. } if source.kind() == std::io::ErrorKind::AlreadyExists => {
                StoreError::AlreadyExists {
                    what: "snapshot",
                    id: path.display().to_string(),
                }
            }
            other => other,
        })?;
        Ok(path)
    }

    pub fn read_snapshot(&self, path: &Path) -> StoreResult<Snapshot> {
        read_json(path)
    }

    /// Goldens keyed by `<model>:<provider>`; empty if none were blessed yet.
    pub fn read_goldens(&self) -> StoreResult<BTreeMap<String, GoldenRecord>> {
        if !self.goldens_file.exists() {
            return Ok(BTreeMap::new());
        }
        read_json(&self.goldens_file)
    }

    /// Replace the golden registry through a temp file and rename.
    pub fn write_goldens(&self, goldens: &BTreeMap<String, GoldenRecord>) -> StoreResult<()> {
        let tmp = self.goldens_file.with_extension("json.tmp");
        let body = serde_json::to_vec_pretty(goldens).map_err(|e| StoreError::json(&tmp, e))?;
        std::fs::write(&tmp, body).map_err(|e| StoreError::io(&tmp, e))?;
        std::fs::rename(&tmp, &self.goldens_file).map_err(|e| StoreError::io(&self.goldens_file, e))
    }
}

/// Create `path` exclusively. The parent directory must already exist.
fn write_new<T: Serialize>(path: &Path, value: &T) -> StoreResult<()> {
    let body = serde_json::to_vec_pretty(value).map_err(|e| StoreError::json(path, e))?;
    let mut file = OpenOptions::new()
        .write(true)
        .create_new(true)
        .open(path)
        .map_err(|e| StoreError::io(path, e))?;
    file.write_all(&body).map_err(|e| StoreError::io(path, e))?;
    Ok(())
}

fn read_json<T: DeserializeOwned>(path: &Path) -> StoreResult<T> {
    let raw = std::fs::read(path).map_err(|e| StoreError::io(path, e))?;
    serde_json::from_slice(&raw).map_err(|e| StoreError::json(path, e))
}

fn sorted_entries(dir: &Path) -> StoreResult<Vec<PathBuf>> {
    let mut entries = Vec::new();
    for entry in std::fs::read_dir(dir).map_err(|e| StoreError::io(dir, e))? {
        entries.push(entry.map_err(|e| StoreError::io(dir, e))?.path());
    }
    entries.sort();
    Ok(entries)
}
