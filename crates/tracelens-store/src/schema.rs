pub const DDL: &str = r#"
CREATE TABLE IF NOT EXISTS traces (
  seq INTEGER PRIMARY KEY AUTOINCREMENT,
  trace_id TEXT NOT NULL UNIQUE,
  execution_id TEXT,
  node_id TEXT NOT NULL,
  timestamp TEXT NOT NULL,
  provider TEXT NOT NULL,
  model TEXT,
  latency_ms INTEGER NOT NULL,
  status TEXT,
  replay_of TEXT,
  file_path TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_traces_timestamp ON traces(timestamp DESC);
CREATE INDEX IF NOT EXISTS idx_traces_model ON traces(model);
CREATE INDEX IF NOT EXISTS idx_traces_provider ON traces(provider);
CREATE INDEX IF NOT EXISTS idx_traces_replay_of ON traces(replay_of);
CREATE INDEX IF NOT EXISTS idx_traces_execution ON traces(execution_id, timestamp, seq);
"#;
